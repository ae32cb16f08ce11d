//! Database schema setup.

use rusqlite::{Connection, Transaction, TransactionBehavior};

use crate::{Error, purchase::create_purchase_table};

/// Create the application tables if they do not exist yet.
///
/// The schema is created inside a single exclusive transaction, so a failure
/// leaves the database untouched.
///
/// # Errors
/// Returns an error if there is an SQL error.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    let transaction = Transaction::new_unchecked(connection, TransactionBehavior::Exclusive)?;

    create_purchase_table(&transaction)?;

    transaction.commit()?;

    Ok(())
}
