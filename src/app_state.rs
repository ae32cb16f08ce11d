//! Implements a struct that holds the state of the REST server.

use std::sync::{Arc, Mutex};

use axum::extract::FromRef;
use rusqlite::Connection;

use crate::{Error, db::initialize, purchase::PurchaseStore};

/// The state of the REST server.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The ledger of purchases, shared by every request.
    pub purchase_store: PurchaseStore,
}

impl AppState {
    /// Create a new [AppState] with a SQLite database connection.
    ///
    /// This function will initialize the database by adding the tables for the domain models.
    ///
    /// # Errors
    /// Returns an error if the database cannot be initialized.
    pub fn new(db_connection: Connection) -> Result<Self, Error> {
        initialize(&db_connection)?;

        let connection = Arc::new(Mutex::new(db_connection));

        Ok(Self {
            purchase_store: PurchaseStore::new(connection),
        })
    }
}

impl FromRef<AppState> for PurchaseStore {
    fn from_ref(state: &AppState) -> Self {
        state.purchase_store.clone()
    }
}
