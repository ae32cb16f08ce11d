//! The append-only purchase ledger and its database queries.

use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::{Connection, Row, named_params};

use crate::{
    Error,
    purchase::{DateWindow, ProductName, Purchase, TopProducts, ValidatedPurchase},
};

/// The ledger of purchases.
///
/// Clones share the same underlying database connection. Every operation
/// holds the connection lock for its whole duration, so reads never observe
/// a partially written purchase.
#[derive(Debug, Clone)]
pub struct PurchaseStore {
    connection: Arc<Mutex<Connection>>,
}

impl PurchaseStore {
    /// Create a store backed by `connection`.
    ///
    /// The purchase table must already exist, see [crate::initialize_db].
    pub fn new(connection: Arc<Mutex<Connection>>) -> Self {
        Self { connection }
    }

    /// Store a validated purchase and return it with its new ID.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::DatabaseLockError] if the connection lock is poisoned,
    /// - [Error::DuplicatePurchaseId] if the assigned ID already exists,
    /// - or [Error::SqlError] if there is some other SQL error.
    pub fn append(&self, record: ValidatedPurchase) -> Result<Purchase, Error> {
        let connection = self.lock()?;
        let purchase = insert_purchase(&record, &connection)?;

        tracing::debug!(
            "stored purchase {} of \"{}\"",
            purchase.id,
            purchase.product_name
        );

        Ok(purchase)
    }

    /// Get every purchase, oldest first.
    ///
    /// # Errors
    /// Returns an error if the lock is poisoned or there is an SQL error.
    pub fn list(&self) -> Result<Vec<Purchase>, Error> {
        let connection = self.lock()?;

        get_all_purchases(&connection)
    }

    /// Find the most purchased products among purchases dated within `window`.
    ///
    /// # Errors
    /// Returns an error if the lock is poisoned or there is an SQL error.
    pub fn top_products(&self, window: DateWindow) -> Result<TopProducts, Error> {
        let connection = self.lock()?;
        let names = get_product_names_in_window(window, &connection)?;

        Ok(TopProducts::from_names(names.iter().map(String::as_str)))
    }

    /// Check that the database answers queries.
    ///
    /// # Errors
    /// Returns an error if the lock is poisoned or the query fails.
    pub fn ping(&self) -> Result<(), Error> {
        let connection = self.lock()?;
        connection.query_row("SELECT 1", [], |_| Ok(()))?;

        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, Error> {
        self.connection.lock().map_err(|error| {
            tracing::error!("could not acquire database lock: {error}");
            Error::DatabaseLockError
        })
    }
}

/// Insert a purchase and return it with its generated ID.
fn insert_purchase(record: &ValidatedPurchase, connection: &Connection) -> Result<Purchase, Error> {
    connection
        .prepare(
            "INSERT INTO purchase (product_name, price, purchase_date)
             VALUES (?1, ?2, ?3)
             RETURNING id, product_name, price, purchase_date",
        )?
        .query_row(
            (
                record.product_name().as_ref(),
                record.price(),
                record.purchase_date(),
            ),
            map_purchase_row,
        )
        .map_err(|error| match error {
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY,
                },
                _,
            ) => Error::DuplicatePurchaseId,
            error => error.into(),
        })
}

fn get_all_purchases(connection: &Connection) -> Result<Vec<Purchase>, Error> {
    connection
        .prepare("SELECT id, product_name, price, purchase_date FROM purchase ORDER BY id ASC;")?
        .query_map([], map_purchase_row)?
        .map(|maybe_purchase| maybe_purchase.map_err(|error| error.into()))
        .collect()
}

/// The product name of every purchase in `window`, in ledger order.
fn get_product_names_in_window(
    window: DateWindow,
    connection: &Connection,
) -> Result<Vec<String>, Error> {
    connection
        .prepare(
            "SELECT product_name FROM purchase
             WHERE (:start IS NULL OR purchase_date >= :start)
               AND (:end IS NULL OR purchase_date <= :end)
             ORDER BY id ASC;",
        )?
        .query_map(
            named_params! { ":start": window.start, ":end": window.end },
            |row| row.get(0),
        )?
        .map(|maybe_name| maybe_name.map_err(|error| error.into()))
        .collect()
}

/// Create the purchase table and its indexes.
///
/// The checks mirror the validation rules so that an invalid record can
/// never be stored, even by a bug elsewhere.
pub fn create_purchase_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS purchase (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            product_name TEXT NOT NULL CHECK (length(trim(product_name)) > 0),
            price REAL NOT NULL CHECK (price > 0),
            purchase_date TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_purchase_date ON purchase(purchase_date);",
    )?;

    Ok(())
}

fn map_purchase_row(row: &Row) -> Result<Purchase, rusqlite::Error> {
    let id = row.get(0)?;
    let raw_name: String = row.get(1)?;
    let price = row.get(2)?;
    let purchase_date = row.get(3)?;

    Ok(Purchase {
        id,
        product_name: ProductName::new_unchecked(&raw_name),
        price,
        purchase_date,
    })
}

#[cfg(test)]
mod purchase_store_tests {
    use std::sync::{Arc, Mutex};

    use rusqlite::Connection;
    use time::macros::date;

    use crate::{
        Error,
        db::initialize,
        purchase::{
            DateWindow, EMPTY_PERIOD_MESSAGE, ProductCount, PurchaseCandidate, PurchaseStore,
            ValidatedPurchase, validate_purchase,
        },
    };

    fn get_test_store() -> PurchaseStore {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();

        PurchaseStore::new(Arc::new(Mutex::new(connection)))
    }

    fn append(store: &PurchaseStore, name: &str, purchase_date: &str) {
        let record = validate_purchase(&PurchaseCandidate::new(name, 1.0, purchase_date))
            .expect("Could not validate purchase");
        store.append(record).expect("Could not append purchase");
    }

    fn count(name: &str, count: u64) -> ProductCount {
        ProductCount {
            name: name.to_owned(),
            count,
        }
    }

    #[test]
    fn append_returns_normalized_record_with_id() {
        let store = get_test_store();
        let record = validate_purchase(&PurchaseCandidate::new(" Milk ", "2.50", "2024-01-10"))
            .unwrap();

        let purchase = store.append(record).unwrap();

        assert!(purchase.id > 0);
        assert_eq!(purchase.product_name.as_ref(), "Milk");
        assert_eq!(purchase.price, 2.5);
        assert_eq!(purchase.purchase_date, date!(2024 - 01 - 10));
    }

    #[test]
    fn append_grows_list_by_exactly_one() {
        let store = get_test_store();
        append(&store, "Bread", "2024-01-01");
        let before = store.list().unwrap();
        let record = validate_purchase(&PurchaseCandidate::new("Eggs", 4.2, "2024-01-02"))
            .unwrap();

        let purchase = store.append(record).unwrap();

        let after = store.list().unwrap();
        assert_eq!(after.len(), before.len() + 1);
        assert_eq!(after[..before.len()], before[..]);
        assert_eq!(after.last(), Some(&purchase));
        assert!(before.iter().all(|existing| existing.id != purchase.id));
    }

    #[test]
    fn list_is_empty_for_new_ledger() {
        let store = get_test_store();

        assert_eq!(store.list().unwrap(), []);
    }

    #[test]
    fn list_keeps_insertion_order_not_date_order() {
        let store = get_test_store();
        append(&store, "Late", "2024-03-01");
        append(&store, "Early", "2024-01-01");
        append(&store, "Middle", "2024-02-01");

        let names: Vec<_> = store
            .list()
            .unwrap()
            .into_iter()
            .map(|purchase| purchase.product_name.to_string())
            .collect();

        assert_eq!(names, ["Late", "Early", "Middle"]);
    }

    #[test]
    fn ids_are_unique_and_increasing() {
        let store = get_test_store();
        for day in 1..=5 {
            append(&store, "Milk", &format!("2024-01-0{day}"));
        }

        let ids: Vec<_> = store.list().unwrap().iter().map(|p| p.id).collect();

        assert!(ids.windows(2).all(|pair| pair[0] < pair[1]), "got {ids:?}");
    }

    #[test]
    fn rejects_invalid_record_as_defect() {
        let store = get_test_store();
        let record = ValidatedPurchase::new_unchecked("Milk", -1.0, date!(2024 - 01 - 10));

        let result = store.append(record);

        assert!(matches!(result, Err(Error::SqlError(_))), "got {result:?}");
        assert_eq!(store.list().unwrap(), []);
    }

    #[test]
    fn top_products_includes_all_tied_leaders() {
        let store = get_test_store();
        for name in ["Milk", "Bread", "Eggs", "Milk", "Bread", "Milk", "Bread"] {
            append(&store, name, "2024-01-10");
        }

        let got = store.top_products(DateWindow::all()).unwrap();

        assert_eq!(got.top_products, [count("Milk", 3), count("Bread", 3)]);
        assert_eq!(got.message, None);
    }

    #[test]
    fn top_products_for_empty_window_has_message() {
        let store = get_test_store();
        append(&store, "Milk", "2024-01-10");

        let got = store
            .top_products(DateWindow::new(
                Some(date!(2099 - 01 - 01)),
                Some(date!(2099 - 12 - 31)),
            ))
            .unwrap();

        assert_eq!(got.top_products, []);
        assert_eq!(got.message.as_deref(), Some(EMPTY_PERIOD_MESSAGE));
    }

    #[test]
    fn top_products_for_empty_ledger_has_message() {
        let store = get_test_store();

        let got = store.top_products(DateWindow::all()).unwrap();

        assert_eq!(got.top_products, []);
        assert!(got.message.is_some());
    }

    #[test]
    fn window_bounds_are_inclusive() {
        let store = get_test_store();
        append(&store, "Before", "2024-01-09");
        append(&store, "OnStart", "2024-01-10");
        append(&store, "OnEnd", "2024-01-20");
        append(&store, "After", "2024-01-21");

        let got = store
            .top_products(DateWindow::new(
                Some(date!(2024 - 01 - 10)),
                Some(date!(2024 - 01 - 20)),
            ))
            .unwrap();

        assert_eq!(got.top_products, [count("OnStart", 1), count("OnEnd", 1)]);
    }

    #[test]
    fn missing_bound_is_unbounded() {
        let store = get_test_store();
        append(&store, "Old", "2000-01-01");
        append(&store, "New", "2030-01-01");

        let from = store
            .top_products(DateWindow::new(Some(date!(2024 - 01 - 01)), None))
            .unwrap();
        let until = store
            .top_products(DateWindow::new(None, Some(date!(2024 - 01 - 01))))
            .unwrap();

        assert_eq!(from.top_products, [count("New", 1)]);
        assert_eq!(until.top_products, [count("Old", 1)]);
    }

    #[test]
    fn reversed_window_matches_nothing() {
        let store = get_test_store();
        append(&store, "Milk", "2024-01-10");

        let got = store
            .top_products(DateWindow::new(
                Some(date!(2024 - 01 - 31)),
                Some(date!(2024 - 01 - 01)),
            ))
            .unwrap();

        assert_eq!(got.top_products, []);
    }

    #[test]
    fn reads_are_repeatable() {
        let store = get_test_store();
        append(&store, "Milk", "2024-01-10");
        append(&store, "Bread", "2024-01-11");

        assert_eq!(store.list().unwrap(), store.list().unwrap());
        assert_eq!(
            store.top_products(DateWindow::all()).unwrap(),
            store.top_products(DateWindow::all()).unwrap()
        );
    }

    #[test]
    fn milk_scenario() {
        let store = get_test_store();
        let first = store
            .append(
                validate_purchase(&PurchaseCandidate::new(" Milk ", "2.50", "2024-01-10"))
                    .unwrap(),
            )
            .unwrap();
        store
            .append(
                validate_purchase(&PurchaseCandidate::new("Milk", 3.0, "2024-01-15")).unwrap(),
            )
            .unwrap();

        let got = store
            .top_products(DateWindow::new(
                Some(date!(2024 - 01 - 01)),
                Some(date!(2024 - 01 - 31)),
            ))
            .unwrap();

        assert_eq!(first.product_name.as_ref(), "Milk");
        assert_eq!(first.price, 2.5);
        assert_eq!(got.top_products, [count("Milk", 2)]);
    }

    #[tokio::test]
    async fn concurrent_appends_are_all_stored() {
        let store = get_test_store();
        let mut handles = vec![];

        for i in 0..50 {
            let store = store.clone();
            handles.push(tokio::task::spawn_blocking(move || {
                let record = validate_purchase(&PurchaseCandidate::new(
                    &format!("Product {}", i % 5),
                    1.0,
                    "2024-01-10",
                ))
                .unwrap();
                store.append(record).unwrap()
            }));
        }

        for handle in handles {
            handle.await.unwrap();
        }

        let purchases = store.list().unwrap();
        assert_eq!(purchases.len(), 50);
        let got = store.top_products(DateWindow::all()).unwrap();
        assert_eq!(got.top_products.len(), 5);
        assert!(got.top_products.iter().all(|product| product.count == 10));
    }
}
