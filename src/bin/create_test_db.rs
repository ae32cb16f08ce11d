use std::error::Error;
use std::path::Path;
use std::process::exit;
use std::sync::{Arc, Mutex};

use clap::Parser;
use rusqlite::Connection;

use grocery_ledger::{PurchaseCandidate, PurchaseStore, initialize_db, validate_purchase};

/// A utility for creating a test database for the REST API server of grocery_ledger.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to save the SQLite database to.
    #[arg(long, short)]
    output_path: String,
}

const SAMPLE_PURCHASES: &[(&str, f64, &str)] = &[
    ("Milk", 1.15, "2024-01-03"),
    ("Bread", 2.40, "2024-01-03"),
    ("Eggs", 3.10, "2024-01-05"),
    ("Milk", 1.15, "2024-01-10"),
    ("Apples", 2.99, "2024-01-12"),
    ("Bread", 2.40, "2024-01-17"),
    ("Milk", 1.19, "2024-01-24"),
    ("Coffee", 6.50, "2024-02-02"),
    ("Bread", 2.45, "2024-02-07"),
    ("Eggs", 3.10, "2024-02-14"),
];

/// Create and populate a database for manual testing.
fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let output_path = Path::new(&args.output_path);

    match output_path.extension() {
        None => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        Some(extension) if extension.is_empty() => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        _ => {}
    }

    if output_path.is_file() {
        eprintln!("File already exists at {output_path:#?}!");
        exit(1);
    }

    println!("Creating database at {output_path:#?}");
    let conn = Connection::open(output_path)?;

    initialize_db(&conn)?;

    println!("Adding {} sample purchases...", SAMPLE_PURCHASES.len());

    let store = PurchaseStore::new(Arc::new(Mutex::new(conn)));

    for &(product_name, price, purchase_date) in SAMPLE_PURCHASES {
        let record = validate_purchase(&PurchaseCandidate::new(product_name, price, purchase_date))?;
        store.append(record)?;
    }

    println!("Success!");

    Ok(())
}
