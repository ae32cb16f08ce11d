//! Purchase recording and reporting.
//!
//! This module contains everything related to purchases:
//! - The `Purchase` model and the validation of submitted purchases
//! - The append-only `PurchaseStore` and its database queries
//! - Counting purchases to find the most purchased products
//! - Route handlers for the purchase API

mod domain;
mod endpoints;
mod stats;
mod store;
mod validation;

pub use domain::{ProductName, Purchase, PurchaseId};
pub use endpoints::{
    TopProductsQuery, create_purchase_endpoint, list_purchases_endpoint, top_products_endpoint,
};
pub use stats::{
    DateWindow, EMPTY_PERIOD_MESSAGE, ProductCount, TopProducts, most_frequent_products,
};
pub use store::{PurchaseStore, create_purchase_table};
pub use validation::{
    Field, FieldError, PurchaseCandidate, RawPrice, ValidatedPurchase, ValidationErrorBody,
    ValidationErrors, ValidationKind, parse_date, parse_price, validate_purchase,
};
