//! Core purchase domain types.

use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};
use time::Date;

use crate::purchase::ValidationKind;

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

/// Database identifier for a purchase.
pub type PurchaseId = i64;

/// A validated, non-empty product name with surrounding whitespace removed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
#[serde(transparent)]
pub struct ProductName(String);

impl ProductName {
    /// Create a product name.
    ///
    /// # Errors
    ///
    /// This function will return [ValidationKind::EmptyName] if `name` is
    /// empty or only whitespace.
    pub fn new(name: &str) -> Result<Self, ValidationKind> {
        let name = name.trim();

        if name.is_empty() {
            Err(ValidationKind::EmptyName)
        } else {
            Ok(Self(name.to_string()))
        }
    }

    /// Create a product name without validation.
    ///
    /// Only used for rows read back from the database, which were validated
    /// on the way in.
    pub(crate) fn new_unchecked(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl AsRef<str> for ProductName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for ProductName {
    type Err = ValidationKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProductName::new(s)
    }
}

impl Display for ProductName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A grocery purchase recorded in the ledger.
///
/// Purchases are only created by [crate::PurchaseStore::append] and are never
/// modified afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Purchase {
    /// The ID assigned by the store. IDs are never reused.
    pub id: PurchaseId,
    /// What was bought.
    pub product_name: ProductName,
    /// How much was paid, in euros. Always greater than zero.
    pub price: f64,
    /// The day the purchase happened, which is not necessarily the day it was recorded.
    #[serde(with = "iso_date")]
    pub purchase_date: Date,
}
