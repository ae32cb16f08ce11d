//! Counting purchases per product to find the most purchased products.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use time::Date;

/// The message sent alongside an empty result.
pub const EMPTY_PERIOD_MESSAGE: &str = "no purchases in this period";

/// An inclusive range of purchase dates. A missing bound is unbounded on that side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateWindow {
    /// The earliest date to include.
    pub start: Option<Date>,
    /// The latest date to include.
    pub end: Option<Date>,
}

impl DateWindow {
    /// Create a window from optional bounds.
    pub fn new(start: Option<Date>, end: Option<Date>) -> Self {
        Self { start, end }
    }

    /// A window that includes every purchase.
    pub fn all() -> Self {
        Self::default()
    }
}

/// How many times a product was purchased.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductCount {
    /// The product name.
    pub name: String,
    /// The number of purchases of the product.
    pub count: u64,
}

/// The most purchased products within a date window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopProducts {
    /// Every product sharing the highest purchase count.
    pub top_products: Vec<ProductCount>,
    /// An explanation, only present when `top_products` is empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl TopProducts {
    /// Build the result for the names of every purchase in a window.
    pub fn from_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        let top_products = most_frequent_products(names);

        let message = if top_products.is_empty() {
            Some(EMPTY_PERIOD_MESSAGE.to_owned())
        } else {
            None
        };

        Self {
            top_products,
            message,
        }
    }
}

/// Count each distinct name and return those sharing the highest count.
///
/// Names are compared exactly, so "Milk" and "milk" are different products.
/// Tied products are returned in the order they first appear in `names`.
/// An empty input gives an empty result.
pub fn most_frequent_products<'a>(names: impl IntoIterator<Item = &'a str>) -> Vec<ProductCount> {
    let mut positions: HashMap<&str, usize> = HashMap::new();
    let mut counts: Vec<(&str, u64)> = Vec::new();

    for name in names {
        match positions.get(name) {
            Some(&position) => counts[position].1 += 1,
            None => {
                positions.insert(name, counts.len());
                counts.push((name, 1));
            }
        }
    }

    let Some(max_count) = counts.iter().map(|(_, count)| *count).max() else {
        return Vec::new();
    };

    counts
        .into_iter()
        .filter(|(_, count)| *count == max_count)
        .map(|(name, count)| ProductCount {
            name: name.to_owned(),
            count,
        })
        .collect()
}
