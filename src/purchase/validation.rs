//! Field-level validation of purchases submitted by clients.
//!
//! Validation is exhaustive: every invalid field is reported, not just the
//! first one found.

use std::{collections::BTreeMap, fmt::Display};

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Deserializer, Serialize};
use time::{Date, format_description::BorrowedFormatItem, macros::format_description};

use crate::purchase::ProductName;

/// The textual format for calendar dates exchanged with clients.
const DATE_FORMAT: &[BorrowedFormatItem<'_>] = format_description!("[year]-[month]-[day]");

/// Why a field failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValidationKind {
    /// The product name was missing or only whitespace.
    EmptyName,
    /// The price was missing, not a number, or not greater than zero.
    InvalidPrice,
    /// The date was missing or not a `YYYY-MM-DD` calendar date.
    InvalidDate,
}

impl ValidationKind {
    /// A short, human-readable explanation of the failure.
    pub fn reason(&self) -> &'static str {
        match self {
            ValidationKind::EmptyName => "product name is required",
            ValidationKind::InvalidPrice => "price must be a number greater than zero",
            ValidationKind::InvalidDate => "date must be a valid calendar date (YYYY-MM-DD)",
        }
    }
}

/// The input fields that can be rejected.
///
/// The declaration order is the order errors are reported in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    /// The name of the purchased product.
    ProductName,
    /// The price paid.
    Price,
    /// The day of the purchase.
    PurchaseDate,
    /// The lower bound of a reporting window.
    StartDate,
    /// The upper bound of a reporting window.
    EndDate,
}

/// One rejected field as reported to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// The rejected field.
    pub field: Field,
    /// Why it was rejected.
    pub kind: ValidationKind,
    /// A human-readable explanation.
    pub reason: String,
}

/// The body of a response rejecting a request because of invalid fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationErrorBody {
    /// One entry per invalid field.
    pub errors: Vec<FieldError>,
}

/// The invalid fields of a request, with exactly one [ValidationKind] each.
#[derive(Debug, Clone, Default, PartialEq, Eq, thiserror::Error)]
#[error("{}", describe(.0))]
pub struct ValidationErrors(BTreeMap<Field, ValidationKind>);

impl ValidationErrors {
    /// Record that `field` is invalid. A later call for the same field replaces the earlier kind.
    pub fn insert(&mut self, field: Field, kind: ValidationKind) {
        self.0.insert(field, kind);
    }

    /// The reason `field` was rejected, if it was.
    pub fn get(&self, field: Field) -> Option<ValidationKind> {
        self.0.get(&field).copied()
    }

    /// Whether no field was rejected.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The number of rejected fields.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// The rejected fields in reporting order.
    pub fn iter(&self) -> impl Iterator<Item = (Field, ValidationKind)> + '_ {
        self.0.iter().map(|(field, kind)| (*field, *kind))
    }

    /// Convert into the list sent to clients.
    pub fn to_field_errors(&self) -> Vec<FieldError> {
        self.iter()
            .map(|(field, kind)| FieldError {
                field,
                kind,
                reason: kind.reason().to_owned(),
            })
            .collect()
    }
}

fn describe(errors: &BTreeMap<Field, ValidationKind>) -> String {
    errors
        .iter()
        .map(|(field, kind)| format!("{field}: {}", kind.reason()))
        .collect::<Vec<_>>()
        .join(", ")
}

impl Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Field::ProductName => "product_name",
            Field::Price => "price",
            Field::PurchaseDate => "purchase_date",
            Field::StartDate => "start_date",
            Field::EndDate => "end_date",
        };

        write!(f, "{name}")
    }
}

impl IntoResponse for ValidationErrors {
    fn into_response(self) -> Response {
        tracing::debug!("rejecting request with invalid fields: {self}");

        (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ValidationErrorBody {
                errors: self.to_field_errors(),
            }),
        )
            .into_response()
    }
}

/// A price as submitted by a client, either a JSON number or raw text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawPrice {
    /// A numeric price.
    Number(f64),
    /// A price that still needs to be parsed, e.g. "2.50".
    Text(String),
    /// Any other JSON value, such as `true` or `{}`. Never a valid price.
    Other(serde_json::Value),
}

impl From<f64> for RawPrice {
    fn from(value: f64) -> Self {
        RawPrice::Number(value)
    }
}

impl From<&str> for RawPrice {
    fn from(value: &str) -> Self {
        RawPrice::Text(value.to_owned())
    }
}

/// A purchase as submitted by a client, before validation.
///
/// Every field is optional so that a missing or wrongly typed field is
/// reported as a validation error rather than a malformed request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PurchaseCandidate {
    /// The raw product name.
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "string_or_none"
    )]
    pub product_name: Option<String>,
    /// The raw price.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<RawPrice>,
    /// The raw purchase date, expected as `YYYY-MM-DD`.
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "string_or_none"
    )]
    pub purchase_date: Option<String>,
}

/// Accept any JSON value, keeping only strings.
///
/// A non-string name or date is then rejected by [validate_purchase] the same
/// way a missing one is.
fn string_or_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(text) => Ok(Some(text)),
        _ => Ok(None),
    }
}

impl PurchaseCandidate {
    /// Create a candidate with all fields present.
    pub fn new(product_name: &str, price: impl Into<RawPrice>, purchase_date: &str) -> Self {
        Self {
            product_name: Some(product_name.to_owned()),
            price: Some(price.into()),
            purchase_date: Some(purchase_date.to_owned()),
        }
    }
}

/// A purchase that passed validation and is ready to be stored.
///
/// Outside of tests this can only be created by [validate_purchase].
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedPurchase {
    product_name: ProductName,
    price: f64,
    purchase_date: Date,
}

impl ValidatedPurchase {
    /// Create a validated purchase without checking the price.
    #[cfg(test)]
    pub(crate) fn new_unchecked(product_name: &str, price: f64, purchase_date: Date) -> Self {
        Self {
            product_name: ProductName::new_unchecked(product_name),
            price,
            purchase_date,
        }
    }

    /// The trimmed product name.
    pub fn product_name(&self) -> &ProductName {
        &self.product_name
    }

    /// The parsed price in euros.
    pub fn price(&self) -> f64 {
        self.price
    }

    /// The parsed purchase date.
    pub fn purchase_date(&self) -> Date {
        self.purchase_date
    }
}

/// Check `candidate` against the field rules and normalize it.
///
/// # Errors
///
/// Returns every invalid field:
/// - [ValidationKind::EmptyName] if the product name is missing or blank,
/// - [ValidationKind::InvalidPrice] if the price is missing, not a finite number, or not positive,
/// - [ValidationKind::InvalidDate] if the date is missing or not a `YYYY-MM-DD` date.
pub fn validate_purchase(
    candidate: &PurchaseCandidate,
) -> Result<ValidatedPurchase, ValidationErrors> {
    let mut errors = ValidationErrors::default();

    let product_name = ProductName::new(candidate.product_name.as_deref().unwrap_or_default())
        .map_err(|kind| errors.insert(Field::ProductName, kind))
        .ok();

    let price = candidate
        .price
        .as_ref()
        .ok_or(ValidationKind::InvalidPrice)
        .and_then(parse_price)
        .map_err(|kind| errors.insert(Field::Price, kind))
        .ok();

    let purchase_date = candidate
        .purchase_date
        .as_deref()
        .ok_or(ValidationKind::InvalidDate)
        .and_then(parse_date)
        .map_err(|kind| errors.insert(Field::PurchaseDate, kind))
        .ok();

    match (product_name, price, purchase_date) {
        (Some(product_name), Some(price), Some(purchase_date)) => Ok(ValidatedPurchase {
            product_name,
            price,
            purchase_date,
        }),
        _ => Err(errors),
    }
}

/// Parse a price, accepting only finite numbers greater than zero.
///
/// # Errors
///
/// Returns [ValidationKind::InvalidPrice] if the price is not a finite positive number.
pub fn parse_price(price: &RawPrice) -> Result<f64, ValidationKind> {
    let value = match price {
        RawPrice::Number(value) => *value,
        RawPrice::Text(text) => text
            .trim()
            .parse::<f64>()
            .map_err(|_| ValidationKind::InvalidPrice)?,
        RawPrice::Other(_) => return Err(ValidationKind::InvalidPrice),
    };

    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(ValidationKind::InvalidPrice)
    }
}

/// Parse a `YYYY-MM-DD` calendar date, ignoring surrounding whitespace.
///
/// Only unsigned four digit years from 0001 to 9999 are accepted, so stored
/// dates sort the same as text and as dates.
///
/// # Errors
///
/// Returns [ValidationKind::InvalidDate] if `text` is not a real calendar date.
pub fn parse_date(text: &str) -> Result<Date, ValidationKind> {
    let text = text.trim();

    if !text.starts_with(|c: char| c.is_ascii_digit()) {
        return Err(ValidationKind::InvalidDate);
    }

    let date = Date::parse(text, DATE_FORMAT).map_err(|_| ValidationKind::InvalidDate)?;

    if (1..=9999).contains(&date.year()) {
        Ok(date)
    } else {
        Err(ValidationKind::InvalidDate)
    }
}

#[cfg(test)]
mod validate_purchase_tests {
    use time::macros::date;

    use crate::purchase::{
        Field, PurchaseCandidate, RawPrice, ValidationKind, validate_purchase,
    };

    #[test]
    fn accepts_and_normalizes_valid_candidate() {
        let candidate = PurchaseCandidate::new(" Milk ", "2.50", "2024-01-10");

        let purchase = validate_purchase(&candidate).expect("candidate should be valid");

        assert_eq!(purchase.product_name().as_ref(), "Milk");
        assert_eq!(purchase.price(), 2.5);
        assert_eq!(purchase.purchase_date(), date!(2024 - 01 - 10));
    }

    #[test]
    fn accepts_numeric_price() {
        let candidate = PurchaseCandidate::new("Bread", 3.0, "2024-01-15");

        let purchase = validate_purchase(&candidate).unwrap();

        assert_eq!(purchase.price(), 3.0);
    }

    #[test]
    fn rejects_blank_names() {
        for name in ["", "   ", "\t\n"] {
            let candidate = PurchaseCandidate::new(name, 1.0, "2024-01-10");

            let errors = validate_purchase(&candidate).unwrap_err();

            assert_eq!(errors.get(Field::ProductName), Some(ValidationKind::EmptyName));
            assert_eq!(errors.len(), 1, "only the name should be rejected for {name:?}");
        }
    }

    #[test]
    fn rejects_invalid_prices() {
        let prices: [RawPrice; 7] = [
            0.0.into(),
            (-5.0).into(),
            "abc".into(),
            "0".into(),
            "".into(),
            f64::INFINITY.into(),
            "NaN".into(),
        ];

        for price in prices {
            let candidate = PurchaseCandidate::new("Eggs", price.clone(), "2024-01-10");

            let errors = validate_purchase(&candidate).unwrap_err();

            assert_eq!(
                errors.get(Field::Price),
                Some(ValidationKind::InvalidPrice),
                "price {price:?} should be rejected"
            );
        }
    }

    #[test]
    fn rejects_invalid_dates() {
        for purchase_date in [
            "",
            "not a date",
            "2024-02-30",
            "10/01/2024",
            "2024-1-5",
            "+2024-01-10",
            "-0001-01-01",
            "0000-01-01",
        ] {
            let candidate = PurchaseCandidate::new("Eggs", 1.0, purchase_date);

            let errors = validate_purchase(&candidate).unwrap_err();

            assert_eq!(
                errors.get(Field::PurchaseDate),
                Some(ValidationKind::InvalidDate),
                "date {purchase_date:?} should be rejected"
            );
        }
    }

    #[test]
    fn rejects_missing_fields() {
        let errors = validate_purchase(&PurchaseCandidate::default()).unwrap_err();

        assert_eq!(errors.get(Field::ProductName), Some(ValidationKind::EmptyName));
        assert_eq!(errors.get(Field::Price), Some(ValidationKind::InvalidPrice));
        assert_eq!(errors.get(Field::PurchaseDate), Some(ValidationKind::InvalidDate));
    }

    #[test]
    fn wrongly_typed_json_fields_are_field_errors() {
        let candidate: PurchaseCandidate = serde_json::from_value(serde_json::json!({
            "product_name": 5,
            "price": true,
            "purchase_date": 20240110,
        }))
        .expect("wrongly typed fields should still deserialize");

        let errors = validate_purchase(&candidate).unwrap_err();

        assert_eq!(errors.get(Field::ProductName), Some(ValidationKind::EmptyName));
        assert_eq!(errors.get(Field::Price), Some(ValidationKind::InvalidPrice));
        assert_eq!(errors.get(Field::PurchaseDate), Some(ValidationKind::InvalidDate));
    }

    #[test]
    fn reports_all_invalid_fields_in_order() {
        let candidate = PurchaseCandidate::new(" ", "-1", "yesterday");

        let errors = validate_purchase(&candidate).unwrap_err();

        let fields: Vec<_> = errors.iter().map(|(field, _)| field).collect();
        assert_eq!(fields, [Field::ProductName, Field::Price, Field::PurchaseDate]);
    }
}
