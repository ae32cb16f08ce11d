//! Route handlers for recording purchases and querying top products.

use axum::{
    Json,
    extract::{
        Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use time::Date;

use crate::{
    Error,
    purchase::{
        DateWindow, Field, PurchaseCandidate, PurchaseStore, ValidationErrors, ValidationKind,
        parse_date, validate_purchase,
    },
};

/// A route handler for recording a purchase.
///
/// Responds with 201 and the stored purchase, or 422 and the invalid fields.
pub async fn create_purchase_endpoint(
    State(store): State<PurchaseStore>,
    payload: Result<Json<PurchaseCandidate>, JsonRejection>,
) -> Response {
    let candidate = match payload {
        Ok(Json(candidate)) => candidate,
        Err(rejection) => return Error::InvalidRequest(rejection.body_text()).into_response(),
    };

    let record = match validate_purchase(&candidate) {
        Ok(record) => record,
        Err(errors) => return errors.into_response(),
    };

    match store.append(record) {
        Ok(purchase) => (StatusCode::CREATED, Json(purchase)).into_response(),
        Err(error) => error.into_response(),
    }
}

/// A route handler for listing every purchase, oldest first.
pub async fn list_purchases_endpoint(State(store): State<PurchaseStore>) -> Response {
    match store.list() {
        Ok(purchases) => Json(purchases).into_response(),
        Err(error) => error.into_response(),
    }
}

/// The query parameters for the top products route.
///
/// Empty values are treated the same as missing ones.
#[derive(Debug, Default, Deserialize)]
pub struct TopProductsQuery {
    /// The earliest purchase date to include, as `YYYY-MM-DD`.
    pub start_date: Option<String>,
    /// The latest purchase date to include, as `YYYY-MM-DD`.
    pub end_date: Option<String>,
}

impl TopProductsQuery {
    /// Parse the bounds into a [DateWindow].
    ///
    /// # Errors
    /// Reports [Field::StartDate] and/or [Field::EndDate] if they are not valid dates.
    pub fn to_window(&self) -> Result<DateWindow, ValidationErrors> {
        let mut errors = ValidationErrors::default();

        let start = parse_bound(self.start_date.as_deref())
            .map_err(|kind| errors.insert(Field::StartDate, kind))
            .ok()
            .flatten();
        let end = parse_bound(self.end_date.as_deref())
            .map_err(|kind| errors.insert(Field::EndDate, kind))
            .ok()
            .flatten();

        if errors.is_empty() {
            Ok(DateWindow::new(start, end))
        } else {
            Err(errors)
        }
    }
}

fn parse_bound(text: Option<&str>) -> Result<Option<Date>, ValidationKind> {
    match text.map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) => parse_date(text).map(Some),
    }
}

/// A route handler for finding the most purchased products in an optional date window.
pub async fn top_products_endpoint(
    State(store): State<PurchaseStore>,
    query: Result<Query<TopProductsQuery>, QueryRejection>,
) -> Response {
    let query = match query {
        Ok(Query(query)) => query,
        Err(rejection) => return Error::InvalidRequest(rejection.body_text()).into_response(),
    };

    let window = match query.to_window() {
        Ok(window) => window,
        Err(errors) => return errors.into_response(),
    };

    match store.top_products(window) {
        Ok(top_products) => Json(top_products).into_response(),
        Err(error) => error.into_response(),
    }
}
