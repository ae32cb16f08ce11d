//! Application router configuration.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};

use crate::{
    AppState, Error, MessageBody, endpoints,
    purchase::{
        PurchaseStore, create_purchase_endpoint, list_purchases_endpoint, top_products_endpoint,
    },
};

/// The greeting returned by the root route.
pub const WELCOME_MESSAGE: &str = "Welcome to the family grocery ledger API";

/// Return a router with all the app's routes.
///
/// Cross-origin requests are allowed from anywhere since the browser client
/// is served separately from the API.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route(endpoints::ROOT, get(get_root))
        .route(endpoints::DB_CHECK, get(get_db_check))
        .route(
            endpoints::PURCHASES,
            get(list_purchases_endpoint).post(create_purchase_endpoint),
        )
        .route(endpoints::TOP_PRODUCTS, get(top_products_endpoint))
        .fallback(get_404_not_found)
        .layer(cors)
        .with_state(state)
}

async fn get_root() -> Json<MessageBody> {
    Json(MessageBody {
        message: WELCOME_MESSAGE.to_owned(),
    })
}

/// The message sent when the database check fails. The cause is only logged.
pub const DB_UNAVAILABLE_MESSAGE: &str = "Database connection failed";

/// The outcome of a database connectivity check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DbCheckBody {
    /// Either "success" or "error".
    pub status: String,
    /// A human-readable description of the outcome.
    pub message: String,
}

/// Run a trivial query to check that the database is reachable.
async fn get_db_check(State(store): State<PurchaseStore>) -> Response {
    match store.ping() {
        Ok(()) => (
            StatusCode::OK,
            Json(DbCheckBody {
                status: "success".to_owned(),
                message: "Database connection established".to_owned(),
            }),
        )
            .into_response(),
        Err(error) => {
            tracing::error!("database check failed: {error}");

            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(DbCheckBody {
                    status: "error".to_owned(),
                    message: DB_UNAVAILABLE_MESSAGE.to_owned(),
                }),
            )
                .into_response()
        }
    }
}

async fn get_404_not_found() -> Response {
    Error::NotFound.into_response()
}
