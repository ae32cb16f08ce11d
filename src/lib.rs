//! Grocery Ledger is a small web service for recording household grocery
//! purchases and finding out which products are bought most often.
//!
//! This library provides a JSON API backed by an append-only SQLite ledger,
//! plus a typed client for that API.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use serde::{Deserialize, Serialize};
use tokio::signal;

mod app_state;
pub mod client;
mod db;
pub mod endpoints;
mod logging;
pub mod purchase;
mod routing;

pub use app_state::AppState;
pub use db::initialize as initialize_db;
pub use logging::{LOG_BODY_LENGTH_LIMIT, logging_middleware};
pub use purchase::{
    DateWindow, Purchase, PurchaseCandidate, PurchaseStore, TopProducts, ValidationErrors,
    validate_purchase,
};
pub use routing::build_router;

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        if let Err(error) = signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl+C: {error}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut terminate) => {
                terminate.recv().await;
            }
            Err(error) => {
                tracing::error!("failed to install terminate signal handler: {error}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The message sent to clients for any failure that is not their fault.
pub const INTERNAL_ERROR_MESSAGE: &str =
    "An unexpected error occurred, check the server logs for more details.";

/// The body of an error response that is not a validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageBody {
    /// A human-readable description of the outcome.
    pub message: String,
}

/// The errors that may occur in the application.
///
/// Field validation failures are reported separately through
/// [ValidationErrors], since they are the client's to fix.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The request body or query string could not be parsed.
    #[error("could not parse the request: {0}")]
    InvalidRequest(String),

    /// The requested resource was not found.
    #[error("the requested resource could not be found")]
    NotFound,

    /// A new purchase was given an ID that is already in use.
    ///
    /// IDs are assigned by the database, so this indicates a bug or a
    /// corrupted database rather than bad input.
    #[error("the assigned purchase ID already exists in the database")]
    DuplicatePurchaseId,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Error::InvalidRequest(reason) => {
                tracing::debug!("rejecting malformed request: {reason}");
                (StatusCode::BAD_REQUEST, reason)
            }
            Error::NotFound => (
                StatusCode::NOT_FOUND,
                "The requested resource could not be found.".to_owned(),
            ),
            // Any errors that are not handled above are not intended to be shown to the client.
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    INTERNAL_ERROR_MESSAGE.to_owned(),
                )
            }
        };

        (status, Json(MessageBody { message })).into_response()
    }
}
