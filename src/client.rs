//! A typed client for the purchase API.
//!
//! The client only fetches when asked to. Callers that display purchases
//! should fetch again after recording one and replace what they show.

use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;

use crate::{
    MessageBody, endpoints,
    purchase::{
        DateWindow, FieldError, Purchase, PurchaseCandidate, TopProducts, ValidationErrorBody,
    },
};

/// The errors a [PurchaseClient] can return.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The service could not be reached, or the connection failed mid-request.
    #[error("could not reach the purchase service")]
    TransportUnavailable(#[source] reqwest::Error),

    /// The service rejected one or more fields of the request.
    #[error("the request had {} invalid field(s)", .0.len())]
    Validation(Vec<FieldError>),

    /// The service failed in some other way, with a message suitable for display.
    #[error("the purchase service failed: {0}")]
    Unexpected(String),
}

impl From<reqwest::Error> for ClientError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_connect() || error.is_timeout() || error.is_request() {
            ClientError::TransportUnavailable(error)
        } else {
            ClientError::Unexpected(error.to_string())
        }
    }
}

/// A client for a running purchase service.
#[derive(Debug, Clone)]
pub struct PurchaseClient {
    http: reqwest::Client,
    base_url: String,
}

impl PurchaseClient {
    /// Create a client for the service at `base_url`, e.g. "http://localhost:8000".
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_owned(),
        }
    }

    /// Record a purchase and return it as stored.
    ///
    /// # Errors
    /// Returns [ClientError::Validation] with one entry per invalid field if
    /// the purchase was rejected.
    pub async fn create(&self, candidate: &PurchaseCandidate) -> Result<Purchase, ClientError> {
        let response = self
            .http
            .post(self.url(endpoints::PURCHASES))
            .json(candidate)
            .send()
            .await?;

        parse_response(response).await
    }

    /// Fetch every purchase, oldest first.
    ///
    /// # Errors
    /// Returns an error if the service cannot be reached or fails.
    pub async fn list(&self) -> Result<Vec<Purchase>, ClientError> {
        let response = self.http.get(self.url(endpoints::PURCHASES)).send().await?;

        parse_response(response).await
    }

    /// Fetch the most purchased products in `window`.
    ///
    /// # Errors
    /// Returns an error if the service cannot be reached or fails.
    pub async fn top_products(&self, window: DateWindow) -> Result<TopProducts, ClientError> {
        let mut query = Vec::new();
        if let Some(start) = window.start {
            query.push(("start_date", start.to_string()));
        }
        if let Some(end) = window.end {
            query.push(("end_date", end.to_string()));
        }

        let response = self
            .http
            .get(self.url(endpoints::TOP_PRODUCTS))
            .query(&query)
            .send()
            .await?;

        parse_response(response).await
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{endpoint}", self.base_url)
    }
}

async fn parse_response<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let status = response.status();

    if status.is_success() {
        return Ok(response.json::<T>().await?);
    }

    let body = response.bytes().await?;

    if status == StatusCode::UNPROCESSABLE_ENTITY {
        if let Ok(body) = serde_json::from_slice::<ValidationErrorBody>(&body) {
            return Err(ClientError::Validation(body.errors));
        }
    }

    let message = serde_json::from_slice::<MessageBody>(&body)
        .map(|body| body.message)
        .unwrap_or_else(|_| status.to_string());

    Err(ClientError::Unexpected(message))
}
