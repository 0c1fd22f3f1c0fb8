use thiserror::Error;

use crate::items::ItemNumber;

/// Failure of a single HTTP exchange.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request failed")]
    Request(#[from] reqwest::Error),
    #[error("server responded with status {0}")]
    Status(reqwest::StatusCode),
    #[error("response body is not valid JSON")]
    Json(#[from] serde_json::Error),
}

/// Errors that abort a report.
///
/// None of these are retried. Any of them means no report is printed.
#[derive(Debug, Error)]
pub enum Error {
    #[error("could not create HTTP client")]
    Client(#[source] reqwest::Error),
    #[error("authentication failed")]
    Authentication(#[source] TransportError),
    #[error("authentication failed: login response has no `Uid` token")]
    MissingToken,
    #[error("authentication failed: login token cannot be sent as an HTTP header")]
    InvalidToken,
    #[error("fetching receipts failed")]
    Fetch(#[source] TransportError),
    #[error("fetching receipts failed: expected a JSON array of receipts, got {found}")]
    NotAnArray { found: &'static str },
    #[error("malformed receipt at index {index}")]
    Parse {
        index: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("receipt {index}: total price of item {item} is too large to add up")]
    Overflow { index: usize, item: ItemNumber },
}

pub type Result<T> = std::result::Result<T, Error>;
