//! Error types for the flow relay.

use thiserror::Error;

/// Result type alias for relay operations
pub type RelayResult<T> = Result<T, RelayError>;

/// Errors raised while resolving a flow or talking to the flow API.
#[derive(Error, Debug)]
pub enum RelayError {
    /// The flow API answered with anything other than 200.
    /// `detail` is the decoded JSON body, or the raw text when it is not JSON.
    #[error("{status}: {detail}")]
    Vendor {
        status: u16,
        detail: serde_json::Value,
    },

    #[error("Flow API request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Flow cache IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No valid flow ID found")]
    NoFlowId,
}

impl RelayError {
    /// Builds a `Vendor` error from a status and raw body, keeping the body as JSON when it parses.
    pub fn vendor(status: u16, body: &[u8]) -> Self {
        let detail = serde_json::from_slice(body).unwrap_or_else(|_| {
            serde_json::Value::String(String::from_utf8_lossy(body).into_owned())
        });
        RelayError::Vendor { status, detail }
    }
}
