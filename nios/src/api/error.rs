use thiserror::Error;
use tfplug::context::ContextError;

use super::common::WapiErrorDetails;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned error (HTTP {status}): {message}")]
    ApiError {
        status: u16,
        message: String,
        #[source]
        details: Option<Box<WapiErrorDetails>>,
    },

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("Authentication failed")]
    AuthError,

    #[error("Request timeout after {0} seconds")]
    Timeout(u64),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid object reference: {0}")]
    InvalidRef(String),

    #[error("Request aborted: {0}")]
    Aborted(#[from] ContextError),
}

impl ApiError {
    /// WAPI reports missing objects as 404 or as a `*.NotFound` error code
    pub fn is_not_found(&self) -> bool {
        match self {
            ApiError::ApiError {
                status, details, ..
            } => {
                *status == 404
                    || details
                        .as_ref()
                        .and_then(|d| d.code.as_deref())
                        .is_some_and(|code| code.ends_with("NotFound"))
            }
            _ => false,
        }
    }
}
