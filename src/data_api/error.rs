//! Data API error types

use serde::Deserialize;
use thiserror::Error;

use crate::identity::AuthError;

/// Errors returned by the data API client
#[derive(Error, Debug)]
pub enum DataApiError {
    /// Request timed out
    #[error("Data API request timed out")]
    Timeout,

    /// Data API could not be reached
    #[error("Data API unavailable at {0}")]
    Unavailable(String),

    /// Transport level failure
    #[error("Data API request failed: {0}")]
    Request(reqwest::Error),

    /// Data API rejected the request
    #[error("Data API error ({status}): {message}")]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
        details: Option<String>,
        hint: Option<String>,
    },

    /// No bearer token available
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Response body did not match the expected shape
    #[error("Failed to decode data API response: {0}")]
    Decode(String),
}

impl DataApiError {
    pub(crate) fn from_reqwest(err: reqwest::Error, url: &str) -> Self {
        if err.is_timeout() {
            DataApiError::Timeout
        } else if err.is_connect() {
            DataApiError::Unavailable(url.to_string())
        } else if err.is_decode() {
            DataApiError::Decode(err.to_string())
        } else {
            DataApiError::Request(err)
        }
    }

    /// Build an API error from a non-2xx response body
    pub(crate) fn from_body(status: u16, body: &str) -> Self {
        #[derive(Deserialize)]
        struct ErrorBody {
            #[serde(default)]
            code: Option<String>,
            #[serde(default)]
            message: Option<String>,
            #[serde(default)]
            details: Option<String>,
            #[serde(default)]
            hint: Option<String>,
        }

        match serde_json::from_str::<ErrorBody>(body) {
            Ok(parsed) => DataApiError::Api {
                status,
                code: parsed.code,
                message: parsed.message.unwrap_or_else(|| body.to_string()),
                details: parsed.details,
                hint: parsed.hint,
            },
            Err(_) => DataApiError::Api {
                status,
                code: None,
                message: body.to_string(),
                details: None,
                hint: None,
            },
        }
    }

    /// Unique constraint violation (duplicate member number)
    pub fn is_conflict(&self) -> bool {
        matches!(self, DataApiError::Api { status: 409, .. })
            || matches!(self, DataApiError::Api { code: Some(code), .. } if code == "23505")
    }
}

/// Result type alias for data API operations
pub type DataApiResult<T> = Result<T, DataApiError>;
