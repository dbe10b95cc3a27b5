//! Membership API client errors

use thiserror::Error;

use crate::api::error::ErrorResponse;
use crate::identity::AuthError;

#[derive(Error, Debug)]
pub enum ApiClientError {
    #[error("Membership API request timed out")]
    Timeout,

    #[error("Membership API unavailable at {0}")]
    Unavailable(String),

    #[error("Membership API request failed: {0}")]
    Request(reqwest::Error),

    /// Non-2xx answer, decoded from the server's error body when possible
    #[error("Membership API error ({status} {reason}): {description}")]
    Api {
        status: u16,
        reason: String,
        description: String,
    },

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Failed to decode membership API response: {0}")]
    Decode(String),
}

impl ApiClientError {
    pub(crate) fn from_reqwest(err: reqwest::Error, url: &str) -> Self {
        if err.is_timeout() {
            ApiClientError::Timeout
        } else if err.is_connect() {
            ApiClientError::Unavailable(url.to_string())
        } else if err.is_decode() {
            ApiClientError::Decode(err.to_string())
        } else {
            ApiClientError::Request(err)
        }
    }

    pub(crate) fn from_body(status: u16, body: &str) -> Self {
        match serde_json::from_str::<ErrorResponse>(body) {
            Ok(parsed) => ApiClientError::Api {
                status,
                reason: parsed.error.reason,
                description: parsed.error.description,
            },
            Err(_) => ApiClientError::Api {
                status,
                reason: reqwest::StatusCode::from_u16(status)
                    .ok()
                    .and_then(|s| s.canonical_reason())
                    .unwrap_or("Error")
                    .to_string(),
                description: body.to_string(),
            },
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiClientError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type ApiClientResult<T> = Result<T, ApiClientError>;
