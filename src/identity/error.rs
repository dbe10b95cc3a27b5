//! Identity provider error types

use thiserror::Error;

/// Errors raised while obtaining or using a bearer token
#[derive(Error, Debug)]
pub enum AuthError {
    /// Identity provider did not answer in time
    #[error("Identity provider request timed out")]
    Timeout,

    /// Identity provider could not be reached
    #[error("Identity provider unavailable at {0}")]
    Unavailable(String),

    /// Transport level failure
    #[error("Identity provider request failed: {0}")]
    Request(reqwest::Error),

    /// Identity provider answered with an OAuth error
    #[error("Identity provider rejected the request ({status}): {error}{}", .description.as_deref().map(|d| format!(" - {}", d)).unwrap_or_default())]
    Rejected {
        status: u16,
        error: String,
        description: Option<String>,
    },

    /// Response body could not be decoded
    #[error("Unexpected identity provider response: {0}")]
    Parse(String),

    /// Login redirect flow failed
    #[error("Browser login failed: {0}")]
    BrowserFlow(String),

    /// No usable session and login was not attempted
    #[error("Not logged in")]
    NotLoggedIn,

    /// Token cannot be refreshed (static token or no refresh token)
    #[error("Token expired and cannot be refreshed")]
    NotRefreshable,

    /// Token file could not be read or written
    #[error("Token store error: {0}")]
    TokenStore(String),
}

impl AuthError {
    pub(crate) fn from_reqwest(err: reqwest::Error, url: &str) -> Self {
        if err.is_timeout() {
            AuthError::Timeout
        } else if err.is_connect() {
            AuthError::Unavailable(url.to_string())
        } else {
            AuthError::Request(err)
        }
    }
}

/// Result type alias for identity operations
pub type AuthResult<T> = Result<T, AuthError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AuthError::Rejected {
            status: 400,
            error: "invalid_grant".to_string(),
            description: Some("Token is not active".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "Identity provider rejected the request (400): invalid_grant - Token is not active"
        );

        let err = AuthError::Rejected {
            status: 401,
            error: "unauthorized_client".to_string(),
            description: None,
        };
        assert_eq!(
            err.to_string(),
            "Identity provider rejected the request (401): unauthorized_client"
        );
    }
}
