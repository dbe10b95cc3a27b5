//! Token sets issued by the identity provider

use chrono::{DateTime, Duration, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use super::error::{AuthError, AuthResult};

/// Seconds before expiry at which a token is refreshed
pub const REFRESH_BUFFER_SECS: i64 = 30;

/// Raw token endpoint response
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub expires_in: i64,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub refresh_expires_in: Option<i64>,
    #[serde(default)]
    pub id_token: Option<String>,
}

/// Tokens held by a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenSet {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub id_token: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub refresh_expires_at: Option<DateTime<Utc>>,
}

impl TokenSet {
    pub fn from_response(response: TokenResponse) -> AuthResult<Self> {
        let now = Utc::now();
        let expires_at = expiry(now, response.expires_in)?;
        // Keycloak reports 0 for offline tokens that never expire
        let refresh_expires_at = response
            .refresh_expires_in
            .filter(|secs| *secs > 0)
            .map(|secs| expiry(now, secs))
            .transpose()?;

        Ok(Self {
            access_token: response.access_token,
            refresh_token: response.refresh_token,
            id_token: response.id_token,
            expires_at,
            refresh_expires_at,
        })
    }

    /// True when the access token expires within `buffer_secs`
    pub fn is_near_expiry(&self, buffer_secs: i64) -> bool {
        self.expires_at <= Utc::now() + Duration::seconds(buffer_secs)
    }

    pub fn is_expired(&self) -> bool {
        self.is_near_expiry(0)
    }

    /// True when a refresh token exists and has not expired
    pub fn can_refresh(&self) -> bool {
        match (&self.refresh_token, self.refresh_expires_at) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(_), Some(at)) => at > Utc::now(),
        }
    }

    /// Keep the previous refresh token when the provider does not rotate it
    pub fn merge_refresh(mut self, previous: &TokenSet) -> Self {
        if self.refresh_token.is_none() {
            self.refresh_token = previous.refresh_token.clone();
            self.refresh_expires_at = previous.refresh_expires_at;
        }
        if self.id_token.is_none() {
            self.id_token = previous.id_token.clone();
        }
        self
    }
}

fn expiry(now: DateTime<Utc>, secs: i64) -> AuthResult<DateTime<Utc>> {
    TimeDelta::try_seconds(secs)
        .and_then(|delta| now.checked_add_signed(delta))
        .ok_or_else(|| AuthError::Parse(format!("token lifetime out of range: {} seconds", secs)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token_expiring_in(secs: i64) -> TokenSet {
        TokenSet {
            access_token: "access".to_string(),
            refresh_token: Some("refresh".to_string()),
            id_token: None,
            expires_at: Utc::now() + Duration::seconds(secs),
            refresh_expires_at: None,
        }
    }

    #[test]
    fn test_is_near_expiry() {
        assert!(!token_expiring_in(300).is_near_expiry(REFRESH_BUFFER_SECS));
        assert!(token_expiring_in(10).is_near_expiry(REFRESH_BUFFER_SECS));
        assert!(token_expiring_in(-5).is_expired());
        assert!(!token_expiring_in(60).is_expired());
    }

    #[test]
    fn test_from_response() {
        let set = TokenSet::from_response(TokenResponse {
            access_token: "a".to_string(),
            expires_in: 300,
            refresh_token: Some("r".to_string()),
            refresh_expires_in: Some(0),
            id_token: None,
        })
        .unwrap();
        assert!(!set.is_near_expiry(REFRESH_BUFFER_SECS));
        assert!(set.refresh_expires_at.is_none());
        assert!(set.can_refresh());
    }

    #[test]
    fn test_out_of_range_lifetime_is_rejected() {
        let response: TokenResponse =
            serde_json::from_str(r#"{"access_token":"a","expires_in":9223372036854775807}"#).unwrap();
        assert!(matches!(TokenSet::from_response(response), Err(AuthError::Parse(_))));

        let response: TokenResponse = serde_json::from_str(
            r#"{"access_token":"a","expires_in":300,"refresh_token":"r","refresh_expires_in":9223372036854775807}"#,
        )
        .unwrap();
        assert!(matches!(TokenSet::from_response(response), Err(AuthError::Parse(_))));
    }

    #[test]
    fn test_can_refresh() {
        let mut set = token_expiring_in(0);
        set.refresh_expires_at = Some(Utc::now() - Duration::seconds(1));
        assert!(!set.can_refresh());

        set.refresh_token = None;
        set.refresh_expires_at = None;
        assert!(!set.can_refresh());
    }

    #[test]
    fn test_merge_refresh_keeps_previous_refresh_token() {
        let previous = token_expiring_in(0);
        let mut fresh = token_expiring_in(300);
        fresh.refresh_token = None;
        fresh.access_token = "new".to_string();

        let merged = fresh.merge_refresh(&previous);
        assert_eq!(merged.access_token, "new");
        assert_eq!(merged.refresh_token.as_deref(), Some("refresh"));
    }
}
