//! Bearer Token Authorization
//!
//! Tokens are RS256 JWTs issued by the identity provider realm. The signing
//! key comes from the realm's JWKS endpoint at startup; client roles are read
//! from `resource_access[client_id].roles`.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::convert::Infallible;
use std::fmt;
use thiserror::Error;

use crate::config::IdentityConfig;

/// Client roles checked by the membership API
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    ListMembers,
    ViewMember,
    ManageMembers,
    ListWorkplaces,
    ManageWorkplaces,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::ListMembers => "list-members",
            Role::ViewMember => "view-member",
            Role::ManageMembers => "manage-members",
            Role::ListWorkplaces => "list-workplaces",
            Role::ManageWorkplaces => "manage-workplaces",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoleList {
    #[serde(default)]
    pub roles: Vec<String>,
}

/// Claims of a validated access token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_username: Option<String>,
    #[serde(default)]
    pub resource_access: HashMap<String, RoleList>,
    /// Everything else the provider put in the token
    #[serde(flatten)]
    pub other: serde_json::Map<String, serde_json::Value>,
}

impl Claims {
    /// Stand-in identity when authorization is switched off
    pub fn anonymous() -> Self {
        Self {
            sub: "anonymous".to_string(),
            email: None,
            name: None,
            preferred_username: None,
            resource_access: HashMap::new(),
            other: serde_json::Map::new(),
        }
    }

    pub fn has_role(&self, client_id: &str, role: Role) -> bool {
        self.resource_access
            .get(client_id)
            .map_or(false, |access| access.roles.iter().any(|r| r == role.as_str()))
    }
}

/// Authorization failures
#[derive(Error, Debug)]
pub enum AuthzError {
    /// No identity provider configured
    #[error("Authorization is not configured")]
    Disabled,

    #[error("Expects authorization header")]
    MissingToken,

    #[error("Bad token: {0}")]
    BadToken(#[from] jsonwebtoken::errors::Error),

    #[error("Token is missing role {0}")]
    MissingRole(Role),

    #[error("Token is missing one of roles {}", join_roles(.0))]
    MissingOneOfRoles(Vec<Role>),

    /// Signing key could not be obtained
    #[error("Bad key: {0}")]
    BadKey(String),
}

fn join_roles(roles: &[Role]) -> String {
    roles
        .iter()
        .map(Role::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

struct Verifier {
    key: DecodingKey,
    validation: Validation,
    client_id: String,
}

enum Mode {
    /// Protected routes answer 404
    Disabled,
    /// Every request is let through
    Open,
    Verify(Box<Verifier>),
}

/// Checks bearer tokens and client roles
pub struct Authorizer(Mode);

impl Authorizer {
    pub fn disabled() -> Self {
        tracing::warn!("Identity provider not configured, authorization disabled");
        Authorizer(Mode::Disabled)
    }

    pub fn open() -> Self {
        tracing::warn!("Authorization switched off, all requests are allowed");
        Authorizer(Mode::Open)
    }

    /// Verify tokens with an explicit key and validation rules
    pub fn with_key(key: DecodingKey, validation: Validation, client_id: impl Into<String>) -> Self {
        Authorizer(Mode::Verify(Box::new(Verifier {
            key,
            validation,
            client_id: client_id.into(),
        })))
    }

    /// Fetch the realm's signing key
    pub async fn connect(config: &IdentityConfig) -> Result<Self, AuthzError> {
        let issuer = format!("{}/realms/{}", config.url.trim_end_matches('/'), config.realm);
        let key = fetch_jwk(&format!("{}/protocol/openid-connect/certs", issuer)).await?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[issuer.as_str()]);
        // Keycloak access tokens carry `aud: account`, not the client id
        validation.validate_aud = false;

        tracing::info!(issuer = %issuer, client_id = %config.client_id, "Authorization connected");
        Ok(Self::with_key(key, validation, config.client_id.clone()))
    }

    /// Pick the mode matching the server configuration
    pub async fn init(identity: &IdentityConfig, require_auth: bool) -> Result<Self, AuthzError> {
        if !require_auth {
            return Ok(Self::open());
        }
        if identity.url.trim().is_empty() {
            return Ok(Self::disabled());
        }
        Self::connect(identity).await
    }

    pub fn is_connected(&self) -> bool {
        matches!(self.0, Mode::Verify(_))
    }

    /// Validate the token without checking roles
    pub fn decode(&self, token: Option<&str>) -> Result<Claims, AuthzError> {
        match &self.0 {
            Mode::Disabled => Err(AuthzError::Disabled),
            Mode::Open => Ok(Claims::anonymous()),
            Mode::Verify(verifier) => {
                let token = token.ok_or(AuthzError::MissingToken)?;
                jsonwebtoken::decode::<Claims>(token, &verifier.key, &verifier.validation)
                    .map(|data| data.claims)
                    .map_err(|e| {
                        tracing::warn!(error = %e, "Failed to decode access token");
                        AuthzError::BadToken(e)
                    })
            }
        }
    }

    pub fn require_role(&self, token: Option<&str>, role: Role) -> Result<Claims, AuthzError> {
        self.require_any_role(token, &[role]).map_err(|e| match e {
            AuthzError::MissingOneOfRoles(_) => AuthzError::MissingRole(role),
            other => other,
        })
    }

    pub fn require_any_role(&self, token: Option<&str>, roles: &[Role]) -> Result<Claims, AuthzError> {
        let claims = self.decode(token)?;
        let verifier = match &self.0 {
            Mode::Verify(verifier) => verifier,
            _ => return Ok(claims),
        };

        if roles.iter().any(|role| claims.has_role(&verifier.client_id, *role)) {
            Ok(claims)
        } else {
            Err(AuthzError::MissingOneOfRoles(roles.to_vec()))
        }
    }
}

#[derive(Deserialize)]
struct JwkSet {
    keys: Vec<Jwk>,
}

#[derive(Deserialize)]
struct Jwk {
    #[serde(default, rename = "use")]
    usage: Option<String>,
    #[serde(default)]
    n: Option<String>,
    #[serde(default)]
    e: Option<String>,
}

/// Download the realm JWKS and take its signing key
pub async fn fetch_jwk(url: &str) -> Result<DecodingKey, AuthzError> {
    let response = reqwest::get(url)
        .await
        .and_then(|r| r.error_for_status())
        .map_err(|e| AuthzError::BadKey(format!("{}: {}", url, e)))?;

    let set: JwkSet = response
        .json()
        .await
        .map_err(|e| AuthzError::BadKey(format!("invalid JWKS from {}: {}", url, e)))?;

    let (n, e) = set
        .keys
        .into_iter()
        .filter(|k| k.usage.as_deref() == Some("sig"))
        .find_map(|k| Some((k.n?, k.e?)))
        .ok_or_else(|| AuthzError::BadKey(format!("no RSA signing key at {}", url)))?;

    DecodingKey::from_rsa_components(&n, &e).map_err(|e| AuthzError::BadKey(e.to_string()))
}

/// Raw token from the `Authorization: Bearer` header, if any
#[derive(Debug, Clone)]
pub struct BearerToken(pub Option<String>);

impl BearerToken {
    pub fn as_deref(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());
        Ok(BearerToken(token))
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    #[test]
    fn test_role_checks() {
        let authorizer = authorizer();
        let token = token_with_roles(&[Role::ViewMember]);

        let claims = authorizer.require_role(Some(&token), Role::ViewMember).unwrap();
        assert_eq!(claims.preferred_username.as_deref(), Some("admin"));
        assert!(claims.other.contains_key("exp"));

        assert!(matches!(
            authorizer.require_role(Some(&token), Role::ManageMembers),
            Err(AuthzError::MissingRole(Role::ManageMembers))
        ));
        assert!(authorizer
            .require_any_role(Some(&token), &[Role::ListMembers, Role::ViewMember])
            .is_ok());
    }

    #[test]
    fn test_bad_and_missing_token() {
        let authorizer = authorizer();
        assert!(matches!(authorizer.decode(None), Err(AuthzError::MissingToken)));
        assert!(matches!(
            authorizer.decode(Some("not-a-jwt")),
            Err(AuthzError::BadToken(_))
        ));
    }

    #[test]
    fn test_disabled_and_open() {
        let token = token_with_roles(&[]);
        assert!(matches!(
            Authorizer::disabled().require_role(Some(&token), Role::ListMembers),
            Err(AuthzError::Disabled)
        ));

        let claims = Authorizer::open().require_role(None, Role::ManageMembers).unwrap();
        assert_eq!(claims.sub, "anonymous");
    }

    async fn bearer_from(header: Option<&str>) -> Option<String> {
        let mut request = axum::http::Request::builder();
        if let Some(value) = header {
            request = request.header(AUTHORIZATION, value);
        }
        let (mut parts, _) = request.body(()).unwrap().into_parts();
        BearerToken::from_request_parts(&mut parts, &()).await.unwrap().0
    }

    #[tokio::test]
    async fn test_bearer_header_parsing() {
        assert_eq!(bearer_from(Some("Bearer abc.def")).await.as_deref(), Some("abc.def"));
        assert_eq!(bearer_from(Some("Bearer  abc ")).await.as_deref(), Some("abc"));
        assert_eq!(bearer_from(Some("Bearerabc")).await, None);
        assert_eq!(bearer_from(Some("Bearer BearerBearer")).await.as_deref(), Some("BearerBearer"));
        assert_eq!(bearer_from(Some("Basic dXNlcjpwdw==")).await, None);
        assert_eq!(bearer_from(Some("Bearer ")).await, None);
        assert_eq!(bearer_from(None).await, None);
    }

    #[tokio::test]
    async fn test_fetch_jwk_without_signing_key() {
        use axum::{routing::get, Json, Router};

        let router = Router::new().route(
            "/certs",
            get(|| async { Json(serde_json::json!({"keys": [{"use": "enc", "n": "AQAB", "e": "AQAB"}]})) }),
        );
        let url = crate::test_support::spawn_stub(router).await;

        let err = fetch_jwk(&format!("{}/certs", url)).await.err().unwrap();
        assert!(matches!(err, AuthzError::BadKey(_)));
    }
}
