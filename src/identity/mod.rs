//! Identity Provider Integration
//!
//! Obtains and maintains the bearer token the panels attach to every
//! request. Talks to a Keycloak realm's standard OpenID Connect endpoints:
//!
//! - authorization (login redirect flow, see [`browser_flow`])
//! - token (code exchange, refresh)
//! - userinfo
//! - end-session (logout)
//!
//! Token resolution order used by [`authenticate`]:
//! `MEMBERSHIP_TOKEN` environment variable, stored session (refreshed when
//! close to expiry), then an interactive browser login.

pub mod browser_flow;
pub mod error;
pub mod session;
pub mod store;
pub mod token;

pub use error::{AuthError, AuthResult};
pub use session::{Session, StaticToken, TokenSource};
pub use store::{env_token, TokenStore, TOKEN_ENV_VAR};
pub use token::{TokenResponse, TokenSet, REFRESH_BUFFER_SECS};

use reqwest::{Client, Response};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use crate::config::IdentityConfig;
use crate::model::UserInfo;
use browser_flow::{AuthorizationCode, CallbackListener};

/// Scopes requested at login
const LOGIN_SCOPE: &str = "openid profile email";

/// Client for one realm of the identity provider
pub struct IdentityProvider {
    client: Client,
    config: IdentityConfig,
}

/// OAuth error body
#[derive(Debug, Deserialize)]
struct OAuthErrorBody {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

impl IdentityProvider {
    pub fn new(config: IdentityConfig) -> AuthResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(AuthError::Request)?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &IdentityConfig {
        &self.config
    }

    /// `{url}/realms/{realm}`, also the token issuer
    pub fn realm_url(&self) -> String {
        format!(
            "{}/realms/{}",
            self.config.url.trim_end_matches('/'),
            self.config.realm
        )
    }

    fn endpoint(&self, name: &str) -> String {
        format!("{}/protocol/openid-connect/{}", self.realm_url(), name)
    }

    pub fn token_url(&self) -> String {
        self.endpoint("token")
    }

    pub fn userinfo_url(&self) -> String {
        self.endpoint("userinfo")
    }

    pub fn logout_url(&self) -> String {
        self.endpoint("logout")
    }

    pub fn certs_url(&self) -> String {
        self.endpoint("certs")
    }

    /// Account console where users edit their profile
    pub fn account_url(&self) -> String {
        format!("{}/account", self.realm_url())
    }

    /// Authorization endpoint URL the browser is sent to
    pub fn authorization_url(&self, redirect_uri: &str, state: &str) -> String {
        format!(
            "{}?response_type=code&client_id={}&redirect_uri={}&scope={}&state={}",
            self.endpoint("auth"),
            urlencoding::encode(&self.config.client_id),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(LOGIN_SCOPE),
            urlencoding::encode(state)
        )
    }

    /// Run the login redirect flow and exchange the code for tokens
    pub async fn login(&self) -> AuthResult<TokenSet> {
        let listener = CallbackListener::bind(self.config.redirect_port)?;
        let url = self.authorization_url(&listener.redirect_uri(), listener.state());

        browser_flow::open_browser(&url);

        let code = listener
            .wait(Duration::from_secs(self.config.login_timeout_secs))
            .await?;

        let tokens = self.exchange_code(&code).await?;
        tracing::info!(realm = %self.config.realm, "Logged in");
        Ok(tokens)
    }

    /// Exchange an authorization code at the token endpoint
    pub async fn exchange_code(&self, code: &AuthorizationCode) -> AuthResult<TokenSet> {
        self.token_request(&[
            ("grant_type", "authorization_code"),
            ("code", code.code.as_str()),
            ("redirect_uri", code.redirect_uri.as_str()),
        ])
        .await
    }

    /// Refresh an access token
    pub async fn refresh(&self, tokens: &TokenSet) -> AuthResult<TokenSet> {
        let refresh_token = tokens
            .refresh_token
            .as_deref()
            .ok_or(AuthError::NotRefreshable)?;

        let fresh = self
            .token_request(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ])
            .await?;

        tracing::debug!(expires_at = %fresh.expires_at, "Refreshed access token");
        Ok(fresh.merge_refresh(tokens))
    }

    /// Load the signed-in user's profile
    pub async fn load_user_info(&self, access_token: &str) -> AuthResult<UserInfo> {
        let url = self.userinfo_url();
        let response = self
            .client
            .get(&url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AuthError::from_reqwest(e, &url))?;

        let response = Self::check(response).await?;
        response
            .json()
            .await
            .map_err(|e| AuthError::Parse(e.to_string()))
    }

    /// End the session at the identity provider
    pub async fn logout(&self, tokens: &TokenSet) -> AuthResult<()> {
        let Some(refresh_token) = tokens.refresh_token.as_deref() else {
            return Ok(());
        };

        let url = self.logout_url();
        let response = self
            .client
            .post(&url)
            .form(&self.client_form(&[("refresh_token", refresh_token)]))
            .send()
            .await
            .map_err(|e| AuthError::from_reqwest(e, &url))?;

        Self::check(response).await?;
        tracing::info!(realm = %self.config.realm, "Logged out");
        Ok(())
    }

    fn client_form<'a>(&'a self, params: &[(&'a str, &'a str)]) -> Vec<(&'a str, &'a str)> {
        let mut form = vec![("client_id", self.config.client_id.as_str())];
        if let Some(secret) = self.config.client_secret.as_deref() {
            form.push(("client_secret", secret));
        }
        form.extend_from_slice(params);
        form
    }

    async fn token_request(&self, params: &[(&str, &str)]) -> AuthResult<TokenSet> {
        let url = self.token_url();
        let response = self
            .client
            .post(&url)
            .form(&self.client_form(params))
            .send()
            .await
            .map_err(|e| AuthError::from_reqwest(e, &url))?;

        let response = Self::check(response).await?;
        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::Parse(e.to_string()))?;

        TokenSet::from_response(body)
    }

    async fn check(response: Response) -> AuthResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        let (error, description) = match serde_json::from_str::<OAuthErrorBody>(&text) {
            Ok(body) => (body.error, body.error_description),
            Err(_) => (
                status.canonical_reason().unwrap_or("error").to_string(),
                Some(text).filter(|t| !t.is_empty()),
            ),
        };

        Err(AuthError::Rejected {
            status: status.as_u16(),
            error,
            description,
        })
    }
}

/// Resolve a bearer token for the panels
///
/// With `interactive` false a missing session fails with
/// [`AuthError::NotLoggedIn`] instead of opening the browser.
pub async fn authenticate(
    provider: Arc<IdentityProvider>,
    store: TokenStore,
    interactive: bool,
) -> AuthResult<Arc<dyn TokenSource>> {
    if let Some(token) = env_token() {
        tracing::debug!("Using bearer token from {}", TOKEN_ENV_VAR);
        return Ok(Arc::new(StaticToken::new(token)));
    }

    if let Some(session) = Session::resume(Arc::clone(&provider), store.clone()).await? {
        return Ok(Arc::new(session));
    }

    if !interactive {
        return Err(AuthError::NotLoggedIn);
    }

    let session = Session::login(provider, store).await?;
    Ok(Arc::new(session))
}

/// End the stored session at the provider and delete it
///
/// Returns false when no session was stored.
pub async fn logout_stored(provider: &IdentityProvider, store: &TokenStore) -> AuthResult<bool> {
    let Some(tokens) = store.load()? else {
        return Ok(false);
    };
    let result = provider.logout(&tokens).await;
    store.delete()?;
    result.map(|_| true)
}
