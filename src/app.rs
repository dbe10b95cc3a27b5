//! Bootstrap shared by the panel binaries
//!
//! Wires the configuration into an identity provider, a token store and the
//! two HTTP clients the pages talk through.

use std::sync::Arc;

use crate::adapter::{ApiAdapter, ApiClientResult};
use crate::config::Config;
use crate::data_api::{DataApiClient, DataApiResult};
use crate::identity::{
    authenticate, logout_stored, AuthError, AuthResult, IdentityProvider, Session, StaticToken,
    TokenSource, TokenStore,
};

pub struct App {
    config: Config,
    provider: Arc<IdentityProvider>,
    store: TokenStore,
}

impl App {
    /// Use the default token location under the user's config directory
    pub fn new(config: Config) -> AuthResult<Self> {
        let store = TokenStore::default_location()?;
        Self::with_store(config, store)
    }

    pub fn with_store(config: Config, store: TokenStore) -> AuthResult<Self> {
        let provider = Arc::new(IdentityProvider::new(config.identity.clone())?);
        Ok(Self {
            config,
            provider,
            store,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn provider(&self) -> &IdentityProvider {
        &self.provider
    }

    pub fn token_store(&self) -> &TokenStore {
        &self.store
    }

    pub fn account_url(&self) -> String {
        self.provider.account_url()
    }

    /// Bearer token for the pages; logs in through the browser when `interactive`
    pub async fn token(&self, interactive: bool) -> AuthResult<Arc<dyn TokenSource>> {
        authenticate(Arc::clone(&self.provider), self.store.clone(), interactive).await
    }

    /// Stored token when there is one, otherwise an anonymous caller
    ///
    /// For the endpoints that answer without authorization.
    pub async fn optional_token(&self) -> AuthResult<Arc<dyn TokenSource>> {
        match self.token(false).await {
            Err(AuthError::NotLoggedIn) => Ok(Arc::new(StaticToken::new(""))),
            other => other,
        }
    }

    /// Always runs the browser login, replacing any stored session
    pub async fn login(&self) -> AuthResult<()> {
        Session::login(Arc::clone(&self.provider), self.store.clone()).await?;
        tracing::info!(path = ?self.store.path(), "Stored new session");
        Ok(())
    }

    /// False when nobody was logged in
    pub async fn logout(&self) -> AuthResult<bool> {
        logout_stored(&self.provider, &self.store).await
    }

    pub fn data_api(&self, token: Arc<dyn TokenSource>) -> DataApiResult<DataApiClient> {
        DataApiClient::new(&self.config.data_api, token)
    }

    pub fn api(&self, token: Arc<dyn TokenSource>) -> ApiClientResult<ApiAdapter> {
        ApiAdapter::new(&self.config.api, token)
    }
}
