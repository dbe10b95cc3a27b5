//! Bearer token sources
//!
//! Clients only need "a token right now"; [`TokenSource`] hides whether it
//! comes from the environment or from a refreshable login session.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::error::{AuthError, AuthResult};
use super::store::TokenStore;
use super::token::{TokenSet, REFRESH_BUFFER_SECS};
use super::IdentityProvider;

/// Anything that can hand out a bearer token
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// Current access token, refreshed first if needed
    async fn bearer_token(&self) -> AuthResult<String>;
}

/// Fixed token, typically from `MEMBERSHIP_TOKEN`
#[derive(Debug, Clone)]
pub struct StaticToken {
    token: String,
}

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl TokenSource for StaticToken {
    async fn bearer_token(&self) -> AuthResult<String> {
        Ok(self.token.clone())
    }
}

/// Login session that refreshes itself and persists new tokens
pub struct Session {
    provider: Arc<IdentityProvider>,
    store: Option<TokenStore>,
    tokens: Mutex<TokenSet>,
}

impl Session {
    pub fn new(provider: Arc<IdentityProvider>, tokens: TokenSet, store: Option<TokenStore>) -> Self {
        Self {
            provider,
            store,
            tokens: Mutex::new(tokens),
        }
    }

    /// Interactive login, tokens are persisted to `store`
    pub async fn login(provider: Arc<IdentityProvider>, store: TokenStore) -> AuthResult<Self> {
        let tokens = provider.login().await?;
        store.save(&tokens)?;
        Ok(Self::new(provider, tokens, Some(store)))
    }

    /// Pick up the stored session if it is still usable
    ///
    /// Returns `None` when nothing is stored or the stored tokens can no
    /// longer be refreshed; the caller decides whether to log in again.
    pub async fn resume(provider: Arc<IdentityProvider>, store: TokenStore) -> AuthResult<Option<Self>> {
        let Some(tokens) = store.load()? else {
            return Ok(None);
        };

        if !tokens.is_near_expiry(REFRESH_BUFFER_SECS) {
            return Ok(Some(Self::new(provider, tokens, Some(store))));
        }

        if !tokens.can_refresh() {
            tracing::info!("Stored session expired");
            return Ok(None);
        }

        match provider.refresh(&tokens).await {
            Ok(fresh) => {
                store.save(&fresh)?;
                Ok(Some(Self::new(provider, fresh, Some(store))))
            }
            Err(AuthError::Rejected { error, .. }) => {
                tracing::info!(%error, "Stored session no longer accepted");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    pub async fn tokens(&self) -> TokenSet {
        self.tokens.lock().await.clone()
    }

    /// Force a refresh regardless of expiry
    pub async fn refresh(&self) -> AuthResult<()> {
        let mut tokens = self.tokens.lock().await;
        self.refresh_locked(&mut tokens).await
    }

    async fn refresh_locked(&self, tokens: &mut TokenSet) -> AuthResult<()> {
        if !tokens.can_refresh() {
            return Err(AuthError::NotRefreshable);
        }
        let fresh = self.provider.refresh(tokens).await?;
        if let Some(store) = &self.store {
            store.save(&fresh)?;
        }
        *tokens = fresh;
        Ok(())
    }

    /// End the session at the provider and forget the stored tokens
    pub async fn logout(self) -> AuthResult<()> {
        let tokens = self.tokens.into_inner();
        let result = self.provider.logout(&tokens).await;
        if let Some(store) = &self.store {
            store.delete()?;
        }
        result
    }
}

#[async_trait]
impl TokenSource for Session {
    async fn bearer_token(&self) -> AuthResult<String> {
        let mut tokens = self.tokens.lock().await;
        if tokens.is_near_expiry(REFRESH_BUFFER_SECS) {
            self.refresh_locked(&mut tokens).await?;
        }
        Ok(tokens.access_token.clone())
    }
}
