//! Application State
//!
//! Shared state accessible by all API handlers.
//! Wrapped in Arc for thread-safe sharing across async tasks.

use std::sync::Arc;
use std::time::Instant;

use crate::api::auth::Authorizer;
use crate::api::error::{ApiError, ApiResult};
use crate::config::ServerConfig;
use crate::store::{MemberStore, StoreResult};

/// Shared application state for all handlers
#[derive(Clone)]
pub struct AppState {
    /// Member records
    pub store: Arc<MemberStore>,
    /// Bearer token checks
    pub authorizer: Arc<Authorizer>,
    /// API configuration
    pub config: Arc<ApiConfig>,
    /// Server start time for uptime tracking
    pub start_time: Instant,
}

impl AppState {
    pub fn new(store: Arc<MemberStore>, authorizer: Arc<Authorizer>, config: ApiConfig) -> Self {
        Self {
            store,
            authorizer,
            config: Arc::new(config),
            start_time: Instant::now(),
        }
    }

    /// Get server uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Run a store operation on the blocking pool
    pub async fn with_store<T, F>(&self, f: F) -> ApiResult<T>
    where
        F: FnOnce(&MemberStore) -> StoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || f(&store))
            .await
            .map_err(|e| ApiError::Internal(format!("Store task failed: {}", e)))?
            .map_err(ApiError::from)
    }
}

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Allowed CORS origins, empty allows any
    pub cors_origins: Vec<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        ServerConfig::default().into()
    }
}

impl From<ServerConfig> for ApiConfig {
    fn from(server: ServerConfig) -> Self {
        Self {
            host: server.host,
            port: server.port,
            cors_origins: server.cors_origins,
        }
    }
}

impl ApiConfig {
    /// Create config with custom host and port
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    /// Get the socket address string
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
