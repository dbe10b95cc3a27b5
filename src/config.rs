//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files, the legacy panel `config.json` and
//! `MEMBERSHIP_*` environment variable overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub identity: IdentityConfig,

    #[serde(default)]
    pub data_api: DataApiConfig,

    #[serde(default)]
    pub api: ApiClientConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Identity provider (Keycloak) configuration
#[derive(Debug, Clone, Deserialize)]
pub struct IdentityConfig {
    #[serde(default = "default_identity_url")]
    pub url: String,

    #[serde(default = "default_realm")]
    pub realm: String,

    #[serde(default = "default_client_id")]
    pub client_id: String,

    /// Only needed for confidential clients
    #[serde(default)]
    pub client_secret: Option<String>,

    /// Local port for the login callback listener, 0 picks a free one
    #[serde(default = "default_redirect_port")]
    pub redirect_port: u16,

    #[serde(default = "default_login_timeout")]
    pub login_timeout_secs: u64,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_identity_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_realm() -> String {
    "members".to_string()
}

fn default_client_id() -> String {
    "administration-panel".to_string()
}

fn default_redirect_port() -> u16 {
    8400
}

fn default_login_timeout() -> u64 {
    120
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            url: default_identity_url(),
            realm: default_realm(),
            client_id: default_client_id(),
            client_secret: None,
            redirect_port: default_redirect_port(),
            login_timeout_secs: default_login_timeout(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Auto-generated data API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DataApiConfig {
    #[serde(default = "default_data_api_url")]
    pub url: String,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_data_api_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for DataApiConfig {
    fn default() -> Self {
        Self {
            url: default_data_api_url(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Membership API client configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiClientConfig {
    #[serde(default = "default_api_url")]
    pub url: String,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_api_url() -> String {
    "http://localhost:8000".to_string()
}

impl Default for ApiClientConfig {
    fn default() -> Self {
        Self {
            url: default_api_url(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Membership API server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_database_path")]
    pub database_path: String,

    #[serde(default)]
    pub cors_origins: Vec<String>,

    /// When false, bearer tokens are not checked at all
    #[serde(default = "default_require_auth")]
    pub require_auth: bool,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_database_path() -> String {
    dirs::data_local_dir()
        .map(|p| p.join("membership").join("members.db").to_string_lossy().to_string())
        .unwrap_or_else(|| "./members.db".to_string())
}

fn default_require_auth() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            database_path: default_database_path(),
            cors_origins: Vec::new(),
            require_auth: default_require_auth(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

/// The `config.json` the browser panels were deployed with
#[derive(Debug, Clone, Deserialize)]
pub struct PanelConfig {
    pub keycloak_url: String,
    pub keycloak_realm: String,
    pub keycloak_client_id: String,
    pub api_url: String,
    #[serde(default)]
    pub data_api_url: Option<String>,
}

impl From<PanelConfig> for Config {
    fn from(panel: PanelConfig) -> Self {
        let mut config = Config::default();
        config.identity.url = panel.keycloak_url;
        config.identity.realm = panel.keycloak_realm;
        config.identity.client_id = panel.keycloak_client_id;
        config.api.url = panel.api_url;
        if let Some(url) = panel.data_api_url {
            config.data_api.url = url;
        }
        config
    }
}

impl Config {
    /// Load configuration from a file
    ///
    /// Files ending in `.json` are read as a panel `config.json`,
    /// everything else as TOML.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        if path.extension().is_some_and(|ext| ext == "json") {
            let panel: PanelConfig =
                serde_json::from_str(&content).map_err(|e| ConfigError::Parse {
                    path: path.to_path_buf(),
                    error: e.to_string(),
                })?;
            return Ok(panel.into());
        }

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load an explicit file if given, otherwise search the default locations
    pub fn resolve(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load_with_env(path),
            None => Ok(Self::load_default()),
        }
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("membership").join("config.toml")),
            Some(PathBuf::from("/etc/membership/config.toml")),
            Some(PathBuf::from("./config.toml")),
            Some(PathBuf::from("./config.json")),
        ];

        for path_opt in config_paths.iter().flatten() {
            if path_opt.exists() {
                match Self::load_with_env(path_opt) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path_opt);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path_opt, e);
                    }
                }
            }
        }

        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Account console of the configured realm
    pub fn account_settings_url(&self) -> String {
        format!(
            "{}/realms/{}/account",
            self.identity.url.trim_end_matches('/'),
            self.identity.realm
        )
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        // Identity overrides
        if let Ok(url) = std::env::var("MEMBERSHIP_IDENTITY_URL") {
            self.identity.url = url;
        }
        if let Ok(realm) = std::env::var("MEMBERSHIP_IDENTITY_REALM") {
            self.identity.realm = realm;
        }
        if let Ok(client_id) = std::env::var("MEMBERSHIP_IDENTITY_CLIENT_ID") {
            self.identity.client_id = client_id;
        }
        if let Ok(secret) = std::env::var("MEMBERSHIP_IDENTITY_CLIENT_SECRET") {
            self.identity.client_secret = Some(secret);
        }
        if let Ok(port) = std::env::var("MEMBERSHIP_IDENTITY_REDIRECT_PORT") {
            if let Ok(p) = port.parse() {
                self.identity.redirect_port = p;
            }
        }

        // Client overrides
        if let Ok(url) = std::env::var("MEMBERSHIP_DATA_API_URL") {
            self.data_api.url = url;
        }
        if let Ok(url) = std::env::var("MEMBERSHIP_API_URL") {
            self.api.url = url;
        }

        // Server overrides
        if let Ok(host) = std::env::var("MEMBERSHIP_SERVER_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("MEMBERSHIP_SERVER_PORT") {
            if let Ok(p) = port.parse() {
                self.server.port = p;
            }
        }
        if let Ok(path) = std::env::var("MEMBERSHIP_DATABASE_PATH") {
            self.server.database_path = path;
        }
        if let Ok(require) = std::env::var("MEMBERSHIP_REQUIRE_AUTH") {
            self.server.require_auth = require.to_lowercase() != "false" && require != "0";
        }

        // Logging overrides
        if let Ok(level) = std::env::var("MEMBERSHIP_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("MEMBERSHIP_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            identity: IdentityConfig::default(),
            data_api: DataApiConfig::default(),
            api: ApiClientConfig::default(),
            server: ServerConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# Membership Configuration
#
# Environment variables override these settings:
# - MEMBERSHIP_IDENTITY_URL
# - MEMBERSHIP_IDENTITY_REALM
# - MEMBERSHIP_IDENTITY_CLIENT_ID
# - MEMBERSHIP_IDENTITY_CLIENT_SECRET
# - MEMBERSHIP_IDENTITY_REDIRECT_PORT
# - MEMBERSHIP_DATA_API_URL
# - MEMBERSHIP_API_URL
# - MEMBERSHIP_SERVER_HOST
# - MEMBERSHIP_SERVER_PORT
# - MEMBERSHIP_DATABASE_PATH
# - MEMBERSHIP_REQUIRE_AUTH
# - MEMBERSHIP_LOG_LEVEL
# - MEMBERSHIP_LOG_FORMAT
#
# MEMBERSHIP_TOKEN, when set, is used as the bearer token and skips login.

[identity]
# Keycloak base URL
url = "http://localhost:8080"

# Realm the panels log in to
realm = "members"

# Public client registered for the panels
client_id = "administration-panel"

# Client secret, only for confidential clients
# client_secret = ""

# Port of the local login callback (register http://127.0.0.1:8400/callback)
redirect_port = 8400

# How long to wait for the browser login (seconds)
login_timeout_secs = 120

# Request timeout in seconds
request_timeout_secs = 30

[data_api]
# Auto-generated REST API over the members database
url = "http://localhost:3000"

# Request timeout in seconds
request_timeout_secs = 30

[api]
# Membership API server
url = "http://localhost:8000"

# Request timeout in seconds
request_timeout_secs = 30

[server]
# Membership API server host
host = "0.0.0.0"

# Membership API server port
port = 8000

# SQLite database file (defaults to the user's local data directory)
# database_path = "/var/lib/membership/members.db"

# Allowed CORS origins (empty allows any)
cors_origins = []

# Check bearer tokens against the identity provider; false lets every request through
require_auth = true

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}
