//! On-disk token storage
//!
//! Tokens live in `$CONFIG/membership/token.json`, readable by the owner only.
//! `MEMBERSHIP_TOKEN` bypasses the store entirely.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use super::error::{AuthError, AuthResult};
use super::token::TokenSet;

/// Environment variable holding a ready-made bearer token
pub const TOKEN_ENV_VAR: &str = "MEMBERSHIP_TOKEN";

const TOKEN_FILE_NAME: &str = "token.json";

/// Bearer token from the environment, if set and non-empty
pub fn env_token() -> Option<String> {
    std::env::var(TOKEN_ENV_VAR)
        .ok()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

/// JSON file holding the current session's tokens
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store under the user's config directory
    pub fn default_location() -> AuthResult<Self> {
        dirs::config_dir()
            .map(|dir| Self::new(dir.join("membership").join(TOKEN_FILE_NAME)))
            .ok_or_else(|| {
                AuthError::TokenStore("config directory not found, cannot store tokens".into())
            })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load stored tokens. A missing file is not an error.
    pub fn load(&self) -> AuthResult<Option<TokenSet>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(AuthError::TokenStore(format!(
                    "read {}: {e}",
                    self.path.display()
                )))
            }
        };

        match serde_json::from_str(&content) {
            Ok(tokens) => Ok(Some(tokens)),
            Err(error) => {
                // A corrupt file only means we log in again
                tracing::warn!(path = %self.path.display(), %error, "Ignoring unreadable token file");
                Ok(None)
            }
        }
    }

    pub fn save(&self, tokens: &TokenSet) -> AuthResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                AuthError::TokenStore(format!("mkdir {}: {e}", parent.display()))
            })?;
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                if let Err(e) = fs::set_permissions(parent, fs::Permissions::from_mode(0o700)) {
                    tracing::warn!("failed to chmod 0700 {}: {e}", parent.display());
                }
            }
        }

        let json = serde_json::to_string_pretty(tokens)
            .map_err(|e| AuthError::TokenStore(format!("serialize tokens: {e}")))?;

        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options
            .open(&self.path)
            .map_err(|e| AuthError::TokenStore(format!("open {}: {e}", self.path.display())))?;

        // The mode above only applies to new files; tighten an older one before writing
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(fs::Permissions::from_mode(0o600)).map_err(|e| {
                AuthError::TokenStore(format!("chmod 0600 {}: {e}", self.path.display()))
            })?;
        }

        file.write_all(json.as_bytes())
            .map_err(|e| AuthError::TokenStore(format!("write {}: {e}", self.path.display())))?;

        tracing::debug!(path = %self.path.display(), "Stored tokens");
        Ok(())
    }

    pub fn delete(&self) -> AuthResult<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AuthError::TokenStore(format!(
                "delete {}: {e}",
                self.path.display()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use tempfile::tempdir;

    fn sample_tokens() -> TokenSet {
        TokenSet {
            access_token: "access".to_string(),
            refresh_token: Some("refresh".to_string()),
            id_token: Some("id".to_string()),
            expires_at: Utc::now() + Duration::seconds(300),
            refresh_expires_at: None,
        }
    }

    #[test]
    fn test_save_load_delete() {
        let dir = tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("nested").join("token.json"));

        assert!(store.load().unwrap().is_none());

        let tokens = sample_tokens();
        store.save(&tokens).unwrap();
        assert_eq!(store.load().unwrap(), Some(tokens));

        store.delete().unwrap();
        assert!(store.load().unwrap().is_none());
        // Deleting twice is fine
        store.delete().unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn test_file_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("token.json"));
        store.save(&sample_tokens()).unwrap();

        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[cfg(unix)]
    #[test]
    fn test_existing_readable_file_is_tightened() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("token.json"));
        fs::write(store.path(), "stale").unwrap();
        fs::set_permissions(store.path(), fs::Permissions::from_mode(0o644)).unwrap();

        let tokens = sample_tokens();
        store.save(&tokens).unwrap();

        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert_eq!(store.load().unwrap(), Some(tokens));
    }

    #[test]
    fn test_corrupt_file_is_ignored() {
        let dir = tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("token.json"));
        fs::write(store.path(), "not json").unwrap();

        assert!(store.load().unwrap().is_none());
    }
}
