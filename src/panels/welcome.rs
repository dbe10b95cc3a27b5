//! Welcome page of the administration panel

use std::fmt::Write;

use super::{LoadGuard, PanelResult};
use crate::identity::{IdentityProvider, TokenSource};
use crate::model::UserInfo;

#[derive(Debug)]
pub struct WelcomePage {
    account_url: String,
    user_info: Option<UserInfo>,
    load: LoadGuard,
}

impl WelcomePage {
    pub fn new(account_url: impl Into<String>) -> Self {
        Self {
            account_url: account_url.into(),
            user_info: None,
            load: LoadGuard::default(),
        }
    }

    pub fn user_info(&self) -> Option<&UserInfo> {
        self.user_info.as_ref()
    }

    pub fn account_url(&self) -> &str {
        &self.account_url
    }

    pub async fn load(&mut self, provider: &IdentityProvider, token: &dyn TokenSource) -> PanelResult<()> {
        if !self.load.begin() {
            return Ok(());
        }
        match fetch_user_info(provider, token).await {
            Ok(info) => {
                self.user_info = Some(info);
                self.load.succeed();
                Ok(())
            }
            Err(e) => {
                self.load.fail();
                Err(e)
            }
        }
    }

    pub fn render(&self) -> String {
        let mut out = greeting(self.user_info.as_ref());
        let _ = write!(out, "\nAccount settings: {}", self.account_url);
        let _ = write!(out, "\n{}", raw_json(self.user_info.as_ref()));
        out
    }
}

pub(crate) async fn fetch_user_info(provider: &IdentityProvider, token: &dyn TokenSource) -> PanelResult<UserInfo> {
    let access_token = token.bearer_token().await?;
    provider.load_user_info(&access_token).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to load user info");
        e.into()
    })
}

pub(crate) fn greeting(info: Option<&UserInfo>) -> String {
    let name = info
        .and_then(|i| i.preferred_username.as_deref())
        .unwrap_or_default();
    format!("Hello {}!", name)
}

pub(crate) fn raw_json(info: Option<&UserInfo>) -> String {
    match info {
        Some(info) => serde_json::to_string(info).unwrap_or_default(),
        None => "null".to_string(),
    }
}
