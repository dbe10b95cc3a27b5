//! Profile page of the members panel
//!
//! Signed-in user's info, a link to the provider's account settings and
//! logout.

use std::fmt::Write;

use super::welcome::{fetch_user_info, greeting, raw_json};
use super::{LoadGuard, PanelResult};
use crate::identity::{browser_flow, logout_stored, IdentityProvider, TokenSource, TokenStore};
use crate::model::UserInfo;

#[derive(Debug)]
pub struct ProfilePage {
    account_url: String,
    user_info: Option<UserInfo>,
    load: LoadGuard,
}

impl ProfilePage {
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

    /// Open the account settings page in the browser
    pub fn open_settings(&self) {
        browser_flow::open_browser(&self.account_url);
    }

    /// End the stored session; false when there was none
    pub async fn logout(&mut self, provider: &IdentityProvider, store: &TokenStore) -> PanelResult<bool> {
        let ended = logout_stored(provider, store).await?;
        self.user_info = None;
        self.load = LoadGuard::default();
        Ok(ended)
    }

    pub fn render(&self) -> String {
        let mut out = greeting(self.user_info.as_ref());
        let _ = write!(out, "\nProfile Settings: {}", self.account_url);
        let _ = write!(out, "\n{}", raw_json(self.user_info.as_ref()));
        out
    }
}
