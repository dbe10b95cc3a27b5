//! # Membership
//!
//! Member records of a labour union, administered through two panels and a
//! small HTTP API, all behind a Keycloak realm.
//!
//! ## Modules
//!
//! - [`identity`]: login, token refresh and logout against the identity provider
//! - [`data_api`]: query builder for the auto-generated REST API over the members database
//! - [`panels`]: page controllers of the administration and members panels
//! - [`adapter`]: typed client for the membership API
//! - [`api`]: the membership API server (Axum) with role-based authorization
//! - [`store`]: SQLite storage behind the membership API
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use membership::{app::App, config::Config, panels::MembersTable};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let app = App::new(Config::load_default())?;
//!
//!     // Stored session, MEMBERSHIP_TOKEN or a browser login
//!     let token = app.token(true).await?;
//!     let client = app.data_api(token)?;
//!
//!     let mut table = MembersTable::new();
//!     table.load(&client).await?;
//!     println!("{}", table.render());
//!
//!     Ok(())
//! }
//! ```

pub mod adapter;
pub mod api;
pub mod app;
pub mod config;
pub mod data_api;
pub mod identity;
pub mod logging;
pub mod model;
pub mod panels;
pub mod store;

#[cfg(test)]
mod test_support;

// Re-export top-level types for convenience
pub use adapter::{ApiAdapter, ApiClientError};
pub use api::{build_router, serve, ApiConfig, ApiError, AppState};
pub use config::{Config, ConfigError};
pub use data_api::{DataApiClient, DataApiError};
pub use identity::{AuthError, IdentityProvider, TokenSource, TokenStore};
pub use model::{
    Member, MemberFilter, MemberOverview, MembersStats, NewMember, NewWorkplace, Occupation, Workplace,
};
pub use store::{MemberStore, StoreError};
