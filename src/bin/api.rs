//! Membership API Server
//!
//! Run with: cargo run --bin membership-api
//!
//! # Configuration
//!
//! Read from `--config`, or the default locations (see [`Config::load_default`]).
//! Environment variables override the file, most relevant here:
//! - `MEMBERSHIP_SERVER_HOST`: Host to bind to (default: 0.0.0.0)
//! - `MEMBERSHIP_SERVER_PORT`: Port to listen on (default: 8000)
//! - `MEMBERSHIP_DATABASE_PATH`: SQLite database file
//! - `MEMBERSHIP_IDENTITY_URL`: Keycloak base URL, empty disables every protected endpoint
//! - `MEMBERSHIP_REQUIRE_AUTH`: `false` skips token checks entirely
//! - `RUST_LOG`: Log filter (default: membership=info,tower_http=debug)

use anyhow::Context;
use clap::Parser;
use membership::api::auth::Authorizer;
use membership::api::{serve, ApiConfig, AppState};
use membership::config::Config;
use membership::logging;
use membership::store::MemberStore;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "membership-api")]
#[command(version, about = "Membership API server", long_about = None)]
struct Cli {
    /// Config file (TOML, or a panel config.json)
    #[arg(long, short)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config::resolve(cli.config.as_deref()).context("Failed to load configuration")?;
    logging::init(&config.logging, "membership=info,tower_http=debug");

    tracing::info!("Starting Membership API server v{}", env!("CARGO_PKG_VERSION"));

    let database_path = Path::new(&config.server.database_path);
    tracing::info!("Database: {:?}", database_path);
    let store = Arc::new(
        MemberStore::open(database_path)
            .with_context(|| format!("Failed to open database {:?}", database_path))?,
    );

    let authorizer = Authorizer::init(&config.identity, config.server.require_auth)
        .await
        .context("Failed to set up authorization")?;

    let api_config = ApiConfig::from(config.server.clone());
    let state = AppState::new(store, Arc::new(authorizer), api_config.clone());

    tracing::info!("Starting server on {}", api_config.addr());
    serve(state, &api_config).await?;

    tracing::info!("Membership API server stopped");
    Ok(())
}
