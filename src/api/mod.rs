//! Membership REST API
//!
//! HTTP API over the member store, built with Axum. Protected routes expect
//! an identity provider access token in `Authorization: Bearer`.
//!
//! # Endpoints
//!
//! ## Members
//! - `GET /members` - All members (`list-members`)
//! - `GET /members/current` - Members that have not left
//! - `GET /members/past` - Members that left
//! - `GET /members/new` - Members that joined recently
//! - `POST /members` - Create a member (`manage-members`)
//! - `GET /members/:id` - Member detail (`list-members` or `view-member`)
//! - `PATCH /members/:id` - Update a member (`manage-members`)
//! - `PATCH /members/:id/note` - Replace the note (`manage-members`)
//! - `DELETE /members/:id` - Mark as left (`manage-members`)
//! - `GET /members/:id/occupations` - Occupations (`list-members` or `view-member`)
//! - `POST /members/:id/occupations` - Add an occupation (`manage-members`)
//!
//! ## Workplaces
//! - `GET /workplaces` - All workplaces (`list-workplaces`)
//! - `POST /workplaces` - Create a workplace (`manage-workplaces`)
//! - `GET /workplaces/:id` - Members of a workplace (`list-workplaces` and `list-members`)
//! - `POST /workplaces/:id` - Assign `{"member_id"}` (`manage-workplaces`)
//! - `DELETE /workplaces/:id` - Remove `{"member_id"}` (`manage-workplaces`)
//!
//! ## Session & stats
//! - `GET /session/current` - Claims of the presented token
//! - `GET /stats/members/basic` - Member counts
//!
//! ## Health
//! - `GET /status` - Status shown by the panels
//! - `GET /health/live` - Liveness check
//! - `GET /health/ready` - Readiness check
//!
//! # Example
//!
//! ```rust,ignore
//! use membership::api::{auth::Authorizer, serve, ApiConfig, AppState};
//! use membership::store::MemberStore;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(MemberStore::open("members.db".as_ref())?);
//!     let config = ApiConfig::default();
//!
//!     let state = AppState::new(store, Arc::new(Authorizer::open()), config.clone());
//!     serve(state, &config).await?;
//!
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod dto;
pub mod error;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use state::{ApiConfig, AppState};

use axum::{
    http::HeaderValue,
    routing::{get, patch},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

/// Build the API router with all routes and middleware
pub fn build_router(state: AppState) -> Router {
    let member_routes = Router::new()
        .route("/current", get(routes::members::list_current))
        .route("/past", get(routes::members::list_past))
        .route("/new", get(routes::members::list_new))
        .route(
            "/:id",
            get(routes::members::get_member)
                .patch(routes::members::update_member)
                .delete(routes::members::remove_member),
        )
        .route("/:id/note", patch(routes::members::update_note))
        .route(
            "/:id/occupations",
            get(routes::members::list_occupations).post(routes::members::add_occupation),
        );

    let workplace_routes = Router::new().route(
        "/:id",
        get(routes::workplaces::workplace_members)
            .post(routes::workplaces::assign_member)
            .delete(routes::workplaces::remove_member),
    );

    let health_routes = Router::new()
        .route("/live", get(routes::health::liveness))
        .route("/ready", get(routes::health::readiness));

    let cors = cors_layer(&state.config.cors_origins);
    let shared_state = Arc::new(state);

    Router::new()
        .route("/status", get(routes::health::status))
        .route("/members", get(routes::members::list_all).post(routes::members::create_member))
        .nest("/members", member_routes)
        .route(
            "/workplaces",
            get(routes::workplaces::list_workplaces).post(routes::workplaces::create_workplace),
        )
        .nest("/workplaces", workplace_routes)
        .route("/session/current", get(routes::session::current))
        .route("/stats/members/basic", get(routes::stats::members_basic))
        .nest("/health", health_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(shared_state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Start the API server
pub async fn serve(state: AppState, config: &ApiConfig) -> Result<(), ApiError> {
    let router = build_router(state);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Membership API listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ApiError::Internal(format!("Server error: {}", e)))?;

    tracing::info!("Membership API shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
