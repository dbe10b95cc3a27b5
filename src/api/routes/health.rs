//! Health Routes
//!
//! - GET /status - Service status as shown by the panels
//! - GET /health/live - Liveness check (process is alive)
//! - GET /health/ready - Readiness check (database reachable)

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use crate::api::dto::StatusResponse;
use crate::api::state::AppState;

/// GET /status
pub async fn status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let database_connected = check_store(&state).await;

    Json(StatusResponse {
        http_status: StatusCode::OK.as_u16(),
        http_message: "OK".to_string(),
        authorization_connected: state.authorizer.is_connected(),
        database_connected,
    })
}

/// GET /health/live
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

/// GET /health/ready
///
/// 503 until the database answers.
pub async fn readiness(State(state): State<Arc<AppState>>) -> StatusCode {
    match check_store(&state).await {
        true => StatusCode::OK,
        false => StatusCode::SERVICE_UNAVAILABLE,
    }
}

async fn check_store(state: &AppState) -> bool {
    state
        .with_store(|store| Ok(store.ping()))
        .await
        .unwrap_or(false)
}
