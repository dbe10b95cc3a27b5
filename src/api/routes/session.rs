//! Session Routes
//!
//! - GET /session/current - Claims of the presented token

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::api::auth::BearerToken;
use crate::api::dto::SessionInfo;
use crate::api::error::ApiResult;
use crate::api::state::AppState;

/// GET /session/current
pub async fn current(
    State(state): State<Arc<AppState>>,
    token: BearerToken,
) -> ApiResult<Json<SessionInfo>> {
    let token_claims = state.authorizer.decode(token.as_deref())?;
    Ok(Json(SessionInfo { token_claims }))
}
