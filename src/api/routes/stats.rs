//! Stats Routes
//!
//! - GET /stats/members/basic - New, current and past member counts

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::api::auth::BearerToken;
use crate::api::error::ApiResult;
use crate::api::state::AppState;
use crate::model::MembersStats;

/// GET /stats/members/basic
pub async fn members_basic(
    State(state): State<Arc<AppState>>,
    token: BearerToken,
) -> ApiResult<Json<MembersStats>> {
    state.authorizer.decode(token.as_deref())?;
    let stats = state.with_store(|store| store.stats()).await?;
    Ok(Json(stats))
}
