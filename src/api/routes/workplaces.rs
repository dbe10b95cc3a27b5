//! Workplace Routes
//!
//! - GET /workplaces - All workplaces
//! - POST /workplaces - Create a workplace
//! - GET /workplaces/:id - Members of a workplace
//! - POST /workplaces/:id - Assign a member
//! - DELETE /workplaces/:id - Remove a member

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::api::auth::{BearerToken, Role};
use crate::api::dto::Accepted;
use crate::api::error::ApiResult;
use crate::api::state::AppState;
use crate::model::{MemberOverview, NewWorkplace, Workplace, WorkplaceMember};

/// GET /workplaces
pub async fn list_workplaces(
    State(state): State<Arc<AppState>>,
    token: BearerToken,
) -> ApiResult<Json<Vec<Workplace>>> {
    state.authorizer.require_role(token.as_deref(), Role::ListWorkplaces)?;
    let workplaces = state.with_store(|store| store.workplaces()).await?;
    Ok(Json(workplaces))
}

/// POST /workplaces
pub async fn create_workplace(
    State(state): State<Arc<AppState>>,
    token: BearerToken,
    Json(workplace): Json<NewWorkplace>,
) -> ApiResult<(StatusCode, Json<Workplace>)> {
    state.authorizer.require_role(token.as_deref(), Role::ManageWorkplaces)?;
    workplace.validate()?;

    let created = state
        .with_store(move |store| store.create_workplace(&workplace))
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /workplaces/:id
///
/// Lists member records, so both roles are needed.
pub async fn workplace_members(
    State(state): State<Arc<AppState>>,
    token: BearerToken,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<MemberOverview>>> {
    state.authorizer.require_role(token.as_deref(), Role::ListWorkplaces)?;
    state.authorizer.require_role(token.as_deref(), Role::ListMembers)?;

    let members = state.with_store(move |store| store.workplace_members(id)).await?;
    Ok(Json(members))
}

/// POST /workplaces/:id
pub async fn assign_member(
    State(state): State<Arc<AppState>>,
    token: BearerToken,
    Path(id): Path<Uuid>,
    Json(request): Json<WorkplaceMember>,
) -> ApiResult<(StatusCode, Json<Accepted>)> {
    state.authorizer.require_role(token.as_deref(), Role::ManageWorkplaces)?;
    state
        .with_store(move |store| store.assign_member(id, request.member_id))
        .await?;
    Ok((StatusCode::ACCEPTED, Json(Accepted::default())))
}

/// DELETE /workplaces/:id
pub async fn remove_member(
    State(state): State<Arc<AppState>>,
    token: BearerToken,
    Path(id): Path<Uuid>,
    Json(request): Json<WorkplaceMember>,
) -> ApiResult<(StatusCode, Json<Accepted>)> {
    state.authorizer.require_role(token.as_deref(), Role::ManageWorkplaces)?;
    state
        .with_store(move |store| store.unassign_member(id, request.member_id))
        .await?;
    Ok((StatusCode::ACCEPTED, Json(Accepted::default())))
}
