//! Member Routes
//!
//! - GET /members, /members/current, /members/past, /members/new
//! - POST /members - Create a member
//! - GET /members/:id - Member detail
//! - PATCH /members/:id - Update a member
//! - PATCH /members/:id/note - Replace the note
//! - DELETE /members/:id - Mark the member as left
//! - GET /members/:id/occupations - List occupations
//! - POST /members/:id/occupations - Add an occupation

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::api::auth::{BearerToken, Role};
use crate::api::dto::NoteRequest;
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::model::{
    Member, MemberFilter, MemberOverview, MemberUpdate, NewMember, NewOccupation, Occupation,
};

const DETAIL_ROLES: [Role; 2] = [Role::ListMembers, Role::ViewMember];

async fn list(
    state: &AppState,
    token: &BearerToken,
    filter: MemberFilter,
) -> ApiResult<Json<Vec<MemberOverview>>> {
    state.authorizer.require_role(token.as_deref(), Role::ListMembers)?;
    let members = state.with_store(move |store| store.list(filter)).await?;
    Ok(Json(members))
}

/// GET /members
pub async fn list_all(
    State(state): State<Arc<AppState>>,
    token: BearerToken,
) -> ApiResult<Json<Vec<MemberOverview>>> {
    list(&state, &token, MemberFilter::All).await
}

/// GET /members/current
pub async fn list_current(
    State(state): State<Arc<AppState>>,
    token: BearerToken,
) -> ApiResult<Json<Vec<MemberOverview>>> {
    list(&state, &token, MemberFilter::Current).await
}

/// GET /members/past
pub async fn list_past(
    State(state): State<Arc<AppState>>,
    token: BearerToken,
) -> ApiResult<Json<Vec<MemberOverview>>> {
    list(&state, &token, MemberFilter::Past).await
}

/// GET /members/new
pub async fn list_new(
    State(state): State<Arc<AppState>>,
    token: BearerToken,
) -> ApiResult<Json<Vec<MemberOverview>>> {
    list(&state, &token, MemberFilter::New).await
}

/// POST /members
///
/// Assigns the next member number when the request has none.
pub async fn create_member(
    State(state): State<Arc<AppState>>,
    token: BearerToken,
    Json(member): Json<NewMember>,
) -> ApiResult<(StatusCode, Json<MemberOverview>)> {
    state.authorizer.require_role(token.as_deref(), Role::ManageMembers)?;
    member.validate()?;

    if matches!(member.member_number, Some(n) if n <= 0) {
        return Err(ApiError::Validation(
            "member_number must be a positive number".to_string(),
        ));
    }

    let created = state.with_store(move |store| store.create(&member)).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /members/:id
pub async fn get_member(
    State(state): State<Arc<AppState>>,
    token: BearerToken,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Member>> {
    state.authorizer.require_any_role(token.as_deref(), &DETAIL_ROLES)?;
    let member = state.with_store(move |store| store.detail(id)).await?;
    Ok(Json(member))
}

/// PATCH /members/:id
pub async fn update_member(
    State(state): State<Arc<AppState>>,
    token: BearerToken,
    Path(id): Path<Uuid>,
    Json(update): Json<MemberUpdate>,
) -> ApiResult<Json<Member>> {
    state.authorizer.require_role(token.as_deref(), Role::ManageMembers)?;
    update.validate()?;

    let member = state.with_store(move |store| store.update(id, &update)).await?;
    tracing::info!(member_id = %id, "Updated member");
    Ok(Json(member))
}

/// PATCH /members/:id/note
pub async fn update_note(
    State(state): State<Arc<AppState>>,
    token: BearerToken,
    Path(id): Path<Uuid>,
    Json(request): Json<NoteRequest>,
) -> ApiResult<Json<Member>> {
    state.authorizer.require_role(token.as_deref(), Role::ManageMembers)?;
    let member = state
        .with_store(move |store| store.update_note(id, request.note.as_deref()))
        .await?;
    Ok(Json(member))
}

/// DELETE /members/:id
///
/// Members are never deleted, only marked as left.
pub async fn remove_member(
    State(state): State<Arc<AppState>>,
    token: BearerToken,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Member>> {
    state.authorizer.require_role(token.as_deref(), Role::ManageMembers)?;
    let member = state.with_store(move |store| store.remove(id)).await?;
    Ok(Json(member))
}

/// GET /members/:id/occupations
pub async fn list_occupations(
    State(state): State<Arc<AppState>>,
    token: BearerToken,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<Occupation>>> {
    state.authorizer.require_any_role(token.as_deref(), &DETAIL_ROLES)?;
    let occupations = state.with_store(move |store| store.occupations(id)).await?;
    Ok(Json(occupations))
}

/// POST /members/:id/occupations
pub async fn add_occupation(
    State(state): State<Arc<AppState>>,
    token: BearerToken,
    Path(id): Path<Uuid>,
    Json(occupation): Json<NewOccupation>,
) -> ApiResult<(StatusCode, Json<Occupation>)> {
    state.authorizer.require_role(token.as_deref(), Role::ManageMembers)?;

    if occupation.is_empty() {
        return Err(ApiError::Validation(
            "company_name or position is required".to_string(),
        ));
    }

    let created = state
        .with_store(move |store| store.add_occupation(id, &occupation))
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}
