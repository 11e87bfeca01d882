//! Group endpoints.

use axum::{Json, Router, extract::State, routing::post};
use huddle_common::AppResult;
use huddle_core::{
    CreateGroupEventInput, CreateGroupInput, EventView, GroupView, MemberView, Page,
    UpdateGroupInput,
};
use huddle_db::entities::group_member::{self, GroupRole};
use serde::{Deserialize, Serialize};

use crate::{
    extractors::AuthSession,
    middleware::AppState,
    response::{ApiResponse, Done},
};

/// Membership response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MembershipResponse {
    pub id: String,
    pub user_id: String,
    pub group_id: String,
    pub role: GroupRole,
    pub joined_at: String,
}

impl From<group_member::Model> for MembershipResponse {
    fn from(m: group_member::Model) -> Self {
        Self {
            id: m.id,
            user_id: m.user_id,
            group_id: m.group_id,
            role: m.role,
            joined_at: m.joined_at.to_rfc3339(),
        }
    }
}

/// List groups request.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListGroupsRequest {
    /// Case-sensitive substring of the name.
    pub query: Option<String>,
}

/// Request naming one group.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupIdRequest {
    pub group_id: String,
}

/// Roster request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupMembersRequest {
    pub group_id: String,
    /// Zero-based page number.
    #[serde(default)]
    pub page: u64,
}

/// Request naming one user.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserIdRequest {
    pub user_id: String,
}

async fn list(
    State(state): State<AppState>,
    Json(req): Json<ListGroupsRequest>,
) -> AppResult<ApiResponse<Vec<GroupView>>> {
    let groups = state.group_service.list(req.query.as_deref()).await?;
    Ok(ApiResponse::ok(groups))
}

async fn show(
    State(state): State<AppState>,
    Json(req): Json<GroupIdRequest>,
) -> AppResult<ApiResponse<GroupView>> {
    let group = state.group_service.show(&req.group_id).await?;
    Ok(ApiResponse::ok(group))
}

/// Create a group; the caller becomes its organizer and first admin.
async fn create(
    AuthSession(session): AuthSession,
    State(state): State<AppState>,
    Json(req): Json<CreateGroupInput>,
) -> AppResult<ApiResponse<GroupView>> {
    let group = state.group_service.create(&session, req).await?;
    Ok(ApiResponse::ok(group))
}

async fn update(
    AuthSession(session): AuthSession,
    State(state): State<AppState>,
    Json(req): Json<UpdateGroupInput>,
) -> AppResult<ApiResponse<GroupView>> {
    let group = state.group_service.update(&session, req).await?;
    Ok(ApiResponse::ok(group))
}

async fn delete(
    AuthSession(session): AuthSession,
    State(state): State<AppState>,
    Json(req): Json<GroupIdRequest>,
) -> AppResult<ApiResponse<Done>> {
    state.group_service.delete(&session, &req.group_id).await?;
    Ok(ApiResponse::ok(Done::YES))
}

async fn join(
    AuthSession(session): AuthSession,
    State(state): State<AppState>,
    Json(req): Json<GroupIdRequest>,
) -> AppResult<ApiResponse<MembershipResponse>> {
    let membership = state.group_service.join(&session, &req.group_id).await?;
    Ok(ApiResponse::ok(membership.into()))
}

async fn leave(
    AuthSession(session): AuthSession,
    State(state): State<AppState>,
    Json(req): Json<GroupIdRequest>,
) -> AppResult<ApiResponse<Done>> {
    state.group_service.leave(&session, &req.group_id).await?;
    Ok(ApiResponse::ok(Done::YES))
}

async fn events(
    State(state): State<AppState>,
    Json(req): Json<GroupIdRequest>,
) -> AppResult<ApiResponse<Vec<EventView>>> {
    let events = state.group_service.events(&req.group_id).await?;
    Ok(ApiResponse::ok(events))
}

/// Create an event in a group. Group admins only.
async fn create_event(
    AuthSession(session): AuthSession,
    State(state): State<AppState>,
    Json(req): Json<CreateGroupEventInput>,
) -> AppResult<ApiResponse<EventView>> {
    let event = state.group_service.create_event(&session, req).await?;
    Ok(ApiResponse::ok(event))
}

async fn members(
    State(state): State<AppState>,
    Json(req): Json<GroupMembersRequest>,
) -> AppResult<ApiResponse<Page<MemberView>>> {
    let page = state
        .group_service
        .members(&req.group_id, req.page)
        .await?;
    Ok(ApiResponse::ok(page))
}

/// Groups a user belongs to.
async fn by_user(
    State(state): State<AppState>,
    Json(req): Json<UserIdRequest>,
) -> AppResult<ApiResponse<Vec<GroupView>>> {
    let groups = state.group_service.by_user(&req.user_id).await?;
    Ok(ApiResponse::ok(groups))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/groups", post(list))
        .route("/groups/show", post(show))
        .route("/groups/create", post(create))
        .route("/groups/update", post(update))
        .route("/groups/delete", post(delete))
        .route("/groups/join", post(join))
        .route("/groups/leave", post(leave))
        .route("/groups/events", post(events))
        .route("/groups/events/create", post(create_event))
        .route("/groups/members", post(members))
        .route("/groups/by-user", post(by_user))
}
