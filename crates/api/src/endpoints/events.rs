//! Event and RSVP endpoints.

use axum::{Json, Router, extract::State, routing::post};
use huddle_common::AppResult;
use huddle_core::{
    AttendeeView, CreateEventInput, EventView, Page, UpdateEventInput, UpdateStatusInput,
};
use huddle_db::entities::subscription::{self, SubscriptionStatus};
use serde::{Deserialize, Serialize};

use crate::{
    extractors::AuthSession,
    middleware::AppState,
    response::{ApiResponse, Done},
};

/// Subscription response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionResponse {
    pub id: String,
    pub user_id: String,
    pub event_id: String,
    pub status: SubscriptionStatus,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl From<subscription::Model> for SubscriptionResponse {
    fn from(s: subscription::Model) -> Self {
        Self {
            id: s.id,
            user_id: s.user_id,
            event_id: s.event_id,
            status: s.status,
            created_at: s.created_at.to_rfc3339(),
            updated_at: s.updated_at.map(|t| t.to_rfc3339()),
        }
    }
}

/// List events request.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListEventsRequest {
    /// Case-sensitive substring of the title.
    pub query: Option<String>,
}

/// Request naming one event.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventIdRequest {
    pub event_id: String,
}

/// Attendee roster request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventMembersRequest {
    pub event_id: String,
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

/// All events, newest start first.
async fn list(
    State(state): State<AppState>,
    Json(req): Json<ListEventsRequest>,
) -> AppResult<ApiResponse<Vec<EventView>>> {
    let events = state.event_service.list(req.query.as_deref()).await?;
    Ok(ApiResponse::ok(events))
}

async fn show(
    State(state): State<AppState>,
    Json(req): Json<EventIdRequest>,
) -> AppResult<ApiResponse<EventView>> {
    let event = state.event_service.show(&req.event_id).await?;
    Ok(ApiResponse::ok(event))
}

/// Create a standalone event.
async fn create(
    AuthSession(session): AuthSession,
    State(state): State<AppState>,
    Json(req): Json<CreateEventInput>,
) -> AppResult<ApiResponse<EventView>> {
    let event = state.event_service.create(&session, req).await?;
    Ok(ApiResponse::ok(event))
}

async fn update(
    AuthSession(session): AuthSession,
    State(state): State<AppState>,
    Json(req): Json<UpdateEventInput>,
) -> AppResult<ApiResponse<EventView>> {
    let event = state.event_service.update(&session, req).await?;
    Ok(ApiResponse::ok(event))
}

/// Delete an event with its comments and subscriptions.
async fn delete(
    AuthSession(session): AuthSession,
    State(state): State<AppState>,
    Json(req): Json<EventIdRequest>,
) -> AppResult<ApiResponse<Done>> {
    state.event_service.delete(&session, &req.event_id).await?;
    Ok(ApiResponse::ok(Done::YES))
}

/// RSVP as attending.
async fn join(
    AuthSession(session): AuthSession,
    State(state): State<AppState>,
    Json(req): Json<EventIdRequest>,
) -> AppResult<ApiResponse<SubscriptionResponse>> {
    let subscription = state
        .subscription_service
        .join(&session, &req.event_id)
        .await?;
    Ok(ApiResponse::ok(subscription.into()))
}

/// Change the caller's attendance status.
async fn update_status(
    AuthSession(session): AuthSession,
    State(state): State<AppState>,
    Json(req): Json<UpdateStatusInput>,
) -> AppResult<ApiResponse<SubscriptionResponse>> {
    let subscription = state
        .subscription_service
        .update_status(&session, req)
        .await?;
    Ok(ApiResponse::ok(subscription.into()))
}

async fn members(
    State(state): State<AppState>,
    Json(req): Json<EventMembersRequest>,
) -> AppResult<ApiResponse<Page<AttendeeView>>> {
    let page = state
        .subscription_service
        .members(&req.event_id, req.page)
        .await?;
    Ok(ApiResponse::ok(page))
}

/// A user's RSVPs.
async fn subscriptions(
    State(state): State<AppState>,
    Json(req): Json<UserIdRequest>,
) -> AppResult<ApiResponse<Vec<SubscriptionResponse>>> {
    let subscriptions = state.subscription_service.by_user(&req.user_id).await?;
    Ok(ApiResponse::ok(
        subscriptions.into_iter().map(Into::into).collect(),
    ))
}

/// Events a user has subscribed to.
async fn by_user(
    State(state): State<AppState>,
    Json(req): Json<UserIdRequest>,
) -> AppResult<ApiResponse<Vec<EventView>>> {
    let events = state.event_service.by_user(&req.user_id).await?;
    Ok(ApiResponse::ok(events))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/events", post(list))
        .route("/events/show", post(show))
        .route("/events/create", post(create))
        .route("/events/update", post(update))
        .route("/events/delete", post(delete))
        .route("/events/join", post(join))
        .route("/events/update-status", post(update_status))
        .route("/events/members", post(members))
        .route("/events/subscriptions", post(subscriptions))
        .route("/events/by-user", post(by_user))
}
