//! Comment endpoints.

use axum::{Json, Router, extract::State, routing::post};
use huddle_common::AppResult;
use huddle_core::{CommentView, CreateCommentInput};
use serde::Deserialize;

use crate::{extractors::AuthSession, middleware::AppState, response::ApiResponse};

/// List comments request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListCommentsRequest {
    pub event_id: String,
}

/// Comments on an event, newest first.
async fn list(
    State(state): State<AppState>,
    Json(req): Json<ListCommentsRequest>,
) -> AppResult<ApiResponse<Vec<CommentView>>> {
    let comments = state.comment_service.list(&req.event_id).await?;
    Ok(ApiResponse::ok(comments))
}

async fn create(
    AuthSession(session): AuthSession,
    State(state): State<AppState>,
    Json(req): Json<CreateCommentInput>,
) -> AppResult<ApiResponse<CommentView>> {
    let comment = state.comment_service.create(&session, req).await?;
    Ok(ApiResponse::ok(comment))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/comments", post(list))
        .route("/comments/create", post(create))
}
