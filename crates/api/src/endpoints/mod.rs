//! API endpoints.

#![allow(missing_docs)]

mod auth;
mod comments;
mod events;
mod groups;
mod upload;

use axum::Router;

use crate::middleware::AppState;

/// Create the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(auth::router())
        .merge(events::router())
        .merge(groups::router())
        .merge(comments::router())
        .merge(upload::router())
}
