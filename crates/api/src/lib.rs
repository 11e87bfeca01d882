//! HTTP API layer for huddle.
//!
//! This crate provides the JSON API:
//!
//! - **Endpoints**: auth, events, groups, comments and image upload
//! - **Extractors**: session extraction
//! - **Middleware**: session cookie and bearer token resolution
//!
//! Built on Axum 0.8 with Tower middleware stack.

pub mod endpoints;
pub mod extractors;
pub mod middleware;
pub mod response;

pub use endpoints::router;
pub use middleware::{AppState, session_middleware};
