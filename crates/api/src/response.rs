//! API response types.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// Standard API response wrapper.
///
/// Failures never go through this type; handlers return
/// [`huddle_common::AppError`], which renders `{ "error": { code, message } }`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Create a success response.
    pub const fn ok(data: T) -> Self {
        Self { data }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// Body of mutations that have nothing else to report.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Done {
    pub ok: bool,
}

impl Done {
    /// Success marker.
    pub const YES: Self = Self { ok: true };
}
