//! API middleware.

#![allow(missing_docs)]

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request, header},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use huddle_common::StorageBackend;
use huddle_core::{
    AuthService, CommentService, EventService, GroupService, IdentityProvider, SessionManager,
    SubscriptionService,
};

/// Name of the cookie carrying the session token.
pub const SESSION_COOKIE: &str = "huddle.session-token";

/// Cookie holding the OAuth `state` between redirect and callback.
pub const OAUTH_STATE_COOKIE: &str = "huddle.oauth-state";

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub auth_service: AuthService,
    pub session_manager: SessionManager,
    pub event_service: EventService,
    pub group_service: GroupService,
    pub subscription_service: SubscriptionService,
    pub comment_service: CommentService,
    /// Google sign-in, when configured.
    pub identity_provider: Option<Arc<dyn IdentityProvider>>,
    pub storage: Arc<dyn StorageBackend>,
    pub settings: ApiSettings,
}

/// Transport settings the handlers need.
#[derive(Debug, Clone)]
pub struct ApiSettings {
    pub cookie_secure: bool,
    pub max_upload_bytes: usize,
}

/// Session middleware.
///
/// Resolves the caller from a bearer token or the session cookie. A missing
/// or invalid token leaves the request anonymous; handlers that need a
/// session reject it through [`crate::extractors::AuthSession`].
pub async fn session_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    if let Some(token) = session_token(req.headers()) {
        match state.session_manager.verify(&token) {
            Ok(session) => {
                req.extensions_mut().insert(session);
            }
            Err(e) => tracing::debug!(error = %e, "Ignoring invalid session token"),
        }
    }

    next.run(req).await
}

/// Bearer token first, then the session cookie.
fn session_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string);

    bearer.or_else(|| {
        CookieJar::from_headers(headers)
            .get(SESSION_COOKIE)
            .map(|c| c.value().to_string())
    })
}

/// Cookie carrying a freshly issued session token.
pub(crate) fn session_cookie(token: String, settings: &ApiSettings) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .secure(settings.cookie_secure)
        .same_site(SameSite::Lax)
        .build()
}
