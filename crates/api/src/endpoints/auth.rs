//! Authentication endpoints.

use axum::{
    Json, Router,
    extract::{Query, State},
    response::Redirect,
    routing::{get, post},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use huddle_common::{AppError, AppResult};
use huddle_core::{Session, SignInInput, SignupInput};
use huddle_db::entities::user::{self, AuthProvider};
use serde::{Deserialize, Serialize};

use crate::{
    extractors::{AuthSession, MaybeSession},
    middleware::{AppState, OAUTH_STATE_COOKIE, SESSION_COOKIE, session_cookie},
    response::{ApiResponse, Done},
};

/// Public view of an account.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub image: Option<String>,
    pub provider: AuthProvider,
    pub created_at: String,
}

impl From<user::Model> for UserResponse {
    fn from(u: user::Model) -> Self {
        Self {
            id: u.id,
            email: u.email,
            name: u.name,
            image: u.image,
            provider: u.provider,
            created_at: u.created_at.to_rfc3339(),
        }
    }
}

/// Signin response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SigninResponse {
    pub user: UserResponse,
    /// Same token as the cookie, for clients that send a bearer header.
    pub token: String,
}

/// Create a new credentials account.
async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupInput>,
) -> AppResult<ApiResponse<UserResponse>> {
    let user = state.auth_service.signup(req).await?;
    Ok(ApiResponse::ok(user.into()))
}

/// Sign in with email and password.
async fn signin(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<SignInInput>,
) -> AppResult<(CookieJar, ApiResponse<SigninResponse>)> {
    let user = state
        .auth_service
        .authenticate(&req.email, &req.password)
        .await?;

    let token = state.session_manager.issue(&Session::from_user(&user))?;
    let jar = jar.add(session_cookie(token.clone(), &state.settings));

    Ok((
        jar,
        ApiResponse::ok(SigninResponse {
            user: user.into(),
            token,
        }),
    ))
}

/// Sign out by dropping the session cookie.
async fn signout(jar: CookieJar) -> (CookieJar, ApiResponse<Done>) {
    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    (jar, ApiResponse::ok(Done::YES))
}

/// The signed-in account.
async fn me(
    AuthSession(session): AuthSession,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<UserResponse>> {
    let user = state.auth_service.me(&session).await?;
    Ok(ApiResponse::ok(user.into()))
}

/// The decoded session, or `null` when anonymous.
async fn session(MaybeSession(session): MaybeSession) -> ApiResponse<Option<Session>> {
    ApiResponse::ok(session)
}

/// Start Google sign-in.
async fn google_redirect(
    State(state): State<AppState>,
    jar: CookieJar,
) -> AppResult<(CookieJar, Redirect)> {
    let provider = state
        .identity_provider
        .as_ref()
        .ok_or_else(|| AppError::NotFound("Google sign-in is not configured".to_string()))?;

    let csrf_state = uuid::Uuid::new_v4().simple().to_string();
    let url = provider.authorize_url(&csrf_state)?;

    let cookie = Cookie::build((OAUTH_STATE_COOKIE, csrf_state))
        .path("/api/auth/oauth")
        .http_only(true)
        .secure(state.settings.cookie_secure)
        .same_site(SameSite::Lax)
        .build();

    Ok((jar.add(cookie), Redirect::to(&url)))
}

/// Query string the provider redirects back with.
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// Finish Google sign-in: create the account if needed and set the session.
async fn google_callback(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<CallbackQuery>,
) -> AppResult<(CookieJar, Redirect)> {
    let provider = state
        .identity_provider
        .as_ref()
        .ok_or_else(|| AppError::NotFound("Google sign-in is not configured".to_string()))?;

    if let Some(error) = query.error {
        return Err(AppError::Unauthorized(format!("Sign-in was declined: {error}")));
    }

    let expected = jar.get(OAUTH_STATE_COOKIE).map(|c| c.value().to_string());
    if expected.is_none() || expected != query.state {
        return Err(AppError::BadRequest("OAuth state mismatch".to_string()));
    }

    let code = query
        .code
        .ok_or_else(|| AppError::BadRequest("Missing authorization code".to_string()))?;

    let identity = provider.exchange_code(&code).await?;
    let user = state.auth_service.sign_in_external(identity).await?;
    let token = state.session_manager.issue(&Session::from_user(&user))?;

    tracing::info!(user_id = %user.id, "Signed in with Google");

    let jar = jar
        .remove(Cookie::build(OAUTH_STATE_COOKIE).path("/api/auth/oauth"))
        .add(session_cookie(token, &state.settings));

    Ok((jar, Redirect::to("/")))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/signin", post(signin))
        .route("/auth/signout", post(signout))
        .route("/auth/me", post(me))
        .route("/auth/session", post(session))
        .route("/auth/oauth/google", get(google_redirect))
        .route("/auth/oauth/google/callback", get(google_callback))
}
