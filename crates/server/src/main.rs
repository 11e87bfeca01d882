//! Huddle server entry point.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{Json, Router, extract::DefaultBodyLimit, middleware, routing::get};
use huddle_api::middleware::{ApiSettings, AppState};
use huddle_api::{router as api_router, session_middleware};
use huddle_common::{AppResult, Config, LocalStorage};
use huddle_core::{
    AuthService, CommentService, EventService, GoogleIdentityProvider, GroupService,
    IdentityProvider, SessionManager, SubscriptionService,
};
use huddle_db::repositories::{
    CommentRepository, EventRepository, GroupRepository, SubscriptionRepository, UserRepository,
};
use sea_orm::DatabaseConnection;
use serde_json::{Value, json};
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Room for multipart framing on top of the largest accepted file.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
///
/// On Unix systems, this listens for both SIGINT (Ctrl+C) and SIGTERM.
/// On Windows, this only listens for Ctrl+C.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received SIGINT, initiating graceful shutdown...");
        },
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}

/// Liveness probe.
async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Wire repositories and services over one connection pool.
fn build_state(db: Arc<DatabaseConnection>, config: &Config) -> AppResult<AppState> {
    let user_repo = UserRepository::new(Arc::clone(&db));
    let group_repo = GroupRepository::new(Arc::clone(&db));
    let event_repo = EventRepository::new(Arc::clone(&db));
    let subscription_repo = SubscriptionRepository::new(Arc::clone(&db));
    let comment_repo = CommentRepository::new(db);

    let identity_provider: Option<Arc<dyn IdentityProvider>> = match &config.oauth.google {
        Some(google) => {
            info!("Google sign-in enabled");
            Some(Arc::new(GoogleIdentityProvider::new(google.clone())?))
        }
        None => None,
    };

    let storage = LocalStorage::new(
        config.storage.base_path.clone(),
        config.storage.base_url.clone(),
    );

    Ok(AppState {
        auth_service: AuthService::new(user_repo.clone()),
        session_manager: SessionManager::new(&config.session),
        event_service: EventService::new(event_repo.clone()),
        group_service: GroupService::new(group_repo, event_repo.clone(), user_repo.clone()),
        subscription_service: SubscriptionService::new(
            subscription_repo,
            event_repo.clone(),
            user_repo.clone(),
        ),
        comment_service: CommentService::new(comment_repo, event_repo, user_repo),
        identity_provider,
        storage: Arc::new(storage),
        settings: ApiSettings {
            cookie_secure: config.session.cookie_secure,
            max_upload_bytes: config.storage.max_upload_bytes,
        },
    })
}

fn build_app(state: AppState, config: &Config) -> Router {
    let api = api_router()
        .layer(middleware::from_fn_with_state(
            state.clone(),
            session_middleware,
        ))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(
            config.storage.max_upload_bytes + MULTIPART_OVERHEAD,
        ))
        .with_state(state);

    Router::new()
        .route("/health", get(health))
        .nest("/api", api)
        .nest_service("/files", ServeDir::new(&config.storage.base_path))
        .layer(
            ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            ),
        )
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "huddle=debug,tower_http=debug".into()),
        )
        .init();

    info!("Starting huddle server...");

    // Load configuration
    let config = Config::load()?;

    // Connect to database
    let db = huddle_db::init(&config).await?;
    info!("Connected to database");

    // Run migrations
    info!("Running database migrations...");
    huddle_db::migrate(&db).await?;
    info!("Migrations completed");

    tokio::fs::create_dir_all(&config.storage.base_path).await?;

    let state = build_state(Arc::new(db), &config)?;
    let app = build_app(state, &config);

    // Start server with graceful shutdown
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}
