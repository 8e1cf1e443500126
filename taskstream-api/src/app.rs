/// Application state and router builder
///
/// Defines the shared state handed to every handler and assembles the Axum
/// router with its middleware stack.
///
/// # Router layout
///
/// ```text
/// /
/// ├── /health                 # Health check (public)
/// └── /v1/auth/               # Authentication endpoints (public)
///     ├── POST /login
///     ├── POST /verify
///     ├── POST /refresh
///     └── POST /logout
/// ```
///
/// # Middleware stack
///
/// Applied outermost first: request tracing, CORS, security headers.

use crate::{config::Config, middleware::security::SecurityHeadersLayer};
use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use taskstream_shared::auth::service::AuthService;
use taskstream_shared::store::client::RedisClient;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// Cloned into each request handler via Axum's `State` extractor; all
/// members are cheap to clone.
#[derive(Clone)]
pub struct AppState {
    /// Authentication orchestrator
    pub auth: AuthService,

    /// Application configuration
    pub config: Arc<Config>,

    /// Database pool, for health reporting; `None` when running against
    /// in-memory backends
    pub db: Option<PgPool>,

    /// Session store client, for health reporting
    pub redis: Option<RedisClient>,
}

impl AppState {
    /// Creates application state over in-memory-friendly collaborators
    pub fn new(auth: AuthService, config: Config) -> Self {
        Self {
            auth,
            config: Arc::new(config),
            db: None,
            redis: None,
        }
    }

    /// Attaches the database pool for health reporting
    pub fn with_db(mut self, db: PgPool) -> Self {
        self.db = Some(db);
        self
    }

    /// Attaches the session store client for health reporting
    pub fn with_redis(mut self, redis: RedisClient) -> Self {
        self.redis = Some(redis);
        self
    }
}

/// Builds the complete Axum router with all routes and middleware
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    // All auth endpoints are public; credential checks happen inside the
    // handlers, not in a middleware layer
    let auth_routes = Router::new()
        .route("/login", post(routes::auth::login))
        .route("/verify", post(routes::auth::verify))
        .route("/refresh", post(routes::auth::refresh))
        .route("/logout", post(routes::auth::logout));

    let cors = if state.config.api.cors_origins.contains(&"*".to_string()) {
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    Router::new()
        .merge(health_routes)
        .nest("/v1/auth", auth_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}
