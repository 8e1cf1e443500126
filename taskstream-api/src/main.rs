//! # TaskStream Auth API Server
//!
//! Binary entry point: loads configuration, connects Postgres and the
//! session store, assembles the auth service, and serves the HTTP API.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p taskstream-api
//! ```

use std::sync::Arc;

use taskstream_api::{
    app::{build_router, AppState},
    config::Config,
};
use taskstream_shared::auth::service::{AuthService, AuthServiceConfig};
use taskstream_shared::auth::token::TokenConfig;
use taskstream_shared::db::pool::{create_pool, DatabaseConfig};
use taskstream_shared::metrics::AuthMetrics;
use taskstream_shared::models::user::PgUserStore;
use taskstream_shared::ratelimit::{LoginRateLimiter, RateLimitConfig};
use taskstream_shared::store::client::{RedisClient, RedisConfig};
use taskstream_shared::store::session::RedisSessionStore;
use taskstream_shared::store::tokens::{GatewayConfig, TokenStoreGateway};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "taskstream_api=info,taskstream_shared=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        "TaskStream Auth API v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let config = Config::from_env()?;

    let pool = create_pool(DatabaseConfig {
        url: config.database.url.clone(),
        max_connections: config.database.max_connections,
        ..Default::default()
    })
    .await?;

    let redis = RedisClient::new(RedisConfig {
        url: config.redis.url.clone(),
        connection_timeout_secs: 5,
        command_timeout_secs: 5,
    })
    .await?;

    let session_store = Arc::new(RedisSessionStore::new(redis.clone()));

    let auth = AuthService::new(
        Arc::new(PgUserStore::new(pool.clone())),
        TokenStoreGateway::new(session_store.clone(), GatewayConfig::default()),
        LoginRateLimiter::new(session_store, RateLimitConfig::default()),
        Arc::new(AuthMetrics::new()),
        AuthServiceConfig {
            tokens: TokenConfig {
                access_ttl_secs: config.jwt.access_ttl_secs,
                refresh_ttl_secs: config.jwt.refresh_ttl_secs,
                ..TokenConfig::default()
            },
            ..AuthServiceConfig::new(config.jwt.secret.clone())
        },
    );

    let bind_address = config.bind_address();
    let state = AppState::new(auth, config)
        .with_db(pool.clone())
        .with_redis(redis);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!("Server listening on http://{}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutdown complete, closing database pool");
    taskstream_shared::db::pool::close_pool(pool).await;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutdown signal received");
}
