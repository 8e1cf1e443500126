/// Health check endpoint
///
/// Reports process liveness, dependency connectivity, and a snapshot of the
/// auth metrics counters.
///
/// # Endpoint
///
/// ```text
/// GET /health
/// ```
///
/// # Response
///
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0",
///   "database": "connected",
///   "session_store": "connected",
///   "metrics": { "login_success": 42, ... }
/// }
/// ```

use crate::{app::AppState, error::ApiResult};
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use taskstream_shared::metrics::MetricsSnapshot;

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status: healthy or degraded
    pub status: String,

    /// Application version
    pub version: String,

    /// Database status
    pub database: String,

    /// Session store status
    pub session_store: String,

    /// Auth counters for this instance
    pub metrics: MetricsSnapshot,
}

/// Health check handler
///
/// The endpoint always answers 200; a dependency outage shows up as
/// `"degraded"` so load balancers keep routing while operators see the
/// problem.
pub async fn health_check(State(state): State<AppState>) -> ApiResult<Json<HealthResponse>> {
    let database = match &state.db {
        Some(pool) => match taskstream_shared::db::pool::health_check(pool).await {
            Ok(()) => "connected",
            Err(_) => "disconnected",
        },
        None => "disabled",
    };

    let session_store = match &state.redis {
        Some(client) => match client.ping().await {
            Ok(true) => "connected",
            _ => "disconnected",
        },
        None => "disabled",
    };

    let degraded = database == "disconnected" || session_store == "disconnected";

    Ok(Json(HealthResponse {
        status: if degraded { "degraded" } else { "healthy" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: database.to_string(),
        session_store: session_store.to_string(),
        metrics: state.auth.metrics().snapshot(),
    }))
}
