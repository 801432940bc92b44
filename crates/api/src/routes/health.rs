use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

/// Liveness of the database and the chat gateway.
#[derive(Serialize)]
pub struct HealthResponse {
    /// Overall service status.
    pub status: &'static str,
    /// Crate version from Cargo.toml.
    pub version: &'static str,
    /// Whether the database is reachable.
    pub db_healthy: bool,
    /// Whether chat notifications are configured.
    pub notifier_enabled: bool,
    /// Detached notification tasks still running.
    pub notifications_in_flight: usize,
}

/// GET /health -- database reachability plus notifier state, so an operator
/// can tell a silent chat from a misconfigured bot.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let db_healthy = musicclub_db::health_check(&state.pool).await.is_ok();

    let status = if db_healthy { "ok" } else { "degraded" };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        db_healthy,
        notifier_enabled: state.notifier.is_enabled(),
        notifications_in_flight: state.dispatcher.in_flight(),
    })
}

/// Mounted at the root, outside `/api/v1`.
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
