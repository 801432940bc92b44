//! Admin-only maintenance routes.

use axum::routing::post;
use axum::Router;

use crate::handlers::admin;
use crate::state::AppState;

/// Admin routes mounted at `/admin`.
///
/// ```text
/// POST /song-topics/backfill   -> backfill_song_topics
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/song-topics/backfill", post(admin::backfill_song_topics))
}
