//! Admin maintenance handlers.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;

use crate::background::topic_backfill::run_backfill;
use crate::error::AppResult;
use crate::middleware::rbac::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

/// POST /api/v1/admin/song-topics/backfill
///
/// Run one topic backfill pass now and return its counts.
pub async fn backfill_song_topics(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let report = run_backfill(&state.pool, &state.topics).await?;
    tracing::info!(user_id = admin.user_id, ?report, "Manual topic backfill finished");
    Ok(Json(DataResponse { data: report }))
}
