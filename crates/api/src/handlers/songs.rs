//! Handlers for song participation.
//!
//! Each mutating endpoint returns the song's occupancy view as soon as the
//! ledger change commits. Announcements and topic creation happen afterwards
//! and never change the response.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use musicclub_core::error::CoreError;
use musicclub_core::types::DbId;
use musicclub_db::models::participation::{ReplaceRolesRequest, RoleActionRequest};
use musicclub_db::repositories::SongRepo;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/songs/{id}
pub async fn get_song(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(song_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let details = SongRepo::find_details(&state.pool, song_id, Some(auth.user_id))
        .await?
        .ok_or(CoreError::NotFound {
            entity: "Song",
            id: song_id,
        })?;
    Ok(Json(DataResponse { data: details }))
}

/// PUT /api/v1/songs/{id}/roles
///
/// Replace the song's required roles. Requires `edit_any_songs`, or
/// `edit_own_songs` on a song the caller created.
pub async fn replace_roles(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(song_id): Path<DbId>,
    Json(input): Json<ReplaceRolesRequest>,
) -> AppResult<impl IntoResponse> {
    let details = state
        .participation
        .replace_roles(auth.user_id, song_id, &input.roles)
        .await?;
    Ok(Json(DataResponse { data: details }))
}

/// POST /api/v1/songs/{id}/roles/join
///
/// Joining a role the user already holds is a no-op and announces nothing.
pub async fn join_role(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(song_id): Path<DbId>,
    Json(input): Json<RoleActionRequest>,
) -> AppResult<impl IntoResponse> {
    let details = state
        .participation
        .join(auth.user_id, song_id, &input.role, input.user_id)
        .await?;
    Ok(Json(DataResponse { data: details }))
}

/// POST /api/v1/songs/{id}/roles/leave
pub async fn leave_role(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(song_id): Path<DbId>,
    Json(input): Json<RoleActionRequest>,
) -> AppResult<impl IntoResponse> {
    let details = state
        .participation
        .leave(auth.user_id, song_id, &input.role, input.user_id)
        .await?;
    Ok(Json(DataResponse { data: details }))
}
