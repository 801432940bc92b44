pub mod admin;
pub mod health;
pub mod songs;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /songs/{id}                          song view (auth)
/// /songs/{id}/roles                    replace required roles (PUT, auth)
/// /songs/{id}/roles/join               join a role (POST, auth)
/// /songs/{id}/roles/leave              leave a role (POST, auth)
///
/// /admin/song-topics/backfill          re-drive topic creation (POST, admin)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/songs", songs::router())
        .nest("/admin", admin::router())
}
