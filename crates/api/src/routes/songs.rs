//! Route definitions for song participation.
//!
//! All endpoints require authentication via the `AuthUser` extractor.

use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::songs;
use crate::state::AppState;

/// Song routes mounted at `/songs`.
///
/// ```text
/// GET  /{id}                 -> get_song
/// PUT  /{id}/roles           -> replace_roles
/// POST /{id}/roles/join      -> join_role
/// POST /{id}/roles/leave     -> leave_role
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{id}", get(songs::get_song))
        .route("/{id}/roles", put(songs::replace_roles))
        .route("/{id}/roles/join", post(songs::join_role))
        .route("/{id}/roles/leave", post(songs::leave_role))
}
