//! Repository for the `user_permissions` table.

use musicclub_core::permissions::{PermissionSet, SongPermissions};
use musicclub_core::types::DbId;
use sqlx::PgPool;

use crate::models::permission::UserPermissionRow;

const COLUMNS: &str = "user_id, edit_own_participation, edit_any_participation, \
                       edit_own_songs, edit_any_songs, edit_featured_songs";

/// Loads and stores per-user permission flags.
pub struct PermissionRepo;

impl PermissionRepo {
    /// Load the permission set for a user.
    ///
    /// Users without a row get [`PermissionSet::default`].
    pub async fn load_for_user(pool: &PgPool, user_id: DbId) -> Result<PermissionSet, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM user_permissions WHERE user_id = $1");
        let row = sqlx::query_as::<_, UserPermissionRow>(&query)
            .bind(user_id)
            .fetch_optional(pool)
            .await?;
        Ok(row.map(PermissionSet::from).unwrap_or_default())
    }

    /// Insert or replace the permission flags for a user.
    pub async fn upsert(
        pool: &PgPool,
        user_id: DbId,
        songs: &SongPermissions,
    ) -> Result<PermissionSet, sqlx::Error> {
        let query = format!(
            "INSERT INTO user_permissions \
                (user_id, edit_own_participation, edit_any_participation, \
                 edit_own_songs, edit_any_songs, edit_featured_songs) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT (user_id) DO UPDATE SET \
                edit_own_participation = EXCLUDED.edit_own_participation, \
                edit_any_participation = EXCLUDED.edit_any_participation, \
                edit_own_songs = EXCLUDED.edit_own_songs, \
                edit_any_songs = EXCLUDED.edit_any_songs, \
                edit_featured_songs = EXCLUDED.edit_featured_songs, \
                updated_at = NOW() \
             RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, UserPermissionRow>(&query)
            .bind(user_id)
            .bind(songs.edit_own_participation)
            .bind(songs.edit_any_participation)
            .bind(songs.edit_own_songs)
            .bind(songs.edit_any_songs)
            .bind(songs.edit_featured_songs)
            .fetch_one(pool)
            .await?;
        Ok(row.into())
    }
}
