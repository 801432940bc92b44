//! Stored permission flags.

use musicclub_core::permissions::{PermissionSet, SongPermissions};
use musicclub_core::types::DbId;
use sqlx::FromRow;

/// A row from the `user_permissions` table.
#[derive(Debug, Clone, FromRow)]
pub struct UserPermissionRow {
    pub user_id: DbId,
    pub edit_own_participation: bool,
    pub edit_any_participation: bool,
    pub edit_own_songs: bool,
    pub edit_any_songs: bool,
    pub edit_featured_songs: bool,
}

impl From<UserPermissionRow> for PermissionSet {
    fn from(row: UserPermissionRow) -> Self {
        PermissionSet {
            songs: SongPermissions {
                edit_own_participation: row.edit_own_participation,
                edit_any_participation: row.edit_any_participation,
                edit_own_songs: row.edit_own_songs,
                edit_any_songs: row.edit_any_songs,
                edit_featured_songs: row.edit_featured_songs,
            },
        }
    }
}
