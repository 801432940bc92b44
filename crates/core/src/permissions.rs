//! Permission set consumed by the participation and song-edit paths.
//!
//! Permission storage lives in the database crate; the predicates here are
//! pure so they can be unit-tested without a connection.

use serde::{Deserialize, Serialize};

use crate::types::DbId;

/// Song-related permission flags for one user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SongPermissions {
    /// May join/leave roles as themselves.
    pub edit_own_participation: bool,
    /// May join/leave roles on behalf of any user.
    pub edit_any_participation: bool,
    /// May edit songs they created.
    pub edit_own_songs: bool,
    /// May edit any song.
    pub edit_any_songs: bool,
    /// May toggle the featured flag.
    pub edit_featured_songs: bool,
}

impl Default for SongPermissions {
    /// Defaults for a member without an explicit permission row.
    fn default() -> Self {
        Self {
            edit_own_participation: true,
            edit_any_participation: false,
            edit_own_songs: true,
            edit_any_songs: false,
            edit_featured_songs: false,
        }
    }
}

/// Full permission set for a user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionSet {
    pub songs: SongPermissions,
}

/// Whether `acting_user` may join or leave a role as `target_user`.
pub fn permission_allows_join(
    perms: &PermissionSet,
    acting_user: DbId,
    target_user: DbId,
) -> bool {
    if perms.songs.edit_any_participation {
        return true;
    }
    acting_user == target_user && perms.songs.edit_own_participation
}

/// Whether `acting_user` may edit a song created by `creator`.
pub fn permission_allows_song_edit(
    perms: &PermissionSet,
    creator: Option<DbId>,
    acting_user: DbId,
) -> bool {
    if perms.songs.edit_any_songs {
        return true;
    }
    perms.songs.edit_own_songs && creator == Some(acting_user)
}
