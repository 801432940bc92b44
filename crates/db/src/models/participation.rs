//! Role ledger rows and the song view built from them.

use musicclub_core::announcements::Mention;
use musicclub_core::fullness::FullnessSnapshot;
use musicclub_core::types::DbId;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::models::song::Song;

/// One occupant of a role, joined with the user's public fields.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Occupant {
    pub role: String,
    pub user_id: DbId,
    pub username: String,
    pub display_name: String,
    pub tg_user_id: Option<i64>,
}

impl Occupant {
    pub fn mention(&self) -> Mention {
        Mention {
            display_name: self.display_name.clone(),
            username: self.username.clone(),
            telegram_id: self.tg_user_id,
        }
    }
}

/// A required role and everyone currently filling it.
#[derive(Debug, Clone, Serialize)]
pub struct RoleSlot {
    pub role: String,
    pub occupants: Vec<Occupant>,
    /// Whether the viewing user occupies this role.
    pub joined_by_viewer: bool,
}

/// Current occupancy view of a song, returned by join/leave and song reads.
#[derive(Debug, Clone, Serialize)]
pub struct SongDetails {
    pub song: Song,
    pub roles: Vec<RoleSlot>,
    pub is_full: bool,
    /// Resolved discussion thread, if one has been created.
    pub topic_id: Option<i64>,
}

impl SongDetails {
    /// View assembled from a committed ledger change alone.
    ///
    /// Occupant lists are empty and the thread is unknown; used when the
    /// follow-up read of the full view fails after the change committed.
    pub fn from_ledger(change: &LedgerChange) -> Self {
        Self {
            song: change.song.clone(),
            roles: change
                .snapshot
                .required_after
                .iter()
                .map(|role| RoleSlot {
                    role: role.clone(),
                    occupants: Vec::new(),
                    joined_by_viewer: false,
                })
                .collect(),
            is_full: change.snapshot.full_after(),
            topic_id: None,
        }
    }
}

/// Result of a join/leave/replace applied inside one transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerChange {
    /// The song row as locked by the transaction.
    pub song: Song,
    /// Whether a row was actually inserted/removed.
    pub changed: bool,
    /// Role sets observed before and after the change, under the song row lock.
    pub snapshot: FullnessSnapshot,
}

/// Outcome of a ledger mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerOutcome {
    SongMissing,
    RoleMissing,
    Applied(LedgerChange),
}

/// Body of `POST /songs/{id}/roles/join` and `/leave`.
#[derive(Debug, Clone, Deserialize)]
pub struct RoleActionRequest {
    pub role: String,
    /// Act on behalf of this user instead of the caller.
    pub user_id: Option<DbId>,
}

/// Body of `PUT /songs/{id}/roles`.
#[derive(Debug, Clone, Deserialize)]
pub struct ReplaceRolesRequest {
    pub roles: Vec<String>,
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use musicclub_core::fullness::RoleSet;

    use super::*;

    fn roles(items: &[&str]) -> RoleSet {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn song() -> Song {
        Song {
            id: 7,
            title: "Creep".into(),
            artist: "Radiohead".into(),
            description: String::new(),
            link_url: String::new(),
            thumbnail_url: None,
            is_featured: false,
            created_by: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn ledger_view_lists_required_roles_without_occupants() {
        let change = LedgerChange {
            song: song(),
            changed: true,
            snapshot: FullnessSnapshot {
                required_before: roles(&["drums", "vocals"]),
                occupied_before: roles(&["drums"]),
                required_after: roles(&["drums", "vocals"]),
                occupied_after: roles(&["drums", "vocals"]),
            },
        };

        let view = SongDetails::from_ledger(&change);
        assert_eq!(view.song.id, 7);
        assert!(view.is_full);
        assert_eq!(view.topic_id, None);
        let names: Vec<_> = view.roles.iter().map(|r| r.role.as_str()).collect();
        assert_eq!(names, ["drums", "vocals"]);
        assert!(view.roles.iter().all(|r| r.occupants.is_empty()));
    }
}
