//! Repository for the `songs` table and the song occupancy view.

use std::collections::BTreeMap;

use musicclub_core::fullness::{is_full, RoleSet};
use musicclub_core::types::DbId;
use sqlx::{PgExecutor, PgPool};

use crate::models::participation::{RoleSlot, SongDetails};
use crate::models::song::{CreateSong, Song};
use crate::repositories::{RoleLedgerRepo, TopicClaimRepo};

/// Column list for `songs` queries.
const COLUMNS: &str = "id, title, artist, description, link_url, thumbnail_url, \
                       is_featured, created_by, created_at, updated_at";

/// Same columns qualified with the `s` alias, for JOIN queries.
const ALIASED_COLUMNS: &str = "s.id, s.title, s.artist, s.description, s.link_url, \
                               s.thumbnail_url, s.is_featured, s.created_by, \
                               s.created_at, s.updated_at";

/// Provides data access for songs.
pub struct SongRepo;

impl SongRepo {
    /// Insert a new song.
    pub async fn create(pool: &PgPool, input: &CreateSong) -> Result<Song, sqlx::Error> {
        let query = format!(
            "INSERT INTO songs \
                (title, artist, description, link_url, thumbnail_url, is_featured, created_by) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Song>(&query)
            .bind(&input.title)
            .bind(&input.artist)
            .bind(&input.description)
            .bind(&input.link_url)
            .bind(&input.thumbnail_url)
            .bind(input.is_featured)
            .bind(input.created_by)
            .fetch_one(pool)
            .await
    }

    /// Find a song by its internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Song>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM songs WHERE id = $1");
        sqlx::query_as::<_, Song>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Lock a song row for the rest of the current transaction.
    ///
    /// Every ledger mutation takes this lock first, so mutations on the same
    /// song are linearized and their before/after snapshots are exact.
    pub async fn lock_for_update<'e, E>(executor: E, id: DbId) -> Result<Option<Song>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!("SELECT {COLUMNS} FROM songs WHERE id = $1 FOR UPDATE");
        sqlx::query_as::<_, Song>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Build the occupancy view of a song.
    ///
    /// `viewer` marks the roles the viewing user occupies. Returns `None` if
    /// the song does not exist.
    pub async fn find_details(
        pool: &PgPool,
        id: DbId,
        viewer: Option<DbId>,
    ) -> Result<Option<SongDetails>, sqlx::Error> {
        let Some(song) = Self::find_by_id(pool, id).await? else {
            return Ok(None);
        };

        let required = RoleLedgerRepo::required_roles(pool, id).await?;
        let occupants = RoleLedgerRepo::list_occupants(pool, id).await?;

        let mut slots: BTreeMap<String, RoleSlot> = required
            .iter()
            .map(|role| {
                (
                    role.clone(),
                    RoleSlot {
                        role: role.clone(),
                        occupants: Vec::new(),
                        joined_by_viewer: false,
                    },
                )
            })
            .collect();

        let mut occupied = RoleSet::new();
        for occupant in occupants {
            let Some(slot) = slots.get_mut(&occupant.role) else {
                continue;
            };
            occupied.insert(occupant.role.clone());
            if viewer == Some(occupant.user_id) {
                slot.joined_by_viewer = true;
            }
            slot.occupants.push(occupant);
        }

        let topic_id = TopicClaimRepo::find(pool, id)
            .await?
            .and_then(|t| t.state().resolved_id());

        Ok(Some(SongDetails {
            song,
            is_full: is_full(&required, &occupied),
            roles: slots.into_values().collect(),
            topic_id,
        }))
    }

    /// Songs whose every required role is occupied but which have no thread
    /// and no claim in flight.
    ///
    /// Songs without required roles are never returned. This is the input of
    /// the topic backfill scan.
    pub async fn list_full_without_topic(pool: &PgPool) -> Result<Vec<Song>, sqlx::Error> {
        let query = format!(
            "SELECT {ALIASED_COLUMNS} FROM songs s \
             LEFT JOIN song_topics st ON st.song_id = s.id \
             WHERE (st.song_id IS NULL OR st.topic_id IS NULL) \
               AND EXISTS (SELECT 1 FROM song_roles sr WHERE sr.song_id = s.id) \
               AND NOT EXISTS ( \
                   SELECT 1 FROM song_roles sr \
                   WHERE sr.song_id = s.id \
                     AND NOT EXISTS ( \
                         SELECT 1 FROM song_role_assignments sra \
                         WHERE sra.song_id = sr.song_id AND sra.role = sr.role \
                     ) \
               ) \
             ORDER BY s.id ASC"
        );
        sqlx::query_as::<_, Song>(&query).fetch_all(pool).await
    }
}
