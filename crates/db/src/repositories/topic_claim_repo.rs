//! Compare-and-swap operations on `song_topics.topic_id`.
//!
//! A row is created once per song. Its `topic_id` moves between three states:
//! `NULL` (released), the `-1` sentinel (claimed, thread creation in flight),
//! and a positive thread id (resolved, terminal). Every transition is a single
//! guarded statement, so at most one caller ever observes a successful claim.

use musicclub_core::song_topic::{TopicState, TOPIC_CLAIM_SENTINEL};
use musicclub_core::types::{DbId, ThreadId};
use sqlx::PgPool;

use crate::models::song_topic::SongTopic;

/// Column list for `song_topics` queries.
const COLUMNS: &str = "song_id, topic_id, created_at, updated_at";

/// Provides the claim/resolve/release protocol for per-song threads.
pub struct TopicClaimRepo;

impl TopicClaimRepo {
    /// Fetch the claim row for a song, if one was ever created.
    pub async fn find(pool: &PgPool, song_id: DbId) -> Result<Option<SongTopic>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM song_topics WHERE song_id = $1");
        sqlx::query_as::<_, SongTopic>(&query)
            .bind(song_id)
            .fetch_optional(pool)
            .await
    }

    /// Current claim state of a song. A missing row is `Unclaimed`.
    pub async fn state(pool: &PgPool, song_id: DbId) -> Result<TopicState, sqlx::Error> {
        let topic = Self::find(pool, song_id).await?;
        Ok(TopicState::from_column(topic.and_then(|t| t.topic_id)))
    }

    /// Claim a song that has never been claimed.
    ///
    /// Inserts the row with the sentinel. Returns `true` only for the caller
    /// whose insert went through.
    pub async fn insert_claim(pool: &PgPool, song_id: DbId) -> Result<bool, sqlx::Error> {
        let inserted = sqlx::query_scalar::<_, DbId>(
            "INSERT INTO song_topics (song_id, topic_id) VALUES ($1, $2) \
             ON CONFLICT (song_id) DO NOTHING \
             RETURNING song_id",
        )
        .bind(song_id)
        .bind(TOPIC_CLAIM_SENTINEL)
        .fetch_optional(pool)
        .await?;
        Ok(inserted.is_some())
    }

    /// Claim a previously released song (`topic_id IS NULL`).
    ///
    /// A sentinel or a resolved id is never overwritten.
    pub async fn reclaim(pool: &PgPool, song_id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE song_topics SET topic_id = $2, updated_at = NOW() \
             WHERE song_id = $1 AND topic_id IS NULL",
        )
        .bind(song_id)
        .bind(TOPIC_CLAIM_SENTINEL)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Try the insert, then the re-claim. Returns `true` if this caller holds the claim.
    pub async fn try_claim(pool: &PgPool, song_id: DbId) -> Result<bool, sqlx::Error> {
        if Self::insert_claim(pool, song_id).await? {
            return Ok(true);
        }
        Self::reclaim(pool, song_id).await
    }

    /// Store the created thread id. Only succeeds from the sentinel.
    pub async fn resolve(
        pool: &PgPool,
        song_id: DbId,
        topic_id: ThreadId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE song_topics SET topic_id = $2, updated_at = NOW() \
             WHERE song_id = $1 AND topic_id = $3",
        )
        .bind(song_id)
        .bind(topic_id)
        .bind(TOPIC_CLAIM_SENTINEL)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Give a claim back after thread creation failed. Only succeeds from the sentinel.
    pub async fn release(pool: &PgPool, song_id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE song_topics SET topic_id = NULL, updated_at = NOW() \
             WHERE song_id = $1 AND topic_id = $2",
        )
        .bind(song_id)
        .bind(TOPIC_CLAIM_SENTINEL)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Claims that have held the sentinel for longer than `older_than_mins`.
    ///
    /// These are never reset automatically; they are reported so an operator
    /// can check the chat before releasing them.
    pub async fn list_stuck_claims(
        pool: &PgPool,
        older_than_mins: i32,
    ) -> Result<Vec<SongTopic>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM song_topics \
             WHERE topic_id = $1 AND updated_at < NOW() - make_interval(mins => $2) \
             ORDER BY updated_at ASC"
        );
        sqlx::query_as::<_, SongTopic>(&query)
            .bind(TOPIC_CLAIM_SENTINEL)
            .bind(older_than_mins)
            .fetch_all(pool)
            .await
    }
}
