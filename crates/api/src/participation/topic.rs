//! One-shot creation of a song's discussion thread.
//!
//! [`TopicClaimCoordinator::complete_song`] runs claim, create, then resolve
//! or release:
//!
//! 1. Claim the song's `song_topics` row with the sentinel. Only one caller
//!    across every process can win this conditional write.
//! 2. The winner creates the thread through the notifier. No transaction or
//!    row lock is held while the call is in flight.
//! 3. On success the sentinel is swapped for the thread id and the completion
//!    message is posted into the thread. On failure the sentinel is cleared
//!    so the backfill scan can retry.
//!
//! A resolved thread id is terminal: later leave/re-join cycles never create
//! a second thread.
//!
//! Once the claim is held the attempt must reach resolve or release, so it is
//! never run under an outer deadline. Each notifier call is bounded by the
//! coordinator's step timeout instead; database calls are bounded by the
//! pool's acquire timeout.

use std::sync::Arc;
use std::time::Duration;

use musicclub_core::song_topic::{build_topic_title, TopicState};
use musicclub_core::types::{DbId, ThreadId};
use musicclub_db::models::song::Song;
use musicclub_db::repositories::{RoleLedgerRepo, TopicClaimRepo};
use musicclub_notify::{Notifier, NotifyError};
use sqlx::PgPool;

use super::announce::Announcer;

// ---------------------------------------------------------------------------
// Outcome / error
// ---------------------------------------------------------------------------

/// What a completion attempt did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopicOutcome {
    /// This caller won the claim and created the thread.
    Created(ThreadId),
    /// The thread was created earlier.
    AlreadyExists(ThreadId),
    /// Another caller holds the claim and is creating the thread.
    InFlight,
    /// Notifications are disabled; no claim was taken.
    Skipped,
}

/// Failure of a completion attempt. Logged by callers, never surfaced to clients.
#[derive(Debug, thiserror::Error)]
pub enum TopicError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Thread creation failed: {0}")]
    ExternalUnavailable(#[from] NotifyError),

    /// The claim row changed under this caller (released or resolved elsewhere).
    #[error("Topic claim for song {song_id} is held by another resolution path")]
    Conflict { song_id: DbId },
}

// ---------------------------------------------------------------------------
// Coordinator
// ---------------------------------------------------------------------------

/// Guards thread creation and the completion announcement for each song.
pub struct TopicClaimCoordinator {
    pool: PgPool,
    notifier: Arc<dyn Notifier>,
    announcer: Announcer,
    step_timeout: Duration,
}

impl TopicClaimCoordinator {
    /// `step_timeout` bounds each notifier call made while the claim is held.
    pub fn new(pool: PgPool, notifier: Arc<dyn Notifier>, step_timeout: Duration) -> Self {
        let announcer = Announcer::new(Arc::clone(&notifier));
        Self {
            pool,
            notifier,
            announcer,
            step_timeout,
        }
    }

    /// Drive a full song to "thread created and announced", at most once.
    pub async fn complete_song(&self, song: &Song) -> Result<TopicOutcome, TopicError> {
        if !self.notifier.is_enabled() {
            tracing::debug!(song_id = song.id, "Notifier disabled, not claiming topic");
            return Ok(TopicOutcome::Skipped);
        }

        if !TopicClaimRepo::try_claim(&self.pool, song.id).await? {
            return self.lost_claim(song.id).await;
        }
        tracing::debug!(song_id = song.id, "Topic claim acquired");

        let title = build_topic_title(&song.title, &song.artist);
        let created = tokio::time::timeout(self.step_timeout, self.notifier.create_thread(&title))
            .await
            .unwrap_or(Err(NotifyError::Timeout));
        let thread_id = match created {
            Ok(id) => id,
            Err(e) => {
                self.release_after_failure(song.id).await;
                return Err(TopicError::ExternalUnavailable(e));
            }
        };

        match TopicClaimRepo::resolve(&self.pool, song.id, thread_id).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::error!(
                    song_id = song.id,
                    topic_id = thread_id,
                    "Topic claim changed while the thread was being created"
                );
                return Err(TopicError::Conflict { song_id: song.id });
            }
            Err(e) => {
                // Releasing here would let a retry create a duplicate thread.
                tracing::error!(
                    song_id = song.id,
                    topic_id = thread_id,
                    error = %e,
                    "Thread created but its id was not recorded; claim left in flight"
                );
                return Err(TopicError::Database(e));
            }
        }
        tracing::info!(song_id = song.id, topic_id = thread_id, "Song topic created");

        let participants = match RoleLedgerRepo::list_participants(&self.pool, song.id).await {
            Ok(participants) => participants,
            Err(e) => {
                tracing::warn!(
                    song_id = song.id,
                    error = %e,
                    "Failed to load participants for completion message"
                );
                Vec::new()
            }
        };
        let announce = self.announcer.announce_completion(song, thread_id, &participants);
        if tokio::time::timeout(self.step_timeout, announce).await.is_err() {
            tracing::warn!(
                song_id = song.id,
                topic_id = thread_id,
                "Completion message timed out"
            );
        }

        Ok(TopicOutcome::Created(thread_id))
    }

    /// Classify a failed claim from the row's current state.
    async fn lost_claim(&self, song_id: DbId) -> Result<TopicOutcome, TopicError> {
        match TopicClaimRepo::state(&self.pool, song_id).await? {
            TopicState::Resolved(id) => {
                tracing::debug!(song_id, topic_id = id, "Song topic already exists");
                Ok(TopicOutcome::AlreadyExists(id))
            }
            TopicState::Claimed => {
                tracing::debug!(song_id, "Song topic creation already in flight");
                Ok(TopicOutcome::InFlight)
            }
            // Released between our claim attempt and this read.
            TopicState::Unclaimed => Err(TopicError::Conflict { song_id }),
        }
    }

    async fn release_after_failure(&self, song_id: DbId) {
        match TopicClaimRepo::release(&self.pool, song_id).await {
            Ok(true) => tracing::info!(song_id, "Topic claim released after failed creation"),
            Ok(false) => tracing::warn!(song_id, "Topic claim was no longer held at release"),
            Err(e) => tracing::error!(
                song_id,
                error = %e,
                "Failed to release topic claim; it stays in flight until repaired"
            ),
        }
    }
}
