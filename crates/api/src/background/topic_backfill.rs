//! Recovery scan for songs that are full but have no discussion thread.
//!
//! Re-drives the topic claim for every such song. It relies on the same
//! conditional writes as live traffic, so it is safe to run concurrently with
//! join requests and with other server processes. Runs once at startup, then
//! on a fixed interval, and on demand from the admin endpoint.

use std::sync::Arc;
use std::time::Duration;

use musicclub_core::song_topic::STUCK_CLAIM_AGE_MINS;
use musicclub_db::repositories::{SongRepo, TopicClaimRepo};
use serde::Serialize;
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;

use crate::participation::{TopicClaimCoordinator, TopicError, TopicOutcome};

/// Counts from one backfill pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BackfillReport {
    /// Full songs without a resolved thread.
    pub scanned: u32,
    pub created: u32,
    pub already_resolved: u32,
    pub in_flight: u32,
    pub failed: u32,
    /// Notifications disabled; nothing was claimed.
    pub skipped: u32,
    /// Sentinel claims older than the stuck threshold.
    pub stuck: u32,
}

/// Run one backfill pass.
pub async fn run_backfill(
    pool: &PgPool,
    coordinator: &TopicClaimCoordinator,
) -> Result<BackfillReport, sqlx::Error> {
    let mut report = BackfillReport::default();

    let songs = SongRepo::list_full_without_topic(pool).await?;
    for song in &songs {
        report.scanned += 1;
        match coordinator.complete_song(song).await {
            Ok(TopicOutcome::Created(topic_id)) => {
                tracing::info!(song_id = song.id, topic_id, "Topic backfill: thread created");
                report.created += 1;
            }
            Ok(TopicOutcome::AlreadyExists(_)) => report.already_resolved += 1,
            Ok(TopicOutcome::InFlight) | Err(TopicError::Conflict { .. }) => report.in_flight += 1,
            Ok(TopicOutcome::Skipped) => report.skipped += 1,
            Err(e) => {
                tracing::warn!(song_id = song.id, error = %e, "Topic backfill: song failed");
                report.failed += 1;
            }
        }
    }

    let stuck = TopicClaimRepo::list_stuck_claims(pool, STUCK_CLAIM_AGE_MINS).await?;
    for claim in &stuck {
        tracing::warn!(
            song_id = claim.song_id,
            claimed_at = %claim.updated_at,
            "Topic claim stuck in flight; check the chat and release it manually"
        );
    }
    report.stuck = stuck.len() as u32;

    Ok(report)
}

/// Run the backfill at startup, then every `interval` until `cancel` fires.
///
/// With no interval the loop exits after the startup pass.
pub async fn run(
    pool: PgPool,
    coordinator: Arc<TopicClaimCoordinator>,
    interval: Option<Duration>,
    cancel: CancellationToken,
) {
    tracing::info!(
        interval_secs = interval.map(|i| i.as_secs()),
        "Topic backfill job started"
    );

    let mut ticker = interval
        .map(|period| tokio::time::interval_at(tokio::time::Instant::now() + period, period));

    loop {
        // A pass is never interrupted: dropping it mid-claim would strand a sentinel.
        match run_backfill(&pool, &coordinator).await {
            Ok(report) if report.scanned > 0 || report.stuck > 0 => {
                tracing::info!(?report, "Topic backfill pass finished");
            }
            Ok(_) => tracing::debug!("Topic backfill: nothing to do"),
            Err(e) => tracing::error!(error = %e, "Topic backfill pass failed"),
        }

        let Some(ticker) = ticker.as_mut() else {
            break;
        };
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Topic backfill job stopping");
                break;
            }
            _ = ticker.tick() => {}
        }
    }
}
