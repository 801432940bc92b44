//! Service-level tests for the join/leave flow and the one-shot topic claim.
//!
//! Drives `RoleAssignmentService` directly against a real database and a
//! `RecordingNotifier`, then flushes the dispatcher before asserting on the
//! external calls.

mod common;

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use async_trait::async_trait;
use common::{create_song, create_user, test_state, test_state_with};
use musicclub_api::background::topic_backfill::run_backfill;
use musicclub_api::participation::{TopicClaimCoordinator, TopicError, TopicOutcome};
use musicclub_core::song_topic::TopicState;
use musicclub_core::types::{DbId, ThreadId};
use musicclub_db::repositories::TopicClaimRepo;
use musicclub_notify::{Channel, DisabledNotifier, Notifier, NotifyError, RecordingNotifier};
use sqlx::PgPool;

const STEP_TIMEOUT: Duration = Duration::from_secs(2);

/// What happens to the claim row while the thread is being created.
#[derive(Debug, Clone, Copy)]
enum Interference {
    /// Another path releases the sentinel.
    Release,
    /// Another path resolves the sentinel to this thread id.
    ResolveElsewhere(ThreadId),
    /// The database becomes unreachable.
    ClosePool,
}

/// Notifier that disturbs the claim row from inside `create_thread`.
struct InterferingNotifier {
    pool: PgPool,
    song_id: DbId,
    interference: Interference,
    inner: RecordingNotifier,
}

impl InterferingNotifier {
    fn new(pool: PgPool, song_id: DbId, interference: Interference) -> Self {
        Self {
            pool,
            song_id,
            interference,
            inner: RecordingNotifier::new(),
        }
    }
}

#[async_trait]
impl Notifier for InterferingNotifier {
    async fn send_message(&self, channel: Channel, text: &str) -> Result<(), NotifyError> {
        self.inner.send_message(channel, text).await
    }

    async fn create_thread(&self, title: &str) -> Result<ThreadId, NotifyError> {
        match self.interference {
            Interference::Release => {
                assert!(TopicClaimRepo::release(&self.pool, self.song_id).await.unwrap());
            }
            Interference::ResolveElsewhere(id) => {
                assert!(TopicClaimRepo::resolve(&self.pool, self.song_id, id).await.unwrap());
            }
            Interference::ClosePool => self.pool.close().await,
        }
        self.inner.create_thread(title).await
    }
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_last_role_creates_one_thread_and_one_completion(pool: PgPool) {
    let a = create_user(&pool, "alice", Some(11)).await;
    let b = create_user(&pool, "bob", Some(12)).await;
    let song = create_song(&pool, "Song S", "The Band", &["vocals", "guitar"], None).await;
    let (state, notifier) = test_state(pool.clone());

    let view = state.participation.join(a.id, song.id, "guitar", None).await.unwrap();
    assert!(!view.is_full);
    state.dispatcher.flush().await;
    assert_eq!(notifier.thread_count(), 0);
    assert!(notifier.messages_containing("Song is complete").is_empty());

    let view = state.participation.join(b.id, song.id, "vocals", None).await.unwrap();
    assert!(view.is_full);
    state.dispatcher.flush().await;

    assert_eq!(notifier.thread_titles(), ["Song S — The Band"]);
    let completions = notifier.messages_containing("Song is complete");
    assert_eq!(completions.len(), 1);
    assert!(completions[0].text.contains("Song S — The Band"));
    assert!(completions[0].text.contains("tg://user?id=11"));
    assert!(completions[0].text.contains("tg://user?id=12"));
    assert_matches!(completions[0].channel, Channel::Thread(_));

    let state_row = TopicClaimRepo::state(&pool, song.id).await.unwrap();
    assert_matches!(state_row, TopicState::Resolved(_));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_rejoin_is_idempotent_and_silent(pool: PgPool) {
    let a = create_user(&pool, "alice", None).await;
    let song = create_song(&pool, "T", "A", &["vocals", "drums"], None).await;
    let (state, notifier) = test_state(pool);

    state.participation.join(a.id, song.id, "vocals", None).await.unwrap();
    state.participation.join(a.id, song.id, "vocals", None).await.unwrap();
    state.dispatcher.flush().await;

    assert_eq!(notifier.messages_containing("joined the role").len(), 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_leave_and_rejoin_never_reannounces(pool: PgPool) {
    let a = create_user(&pool, "alice", None).await;
    let song = create_song(&pool, "T", "A", &["vocals"], None).await;
    let (state, notifier) = test_state(pool.clone());

    state.participation.join(a.id, song.id, "vocals", None).await.unwrap();
    state.dispatcher.flush().await;
    assert_eq!(notifier.thread_count(), 1);
    let resolved = TopicClaimRepo::state(&pool, song.id).await.unwrap();

    let view = state.participation.leave(a.id, song.id, "vocals", None).await.unwrap();
    assert!(!view.is_full);
    state.participation.join(a.id, song.id, "vocals", None).await.unwrap();
    state.dispatcher.flush().await;

    assert_eq!(notifier.thread_count(), 1);
    assert_eq!(notifier.messages_containing("Song is complete").len(), 1);
    assert_eq!(TopicClaimRepo::state(&pool, song.id).await.unwrap(), resolved);

    // Role announcements after resolution go into the song's thread.
    let left = notifier.messages_containing("left the role");
    assert_eq!(left.len(), 1);
    assert_eq!(Some(left[0].channel), resolved.resolved_id().map(Channel::Thread));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_leave_never_announces_completion(pool: PgPool) {
    let a = create_user(&pool, "alice", None).await;
    let b = create_user(&pool, "bob", None).await;
    let song = create_song(&pool, "T", "A", &["vocals"], None).await;
    let (state, notifier) = test_state(pool);

    state.participation.join(a.id, song.id, "vocals", None).await.unwrap();
    state.participation.join(b.id, song.id, "vocals", None).await.unwrap();
    state.dispatcher.flush().await;
    let completions = notifier.messages_containing("Song is complete").len();

    state.participation.leave(a.id, song.id, "vocals", None).await.unwrap();
    state.participation.leave(b.id, song.id, "vocals", None).await.unwrap();
    // Leaving again is a silent no-op.
    state.participation.leave(b.id, song.id, "vocals", None).await.unwrap();
    state.dispatcher.flush().await;

    assert_eq!(notifier.messages_containing("Song is complete").len(), completions);
    assert_eq!(notifier.messages_containing("left the role").len(), 2);
    assert_eq!(notifier.thread_count(), 1);
}

// ---------------------------------------------------------------------------
// Concurrency
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_concurrent_final_joins_create_one_thread(pool: PgPool) {
    let song = create_song(&pool, "T", "A", &["vocals", "guitar"], None).await;
    let first = create_user(&pool, "first", None).await;
    let mut racers = Vec::new();
    for i in 0..6 {
        racers.push(create_user(&pool, &format!("racer{i}"), None).await);
    }
    let notifier = Arc::new(RecordingNotifier::with_delay(Duration::from_millis(50)));
    let (state, notifier) = test_state_with(pool, notifier);

    state.participation.join(first.id, song.id, "guitar", None).await.unwrap();

    let results = futures::future::join_all(
        racers
            .iter()
            .map(|u| state.participation.join(u.id, song.id, "vocals", None)),
    )
    .await;
    for result in results {
        assert!(result.unwrap().is_full);
    }
    state.dispatcher.flush().await;

    assert_eq!(notifier.thread_count(), 1);
    assert_eq!(notifier.messages_containing("Song is complete").len(), 1);
    assert_eq!(notifier.messages_containing("joined the role").len(), 7);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_concurrent_completions_have_single_winner(pool: PgPool) {
    let song = create_song(&pool, "T", "A", &["vocals"], None).await;
    let notifier = Arc::new(RecordingNotifier::with_delay(Duration::from_millis(50)));
    let coordinator = TopicClaimCoordinator::new(pool.clone(), notifier.clone(), STEP_TIMEOUT);

    let outcomes = futures::future::join_all((0..8).map(|_| coordinator.complete_song(&song))).await;

    let created = outcomes
        .iter()
        .filter(|o| matches!(o, Ok(TopicOutcome::Created(_))))
        .count();
    assert_eq!(created, 1);
    // Losers see the claim either in flight or already resolved.
    assert!(outcomes.iter().all(|o| matches!(
        o,
        Ok(TopicOutcome::Created(_) | TopicOutcome::InFlight | TopicOutcome::AlreadyExists(_))
    )));
    assert_eq!(notifier.thread_count(), 1);

    let again = coordinator.complete_song(&song).await.unwrap();
    assert_matches!(again, TopicOutcome::AlreadyExists(_));
    assert_eq!(notifier.thread_count(), 1);
}

// ---------------------------------------------------------------------------
// Failure handling
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_failed_creation_releases_claim_for_backfill(pool: PgPool) {
    let a = create_user(&pool, "alice", None).await;
    let song = create_song(&pool, "T", "A", &["vocals"], None).await;
    let (state, notifier) = test_state(pool.clone());
    notifier.set_fail_create(true);

    let view = state.participation.join(a.id, song.id, "vocals", None).await.unwrap();
    assert!(view.is_full, "join succeeds even though the notifier fails");
    state.dispatcher.flush().await;

    assert_eq!(notifier.thread_count(), 1);
    assert_eq!(
        TopicClaimRepo::state(&pool, song.id).await.unwrap(),
        TopicState::Unclaimed
    );

    notifier.set_fail_create(false);
    let report = run_backfill(&pool, &state.topics).await.unwrap();
    assert_eq!(report.scanned, 1);
    assert_eq!(report.created, 1);
    assert_eq!(notifier.thread_count(), 2);
    assert_matches!(
        TopicClaimRepo::state(&pool, song.id).await.unwrap(),
        TopicState::Resolved(_)
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_slow_thread_creation_releases_claim_for_backfill(pool: PgPool) {
    let a = create_user(&pool, "alice", None).await;
    let song = create_song(&pool, "T", "A", &["vocals"], None).await;
    // Longer than both the notify timeout (2s) and the task deadline (8s).
    let notifier = Arc::new(RecordingNotifier::with_delay(Duration::from_secs(10)));
    let (state, notifier) = test_state_with(pool.clone(), notifier);

    let view = state.participation.join(a.id, song.id, "vocals", None).await.unwrap();
    assert!(view.is_full);
    state.dispatcher.flush().await;

    assert_eq!(notifier.thread_count(), 0);
    assert_eq!(
        TopicClaimRepo::state(&pool, song.id).await.unwrap(),
        TopicState::Unclaimed
    );

    notifier.set_delay(Duration::ZERO);
    let report = run_backfill(&pool, &state.topics).await.unwrap();
    assert_eq!(report.created, 1);
    assert_eq!(notifier.thread_count(), 1);
    assert_eq!(notifier.messages_containing("Song is complete").len(), 1);
    assert_matches!(
        TopicClaimRepo::state(&pool, song.id).await.unwrap(),
        TopicState::Resolved(_)
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_claim_released_during_creation_is_a_conflict(pool: PgPool) {
    let song = create_song(&pool, "T", "A", &["vocals"], None).await;
    let notifier = Arc::new(InterferingNotifier::new(pool.clone(), song.id, Interference::Release));
    let coordinator = TopicClaimCoordinator::new(pool.clone(), notifier.clone(), STEP_TIMEOUT);

    let err = coordinator.complete_song(&song).await.unwrap_err();
    assert_matches!(err, TopicError::Conflict { song_id } if song_id == song.id);

    assert_eq!(notifier.inner.thread_count(), 1);
    assert!(notifier.inner.messages().is_empty());
    assert_eq!(
        TopicClaimRepo::state(&pool, song.id).await.unwrap(),
        TopicState::Unclaimed
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_claim_resolved_elsewhere_is_left_alone(pool: PgPool) {
    let song = create_song(&pool, "T", "A", &["vocals"], None).await;
    let notifier = Arc::new(InterferingNotifier::new(
        pool.clone(),
        song.id,
        Interference::ResolveElsewhere(555),
    ));
    let coordinator = TopicClaimCoordinator::new(pool.clone(), notifier.clone(), STEP_TIMEOUT);

    let err = coordinator.complete_song(&song).await.unwrap_err();
    assert_matches!(err, TopicError::Conflict { .. });

    assert!(notifier.inner.messages().is_empty());
    assert_eq!(
        TopicClaimRepo::state(&pool, song.id).await.unwrap(),
        TopicState::Resolved(555)
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_failed_resolve_keeps_sentinel(pool: PgPool) {
    let song = create_song(&pool, "T", "A", &["vocals"], None).await;
    let notifier = Arc::new(InterferingNotifier::new(pool.clone(), song.id, Interference::ClosePool));
    let coordinator = TopicClaimCoordinator::new(pool.clone(), notifier.clone(), STEP_TIMEOUT);

    let err = coordinator.complete_song(&song).await.unwrap_err();
    assert_matches!(err, TopicError::Database(_));
    assert_eq!(notifier.inner.thread_count(), 1);
    assert!(notifier.inner.messages().is_empty());

    let fresh = PgPool::connect_with((*pool.connect_options()).clone())
        .await
        .unwrap();
    assert_eq!(
        TopicClaimRepo::state(&fresh, song.id).await.unwrap(),
        TopicState::Claimed
    );
    fresh.close().await;
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_coordinator_reports_external_failure(pool: PgPool) {
    let song = create_song(&pool, "T", "A", &["vocals"], None).await;
    let notifier = Arc::new(RecordingNotifier::new());
    notifier.set_fail_create(true);
    let coordinator = TopicClaimCoordinator::new(pool.clone(), notifier, STEP_TIMEOUT);

    let err = coordinator.complete_song(&song).await.unwrap_err();
    assert_matches!(err, TopicError::ExternalUnavailable(_));
    assert!(TopicClaimRepo::try_claim(&pool, song.id).await.unwrap());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_in_flight_claim_is_not_overridden(pool: PgPool) {
    let song = create_song(&pool, "T", "A", &["vocals"], None).await;
    let notifier = Arc::new(RecordingNotifier::new());
    let coordinator = TopicClaimCoordinator::new(pool.clone(), notifier.clone(), STEP_TIMEOUT);

    assert!(TopicClaimRepo::try_claim(&pool, song.id).await.unwrap());
    let outcome = coordinator.complete_song(&song).await.unwrap();
    assert_eq!(outcome, TopicOutcome::InFlight);
    assert_eq!(notifier.thread_count(), 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_disabled_notifier_takes_no_claim(pool: PgPool) {
    let song = create_song(&pool, "T", "A", &["vocals"], None).await;
    let coordinator =
        TopicClaimCoordinator::new(pool.clone(), Arc::new(DisabledNotifier), STEP_TIMEOUT);

    let outcome = coordinator.complete_song(&song).await.unwrap();
    assert_eq!(outcome, TopicOutcome::Skipped);
    assert!(TopicClaimRepo::find(&pool, song.id).await.unwrap().is_none());
}

// ---------------------------------------------------------------------------
// Permissions
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_join_for_missing_user_is_not_found(pool: PgPool) {
    use musicclub_api::error::AppError;
    use musicclub_core::error::CoreError;
    use musicclub_core::permissions::SongPermissions;
    use musicclub_db::repositories::PermissionRepo;

    let a = create_user(&pool, "alice", None).await;
    let song = create_song(&pool, "T", "A", &["vocals"], None).await;
    PermissionRepo::upsert(
        &pool,
        a.id,
        &SongPermissions {
            edit_any_participation: true,
            ..SongPermissions::default()
        },
    )
    .await
    .unwrap();
    let (state, _) = test_state(pool);

    let err = state
        .participation
        .join(a.id, song.id, "vocals", Some(999_999))
        .await
        .unwrap_err();
    assert_matches!(
        err,
        AppError::Core(CoreError::NotFound { entity: "User", .. })
    );
}
