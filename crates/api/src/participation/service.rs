//! Join, leave and required-role edits.
//!
//! The synchronous part (permission check, ledger mutation) runs on the
//! request and its errors are returned to the caller. Once the mutation has
//! committed, announcements and topic creation are handed to the
//! [`Dispatcher`] from the committed change itself, before the response view
//! is read, and nothing after the commit can fail the request.

use std::sync::Arc;

use musicclub_core::announcements::RoleChange;
use musicclub_core::error::CoreError;
use musicclub_core::permissions::{permission_allows_join, permission_allows_song_edit};
use musicclub_core::song_roles::{normalize_roles, validate_role_name};
use musicclub_core::types::DbId;
use musicclub_db::models::participation::{LedgerChange, LedgerOutcome, SongDetails};
use musicclub_db::models::song::Song;
use musicclub_db::models::user::User;
use musicclub_db::repositories::{
    PermissionRepo, RoleLedgerRepo, SongRepo, TopicClaimRepo, UserRepo,
};
use musicclub_notify::Dispatcher;
use sqlx::PgPool;

use super::announce::Announcer;
use super::topic::{TopicClaimCoordinator, TopicError, TopicOutcome};
use crate::error::AppResult;

/// Orchestrates role changes and the follow-up notifications they trigger.
pub struct RoleAssignmentService {
    pool: PgPool,
    coordinator: Arc<TopicClaimCoordinator>,
    announcer: Announcer,
    dispatcher: Dispatcher,
}

impl RoleAssignmentService {
    pub fn new(
        pool: PgPool,
        coordinator: Arc<TopicClaimCoordinator>,
        announcer: Announcer,
        dispatcher: Dispatcher,
    ) -> Self {
        Self {
            pool,
            coordinator,
            announcer,
            dispatcher,
        }
    }

    // -----------------------------------------------------------------------
    // Operations
    // -----------------------------------------------------------------------

    /// `actor` joins `role` on `song_id`, as themselves or as `target`.
    pub async fn join(
        &self,
        actor: DbId,
        song_id: DbId,
        role: &str,
        target: Option<DbId>,
    ) -> AppResult<SongDetails> {
        self.change_role(actor, song_id, role, target, RoleChange::Joined)
            .await
    }

    /// `actor` leaves `role` on `song_id`, as themselves or as `target`.
    ///
    /// Never interacts with the topic claim.
    pub async fn leave(
        &self,
        actor: DbId,
        song_id: DbId,
        role: &str,
        target: Option<DbId>,
    ) -> AppResult<SongDetails> {
        self.change_role(actor, song_id, role, target, RoleChange::Left)
            .await
    }

    /// Replace the required roles of a song.
    ///
    /// Dropping the last unfilled role completes the song the same way a join does.
    pub async fn replace_roles(
        &self,
        actor: DbId,
        song_id: DbId,
        roles: &[String],
    ) -> AppResult<SongDetails> {
        let song = SongRepo::find_by_id(&self.pool, song_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "Song",
                id: song_id,
            })?;

        let perms = PermissionRepo::load_for_user(&self.pool, actor).await?;
        if !permission_allows_song_edit(&perms, song.created_by, actor) {
            return Err(CoreError::Forbidden("Not allowed to edit this song".into()).into());
        }

        for role in roles {
            if !role.trim().is_empty() {
                validate_role_name(role).map_err(CoreError::Validation)?;
            }
        }
        let desired = normalize_roles(roles);

        let change = RoleLedgerRepo::replace_required_roles(&self.pool, song_id, &desired)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "Song",
                id: song_id,
            })?;

        tracing::info!(
            song_id,
            user_id = actor,
            roles = desired.len(),
            changed = change.changed,
            "Song roles replaced"
        );

        if change.snapshot.edge().is_rising() {
            self.schedule_completion(change.song.clone());
        }
        Ok(self.view_after_commit(actor, &change).await)
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    async fn change_role(
        &self,
        actor: DbId,
        song_id: DbId,
        role: &str,
        target: Option<DbId>,
        change: RoleChange,
    ) -> AppResult<SongDetails> {
        let role = validate_role_name(role).map_err(CoreError::Validation)?;
        let target_id = target.unwrap_or(actor);

        let perms = PermissionRepo::load_for_user(&self.pool, actor).await?;
        if !permission_allows_join(&perms, actor, target_id) {
            return Err(CoreError::Forbidden(
                "Not allowed to change participation for this user".into(),
            )
            .into());
        }

        let target_user = UserRepo::find_by_id(&self.pool, target_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "User",
                id: target_id,
            })?;

        let outcome = match change {
            RoleChange::Joined => {
                RoleLedgerRepo::join(&self.pool, song_id, role, target_id).await?
            }
            RoleChange::Left => {
                RoleLedgerRepo::leave(&self.pool, song_id, role, target_id).await?
            }
        };
        let ledger = applied(outcome, song_id, role)?;

        if ledger.changed {
            tracing::info!(
                song_id,
                user_id = target_id,
                acting_user_id = actor,
                role,
                change = change.verb(),
                "Song role updated"
            );
            self.schedule_role_announcement(
                ledger.song.clone(),
                target_user,
                role.to_string(),
                change,
            );
            if change == RoleChange::Joined && ledger.snapshot.edge().is_rising() {
                self.schedule_completion(ledger.song.clone());
            }
        }

        Ok(self.view_after_commit(actor, &ledger).await)
    }

    /// Read the response view for a committed change.
    ///
    /// Falls back to a view built from the change itself, so a failed read
    /// never reports an already-committed mutation as failed.
    async fn view_after_commit(&self, viewer: DbId, change: &LedgerChange) -> SongDetails {
        let song_id = change.song.id;
        match SongRepo::find_details(&self.pool, song_id, Some(viewer)).await {
            Ok(Some(details)) => details,
            Ok(None) => {
                tracing::warn!(song_id, "Song vanished after a committed role change");
                SongDetails::from_ledger(change)
            }
            Err(e) => {
                tracing::warn!(song_id, error = %e, "Failed to read song view after role change");
                SongDetails::from_ledger(change)
            }
        }
    }

    fn schedule_role_announcement(&self, song: Song, user: User, role: String, change: RoleChange) {
        if !self.announcer.is_enabled() {
            return;
        }
        let announcer = self.announcer.clone();
        let pool = self.pool.clone();
        self.dispatcher.spawn("role_announcement", async move {
            let thread = match TopicClaimRepo::state(&pool, song.id).await {
                Ok(state) => state.resolved_id(),
                Err(e) => {
                    tracing::warn!(
                        song_id = song.id,
                        error = %e,
                        "Failed to read song thread, announcing in the main chat"
                    );
                    None
                }
            };
            announcer
                .announce_role_change(&song, &user, &role, change, thread)
                .await;
        });
    }

    /// The completion attempt bounds its own steps and always reaches resolve
    /// or release once it holds the claim, so it runs without the deadline.
    fn schedule_completion(&self, song: Song) {
        let coordinator = Arc::clone(&self.coordinator);
        self.dispatcher.spawn_tracked(async move {
            log_completion(song.id, coordinator.complete_song(&song).await);
        });
    }
}

/// Map a ledger outcome to the applied change or a not-found error.
fn applied(outcome: LedgerOutcome, song_id: DbId, role: &str) -> AppResult<LedgerChange> {
    match outcome {
        LedgerOutcome::Applied(change) => Ok(change),
        LedgerOutcome::SongMissing => Err(CoreError::NotFound {
            entity: "Song",
            id: song_id,
        }
        .into()),
        LedgerOutcome::RoleMissing => Err(CoreError::RoleNotFound {
            song_id,
            role: role.to_string(),
        }
        .into()),
    }
}

/// Completion runs detached, so its result only ends up in the log.
pub(crate) fn log_completion(song_id: DbId, result: Result<TopicOutcome, TopicError>) {
    match result {
        Ok(TopicOutcome::Created(topic_id)) => {
            tracing::info!(song_id, topic_id, "Song completion announced");
        }
        Ok(outcome) => tracing::debug!(song_id, ?outcome, "Song completion needed no action"),
        Err(TopicError::Conflict { .. }) => {
            tracing::debug!(song_id, "Song completion handled by another caller");
        }
        Err(e) => tracing::warn!(song_id, error = %e, "Song completion failed"),
    }
}
