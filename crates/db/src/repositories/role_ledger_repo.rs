//! Role ledger: the `song_roles` and `song_role_assignments` tables.
//!
//! The primitive operations (`assign`, `unassign`, `required_roles`,
//! `occupied_roles`) accept any executor so they compose inside a
//! transaction. The tracked variants (`join`, `leave`, `replace_required_roles`)
//! lock the song row, capture the role sets before and after the change, and
//! commit atomically. They never decide fullness themselves.

use musicclub_core::fullness::{FullnessSnapshot, RoleSet};
use musicclub_core::types::DbId;
use sqlx::{PgExecutor, PgPool, Postgres, Transaction};

use crate::models::participation::{LedgerChange, LedgerOutcome, Occupant};
use crate::models::user::User;
use crate::repositories::SongRepo;

/// Provides access to required roles and role assignments.
pub struct RoleLedgerRepo;

impl RoleLedgerRepo {
    // -----------------------------------------------------------------------
    // Primitives
    // -----------------------------------------------------------------------

    /// Record that `user_id` occupies `role` on `song_id`.
    ///
    /// Idempotent: returns `false` when the triple already exists.
    pub async fn assign<'e, E>(
        executor: E,
        song_id: DbId,
        role: &str,
        user_id: DbId,
    ) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query(
            "INSERT INTO song_role_assignments (song_id, role, user_id) \
             VALUES ($1, $2, $3) \
             ON CONFLICT (song_id, role, user_id) DO NOTHING",
        )
        .bind(song_id)
        .bind(role)
        .bind(user_id)
        .execute(executor)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Remove `user_id` from `role` on `song_id`. Returns `true` if a row was removed.
    pub async fn unassign<'e, E>(
        executor: E,
        song_id: DbId,
        role: &str,
        user_id: DbId,
    ) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query(
            "DELETE FROM song_role_assignments \
             WHERE song_id = $1 AND role = $2 AND user_id = $3",
        )
        .bind(song_id)
        .bind(role)
        .bind(user_id)
        .execute(executor)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// The set of roles a song requires.
    pub async fn required_roles<'e, E>(executor: E, song_id: DbId) -> Result<RoleSet, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let roles = sqlx::query_scalar::<_, String>(
            "SELECT role FROM song_roles WHERE song_id = $1",
        )
        .bind(song_id)
        .fetch_all(executor)
        .await?;
        Ok(roles.into_iter().collect())
    }

    /// Distinct roles on a song with at least one occupant.
    pub async fn occupied_roles<'e, E>(executor: E, song_id: DbId) -> Result<RoleSet, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let roles = sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT role FROM song_role_assignments WHERE song_id = $1",
        )
        .bind(song_id)
        .fetch_all(executor)
        .await?;
        Ok(roles.into_iter().collect())
    }

    // -----------------------------------------------------------------------
    // Tracked mutations
    // -----------------------------------------------------------------------

    /// Assign a role inside a transaction, capturing fullness inputs.
    ///
    /// The role must be one of the song's required roles.
    pub async fn join(
        pool: &PgPool,
        song_id: DbId,
        role: &str,
        user_id: DbId,
    ) -> Result<LedgerOutcome, sqlx::Error> {
        Self::mutate(pool, song_id, role, user_id, Mutation::Assign).await
    }

    /// Remove a role assignment inside a transaction, capturing fullness inputs.
    pub async fn leave(
        pool: &PgPool,
        song_id: DbId,
        role: &str,
        user_id: DbId,
    ) -> Result<LedgerOutcome, sqlx::Error> {
        Self::mutate(pool, song_id, role, user_id, Mutation::Unassign).await
    }

    async fn mutate(
        pool: &PgPool,
        song_id: DbId,
        role: &str,
        user_id: DbId,
        mutation: Mutation,
    ) -> Result<LedgerOutcome, sqlx::Error> {
        let mut tx = pool.begin().await?;

        // Dropping `tx` on an early return rolls back and releases the lock.
        let Some(song) = SongRepo::lock_for_update(&mut *tx, song_id).await? else {
            return Ok(LedgerOutcome::SongMissing);
        };

        let required = Self::required_roles(&mut *tx, song_id).await?;
        if !required.contains(role) {
            return Ok(LedgerOutcome::RoleMissing);
        }

        let occupied_before = Self::occupied_roles(&mut *tx, song_id).await?;
        let changed = match mutation {
            Mutation::Assign => Self::assign(&mut *tx, song_id, role, user_id).await?,
            Mutation::Unassign => Self::unassign(&mut *tx, song_id, role, user_id).await?,
        };
        let occupied_after = if changed {
            Self::occupied_roles(&mut *tx, song_id).await?
        } else {
            occupied_before.clone()
        };

        tx.commit().await?;

        Ok(LedgerOutcome::Applied(LedgerChange {
            song,
            changed,
            snapshot: FullnessSnapshot {
                required_before: required.clone(),
                occupied_before,
                required_after: required,
                occupied_after,
            },
        }))
    }

    /// Replace a song's required-role set with `desired`.
    ///
    /// Diffs the current set against `desired`, deletes removed roles (their
    /// assignments cascade) and inserts added ones, all in one transaction.
    /// Returns `None` if the song does not exist.
    pub async fn replace_required_roles(
        pool: &PgPool,
        song_id: DbId,
        desired: &RoleSet,
    ) -> Result<Option<LedgerChange>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let Some(song) = SongRepo::lock_for_update(&mut *tx, song_id).await? else {
            return Ok(None);
        };

        let current = Self::required_roles(&mut *tx, song_id).await?;
        let occupied_before = Self::occupied_roles(&mut *tx, song_id).await?;

        let to_remove: Vec<String> = current.difference(desired).cloned().collect();
        let to_add: Vec<String> = desired.difference(&current).cloned().collect();
        let changed = !to_remove.is_empty() || !to_add.is_empty();

        if !to_remove.is_empty() {
            sqlx::query("DELETE FROM song_roles WHERE song_id = $1 AND role = ANY($2)")
                .bind(song_id)
                .bind(&to_remove)
                .execute(&mut *tx)
                .await?;
        }
        Self::insert_roles(&mut tx, song_id, &to_add).await?;

        let occupied_after = if to_remove.is_empty() {
            occupied_before.clone()
        } else {
            Self::occupied_roles(&mut *tx, song_id).await?
        };

        tx.commit().await?;

        Ok(Some(LedgerChange {
            song,
            changed,
            snapshot: FullnessSnapshot {
                required_before: current,
                occupied_before,
                required_after: desired.clone(),
                occupied_after,
            },
        }))
    }

    async fn insert_roles(
        tx: &mut Transaction<'_, Postgres>,
        song_id: DbId,
        roles: &[String],
    ) -> Result<(), sqlx::Error> {
        for role in roles {
            sqlx::query(
                "INSERT INTO song_roles (song_id, role) VALUES ($1, $2) \
                 ON CONFLICT DO NOTHING",
            )
            .bind(song_id)
            .bind(role)
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// Every occupant of every role on a song, with user fields.
    pub async fn list_occupants(pool: &PgPool, song_id: DbId) -> Result<Vec<Occupant>, sqlx::Error> {
        sqlx::query_as::<_, Occupant>(
            "SELECT sra.role, u.id AS user_id, u.username, u.display_name, u.tg_user_id \
             FROM song_role_assignments sra \
             JOIN users u ON u.id = sra.user_id \
             WHERE sra.song_id = $1 \
             ORDER BY sra.role, sra.created_at, u.id",
        )
        .bind(song_id)
        .fetch_all(pool)
        .await
    }

    /// Distinct users occupying any role on a song, ordered by name.
    pub async fn list_participants(pool: &PgPool, song_id: DbId) -> Result<Vec<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            "SELECT DISTINCT u.id, u.username, u.display_name, u.tg_user_id, \
                    u.created_at, u.updated_at \
             FROM song_role_assignments sra \
             JOIN users u ON u.id = sra.user_id \
             WHERE sra.song_id = $1 \
             ORDER BY u.display_name, u.username, u.id",
        )
        .bind(song_id)
        .fetch_all(pool)
        .await
    }
}

#[derive(Debug, Clone, Copy)]
enum Mutation {
    Assign,
    Unassign,
}
