//! Repository for the `sessions` table.

use sqlx::PgPool;
use uuid::Uuid;

use campus_core::types::{DbId, Timestamp};

use crate::models::session::{CreateSessionRow, SessionRow};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, principal_id, principal_kind, refresh_token_hash, \
                       browser, os, device_type, ip_address, \
                       created_at, last_used_at, expires_at, is_active";

/// Provides CRUD operations for sessions.
pub struct SessionRepo;

impl SessionRepo {
    /// Insert a new session, returning the created row.
    pub async fn create(pool: &PgPool, input: &CreateSessionRow) -> Result<SessionRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO sessions (id, principal_id, principal_kind, refresh_token_hash,
                                   browser, os, device_type, ip_address,
                                   created_at, last_used_at, expires_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, SessionRow>(&query)
            .bind(input.id)
            .bind(input.principal_id)
            .bind(&input.principal_kind)
            .bind(&input.refresh_token_hash)
            .bind(&input.browser)
            .bind(&input.os)
            .bind(&input.device_type)
            .bind(&input.ip_address)
            .bind(input.created_at)
            .bind(input.last_used_at)
            .bind(input.expires_at)
            .fetch_one(pool)
            .await
    }

    /// Find a session by id regardless of its active/expiry state.
    ///
    /// Expiry filtering is a session-layer concern (expired rows must be
    /// lazily cleaned up, not silently skipped).
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<SessionRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM sessions WHERE id = $1");
        sqlx::query_as::<_, SessionRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Rotate the refresh-token hash, conditional on the current hash.
    ///
    /// This is the compare-and-swap that serializes concurrent refreshes:
    /// the update only lands when `expected_hash` is still the session's
    /// current credential. Returns `true` if the row was updated.
    pub async fn rotate_refresh_hash(
        pool: &PgPool,
        id: Uuid,
        expected_hash: &str,
        new_hash: &str,
        now: Timestamp,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE sessions
             SET refresh_token_hash = $3, last_used_at = $4
             WHERE id = $1 AND refresh_token_hash = $2 AND is_active",
        )
        .bind(id)
        .bind(expected_hash)
        .bind(new_hash)
        .bind(now)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Update `last_used_at` for an active session.
    pub async fn touch_last_used(
        pool: &PgPool,
        id: Uuid,
        now: Timestamp,
    ) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("UPDATE sessions SET last_used_at = $2 WHERE id = $1 AND is_active")
                .bind(id)
                .bind(now)
                .execute(pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Mark a session inactive. `is_active` is terminal: once false it is
    /// never set true again. Returns `true` if the row was still active.
    pub async fn deactivate(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("UPDATE sessions SET is_active = false WHERE id = $1 AND is_active")
                .bind(id)
                .execute(pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    /// List ids of all active sessions for a principal.
    pub async fn active_ids_for_principal(
        pool: &PgPool,
        principal_kind: &str,
        principal_id: DbId,
    ) -> Result<Vec<Uuid>, sqlx::Error> {
        let rows: Vec<(Uuid,)> = sqlx::query_as(
            "SELECT id FROM sessions
             WHERE principal_kind = $1 AND principal_id = $2 AND is_active",
        )
        .bind(principal_kind)
        .bind(principal_id)
        .fetch_all(pool)
        .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    /// Delete expired or deactivated sessions. Returns the count of deleted
    /// rows. Intended for periodic maintenance, not request paths.
    pub async fn cleanup_expired(pool: &PgPool) -> Result<u64, sqlx::Error> {
        let result =
            sqlx::query("DELETE FROM sessions WHERE expires_at < NOW() OR is_active = false")
                .execute(pool)
                .await?;
        Ok(result.rows_affected())
    }
}
