//! Session persistence: durable PostgreSQL rows with a Redis fast path.
//!
//! PostgreSQL is the source of truth. Every durable mutation is mirrored to
//! the cache (write-through); cache read failures fall back to the database,
//! so read-your-writes always holds through the durable path. The principal
//! -> session-id index lives in a Redis set (native `SADD`/`SREM`, no
//! read-modify-write) and is read as the union of the set and the durable
//! active rows, so a dropped cache write can never hide a live session.

use async_trait::async_trait;
use chrono::Utc;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use campus_core::device::DeviceInfo;
use campus_core::principal::PrincipalKind;
use campus_core::types::{DbId, Timestamp};
use campus_db::models::session::{CreateSessionRow, SessionRow};
use campus_db::repositories::SessionRepo;

use crate::error::{SessionError, SessionResult};

/// One authenticated device/browser context for one principal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_id: Uuid,
    pub principal_id: DbId,
    pub principal_kind: PrincipalKind,
    /// SHA-256 hex of the CURRENT valid refresh token. Rotates on refresh;
    /// retired values live in the revocation registry, not here.
    pub refresh_token_hash: String,
    pub device: DeviceInfo,
    pub ip_address: Option<String>,
    pub created_at: Timestamp,
    pub last_used_at: Timestamp,
    /// Fixed at creation (session lifetime); never extended.
    pub expires_at: Timestamp,
    pub is_active: bool,
}

impl SessionRecord {
    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.expires_at <= now
    }
}

/// Keyed storage for session records plus the principal -> session-id index.
///
/// Semantics relied on by the session manager:
/// - `lookup` returns only active sessions, INCLUDING ones past their
///   `expires_at`: the manager treats those as absent and lazily cleans
///   them up, which a filtering read could not support. Unknown or
///   deactivated ids come back as `None`.
/// - `update_refresh_hash` is a compare-and-swap on the current hash; a
///   `false` return means another writer rotated first.
/// - `deactivate` is terminal and idempotent.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn put(&self, record: &SessionRecord) -> SessionResult<()>;

    /// Fetch an active session without expiry filtering.
    async fn lookup(
        &self,
        kind: PrincipalKind,
        session_id: Uuid,
    ) -> SessionResult<Option<SessionRecord>>;

    async fn update_refresh_hash(
        &self,
        kind: PrincipalKind,
        session_id: Uuid,
        expected_hash: &str,
        new_hash: &str,
        now: Timestamp,
    ) -> SessionResult<bool>;

    async fn update_last_used(
        &self,
        kind: PrincipalKind,
        session_id: Uuid,
        now: Timestamp,
    ) -> SessionResult<()>;

    async fn deactivate(&self, kind: PrincipalKind, session_id: Uuid) -> SessionResult<()>;

    async fn index_add(
        &self,
        kind: PrincipalKind,
        principal_id: DbId,
        session_id: Uuid,
    ) -> SessionResult<()>;

    async fn index_remove(
        &self,
        kind: PrincipalKind,
        principal_id: DbId,
        session_id: Uuid,
    ) -> SessionResult<()>;

    async fn index_members(
        &self,
        kind: PrincipalKind,
        principal_id: DbId,
    ) -> SessionResult<Vec<Uuid>>;
}

/// Production store: PostgreSQL rows mirrored into Redis.
#[derive(Clone)]
pub struct PgRedisSessionStore {
    pool: PgPool,
    redis: ConnectionManager,
}

/// Composite cache key for one session record.
fn session_key(kind: PrincipalKind, session_id: Uuid) -> String {
    format!("session:{kind}:{session_id}")
}

/// Composite cache key for a principal's session-id set. The kind is part of
/// the key, so staff and student ids can never collide.
fn index_key(kind: PrincipalKind, principal_id: DbId) -> String {
    format!("sessions:{kind}:{principal_id}")
}

impl PgRedisSessionStore {
    pub fn new(pool: PgPool, redis: ConnectionManager) -> Self {
        Self { pool, redis }
    }

    /// Best-effort write-through of a record to the cache, keyed with a TTL
    /// equal to the session's remaining lifetime. Failures are logged and
    /// swallowed: the durable row already holds the truth.
    async fn mirror_to_cache(&self, record: &SessionRecord) {
        let ttl = (record.expires_at - Utc::now()).num_seconds();
        if ttl <= 0 {
            return;
        }
        let key = session_key(record.principal_kind, record.session_id);
        let payload = match serde_json::to_string(record) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!(error = %e, session_id = %record.session_id, "Failed to serialize session for cache");
                return;
            }
        };
        let mut conn = self.redis.clone();
        if let Err(e) = conn.set_ex::<_, _, ()>(&key, payload, ttl as u64).await {
            tracing::warn!(error = %e, session_id = %record.session_id, "Failed to mirror session to cache");
        }
    }

    /// Load the durable row and, when active, refresh the cache from it.
    async fn load_durable(
        &self,
        kind: PrincipalKind,
        session_id: Uuid,
    ) -> SessionResult<Option<SessionRecord>> {
        let Some(row) = SessionRepo::find_by_id(&self.pool, session_id).await? else {
            return Ok(None);
        };
        if !row.is_active || row.principal_kind != kind.as_str() {
            return Ok(None);
        }
        let record = record_from_row(row)?;
        self.mirror_to_cache(&record).await;
        Ok(Some(record))
    }
}

#[async_trait]
impl SessionStore for PgRedisSessionStore {
    async fn put(&self, record: &SessionRecord) -> SessionResult<()> {
        // Durable write first: if this fails, no token pair may be handed out.
        SessionRepo::create(&self.pool, &row_from_record(record)).await?;
        self.mirror_to_cache(record).await;
        Ok(())
    }

    async fn lookup(
        &self,
        kind: PrincipalKind,
        session_id: Uuid,
    ) -> SessionResult<Option<SessionRecord>> {
        let mut conn = self.redis.clone();
        match conn
            .get::<_, Option<String>>(session_key(kind, session_id))
            .await
        {
            Ok(Some(json)) => match serde_json::from_str::<SessionRecord>(&json) {
                Ok(record) if record.is_active => return Ok(Some(record)),
                Ok(_) => return Ok(None),
                Err(e) => {
                    tracing::warn!(error = %e, %session_id, "Corrupt cached session, falling back to database");
                }
            },
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(error = %e, %session_id, "Cache read failed, falling back to database");
            }
        }
        self.load_durable(kind, session_id).await
    }

    async fn update_refresh_hash(
        &self,
        kind: PrincipalKind,
        session_id: Uuid,
        expected_hash: &str,
        new_hash: &str,
        now: Timestamp,
    ) -> SessionResult<bool> {
        let swapped =
            SessionRepo::rotate_refresh_hash(&self.pool, session_id, expected_hash, new_hash, now)
                .await?;
        if swapped {
            // Re-read the authoritative row so the cache reflects the winner.
            if let Err(e) = self.load_durable(kind, session_id).await {
                tracing::warn!(error = ?e, %session_id, "Failed to refresh cache after rotation");
            }
        }
        Ok(swapped)
    }

    async fn update_last_used(
        &self,
        kind: PrincipalKind,
        session_id: Uuid,
        now: Timestamp,
    ) -> SessionResult<()> {
        SessionRepo::touch_last_used(&self.pool, session_id, now).await?;
        if let Err(e) = self.load_durable(kind, session_id).await {
            tracing::warn!(error = ?e, %session_id, "Failed to refresh cache after activity update");
        }
        Ok(())
    }

    async fn deactivate(&self, kind: PrincipalKind, session_id: Uuid) -> SessionResult<()> {
        SessionRepo::deactivate(&self.pool, session_id).await?;
        // The cache entry must go: a stale active record here would keep an
        // invalidated session alive until its TTL ran out.
        let mut conn = self.redis.clone();
        conn.del::<_, ()>(session_key(kind, session_id)).await?;
        Ok(())
    }

    async fn index_add(
        &self,
        kind: PrincipalKind,
        principal_id: DbId,
        session_id: Uuid,
    ) -> SessionResult<()> {
        let mut conn = self.redis.clone();
        if let Err(e) = conn
            .sadd::<_, _, ()>(index_key(kind, principal_id), session_id.to_string())
            .await
        {
            // Recoverable: index reads union in the durable active rows.
            tracing::warn!(error = %e, %principal_id, "Failed to add session to cache index");
        }
        Ok(())
    }

    async fn index_remove(
        &self,
        kind: PrincipalKind,
        principal_id: DbId,
        session_id: Uuid,
    ) -> SessionResult<()> {
        let mut conn = self.redis.clone();
        if let Err(e) = conn
            .srem::<_, _, ()>(index_key(kind, principal_id), session_id.to_string())
            .await
        {
            tracing::warn!(error = %e, %principal_id, "Failed to remove session from cache index");
        }
        Ok(())
    }

    async fn index_members(
        &self,
        kind: PrincipalKind,
        principal_id: DbId,
    ) -> SessionResult<Vec<Uuid>> {
        let mut members: std::collections::HashSet<Uuid> =
            SessionRepo::active_ids_for_principal(&self.pool, kind.as_str(), principal_id)
                .await?
                .into_iter()
                .collect();

        let mut conn = self.redis.clone();
        match conn
            .smembers::<_, Vec<String>>(index_key(kind, principal_id))
            .await
        {
            Ok(cached) => {
                members.extend(cached.iter().filter_map(|s| s.parse::<Uuid>().ok()));
            }
            Err(e) => {
                tracing::warn!(error = %e, %principal_id, "Cache index read failed, using durable rows only");
            }
        }

        Ok(members.into_iter().collect())
    }
}

fn row_from_record(record: &SessionRecord) -> CreateSessionRow {
    CreateSessionRow {
        id: record.session_id,
        principal_id: record.principal_id,
        principal_kind: record.principal_kind.as_str().to_string(),
        refresh_token_hash: record.refresh_token_hash.clone(),
        browser: record.device.browser.clone(),
        os: record.device.os.clone(),
        device_type: record.device.device_type.clone(),
        ip_address: record.ip_address.clone(),
        created_at: record.created_at,
        last_used_at: record.last_used_at,
        expires_at: record.expires_at,
    }
}

fn record_from_row(row: SessionRow) -> SessionResult<SessionRecord> {
    let principal_kind = row
        .principal_kind
        .parse::<PrincipalKind>()
        .map_err(SessionError::Persistence)?;
    Ok(SessionRecord {
        session_id: row.id,
        principal_id: row.principal_id,
        principal_kind,
        refresh_token_hash: row.refresh_token_hash,
        device: DeviceInfo {
            browser: row.browser,
            os: row.os,
            device_type: row.device_type,
        },
        ip_address: row.ip_address,
        created_at: row.created_at,
        last_used_at: row.last_used_at,
        expires_at: row.expires_at,
        is_active: row.is_active,
    })
}
