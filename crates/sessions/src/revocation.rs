//! Registry of retired refresh-token hashes.
//!
//! Once a refresh token is rotated or its session is invalidated, its hash
//! lands here and must never again be accepted. Entries carry a TTL equal to
//! the retired token's own remaining validity (there is nothing to protect
//! after the token would have expired anyway), floored to guard clock skew.

use async_trait::async_trait;
use chrono::Utc;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};

use crate::error::SessionResult;

/// Why a refresh token was retired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevokeReason {
    /// Superseded by rotation on a successful refresh.
    Rotated,
    /// Explicit logout of one session.
    ManualLogout,
    /// Bulk logout of all of a principal's sessions.
    LogoutAll,
    /// A student logged in elsewhere; prior sessions were force-closed.
    SingleDeviceEnforcement,
}

/// Cache payload recorded per revoked hash.
#[derive(Debug, Serialize, Deserialize)]
struct RevocationEntry {
    reason: RevokeReason,
    invalidated_at: i64,
}

/// Keyed storage recording hashes of refresh tokens that must be rejected.
#[async_trait]
pub trait RevocationRegistry: Send + Sync {
    /// Record `token_hash` as revoked for `ttl_seconds` from now.
    async fn revoke(
        &self,
        token_hash: &str,
        reason: RevokeReason,
        ttl_seconds: u64,
    ) -> SessionResult<()>;

    async fn is_revoked(&self, token_hash: &str) -> SessionResult<bool>;
}

/// Redis-backed registry. `SET key EX ttl` gives per-entry expiry for free.
#[derive(Clone)]
pub struct RedisRevocationRegistry {
    redis: ConnectionManager,
}

fn revocation_key(token_hash: &str) -> String {
    format!("revoked:{token_hash}")
}

impl RedisRevocationRegistry {
    pub fn new(redis: ConnectionManager) -> Self {
        Self { redis }
    }
}

#[async_trait]
impl RevocationRegistry for RedisRevocationRegistry {
    async fn revoke(
        &self,
        token_hash: &str,
        reason: RevokeReason,
        ttl_seconds: u64,
    ) -> SessionResult<()> {
        let entry = RevocationEntry {
            reason,
            invalidated_at: Utc::now().timestamp(),
        };
        let payload = serde_json::to_string(&entry)
            .map_err(|e| crate::error::SessionError::Persistence(e.to_string()))?;

        let mut conn = self.redis.clone();
        conn.set_ex::<_, _, ()>(revocation_key(token_hash), payload, ttl_seconds.max(1))
            .await?;
        tracing::debug!(token_hash, ttl_seconds, ?reason, "Refresh token revoked");
        Ok(())
    }

    async fn is_revoked(&self, token_hash: &str) -> SessionResult<bool> {
        let mut conn = self.redis.clone();
        let value: Option<String> = conn.get(revocation_key(token_hash)).await?;
        Ok(value.is_some())
    }
}
