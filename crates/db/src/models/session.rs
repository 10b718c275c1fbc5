//! Session model and DTOs.

use sqlx::FromRow;
use uuid::Uuid;

use campus_core::types::{DbId, Timestamp};

/// A session row from the `sessions` table.
///
/// `principal_kind` is kept as raw text here; the session layer converts it
/// to `PrincipalKind` at the trust boundary.
#[derive(Debug, Clone, FromRow)]
pub struct SessionRow {
    pub id: Uuid,
    pub principal_id: DbId,
    pub principal_kind: String,
    pub refresh_token_hash: String,
    pub browser: String,
    pub os: String,
    pub device_type: String,
    pub ip_address: Option<String>,
    pub created_at: Timestamp,
    pub last_used_at: Timestamp,
    pub expires_at: Timestamp,
    pub is_active: bool,
}

/// DTO for inserting a new session row.
pub struct CreateSessionRow {
    pub id: Uuid,
    pub principal_id: DbId,
    pub principal_kind: String,
    pub refresh_token_hash: String,
    pub browser: String,
    pub os: String,
    pub device_type: String,
    pub ip_address: Option<String>,
    pub created_at: Timestamp,
    pub last_used_at: Timestamp,
    pub expires_at: Timestamp,
}
