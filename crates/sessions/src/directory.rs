//! Fresh principal lookups for the refresh path.
//!
//! A refresh must re-check that the owning principal still exists and may
//! still authenticate; a session created before an account was deleted or
//! deactivated must not keep minting tokens.

use async_trait::async_trait;
use sqlx::PgPool;

use campus_core::principal::{Principal, PrincipalKind};
use campus_core::types::DbId;
use campus_db::repositories::{StaffRepo, StudentRepo};

use crate::error::SessionResult;

/// Lookup of currently-authenticatable principals.
#[async_trait]
pub trait PrincipalDirectory: Send + Sync {
    /// Returns `None` when the principal is missing or no longer allowed to
    /// authenticate (deactivated staff, unapproved/deactivated student).
    async fn find(&self, kind: PrincipalKind, id: DbId) -> SessionResult<Option<Principal>>;
}

/// Directory backed by the `staff` and `students` tables.
#[derive(Clone)]
pub struct PgPrincipalDirectory {
    pool: PgPool,
}

impl PgPrincipalDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PrincipalDirectory for PgPrincipalDirectory {
    async fn find(&self, kind: PrincipalKind, id: DbId) -> SessionResult<Option<Principal>> {
        let principal = match kind {
            PrincipalKind::Staff => StaffRepo::find_by_id(&self.pool, id)
                .await?
                .filter(|s| s.is_active)
                .map(|s| Principal {
                    id: s.id,
                    kind,
                    college_id: s.college_id,
                }),
            PrincipalKind::Student => StudentRepo::find_by_id(&self.pool, id)
                .await?
                .filter(|s| s.is_active && s.is_approved)
                .map(|s| Principal {
                    id: s.id,
                    kind,
                    college_id: s.college_id,
                }),
        };
        Ok(principal)
    }
}
