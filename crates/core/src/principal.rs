//! Principal kinds and identity claims shared across the session layer.

use serde::{Deserialize, Serialize};

use crate::types::DbId;

/// The two kinds of authenticated principal.
///
/// A session's signing material, validation rules, and revocation policy all
/// depend on this tag: staff and student tokens are never interchangeable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrincipalKind {
    Staff,
    Student,
}

impl PrincipalKind {
    /// Stable lowercase name, used in database columns and cache keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            PrincipalKind::Staff => "staff",
            PrincipalKind::Student => "student",
        }
    }
}

impl std::str::FromStr for PrincipalKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "staff" => Ok(PrincipalKind::Staff),
            "student" => Ok(PrincipalKind::Student),
            other => Err(format!("unknown principal kind: {other}")),
        }
    }
}

impl std::fmt::Display for PrincipalKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of an authenticated principal as embedded in token claims.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub id: DbId,
    pub kind: PrincipalKind,
    /// College the principal belongs to (multi-tenant partition key).
    pub college_id: DbId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_round_trips_through_str() {
        for kind in [PrincipalKind::Staff, PrincipalKind::Student] {
            let parsed: PrincipalKind = kind.as_str().parse().expect("parse should succeed");
            assert_eq!(parsed, kind);
        }
    }

    #[test]
    fn test_unknown_kind_rejected() {
        assert!("admin".parse::<PrincipalKind>().is_err());
    }
}
