//! Staff entity model and DTOs.

use serde::Serialize;
use sqlx::FromRow;

use campus_core::types::{DbId, Timestamp};

/// Full staff row from the `staff` table.
///
/// Contains the password hash -- NEVER serialize this to API responses
/// directly. Use [`StaffResponse`] for external-facing output.
#[derive(Debug, Clone, FromRow)]
pub struct Staff {
    pub id: DbId,
    pub college_id: DbId,
    pub email: String,
    pub full_name: String,
    pub password_hash: String,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Safe staff representation for API responses (no password hash).
#[derive(Debug, Clone, Serialize)]
pub struct StaffResponse {
    pub id: DbId,
    pub college_id: DbId,
    pub email: String,
    pub full_name: String,
}

impl From<&Staff> for StaffResponse {
    fn from(staff: &Staff) -> Self {
        Self {
            id: staff.id,
            college_id: staff.college_id,
            email: staff.email.clone(),
            full_name: staff.full_name.clone(),
        }
    }
}
