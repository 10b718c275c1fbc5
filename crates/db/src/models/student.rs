//! Student entity model and DTOs.

use serde::Serialize;
use sqlx::FromRow;

use campus_core::types::{DbId, Timestamp};

/// Full student row from the `students` table.
///
/// Contains the password hash -- NEVER serialize this to API responses
/// directly. Use [`StudentResponse`] for external-facing output.
#[derive(Debug, Clone, FromRow)]
pub struct Student {
    pub id: DbId,
    pub college_id: DbId,
    pub registration_no: String,
    pub email: String,
    pub full_name: String,
    pub password_hash: String,
    /// Set by the registration-approval workflow; unapproved students
    /// cannot authenticate.
    pub is_approved: bool,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Safe student representation for API responses (no password hash).
#[derive(Debug, Clone, Serialize)]
pub struct StudentResponse {
    pub id: DbId,
    pub college_id: DbId,
    pub registration_no: String,
    pub email: String,
    pub full_name: String,
    pub is_approved: bool,
}

impl From<&Student> for StudentResponse {
    fn from(student: &Student) -> Self {
        Self {
            id: student.id,
            college_id: student.college_id,
            registration_no: student.registration_no.clone(),
            email: student.email.clone(),
            full_name: student.full_name.clone(),
            is_approved: student.is_approved,
        }
    }
}
