//! Repository for the `staff` table.

use sqlx::PgPool;

use campus_core::types::DbId;

use crate::models::staff::Staff;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, college_id, email, full_name, password_hash, \
                       is_active, created_at, updated_at";

/// Read-side queries for staff members. Account creation and the rest of
/// the staff lifecycle belong to the admin service, not this one.
pub struct StaffRepo;

impl StaffRepo {
    /// Find a staff member by id.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Staff>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM staff WHERE id = $1");
        sqlx::query_as::<_, Staff>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a staff member by email (login lookup).
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Staff>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM staff WHERE email = $1");
        sqlx::query_as::<_, Staff>(&query)
            .bind(email)
            .fetch_optional(pool)
            .await
    }
}
