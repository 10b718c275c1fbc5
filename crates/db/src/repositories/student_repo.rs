//! Repository for the `students` table.

use sqlx::PgPool;

use campus_core::types::DbId;

use crate::models::student::Student;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, college_id, registration_no, email, full_name, \
                       password_hash, is_approved, is_active, created_at, updated_at";

/// Read-side queries for students. Registration and approval belong to the
/// admissions workflow, not this service.
pub struct StudentRepo;

impl StudentRepo {
    /// Find a student by id.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Student>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM students WHERE id = $1");
        sqlx::query_as::<_, Student>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Login lookup: the identifier may be a registration number or an email.
    pub async fn find_by_identifier(
        pool: &PgPool,
        identifier: &str,
    ) -> Result<Option<Student>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM students WHERE registration_no = $1 OR email = $1");
        sqlx::query_as::<_, Student>(&query)
            .bind(identifier)
            .fetch_optional(pool)
            .await
    }
}
