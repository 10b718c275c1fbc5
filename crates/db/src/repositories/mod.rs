//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument.

pub mod session_repo;
pub mod staff_repo;
pub mod student_repo;

pub use session_repo::SessionRepo;
pub use staff_repo::StaffRepo;
pub use student_repo::StudentRepo;
