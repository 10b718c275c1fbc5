//! Authentication middleware extractors.
//!
//! - [`auth::StaffUser`] -- Validates a staff Bearer token against the staff
//!   session manager.
//! - [`auth::StudentUser`] -- Validates a student Bearer token against the
//!   student session manager.

pub mod auth;
