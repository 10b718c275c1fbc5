//! Request handlers, one submodule per auth surface.
//!
//! Handlers verify credentials against the repositories in `campus_db` and
//! delegate all session and token work to the managers in `campus_sessions`,
//! mapping errors via [`crate::error::AppError`].

pub mod staff_auth;
pub mod student_auth;
