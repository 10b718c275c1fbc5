//! Typed row models and DTOs for the database layer.

pub mod session;
pub mod staff;
pub mod student;
