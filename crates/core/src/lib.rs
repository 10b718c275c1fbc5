//! Shared domain types for the campus backend.
//!
//! - [`types`] -- common id and timestamp aliases.
//! - [`error`] -- domain-level error type.
//! - [`principal`] -- staff/student principal kinds.
//! - [`device`] -- user-agent classification into device info.

pub mod device;
pub mod error;
pub mod principal;
pub mod types;
