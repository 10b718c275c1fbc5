//! Authentication primitives.
//!
//! - [`password`] -- Argon2id password hashing and verification. Token
//!   issuance and session handling live in `campus_sessions`.

pub mod password;
