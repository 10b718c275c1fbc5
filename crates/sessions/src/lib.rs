//! Session and token management for the campus backend.
//!
//! This crate owns the stateful part of authentication:
//!
//! - [`jwt`] -- signed access/refresh token issuance and verification,
//!   with distinct signing material per principal kind.
//! - [`store`] -- session persistence across PostgreSQL (source of truth)
//!   and Redis (fast path), plus the principal -> session-id index.
//! - [`revocation`] -- registry of retired refresh-token hashes.
//! - [`directory`] -- fresh principal lookups during refresh.
//! - [`manager`] -- the session manager orchestrating creation, rotation,
//!   validation, listing, and invalidation. Staff sessions are
//!   multi-device; student sessions are strictly single-device.
//!
//! Collaborators are injected through the trait seams in [`store`],
//! [`revocation`], and [`directory`]; nothing in this crate reaches for
//! process-global clients.

pub mod directory;
pub mod error;
pub mod jwt;
pub mod manager;
pub mod revocation;
pub mod store;

pub use directory::{PgPrincipalDirectory, PrincipalDirectory};
pub use error::{SessionError, SessionResult};
pub use jwt::{hash_token, TokenCodec, TokenKind};
pub use manager::{DeviceContext, SessionInfo, SessionManager, SessionSummary, SessionTokens};
pub use revocation::{RedisRevocationRegistry, RevocationRegistry, RevokeReason};
pub use store::{PgRedisSessionStore, SessionRecord, SessionStore};
