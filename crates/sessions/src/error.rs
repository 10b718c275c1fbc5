//! Error taxonomy for the session layer.
//!
//! Everything except [`SessionError::Persistence`] and
//! [`SessionError::Internal`] is a credential-class failure: the caller must
//! be treated as unauthenticated, never left in a half-authenticated state.
//! `Persistence` covers unreachable stores on required writes, `Internal`
//! covers token construction; both surface as server-side failures instead.

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Session id unknown, inactive, or past its expiry.
    #[error("Invalid or expired session")]
    InvalidSession,

    /// Malformed token, wrong token type, or refresh-token hash mismatch.
    #[error("Invalid token")]
    InvalidToken,

    /// Signature verified but the token is past its `exp` claim.
    #[error("Token expired")]
    TokenExpired,

    /// The presented refresh token's hash is in the revocation registry.
    #[error("Token has been revoked")]
    TokenRevoked,

    /// The owning principal no longer exists (or can no longer authenticate).
    #[error("Principal not found")]
    PrincipalNotFound,

    /// Durable or fast-path store unreachable on a required write/read.
    #[error("Persistence failure: {0}")]
    Persistence(String),

    /// Token construction failed (signing/serialization). Not a store
    /// problem; still surfaces as a server-side failure.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sqlx::Error> for SessionError {
    fn from(err: sqlx::Error) -> Self {
        SessionError::Persistence(err.to_string())
    }
}

impl From<redis::RedisError> for SessionError {
    fn from(err: redis::RedisError) -> Self {
        SessionError::Persistence(err.to_string())
    }
}

/// Convenience alias for session-layer return values.
pub type SessionResult<T> = Result<T, SessionError>;
