//! Domain-level error type.
//!
//! Deliberately small: this service's domain failures are all
//! authentication-shaped. Store and token errors carry their own types in
//! the layers that own them.

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),
}
