use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use campus_core::error::CoreError;
use campus_sessions::SessionError;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and [`SessionError`] for the session
/// subsystem, and adds HTTP-specific variants. Implements [`IntoResponse`] to
/// produce consistent `{error, code}` JSON responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `campus_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A session or token error from `campus_sessions`.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A database error from sqlx.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // --- CoreError variants ---
            AppError::Core(core) => match core {
                CoreError::Unauthorized(msg) => {
                    (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone())
                }
                CoreError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg.clone()),
            },

            // --- Session subsystem errors ---
            AppError::Session(err) => classify_session_error(err),

            // --- Database errors ---
            AppError::Database(err) => classify_sqlx_error(err),

            // --- HTTP-specific errors ---
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

/// Classify a session error into an HTTP status, error code, and message.
///
/// All credential-class failures are 401 so clients know to re-authenticate.
/// Only persistence failures (required writes that did not land) are 500.
fn classify_session_error(err: &SessionError) -> (StatusCode, &'static str, String) {
    match err {
        SessionError::InvalidSession => (
            StatusCode::UNAUTHORIZED,
            "INVALID_SESSION",
            "Session not found or no longer valid".to_string(),
        ),
        SessionError::InvalidToken => (
            StatusCode::UNAUTHORIZED,
            "INVALID_TOKEN",
            "Invalid token".to_string(),
        ),
        SessionError::TokenExpired => (
            StatusCode::UNAUTHORIZED,
            "TOKEN_EXPIRED",
            "Token has expired".to_string(),
        ),
        SessionError::TokenRevoked => (
            StatusCode::UNAUTHORIZED,
            "TOKEN_REVOKED",
            "Token has been revoked".to_string(),
        ),
        SessionError::PrincipalNotFound => (
            StatusCode::UNAUTHORIZED,
            "UNAUTHORIZED",
            "Account no longer exists or cannot authenticate".to_string(),
        ),
        SessionError::Persistence(msg) => {
            tracing::error!(error = %msg, "Session persistence error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            )
        }
        SessionError::Internal(msg) => {
            tracing::error!(error = %msg, "Session internal error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            )
        }
    }
}

/// Classify a sqlx error into an HTTP status, error code, and message.
///
/// - `RowNotFound` maps to 404.
/// - Unique constraint violations (constraint name starting with `uq_`) map to 409.
/// - Everything else maps to 500 with a sanitized message.
fn classify_sqlx_error(err: &sqlx::Error) -> (StatusCode, &'static str, String) {
    match err {
        sqlx::Error::RowNotFound => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            "Resource not found".to_string(),
        ),
        sqlx::Error::Database(db_err) => {
            // PostgreSQL unique constraint violation: error code 23505
            if db_err.code().as_deref() == Some("23505") {
                let constraint = db_err.constraint().unwrap_or("unknown");
                if constraint.starts_with("uq_") {
                    return (
                        StatusCode::CONFLICT,
                        "CONFLICT",
                        format!("Duplicate value violates unique constraint: {constraint}"),
                    );
                }
            }
            tracing::error!(error = %db_err, "Database error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            )
        }
        other => {
            tracing::error!(error = %other, "Database error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_session_errors_map_to_unauthorized() {
        assert_eq!(
            status_of(AppError::Session(SessionError::InvalidSession)),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_of(AppError::Session(SessionError::InvalidToken)),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_of(AppError::Session(SessionError::TokenExpired)),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_of(AppError::Session(SessionError::TokenRevoked)),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_of(AppError::Session(SessionError::PrincipalNotFound)),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn test_server_side_session_errors_are_internal() {
        assert_eq!(
            status_of(AppError::Session(SessionError::Persistence(
                "redis write failed".into()
            ))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_of(AppError::Session(SessionError::Internal(
                "token encoding failed".into()
            ))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_core_forbidden_maps_to_403() {
        assert_eq!(
            status_of(AppError::Core(CoreError::Forbidden("locked".into()))),
            StatusCode::FORBIDDEN
        );
    }
}
