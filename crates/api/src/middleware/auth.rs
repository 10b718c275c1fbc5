//! Bearer-token authentication extractors for Axum handlers.
//!
//! Each extractor validates the presented access token against its OWN
//! session manager, so a student token can never authenticate a staff route
//! and vice versa. Validation hits the session store: a token whose session
//! was invalidated is rejected even before its own expiry.

use axum::extract::FromRequestParts;
use axum::http::header::{HeaderMap, USER_AGENT};
use axum::http::request::Parts;
use uuid::Uuid;

use campus_core::error::CoreError;
use campus_core::types::DbId;
use campus_sessions::DeviceContext;

use crate::error::AppError;
use crate::state::AppState;

/// Authenticated staff member extracted from a Bearer token.
///
/// ```ignore
/// async fn my_handler(user: StaffUser) -> AppResult<Json<()>> {
///     tracing::info!(staff_id = user.staff_id, "handling request");
///     Ok(Json(()))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct StaffUser {
    pub staff_id: DbId,
    pub college_id: DbId,
    /// Session the presented access token is bound to.
    pub session_id: Uuid,
}

/// Authenticated student extracted from a Bearer token.
#[derive(Debug, Clone)]
pub struct StudentUser {
    pub student_id: DbId,
    pub college_id: DbId,
    pub session_id: Uuid,
}

impl FromRequestParts<AppState> for StaffUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let info = state.staff_sessions.validate(token).await?;
        Ok(StaffUser {
            staff_id: info.principal_id,
            college_id: info.college_id,
            session_id: info.session_id,
        })
    }
}

impl FromRequestParts<AppState> for StudentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let info = state.student_sessions.validate(token).await?;
        Ok(StudentUser {
            student_id: info.principal_id,
            college_id: info.college_id,
            session_id: info.session_id,
        })
    }
}

/// Pull the Bearer token out of the `Authorization` header.
fn bearer_token(parts: &Parts) -> Result<&str, AppError> {
    let header = parts
        .headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized(
                "Missing Authorization header".into(),
            ))
        })?;

    header.strip_prefix("Bearer ").ok_or_else(|| {
        AppError::Core(CoreError::Unauthorized(
            "Invalid Authorization format. Expected: Bearer <token>".into(),
        ))
    })
}

/// Build the device context for session creation from request headers.
///
/// The client IP honours `X-Forwarded-For` (first hop) when present, which
/// is what the reverse proxy in front of this service sets.
pub fn device_context(headers: &HeaderMap) -> DeviceContext {
    let user_agent = headers
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let ip_address = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());

    DeviceContext {
        user_agent,
        ip_address,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_device_context_from_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("Mozilla/5.0"));
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.9, 10.0.0.1"),
        );

        let ctx = device_context(&headers);
        assert_eq!(ctx.user_agent.as_deref(), Some("Mozilla/5.0"));
        assert_eq!(ctx.ip_address.as_deref(), Some("203.0.113.9"));
    }

    #[test]
    fn test_device_context_tolerates_missing_headers() {
        let ctx = device_context(&HeaderMap::new());
        assert!(ctx.user_agent.is_none());
        assert!(ctx.ip_address.is_none());
    }
}
