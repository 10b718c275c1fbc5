//! Handlers for the `/student/auth` resource.
//!
//! Students are single-device: a successful login force-closes any session
//! the student already holds, so there is no session listing or logout-all
//! surface here.

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::{Deserialize, Serialize};
use validator::Validate;

use campus_core::error::CoreError;
use campus_core::principal::{Principal, PrincipalKind};
use campus_db::models::student::StudentResponse;
use campus_db::repositories::StudentRepo;
use campus_sessions::SessionTokens;

use crate::auth::password::verify_password;
use crate::error::{AppError, AppResult};
use crate::handlers::staff_auth::RefreshRequest;
use crate::middleware::auth::{device_context, StudentUser};
use crate::state::AppState;

/// Request body for `POST /student/auth/login`.
///
/// `identifier` is either the registration number or the email address.
#[derive(Debug, Deserialize, Validate)]
pub struct StudentLoginRequest {
    #[validate(length(min = 1))]
    pub identifier: String,
    #[validate(length(min = 1))]
    pub password: String,
}

/// Successful login response: the token pair plus the student profile.
#[derive(Debug, Serialize)]
pub struct StudentLoginResponse {
    #[serde(flatten)]
    pub tokens: SessionTokens,
    pub user: StudentResponse,
}

/// POST /api/v1/student/auth/login
///
/// Authenticate with registration number (or email) + password. Any prior
/// session of the student is invalidated before the new one opens.
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<StudentLoginRequest>,
) -> AppResult<Json<StudentLoginResponse>> {
    input
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let student = StudentRepo::find_by_identifier(&state.pool, &input.identifier)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized("Invalid credentials".into()))
        })?;

    if !student.is_active {
        return Err(AppError::Core(CoreError::Forbidden(
            "Account is deactivated".into(),
        )));
    }
    if !student.is_approved {
        return Err(AppError::Core(CoreError::Forbidden(
            "Registration is pending approval".into(),
        )));
    }

    let password_valid = verify_password(&input.password, &student.password_hash)
        .map_err(|e| AppError::InternalError(format!("Password verification error: {e}")))?;
    if !password_valid {
        return Err(AppError::Core(CoreError::Unauthorized(
            "Invalid credentials".into(),
        )));
    }

    let principal = Principal {
        id: student.id,
        kind: PrincipalKind::Student,
        college_id: student.college_id,
    };
    let tokens = state
        .student_sessions
        .create_session(&principal, &device_context(&headers))
        .await?;

    Ok(Json(StudentLoginResponse {
        tokens,
        user: StudentResponse::from(&student),
    }))
}

/// POST /api/v1/student/auth/refresh
pub async fn refresh(
    State(state): State<AppState>,
    Json(input): Json<RefreshRequest>,
) -> AppResult<Json<SessionTokens>> {
    let tokens = state
        .student_sessions
        .refresh(input.session_id, &input.refresh_token)
        .await?;
    Ok(Json(tokens))
}

/// POST /api/v1/student/auth/logout
///
/// Close the student's current session. 204 regardless of whether the
/// session was still live.
pub async fn logout(State(state): State<AppState>, user: StudentUser) -> AppResult<StatusCode> {
    state
        .student_sessions
        .invalidate_session(user.session_id, user.student_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
