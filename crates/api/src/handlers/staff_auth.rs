//! Handlers for the `/staff/auth` resource.
//!
//! Staff hold any number of concurrent sessions: each device gets its own
//! session with its own refresh credential, listable and revocable on its
//! own via `/sessions`, `/logout`, and `/logout-all`.

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use campus_core::error::CoreError;
use campus_core::principal::{Principal, PrincipalKind};
use campus_db::models::staff::StaffResponse;
use campus_db::repositories::StaffRepo;
use campus_sessions::{SessionSummary, SessionTokens};

use crate::auth::password::verify_password;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::{device_context, StaffUser};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /staff/auth/login`.
#[derive(Debug, Deserialize, Validate)]
pub struct StaffLoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

/// Request body for `POST /staff/auth/refresh`.
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub session_id: Uuid,
    pub refresh_token: String,
}

/// Successful login response: the token pair plus the staff profile.
#[derive(Debug, Serialize)]
pub struct StaffLoginResponse {
    #[serde(flatten)]
    pub tokens: SessionTokens,
    pub user: StaffResponse,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/staff/auth/login
///
/// Authenticate with email + password. Opens a new session alongside any
/// existing ones.
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<StaffLoginRequest>,
) -> AppResult<Json<StaffLoginResponse>> {
    input
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let staff = StaffRepo::find_by_email(&state.pool, &input.email)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::Unauthorized("Invalid email or password".into())))?;

    if !staff.is_active {
        return Err(AppError::Core(CoreError::Forbidden(
            "Account is deactivated".into(),
        )));
    }

    let password_valid = verify_password(&input.password, &staff.password_hash)
        .map_err(|e| AppError::InternalError(format!("Password verification error: {e}")))?;
    if !password_valid {
        return Err(AppError::Core(CoreError::Unauthorized(
            "Invalid email or password".into(),
        )));
    }

    let principal = Principal {
        id: staff.id,
        kind: PrincipalKind::Staff,
        college_id: staff.college_id,
    };
    let tokens = state
        .staff_sessions
        .create_session(&principal, &device_context(&headers))
        .await?;

    Ok(Json(StaffLoginResponse {
        tokens,
        user: StaffResponse::from(&staff),
    }))
}

/// POST /api/v1/staff/auth/refresh
///
/// Exchange a valid refresh token for a rotated token pair. The presented
/// token is single-use.
pub async fn refresh(
    State(state): State<AppState>,
    Json(input): Json<RefreshRequest>,
) -> AppResult<Json<SessionTokens>> {
    let tokens = state
        .staff_sessions
        .refresh(input.session_id, &input.refresh_token)
        .await?;
    Ok(Json(tokens))
}

/// POST /api/v1/staff/auth/logout
///
/// Close the session the presented access token belongs to. 204 regardless
/// of whether the session was still live.
pub async fn logout(State(state): State<AppState>, user: StaffUser) -> AppResult<StatusCode> {
    state
        .staff_sessions
        .invalidate_session(user.session_id, user.staff_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/staff/auth/logout-all
///
/// Close every OTHER session of the caller, keeping the current one.
pub async fn logout_all(State(state): State<AppState>, user: StaffUser) -> AppResult<StatusCode> {
    state
        .staff_sessions
        .invalidate_all_sessions(user.staff_id, Some(user.session_id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/staff/auth/sessions
///
/// List the caller's live sessions (device, IP, timestamps). Token material
/// is never included.
pub async fn list_sessions(
    State(state): State<AppState>,
    user: StaffUser,
) -> AppResult<Json<Vec<SessionSummary>>> {
    let sessions = state.staff_sessions.list_sessions(user.staff_id).await?;
    Ok(Json(sessions))
}
