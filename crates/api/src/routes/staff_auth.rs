//! Route definitions for the `/staff/auth` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::staff_auth;
use crate::state::AppState;

/// Routes mounted at `/staff/auth`.
///
/// ```text
/// POST /login       -> login
/// POST /refresh     -> refresh
/// POST /logout      -> logout (requires auth)
/// POST /logout-all  -> logout_all (requires auth)
/// GET  /sessions    -> list_sessions (requires auth)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", post(staff_auth::login))
        .route("/refresh", post(staff_auth::refresh))
        .route("/logout", post(staff_auth::logout))
        .route("/logout-all", post(staff_auth::logout_all))
        .route("/sessions", get(staff_auth::list_sessions))
}
