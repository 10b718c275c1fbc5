//! Route definitions for the `/student/auth` resource.

use axum::routing::post;
use axum::Router;

use crate::handlers::student_auth;
use crate::state::AppState;

/// Routes mounted at `/student/auth`.
///
/// ```text
/// POST /login    -> login
/// POST /refresh  -> refresh
/// POST /logout   -> logout (requires auth)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", post(student_auth::login))
        .route("/refresh", post(student_auth::refresh))
        .route("/logout", post(student_auth::logout))
}
