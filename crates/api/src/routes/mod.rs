pub mod health;
pub mod staff_auth;
pub mod student_auth;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /staff/auth/login         login (public)
/// /staff/auth/refresh       refresh (public)
/// /staff/auth/logout        close current session (requires staff auth)
/// /staff/auth/logout-all    close all other sessions (requires staff auth)
/// /staff/auth/sessions      list live sessions (requires staff auth)
///
/// /student/auth/login       login (public, single-device)
/// /student/auth/refresh     refresh (public)
/// /student/auth/logout      close current session (requires student auth)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/staff/auth", staff_auth::router())
        .nest("/student/auth", student_auth::router())
}
