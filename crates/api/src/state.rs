use std::sync::Arc;

use campus_sessions::SessionManager;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
/// Server configuration is consumed at startup; handlers only ever see the
/// managers it was baked into.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: campus_db::DbPool,
    /// Shared Redis connection (health checks; the session layer holds its
    /// own clone).
    pub redis: redis::aio::ConnectionManager,
    /// Multi-device session manager for staff.
    pub staff_sessions: Arc<SessionManager>,
    /// Single-device session manager for students.
    pub student_sessions: Arc<SessionManager>,
}
