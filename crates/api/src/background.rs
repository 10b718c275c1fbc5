//! Background maintenance tasks.

use std::time::Duration;

use tokio::task::JoinHandle;

use campus_db::repositories::SessionRepo;
use campus_db::DbPool;

/// How often the session sweeper runs.
const CLEANUP_INTERVAL_SECS: u64 = 3600;

/// Spawn the periodic sweep of expired and deactivated session rows.
///
/// Expired sessions are already rejected on every path, so this is pure
/// housekeeping to keep the table small. Abort the returned handle on
/// shutdown.
pub fn start_session_cleanup(pool: DbPool) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(CLEANUP_INTERVAL_SECS));
        // The first tick fires immediately; sweep once at startup.
        loop {
            interval.tick().await;
            match SessionRepo::cleanup_expired(&pool).await {
                Ok(0) => {}
                Ok(removed) => tracing::info!(removed, "Swept expired session rows"),
                Err(e) => tracing::warn!(error = ?e, "Session cleanup sweep failed"),
            }
        }
    })
}
