//! Retention Sweep Task
//!
//! Background task that periodically drops aged-out protocol objects held by
//! the live session.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::session::SessionManager;

/// Spawns a background task that purges expired retained objects every
/// `interval_secs` seconds.
///
/// The sweep never creates a session; with none live it does nothing. The
/// returned handle is aborted during graceful shutdown.
///
/// # Example
/// ```ignore
/// let sweep = spawn_retention_sweep(sessions.clone(), 60);
/// // Later, during shutdown:
/// sweep.abort();
/// ```
pub fn spawn_retention_sweep(sessions: Arc<SessionManager>, interval_secs: u64) -> JoinHandle<()> {
    let interval = Duration::from_secs(interval_secs.max(1));

    tokio::spawn(async move {
        info!(
            "Starting retention sweep with interval of {} seconds",
            interval.as_secs()
        );

        loop {
            tokio::time::sleep(interval).await;

            let removed = sessions.purge_expired().await;
            if removed > 0 {
                info!("Retention sweep: dropped {} expired objects", removed);
            } else {
                debug!("Retention sweep: nothing expired");
            }
        }
    })
}
