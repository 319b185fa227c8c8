//! Periodic expiry of idle sessions.

use crate::session_store::SessionStore;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Runs [`SessionStore::sweep_expired`] every `every` until `cancel` fires.
///
/// Sweeping is safe alongside in-flight session use: records are re-checked
/// under their own lock before deletion.
pub fn spawn_sweeper(
    sessions: SessionStore,
    every: Duration,
    max_age: chrono::Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(target: "sweeper", "Session sweeper started ({}s interval)", every.as_secs());

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    match sessions.sweep_expired(max_age).await {
                        Ok(removed) => debug!(target: "sweeper", removed, "Sweep finished"),
                        Err(e) => warn!(target: "sweeper", "Sweep failed: {}", e),
                    }
                }
            }
        }

        info!(target: "sweeper", "Session sweeper stopped");
    })
}
