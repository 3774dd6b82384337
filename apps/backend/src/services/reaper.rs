use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::services::sessions::SessionCoordinator;

/// Periodically delete finished sessions older than `retention`.
pub fn spawn_reaper(
    coordinator: SessionCoordinator,
    interval: Duration,
    retention: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("session reaper stopped");
                    return;
                }
                _ = ticker.tick() => {
                    if let Err(err) = coordinator.reap_finished(retention).await {
                        warn!(error = %err, "session reaper pass failed");
                    }
                }
            }
        }
    })
}
