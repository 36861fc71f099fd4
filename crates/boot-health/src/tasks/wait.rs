use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::{HealthAggregator, HealthError};

impl HealthAggregator {
    /// Poll every `interval` until all checks report OK.
    ///
    /// There is no partial notion: a single failing check keeps the loop going.
    /// Returns [`HealthError::Cancelled`] as soon as `cancel` fires.
    pub async fn wait_all_ok(
        &self,
        cancel: &CancellationToken,
        interval: Duration,
    ) -> Result<(), HealthError> {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => return Err(HealthError::Cancelled),
                _ = ticker.tick() => {}
            }

            let health = tokio::select! {
                _ = cancel.cancelled() => return Err(HealthError::Cancelled),
                health = self.cluster_health() => health,
            };

            let waiting = health.failing();
            if waiting.is_empty() {
                debug!(target: "boot.health", checks = health.checks.len(), "all checks OK");
                return Ok(());
            }
            info!(target: "boot.health", targets = %waiting.join(" "), "waiting");
        }
    }
}
