//! Inactivity watcher — scale-to-zero after a quiet period.

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, error, info};

use wakegate_state::ProxyState;

use crate::error::ScaleError;
use crate::scaler::{ScaleController, ScaleOutcome};

/// Periodically requests zero replicas once traffic has stopped.
pub struct InactivityWatcher {
    state: ProxyState,
    scaler: ScaleController,
    threshold: Duration,
    interval: Duration,
}

impl InactivityWatcher {
    /// `interval` should be shorter than `threshold` to bound how late a
    /// quiet period is noticed.
    pub fn new(
        state: ProxyState,
        scaler: ScaleController,
        threshold: Duration,
        interval: Duration,
    ) -> Self {
        Self {
            state,
            scaler,
            threshold,
            interval,
        }
    }

    /// Run one check.
    ///
    /// Returns `None` when traffic was seen within the threshold, otherwise
    /// the result of `scale(0)`. Idleness is checked again once the scale
    /// gate is held.
    pub async fn check(&self) -> Option<Result<ScaleOutcome, ScaleError>> {
        let idle = self.state.idle_for(Instant::now());
        if idle < self.threshold {
            debug!(idle_secs = idle.as_secs(), "backend still active");
            return None;
        }

        info!(
            idle_secs = idle.as_secs(),
            threshold_secs = self.threshold.as_secs(),
            "no traffic for a while, scaling deployment down"
        );
        self.scaler.scale_down_if_idle(self.threshold).await
    }

    /// Run the watcher loop until `shutdown` fires.
    ///
    /// A failed scale-down is logged and retried on the next tick.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(
            interval_secs = self.interval.as_secs(),
            threshold_secs = self.threshold.as_secs(),
            "inactivity watcher started"
        );

        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {
                    if let Some(Err(e)) = self.check().await {
                        error!(error = %e, "error scaling down deployment");
                    }
                }
                _ = shutdown.changed() => {
                    info!("inactivity watcher shutting down");
                    break;
                }
            }
        }
    }
}
