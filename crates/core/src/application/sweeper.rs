// Timeout Sweeper
// Periodic requeue of expired tasks and eviction of silent workers

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info};

use crate::application::queue_set::{QueueSet, SweepReport};
use crate::application::shutdown::ShutdownToken;
use crate::error::Result;

/// Background sweeper over a shared `QueueSet`
pub struct TimeoutSweeper {
    queues: Arc<QueueSet>,
    interval: Duration,
}

impl TimeoutSweeper {
    /// Create a new sweeper
    ///
    /// # Arguments
    /// * `queues` - Queue set to sweep
    /// * `interval` - Time between sweeps
    pub fn new(queues: Arc<QueueSet>, interval: Duration) -> Self {
        Self { queues, interval }
    }

    /// Run the sweep loop until `shutdown` fires.
    ///
    /// Should be spawned with `tokio::spawn`.
    pub async fn run(self, mut shutdown: ShutdownToken) {
        info!(
            interval_ms = self.interval.as_millis() as u64,
            "Timeout sweeper started"
        );

        let mut tick = interval(self.interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = tick.tick() => {
                    if let Err(e) = self.run_now() {
                        error!(error = ?e, "Timeout sweep failed");
                    }
                }
                _ = shutdown.wait() => {
                    info!("Timeout sweeper stopped");
                    break;
                }
            }
        }
    }

    /// Sweep once
    pub fn run_now(&self) -> Result<SweepReport> {
        let report = self.queues.check_timeouts()?;

        if report.requeued > 0 || !report.evicted.is_empty() {
            info!(
                requeued = report.requeued,
                evicted = ?report.evicted,
                "Timeout sweep completed"
            );
        }
        Ok(report)
    }
}
