// Liveness Tracker - active worker roster + per-worker counters

use std::collections::HashMap;
use std::time::Duration;

use tracing::info;

use crate::application::queue::PartitionHint;
use crate::domain::queue::duration_millis;
use crate::domain::{WorkerId, WorkerStats};

/// Roster of workers seen recently.
///
/// Roster order is stable and gives each active worker its partition index.
/// Eviction drops a worker from the roster but keeps its counters.
pub struct LivenessTracker {
    active: Vec<WorkerId>,
    stats: HashMap<WorkerId, WorkerStats>,
    threshold_ms: i64,
}

impl LivenessTracker {
    pub fn new(threshold: Duration) -> Self {
        Self {
            active: Vec::new(),
            stats: HashMap::new(),
            threshold_ms: duration_millis(threshold),
        }
    }

    /// Record a pull by `worker`, registering it if new.
    ///
    /// Returns the worker's partition hint in the current roster.
    pub fn touch(&mut self, worker: &str, now_millis: i64) -> PartitionHint {
        let index = match self.active.iter().position(|w| w == worker) {
            Some(index) => index,
            None => {
                self.active.push(worker.to_string());
                info!(
                    worker = %worker,
                    active = self.active.len(),
                    "Worker joined active roster"
                );
                self.active.len() - 1
            }
        };
        self.stats.entry(worker.to_string()).or_default().last_seen = now_millis;
        PartitionHint::new(index, self.active.len())
    }

    /// Record reported completions.
    ///
    /// `seconds_per_task` replaces the previous measurement; None clears it.
    pub fn record_completion(
        &mut self,
        worker: &str,
        accepted: u64,
        seconds_per_task: Option<f64>,
        now_millis: i64,
    ) {
        let stats = self.stats.entry(worker.to_string()).or_default();
        stats.tasks_completed += accepted;
        stats.last_seen = now_millis;
        stats.seconds_per_task = seconds_per_task;
    }

    /// Drop workers whose last activity is older than the threshold
    pub fn evict_stale(&mut self, now_millis: i64) -> Vec<WorkerId> {
        let cutoff = now_millis.saturating_sub(self.threshold_ms);
        let stats = &self.stats;
        let mut evicted = Vec::new();
        self.active.retain(|worker| {
            let stale = stats
                .get(worker)
                .map(|s| s.last_seen < cutoff)
                .unwrap_or(true);
            if stale {
                evicted.push(worker.clone());
            }
            !stale
        });

        if !evicted.is_empty() {
            info!(
                evicted = ?evicted,
                active = self.active.len(),
                "Evicted stale workers"
            );
        }
        evicted
    }

    pub fn active_workers(&self) -> &[WorkerId] {
        &self.active
    }

    pub fn is_active(&self, worker: &str) -> bool {
        self.active.iter().any(|w| w == worker)
    }

    pub fn stats(&self, worker: &str) -> Option<&WorkerStats> {
        self.stats.get(worker)
    }

    /// Every worker ever seen, sorted
    pub fn worker_names(&self) -> Vec<WorkerId> {
        let mut names: Vec<WorkerId> = self.stats.keys().cloned().collect();
        names.sort();
        names
    }

    /// Tasks per second for an active worker; 0 when inactive or unmeasured
    pub fn throughput(&self, worker: &str) -> f64 {
        if !self.is_active(worker) {
            return 0.0;
        }
        self.stats(worker).map(WorkerStats::throughput).unwrap_or(0.0)
    }

    pub fn tasks_processed(&self, worker: &str) -> u64 {
        self.stats(worker).map(|s| s.tasks_completed).unwrap_or(0)
    }
}
