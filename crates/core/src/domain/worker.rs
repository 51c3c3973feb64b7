// Worker Domain Model

use serde::{Deserialize, Serialize};

/// Worker identifier as reported by the worker itself
pub type WorkerId = String;

/// Per-worker counters. Retained after the worker leaves the active roster.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkerStats {
    pub tasks_completed: u64,
    /// Last successful pull or report (epoch ms)
    pub last_seen: i64,
    /// Seconds per task from the most recent report; None when not reported
    pub seconds_per_task: Option<f64>,
}

impl WorkerStats {
    /// Tasks per second derived from the last measured per-task time
    pub fn throughput(&self) -> f64 {
        match self.seconds_per_task {
            Some(secs) if secs > 0.0 => 1.0 / secs,
            _ => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_throughput() {
        let mut stats = WorkerStats::default();
        assert_eq!(stats.throughput(), 0.0);

        stats.seconds_per_task = Some(0.25);
        assert_eq!(stats.throughput(), 4.0);

        stats.seconds_per_task = Some(0.0);
        assert_eq!(stats.throughput(), 0.0);
    }
}
