// Dispatcher constants (no magic values)
use std::time::Duration;

/// Queue used when a producer posts without naming one
pub const DEFAULT_QUEUE_NAME: &str = "Default";

/// In-progress tasks older than this go back to OPEN (60s)
pub const DEFAULT_TASK_TIMEOUT: Duration = Duration::from_secs(60);

/// Workers silent for longer than this leave the active roster (60s)
pub const DEFAULT_LIVENESS_THRESHOLD: Duration = Duration::from_secs(60);

/// Re-check interval for the blocking pull (10ms)
///
/// Latency floor for `pull_one` once work appears in any queue.
pub const PULL_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Timeout sweeper period (10s)
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(10);

/// Host signature used when none is configured or detected
pub const DEFAULT_HOST_SIGNATURE: &str = "localhost";
