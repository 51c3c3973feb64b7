// Application Layer - Dispatcher use cases

pub mod admission;
pub mod config;
pub mod constants;
pub mod liveness;
pub mod queue;
pub mod queue_set;
pub mod shutdown;
pub mod sweeper;

// Re-exports
pub use admission::{Admission, AdmissionGate};
pub use config::DispatcherConfig;
pub use liveness::LivenessTracker;
pub use queue::{PartitionHint, QueueSnapshot, TaskQueue};
pub use queue_set::{DispatcherStats, QueueSet, SweepReport};
pub use shutdown::{shutdown_channel, ShutdownSender, ShutdownToken};
pub use sweeper::TimeoutSweeper;
