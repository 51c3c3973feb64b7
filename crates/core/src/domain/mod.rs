// Domain Layer - Pure dispatcher entities

pub mod error;
pub mod queue;
pub mod task;
pub mod worker;

// Re-exports
pub use error::DomainError;
pub use queue::{QueueEvent, QueueKind, QueueName};
pub use task::{CompletedTask, TaskId, TaskPayload, TaskRecord, TaskResult, TaskSpec, TaskState};
pub use worker::{WorkerId, WorkerStats};
