// Domain Error Types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Queue already exists: {0}")]
    QueueAlreadyExists(String),

    #[error("Queue not found: {0}")]
    QueueNotFound(String),

    #[error("Duplicate task id {task_id} in queue {queue}")]
    DuplicateTaskId { queue: String, task_id: String },

    #[error("Invalid task state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("Metadata key {key} not set on queue {queue}")]
    MetadataKeyNotFound { queue: String, key: String },

    #[error("Validation error: {0}")]
    ValidationError(String),
}

pub type Result<T> = std::result::Result<T, DomainError>;
