// Task Record Domain Model

use serde::{Deserialize, Serialize};

use super::error::{DomainError, Result};
use super::queue::QueueName;
use super::worker::WorkerId;

/// Task ID (unique within its queue for the queue's lifetime)
pub type TaskId = String;

/// Task lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskState {
    Open,
    InProgress,
    Completed,
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskState::Open => write!(f, "OPEN"),
            TaskState::InProgress => write!(f, "IN_PROGRESS"),
            TaskState::Completed => write!(f, "COMPLETED"),
        }
    }
}

/// Opaque task payload (never interpreted by the dispatcher)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskPayload(serde_json::Value);

impl TaskPayload {
    pub fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &serde_json::Value {
        &self.0
    }

    pub fn into_value(self) -> serde_json::Value {
        self.0
    }
}

/// Producer-side description of a task before it is posted.
///
/// `id` is optional; the queue set assigns one from its `IdProvider` when absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSpec {
    #[serde(default)]
    pub id: Option<TaskId>,
    pub payload: serde_json::Value,
}

impl TaskSpec {
    pub fn new(payload: serde_json::Value) -> Self {
        Self { id: None, payload }
    }

    pub fn with_id(id: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            id: Some(id.into()),
            payload,
        }
    }
}

/// Task Record: immutable unit of work plus its lifecycle state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: TaskId,
    pub queue_id: QueueName,
    pub payload: TaskPayload,
    pub state: TaskState,

    pub posted_at: i64, // epoch ms
    pub assigned_worker: Option<WorkerId>,
    pub dispatched_at: Option<i64>,
    pub completed_at: Option<i64>,

    /// Number of times this task was handed to a worker
    pub attempts: u32,
}

impl TaskRecord {
    /// Create an OPEN task record
    ///
    /// # Arguments
    ///
    /// * `id` - Task ID (injected, unique within the queue)
    /// * `queue_id` - Owning queue name
    /// * `payload` - Opaque payload
    /// * `posted_at` - Post timestamp in epoch ms (injected, not system time)
    pub fn new(
        id: impl Into<String>,
        queue_id: impl Into<String>,
        payload: TaskPayload,
        posted_at: i64,
    ) -> Self {
        Self {
            id: id.into(),
            queue_id: queue_id.into(),
            payload,
            state: TaskState::Open,
            posted_at,
            assigned_worker: None,
            dispatched_at: None,
            completed_at: None,
            attempts: 0,
        }
    }

    /// OPEN -> IN_PROGRESS
    pub fn dispatch(&mut self, worker: Option<WorkerId>, now_millis: i64) -> Result<()> {
        self.transition(TaskState::Open, TaskState::InProgress)?;
        self.assigned_worker = worker;
        self.dispatched_at = Some(now_millis);
        self.attempts += 1;
        Ok(())
    }

    /// IN_PROGRESS -> COMPLETED
    pub fn complete(&mut self, now_millis: i64) -> Result<()> {
        self.transition(TaskState::InProgress, TaskState::Completed)?;
        self.completed_at = Some(now_millis);
        Ok(())
    }

    /// IN_PROGRESS -> OPEN (timeout reclaim, the only backwards edge)
    pub fn requeue(&mut self) -> Result<()> {
        self.transition(TaskState::InProgress, TaskState::Open)?;
        self.assigned_worker = None;
        self.dispatched_at = None;
        Ok(())
    }

    /// True once an IN_PROGRESS task has been out longer than `timeout_ms`
    pub fn is_expired(&self, now_millis: i64, timeout_ms: i64) -> bool {
        match (self.state, self.dispatched_at) {
            (TaskState::InProgress, Some(at)) => now_millis - at > timeout_ms,
            _ => false,
        }
    }

    fn transition(&mut self, from: TaskState, to: TaskState) -> Result<()> {
        if self.state != from {
            return Err(DomainError::InvalidStateTransition {
                from: self.state.to_string(),
                to: to.to_string(),
            });
        }
        self.state = to;
        Ok(())
    }
}

/// Result reported by a worker for one task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResult {
    pub task_id: TaskId,
    pub queue_id: QueueName,
    #[serde(default)]
    pub output: serde_json::Value,
}

impl TaskResult {
    pub fn new(
        task_id: impl Into<String>,
        queue_id: impl Into<String>,
        output: serde_json::Value,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            queue_id: queue_id.into(),
            output,
        }
    }

    /// Result for `task` with no output body
    pub fn for_task(task: &TaskRecord) -> Self {
        Self::new(task.id.clone(), task.queue_id.clone(), serde_json::Value::Null)
    }
}

/// Finished task retained until a result consumer drains it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletedTask {
    pub task: TaskRecord,
    pub output: serde_json::Value,
    /// Time between dispatch and completion
    pub elapsed_ms: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record() -> TaskRecord {
        TaskRecord::new("t1", "A", TaskPayload::new(json!({"frame": 1})), 1_000)
    }

    #[test]
    fn test_lifecycle_forward() {
        let mut task = record();
        task.dispatch(Some("w1".to_string()), 2_000).unwrap();
        assert_eq!(task.state, TaskState::InProgress);
        assert_eq!(task.assigned_worker.as_deref(), Some("w1"));
        assert_eq!(task.attempts, 1);

        task.complete(2_500).unwrap();
        assert_eq!(task.state, TaskState::Completed);
        assert_eq!(task.completed_at, Some(2_500));
    }

    #[test]
    fn test_requeue_clears_assignment() {
        let mut task = record();
        task.dispatch(Some("w1".to_string()), 2_000).unwrap();
        task.requeue().unwrap();

        assert_eq!(task.state, TaskState::Open);
        assert!(task.assigned_worker.is_none());
        assert!(task.dispatched_at.is_none());
        // attempts survive the requeue
        assert_eq!(task.attempts, 1);
    }

    #[test]
    fn test_completed_is_terminal() {
        let mut task = record();
        task.dispatch(None, 2_000).unwrap();
        task.complete(3_000).unwrap();

        let err = task.requeue().unwrap_err();
        assert!(err.to_string().contains("COMPLETED -> OPEN"));
        assert!(task.dispatch(None, 4_000).is_err());
    }

    #[test]
    fn test_expiry_is_strictly_greater() {
        let mut task = record();
        assert!(!task.is_expired(10_000, 1_000));

        task.dispatch(None, 2_000).unwrap();
        assert!(!task.is_expired(3_000, 1_000));
        assert!(task.is_expired(3_001, 1_000));
    }

    #[test]
    fn test_payload_serializes_transparently() {
        let task = record();
        let value = serde_json::to_value(&task).unwrap();
        assert_eq!(value["payload"], json!({"frame": 1}));
        assert_eq!(value["state"], json!("OPEN"));
    }
}
