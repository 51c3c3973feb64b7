//! RPC Request/Response Types
//!
//! Defines the JSON-RPC method parameters and results.

use std::collections::BTreeMap;

use loft_core::application::constants::DEFAULT_QUEUE_NAME;
use loft_core::application::DispatcherStats;
use loft_core::domain::{
    CompletedTask, QueueEvent, QueueKind, TaskRecord, TaskResult, TaskSpec, WorkerId,
};
use serde::{Deserialize, Serialize};

fn default_queue() -> String {
    DEFAULT_QUEUE_NAME.to_string()
}

fn default_true() -> bool {
    true
}

// ============================================================================
// Producers
// ============================================================================

/// queue.post_task.v1 - Post one task
#[derive(Debug, Deserialize)]
pub struct PostTaskRequest {
    #[serde(default = "default_queue")]
    pub queue: String,
    #[serde(default)]
    pub task_id: Option<String>,
    #[serde(default)]
    pub payload: serde_json::Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostTaskResponse {
    pub queue: String,
    pub task_id: String,
}

/// queue.post_tasks.v1 - Post tasks in order
#[derive(Debug, Deserialize)]
pub struct PostTasksRequest {
    #[serde(default = "default_queue")]
    pub queue: String,
    pub tasks: Vec<TaskSpec>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostTasksResponse {
    pub queue: String,
    pub task_ids: Vec<String>,
}

// ============================================================================
// Workers
// ============================================================================

/// worker.get_task.v1 / worker.get_tasks.v1
#[derive(Debug, Deserialize)]
pub struct PullRequest {
    pub worker_id: WorkerId,
    #[serde(default)]
    pub worker_version: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GetTaskResponse {
    /// None when the worker was refused admission
    pub task: Option<TaskRecord>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GetTasksResponse {
    pub tasks: Vec<TaskRecord>,
}

/// worker.return_completed_task.v1
#[derive(Debug, Deserialize)]
pub struct ReturnTaskRequest {
    pub worker_id: WorkerId,
    pub result: TaskResult,
    /// Seconds spent on the task
    #[serde(default)]
    pub time_taken: Option<f64>,
}

/// worker.return_completed_tasks.v1
#[derive(Debug, Deserialize)]
pub struct ReturnTasksRequest {
    pub worker_id: WorkerId,
    pub results: Vec<TaskResult>,
    /// Seconds spent on the whole batch
    #[serde(default)]
    pub time_taken: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReturnResponse {
    pub accepted: usize,
}

// ============================================================================
// Queue administration
// ============================================================================

/// Parameters for methods that only name a queue
#[derive(Debug, Deserialize)]
pub struct QueueRequest {
    #[serde(default = "default_queue")]
    pub queue: String,
}

/// queue.create.v1
#[derive(Debug, Deserialize)]
pub struct CreateQueueRequest {
    pub queue: String,
    #[serde(default)]
    pub kind: QueueKind,
    /// Task timeout; the dispatcher default applies when absent
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateQueueResponse {
    pub queue: String,
    pub created: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct RemoveQueueResponse {
    pub queue: String,
    pub removed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PurgeResponse {
    pub queue: String,
    pub discarded: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReleaseResponse {
    pub queue: String,
    pub released: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueueNamesResponse {
    pub queues: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompletedTaskResponse {
    pub completed: Option<CompletedTask>,
}

// ============================================================================
// Queue data / metadata / events
// ============================================================================

/// queue.get_data.v1 / queue.get_metadata.v1
#[derive(Debug, Deserialize)]
pub struct KeyRequest {
    #[serde(default = "default_queue")]
    pub queue: String,
    pub key: String,
}

/// queue.set_data.v1 / queue.set_metadata.v1
#[derive(Debug, Deserialize)]
pub struct SetValueRequest {
    #[serde(default = "default_queue")]
    pub queue: String,
    pub key: String,
    pub value: serde_json::Value,
}

/// queue.set_metadata_entries.v1
#[derive(Debug, Deserialize)]
pub struct SetEntriesRequest {
    #[serde(default = "default_queue")]
    pub queue: String,
    pub entries: BTreeMap<String, serde_json::Value>,
}

/// queue.log_event.v1
#[derive(Debug, Deserialize)]
pub struct LogEventRequest {
    #[serde(default = "default_queue")]
    pub queue: String,
    pub event: String,
    #[serde(default)]
    pub detail: serde_json::Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct DataResponse {
    pub key: String,
    pub value: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetadataResponse {
    pub key: String,
    pub value: serde_json::Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct KeysResponse {
    pub keys: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EventsResponse {
    pub events: Vec<QueueEvent>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AckResponse {
    pub ok: bool,
}

// ============================================================================
// Stats
// ============================================================================

/// stats.open_tasks.v1 / stats.tasks_in_progress.v1 / stats.tasks_completed.v1
#[derive(Debug, Deserialize)]
pub struct CountRequest {
    /// All queues when absent
    #[serde(default)]
    pub queue: Option<String>,
    /// Only read by stats.open_tasks.v1
    #[serde(default = "default_true")]
    pub exact: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CountResponse {
    pub count: usize,
}

/// stats.tasks_processed.v1
#[derive(Debug, Deserialize)]
pub struct TasksProcessedRequest {
    #[serde(default)]
    pub worker_id: Option<WorkerId>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TasksProcessedResponse {
    pub count: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkerNamesResponse {
    /// Every worker ever seen
    pub workers: Vec<WorkerId>,
    /// Current active roster, in arrival order
    pub active: Vec<WorkerId>,
}

/// workers.fps.v1
#[derive(Debug, Deserialize)]
pub struct WorkerFpsRequest {
    pub worker_id: WorkerId,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkerFpsResponse {
    pub worker_id: WorkerId,
    pub fps: f64,
}

/// admin.stats.v1
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    #[serde(flatten)]
    pub stats: DispatcherStats,
    pub uptime_seconds: u64,
}
