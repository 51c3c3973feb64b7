//! SDK Request/Response Types
//!
//! Mirrors the JSON-RPC types from the api-rpc crate.

use std::collections::BTreeMap;

use loft_core::domain::{
    CompletedTask, QueueEvent, QueueKind, TaskRecord, TaskResult, TaskSpec, WorkerId,
};
use serde::{Deserialize, Serialize};

pub use loft_core::application::{DispatcherStats, QueueSnapshot};

// Requests

#[derive(Debug, Clone, Serialize)]
pub(crate) struct PostTaskRequest {
    pub queue: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    pub payload: serde_json::Value,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct PostTasksRequest {
    pub queue: String,
    pub tasks: Vec<TaskSpec>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct PullRequest {
    pub worker_id: WorkerId,
    pub worker_version: String,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct ReturnTaskRequest {
    pub worker_id: WorkerId,
    pub result: TaskResult,
    pub time_taken: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct ReturnTasksRequest {
    pub worker_id: WorkerId,
    pub results: Vec<TaskResult>,
    pub time_taken: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct QueueRequest {
    pub queue: String,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct CreateQueueRequest {
    pub queue: String,
    pub kind: QueueKind,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct KeyRequest {
    pub queue: String,
    pub key: String,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct SetValueRequest {
    pub queue: String,
    pub key: String,
    pub value: serde_json::Value,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct SetEntriesRequest {
    pub queue: String,
    pub entries: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct LogEventRequest {
    pub queue: String,
    pub event: String,
    pub detail: serde_json::Value,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct CountRequest {
    pub queue: Option<String>,
    pub exact: bool,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct WorkerRequest {
    pub worker_id: Option<WorkerId>,
}

// Responses

#[derive(Debug, Clone, Deserialize)]
pub struct PostTaskResponse {
    pub queue: String,
    pub task_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PostTasksResponse {
    pub queue: String,
    pub task_ids: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct GetTaskResponse {
    pub task: Option<TaskRecord>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct GetTasksResponse {
    pub tasks: Vec<TaskRecord>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ReturnResponse {
    pub accepted: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct CompletedTaskResponse {
    pub completed: Option<CompletedTask>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct PurgeResponse {
    pub discarded: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ReleaseResponse {
    pub released: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct QueueNamesResponse {
    pub queues: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct DataResponse {
    pub value: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct MetadataResponse {
    pub value: serde_json::Value,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct KeysResponse {
    pub keys: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct EventsResponse {
    pub events: Vec<QueueEvent>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct AckResponse {
    #[allow(dead_code)] // always true on success
    pub ok: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct CountResponse {
    pub count: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct TasksProcessedResponse {
    pub count: u64,
}

/// Known and currently active workers
#[derive(Debug, Clone, Deserialize)]
pub struct WorkerNames {
    pub workers: Vec<WorkerId>,
    pub active: Vec<WorkerId>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct WorkerFpsResponse {
    pub fps: f64,
}

/// admin.stats.v1 result
#[derive(Debug, Clone, Deserialize)]
pub struct StatsResponse {
    #[serde(flatten)]
    pub stats: DispatcherStats,
    pub uptime_seconds: u64,
}
