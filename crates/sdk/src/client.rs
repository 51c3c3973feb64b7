//! Loft Client Implementation

use std::collections::BTreeMap;
use std::time::Duration;

use jsonrpsee::core::client::ClientT;
use jsonrpsee::core::params::ArrayParams;
use jsonrpsee::http_client::{HttpClient, HttpClientBuilder};
use jsonrpsee::rpc_params;
use loft_core::domain::{
    CompletedTask, QueueEvent, QueueKind, TaskRecord, TaskResult, TaskSpec,
};
use serde::de::DeserializeOwned;

use crate::error::{Result, SdkError};
use crate::types::*;

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Loft dispatcher client
///
/// One client serves any mix of roles: producer, worker, result consumer.
/// Worker calls send the client's worker version so the dispatcher's
/// admission gate can check it.
///
/// # Example
///
/// ```no_run
/// use loft_sdk::LoftClient;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = LoftClient::connect("http://127.0.0.1:9630").await?;
/// # Ok(())
/// # }
/// ```
pub struct LoftClient {
    client: HttpClient,
    worker_version: String,
}

impl LoftClient {
    /// Connect to a Loft daemon
    ///
    /// # Arguments
    ///
    /// * `url` - RPC endpoint URL (e.g., `http://127.0.0.1:9630`)
    pub async fn connect(url: impl AsRef<str>) -> Result<Self> {
        Self::connect_with_timeout(url, DEFAULT_REQUEST_TIMEOUT).await
    }

    /// Connect with a custom request timeout.
    ///
    /// `get_task` blocks server-side until work exists, so workers that
    /// expect idle periods should pass a long timeout.
    pub async fn connect_with_timeout(url: impl AsRef<str>, timeout: Duration) -> Result<Self> {
        let url = url.as_ref();

        let client = HttpClientBuilder::default()
            .request_timeout(timeout)
            .build(url)
            .map_err(|e| SdkError::Connection(format!("Failed to create client: {}", e)))?;

        Ok(Self {
            client,
            worker_version: loft_core::VERSION.to_string(),
        })
    }

    /// Override the version reported on worker calls
    pub fn with_worker_version(mut self, version: impl Into<String>) -> Self {
        self.worker_version = version.into();
        self
    }

    async fn call<R: DeserializeOwned>(&self, method: &str, params: ArrayParams) -> Result<R> {
        let response: R = self.client.request(method, params).await?;
        Ok(response)
    }

    // ------------------------------------------------------------------
    // Producers
    // ------------------------------------------------------------------

    /// Post one task; returns the task id (generated when `task_id` is None)
    pub async fn post_task(
        &self,
        queue: impl Into<String>,
        task_id: Option<String>,
        payload: serde_json::Value,
    ) -> Result<String> {
        let request = PostTaskRequest {
            queue: queue.into(),
            task_id,
            payload,
        };
        let response: PostTaskResponse =
            self.call("queue.post_task.v1", rpc_params![request]).await?;
        Ok(response.task_id)
    }

    /// Post tasks in order; all-or-nothing on duplicate ids
    pub async fn post_tasks(
        &self,
        queue: impl Into<String>,
        tasks: Vec<TaskSpec>,
    ) -> Result<Vec<String>> {
        let request = PostTasksRequest {
            queue: queue.into(),
            tasks,
        };
        let response: PostTasksResponse =
            self.call("queue.post_tasks.v1", rpc_params![request]).await?;
        Ok(response.task_ids)
    }

    // ------------------------------------------------------------------
    // Workers
    // ------------------------------------------------------------------

    /// Blocking pull. None means the dispatcher refused this worker.
    pub async fn get_task(&self, worker_id: impl Into<String>) -> Result<Option<TaskRecord>> {
        let request = self.pull_request(worker_id);
        let response: GetTaskResponse =
            self.call("worker.get_task.v1", rpc_params![request]).await?;
        Ok(response.task)
    }

    /// Non-blocking batch pull
    pub async fn get_tasks(&self, worker_id: impl Into<String>) -> Result<Vec<TaskRecord>> {
        let request = self.pull_request(worker_id);
        let response: GetTasksResponse =
            self.call("worker.get_tasks.v1", rpc_params![request]).await?;
        Ok(response.tasks)
    }

    fn pull_request(&self, worker_id: impl Into<String>) -> PullRequest {
        PullRequest {
            worker_id: worker_id.into(),
            worker_version: self.worker_version.clone(),
        }
    }

    /// Report one result; returns how many results were accepted (0 or 1)
    pub async fn return_completed_task(
        &self,
        worker_id: impl Into<String>,
        result: TaskResult,
        time_taken: Option<Duration>,
    ) -> Result<usize> {
        let request = ReturnTaskRequest {
            worker_id: worker_id.into(),
            result,
            time_taken: time_taken.map(|d| d.as_secs_f64()),
        };
        let response: ReturnResponse = self
            .call("worker.return_completed_task.v1", rpc_params![request])
            .await?;
        Ok(response.accepted)
    }

    /// Report a batch; `time_taken` covers the whole batch
    pub async fn return_completed_tasks(
        &self,
        worker_id: impl Into<String>,
        results: Vec<TaskResult>,
        time_taken: Option<Duration>,
    ) -> Result<usize> {
        let request = ReturnTasksRequest {
            worker_id: worker_id.into(),
            results,
            time_taken: time_taken.map(|d| d.as_secs_f64()),
        };
        let response: ReturnResponse = self
            .call("worker.return_completed_tasks.v1", rpc_params![request])
            .await?;
        Ok(response.accepted)
    }

    // ------------------------------------------------------------------
    // Result consumers
    // ------------------------------------------------------------------

    pub async fn get_completed_task(
        &self,
        queue: impl Into<String>,
    ) -> Result<Option<CompletedTask>> {
        let request = QueueRequest {
            queue: queue.into(),
        };
        let response: CompletedTaskResponse = self
            .call("queue.get_completed_task.v1", rpc_params![request])
            .await?;
        Ok(response.completed)
    }

    // ------------------------------------------------------------------
    // Queue administration
    // ------------------------------------------------------------------

    pub async fn create_queue(
        &self,
        queue: impl Into<String>,
        kind: QueueKind,
        timeout: Option<Duration>,
    ) -> Result<()> {
        let request = CreateQueueRequest {
            queue: queue.into(),
            kind,
            timeout_secs: timeout.map(|d| d.as_secs()),
        };
        let _: serde_json::Value = self.call("queue.create.v1", rpc_params![request]).await?;
        Ok(())
    }

    pub async fn remove_queue(&self, queue: impl Into<String>) -> Result<()> {
        let request = QueueRequest {
            queue: queue.into(),
        };
        let _: serde_json::Value = self.call("queue.remove.v1", rpc_params![request]).await?;
        Ok(())
    }

    /// Discard every task of a queue; returns how many were dropped
    pub async fn purge(&self, queue: impl Into<String>) -> Result<usize> {
        let request = QueueRequest {
            queue: queue.into(),
        };
        let response: PurgeResponse = self.call("queue.purge.v1", rpc_params![request]).await?;
        Ok(response.discarded)
    }

    /// Release a batched queue's held tail
    pub async fn release_tasks(&self, queue: impl Into<String>) -> Result<usize> {
        let request = QueueRequest {
            queue: queue.into(),
        };
        let response: ReleaseResponse = self
            .call("queue.release_tasks.v1", rpc_params![request])
            .await?;
        Ok(response.released)
    }

    pub async fn queue_names(&self) -> Result<Vec<String>> {
        let response: QueueNamesResponse = self.call("queue.names.v1", rpc_params![]).await?;
        Ok(response.queues)
    }

    // ------------------------------------------------------------------
    // Queue data / metadata / events
    // ------------------------------------------------------------------

    pub async fn get_data(
        &self,
        queue: impl Into<String>,
        key: impl Into<String>,
    ) -> Result<Option<serde_json::Value>> {
        let request = KeyRequest {
            queue: queue.into(),
            key: key.into(),
        };
        let response: DataResponse = self.call("queue.get_data.v1", rpc_params![request]).await?;
        Ok(response.value)
    }

    pub async fn set_data(
        &self,
        queue: impl Into<String>,
        key: impl Into<String>,
        value: serde_json::Value,
    ) -> Result<()> {
        let request = SetValueRequest {
            queue: queue.into(),
            key: key.into(),
            value,
        };
        let _: AckResponse = self.call("queue.set_data.v1", rpc_params![request]).await?;
        Ok(())
    }

    /// Fails with code 4001 when the key is not set
    pub async fn get_metadata(
        &self,
        queue: impl Into<String>,
        key: impl Into<String>,
    ) -> Result<serde_json::Value> {
        let request = KeyRequest {
            queue: queue.into(),
            key: key.into(),
        };
        let response: MetadataResponse = self
            .call("queue.get_metadata.v1", rpc_params![request])
            .await?;
        Ok(response.value)
    }

    pub async fn set_metadata(
        &self,
        queue: impl Into<String>,
        key: impl Into<String>,
        value: serde_json::Value,
    ) -> Result<()> {
        let request = SetValueRequest {
            queue: queue.into(),
            key: key.into(),
            value,
        };
        let _: AckResponse = self
            .call("queue.set_metadata.v1", rpc_params![request])
            .await?;
        Ok(())
    }

    pub async fn set_metadata_entries(
        &self,
        queue: impl Into<String>,
        entries: BTreeMap<String, serde_json::Value>,
    ) -> Result<()> {
        let request = SetEntriesRequest {
            queue: queue.into(),
            entries,
        };
        let _: AckResponse = self
            .call("queue.set_metadata_entries.v1", rpc_params![request])
            .await?;
        Ok(())
    }

    pub async fn metadata_keys(&self, queue: impl Into<String>) -> Result<Vec<String>> {
        let request = QueueRequest {
            queue: queue.into(),
        };
        let response: KeysResponse = self
            .call("queue.metadata_keys.v1", rpc_params![request])
            .await?;
        Ok(response.keys)
    }

    pub async fn log_event(
        &self,
        queue: impl Into<String>,
        event: impl Into<String>,
        detail: serde_json::Value,
    ) -> Result<()> {
        let request = LogEventRequest {
            queue: queue.into(),
            event: event.into(),
            detail,
        };
        let _: AckResponse = self.call("queue.log_event.v1", rpc_params![request]).await?;
        Ok(())
    }

    pub async fn events(&self, queue: impl Into<String>) -> Result<Vec<QueueEvent>> {
        let request = QueueRequest {
            queue: queue.into(),
        };
        let response: EventsResponse = self.call("queue.events.v1", rpc_params![request]).await?;
        Ok(response.events)
    }

    // ------------------------------------------------------------------
    // Stats
    // ------------------------------------------------------------------

    /// Open tasks in one queue or all; `exact == false` excludes held batch tails
    pub async fn open_tasks(&self, queue: Option<&str>, exact: bool) -> Result<usize> {
        self.count("stats.open_tasks.v1", queue, exact).await
    }

    pub async fn tasks_in_progress(&self, queue: Option<&str>) -> Result<usize> {
        self.count("stats.tasks_in_progress.v1", queue, true).await
    }

    pub async fn tasks_completed(&self, queue: Option<&str>) -> Result<usize> {
        self.count("stats.tasks_completed.v1", queue, true).await
    }

    async fn count(&self, method: &str, queue: Option<&str>, exact: bool) -> Result<usize> {
        let request = CountRequest {
            queue: queue.map(str::to_string),
            exact,
        };
        let response: CountResponse = self.call(method, rpc_params![request]).await?;
        Ok(response.count)
    }

    /// Accepted completions overall, or for one worker
    pub async fn tasks_processed(&self, worker_id: Option<&str>) -> Result<u64> {
        let request = WorkerRequest {
            worker_id: worker_id.map(str::to_string),
        };
        let response: TasksProcessedResponse = self
            .call("stats.tasks_processed.v1", rpc_params![request])
            .await?;
        Ok(response.count)
    }

    pub async fn worker_names(&self) -> Result<WorkerNames> {
        self.call("workers.names.v1", rpc_params![]).await
    }

    pub async fn worker_fps(&self, worker_id: impl Into<String>) -> Result<f64> {
        let request = WorkerRequest {
            worker_id: Some(worker_id.into()),
        };
        let response: WorkerFpsResponse =
            self.call("workers.fps.v1", rpc_params![request]).await?;
        Ok(response.fps)
    }

    pub async fn stats(&self) -> Result<StatsResponse> {
        self.call("admin.stats.v1", rpc_params![]).await
    }
}

/// Worker id unique to this process, prefixed with the host signature
/// so `local_only` dispatchers accept it.
pub fn generate_worker_id(host_signature: &str) -> String {
    format!("{}-{}", host_signature, uuid::Uuid::new_v4().simple())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_worker_id_contains_host() {
        let a = generate_worker_id("scope-pc");
        let b = generate_worker_id("scope-pc");
        assert!(a.starts_with("scope-pc-"));
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_connect_rejects_bad_url() {
        let err = LoftClient::connect("not a url").await.err().unwrap();
        assert!(matches!(err, SdkError::Connection(_)));
    }
}
