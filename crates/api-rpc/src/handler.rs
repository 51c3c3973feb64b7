//! RPC Method Handlers
//!
//! Thin adapters from request types to `QueueSet` calls.

use std::sync::Arc;
use std::time::{Duration, Instant};

use jsonrpsee::types::ErrorObjectOwned;
use loft_core::application::QueueSet;
use loft_core::domain::TaskSpec;
use tracing::debug;

use crate::error::to_rpc_error;
use crate::types::{
    AckResponse, CompletedTaskResponse, CountRequest, CountResponse, CreateQueueRequest,
    CreateQueueResponse, DataResponse, EventsResponse, GetTaskResponse, GetTasksResponse,
    KeyRequest, KeysResponse, LogEventRequest, MetadataResponse, PostTaskRequest,
    PostTaskResponse, PostTasksRequest, PostTasksResponse, PullRequest, PurgeResponse,
    QueueNamesResponse, QueueRequest, ReleaseResponse, RemoveQueueResponse, ReturnResponse,
    ReturnTaskRequest, ReturnTasksRequest, SetEntriesRequest, SetValueRequest, StatsResponse,
    TasksProcessedRequest, TasksProcessedResponse, WorkerFpsRequest, WorkerFpsResponse,
    WorkerNamesResponse,
};

type RpcResult<T> = Result<T, ErrorObjectOwned>;

/// RPC Handler with injected dependencies
pub struct RpcHandler {
    queues: Arc<QueueSet>,
    start_time: Instant,
}

impl RpcHandler {
    pub fn new(queues: Arc<QueueSet>) -> Self {
        Self {
            queues,
            start_time: Instant::now(),
        }
    }

    /// queue.post_task.v1
    pub async fn post_task(&self, params: PostTaskRequest) -> RpcResult<PostTaskResponse> {
        let spec = TaskSpec {
            id: params.task_id,
            payload: params.payload,
        };
        let task_id = self
            .queues
            .post_task(&params.queue, spec)
            .map_err(to_rpc_error)?;

        Ok(PostTaskResponse {
            queue: params.queue,
            task_id,
        })
    }

    /// queue.post_tasks.v1
    pub async fn post_tasks(&self, params: PostTasksRequest) -> RpcResult<PostTasksResponse> {
        let task_ids = self
            .queues
            .post_tasks(&params.queue, params.tasks)
            .map_err(to_rpc_error)?;

        Ok(PostTasksResponse {
            queue: params.queue,
            task_ids,
        })
    }

    /// worker.get_task.v1 (blocks until a task is available)
    pub async fn get_task(&self, params: PullRequest) -> RpcResult<GetTaskResponse> {
        let task = self
            .queues
            .pull_one(&params.worker_id, params.worker_version.as_deref())
            .await
            .map_err(to_rpc_error)?;

        Ok(GetTaskResponse { task })
    }

    /// worker.get_tasks.v1
    pub async fn get_tasks(&self, params: PullRequest) -> RpcResult<GetTasksResponse> {
        let tasks = self
            .queues
            .pull_many(&params.worker_id, params.worker_version.as_deref())
            .map_err(to_rpc_error)?;

        Ok(GetTasksResponse { tasks })
    }

    /// worker.return_completed_task.v1
    pub async fn return_completed_task(
        &self,
        params: ReturnTaskRequest,
    ) -> RpcResult<ReturnResponse> {
        let accepted = self
            .queues
            .report_one(params.result, &params.worker_id, params.time_taken)
            .map_err(to_rpc_error)?;

        Ok(ReturnResponse { accepted })
    }

    /// worker.return_completed_tasks.v1
    pub async fn return_completed_tasks(
        &self,
        params: ReturnTasksRequest,
    ) -> RpcResult<ReturnResponse> {
        let accepted = self
            .queues
            .report_many(params.results, &params.worker_id, params.time_taken)
            .map_err(to_rpc_error)?;

        Ok(ReturnResponse { accepted })
    }

    /// queue.get_completed_task.v1
    pub async fn get_completed_task(
        &self,
        params: QueueRequest,
    ) -> RpcResult<CompletedTaskResponse> {
        Ok(CompletedTaskResponse {
            completed: self.queues.get_completed_task(&params.queue),
        })
    }

    /// queue.create.v1
    pub async fn create_queue(
        &self,
        params: CreateQueueRequest,
    ) -> RpcResult<CreateQueueResponse> {
        let timeout = params.timeout_secs.map(Duration::from_secs);
        self.queues
            .create_queue(&params.queue, params.kind, timeout)
            .map_err(to_rpc_error)?;

        Ok(CreateQueueResponse {
            queue: params.queue,
            created: true,
        })
    }

    /// queue.remove.v1
    pub async fn remove_queue(&self, params: QueueRequest) -> RpcResult<RemoveQueueResponse> {
        self.queues
            .remove_queue(&params.queue)
            .map_err(to_rpc_error)?;

        Ok(RemoveQueueResponse {
            queue: params.queue,
            removed: true,
        })
    }

    /// queue.purge.v1
    pub async fn purge(&self, params: QueueRequest) -> RpcResult<PurgeResponse> {
        let discarded = self.queues.purge(&params.queue).map_err(to_rpc_error)?;

        Ok(PurgeResponse {
            queue: params.queue,
            discarded,
        })
    }

    /// queue.release_tasks.v1
    pub async fn release_tasks(&self, params: QueueRequest) -> RpcResult<ReleaseResponse> {
        let released = self
            .queues
            .release_tasks(&params.queue)
            .map_err(to_rpc_error)?;

        Ok(ReleaseResponse {
            queue: params.queue,
            released,
        })
    }

    /// queue.names.v1
    pub async fn queue_names(&self) -> RpcResult<QueueNamesResponse> {
        Ok(QueueNamesResponse {
            queues: self.queues.queue_names(),
        })
    }

    /// queue.get_data.v1
    pub async fn get_data(&self, params: KeyRequest) -> RpcResult<DataResponse> {
        let value = self
            .queues
            .get_queue_data(&params.queue, &params.key)
            .map_err(to_rpc_error)?;

        Ok(DataResponse {
            key: params.key,
            value,
        })
    }

    /// queue.set_data.v1
    pub async fn set_data(&self, params: SetValueRequest) -> RpcResult<AckResponse> {
        self.queues
            .set_queue_data(&params.queue, params.key, params.value)
            .map_err(to_rpc_error)?;
        Ok(AckResponse { ok: true })
    }

    /// queue.get_metadata.v1
    pub async fn get_metadata(&self, params: KeyRequest) -> RpcResult<MetadataResponse> {
        let value = self
            .queues
            .get_queue_metadata(&params.queue, &params.key)
            .map_err(to_rpc_error)?;

        Ok(MetadataResponse {
            key: params.key,
            value,
        })
    }

    /// queue.set_metadata.v1
    pub async fn set_metadata(&self, params: SetValueRequest) -> RpcResult<AckResponse> {
        self.queues
            .set_queue_metadata(&params.queue, params.key, params.value)
            .map_err(to_rpc_error)?;
        Ok(AckResponse { ok: true })
    }

    /// queue.set_metadata_entries.v1
    pub async fn set_metadata_entries(
        &self,
        params: SetEntriesRequest,
    ) -> RpcResult<AckResponse> {
        self.queues
            .set_queue_metadata_entries(&params.queue, params.entries)
            .map_err(to_rpc_error)?;
        Ok(AckResponse { ok: true })
    }

    /// queue.metadata_keys.v1
    pub async fn metadata_keys(&self, params: QueueRequest) -> RpcResult<KeysResponse> {
        let keys = self
            .queues
            .get_queue_metadata_keys(&params.queue)
            .map_err(to_rpc_error)?;
        Ok(KeysResponse { keys })
    }

    /// queue.log_event.v1
    pub async fn log_event(&self, params: LogEventRequest) -> RpcResult<AckResponse> {
        self.queues
            .log_queue_event(&params.queue, params.event, params.detail)
            .map_err(to_rpc_error)?;
        Ok(AckResponse { ok: true })
    }

    /// queue.events.v1
    pub async fn events(&self, params: QueueRequest) -> RpcResult<EventsResponse> {
        let events = self
            .queues
            .queue_events(&params.queue)
            .map_err(to_rpc_error)?;
        Ok(EventsResponse { events })
    }

    /// stats.open_tasks.v1
    pub async fn open_tasks(&self, params: CountRequest) -> RpcResult<CountResponse> {
        let count = self
            .queues
            .open_count(params.queue.as_deref(), params.exact)
            .map_err(to_rpc_error)?;
        Ok(CountResponse { count })
    }

    /// stats.tasks_in_progress.v1
    pub async fn tasks_in_progress(&self, params: CountRequest) -> RpcResult<CountResponse> {
        let count = self
            .queues
            .in_progress_count(params.queue.as_deref())
            .map_err(to_rpc_error)?;
        Ok(CountResponse { count })
    }

    /// stats.tasks_completed.v1
    pub async fn tasks_completed(&self, params: CountRequest) -> RpcResult<CountResponse> {
        let count = self
            .queues
            .completed_count(params.queue.as_deref())
            .map_err(to_rpc_error)?;
        Ok(CountResponse { count })
    }

    /// stats.tasks_processed.v1
    pub async fn tasks_processed(
        &self,
        params: TasksProcessedRequest,
    ) -> RpcResult<TasksProcessedResponse> {
        Ok(TasksProcessedResponse {
            count: self.queues.tasks_processed(params.worker_id.as_deref()),
        })
    }

    /// workers.names.v1
    pub async fn worker_names(&self) -> RpcResult<WorkerNamesResponse> {
        Ok(WorkerNamesResponse {
            workers: self.queues.worker_names(),
            active: self.queues.active_workers(),
        })
    }

    /// workers.fps.v1
    pub async fn worker_fps(&self, params: WorkerFpsRequest) -> RpcResult<WorkerFpsResponse> {
        let fps = self.queues.worker_throughput(&params.worker_id);
        debug!(worker = %params.worker_id, fps = fps, "Worker throughput queried");

        Ok(WorkerFpsResponse {
            worker_id: params.worker_id,
            fps,
        })
    }

    /// admin.stats.v1
    pub async fn stats(&self) -> RpcResult<StatsResponse> {
        Ok(StatsResponse {
            stats: self.queues.stats(),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        })
    }
}
