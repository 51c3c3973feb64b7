// Queue Set - multi-queue dispatcher
//
// Lock order: `dispatch` -> `queues` -> individual queue.
// A queue lock is never held while taking `dispatch`.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::application::admission::AdmissionGate;
use crate::application::config::DispatcherConfig;
use crate::application::liveness::LivenessTracker;
use crate::application::queue::{QueueSnapshot, TaskQueue};
use crate::domain::queue::{validate_queue_name, validate_timeout};
use crate::domain::{
    CompletedTask, DomainError, QueueEvent, QueueKind, QueueName, TaskId, TaskPayload, TaskRecord,
    TaskResult, TaskSpec, WorkerId, WorkerStats,
};
use crate::error::Result;
use crate::port::{IdProvider, TimeProvider};

type SharedQueue = Arc<Mutex<TaskQueue>>;

/// Outcome of one timeout sweep
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SweepReport {
    pub requeued: usize,
    pub evicted: Vec<WorkerId>,
}

/// Aggregate view across all queues
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatcherStats {
    pub queues: Vec<QueueSnapshot>,
    pub open: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub tasks_processed: u64,
    pub active_workers: Vec<WorkerId>,
}

/// Coordinator owning every queue, the worker roster and the admission gate
pub struct QueueSet {
    queues: RwLock<HashMap<QueueName, SharedQueue>>,
    /// Coordinator-wide critical section: queue selection + take, roster updates
    dispatch: Mutex<LivenessTracker>,
    gate: AdmissionGate,
    total_completed: AtomicU64,
    default_timeout: Duration,
    poll_interval: Duration,
    time_provider: Arc<dyn TimeProvider>,
    id_provider: Arc<dyn IdProvider>,
}

impl QueueSet {
    /// Create a queue set
    ///
    /// # Arguments
    /// * `config` - Admission, timeout and polling settings
    /// * `time_provider` - Clock for dispatch / timeout / liveness timestamps
    /// * `id_provider` - Id source for tasks posted without an id
    pub fn new(
        config: &DispatcherConfig,
        time_provider: Arc<dyn TimeProvider>,
        id_provider: Arc<dyn IdProvider>,
    ) -> Self {
        Self {
            queues: RwLock::new(HashMap::new()),
            dispatch: Mutex::new(LivenessTracker::new(config.liveness_threshold)),
            gate: AdmissionGate::new(
                config.expected_version.clone(),
                config.local_only,
                config.host_signature.clone(),
            ),
            total_completed: AtomicU64::new(0),
            default_timeout: config.default_task_timeout,
            poll_interval: config.poll_interval,
            time_provider,
            id_provider,
        }
    }

    // ------------------------------------------------------------------
    // Queue lifecycle
    // ------------------------------------------------------------------

    /// Create a queue explicitly. Fails if the name is taken.
    pub fn create_queue(
        &self,
        name: &str,
        kind: QueueKind,
        timeout: Option<Duration>,
    ) -> Result<()> {
        validate_queue_name(name)?;
        kind.validate()?;

        let mut queues = write(&self.queues);
        if queues.contains_key(name) {
            return Err(DomainError::QueueAlreadyExists(name.to_string()).into());
        }

        let timeout = timeout.unwrap_or(self.default_timeout);
        validate_timeout(timeout)?;
        info!(
            queue = %name,
            kind = kind.type_name(),
            timeout_secs = timeout.as_secs(),
            "Queue created"
        );
        queues.insert(
            name.to_string(),
            Arc::new(Mutex::new(TaskQueue::new(name, kind, timeout))),
        );
        Ok(())
    }

    /// Run the queue's cleanup hook, then discard it
    pub fn remove_queue(&self, name: &str) -> Result<()> {
        let mut queues = write(&self.queues);
        let queue = queues
            .get(name)
            .cloned()
            .ok_or_else(|| DomainError::QueueNotFound(name.to_string()))?;

        lock(&queue).cleanup();
        queues.remove(name);

        info!(queue = %name, "Queue removed");
        Ok(())
    }

    /// Hard-reset a queue's tasks without destroying it
    pub fn purge(&self, name: &str) -> Result<usize> {
        let queue = self.queue(name)?;
        let now = self.time_provider.now_millis();
        let discarded = lock(&queue).purge(now);
        Ok(discarded)
    }

    pub fn queue_names(&self) -> Vec<QueueName> {
        let mut names: Vec<QueueName> = read(&self.queues).keys().cloned().collect();
        names.sort();
        names
    }

    /// Clean up and drop every queue (coordinator teardown)
    pub fn shutdown(&self) {
        let mut queues = write(&self.queues);
        for queue in queues.values() {
            lock(queue).cleanup();
        }
        let removed = queues.len();
        queues.clear();
        info!(queues = removed, "Queue set shut down");
    }

    fn queue(&self, name: &str) -> Result<SharedQueue> {
        read(&self.queues)
            .get(name)
            .cloned()
            .ok_or_else(|| DomainError::QueueNotFound(name.to_string()).into())
    }

    fn queue_or_create(&self, name: &str) -> Result<SharedQueue> {
        if let Some(queue) = read(&self.queues).get(name) {
            return Ok(queue.clone());
        }
        validate_queue_name(name)?;

        let mut queues = write(&self.queues);
        let queue = queues.entry(name.to_string()).or_insert_with(|| {
            info!(queue = %name, "Queue created on first post");
            Arc::new(Mutex::new(TaskQueue::new(
                name,
                QueueKind::default(),
                self.default_timeout,
            )))
        });
        Ok(queue.clone())
    }

    fn all_queues(&self) -> Vec<SharedQueue> {
        read(&self.queues).values().cloned().collect()
    }

    // ------------------------------------------------------------------
    // Producers
    // ------------------------------------------------------------------

    /// Post one task, creating the queue on first reference
    pub fn post_task(&self, queue_name: &str, spec: TaskSpec) -> Result<TaskId> {
        let mut ids = self.post_tasks(queue_name, vec![spec])?;
        ids.pop()
            .ok_or_else(|| crate::error::AppError::Internal("post returned no id".to_string()))
    }

    /// Post tasks in order, creating the queue on first reference.
    ///
    /// Returns the ids assigned, in posting order.
    pub fn post_tasks(&self, queue_name: &str, specs: Vec<TaskSpec>) -> Result<Vec<TaskId>> {
        let queue = self.queue_or_create(queue_name)?;
        let now = self.time_provider.now_millis();

        let records: Vec<TaskRecord> = specs
            .into_iter()
            .map(|spec| {
                let id = spec
                    .id
                    .unwrap_or_else(|| self.id_provider.generate_id());
                TaskRecord::new(id, queue_name, TaskPayload::new(spec.payload), now)
            })
            .collect();
        let ids = records.iter().map(|task| task.id.clone()).collect();

        lock(&queue).post_many(records, now)?;
        Ok(ids)
    }

    // ------------------------------------------------------------------
    // Workers: pull
    // ------------------------------------------------------------------

    /// Blocking pull of a single task.
    ///
    /// Re-checks every `poll_interval` until some queue has open work.
    /// Returns None only when the worker is refused admission.
    pub async fn pull_one(
        &self,
        worker_id: &str,
        worker_version: Option<&str>,
    ) -> Result<Option<TaskRecord>> {
        if !self.gate.admit(worker_id, worker_version) {
            return Ok(None);
        }

        loop {
            if let Some(mut tasks) = self.dispatch_once(worker_id, true)? {
                if let Some(task) = tasks.pop() {
                    return Ok(Some(task));
                }
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    /// Non-blocking batch pull; empty when nothing is grantable or refused
    pub fn pull_many(
        &self,
        worker_id: &str,
        worker_version: Option<&str>,
    ) -> Result<Vec<TaskRecord>> {
        if !self.gate.admit(worker_id, worker_version) {
            return Ok(Vec::new());
        }
        Ok(self.dispatch_once(worker_id, false)?.unwrap_or_default())
    }

    /// One pass of queue selection + take under the dispatch lock.
    ///
    /// `exact` selects among queues with any open task and takes one;
    /// otherwise selects among queues with grantable tasks and takes a batch.
    ///
    /// A blocking (`exact`) puller joins the roster on every pass. A batch
    /// puller joins only when some queue has grantable work.
    fn dispatch_once(&self, worker_id: &str, exact: bool) -> Result<Option<Vec<TaskRecord>>> {
        let mut roster = lock(&self.dispatch);
        let now = self.time_provider.now_millis();

        let candidates: Vec<SharedQueue> = self
            .all_queues()
            .into_iter()
            .filter(|queue| lock(queue).count_open(exact, now) > 0)
            .collect();
        if candidates.is_empty() {
            if exact {
                roster.touch(worker_id, now);
            }
            return Ok(None);
        }
        let hint = roster.touch(worker_id, now);

        let pick = rand::thread_rng().gen_range(0..candidates.len());
        let mut queue = lock(&candidates[pick]);
        let tasks = if exact {
            queue
                .take_one(worker_id, hint, now)?
                .into_iter()
                .collect::<Vec<_>>()
        } else {
            queue.take_many(worker_id, hint, now)?
        };

        debug!(
            queue = %queue.name(),
            worker = %worker_id,
            taken = tasks.len(),
            candidates = candidates.len(),
            "Dispatched from queue"
        );
        Ok(Some(tasks))
    }

    // ------------------------------------------------------------------
    // Workers: report
    // ------------------------------------------------------------------

    /// Report one result. `time_taken` is seconds for this task.
    pub fn report_one(
        &self,
        result: TaskResult,
        worker_id: &str,
        time_taken: Option<f64>,
    ) -> Result<usize> {
        self.report_many(vec![result], worker_id, time_taken)
    }

    /// Report a batch of results. `time_taken` is seconds for the whole batch.
    ///
    /// Results for tasks no longer in progress are discarded silently.
    /// Returns the number of results accepted.
    pub fn report_many(
        &self,
        results: Vec<TaskResult>,
        worker_id: &str,
        time_taken: Option<f64>,
    ) -> Result<usize> {
        if results.is_empty() {
            return Ok(0);
        }
        let reported = results.len();

        let mut by_queue: BTreeMap<QueueName, Vec<TaskResult>> = BTreeMap::new();
        for result in results {
            by_queue.entry(result.queue_id.clone()).or_default().push(result);
        }
        // resolve every queue before mutating any of them
        let routed = by_queue
            .into_iter()
            .map(|(name, results)| self.queue(&name).map(|queue| (queue, results)))
            .collect::<Result<Vec<_>>>()?;

        let now = self.time_provider.now_millis();
        let mut accepted = 0;
        for (queue, results) in routed {
            accepted += lock(&queue).complete_many(results, now)?;
        }

        self.total_completed
            .fetch_add(accepted as u64, Ordering::SeqCst);
        let seconds_per_task = time_taken.map(|secs| secs / reported as f64);
        lock(&self.dispatch).record_completion(worker_id, accepted as u64, seconds_per_task, now);

        debug!(
            worker = %worker_id,
            reported = reported,
            accepted = accepted,
            "Results reported"
        );
        Ok(accepted)
    }

    // ------------------------------------------------------------------
    // Result consumers
    // ------------------------------------------------------------------

    /// Oldest completed task of a queue; None for unknown or empty queues
    pub fn get_completed_task(&self, queue_name: &str) -> Option<CompletedTask> {
        let queue = self.queue(queue_name).ok()?;
        // bound so the guard drops before `queue`
        let completed = lock(&queue).pop_completed();
        completed
    }

    pub fn drain_completed(&self, queue_name: &str) -> Result<Vec<CompletedTask>> {
        let queue = self.queue(queue_name)?;
        let drained = lock(&queue).drain_completed();
        Ok(drained)
    }

    // ------------------------------------------------------------------
    // Timeouts + liveness
    // ------------------------------------------------------------------

    /// Requeue expired tasks in every queue, then evict stale workers
    pub fn check_timeouts(&self) -> Result<SweepReport> {
        let now = self.time_provider.now_millis();

        let mut requeued = 0;
        for queue in self.all_queues() {
            requeued += lock(&queue).check_timeouts(now)?;
        }

        let evicted = lock(&self.dispatch).evict_stale(now);
        Ok(SweepReport { requeued, evicted })
    }

    // ------------------------------------------------------------------
    // Aggregate accessors
    // ------------------------------------------------------------------

    pub fn open_count(&self, queue_name: Option<&str>, exact: bool) -> Result<usize> {
        let now = self.time_provider.now_millis();
        self.sum_over(queue_name, |queue| queue.count_open(exact, now))
    }

    pub fn in_progress_count(&self, queue_name: Option<&str>) -> Result<usize> {
        self.sum_over(queue_name, TaskQueue::in_progress_len)
    }

    pub fn completed_count(&self, queue_name: Option<&str>) -> Result<usize> {
        self.sum_over(queue_name, TaskQueue::completed_len)
    }

    fn sum_over<F>(&self, queue_name: Option<&str>, count: F) -> Result<usize>
    where
        F: Fn(&TaskQueue) -> usize,
    {
        match queue_name {
            Some(name) => {
                let queue = self.queue(name)?;
                let n = count(&*lock(&queue));
                Ok(n)
            }
            None => Ok(self
                .all_queues()
                .iter()
                .map(|queue| count(&*lock(queue)))
                .sum()),
        }
    }

    /// Accepted completions overall, or for one worker (0 if never seen)
    pub fn tasks_processed(&self, worker_id: Option<&str>) -> u64 {
        match worker_id {
            Some(worker) => lock(&self.dispatch).tasks_processed(worker),
            None => self.total_completed.load(Ordering::SeqCst),
        }
    }

    pub fn active_workers(&self) -> Vec<WorkerId> {
        lock(&self.dispatch).active_workers().to_vec()
    }

    pub fn worker_names(&self) -> Vec<WorkerId> {
        lock(&self.dispatch).worker_names()
    }

    pub fn worker_stats(&self, worker_id: &str) -> Option<WorkerStats> {
        lock(&self.dispatch).stats(worker_id).cloned()
    }

    /// Tasks per second for an active worker
    pub fn worker_throughput(&self, worker_id: &str) -> f64 {
        lock(&self.dispatch).throughput(worker_id)
    }

    pub fn stats(&self) -> DispatcherStats {
        let active_workers = self.active_workers();
        let mut queues: Vec<QueueSnapshot> = self
            .all_queues()
            .iter()
            .map(|queue| lock(queue).snapshot())
            .collect();
        queues.sort_by(|a, b| a.name.cmp(&b.name));

        DispatcherStats {
            open: queues.iter().map(|q| q.open).sum(),
            in_progress: queues.iter().map(|q| q.in_progress).sum(),
            completed: queues.iter().map(|q| q.completed).sum(),
            tasks_processed: self.tasks_processed(None),
            active_workers,
            queues,
        }
    }

    // ------------------------------------------------------------------
    // Queue data / metadata / events
    // ------------------------------------------------------------------

    pub fn get_queue_data(&self, queue_name: &str, key: &str) -> Result<Option<serde_json::Value>> {
        let queue = self.queue(queue_name)?;
        let value = lock(&queue).get_data(key).cloned();
        Ok(value)
    }

    pub fn set_queue_data(
        &self,
        queue_name: &str,
        key: impl Into<String>,
        value: serde_json::Value,
    ) -> Result<()> {
        let queue = self.queue(queue_name)?;
        lock(&queue).set_data(key, value);
        Ok(())
    }

    pub fn get_queue_metadata(&self, queue_name: &str, key: &str) -> Result<serde_json::Value> {
        let queue = self.queue(queue_name)?;
        // bound so the guard drops before `queue`
        let value = lock(&queue).get_metadata(key).cloned();
        value
    }

    pub fn set_queue_metadata(
        &self,
        queue_name: &str,
        key: impl Into<String>,
        value: serde_json::Value,
    ) -> Result<()> {
        let queue = self.queue(queue_name)?;
        lock(&queue).set_metadata(key, value);
        Ok(())
    }

    pub fn set_queue_metadata_entries(
        &self,
        queue_name: &str,
        entries: BTreeMap<String, serde_json::Value>,
    ) -> Result<()> {
        let queue = self.queue(queue_name)?;
        lock(&queue).set_metadata_entries(entries);
        Ok(())
    }

    pub fn get_queue_metadata_keys(&self, queue_name: &str) -> Result<Vec<String>> {
        let queue = self.queue(queue_name)?;
        let keys = lock(&queue).metadata_keys();
        Ok(keys)
    }

    pub fn log_queue_event(
        &self,
        queue_name: &str,
        event: impl Into<String>,
        detail: serde_json::Value,
    ) -> Result<()> {
        let queue = self.queue(queue_name)?;
        let now = self.time_provider.now_millis();
        lock(&queue).log_event(event, detail, now);
        Ok(())
    }

    pub fn queue_events(&self, queue_name: &str) -> Result<Vec<QueueEvent>> {
        let queue = self.queue(queue_name)?;
        let events = lock(&queue).events().to_vec();
        Ok(events)
    }

    /// Release a batched queue's held tail; returns how many tasks were held
    pub fn release_tasks(&self, queue_name: &str) -> Result<usize> {
        let queue = self.queue(queue_name)?;
        let now = self.time_provider.now_millis();
        let released = lock(&queue).release_tasks(now);
        Ok(released)
    }
}

// Poisoning is recovered: every critical section leaves its data consistent
// before any fallible step.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}
