// Task Queue - per-queue lifecycle state machine
//
// OPEN -> IN_PROGRESS -> COMPLETED, with IN_PROGRESS -> OPEN on timeout.
// A task id lives in exactly one of the three buckets at any time.

pub mod policy;

pub use policy::PartitionHint;

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::domain::queue::duration_millis;
use crate::domain::{
    CompletedTask, DomainError, QueueEvent, QueueKind, QueueName, TaskId, TaskRecord, TaskResult,
    TaskState,
};
use crate::error::Result;

/// Counts for one queue at a point in time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueSnapshot {
    pub name: QueueName,
    pub kind: QueueKind,
    pub timeout_secs: u64,
    pub open: usize,
    pub in_progress: usize,
    pub completed: usize,
}

/// One named work queue
pub struct TaskQueue {
    name: QueueName,
    kind: QueueKind,
    timeout_ms: i64,

    open: VecDeque<TaskRecord>,
    in_progress: HashMap<TaskId, TaskRecord>,
    completed: VecDeque<CompletedTask>,

    /// Every id ever posted; ids are never reused within a queue's lifetime
    known_ids: HashSet<TaskId>,

    metadata: BTreeMap<String, serde_json::Value>,
    data: BTreeMap<String, serde_json::Value>,
    events: Vec<QueueEvent>,

    last_post_at: Option<i64>,
    released_at: Option<i64>,
    cleaned_up: bool,
}

impl TaskQueue {
    pub fn new(name: impl Into<String>, kind: QueueKind, timeout: Duration) -> Self {
        Self {
            name: name.into(),
            kind,
            timeout_ms: duration_millis(timeout),
            open: VecDeque::new(),
            in_progress: HashMap::new(),
            completed: VecDeque::new(),
            known_ids: HashSet::new(),
            metadata: BTreeMap::new(),
            data: BTreeMap::new(),
            events: Vec::new(),
            last_post_at: None,
            released_at: None,
            cleaned_up: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &QueueKind {
        &self.kind
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms.max(0) as u64)
    }

    // ------------------------------------------------------------------
    // Posting
    // ------------------------------------------------------------------

    pub fn post(&mut self, task: TaskRecord, now_millis: i64) -> Result<()> {
        self.post_many(vec![task], now_millis).map(|_| ())
    }

    /// Append tasks to the back of the open list.
    ///
    /// All-or-nothing: a duplicate id anywhere in the batch rejects the whole call.
    pub fn post_many(&mut self, tasks: Vec<TaskRecord>, now_millis: i64) -> Result<usize> {
        self.validate_new(&tasks)?;

        let added = tasks.len();
        for task in tasks {
            self.known_ids.insert(task.id.clone());
            self.open.push_back(task);
        }
        if added > 0 {
            self.last_post_at = Some(now_millis);
            // a release only covers tasks posted before it
            self.released_at = None;
        }

        debug!(
            queue = %self.name,
            added = added,
            open = self.open.len(),
            "Tasks posted"
        );
        Ok(added)
    }

    fn validate_new(&self, tasks: &[TaskRecord]) -> Result<()> {
        let mut batch_ids = HashSet::with_capacity(tasks.len());
        for task in tasks {
            if task.queue_id != self.name {
                return Err(DomainError::ValidationError(format!(
                    "task {} belongs to queue {}, not {}",
                    task.id, task.queue_id, self.name
                ))
                .into());
            }
            if task.state != TaskState::Open {
                return Err(DomainError::InvalidStateTransition {
                    from: task.state.to_string(),
                    to: TaskState::Open.to_string(),
                }
                .into());
            }
            if self.known_ids.contains(&task.id) || !batch_ids.insert(task.id.as_str()) {
                return Err(DomainError::DuplicateTaskId {
                    queue: self.name.clone(),
                    task_id: task.id.clone(),
                }
                .into());
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Dispatch
    // ------------------------------------------------------------------

    /// Open task count.
    ///
    /// With `exact == false` the queue reports how many tasks it is willing
    /// to hand out right now, which for batched queues excludes a held tail.
    pub fn count_open(&self, exact: bool, now_millis: i64) -> usize {
        if exact {
            self.open.len()
        } else {
            policy::grantable(&self.kind, self.open.len(), self.tail_released(now_millis))
        }
    }

    /// Hand one open task to `worker`
    pub fn take_one(
        &mut self,
        worker: &str,
        hint: PartitionHint,
        now_millis: i64,
    ) -> Result<Option<TaskRecord>> {
        if self.open.is_empty() {
            return Ok(None);
        }
        let offset = policy::take_offset(&self.kind, hint, self.open.len(), 1);
        let task = match self.open.remove(offset) {
            Some(task) => task,
            None => return Ok(None),
        };
        self.start(task, worker, now_millis).map(Some)
    }

    /// Hand a batch of open tasks to `worker`, sized by the queue kind and
    /// bounded by the throttled open count.
    pub fn take_many(
        &mut self,
        worker: &str,
        hint: PartitionHint,
        now_millis: i64,
    ) -> Result<Vec<TaskRecord>> {
        let grantable = self.count_open(false, now_millis);
        let n = policy::batch_len(&self.kind, grantable);
        if n == 0 {
            return Ok(Vec::new());
        }

        let offset = policy::take_offset(&self.kind, hint, grantable, n);
        let batch: Vec<TaskRecord> = self.open.drain(offset..offset + n).collect();

        let mut taken = Vec::with_capacity(batch.len());
        for task in batch {
            taken.push(self.start(task, worker, now_millis)?);
        }

        debug!(
            queue = %self.name,
            worker = %worker,
            taken = taken.len(),
            offset = offset,
            open = self.open.len(),
            "Tasks dispatched"
        );
        Ok(taken)
    }

    fn start(&mut self, mut task: TaskRecord, worker: &str, now_millis: i64) -> Result<TaskRecord> {
        task.dispatch(Some(worker.to_string()), now_millis)?;
        let handed_out = task.clone();
        self.in_progress.insert(task.id.clone(), task);
        Ok(handed_out)
    }

    // ------------------------------------------------------------------
    // Completion
    // ------------------------------------------------------------------

    /// Accept a result. Returns false when the task is not in progress
    /// (late, duplicate, or unknown) and the result was discarded.
    pub fn complete_one(&mut self, result: TaskResult, now_millis: i64) -> Result<bool> {
        let mut task = match self.in_progress.remove(&result.task_id) {
            Some(task) => task,
            None => {
                debug!(
                    queue = %self.name,
                    task_id = %result.task_id,
                    "Discarding result for task not in progress"
                );
                return Ok(false);
            }
        };

        let elapsed_ms = task
            .dispatched_at
            .map(|at| now_millis - at)
            .unwrap_or_default();
        task.complete(now_millis)?;

        self.completed.push_back(CompletedTask {
            task,
            output: result.output,
            elapsed_ms,
        });
        Ok(true)
    }

    /// Accept a batch of results; returns how many were not discarded
    pub fn complete_many(&mut self, results: Vec<TaskResult>, now_millis: i64) -> Result<usize> {
        let mut accepted = 0;
        for result in results {
            if self.complete_one(result, now_millis)? {
                accepted += 1;
            }
        }
        Ok(accepted)
    }

    /// Oldest completed task, if any
    pub fn pop_completed(&mut self) -> Option<CompletedTask> {
        self.completed.pop_front()
    }

    /// Return and clear every completed task
    pub fn drain_completed(&mut self) -> Vec<CompletedTask> {
        self.completed.drain(..).collect()
    }

    // ------------------------------------------------------------------
    // Timeouts
    // ------------------------------------------------------------------

    /// Move every expired in-progress task back to the front of the open list.
    ///
    /// Reclaimed tasks keep their original dispatch order among themselves.
    pub fn check_timeouts(&mut self, now_millis: i64) -> Result<usize> {
        let expired: Vec<TaskId> = self
            .in_progress
            .values()
            .filter(|task| task.is_expired(now_millis, self.timeout_ms))
            .map(|task| task.id.clone())
            .collect();
        if expired.is_empty() {
            return Ok(0);
        }

        let mut reclaimed: Vec<TaskRecord> = expired
            .iter()
            .filter_map(|id| self.in_progress.remove(id))
            .collect();
        reclaimed.sort_by_key(|task| task.dispatched_at);

        let mut workers = Vec::with_capacity(reclaimed.len());
        for task in reclaimed.iter_mut() {
            workers.push(task.assigned_worker.clone().unwrap_or_default());
            task.requeue()?;
        }

        let count = reclaimed.len();
        let ids: Vec<TaskId> = reclaimed.iter().map(|task| task.id.clone()).collect();
        for task in reclaimed.into_iter().rev() {
            self.open.push_front(task);
        }

        info!(
            queue = %self.name,
            requeued = count,
            workers = ?workers,
            "Requeued timed out tasks"
        );
        self.log_event(
            "timeout",
            serde_json::json!({ "requeued": ids }),
            now_millis,
        );
        Ok(count)
    }

    // ------------------------------------------------------------------
    // Reset / teardown
    // ------------------------------------------------------------------

    /// Discard every task in every bucket; the queue itself stays usable
    pub fn purge(&mut self, now_millis: i64) -> usize {
        let discarded = self.open.len() + self.in_progress.len() + self.completed.len();
        self.open.clear();
        self.in_progress.clear();
        self.completed.clear();
        self.released_at = None;

        info!(queue = %self.name, discarded = discarded, "Queue purged");
        self.log_event(
            "purge",
            serde_json::json!({ "discarded": discarded }),
            now_millis,
        );
        discarded
    }

    /// Release queue-owned resources ahead of removal. Idempotent.
    pub fn cleanup(&mut self) -> bool {
        if self.cleaned_up {
            return false;
        }
        self.open.clear();
        self.in_progress.clear();
        self.completed.clear();
        self.data.clear();
        self.cleaned_up = true;

        debug!(queue = %self.name, "Queue cleaned up");
        true
    }

    /// Make a held partial batch grantable. Returns how many tasks were held.
    pub fn release_tasks(&mut self, now_millis: i64) -> usize {
        let held = self.open.len() - self.count_open(false, now_millis);
        self.released_at = Some(now_millis);
        if held > 0 {
            info!(queue = %self.name, released = held, "Released held tasks");
        }
        held
    }

    fn tail_released(&self, now_millis: i64) -> bool {
        match (&self.kind, self.last_post_at) {
            (QueueKind::Fifo { .. }, _) => true,
            (QueueKind::Batched { .. }, None) => true,
            (QueueKind::Batched { linger_ms, .. }, Some(last_post)) => {
                now_millis - last_post >= *linger_ms
                    || self.released_at.is_some_and(|at| at >= last_post)
            }
        }
    }

    // ------------------------------------------------------------------
    // Metadata / data / events
    // ------------------------------------------------------------------

    pub fn get_metadata(&self, key: &str) -> Result<&serde_json::Value> {
        self.metadata.get(key).ok_or_else(|| {
            DomainError::MetadataKeyNotFound {
                queue: self.name.clone(),
                key: key.to_string(),
            }
            .into()
        })
    }

    pub fn set_metadata(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.metadata.insert(key.into(), value);
    }

    /// Merge `entries` into the metadata map
    pub fn set_metadata_entries(&mut self, entries: BTreeMap<String, serde_json::Value>) {
        self.metadata.extend(entries);
    }

    pub fn metadata_keys(&self) -> Vec<String> {
        self.metadata.keys().cloned().collect()
    }

    pub fn metadata(&self) -> &BTreeMap<String, serde_json::Value> {
        &self.metadata
    }

    pub fn get_data(&self, key: &str) -> Option<&serde_json::Value> {
        self.data.get(key)
    }

    pub fn set_data(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.data.insert(key.into(), value);
    }

    pub fn log_event(&mut self, name: impl Into<String>, detail: serde_json::Value, at: i64) {
        self.events.push(QueueEvent {
            at,
            name: name.into(),
            detail,
        });
    }

    pub fn events(&self) -> &[QueueEvent] {
        &self.events
    }

    // ------------------------------------------------------------------
    // Counts
    // ------------------------------------------------------------------

    pub fn in_progress_len(&self) -> usize {
        self.in_progress.len()
    }

    pub fn completed_len(&self) -> usize {
        self.completed.len()
    }

    pub fn snapshot(&self) -> QueueSnapshot {
        QueueSnapshot {
            name: self.name.clone(),
            kind: self.kind.clone(),
            timeout_secs: self.timeout().as_secs(),
            open: self.open.len(),
            in_progress: self.in_progress.len(),
            completed: self.completed.len(),
        }
    }

    /// Ids in each bucket, for invariant checks
    pub fn bucket_ids(&self) -> (Vec<TaskId>, Vec<TaskId>, Vec<TaskId>) {
        (
            self.open.iter().map(|t| t.id.clone()).collect(),
            self.in_progress.keys().cloned().collect(),
            self.completed.iter().map(|c| c.task.id.clone()).collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TaskPayload;
    use serde_json::json;

    const TIMEOUT: Duration = Duration::from_secs(10);

    fn task(id: &str) -> TaskRecord {
        TaskRecord::new(id, "A", TaskPayload::new(json!({ "id": id })), 0)
    }

    fn fifo_with(ids: &[&str]) -> TaskQueue {
        let mut queue = TaskQueue::new("A", QueueKind::fifo(), TIMEOUT);
        queue
            .post_many(ids.iter().map(|id| task(id)).collect(), 0)
            .unwrap();
        queue
    }

    fn assert_partitioned(queue: &TaskQueue) {
        let (open, in_progress, completed) = queue.bucket_ids();
        let mut all: Vec<TaskId> = open
            .iter()
            .chain(in_progress.iter())
            .chain(completed.iter())
            .cloned()
            .collect();
        let total = all.len();
        all.sort();
        all.dedup();
        assert_eq!(all.len(), total, "a task id appears in two buckets");
    }

    #[test]
    fn test_post_then_take_returns_that_task() {
        let mut queue = fifo_with(&["t1"]);
        let taken = queue.take_one("w1", PartitionHint::none(), 100).unwrap();
        assert_eq!(taken.unwrap().id, "t1");
        assert!(queue
            .take_one("w1", PartitionHint::none(), 100)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_fifo_order_and_partial_completion() {
        let mut queue = fifo_with(&["t1", "t2", "t3"]);
        let hint = PartitionHint::new(0, 1);

        let order: Vec<String> = (0..3)
            .map(|_| queue.take_one("w1", hint, 100).unwrap().unwrap().id)
            .collect();
        assert_eq!(order, vec!["t1", "t2", "t3"]);
        assert_eq!(queue.count_open(true, 100), 0);

        assert!(queue.complete_one(TaskResult::new("t2", "A", json!(2)), 200).unwrap());
        assert_eq!(queue.check_timeouts(300).unwrap(), 0);

        let (_, mut in_progress, completed) = queue.bucket_ids();
        in_progress.sort();
        assert_eq!(in_progress, vec!["t1", "t3"]);
        assert_eq!(completed, vec!["t2"]);
        assert_partitioned(&queue);
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let mut queue = fifo_with(&["t1"]);
        let err = queue.post(task("t1"), 0).unwrap_err();
        assert!(err.to_string().contains("Duplicate task id t1"));

        // duplicate inside a batch rejects the whole batch
        let err = queue.post_many(vec![task("t2"), task("t2")], 0).unwrap_err();
        assert!(err.to_string().contains("t2"));
        assert_eq!(queue.count_open(true, 0), 1);
    }

    #[test]
    fn test_ids_not_reused_after_completion() {
        let mut queue = fifo_with(&["t1"]);
        queue.take_one("w1", PartitionHint::none(), 0).unwrap();
        queue.complete_one(TaskResult::new("t1", "A", json!(null)), 1).unwrap();
        queue.drain_completed();

        assert!(queue.post(task("t1"), 2).is_err());
    }

    #[test]
    fn test_post_rejects_foreign_queue() {
        let mut queue = TaskQueue::new("A", QueueKind::fifo(), TIMEOUT);
        let foreign = TaskRecord::new("t1", "B", TaskPayload::new(json!(null)), 0);
        assert!(queue.post(foreign, 0).is_err());
    }

    #[test]
    fn test_timeout_requeues_exactly_once_at_front() {
        let mut queue = fifo_with(&["t1", "t2"]);
        let taken = queue.take_one("w1", PartitionHint::none(), 1_000).unwrap().unwrap();
        assert_eq!(taken.id, "t1");

        // not yet expired
        assert_eq!(queue.check_timeouts(11_000).unwrap(), 0);
        // expired
        assert_eq!(queue.check_timeouts(11_001).unwrap(), 1);
        // second sweep finds nothing more
        assert_eq!(queue.check_timeouts(20_000).unwrap(), 0);

        let (open, in_progress, _) = queue.bucket_ids();
        assert_eq!(open, vec!["t1", "t2"]);
        assert!(in_progress.is_empty());

        let again = queue.take_one("w2", PartitionHint::none(), 21_000).unwrap().unwrap();
        assert_eq!(again.id, "t1");
        assert_eq!(again.assigned_worker.as_deref(), Some("w2"));
        assert_eq!(again.attempts, 2);
        assert_eq!(queue.events().last().unwrap().name, "timeout");
    }

    #[test]
    fn test_reclaimed_tasks_keep_dispatch_order() {
        let mut queue = fifo_with(&["t1", "t2", "t3"]);
        queue.take_one("w1", PartitionHint::none(), 0).unwrap();
        queue.take_one("w1", PartitionHint::none(), 5).unwrap();

        assert_eq!(queue.check_timeouts(60_000).unwrap(), 2);
        let (open, _, _) = queue.bucket_ids();
        assert_eq!(open, vec!["t1", "t2", "t3"]);
    }

    #[test]
    fn test_late_and_duplicate_completion_discarded() {
        let mut queue = fifo_with(&["t1"]);
        queue.take_one("w1", PartitionHint::none(), 0).unwrap();

        let result = TaskResult::new("t1", "A", json!("done"));
        assert!(queue.complete_one(result.clone(), 5).unwrap());
        assert!(!queue.complete_one(result, 6).unwrap());
        assert_eq!(queue.completed_len(), 1);

        // unknown id
        assert!(!queue
            .complete_one(TaskResult::new("nope", "A", json!(null)), 7)
            .unwrap());
        assert_partitioned(&queue);
    }

    #[test]
    fn test_completion_after_timeout_is_discarded() {
        let mut queue = fifo_with(&["t1"]);
        queue.take_one("w1", PartitionHint::none(), 0).unwrap();
        queue.check_timeouts(60_000).unwrap();

        assert!(!queue
            .complete_one(TaskResult::new("t1", "A", json!(null)), 60_001)
            .unwrap());
        assert_eq!(queue.count_open(true, 60_001), 1);
        assert_eq!(queue.completed_len(), 0);
    }

    #[test]
    fn test_completed_records_elapsed() {
        let mut queue = fifo_with(&["t1", "t2"]);
        queue.take_many("w1", PartitionHint::none(), 1_000).unwrap();
        queue.take_many("w1", PartitionHint::none(), 1_000).unwrap();
        let accepted = queue
            .complete_many(
                vec![
                    TaskResult::new("t1", "A", json!(1)),
                    TaskResult::new("t2", "A", json!(2)),
                ],
                1_250,
            )
            .unwrap();
        assert_eq!(accepted, 2);

        let first = queue.pop_completed().unwrap();
        assert_eq!(first.task.id, "t1");
        assert_eq!(first.elapsed_ms, 250);
        assert_eq!(first.task.state, TaskState::Completed);

        let rest = queue.drain_completed();
        assert_eq!(rest.len(), 1);
        assert!(queue.drain_completed().is_empty());
    }

    #[test]
    fn test_fifo_take_many_respects_max_batch() {
        let mut queue = TaskQueue::new("A", QueueKind::Fifo { max_batch: 2 }, TIMEOUT);
        queue
            .post_many(vec![task("t1"), task("t2"), task("t3")], 0)
            .unwrap();

        let batch = queue.take_many("w1", PartitionHint::new(1, 2), 0).unwrap();
        let ids: Vec<_> = batch.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["t1", "t2"]);
        assert_eq!(queue.count_open(false, 0), 1);
    }

    #[test]
    fn test_batched_holds_tail_until_linger() {
        let mut queue = TaskQueue::new("A", QueueKind::batched(4, 1_000), TIMEOUT);
        let tasks = (0..6).map(|i| task(&format!("t{}", i))).collect();
        queue.post_many(tasks, 0).unwrap();

        assert_eq!(queue.count_open(true, 10), 6);
        assert_eq!(queue.count_open(false, 10), 4);

        let batch = queue.take_many("w1", PartitionHint::none(), 10).unwrap();
        assert_eq!(batch.len(), 4);

        // 2 remain, held back until the producer goes quiet
        assert_eq!(queue.count_open(false, 500), 0);
        assert!(queue.take_many("w1", PartitionHint::none(), 500).unwrap().is_empty());
        assert_eq!(queue.count_open(false, 1_000), 2);
        assert_eq!(queue.take_many("w1", PartitionHint::none(), 1_000).unwrap().len(), 2);
    }

    #[test]
    fn test_batched_release_tasks() {
        let mut queue = TaskQueue::new("A", QueueKind::batched(4, 60_000), TIMEOUT);
        queue
            .post_many(vec![task("t1"), task("t2"), task("t3")], 0)
            .unwrap();
        assert_eq!(queue.count_open(false, 10), 0);

        assert_eq!(queue.release_tasks(10), 3);
        assert_eq!(queue.count_open(false, 10), 3);

        // a later post holds the new tail again
        queue.post(task("t4"), 20).unwrap();
        assert_eq!(queue.count_open(false, 20), 4);
        queue.post(task("t5"), 30).unwrap();
        assert_eq!(queue.count_open(false, 30), 4);
    }

    #[test]
    fn test_post_in_release_millisecond_is_held() {
        let mut queue = TaskQueue::new("A", QueueKind::batched(4, 60_000), TIMEOUT);
        queue
            .post_many(vec![task("t1"), task("t2"), task("t3")], 0)
            .unwrap();
        assert_eq!(queue.release_tasks(10), 3);

        queue.post_many(vec![task("t4"), task("t5")], 10).unwrap();
        assert_eq!(queue.count_open(false, 10), 4);

        assert_eq!(queue.release_tasks(10), 1);
        assert_eq!(queue.count_open(false, 10), 5);
    }

    #[test]
    fn test_batched_partition_picks_worker_region() {
        let mut queue = TaskQueue::new("A", QueueKind::batched(2, 0), TIMEOUT);
        let tasks = (0..8).map(|i| task(&format!("t{}", i))).collect();
        queue.post_many(tasks, 0).unwrap();

        let batch = queue.take_many("w2", PartitionHint::new(1, 2), 0).unwrap();
        let ids: Vec<_> = batch.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["t4", "t5"]);

        let one = queue.take_one("w1", PartitionHint::new(0, 2), 0).unwrap().unwrap();
        assert_eq!(one.id, "t0");
        assert_partitioned(&queue);
    }

    #[test]
    fn test_fifo_release_is_noop() {
        let mut queue = fifo_with(&["t1"]);
        assert_eq!(queue.release_tasks(0), 0);
    }

    #[test]
    fn test_purge_clears_all_buckets() {
        let mut queue = fifo_with(&["t1", "t2", "t3"]);
        queue.take_one("w1", PartitionHint::none(), 0).unwrap();
        queue.take_one("w1", PartitionHint::none(), 0).unwrap();
        queue.complete_one(TaskResult::new("t1", "A", json!(null)), 1).unwrap();

        assert_eq!(queue.purge(2), 3);
        let snapshot = queue.snapshot();
        assert_eq!(
            (snapshot.open, snapshot.in_progress, snapshot.completed),
            (0, 0, 0)
        );

        // still usable after purge
        queue.post(task("t9"), 3).unwrap();
        assert_eq!(queue.count_open(true, 3), 1);
    }

    #[test]
    fn test_cleanup_idempotent() {
        let mut queue = fifo_with(&["t1"]);
        queue.set_data("frames", json!([1, 2, 3]));
        assert!(queue.cleanup());
        assert!(!queue.cleanup());
        assert!(queue.get_data("frames").is_none());
        assert_eq!(queue.count_open(true, 0), 0);
    }

    #[test]
    fn test_metadata_accessors() {
        let mut queue = TaskQueue::new("A", QueueKind::fifo(), TIMEOUT);
        assert!(queue.get_metadata("pixel_size").is_err());

        queue.set_metadata("pixel_size", json!(0.07));
        let mut bulk = BTreeMap::new();
        bulk.insert("camera".to_string(), json!("sCMOS"));
        bulk.insert("pixel_size".to_string(), json!(0.1));
        queue.set_metadata_entries(bulk);

        assert_eq!(queue.get_metadata("pixel_size").unwrap(), &json!(0.1));
        assert_eq!(queue.metadata_keys(), vec!["camera", "pixel_size"]);
        assert_eq!(queue.metadata().len(), 2);
    }

    #[test]
    fn test_events_append_only() {
        let mut queue = TaskQueue::new("A", QueueKind::fifo(), TIMEOUT);
        queue.log_event("acquisition_started", json!({"frames": 100}), 1);
        queue.log_event("acquisition_stopped", json!(null), 2);

        let names: Vec<_> = queue.events().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["acquisition_started", "acquisition_stopped"]);
    }
}
