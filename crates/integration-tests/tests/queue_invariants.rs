//! Queue state machine invariants under long random operation sequences

use std::collections::HashSet;
use std::time::Duration;

use loft_core::application::{PartitionHint, TaskQueue};
use loft_core::domain::{QueueKind, TaskPayload, TaskRecord, TaskResult};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::json;

const TIMEOUT: Duration = Duration::from_secs(5);
const STEPS: usize = 2_000;

/// Buckets must partition the live ids: no overlap, nothing missing
fn assert_partition(queue: &TaskQueue, live: &HashSet<String>, step: usize) {
    let (open, in_progress, completed) = queue.bucket_ids();
    let total = open.len() + in_progress.len() + completed.len();

    let seen: HashSet<String> = open
        .into_iter()
        .chain(in_progress)
        .chain(completed)
        .collect();
    assert_eq!(seen.len(), total, "step {}: id in more than one bucket", step);
    assert_eq!(&seen, live, "step {}: buckets differ from live ids", step);
}

fn run_random_ops(kind: QueueKind, seed: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut queue = TaskQueue::new("A", kind, TIMEOUT);
    let mut live: HashSet<String> = HashSet::new();
    let mut dispatched: Vec<String> = Vec::new();
    let mut now: i64 = 0;
    let mut next_id = 0;

    for step in 0..STEPS {
        now += rng.gen_range(0..400);
        let workers = rng.gen_range(1..4);
        let hint = PartitionHint::new(rng.gen_range(0..workers), workers);

        match rng.gen_range(0..100) {
            0..=29 => {
                let n = rng.gen_range(1..6);
                let tasks: Vec<TaskRecord> = (0..n)
                    .map(|_| {
                        next_id += 1;
                        let id = format!("t{}", next_id);
                        TaskRecord::new(id, "A", TaskPayload::new(json!(next_id)), now)
                    })
                    .collect();
                for task in &tasks {
                    live.insert(task.id.clone());
                }
                queue.post_many(tasks, now).unwrap();
            }
            30..=44 => {
                if let Some(task) = queue.take_one("w", hint, now).unwrap() {
                    dispatched.push(task.id);
                }
            }
            45..=59 => {
                let taken = queue.take_many("w", hint, now).unwrap();
                dispatched.extend(taken.into_iter().map(|t| t.id));
            }
            60..=79 => {
                // may be late, duplicate or already purged
                if !dispatched.is_empty() {
                    let id = dispatched[rng.gen_range(0..dispatched.len())].clone();
                    queue
                        .complete_one(TaskResult::new(id, "A", json!(null)), now)
                        .unwrap();
                }
            }
            80..=89 => {
                queue.check_timeouts(now).unwrap();
            }
            90..=96 => {
                if let Some(done) = queue.pop_completed() {
                    live.remove(&done.task.id);
                }
            }
            97 => {
                queue.release_tasks(now);
            }
            _ => {
                queue.purge(now);
                live.clear();
                dispatched.clear();
            }
        }

        assert_partition(&queue, &live, step);
        assert!(queue.count_open(false, now) <= queue.count_open(true, now));
    }
}

#[test]
fn test_fifo_partition_holds() {
    for seed in 0..8 {
        run_random_ops(QueueKind::fifo(), seed);
    }
}

#[test]
fn test_fifo_multi_partition_holds() {
    for seed in 0..8 {
        run_random_ops(QueueKind::Fifo { max_batch: 4 }, seed);
    }
}

#[test]
fn test_batched_partition_holds() {
    for seed in 0..8 {
        run_random_ops(QueueKind::batched(4, 1_000), seed);
    }
}

#[test]
fn test_timeout_requeues_exactly_once() {
    let mut queue = TaskQueue::new("A", QueueKind::fifo(), TIMEOUT);
    queue
        .post(TaskRecord::new("t1", "A", TaskPayload::new(json!(1)), 0), 0)
        .unwrap();
    queue.take_one("w1", PartitionHint::none(), 0).unwrap().unwrap();

    assert_eq!(queue.check_timeouts(5_001).unwrap(), 1);
    assert_eq!(queue.check_timeouts(5_002).unwrap(), 0);
    assert_eq!(queue.check_timeouts(99_999).unwrap(), 0);

    let (open, in_progress, _) = queue.bucket_ids();
    assert_eq!(open, vec!["t1"]);
    assert!(in_progress.is_empty());

    let again = queue
        .take_one("w2", PartitionHint::none(), 6_000)
        .unwrap()
        .unwrap();
    assert_eq!(again.attempts, 2);
}
