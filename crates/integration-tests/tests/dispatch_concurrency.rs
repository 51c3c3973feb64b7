//! Concurrent pulls through the queue set

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use loft_core::application::{DispatcherConfig, QueueSet};
use loft_core::domain::{TaskResult, TaskSpec};
use loft_core::port::id_provider::UuidProvider;
use loft_core::port::time_provider::SystemTimeProvider;
use serde_json::json;
use tokio::task::JoinSet;

const VERSION: &str = loft_core::VERSION;

fn queue_set() -> Arc<QueueSet> {
    let config = DispatcherConfig {
        poll_interval: Duration::from_millis(1),
        ..Default::default()
    };
    Arc::new(QueueSet::new(
        &config,
        Arc::new(SystemTimeProvider),
        Arc::new(UuidProvider),
    ))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_two_workers_two_queues_each_task_once() {
    let queues = queue_set();
    queues
        .post_task("A", TaskSpec::with_id("a1", json!(null)))
        .unwrap();
    queues
        .post_task("B", TaskSpec::with_id("b1", json!(null)))
        .unwrap();

    let mut pulls = JoinSet::new();
    for worker in ["w1", "w2"] {
        let queues = queues.clone();
        pulls.spawn(async move { queues.pull_one(worker, Some(VERSION)).await });
    }

    let mut delivered = Vec::new();
    while let Some(joined) = pulls.join_next().await {
        let task = joined.unwrap().unwrap().expect("admitted worker gets a task");
        delivered.push(task.id);
    }
    delivered.sort();
    assert_eq!(delivered, vec!["a1", "b1"]);
    assert_eq!(queues.open_count(None, true).unwrap(), 0);
    assert_eq!(queues.in_progress_count(None).unwrap(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_many_workers_drain_without_duplicates() {
    let queues = queue_set();
    let mut posted = HashSet::new();
    for queue in ["A", "B", "C"] {
        let specs: Vec<TaskSpec> = (0..100)
            .map(|i| TaskSpec::with_id(format!("{}-{}", queue, i), json!(i)))
            .collect();
        posted.extend(queues.post_tasks(queue, specs).unwrap());
    }

    let mut workers = JoinSet::new();
    for n in 0..8 {
        let queues = queues.clone();
        workers.spawn(async move {
            let worker = format!("w{}", n);
            let mut seen = Vec::new();
            loop {
                let batch = queues.pull_many(&worker, Some(VERSION)).unwrap();
                if batch.is_empty() {
                    break;
                }
                let results: Vec<TaskResult> = batch.iter().map(TaskResult::for_task).collect();
                seen.extend(batch.into_iter().map(|t| t.id));
                queues.report_many(results, &worker, Some(0.01)).unwrap();
                tokio::task::yield_now().await;
            }
            seen
        });
    }

    let mut delivered = Vec::new();
    while let Some(joined) = workers.join_next().await {
        delivered.extend(joined.unwrap());
    }

    let unique: HashSet<String> = delivered.iter().cloned().collect();
    assert_eq!(unique.len(), delivered.len(), "a task was delivered twice");
    assert_eq!(unique, posted);
    assert_eq!(queues.tasks_processed(None), 300);
    assert_eq!(queues.completed_count(None).unwrap(), 300);

    let per_worker: u64 = queues
        .worker_names()
        .iter()
        .map(|w| queues.tasks_processed(Some(w)))
        .sum();
    assert_eq!(per_worker, 300);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_blocked_pull_wakes_on_post() {
    let queues = queue_set();

    let waiting = {
        let queues = queues.clone();
        tokio::spawn(async move { queues.pull_one("w1", Some(VERSION)).await })
    };
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert!(!waiting.is_finished());
    // blocked pullers are registered
    assert_eq!(queues.active_workers(), vec!["w1"]);

    queues
        .post_task("late", TaskSpec::with_id("t1", json!(null)))
        .unwrap();
    let task = tokio::time::timeout(Duration::from_secs(2), waiting)
        .await
        .expect("pull did not wake")
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(task.id, "t1");
    assert_eq!(task.assigned_worker.as_deref(), Some("w1"));
}

#[tokio::test]
async fn test_refused_worker_never_blocks() {
    let queues = queue_set();
    let pulled = tokio::time::timeout(
        Duration::from_millis(500),
        queues.pull_one("w1", Some("0.0.0-old")),
    )
    .await
    .expect("refused pull must return immediately")
    .unwrap();
    assert!(pulled.is_none());
    assert!(queues.active_workers().is_empty());
}
