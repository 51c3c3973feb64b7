//! Simple SDK Example
//!
//! Posts a handful of tasks, works them off with one worker and prints the
//! collected results.
//!
//! # Usage
//!
//! 1. Start the daemon:
//!    ```bash
//!    cargo run --package loft-daemon
//!    ```
//!
//! 2. Run this example:
//!    ```bash
//!    cargo run --package loft-sdk --example simple
//!    ```

use std::time::Instant;

use loft_core::domain::{TaskResult, TaskSpec};
use loft_sdk::{generate_worker_id, LoftClient};
use serde_json::json;

const QUEUE: &str = "example";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let client = LoftClient::connect("http://127.0.0.1:9630").await?;

    let tasks = (0..5)
        .map(|i| TaskSpec::new(json!({ "frame": i })))
        .collect();
    let ids = client.post_tasks(QUEUE, tasks).await?;
    println!("posted {} tasks to '{}'", ids.len(), QUEUE);

    let worker = generate_worker_id("localhost");
    loop {
        let batch = client.get_tasks(&worker).await?;
        if batch.is_empty() {
            break;
        }

        let started = Instant::now();
        let results = batch
            .iter()
            .map(|task| {
                let frame = task.payload.as_value()["frame"].as_i64().unwrap_or(0);
                TaskResult::new(task.id.clone(), task.queue_id.clone(), json!(frame * frame))
            })
            .collect();
        client
            .return_completed_tasks(&worker, results, Some(started.elapsed()))
            .await?;
    }

    while let Some(done) = client.get_completed_task(QUEUE).await? {
        println!("{} -> {}", done.task.id, done.output);
    }

    println!("worker fps: {:.1}", client.worker_fps(&worker).await?);
    Ok(())
}
