//! Loft SDK - Rust Client Library
//!
//! Client for producers, workers and result consumers of a Loft daemon.
//!
//! # Example
//!
//! ```no_run
//! use loft_sdk::{generate_worker_id, LoftClient};
//! use loft_core::domain::TaskResult;
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = LoftClient::connect("http://127.0.0.1:9630").await?;
//!
//!     client.post_task("Default", None, json!({"frame": 1})).await?;
//!
//!     let worker = generate_worker_id("localhost");
//!     if let Some(task) = client.get_task(&worker).await? {
//!         client
//!             .return_completed_task(&worker, TaskResult::for_task(&task), None)
//!             .await?;
//!     }
//!
//!     Ok(())
//! }
//! ```

mod client;
mod error;
mod types;

pub use client::{generate_worker_id, LoftClient};
pub use error::{Result, SdkError};
pub use types::{
    DispatcherStats, PostTaskResponse, PostTasksResponse, QueueSnapshot, StatsResponse,
    WorkerNames,
};
