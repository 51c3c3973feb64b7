//! Loft CLI - Operator command-line interface for the Loft dispatcher

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tabled::{Table, Tabled};

const DEFAULT_RPC_URL: &str = "http://127.0.0.1:9630";
const DEFAULT_QUEUE: &str = "Default";

#[derive(Parser)]
#[command(name = "loft")]
#[command(about = "Loft dispatcher CLI", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// RPC server URL
    #[arg(long, env = "LOFT_RPC_URL", default_value = DEFAULT_RPC_URL)]
    rpc_url: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum KindArg {
    Fifo,
    Batched,
}

#[derive(Subcommand)]
enum Commands {
    /// Show dispatcher status and per-queue counts
    Status,

    /// List workers with their throughput
    Workers,

    /// Create a queue
    Create {
        /// Queue name
        queue: String,

        #[arg(long, value_enum, default_value = "fifo")]
        kind: KindArg,

        /// Tasks per pull for FIFO queues
        #[arg(long, default_value = "1")]
        max_batch: usize,

        /// Batch size for batched queues
        #[arg(long, default_value = "16")]
        batch_size: usize,

        /// Hold a partial batch this long after the last post (ms)
        #[arg(long, default_value = "1000")]
        linger_ms: i64,

        /// Task timeout in seconds (dispatcher default when omitted)
        #[arg(long)]
        timeout_secs: Option<u64>,
    },

    /// Remove a queue and everything in it
    Remove { queue: String },

    /// Discard all tasks of a queue, keeping the queue
    Purge { queue: String },

    /// Release the held tail of a batched queue
    Release { queue: String },

    /// Post a task
    Post {
        /// Queue name (created on first post)
        #[arg(short, long, default_value = DEFAULT_QUEUE)]
        queue: String,

        /// Task id (generated when omitted)
        #[arg(long)]
        id: Option<String>,

        /// Payload as JSON string
        #[arg(long, default_value = "null")]
        payload: String,
    },

    /// Pop completed tasks of a queue
    Completed {
        queue: String,

        /// Maximum number of results to pop
        #[arg(short = 'n', long, default_value = "10")]
        limit: usize,
    },

    /// Read or write queue metadata
    Metadata {
        queue: String,

        /// Key to read; all keys are listed when omitted
        key: Option<String>,

        /// JSON value to store under `key`
        #[arg(long, requires = "key")]
        set: Option<String>,
    },

    /// Show the event log of a queue
    Events { queue: String },
}

#[derive(Serialize)]
struct JsonRpcRequest {
    jsonrpc: String,
    method: String,
    params: Value,
    id: u64,
}

#[derive(Deserialize)]
struct JsonRpcResponse {
    #[allow(dead_code)]
    jsonrpc: String,
    #[allow(dead_code)]
    id: u64,
    result: Option<Value>,
    error: Option<JsonRpcError>,
}

#[derive(Deserialize)]
struct JsonRpcError {
    code: i32,
    message: String,
}

#[derive(Tabled)]
struct QueueRow {
    name: String,
    kind: String,
    timeout_secs: u64,
    open: u64,
    in_progress: u64,
    completed: u64,
}

impl QueueRow {
    fn from_snapshot(q: &Value) -> Self {
        Self {
            name: q["name"].as_str().unwrap_or_default().to_string(),
            kind: q["kind"]["type"].as_str().unwrap_or("?").to_string(),
            timeout_secs: q["timeout_secs"].as_u64().unwrap_or(0),
            open: q["open"].as_u64().unwrap_or(0),
            in_progress: q["in_progress"].as_u64().unwrap_or(0),
            completed: q["completed"].as_u64().unwrap_or(0),
        }
    }
}

#[derive(Tabled)]
struct WorkerRow {
    worker: String,
    active: bool,
    processed: u64,
    fps: String,
}

#[derive(Tabled)]
struct EventRow {
    at: i64,
    event: String,
    detail: String,
}

async fn call_rpc(url: &str, method: &str, params: Value) -> Result<Value> {
    let request = JsonRpcRequest {
        jsonrpc: "2.0".to_string(),
        method: method.to_string(),
        params,
        id: 1,
    };

    let client = reqwest::Client::new();
    let response: JsonRpcResponse = client
        .post(url)
        .json(&request)
        .send()
        .await
        .context("Failed to connect to daemon")?
        .json()
        .await
        .context("Failed to parse response")?;

    if let Some(error) = response.error {
        anyhow::bail!("RPC error ({}): {}", error.code, error.message);
    }

    response
        .result
        .ok_or_else(|| anyhow::anyhow!("No result in response"))
}

fn parse_json(raw: &str, what: &str) -> Result<Value> {
    serde_json::from_str(raw).with_context(|| format!("Invalid JSON {}", what))
}

fn kind_params(kind: KindArg, max_batch: usize, batch_size: usize, linger_ms: i64) -> Value {
    match kind {
        KindArg::Fifo => json!({ "type": "fifo", "max_batch": max_batch }),
        KindArg::Batched => json!({
            "type": "batched",
            "batch_size": batch_size,
            "linger_ms": linger_ms,
        }),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let url = cli.rpc_url.as_str();

    match cli.command {
        Commands::Status => {
            println!("{}", "Dispatcher Status".cyan().bold());
            println!();

            match call_rpc(url, "admin.stats.v1", json!({})).await {
                Ok(stats) => {
                    println!("  {} {}", "RPC URL:".bold(), url);
                    println!("  {} {}", "Status:".bold(), "ONLINE".green());
                    println!();
                    println!("  {} {}", "Open:".bold(), stats["open"]);
                    println!("  {} {}", "In progress:".bold(), stats["in_progress"]);
                    println!("  {} {}", "Completed:".bold(), stats["completed"]);
                    println!("  {} {}", "Processed:".bold(), stats["tasks_processed"]);
                    let active = stats["active_workers"]
                        .as_array()
                        .map(|w| w.len())
                        .unwrap_or(0);
                    println!("  {} {}", "Active workers:".bold(), active);
                    println!("  {} {} seconds", "Uptime:".bold(), stats["uptime_seconds"]);
                    println!();

                    let rows: Vec<QueueRow> = stats["queues"]
                        .as_array()
                        .map(|queues| queues.iter().map(QueueRow::from_snapshot).collect())
                        .unwrap_or_default();
                    if rows.is_empty() {
                        println!("{}", "No queues".yellow());
                    } else {
                        println!("{}", Table::new(rows));
                    }
                }
                Err(e) => {
                    println!("  {} {}", "Status:".bold(), "ERROR".red());
                    println!("  {} {}", "Error:".bold(), e);
                }
            }
        }

        Commands::Workers => {
            let names = call_rpc(url, "workers.names.v1", json!({})).await?;
            let active: Vec<&str> = names["active"]
                .as_array()
                .map(|a| a.iter().filter_map(Value::as_str).collect())
                .unwrap_or_default();

            let mut rows = Vec::new();
            for worker in names["workers"].as_array().into_iter().flatten() {
                let worker = worker.as_str().unwrap_or_default();
                let processed = call_rpc(
                    url,
                    "stats.tasks_processed.v1",
                    json!({ "worker_id": worker }),
                )
                .await?;
                let fps = call_rpc(url, "workers.fps.v1", json!({ "worker_id": worker })).await?;
                rows.push(WorkerRow {
                    worker: worker.to_string(),
                    active: active.contains(&worker),
                    processed: processed["count"].as_u64().unwrap_or(0),
                    fps: format!("{:.2}", fps["fps"].as_f64().unwrap_or(0.0)),
                });
            }

            if rows.is_empty() {
                println!("{}", "No workers seen yet".yellow());
            } else {
                println!("{}", Table::new(rows));
            }
        }

        Commands::Create {
            queue,
            kind,
            max_batch,
            batch_size,
            linger_ms,
            timeout_secs,
        } => {
            let params = json!({
                "queue": queue,
                "kind": kind_params(kind, max_batch, batch_size, linger_ms),
                "timeout_secs": timeout_secs,
            });
            call_rpc(url, "queue.create.v1", params).await?;
            println!("{}", format!("✓ Queue {} created", queue).green().bold());
        }

        Commands::Remove { queue } => {
            call_rpc(url, "queue.remove.v1", json!({ "queue": queue })).await?;
            println!("{}", format!("✓ Queue {} removed", queue).green().bold());
        }

        Commands::Purge { queue } => {
            let result = call_rpc(url, "queue.purge.v1", json!({ "queue": queue })).await?;
            println!(
                "{}",
                format!("✓ Queue {} purged ({} tasks discarded)", queue, result["discarded"])
                    .green()
                    .bold()
            );
        }

        Commands::Release { queue } => {
            let result = call_rpc(url, "queue.release_tasks.v1", json!({ "queue": queue })).await?;
            println!(
                "{}",
                format!("✓ Released {} held tasks in {}", result["released"], queue)
                    .green()
                    .bold()
            );
        }

        Commands::Post { queue, id, payload } => {
            let params = json!({
                "queue": queue,
                "task_id": id,
                "payload": parse_json(&payload, "payload")?,
            });
            let result = call_rpc(url, "queue.post_task.v1", params).await?;
            println!(
                "{}",
                format!("✓ Task {} posted to {}", result["task_id"], queue)
                    .green()
                    .bold()
            );
        }

        Commands::Completed { queue, limit } => {
            let mut popped = 0;
            while popped < limit {
                let result =
                    call_rpc(url, "queue.get_completed_task.v1", json!({ "queue": queue })).await?;
                let completed = &result["completed"];
                if completed.is_null() {
                    break;
                }
                println!(
                    "{} {} ({} ms)",
                    completed["task"]["id"].as_str().unwrap_or("?").bold(),
                    completed["output"],
                    completed["elapsed_ms"]
                );
                popped += 1;
            }
            if popped == 0 {
                println!("{}", "No completed tasks".yellow());
            }
        }

        Commands::Metadata { queue, key, set } => match (key, set) {
            (Some(key), Some(raw)) => {
                let params = json!({
                    "queue": queue,
                    "key": key,
                    "value": parse_json(&raw, "metadata value")?,
                });
                call_rpc(url, "queue.set_metadata.v1", params).await?;
                println!("{}", format!("✓ {}.{} set", queue, key).green().bold());
            }
            (Some(key), None) => {
                let result = call_rpc(
                    url,
                    "queue.get_metadata.v1",
                    json!({ "queue": queue, "key": key }),
                )
                .await?;
                println!("{}", serde_json::to_string_pretty(&result["value"])?);
            }
            (None, _) => {
                let result =
                    call_rpc(url, "queue.metadata_keys.v1", json!({ "queue": queue })).await?;
                for key in result["keys"].as_array().into_iter().flatten() {
                    println!("{}", key.as_str().unwrap_or_default());
                }
            }
        },

        Commands::Events { queue } => {
            let result = call_rpc(url, "queue.events.v1", json!({ "queue": queue })).await?;
            let rows: Vec<EventRow> = result["events"]
                .as_array()
                .into_iter()
                .flatten()
                .map(|e| EventRow {
                    at: e["at"].as_i64().unwrap_or(0),
                    event: e["name"].as_str().unwrap_or_default().to_string(),
                    detail: e["detail"].to_string(),
                })
                .collect();
            if rows.is_empty() {
                println!("{}", "No events".yellow());
            } else {
                println!("{}", Table::new(rows));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_kind_params() {
        assert_eq!(
            kind_params(KindArg::Batched, 1, 8, 250),
            json!({"type": "batched", "batch_size": 8, "linger_ms": 250})
        );
        assert_eq!(
            kind_params(KindArg::Fifo, 4, 8, 250),
            json!({"type": "fifo", "max_batch": 4})
        );
    }

    #[test]
    fn test_metadata_set_requires_key() {
        assert!(Cli::try_parse_from(["loft", "metadata", "A", "--set", "1"]).is_err());
        assert!(Cli::try_parse_from(["loft", "metadata", "A", "camera", "--set", "1"]).is_ok());
    }
}
