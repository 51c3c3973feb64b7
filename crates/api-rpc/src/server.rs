//! JSON-RPC Server
//!
//! Serves the queue set over JSON-RPC 2.0 on TCP.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use jsonrpsee::server::{Server, ServerHandle};
use jsonrpsee::types::error::INVALID_PARAMS_CODE;
use jsonrpsee::types::{ErrorObjectOwned, Params};
use jsonrpsee::RpcModule;
use loft_core::application::QueueSet;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::info;

use crate::handler::RpcHandler;

const DEFAULT_RPC_HOST: &str = "127.0.0.1";
const DEFAULT_RPC_PORT: u16 = 9630;

/// RPC Server Configuration
#[derive(Debug, Clone)]
pub struct RpcServerConfig {
    pub host: String,
    /// 0 binds an ephemeral port; see `StartedServer::local_addr`
    pub port: u16,
}

impl Default for RpcServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_RPC_HOST.to_string(),
            port: DEFAULT_RPC_PORT,
        }
    }
}

/// A running server and the address it actually bound
pub struct StartedServer {
    pub handle: ServerHandle,
    pub local_addr: SocketAddr,
}

/// RPC Server
pub struct RpcServer {
    config: RpcServerConfig,
    handler: Arc<RpcHandler>,
}

impl RpcServer {
    pub fn new(config: RpcServerConfig, queues: Arc<QueueSet>) -> Self {
        Self {
            config,
            handler: Arc::new(RpcHandler::new(queues)),
        }
    }

    /// Start the JSON-RPC server
    pub async fn start(self) -> Result<StartedServer, String> {
        let addr = format!("{}:{}", self.config.host, self.config.port);

        let server = Server::builder()
            .build(&addr)
            .await
            .map_err(|e| format!("Failed to build server on {}: {}", addr, e))?;
        let local_addr = server
            .local_addr()
            .map_err(|e| format!("Failed to read bound address: {}", e))?;

        let module = self.build_module().map_err(|e| e.to_string())?;
        let methods = module.method_names().count();

        info!(
            addr = %local_addr,
            methods = methods,
            "JSON-RPC server started"
        );

        let handle = server.start(module);
        Ok(StartedServer { handle, local_addr })
    }

    fn build_module(&self) -> Result<RpcModule<()>, jsonrpsee::core::RegisterMethodError> {
        let mut module = RpcModule::new(());
        let h = &self.handler;

        // Producers
        register(&mut module, "queue.post_task.v1", h, |h, req| async move {
            h.post_task(req).await
        })?;
        register(&mut module, "queue.post_tasks.v1", h, |h, req| async move {
            h.post_tasks(req).await
        })?;

        // Workers
        register(&mut module, "worker.get_task.v1", h, |h, req| async move {
            h.get_task(req).await
        })?;
        register(&mut module, "worker.get_tasks.v1", h, |h, req| async move {
            h.get_tasks(req).await
        })?;
        register(
            &mut module,
            "worker.return_completed_task.v1",
            h,
            |h, req| async move { h.return_completed_task(req).await },
        )?;
        register(
            &mut module,
            "worker.return_completed_tasks.v1",
            h,
            |h, req| async move { h.return_completed_tasks(req).await },
        )?;

        // Queue administration
        register(
            &mut module,
            "queue.get_completed_task.v1",
            h,
            |h, req| async move { h.get_completed_task(req).await },
        )?;
        register(&mut module, "queue.create.v1", h, |h, req| async move {
            h.create_queue(req).await
        })?;
        register(&mut module, "queue.remove.v1", h, |h, req| async move {
            h.remove_queue(req).await
        })?;
        register(&mut module, "queue.purge.v1", h, |h, req| async move {
            h.purge(req).await
        })?;
        register(&mut module, "queue.release_tasks.v1", h, |h, req| async move {
            h.release_tasks(req).await
        })?;
        register(&mut module, "queue.names.v1", h, |h, _: NoParams| async move {
            h.queue_names().await
        })?;

        // Queue data / metadata / events
        register(&mut module, "queue.get_data.v1", h, |h, req| async move {
            h.get_data(req).await
        })?;
        register(&mut module, "queue.set_data.v1", h, |h, req| async move {
            h.set_data(req).await
        })?;
        register(&mut module, "queue.get_metadata.v1", h, |h, req| async move {
            h.get_metadata(req).await
        })?;
        register(&mut module, "queue.set_metadata.v1", h, |h, req| async move {
            h.set_metadata(req).await
        })?;
        register(
            &mut module,
            "queue.set_metadata_entries.v1",
            h,
            |h, req| async move { h.set_metadata_entries(req).await },
        )?;
        register(&mut module, "queue.metadata_keys.v1", h, |h, req| async move {
            h.metadata_keys(req).await
        })?;
        register(&mut module, "queue.log_event.v1", h, |h, req| async move {
            h.log_event(req).await
        })?;
        register(&mut module, "queue.events.v1", h, |h, req| async move {
            h.events(req).await
        })?;

        // Stats
        register(&mut module, "stats.open_tasks.v1", h, |h, req| async move {
            h.open_tasks(req).await
        })?;
        register(
            &mut module,
            "stats.tasks_in_progress.v1",
            h,
            |h, req| async move { h.tasks_in_progress(req).await },
        )?;
        register(&mut module, "stats.tasks_completed.v1", h, |h, req| async move {
            h.tasks_completed(req).await
        })?;
        register(&mut module, "stats.tasks_processed.v1", h, |h, req| async move {
            h.tasks_processed(req).await
        })?;
        register(&mut module, "workers.names.v1", h, |h, _: NoParams| async move {
            h.worker_names().await
        })?;
        register(&mut module, "workers.fps.v1", h, |h, req| async move {
            h.worker_fps(req).await
        })?;

        // Admin
        register(&mut module, "admin.stats.v1", h, |h, _: NoParams| async move {
            h.stats().await
        })?;

        Ok(module)
    }
}

/// Parameters for methods that take none
#[derive(Debug, serde::Deserialize)]
struct NoParams {}

fn register<P, R, F, Fut>(
    module: &mut RpcModule<()>,
    method: &'static str,
    handler: &Arc<RpcHandler>,
    call: F,
) -> Result<(), jsonrpsee::core::RegisterMethodError>
where
    P: DeserializeOwned + Send + 'static,
    R: Serialize + Clone + Send + 'static,
    F: Fn(Arc<RpcHandler>, P) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = Result<R, ErrorObjectOwned>> + Send + 'static,
{
    let handler = handler.clone();
    module.register_async_method(method, move |params, _, _| {
        let handler = handler.clone();
        let call = call.clone();
        async move {
            let req: P = parse_params(params)?;
            call(handler, req).await
        }
    })?;
    Ok(())
}

/// Accepts named params (`{...}`), a single positional object (`[{...}]`)
/// or no params at all, which parse as an empty object.
fn parse_params<P: DeserializeOwned>(params: Params<'_>) -> Result<P, ErrorObjectOwned> {
    match params.as_str().map(str::trim) {
        None | Some("[]") | Some("null") => {
            serde_json::from_value(serde_json::Value::Object(Default::default())).map_err(|e| {
                ErrorObjectOwned::owned(INVALID_PARAMS_CODE, e.to_string(), None::<()>)
            })
        }
        Some(raw) if raw.starts_with('[') => params.one(),
        Some(_) => params.parse(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonrpsee::core::client::ClientT;
    use jsonrpsee::http_client::HttpClientBuilder;
    use jsonrpsee::rpc_params;
    use loft_core::application::DispatcherConfig;
    use loft_core::port::id_provider::UuidProvider;
    use loft_core::port::time_provider::SystemTimeProvider;
    use serde_json::{json, Value};

    async fn start() -> StartedServer {
        let queues = Arc::new(QueueSet::new(
            &DispatcherConfig::default(),
            Arc::new(SystemTimeProvider),
            Arc::new(UuidProvider),
        ));
        let config = RpcServerConfig {
            host: "127.0.0.1".into(),
            port: 0,
        };
        RpcServer::new(config, queues).start().await.unwrap()
    }

    #[tokio::test]
    async fn test_binds_ephemeral_port() {
        let server = start().await;
        assert_ne!(server.local_addr.port(), 0);
        server.handle.stop().unwrap();
    }

    #[tokio::test]
    async fn test_positional_and_empty_params() {
        let server = start().await;
        let client = HttpClientBuilder::default()
            .build(format!("http://{}", server.local_addr))
            .unwrap();

        let posted: Value = client
            .request(
                "queue.post_task.v1",
                rpc_params![json!({"queue": "A", "task_id": "t1", "payload": 7})],
            )
            .await
            .unwrap();
        assert_eq!(posted["task_id"], "t1");

        let names: Value = client
            .request("queue.names.v1", rpc_params![])
            .await
            .unwrap();
        assert_eq!(names["queues"], json!(["A"]));

        let open: Value = client
            .request("stats.open_tasks.v1", rpc_params![])
            .await
            .unwrap();
        assert_eq!(open["count"], 1);

        server.handle.stop().unwrap();
    }
}
