//! Daemon configuration from the process environment

use std::path::PathBuf;

use anyhow::{Context, Result};
use loft_api_rpc::RpcServerConfig;
use loft_core::application::config::env;
use loft_core::application::constants::DEFAULT_HOST_SIGNATURE;
use loft_core::application::DispatcherConfig;

pub const RPC_HOST: &str = "LOFT_RPC_HOST";
pub const RPC_PORT: &str = "LOFT_RPC_PORT";
pub const LOG_FORMAT: &str = "LOFT_LOG_FORMAT";
pub const LOG_DIR: &str = "LOFT_LOG_DIR";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub format: LogFormat,
    /// Daily-rolling file sink directory
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub dispatcher: DispatcherConfig,
    pub rpc: RpcServerConfig,
    pub logging: LoggingConfig,
}

impl DaemonConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok(), sysinfo::System::host_name)
    }

    /// `host_name` is only consulted when no host signature is configured
    pub fn from_lookup<F, H>(lookup: F, host_name: H) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
        H: FnOnce() -> Option<String>,
    {
        let mut dispatcher =
            DispatcherConfig::from_lookup(&lookup).context("Invalid dispatcher configuration")?;
        if lookup(env::HOST_SIGNATURE).is_none() {
            dispatcher.host_signature =
                host_name().unwrap_or_else(|| DEFAULT_HOST_SIGNATURE.to_string());
        }

        let mut rpc = RpcServerConfig::default();
        if let Some(host) = lookup(RPC_HOST) {
            rpc.host = host;
        }
        if let Some(port) = lookup(RPC_PORT) {
            rpc.port = port
                .trim()
                .parse()
                .with_context(|| format!("{} must be a port number, got '{}'", RPC_PORT, port))?;
        }

        let format = match lookup(LOG_FORMAT).as_deref() {
            None | Some("pretty") => LogFormat::Pretty,
            Some("json") => LogFormat::Json,
            Some(other) => {
                anyhow::bail!("{} must be 'pretty' or 'json', got '{}'", LOG_FORMAT, other)
            }
        };
        let dir = lookup(LOG_DIR)
            .filter(|dir| !dir.trim().is_empty())
            .map(|dir| PathBuf::from(shellexpand::tilde(&dir).into_owned()));

        Ok(Self {
            dispatcher,
            rpc,
            logging: LoggingConfig { format, dir },
        })
    }
}
