//! JSON-RPC API Layer
//!
//! Exposes the Loft queue set to producers, workers and result consumers
//! as versioned JSON-RPC 2.0 methods.

pub mod error;
pub mod handler;
pub mod server;
pub mod types;

pub use server::{RpcServer, RpcServerConfig, StartedServer};
