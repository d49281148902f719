//! Federated tool servers: child processes speaking line-delimited
//! JSON-RPC 2.0 over stdio, discovered and routed by the manager.

mod client;
mod error;
mod manager;

pub use client::{ExternalServerClient, FederatedTool};
pub use error::FederationError;
pub use manager::{ExternalServerManager, NewServerConfig, ServerConfigPatch};
