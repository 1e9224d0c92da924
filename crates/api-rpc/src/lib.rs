//! JSON-RPC API Layer
//!
//! Producer and admin surface of the courier daemon over JSON-RPC 2.0.

pub mod error;
pub mod handler;
pub mod server;
pub mod types;

pub use handler::RpcHandler;
pub use server::{RpcServer, RpcServerConfig, RpcServerError};
