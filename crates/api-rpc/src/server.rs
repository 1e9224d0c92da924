//! JSON-RPC Server
//!
//! Serves the RPC module over HTTP on a localhost TCP port.

use crate::handler::RpcHandler;
use crate::types::EnqueueRequest;
use jsonrpsee::server::{Server, ServerHandle};
use jsonrpsee::RpcModule;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

const DEFAULT_RPC_HOST: &str = "127.0.0.1";
const DEFAULT_RPC_PORT: u16 = 9530;

#[derive(Error, Debug)]
pub enum RpcServerError {
    #[error("Failed to bind RPC server on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to register method: {0}")]
    Register(#[from] jsonrpsee::server::RegisterMethodError),
}

/// RPC Server Configuration
#[derive(Debug, Clone)]
pub struct RpcServerConfig {
    pub host: String,
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

/// RPC Server
pub struct RpcServer {
    config: RpcServerConfig,
    handler: Arc<RpcHandler>,
}

impl RpcServer {
    pub fn new(config: RpcServerConfig, handler: RpcHandler) -> Self {
        Self {
            config,
            handler: Arc::new(handler),
        }
    }

    /// Build the method table
    pub fn into_module(self) -> Result<RpcModule<()>, RpcServerError> {
        let mut module = RpcModule::new(());

        let handler = self.handler.clone();
        module.register_async_method("callback.enqueue.v1", move |params, _, _| {
            let handler = handler.clone();
            async move {
                let req: EnqueueRequest = params.parse()?;
                handler.enqueue(req).await
            }
        })?;

        let handler = self.handler;
        module.register_async_method("admin.stats.v1", move |_, _, _| {
            let handler = handler.clone();
            async move { handler.stats().await }
        })?;

        Ok(module)
    }

    /// Bind and start serving
    ///
    /// Returns the bound address (useful with port 0) and a handle that
    /// stops the server when `stop()` is called.
    pub async fn start(self) -> Result<(SocketAddr, ServerHandle), RpcServerError> {
        let addr = format!("{}:{}", self.config.host, self.config.port);

        let server = Server::builder()
            .build(&addr)
            .await
            .map_err(|source| RpcServerError::Bind {
                addr: addr.clone(),
                source,
            })?;
        let local_addr = server.local_addr().map_err(|source| RpcServerError::Bind {
            addr: addr.clone(),
            source,
        })?;

        let module = self.into_module()?;
        let handle = server.start(module);

        info!(addr = %local_addr, "JSON-RPC server started");
        Ok((local_addr, handle))
    }
}
