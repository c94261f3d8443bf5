//! Cluster listener
//!
//! Accepts TCP connections and serves each one with a shared
//! [`ClusterHandler`] until shutdown.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;

use super::connection::{Connection, ConnectionError};
use super::handler::ClusterHandler;
use super::NetworkConfig;

/// Server errors
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Connection error: {0}")]
    Connection(#[from] ConnectionError),

    #[error("Bind failed: {0}")]
    BindFailed(String),
}

pub type ServerResult<T> = Result<T, ServerError>;

/// Listener that hands every accepted connection to one handler
pub struct Server<H> {
    listener: TcpListener,
    handler: Arc<H>,
    config: NetworkConfig,
}

impl<H: ClusterHandler + 'static> Server<H> {
    /// Bind to `bind_addr`
    pub async fn bind(bind_addr: &str, handler: H, config: NetworkConfig) -> ServerResult<Self> {
        let listener = TcpListener::bind(bind_addr).await.map_err(|e| {
            ServerError::BindFailed(format!("Failed to bind to {}: {}", bind_addr, e))
        })?;

        tracing::info!("Server listening on {}", listener.local_addr()?);
        Ok(Self {
            listener,
            handler: Arc::new(handler),
            config,
        })
    }

    pub fn local_addr(&self) -> ServerResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections until `shutdown` resolves
    pub async fn run(self, shutdown: impl Future<Output = ()>) -> ServerResult<()> {
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                result = self.listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            tracing::info!("New connection from {}", addr);
                            if let Err(e) = stream.set_nodelay(true) {
                                tracing::warn!("Failed to set TCP_NODELAY for {}: {}", addr, e);
                            }

                            let handler = self.handler.clone();
                            let mut conn =
                                Connection::with_config(stream, addr.to_string(), &self.config);
                            tokio::spawn(async move {
                                if let Err(e) = conn.serve(&handler).await {
                                    tracing::error!("Connection to {} failed: {}", addr, e);
                                }
                            });
                        }
                        Err(e) => {
                            tracing::error!("Accept error: {}", e);
                        }
                    }
                }
                _ = &mut shutdown => {
                    tracing::info!("Server shutdown requested");
                    break;
                }
            }
        }

        Ok(())
    }
}
