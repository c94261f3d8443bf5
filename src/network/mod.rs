//! Network module - Carries cluster messages over byte streams
//!
//! Provides:
//! - Stream framing with cluster metadata and rpc ids
//! - Connections with request/response correlation
//! - A handler seam for business logic and a TCP listener that drives it

mod connection;
mod frame;
mod handler;
mod server;

pub use connection::*;
pub use frame::*;
pub use handler::*;
pub use server::*;

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::TcpStream;

/// Default port slaves listen on
pub const DEFAULT_PORT: u16 = 38000;

/// Configuration for network operations
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Largest frame accepted or produced
    pub max_frame_size: usize,
    /// Connection timeout in milliseconds
    pub connect_timeout_ms: u64,
    /// How long `call` waits for a response, in milliseconds
    pub request_timeout_ms: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            connect_timeout_ms: 5000,
            request_timeout_ms: 10_000,
        }
    }
}

impl NetworkConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout_ms = timeout.as_millis() as u64;
        self
    }
}

impl From<&crate::config::NetworkConfig> for NetworkConfig {
    fn from(config: &crate::config::NetworkConfig) -> Self {
        Self {
            max_frame_size: config.max_frame_size,
            connect_timeout_ms: config.connect_timeout_ms,
            request_timeout_ms: config.request_timeout_ms,
        }
    }
}

/// Resolve a hostname to a socket address
pub async fn resolve_host(host: &str, port: u16) -> std::io::Result<SocketAddr> {
    use tokio::net::lookup_host;

    let addr_string = format!("{}:{}", host, port);
    let mut addrs = lookup_host(&addr_string).await?;

    addrs.next().ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("Could not resolve host: {}", host),
        )
    })
}

/// Open a TCP connection to a cluster peer
pub async fn connect(
    addr: SocketAddr,
    config: &NetworkConfig,
) -> ConnectionResult<Connection<TcpStream>> {
    let stream = tokio::time::timeout(config.connect_timeout(), TcpStream::connect(addr))
        .await
        .map_err(|_| ConnectionError::Timeout)??;
    stream.set_nodelay(true)?;

    tracing::info!("Connected to {}", addr);
    Ok(Connection::with_config(stream, addr.to_string(), config))
}
