//! Dispatch of inbound cluster messages to business logic

use async_trait::async_trait;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};

use super::connection::{Connection, ConnectionResult};
use super::frame::FrameMetadata;
use crate::protocol::{ClusterMessage, OpKind, Ping, Pong};
use crate::types::ShardMask;

/// Business logic behind a cluster connection
///
/// Called once per inbound request or command. A request should return its
/// paired response; commands return `None`.
#[async_trait]
pub trait ClusterHandler: Send + Sync {
    async fn handle(&self, metadata: FrameMetadata, message: ClusterMessage)
        -> Option<ClusterMessage>;
}

#[async_trait]
impl<H: ClusterHandler + ?Sized> ClusterHandler for Arc<H> {
    async fn handle(
        &self,
        metadata: FrameMetadata,
        message: ClusterMessage,
    ) -> Option<ClusterMessage> {
        (**self).handle(metadata, message).await
    }
}

impl<S: AsyncRead + AsyncWrite + Unpin> Connection<S> {
    /// Route every inbound frame to `handler` until the peer closes
    ///
    /// Returns `Ok(())` on a clean close and the error on the first decode
    /// failure.
    pub async fn serve<H>(&mut self, handler: &H) -> ConnectionResult<()>
    where
        H: ClusterHandler + ?Sized,
    {
        while let Some(frame) = self.recv().await? {
            let op = frame.op();
            match op.kind() {
                OpKind::Request => {
                    let message = frame.message.clone();
                    let Some(response) = handler.handle(frame.metadata, message).await else {
                        tracing::debug!("No response to {} (rpc {})", op, frame.rpc_id);
                        continue;
                    };
                    if !frame.message.expects(response.op()) {
                        tracing::warn!(
                            "Handler answered {} with {}, dropping it",
                            op,
                            response.op()
                        );
                        continue;
                    }
                    self.respond(&frame, response).await?;
                }
                OpKind::Command => {
                    if handler.handle(frame.metadata, frame.message).await.is_some() {
                        tracing::warn!("Dropping reply to one-way {}", op);
                    }
                }
                OpKind::Response => {
                    tracing::warn!(
                        "Unsolicited {} (rpc {}) from {}",
                        op,
                        frame.rpc_id,
                        self.peer()
                    );
                }
            }
        }
        tracing::info!("{} disconnected", self.peer());
        Ok(())
    }
}

/// Answers every [`Ping`] with a [`Pong`] carrying this node's identity
///
/// Other messages go unanswered.
#[derive(Debug, Clone)]
pub struct PingResponder {
    id: Vec<u8>,
    shard_mask_list: Vec<ShardMask>,
}

impl PingResponder {
    pub fn new(id: impl Into<Vec<u8>>, shard_mask_list: Vec<ShardMask>) -> Self {
        Self {
            id: id.into(),
            shard_mask_list,
        }
    }
}

#[async_trait]
impl ClusterHandler for PingResponder {
    async fn handle(
        &self,
        _metadata: FrameMetadata,
        message: ClusterMessage,
    ) -> Option<ClusterMessage> {
        match message {
            ClusterMessage::Ping(ping) => {
                tracing::debug!(
                    "Ping from {} covering {} shard masks",
                    String::from_utf8_lossy(&ping.id),
                    ping.shard_mask_list.len()
                );
                Some(Pong::new(self.id.clone(), self.shard_mask_list.clone()).into())
            }
            other => {
                tracing::debug!("Ignoring {}", other.op());
                None
            }
        }
    }
}

/// Build the probe a master sends to its slaves
pub fn master_ping(id: impl Into<Vec<u8>>) -> Ping {
    Ping::new(id.into(), Vec::new(), Default::default())
}
