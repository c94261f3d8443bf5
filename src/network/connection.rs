//! Connection handling for cluster peers
//!
//! Manages one framed byte stream, including:
//! - Frame encoding/decoding
//! - Request/response correlation by rpc id
//! - Holding peer-initiated frames that arrive during a call
//! - Connection state and traffic statistics

use bytes::BytesMut;
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::frame::{Frame, FrameDecoder, FrameEncoder, FrameError, FrameMetadata};
use super::NetworkConfig;
use crate::protocol::{ClusterMessage, ClusterOp, OpKind};

/// Connection errors
#[derive(Error, Debug)]
pub enum ConnectionError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Frame error: {0}")]
    Frame(#[from] FrameError),

    #[error("Connection closed")]
    Closed,

    #[error("Connection timeout")]
    Timeout,

    #[error("{0} is not a request")]
    NotARequest(ClusterOp),

    #[error("Unexpected response: expected {expected}, got {actual}")]
    UnexpectedResponse {
        expected: ClusterOp,
        actual: ClusterOp,
    },
}

pub type ConnectionResult<T> = Result<T, ConnectionError>;

/// State of a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Ready for traffic
    Connected,
    /// Connection is closing gracefully
    Closing,
    /// Connection has been closed, by either side or after a protocol error
    Closed,
}

/// Connection statistics
#[derive(Debug, Default, Clone)]
pub struct ConnectionStats {
    /// Frames sent
    pub frames_sent: u64,
    /// Frames received
    pub frames_received: u64,
    /// Bytes sent
    pub bytes_sent: u64,
    /// Bytes received
    pub bytes_received: u64,
    /// Round-trip time of the last call (microseconds)
    pub rtt_us: u64,
}

/// A framed connection to a cluster peer
pub struct Connection<S> {
    /// Remote peer label, for logs
    peer: String,
    /// The underlying stream
    stream: S,
    encoder: FrameEncoder,
    decoder: FrameDecoder,
    read_buf: BytesMut,
    write_buf: BytesMut,
    state: ConnectionState,
    /// Next rpc id handed out by `call`. Zero is reserved for one-way frames.
    next_rpc_id: u64,
    /// Requests and commands the peer sent while a call was waiting
    pending: VecDeque<Frame>,
    request_timeout: Duration,
    stats: ConnectionStats,
}

impl<S: AsyncRead + AsyncWrite + Unpin> Connection<S> {
    /// Wrap an established stream with default limits
    pub fn new(stream: S, peer: impl Into<String>) -> Self {
        Self::with_config(stream, peer, &NetworkConfig::default())
    }

    pub fn with_config(stream: S, peer: impl Into<String>, config: &NetworkConfig) -> Self {
        Self {
            peer: peer.into(),
            stream,
            encoder: FrameEncoder::with_max_frame_size(config.max_frame_size),
            decoder: FrameDecoder::with_max_frame_size(config.max_frame_size),
            read_buf: BytesMut::with_capacity(4096),
            write_buf: BytesMut::with_capacity(4096),
            state: ConnectionState::Connected,
            next_rpc_id: 1,
            pending: VecDeque::new(),
            request_timeout: config.request_timeout(),
            stats: ConnectionStats::default(),
        }
    }

    pub fn peer(&self) -> &str {
        &self.peer
    }

    /// Get the current connection state
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Get connection statistics
    pub fn stats(&self) -> &ConnectionStats {
        &self.stats
    }

    /// Send a frame
    pub async fn send(&mut self, frame: &Frame) -> ConnectionResult<()> {
        if self.state != ConnectionState::Connected {
            return Err(ConnectionError::Closed);
        }

        self.write_buf.clear();
        self.encoder.encode(frame, &mut self.write_buf)?;

        self.stream.write_all(&self.write_buf).await?;
        self.stream.flush().await?;

        self.stats.frames_sent += 1;
        self.stats.bytes_sent += self.write_buf.len() as u64;

        tracing::trace!(
            "Sent {} (rpc {}) to {}",
            frame.op(),
            frame.rpc_id,
            self.peer
        );
        Ok(())
    }

    /// Receive a frame (returns None on a clean close)
    ///
    /// Frames held back by [`call`](Self::call) come first, in arrival order.
    /// A decode failure closes the connection: the stream position can no
    /// longer be trusted.
    pub async fn recv(&mut self) -> ConnectionResult<Option<Frame>> {
        if let Some(frame) = self.pending.pop_front() {
            return Ok(Some(frame));
        }
        if self.state == ConnectionState::Closed {
            return Err(ConnectionError::Closed);
        }

        loop {
            // Try to decode a frame from the buffer
            match self.decoder.decode(&mut self.read_buf) {
                Ok(Some(frame)) => {
                    self.stats.frames_received += 1;
                    tracing::trace!(
                        "Received {} (rpc {}) from {}",
                        frame.op(),
                        frame.rpc_id,
                        self.peer
                    );
                    return Ok(Some(frame));
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!("Dropping connection to {}: {}", self.peer, e);
                    self.state = ConnectionState::Closed;
                    return Err(e.into());
                }
            }

            // Read more data
            let mut buf = [0u8; 4096];
            let n = self.stream.read(&mut buf).await?;

            if n == 0 {
                self.state = ConnectionState::Closed;
                if self.read_buf.is_empty() && !self.decoder.is_mid_frame() {
                    tracing::debug!("{} closed the connection", self.peer);
                    return Ok(None); // Clean close
                } else {
                    return Err(ConnectionError::Closed);
                }
            }

            self.read_buf.extend_from_slice(&buf[..n]);
            self.stats.bytes_received += n as u64;
        }
    }

    /// Try to receive a frame with a timeout
    pub async fn recv_timeout(&mut self, timeout: Duration) -> ConnectionResult<Option<Frame>> {
        match tokio::time::timeout(timeout, self.recv()).await {
            Ok(result) => result,
            Err(_) => Err(ConnectionError::Timeout),
        }
    }

    /// Send a request and wait for its response
    ///
    /// Only response frames are matched against the rpc id; the peer numbers
    /// its own requests independently. Requests and commands arriving in the
    /// meantime are kept for the next [`recv`](Self::recv). Responses carrying
    /// other rpc ids are logged and dropped. A response of the wrong type is
    /// an error.
    pub async fn call(
        &mut self,
        metadata: FrameMetadata,
        request: impl Into<ClusterMessage>,
    ) -> ConnectionResult<ClusterMessage> {
        let request = request.into();
        let op = request.op();
        let expected = op.response_op().ok_or(ConnectionError::NotARequest(op))?;

        let rpc_id = self.next_rpc_id;
        self.next_rpc_id = self.next_rpc_id.wrapping_add(1).max(1);

        let start = Instant::now();
        self.send(&Frame::new(metadata, rpc_id, request)).await?;

        let deadline = start + self.request_timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let frame = self
                .recv_timeout(remaining)
                .await?
                .ok_or(ConnectionError::Closed)?;

            if frame.op().kind() != OpKind::Response {
                tracing::debug!(
                    "Holding {} (rpc {}) from {} until call {} completes",
                    frame.op(),
                    frame.rpc_id,
                    self.peer,
                    rpc_id
                );
                self.pending.push_back(frame);
                continue;
            }

            if frame.rpc_id != rpc_id {
                tracing::warn!(
                    "Dropping {} with rpc id {} from {} while waiting for {}",
                    frame.op(),
                    frame.rpc_id,
                    self.peer,
                    rpc_id
                );
                continue;
            }

            let actual = frame.op();
            if actual != expected {
                return Err(ConnectionError::UnexpectedResponse { expected, actual });
            }

            self.stats.rtt_us = start.elapsed().as_micros() as u64;
            return Ok(frame.message);
        }
    }

    /// Send a frame that expects no reply
    pub async fn notify(
        &mut self,
        metadata: FrameMetadata,
        message: impl Into<ClusterMessage>,
    ) -> ConnectionResult<()> {
        self.send(&Frame::new(metadata, 0, message.into())).await
    }

    /// Reply to a request frame, reusing its metadata and rpc id
    pub async fn respond(
        &mut self,
        request: &Frame,
        response: ClusterMessage,
    ) -> ConnectionResult<()> {
        debug_assert_eq!(request.op().kind(), OpKind::Request);
        self.send(&Frame::new(request.metadata, request.rpc_id, response))
            .await
    }

    /// Close the connection gracefully
    pub async fn close(&mut self) -> ConnectionResult<()> {
        if self.state == ConnectionState::Closed {
            return Ok(());
        }
        self.state = ConnectionState::Closing;
        self.stream.shutdown().await?;
        self.state = ConnectionState::Closed;
        tracing::info!("Closed connection to {}", self.peer);
        Ok(())
    }

    /// Check if the connection is still active
    pub fn is_active(&self) -> bool {
        matches!(self.state, ConnectionState::Connected)
    }

    /// Number of peer frames held back by `call` and not yet received
    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}
