//! Stream framing for cluster messages
//!
//! Frame layout, big-endian:
//!
//! ```text
//! [size: u32][branch: u32][cluster_peer_id: u64][op: u8][rpc_id: u64][payload]
//! ```
//!
//! `size` counts `op + rpc_id + payload`. `branch` and `cluster_peer_id` say
//! which shard and which virtual peer connection the message concerns.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use thiserror::Error;

use crate::codec::CodecError;
use crate::protocol::{resolve, ClusterMessage, ClusterOp};
use crate::types::Branch;

/// Default maximum frame size (32 MiB)
pub const DEFAULT_MAX_FRAME_SIZE: usize = 32 * 1024 * 1024;

/// size(4) + branch(4) + cluster_peer_id(8)
const PREFIX_SIZE: usize = 16;

/// op(1) + rpc_id(8)
const OP_HEADER_SIZE: usize = 9;

/// Framing errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("Frame too large: {0} bytes (max: {1})")]
    FrameTooLarge(usize, usize),

    #[error("Frame size {0} is shorter than the op header")]
    Undersized(usize),

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),
}

pub type FrameResult<T> = Result<T, FrameError>;

/// Which shard and peer connection a frame concerns
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct FrameMetadata {
    pub branch: Branch,
    pub cluster_peer_id: u64,
}

impl FrameMetadata {
    pub fn new(branch: Branch, cluster_peer_id: u64) -> Self {
        Self {
            branch,
            cluster_peer_id,
        }
    }
}

/// One decoded frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub metadata: FrameMetadata,
    /// Correlates a response with its request. Zero for one-way traffic.
    pub rpc_id: u64,
    pub message: ClusterMessage,
}

impl Frame {
    pub fn new(metadata: FrameMetadata, rpc_id: u64, message: ClusterMessage) -> Self {
        Self {
            metadata,
            rpc_id,
            message,
        }
    }

    pub fn op(&self) -> ClusterOp {
        self.message.op()
    }
}

/// Writes frames into a buffer
#[derive(Debug, Clone)]
pub struct FrameEncoder {
    max_frame_size: usize,
}

impl FrameEncoder {
    pub fn new() -> Self {
        Self::with_max_frame_size(DEFAULT_MAX_FRAME_SIZE)
    }

    pub fn with_max_frame_size(max_frame_size: usize) -> Self {
        Self { max_frame_size }
    }

    /// Append one frame to `buf`
    ///
    /// Nothing is written when encoding fails.
    pub fn encode(&self, frame: &Frame, buf: &mut BytesMut) -> FrameResult<()> {
        let start = buf.len();
        buf.put_u32(0);
        buf.put_u32(frame.metadata.branch.value);
        buf.put_u64(frame.metadata.cluster_peer_id);
        buf.put_u8(frame.op().as_u8());
        buf.put_u64(frame.rpc_id);

        if let Err(e) = frame.message.encode(buf) {
            buf.truncate(start);
            return Err(e.into());
        }

        let size = buf.len() - start - PREFIX_SIZE;
        let wire_size = match u32::try_from(size) {
            Ok(wire_size) if size <= self.max_frame_size => wire_size,
            _ => {
                buf.truncate(start);
                return Err(FrameError::FrameTooLarge(size, self.max_frame_size));
            }
        };
        buf[start..start + 4].copy_from_slice(&wire_size.to_be_bytes());
        Ok(())
    }
}

impl Default for FrameEncoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Decodes frames from a buffer
pub struct FrameDecoder {
    state: DecodeState,
    max_frame_size: usize,
}

#[derive(Default)]
enum DecodeState {
    #[default]
    Header,
    Body {
        size: usize,
        metadata: FrameMetadata,
    },
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::with_max_frame_size(DEFAULT_MAX_FRAME_SIZE)
    }

    pub fn with_max_frame_size(max_frame_size: usize) -> Self {
        Self {
            state: DecodeState::Header,
            max_frame_size,
        }
    }

    /// Whether a frame has been started but not finished
    pub fn is_mid_frame(&self) -> bool {
        matches!(self.state, DecodeState::Body { .. })
    }

    /// Attempt to decode a frame from the buffer
    /// Returns Ok(None) if more data is needed
    pub fn decode(&mut self, buf: &mut BytesMut) -> FrameResult<Option<Frame>> {
        loop {
            match &self.state {
                DecodeState::Header => {
                    if buf.len() < PREFIX_SIZE {
                        return Ok(None);
                    }

                    let size = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]) as usize;
                    if size > self.max_frame_size {
                        return Err(FrameError::FrameTooLarge(size, self.max_frame_size));
                    }
                    if size < OP_HEADER_SIZE {
                        return Err(FrameError::Undersized(size));
                    }

                    buf.advance(4);
                    let branch = Branch::new(buf.get_u32());
                    let cluster_peer_id = buf.get_u64();

                    self.state = DecodeState::Body {
                        size,
                        metadata: FrameMetadata::new(branch, cluster_peer_id),
                    };
                }
                DecodeState::Body { size, metadata } => {
                    if buf.len() < *size {
                        return Ok(None);
                    }

                    let metadata = *metadata;
                    let mut body = buf.split_to(*size);
                    self.state = DecodeState::Header;

                    let op = resolve(body.get_u8())?;
                    let rpc_id = body.get_u64();
                    let message = ClusterMessage::decode(op, &body)?;

                    return Ok(Some(Frame::new(metadata, rpc_id, message)));
                }
            }
        }
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Encode a single frame into a fresh buffer
pub fn encode_frame(frame: &Frame) -> FrameResult<Bytes> {
    let mut buf = BytesMut::new();
    FrameEncoder::new().encode(frame, &mut buf)?;
    Ok(buf.freeze())
}

/// Decode exactly one complete frame
pub fn decode_frame(bytes: &[u8]) -> FrameResult<Frame> {
    let mut buf = BytesMut::from(bytes);
    let mut decoder = FrameDecoder::new();
    let frame = decoder.decode(&mut buf)?.ok_or(CodecError::Truncated {
        need: bytes.len() + 1,
        have: bytes.len(),
    })?;
    if !buf.is_empty() {
        return Err(CodecError::TrailingBytes {
            message: "Frame",
            trailing: buf.len(),
        }
        .into());
    }
    Ok(frame)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::ErrorKind;
    use crate::protocol::{AddTransactionResponse, DestroyClusterPeerConnectionCommand, Pong};

    fn metadata() -> FrameMetadata {
        FrameMetadata::new(Branch::create(4, 2).unwrap(), 99)
    }

    fn pong_frame(rpc_id: u64) -> Frame {
        Frame::new(
            metadata(),
            rpc_id,
            Pong::new(b"slave".to_vec(), Vec::new()).into(),
        )
    }

    #[test]
    fn test_frame_layout() {
        let frame = Frame::new(
            metadata(),
            7,
            AddTransactionResponse::new(1).into(),
        );
        let bytes = encode_frame(&frame).unwrap();
        assert_eq!(
            &bytes[..],
            &[
                0, 0, 0, 13, // size
                0, 0, 0, 6, // branch
                0, 0, 0, 0, 0, 0, 0, 99, // cluster peer id
                144, // op
                0, 0, 0, 0, 0, 0, 0, 7, // rpc id
                0, 0, 0, 1, // error code
            ]
        );
        assert_eq!(decode_frame(&bytes).unwrap(), frame);
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        let encoder = FrameEncoder::new();
        let mut decoder = FrameDecoder::new();
        let mut buf = BytesMut::new();

        let original = pong_frame(3);
        encoder.encode(&original, &mut buf).unwrap();

        let frame = decoder.decode(&mut buf).unwrap().unwrap();
        assert_eq!(frame, original);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_multiple_frames() {
        let encoder = FrameEncoder::new();
        let mut decoder = FrameDecoder::new();
        let mut buf = BytesMut::new();

        let frames = vec![
            pong_frame(1),
            Frame::new(metadata(), 0, DestroyClusterPeerConnectionCommand::new(99).into()),
            pong_frame(2),
        ];
        for frame in &frames {
            encoder.encode(frame, &mut buf).unwrap();
        }

        for original in &frames {
            let frame = decoder.decode(&mut buf).unwrap().unwrap();
            assert_eq!(&frame, original);
        }
        assert!(decoder.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn test_partial_input() {
        let bytes = encode_frame(&pong_frame(5)).unwrap();
        let mut decoder = FrameDecoder::new();
        let mut buf = BytesMut::new();

        for (i, byte) in bytes.iter().enumerate() {
            buf.put_u8(*byte);
            let result = decoder.decode(&mut buf).unwrap();
            if i + 1 < bytes.len() {
                assert!(result.is_none(), "complete after {} bytes", i + 1);
            } else {
                assert_eq!(result.unwrap(), pong_frame(5));
            }
        }
        assert!(!decoder.is_mid_frame());
    }

    #[test]
    fn test_oversize_frame_rejected() {
        let mut decoder = FrameDecoder::with_max_frame_size(16);
        let mut buf = BytesMut::from(&encode_frame(&pong_frame(1)).unwrap()[..]);
        let err = decoder.decode(&mut buf).unwrap_err();
        assert!(matches!(err, FrameError::FrameTooLarge(_, 16)));

        let encoder = FrameEncoder::with_max_frame_size(16);
        let mut out = BytesMut::from(&b"keep"[..]);
        assert!(encoder.encode(&pong_frame(1), &mut out).is_err());
        assert_eq!(&out[..], b"keep");
    }

    #[test]
    fn test_unknown_opcode_in_frame() {
        let mut bytes = encode_frame(&pong_frame(1)).unwrap().to_vec();
        bytes[PREFIX_SIZE] = 156;
        match decode_frame(&bytes).unwrap_err() {
            FrameError::Codec(e) => assert_eq!(e.kind(), ErrorKind::UnknownOpcode),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_undersized_frame() {
        let mut buf = BytesMut::new();
        buf.put_u32(4);
        buf.put_u32(0);
        buf.put_u64(0);
        let err = FrameDecoder::new().decode(&mut buf).unwrap_err();
        assert_eq!(err, FrameError::Undersized(4));
    }

    #[test]
    fn test_payload_must_fill_frame() {
        let mut bytes = encode_frame(&pong_frame(1)).unwrap().to_vec();
        // Grow the declared size and append a stray byte inside the frame
        let size = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) + 1;
        bytes[..4].copy_from_slice(&size.to_be_bytes());
        bytes.push(0);
        let err = decode_frame(&bytes).unwrap_err();
        match err {
            FrameError::Codec(e) => assert_eq!(e.kind(), ErrorKind::MalformedMessage),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
