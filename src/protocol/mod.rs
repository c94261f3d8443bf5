//! Protocol module - Message catalog and opcode registry for cluster traffic
//!
//! A message on the wire is `[opcode: u8][payload]`:
//! - the opcode selects the message type via the registry
//! - the payload is the message record, fields concatenated in order
//!
//! Cluster opcodes sit above [`CLUSTER_OP_BASE`] so they can share a
//! connection with the peer-to-peer protocol's own opcodes.

mod message;
mod registry;

pub use message::*;
pub use registry::*;

/// First opcode value owned by the cluster protocol
pub const CLUSTER_OP_BASE: u8 = 128;

/// Opcodes inside the cluster range that must never be assigned
pub const RESERVED_OPCODES: [u8; 1] = [CLUSTER_OP_BASE + 28];

/// Application error codes carried in responses
pub mod error_code {
    pub const SUCCESS: u32 = 0;
}
