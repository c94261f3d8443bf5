//! cluster-rpc - Wire protocol for master/slave coordination in a sharded chain
//!
//! - [`codec`]: deterministic big-endian encoding of records, blobs and lists
//! - [`types`]: chain records carried inside messages
//! - [`protocol`]: the message catalog and opcode registry
//! - [`network`]: stream framing, connections and handler dispatch
//! - [`config`]: TOML configuration

#[macro_use]
pub mod codec;
pub mod config;
pub mod network;
pub mod protocol;
pub mod types;
