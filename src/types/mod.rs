//! Chain data types carried inside cluster messages
//!
//! - [`Branch`] / [`ShardMask`]: shard routing
//! - [`Address`]: account identity
//! - [`H256`] / [`U256`]: digests and amounts
//! - blocks, transactions, receipts and cross-shard deposits

mod address;
mod block;
mod shard;
mod transaction;
mod uint;

pub use address::*;
pub use block::*;
pub use shard::*;
pub use transaction::*;
pub use uint::*;
