//! Transactions
//!
//! Only the byte layout matters here. Signature checks and execution belong
//! to the shard that receives the transaction.

use std::fmt;

use bytes::BytesMut;

use crate::codec::{blob, list, CodecResult, Decode, Encode, Inline};
use crate::types::H256;

/// Length of a recoverable signature
pub const SIGNATURE_LEN: usize = 65;

/// Recoverable signature (r, s, v)
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Signature(pub [u8; SIGNATURE_LEN]);

impl Default for Signature {
    fn default() -> Self {
        Self([0u8; SIGNATURE_LEN])
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({})", hex::encode(self.0))
    }
}

impl Encode for Signature {
    fn encode(&self, buf: &mut BytesMut) -> CodecResult<()> {
        self.0.encode(buf)
    }
}

impl Decode for Signature {
    fn decode(buf: &mut &[u8]) -> CodecResult<Self> {
        Ok(Self(Decode::decode(buf)?))
    }
}

record! {
    /// Reference to an output of an earlier transaction
    pub struct TransactionInput {
        hash: H256,
        index: u8,
    }
}

record! {
    /// Opaque transaction body
    pub struct Code {
        code: Vec<u8> => blob(4),
    }
}

record! {
    pub struct Transaction {
        in_list: Vec<TransactionInput> => list(1, Inline),
        code: Code,
        sign_list: Vec<Signature> => list(1, Inline),
    }
}
