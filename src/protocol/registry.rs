//! Opcode registry
//!
//! Maps each cluster opcode to exactly one message type and back. The table
//! is declared once below and expanded at compile time; nothing registers at
//! runtime.
//!
//! Pairing convention: an odd offset is a request, `offset + 1` is its
//! response. `DestroyClusterPeerConnectionCommand` is one-way.

use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};

use crate::codec::{CodecError, CodecResult, Encode, Record};

use super::message::*;
use super::CLUSTER_OP_BASE;

/// Offset of the only one-way message
const COMMAND_OFFSET: u8 = 27;

/// Role of a message in its exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpKind {
    Request,
    Response,
    /// Fire-and-forget, no response follows
    Command,
}

/// Which part of the cluster a message serves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    /// Master to slave topology and connection lifecycle
    Control,
    /// Blocks, transactions and account data between master and slaves
    DataSync,
    /// Slave to slave cross-shard settlement
    Settlement,
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Route::Control => write!(f, "control"),
            Route::DataSync => write!(f, "data-sync"),
            Route::Settlement => write!(f, "settlement"),
        }
    }
}

/// Message types that have an opcode
///
/// Only registered types implement this, so asking for the opcode of anything
/// else fails to compile.
pub trait ClusterPayload: Record + Into<ClusterMessage> {
    const OP: ClusterOp;
}

macro_rules! cluster_ops {
    ($($offset:literal => $name:ident @ $route:ident),* $(,)?) => {
        /// Registered cluster opcode
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[repr(u8)]
        pub enum ClusterOp {
            $($name = CLUSTER_OP_BASE + $offset,)*
        }

        impl ClusterOp {
            /// Every registered opcode, ascending
            pub const ALL: &'static [ClusterOp] = &[$(ClusterOp::$name),*];

            pub fn name(self) -> &'static str {
                match self {
                    $(ClusterOp::$name => stringify!($name),)*
                }
            }

            pub fn route(self) -> Route {
                match self {
                    $(ClusterOp::$name => Route::$route,)*
                }
            }
        }

        /// Any cluster message, tagged by type
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub enum ClusterMessage {
            $($name($name),)*
        }

        $(
            impl ClusterPayload for $name {
                const OP: ClusterOp = ClusterOp::$name;
            }

            impl From<$name> for ClusterMessage {
                fn from(message: $name) -> Self {
                    ClusterMessage::$name(message)
                }
            }
        )*

        impl ClusterMessage {
            pub fn op(&self) -> ClusterOp {
                match self {
                    $(ClusterMessage::$name(_) => ClusterOp::$name,)*
                }
            }

            /// Append the payload, without the opcode
            pub fn encode(&self, buf: &mut BytesMut) -> CodecResult<()> {
                match self {
                    $(ClusterMessage::$name(message) => message.encode(buf),)*
                }
            }

            /// Decode a complete payload as the type registered for `op`
            pub fn decode(op: ClusterOp, payload: &[u8]) -> CodecResult<Self> {
                match op {
                    $(ClusterOp::$name => $name::from_bytes(payload).map(ClusterMessage::$name),)*
                }
            }

            #[cfg(test)]
            pub(crate) fn sample(op: ClusterOp) -> Self {
                match op {
                    $(ClusterOp::$name => ClusterMessage::$name($name::default()),)*
                }
            }
        }
    };
}

cluster_ops! {
    1 => Ping @ Control,
    2 => Pong @ Control,
    3 => ConnectToSlavesRequest @ Control,
    4 => ConnectToSlavesResponse @ Control,
    5 => AddRootBlockRequest @ DataSync,
    6 => AddRootBlockResponse @ DataSync,
    7 => GetEcoInfoListRequest @ DataSync,
    8 => GetEcoInfoListResponse @ DataSync,
    9 => GetNextBlockToMineRequest @ DataSync,
    10 => GetNextBlockToMineResponse @ DataSync,
    11 => GetUnconfirmedHeadersRequest @ DataSync,
    12 => GetUnconfirmedHeadersResponse @ DataSync,
    13 => GetAccountDataRequest @ DataSync,
    14 => GetAccountDataResponse @ DataSync,
    15 => AddTransactionRequest @ DataSync,
    16 => AddTransactionResponse @ DataSync,
    17 => AddMinorBlockHeaderRequest @ DataSync,
    18 => AddMinorBlockHeaderResponse @ DataSync,
    19 => AddXshardTxListRequest @ Settlement,
    20 => AddXshardTxListResponse @ Settlement,
    21 => SyncMinorBlockListRequest @ Settlement,
    22 => SyncMinorBlockListResponse @ Settlement,
    23 => AddMinorBlockRequest @ DataSync,
    24 => AddMinorBlockResponse @ DataSync,
    25 => CreateClusterPeerConnectionRequest @ Control,
    26 => CreateClusterPeerConnectionResponse @ Control,
    27 => DestroyClusterPeerConnectionCommand @ Control,
    // 28 is reserved
    29 => GetMinorBlockRequest @ DataSync,
    30 => GetMinorBlockResponse @ DataSync,
    31 => GetTransactionRequest @ DataSync,
    32 => GetTransactionResponse @ DataSync,
    33 => BatchAddXshardTxListRequest @ Settlement,
    34 => BatchAddXshardTxListResponse @ Settlement,
    35 => ExecuteTransactionRequest @ DataSync,
    36 => ExecuteTransactionResponse @ DataSync,
    37 => GetTransactionReceiptRequest @ DataSync,
    38 => GetTransactionReceiptResponse @ DataSync,
}

/// Opcode to type table, indexed by the raw byte
static LOOKUP: [Option<ClusterOp>; 256] = {
    let mut table = [None; 256];
    let mut i = 0;
    while i < ClusterOp::ALL.len() {
        let op = ClusterOp::ALL[i];
        table[op as usize] = Some(op);
        i += 1;
    }
    table
};

/// Resolve a raw opcode to its registered type
pub fn resolve(value: u8) -> CodecResult<ClusterOp> {
    LOOKUP[value as usize].ok_or(CodecError::UnknownOpcode(value))
}

impl ClusterOp {
    pub fn from_u8(value: u8) -> CodecResult<Self> {
        resolve(value)
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Position above [`CLUSTER_OP_BASE`]
    pub fn offset(self) -> u8 {
        self as u8 - CLUSTER_OP_BASE
    }

    pub fn kind(self) -> OpKind {
        match self.offset() {
            COMMAND_OFFSET => OpKind::Command,
            n if n % 2 == 1 => OpKind::Request,
            _ => OpKind::Response,
        }
    }

    /// The response a request expects, if any
    pub fn response_op(self) -> Option<ClusterOp> {
        match self.kind() {
            OpKind::Request => resolve(self as u8 + 1).ok(),
            _ => None,
        }
    }

    /// The request this response answers
    pub fn request_op(self) -> Option<ClusterOp> {
        match self.kind() {
            OpKind::Response => resolve(self as u8 - 1).ok(),
            _ => None,
        }
    }
}

impl TryFrom<u8> for ClusterOp {
    type Error = CodecError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        resolve(value)
    }
}

impl From<ClusterOp> for u8 {
    fn from(op: ClusterOp) -> Self {
        op as u8
    }
}

impl fmt::Display for ClusterOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Opcode registered for `T`
pub fn opcode_for<T: ClusterPayload>() -> u8 {
    T::OP as u8
}

impl ClusterMessage {
    /// Encode as `[opcode][payload]`
    pub fn to_wire(&self) -> CodecResult<Bytes> {
        let mut buf = BytesMut::new();
        buf.put_u8(self.op().as_u8());
        self.encode(&mut buf)?;
        Ok(buf.freeze())
    }

    /// Decode `[opcode][payload]`
    pub fn from_wire(bytes: &[u8]) -> CodecResult<Self> {
        let (&op, payload) = bytes
            .split_first()
            .ok_or(CodecError::Truncated { need: 1, have: 0 })?;
        Self::decode(resolve(op)?, payload)
    }

    pub fn kind(&self) -> OpKind {
        self.op().kind()
    }

    /// Whether `response` is the reply type this request expects
    pub fn expects(&self, response: ClusterOp) -> bool {
        self.op().response_op() == Some(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::ErrorKind;
    use crate::protocol::RESERVED_OPCODES;
    use crate::types::RootBlock;

    fn check_type<T: ClusterPayload>() {
        let op = resolve(opcode_for::<T>()).unwrap();
        assert_eq!(op, T::OP);
        assert_eq!(op.name(), T::NAME);
    }

    #[test]
    fn test_resolve_is_inverse_of_opcode_for() {
        check_type::<Ping>();
        check_type::<Pong>();
        check_type::<DestroyClusterPeerConnectionCommand>();
        check_type::<GetMinorBlockRequest>();
        check_type::<BatchAddXshardTxListRequest>();
        check_type::<GetTransactionReceiptResponse>();

        for op in ClusterOp::ALL {
            assert_eq!(resolve(op.as_u8()).unwrap(), *op);
            assert_eq!(ClusterMessage::sample(*op).op(), *op);
        }
    }

    #[test]
    fn test_table_shape() {
        assert_eq!(ClusterOp::ALL.len(), 37);
        assert_eq!(ClusterOp::Ping.as_u8(), 129);
        assert_eq!(ClusterOp::DestroyClusterPeerConnectionCommand.as_u8(), 155);
        assert_eq!(ClusterOp::GetMinorBlockRequest.as_u8(), 157);
        assert_eq!(ClusterOp::GetTransactionReceiptResponse.as_u8(), 166);
        assert!(ClusterOp::ALL.windows(2).all(|w| w[0] < w[1]));
        for reserved in RESERVED_OPCODES {
            assert!(ClusterOp::ALL.iter().all(|op| op.as_u8() != reserved));
        }
    }

    #[test]
    fn test_pairing() {
        for op in ClusterOp::ALL {
            match op.kind() {
                OpKind::Request => {
                    let response = op.response_op().unwrap();
                    assert_eq!(response.kind(), OpKind::Response);
                    assert_eq!(response.request_op(), Some(*op));
                    assert_eq!(response.route(), op.route());
                }
                OpKind::Response => assert!(op.request_op().is_some()),
                OpKind::Command => {
                    assert_eq!(*op, ClusterOp::DestroyClusterPeerConnectionCommand);
                    assert_eq!(op.response_op(), None);
                }
            }
        }
        assert_eq!(ClusterOp::Ping.response_op(), Some(ClusterOp::Pong));
        assert_eq!(ClusterOp::BatchAddXshardTxListRequest.route(), Route::Settlement);
    }

    #[test]
    fn test_unknown_opcode() {
        for value in [0u8, 1, 128, 156, 167, 255] {
            let err = resolve(value).unwrap_err();
            assert_eq!(err, CodecError::UnknownOpcode(value));
            assert_eq!(err.kind(), ErrorKind::UnknownOpcode);
        }
        let err = ClusterMessage::from_wire(&[156, 0, 0, 0, 0]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownOpcode);
        assert!(ClusterMessage::from_wire(&[]).unwrap_err().is_truncation());
    }

    #[test]
    fn test_every_type_roundtrips_on_the_wire() {
        for op in ClusterOp::ALL {
            let message = ClusterMessage::sample(*op);
            let wire = message.to_wire().unwrap();
            assert_eq!(wire[0], op.as_u8());
            assert_eq!(ClusterMessage::from_wire(&wire).unwrap(), message, "{op}");
        }
    }

    #[test]
    fn test_every_type_rejects_truncation() {
        for op in ClusterOp::ALL {
            let wire = ClusterMessage::sample(*op).to_wire().unwrap();
            for len in 1..wire.len() {
                let err = ClusterMessage::from_wire(&wire[..len]).unwrap_err();
                assert!(
                    matches!(err.kind(), ErrorKind::Truncated | ErrorKind::MalformedMessage),
                    "{op} cut to {len}: {err}"
                );
            }
        }
    }

    #[test]
    fn test_wrong_type_for_payload() {
        let pong = ClusterMessage::from(Pong::new(b"ab".to_vec(), Vec::new()));
        let wire = pong.to_wire().unwrap();
        // Same bytes under the Ping opcode: Ping expects a root block after the masks
        let err = ClusterMessage::decode(ClusterOp::Ping, &wire[1..]).unwrap_err();
        assert!(err.is_truncation());

        let ping = Ping::new(b"ab".to_vec(), Vec::new(), RootBlock::default());
        let ping = ClusterMessage::from(ping);
        assert!(ping.expects(ClusterOp::Pong));
        assert!(!ping.expects(ClusterOp::AddRootBlockResponse));
    }
}
