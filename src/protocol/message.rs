//! Cluster message definitions
//!
//! Every message the master and the slaves exchange. Each one is a
//! positional record: the field order below is the wire order.
//!
//! Responses start with an `error_code`. Payload fields after a non-zero
//! code are still decoded but carry no meaning.

use crate::codec::{blob, list, Inline};
use crate::types::{
    Address, Branch, CrossShardTransactionList, MinorBlock, MinorBlockHeader, RootBlock,
    ShardMask, Transaction, TransactionReceipt, H256, U256,
};

use super::error_code;

/// Responses that carry an application error code
pub trait Response {
    fn error_code(&self) -> u32;

    /// Whether the payload can be trusted
    fn is_success(&self) -> bool {
        self.error_code() == error_code::SUCCESS
    }
}

macro_rules! impl_response {
    ($($name:ident),* $(,)?) => {
        $(
            impl Response for $name {
                fn error_code(&self) -> u32 {
                    self.error_code
                }
            }
        )*
    };
}

// ---------------------------------------------------------------------------
// Bootstrap and topology
// ---------------------------------------------------------------------------

record! {
    /// Liveness probe, carrying the sender's shard coverage and root tip
    pub struct Ping {
        id: Vec<u8> => blob(4),
        shard_mask_list: Vec<ShardMask> => list(4, Inline),
        root_tip: RootBlock,
    }
}

impl Ping {
    /// A probe with no shard coverage comes from the root chain side
    pub fn is_from_root(&self) -> bool {
        self.shard_mask_list.iter().all(ShardMask::is_root)
    }
}

record! {
    /// Reply to [`Ping`], echoing the responder's identity and coverage
    pub struct Pong {
        id: Vec<u8> => blob(4),
        shard_mask_list: Vec<ShardMask> => list(4, Inline),
    }
}

record! {
    /// Where to reach a slave and which shards it serves
    pub struct SlaveInfo {
        id: Vec<u8> => blob(4),
        ip: u128,
        port: u16,
        shard_mask_list: Vec<ShardMask> => list(4, Inline),
    }
}

record! {
    /// Master asks a slave to open connections to its peers
    pub struct ConnectToSlavesRequest {
        slave_info_list: Vec<SlaveInfo> => list(4, Inline),
    }
}

record! {
    /// One result per requested slave, in request order. Empty means connected.
    pub struct ConnectToSlavesResponse {
        result_list: Vec<Vec<u8>> => list(4, blob(4)),
    }
}

impl ConnectToSlavesResponse {
    /// `(index, reason)` for each slave that could not be reached
    pub fn failures(&self) -> impl Iterator<Item = (usize, &[u8])> {
        self.result_list
            .iter()
            .enumerate()
            .filter(|(_, result)| !result.is_empty())
            .map(|(index, result)| (index, result.as_slice()))
    }
}

record! {
    /// Announce a new virtual connection to a cluster peer
    pub struct CreateClusterPeerConnectionRequest {
        cluster_peer_id: u64,
    }
}

record! {
    pub struct CreateClusterPeerConnectionResponse {
        error_code: u32,
    }
}

record! {
    /// Tear down a virtual peer connection. No response follows.
    pub struct DestroyClusterPeerConnectionCommand {
        cluster_peer_id: u64,
    }
}

// ---------------------------------------------------------------------------
// Chain and shard data
// ---------------------------------------------------------------------------

record! {
    /// Fetch a shard block by hash, or by height when the hash is zero
    pub struct GetMinorBlockRequest {
        branch: Branch,
        minor_block_hash: H256,
        height: u64,
    }
}

impl GetMinorBlockRequest {
    pub fn by_hash(branch: Branch, minor_block_hash: H256) -> Self {
        Self::new(branch, minor_block_hash, 0)
    }

    pub fn by_height(branch: Branch, height: u64) -> Self {
        Self::new(branch, H256::ZERO, height)
    }
}

record! {
    pub struct GetMinorBlockResponse {
        error_code: u32,
        minor_block: MinorBlock,
    }
}

record! {
    pub struct GetTransactionRequest {
        tx_hash: H256,
        branch: Branch,
    }
}

record! {
    /// The block holding the transaction and its position in `tx_list`
    pub struct GetTransactionResponse {
        error_code: u32,
        minor_block: MinorBlock,
        index: u32,
    }
}

record! {
    /// Run a transaction without committing it
    pub struct ExecuteTransactionRequest {
        tx: Transaction,
    }
}

record! {
    pub struct ExecuteTransactionResponse {
        error_code: u32,
        result: Vec<u8> => blob(4),
    }
}

record! {
    pub struct GetTransactionReceiptRequest {
        tx_hash: H256,
        branch: Branch,
    }
}

record! {
    pub struct GetTransactionReceiptResponse {
        error_code: u32,
        minor_block: MinorBlock,
        index: u32,
        receipt: TransactionReceipt,
    }
}

record! {
    /// Submit a root block; `expect_switch` is the sender's fork-choice guess
    pub struct AddRootBlockRequest {
        root_block: RootBlock,
        expect_switch: bool,
    }
}

record! {
    /// `switched` reports whether the root tip actually moved
    pub struct AddRootBlockResponse {
        error_code: u32,
        switched: bool,
    }
}

record! {
    /// Mining economics of one shard
    pub struct EcoInfo {
        branch: Branch,
        height: u64,
        coinbase_amount: U256,
        difficulty: u64,
        unconfirmed_headers_coinbase_amount: U256,
    }
}

record! {
    pub struct GetEcoInfoListRequest {}
}

record! {
    pub struct GetEcoInfoListResponse {
        error_code: u32,
        eco_info_list: Vec<EcoInfo> => list(4, Inline),
    }
}

record! {
    /// Block construction policy for artificial load
    pub struct ArtificialTxConfig {
        num_tx_per_block: u32,
        x_shard_tx_percent: u32,
    }
}

impl ArtificialTxConfig {
    /// `x_shard_tx_percent` is a percentage
    pub fn is_valid(&self) -> bool {
        self.x_shard_tx_percent <= 100
    }
}

record! {
    pub struct GetNextBlockToMineRequest {
        branch: Branch,
        address: Address,
        artificial_tx_config: ArtificialTxConfig,
    }
}

record! {
    pub struct GetNextBlockToMineResponse {
        error_code: u32,
        block: MinorBlock,
    }
}

record! {
    /// Submit a mined shard block, already serialized by the miner
    pub struct AddMinorBlockRequest {
        minor_block_data: Vec<u8> => blob(4),
    }
}

record! {
    pub struct AddMinorBlockResponse {
        error_code: u32,
    }
}

record! {
    /// Headers of one shard not yet confirmed by a root block
    pub struct HeadersInfo {
        branch: Branch,
        header_list: Vec<MinorBlockHeader> => list(4, Inline),
    }
}

record! {
    pub struct GetUnconfirmedHeadersRequest {}
}

record! {
    pub struct GetUnconfirmedHeadersResponse {
        error_code: u32,
        headers_info_list: Vec<HeadersInfo> => list(4, Inline),
    }
}

record! {
    pub struct GetAccountDataRequest {
        address: Address,
    }
}

record! {
    /// Per-shard view of an account
    pub struct AccountBranchData {
        branch: Branch,
        transaction_count: U256,
        balance: U256,
    }
}

record! {
    pub struct GetAccountDataResponse {
        error_code: u32,
        account_branch_data_list: Vec<AccountBranchData> => list(4, Inline),
    }
}

record! {
    pub struct AddTransactionRequest {
        tx: Transaction,
    }
}

record! {
    pub struct AddTransactionResponse {
        error_code: u32,
    }
}

record! {
    /// Rolling statistics a slave reports with every new shard header
    pub struct ShardStats {
        branch: Branch,
        height: u64,
        timestamp: u64,
        tx_count_60s: u32,
        pending_tx_count: u32,
        block_count_60s: u32,
        stale_block_count_60s: u32,
        last_block_time: u32,
    }
}

record! {
    /// Report a newly accepted shard header to the master
    pub struct AddMinorBlockHeaderRequest {
        minor_block_header: MinorBlockHeader,
        tx_count: u32,
        x_shard_tx_count: u32,
        shard_stats: ShardStats,
    }
}

record! {
    pub struct AddMinorBlockHeaderResponse {
        error_code: u32,
    }
}

// ---------------------------------------------------------------------------
// Shard-to-shard settlement
// ---------------------------------------------------------------------------

record! {
    /// Cross-shard deposits from block `minor_block_hash` for shard `branch`
    pub struct AddXshardTxListRequest {
        branch: Branch,
        minor_block_hash: H256,
        tx_list: CrossShardTransactionList,
    }
}

record! {
    pub struct AddXshardTxListResponse {
        error_code: u32,
    }
}

record! {
    /// Several [`AddXshardTxListRequest`]s in one round trip, applied in order
    pub struct BatchAddXshardTxListRequest {
        add_xshard_tx_list_request_list: Vec<AddXshardTxListRequest> => list(4, Inline),
    }
}

record! {
    pub struct BatchAddXshardTxListResponse {
        error_code: u32,
    }
}

record! {
    /// Ask a slave to pull the listed blocks from cluster peer `cluster_peer_id`
    pub struct SyncMinorBlockListRequest {
        minor_block_hash_list: Vec<H256> => list(4, Inline),
        branch: Branch,
        cluster_peer_id: u64,
    }
}

record! {
    pub struct SyncMinorBlockListResponse {
        error_code: u32,
    }
}

impl_response!(
    CreateClusterPeerConnectionResponse,
    GetMinorBlockResponse,
    GetTransactionResponse,
    ExecuteTransactionResponse,
    GetTransactionReceiptResponse,
    AddRootBlockResponse,
    GetEcoInfoListResponse,
    GetNextBlockToMineResponse,
    AddMinorBlockResponse,
    GetUnconfirmedHeadersResponse,
    GetAccountDataResponse,
    AddTransactionResponse,
    AddMinorBlockHeaderResponse,
    AddXshardTxListResponse,
    BatchAddXshardTxListResponse,
    SyncMinorBlockListResponse,
);
