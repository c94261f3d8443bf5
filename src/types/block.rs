//! Blocks, headers, receipts and cross-shard deposits
//!
//! These are the chain records the cluster messages carry. Validation and
//! hashing are the business-logic side's concern.

use crate::codec::{blob, list, Inline};

use super::{Address, Branch, Transaction, H256, U256};

record! {
    /// Header of a shard-chain block
    pub struct MinorBlockHeader {
        version: u32,
        branch: Branch,
        height: u64,
        coinbase_address: Address,
        coinbase_amount: U256,
        hash_prev_minor_block: H256,
        hash_prev_root_block: H256,
        hash_meta: H256,
        create_time: u64,
        difficulty: u64,
        nonce: u64,
    }
}

record! {
    /// Shard-block data committed to by `MinorBlockHeader::hash_meta`
    pub struct MinorBlockMeta {
        hash_merkle_root: H256,
        hash_evm_state_root: H256,
        hash_evm_receipt_root: H256,
        evm_gas_limit: U256,
        evm_gas_used: U256,
        evm_cross_shard_receive_gas_used: U256,
        extra_data: Vec<u8> => blob(2),
    }
}

record! {
    /// Shard-chain block
    pub struct MinorBlock {
        header: MinorBlockHeader,
        meta: MinorBlockMeta,
        tx_list: Vec<Transaction> => list(4, Inline),
    }
}

impl MinorBlock {
    pub fn branch(&self) -> Branch {
        self.header.branch
    }

    pub fn height(&self) -> u64 {
        self.header.height
    }
}

record! {
    /// Header of a root-chain block
    pub struct RootBlockHeader {
        version: u32,
        height: u32,
        shard_info: u32,
        hash_prev_block: H256,
        hash_merkle_root: H256,
        coinbase_address: Address,
        coinbase_amount: U256,
        create_time: u64,
        difficulty: u64,
        nonce: u32,
    }
}

record! {
    /// Root-chain block: confirms an ordered list of shard headers
    pub struct RootBlock {
        header: RootBlockHeader,
        minor_block_header_list: Vec<MinorBlockHeader> => list(4, Inline),
    }
}

impl RootBlock {
    pub fn height(&self) -> u32 {
        self.header.height
    }
}

record! {
    /// Value moving from one shard to another
    pub struct CrossShardTransactionDeposit {
        tx_hash: H256,
        from_address: Address,
        to_address: Address,
        value: U256,
        gas_price: U256,
    }
}

record! {
    /// Deposits produced by one source block for one destination shard
    pub struct CrossShardTransactionList {
        tx_list: Vec<CrossShardTransactionDeposit> => list(4, Inline),
    }
}

record! {
    /// Execution outcome of a committed transaction
    pub struct TransactionReceipt {
        success: Vec<u8> => blob(1),
        gas_used: u64,
        prev_gas_used: u64,
        contract_address: Address,
    }
}

impl TransactionReceipt {
    /// Whether execution succeeded. An empty status counts as failure.
    pub fn is_success(&self) -> bool {
        self.success.first().is_some_and(|b| *b != 0)
    }
}
