//! Block bundle input types: what the execution engine hands us for one block.

use std::collections::BTreeMap;

use alloy::primitives::{Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};

use crate::error::TraceError;
use crate::trace::FlatTrace;

/// Header fields the tracer and the reward arithmetic need.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    /// Block number.
    pub number: u64,
    /// Block hash.
    pub hash: B256,
    /// Parent block hash.
    #[serde(default)]
    pub parent_hash: B256,
    /// Miner/coinbase address receiving rewards and fees.
    pub coinbase: Address,
    /// Timestamp in unix seconds.
    #[serde(default)]
    pub timestamp: u64,
    /// Gas limit.
    #[serde(default)]
    pub gas_limit: u64,
    /// Base fee per gas (post London only).
    #[serde(default)]
    pub base_fee_per_gas: Option<U256>,
    /// Proof-of-work difficulty (zero post merge).
    #[serde(default)]
    pub difficulty: U256,
}

impl BlockHeader {
    /// Returns true for block zero.
    pub fn is_genesis(&self) -> bool {
        self.number == 0
    }
}

/// Uncle header included by a block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OmmerHeader {
    /// Ommer block hash.
    pub hash: B256,
    /// Ommer block number.
    pub number: u64,
    /// Ommer miner address.
    pub coinbase: Address,
}

/// Transaction as included in a block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Transaction hash.
    pub hash: B256,
    /// Sender address.
    pub from: Address,
    /// Recipient address (None for contract creation).
    #[serde(default)]
    pub to: Option<Address>,
    /// Value transferred in Wei.
    #[serde(default)]
    pub value: U256,
    /// Gas price paid in Wei.
    #[serde(default)]
    pub gas_price: U256,
    /// Gas limit.
    #[serde(default)]
    pub gas_limit: u64,
    /// Sender nonce.
    #[serde(default)]
    pub nonce: u64,
    /// Calldata, or init code for contract creation.
    #[serde(default)]
    pub input: Bytes,
}

impl Transaction {
    /// Returns true when the transaction deploys a contract.
    pub fn is_contract_creation(&self) -> bool {
        self.to.is_none()
    }

    /// Address of the contract deployed by this transaction, if it is a creation.
    pub fn contract_address(&self) -> Option<Address> {
        self.is_contract_creation()
            .then(|| self.from.create(self.nonce))
    }

    /// Where the transaction's value goes: the callee, or the created contract.
    pub fn recipient(&self) -> Address {
        self.to.unwrap_or_else(|| self.from.create(self.nonce))
    }
}

/// Event log emitted during a transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxLog {
    /// Address of the contract that emitted the log.
    pub address: Address,
    /// Indexed topics; topic0 is the event signature for non-anonymous events.
    #[serde(default)]
    pub topics: Vec<B256>,
    /// Non-indexed log data.
    #[serde(default)]
    pub data: Bytes,
}

/// Transaction receipt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    /// Gas used by this and every earlier transaction in the block.
    pub cumulative_gas_used: u64,
    /// Execution status (true = success).
    #[serde(default = "default_success")]
    pub success: bool,
    /// Logs emitted by the transaction.
    #[serde(default)]
    pub logs: Vec<TxLog>,
}

fn default_success() -> bool {
    true
}

/// Account state entry used to seed or snapshot EVM state.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountState {
    /// Balance in Wei.
    #[serde(default)]
    pub balance: U256,
    /// Account nonce.
    #[serde(default)]
    pub nonce: u64,
    /// Deployed bytecode, if any.
    #[serde(default)]
    pub code: Option<Bytes>,
    /// Storage slots.
    #[serde(default)]
    pub storage: BTreeMap<U256, U256>,
}

/// Address-keyed world state allocation.
pub type StateAlloc = BTreeMap<Address, AccountState>;

/// Everything known about one block, as handed over by the execution engine.
///
/// `receipts`, `traces` and `total_difficulty` are optional on the wire so that
/// their absence surfaces as a [`TraceError::MissingData`] for the block rather
/// than a decode failure of the whole file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BlockBundle {
    /// Block header.
    pub header: BlockHeader,
    /// Total chain difficulty at this block.
    #[serde(default)]
    pub total_difficulty: Option<U256>,
    /// Ommer headers in body order.
    #[serde(default)]
    pub ommers: Vec<OmmerHeader>,
    /// Transactions in block order.
    #[serde(default)]
    pub transactions: Vec<Transaction>,
    /// Receipts in block order.
    #[serde(default)]
    pub receipts: Option<Vec<Receipt>>,
    /// Flattened call-tree traces, one list per transaction.
    #[serde(default)]
    pub traces: Option<Vec<Vec<FlatTrace>>>,
    /// State at the parent block.
    #[serde(default)]
    pub pre_state: StateAlloc,
    /// State after the block, used by classification probes.
    #[serde(default)]
    pub post_state: Option<StateAlloc>,
}

impl BlockBundle {
    /// Receipts of the block.
    ///
    /// # Errors
    /// Returns [`TraceError::MissingData`] if the bundle carries none.
    pub fn receipts(&self) -> Result<&[Receipt], TraceError> {
        self.receipts
            .as_deref()
            .ok_or_else(|| TraceError::missing(self.header.hash, "receipts"))
    }

    /// Flat traces of the block, one list per transaction.
    ///
    /// # Errors
    /// Returns [`TraceError::MissingData`] if the bundle carries none.
    pub fn traces(&self) -> Result<&[Vec<FlatTrace>], TraceError> {
        self.traces
            .as_deref()
            .ok_or_else(|| TraceError::missing(self.header.hash, "flat traces"))
    }

    /// Total difficulty at this block.
    ///
    /// # Errors
    /// Returns [`TraceError::MissingData`] if the bundle carries none.
    pub fn total_difficulty(&self) -> Result<U256, TraceError> {
        self.total_difficulty
            .ok_or_else(|| TraceError::missing(self.header.hash, "total difficulty"))
    }
}
