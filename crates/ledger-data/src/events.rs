//! Domain events and ledger records derived from block execution.

use std::collections::BTreeSet;
use std::fmt;

use alloy::primitives::{Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};

use crate::types::{BlockHeader, Transaction, TxLog};

/// `pc` used by ledger records that do not originate from an execution event.
pub const NO_PC: i64 = -1;

/// Token standard a contract was classified as. Exactly one per contract.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ContractType {
    #[serde(rename = "ERC1155")]
    Erc1155,
    #[serde(rename = "ERC721")]
    Erc721,
    #[serde(rename = "ERC777")]
    Erc777,
    #[serde(rename = "ERC20")]
    Erc20,
    #[default]
    #[serde(rename = "GENERIC")]
    Generic,
}

impl fmt::Display for ContractType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Erc1155 => "ERC1155",
            Self::Erc721 => "ERC721",
            Self::Erc777 => "ERC777",
            Self::Erc20 => "ERC20",
            Self::Generic => "GENERIC",
        };
        f.write_str(name)
    }
}

/// Finer-grained interface facts; several may hold for one contract.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ContractCapability {
    #[serde(rename = "ERC1155")]
    Erc1155,
    #[serde(rename = "ERC1155_TOKEN_RECEIVER")]
    Erc1155TokenReceiver,
    #[serde(rename = "ERC777")]
    Erc777,
    #[serde(rename = "ERC165")]
    Erc165,
    #[serde(rename = "ERC721")]
    Erc721,
    #[serde(rename = "ERC721_METADATA")]
    Erc721Metadata,
    #[serde(rename = "ERC721_ENUMERABLE")]
    Erc721Enumerable,
    #[serde(rename = "ERC20")]
    Erc20,
    #[serde(rename = "ERC20_DETAILED")]
    Erc20Detailed,
    #[serde(rename = "ERC20_BURNABLE")]
    Erc20Burnable,
    #[serde(rename = "ERC20_MINTABLE")]
    Erc20Mintable,
    #[serde(rename = "ERC20_PAUSABLE")]
    Erc20Pausable,
    #[serde(rename = "ERC20_CAPPED")]
    Erc20Capped,
}

impl fmt::Display for ContractCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Erc1155 => "ERC1155",
            Self::Erc1155TokenReceiver => "ERC1155_TOKEN_RECEIVER",
            Self::Erc777 => "ERC777",
            Self::Erc165 => "ERC165",
            Self::Erc721 => "ERC721",
            Self::Erc721Metadata => "ERC721_METADATA",
            Self::Erc721Enumerable => "ERC721_ENUMERABLE",
            Self::Erc20 => "ERC20",
            Self::Erc20Detailed => "ERC20_DETAILED",
            Self::Erc20Burnable => "ERC20_BURNABLE",
            Self::Erc20Mintable => "ERC20_MINTABLE",
            Self::Erc20Pausable => "ERC20_PAUSABLE",
            Self::Erc20Capped => "ERC20_CAPPED",
        };
        f.write_str(name)
    }
}

/// Token metadata read through standard getters. Unset means "not discovered".
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractMetadata {
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub decimals: Option<u8>,
    pub total_supply: Option<U256>,
    pub granularity: Option<U256>,
    pub cap: Option<U256>,
}

/// Classification accumulator: threaded through every classifier transition.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub contract_type: ContractType,
    pub capabilities: BTreeSet<ContractCapability>,
    pub metadata: ContractMetadata,
}

impl Classification {
    /// Returns the accumulator with `capability` added.
    pub fn with_capability(mut self, capability: ContractCapability) -> Self {
        self.capabilities.insert(capability);
        self
    }

    /// Returns the accumulator with the type set and its matching capability added.
    pub fn with_type(mut self, contract_type: ContractType, capability: ContractCapability) -> Self {
        self.contract_type = contract_type;
        self.capabilities.insert(capability);
        self
    }
}

/// A contract created by CREATE/CREATE2 or a contract-creation transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractCreated {
    /// Account that executed the creation.
    pub originator: Address,
    pub contract_address: Address,
    /// Deployed (runtime) bytecode.
    pub code: Bytes,
    /// Value endowed at creation.
    pub amount: U256,
    pub pc: u64,
    pub transaction_hash: Option<B256>,
    /// Filled in by classification.
    pub contract_type: Option<ContractType>,
    pub capabilities: BTreeSet<ContractCapability>,
    pub metadata: Option<ContractMetadata>,
}

impl ContractCreated {
    /// Creation event with classification fields still unset.
    pub fn new(
        originator: Address,
        contract_address: Address,
        code: Bytes,
        amount: U256,
        pc: u64,
        transaction_hash: Option<B256>,
    ) -> Self {
        Self {
            originator,
            contract_address,
            code,
            amount,
            pc,
            transaction_hash,
            contract_type: None,
            capabilities: BTreeSet::new(),
            metadata: None,
        }
    }

    /// Attaches a classification result.
    pub fn classified(self, classification: Classification) -> Self {
        Self {
            contract_type: Some(classification.contract_type),
            capabilities: classification.capabilities,
            metadata: Some(classification.metadata),
            ..self
        }
    }
}

/// A successful self-destruct.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractDestroyed {
    pub contract_address: Address,
    pub refund_address: Address,
    /// Balance held right before the self-destruct executed.
    pub refund_amount: U256,
    pub pc: u64,
    pub transaction_hash: Option<B256>,
}

/// A value-bearing CALL/CALLCODE below the transaction's root frame.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InternalTransaction {
    pub from_address: Address,
    pub to_address: Address,
    pub amount: U256,
    pub pc: u64,
    pub transaction_hash: Option<B256>,
}

/// How a transaction's execution ended.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExecutionOutcome {
    Success,
    Revert { reason: Option<String> },
    Halt { reason: String },
}

impl ExecutionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

impl fmt::Display for ExecutionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => f.write_str("success"),
            Self::Revert { reason: Some(reason) } => write!(f, "revert ({reason})"),
            Self::Revert { reason: None } => f.write_str("revert"),
            Self::Halt { reason } => write!(f, "halt ({reason})"),
        }
    }
}

/// Everything derived from one transaction's execution.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionTrace {
    pub transaction: Transaction,
    /// Position of the transaction in its block.
    pub transaction_index: usize,
    pub outcome: ExecutionOutcome,
    pub contracts_created: Vec<ContractCreated>,
    pub contracts_destroyed: Vec<ContractDestroyed>,
    pub internal_transactions: Vec<InternalTransaction>,
    pub touched_accounts: BTreeSet<Address>,
    /// Receipt logs, kept for token-event parsing.
    pub logs: Vec<TxLog>,
}

/// Reward credited to the block's own coinbase or to an ommer's coinbase.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reward {
    /// Block hash for the coinbase reward, ommer hash for ommer rewards.
    pub hash: B256,
    pub amount: U256,
}

/// Fee paid by one transaction to the coinbase.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionFee {
    pub transaction_hash: B256,
    pub transaction_index: usize,
    pub sender: Address,
    pub gas_used: u64,
    pub fee: U256,
}

/// Everything derived from one block's execution.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockTrace {
    pub header: BlockHeader,
    /// Coinbase reward first, then ommer rewards in body order.
    pub rewards: Vec<Reward>,
    pub transaction_traces: Vec<TransactionTrace>,
    /// One entry per transaction, in block order.
    pub fees_by_transaction: Vec<TransactionFee>,
    pub total_fees: U256,
}

impl BlockTrace {
    /// Reward keyed by `hash`, if any.
    pub fn reward_for(&self, hash: B256) -> Option<U256> {
        self.rewards
            .iter()
            .find(|reward| reward.hash == hash)
            .map(|reward| reward.amount)
    }

    /// Union of every transaction's touched accounts.
    pub fn touched_accounts(&self) -> BTreeSet<Address> {
        self.transaction_traces
            .iter()
            .flat_map(|trace| trace.touched_accounts.iter().copied())
            .collect()
    }
}

/// Kind of value movement a [`BalanceDelta`] records.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeltaType {
    BlockReward,
    OmmerReward,
    Tx,
    TxFee,
    InternalTx,
    TokenTransfer,
    ContractCreation,
    ContractDestruction,
}

impl DeltaType {
    /// True for deltas that move the chain's native currency.
    pub fn is_native(&self) -> bool {
        !matches!(self, Self::TokenTransfer)
    }
}

impl fmt::Display for DeltaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::BlockReward => "BLOCK_REWARD",
            Self::OmmerReward => "OMMER_REWARD",
            Self::Tx => "TX",
            Self::TxFee => "TX_FEE",
            Self::InternalTx => "INTERNAL_TX",
            Self::TokenTransfer => "TOKEN_TRANSFER",
            Self::ContractCreation => "CONTRACT_CREATION",
            Self::ContractDestruction => "CONTRACT_DESTRUCTION",
        };
        f.write_str(name)
    }
}

/// One entry of a block's value-movement ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceDelta {
    pub delta_type: DeltaType,
    /// Ordering key within the transaction; [`NO_PC`] when not event-derived.
    pub pc: i64,
    pub transaction_hash: Option<B256>,
    pub transaction_index: Option<usize>,
    /// Token contract, for token movements.
    pub contract_address: Option<Address>,
    pub from: Option<Address>,
    pub to: Option<Address>,
    pub amount: Option<U256>,
    pub token_id: Option<U256>,
}

impl BalanceDelta {
    /// Empty delta of the given type; callers fill the fields they know.
    pub fn new(delta_type: DeltaType) -> Self {
        Self {
            delta_type,
            pc: NO_PC,
            transaction_hash: None,
            transaction_index: None,
            contract_address: None,
            from: None,
            to: None,
            amount: None,
            token_id: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_accumulates_by_value() {
        let classification = Classification::default()
            .with_capability(ContractCapability::Erc165)
            .with_type(ContractType::Erc1155, ContractCapability::Erc1155);

        assert_eq!(classification.contract_type, ContractType::Erc1155);
        assert_eq!(
            classification.capabilities.iter().copied().collect::<Vec<_>>(),
            vec![ContractCapability::Erc1155, ContractCapability::Erc165]
        );
        assert_eq!(classification.metadata, ContractMetadata::default());
    }

    #[test]
    fn classified_creation_keeps_event_fields() {
        let created = ContractCreated::new(
            Address::repeat_byte(1),
            Address::repeat_byte(2),
            Bytes::from_static(&[0x60, 0x00]),
            U256::from(7),
            3,
            None,
        );
        let classified = created.clone().classified(Classification::default());

        assert_eq!(classified.contract_type, Some(ContractType::Generic));
        assert_eq!(classified.amount, created.amount);
        assert_eq!(classified.pc, 3);
    }

    #[test]
    fn delta_type_serializes_screaming_snake() {
        let json = serde_json::to_string(&DeltaType::ContractDestruction).expect("serializes");
        assert_eq!(json, "\"CONTRACT_DESTRUCTION\"");
        assert_eq!(DeltaType::TxFee.to_string(), "TX_FEE");
        assert!(!DeltaType::TokenTransfer.is_native());
    }
}
