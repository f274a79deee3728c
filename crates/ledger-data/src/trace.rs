//! Flattened call-tree trace entries (parity `trace_*` shape).
//!
//! Entry and call types are kept as plain strings: an unknown combination has
//! to reach the interpreter, which reports it with full block/tx context.

use alloy::primitives::{Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};

/// One node of a transaction's call tree, in depth-first order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlatTrace {
    /// Entry type: `call`, `create` or `suicide`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Path of this node in the call tree; empty for the root.
    #[serde(default)]
    pub trace_address: Vec<usize>,
    /// Number of direct children.
    #[serde(default)]
    pub subtraces: usize,
    /// Action payload.
    pub action: TraceAction,
    /// Result payload, absent on error.
    #[serde(default)]
    pub result: Option<TraceResult>,
    /// Error marker (e.g. "Reverted", "Out of gas").
    #[serde(default)]
    pub error: Option<String>,
    /// Block hash as reported by the engine.
    #[serde(default)]
    pub block_hash: Option<B256>,
    /// Transaction hash as reported by the engine.
    #[serde(default)]
    pub transaction_hash: Option<B256>,
}

impl FlatTrace {
    /// True for the transaction's own top-level frame.
    pub fn is_root(&self) -> bool {
        self.trace_address.is_empty()
    }
}

/// Union of call, create and suicide action fields.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceAction {
    /// `call`, `callcode`, `delegatecall` or `staticcall`.
    #[serde(default)]
    pub call_type: Option<String>,
    #[serde(default)]
    pub from: Option<Address>,
    #[serde(default)]
    pub to: Option<Address>,
    #[serde(default)]
    pub value: Option<U256>,
    #[serde(default)]
    pub gas: Option<U256>,
    #[serde(default)]
    pub input: Option<Bytes>,
    /// Init code of a create.
    #[serde(default)]
    pub init: Option<Bytes>,
    /// `create` or `create2`.
    #[serde(default)]
    pub creation_method: Option<String>,
    /// Self-destructed contract.
    #[serde(default)]
    pub address: Option<Address>,
    /// Beneficiary of a self-destruct.
    #[serde(default)]
    pub refund_address: Option<Address>,
    /// Balance moved by a self-destruct.
    #[serde(default)]
    pub balance: Option<U256>,
}

/// Result payload of a successful call or create.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceResult {
    /// Created contract address.
    #[serde(default)]
    pub address: Option<Address>,
    /// Deployed bytecode of a created contract.
    #[serde(default)]
    pub code: Option<Bytes>,
    /// Return data of a call.
    #[serde(default)]
    pub output: Option<Bytes>,
    #[serde(default)]
    pub gas_used: Option<U256>,
}
