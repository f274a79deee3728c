//! Trace interpretation: execution traces in, contract lifecycle and internal
//! transfer events out.
//!
//! Two strategies implement [`TraceExtractor`]:
//! - [`flat::FlatTraceExtractor`] walks the engine's flattened call-tree traces;
//! - [`live::ReplayExtractor`] re-executes the block with an inspector attached.
//!
//! Both drop every event raised inside a reverted or halted call frame.

pub mod flat;
pub mod live;

use std::collections::BTreeSet;

use alloy::primitives::{Address, B256};
use ledger_data::{
    BlockBundle, ContractCreated, ContractDestroyed, ExecutionOutcome, InternalTransaction,
    TraceError,
};

pub use flat::FlatTraceExtractor;
pub use live::ReplayExtractor;

/// Events surviving one transaction's execution, in emission order per kind.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TraceEvents {
    pub contracts_created: Vec<ContractCreated>,
    pub contracts_destroyed: Vec<ContractDestroyed>,
    pub internal_transactions: Vec<InternalTransaction>,
}

impl TraceEvents {
    pub fn is_empty(&self) -> bool {
        self.contracts_created.is_empty()
            && self.contracts_destroyed.is_empty()
            && self.internal_transactions.is_empty()
    }

    /// Moves every event of `other` behind the events already held.
    pub fn append(&mut self, mut other: TraceEvents) {
        self.contracts_created.append(&mut other.contracts_created);
        self.contracts_destroyed.append(&mut other.contracts_destroyed);
        self.internal_transactions
            .append(&mut other.internal_transactions);
    }

    /// Every address appearing as an endpoint of an event.
    pub fn touched_accounts(&self) -> BTreeSet<Address> {
        let created = self
            .contracts_created
            .iter()
            .flat_map(|event| [event.originator, event.contract_address]);
        let destroyed = self
            .contracts_destroyed
            .iter()
            .flat_map(|event| [event.contract_address, event.refund_address]);
        let internal = self
            .internal_transactions
            .iter()
            .flat_map(|event| [event.from_address, event.to_address]);
        created.chain(destroyed).chain(internal).collect()
    }

    pub fn into_trace(self, transaction_hash: B256, outcome: ExecutionOutcome) -> ExtractedTrace {
        ExtractedTrace {
            transaction_hash,
            outcome,
            touched_accounts: self.touched_accounts(),
            contracts_created: self.contracts_created,
            contracts_destroyed: self.contracts_destroyed,
            internal_transactions: self.internal_transactions,
        }
    }
}

/// Interpreter output for one transaction, before classification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtractedTrace {
    pub transaction_hash: B256,
    pub outcome: ExecutionOutcome,
    pub contracts_created: Vec<ContractCreated>,
    pub contracts_destroyed: Vec<ContractDestroyed>,
    pub internal_transactions: Vec<InternalTransaction>,
    pub touched_accounts: BTreeSet<Address>,
}

/// A trace interpretation strategy.
pub trait TraceExtractor {
    /// Interprets every transaction of `bundle`, in block order.
    ///
    /// # Errors
    /// Returns a [`TraceError`] for inconsistent or unrecognised input; the
    /// whole block is then considered untraceable.
    fn extract(&mut self, bundle: &BlockBundle) -> Result<Vec<ExtractedTrace>, TraceError>;
}
