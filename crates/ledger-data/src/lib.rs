//! ledger-data crate
//!
//! Block bundle inputs, flat trace entries, the derived domain model
//! (contract lifecycle events, transaction/block traces, balance deltas),
//! the tracing error taxonomy and configuration.

pub mod blocks;
pub mod config;
pub mod error;
pub mod events;
pub mod trace;
pub mod types;

pub use config::{LedgerConfig, TraceStrategy};
pub use error::TraceError;
pub use events::{
    BalanceDelta, BlockTrace, Classification, ContractCapability, ContractCreated,
    ContractDestroyed, ContractMetadata, ContractType, DeltaType, ExecutionOutcome,
    InternalTransaction, TransactionTrace,
};
pub use trace::FlatTrace;
pub use types::{BlockBundle, BlockHeader, OmmerHeader, Receipt, Transaction, TxLog};
