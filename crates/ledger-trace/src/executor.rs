//! Read-only simulated call seam.
//!
//! The classifier only ever talks to contracts through [`SimulatedCallExecutor`].
//! The host engine decides how a call against historical state is executed.

use alloy::primitives::{Address, Bytes, B256};

/// A read-only call against the state identified by `block_hash`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SimulatedCall {
    pub to: Address,
    pub input: Bytes,
    pub block_hash: B256,
    pub gas_limit: u64,
}

/// Result of a simulated call that the host was able to run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CallOutput {
    pub output: Bytes,
    pub success: bool,
}

impl CallOutput {
    /// Output bytes of a successful call.
    pub fn successful_output(self) -> Option<Bytes> {
        self.success.then_some(self.output)
    }
}

/// Executes read-only calls against historical state.
///
/// Implementations must be side-effect free: every call sees the same snapshot
/// regardless of what ran before it.
pub trait SimulatedCallExecutor: Send + Sync {
    /// Runs `call`; `None` when the host could not execute it at all
    /// (unknown state reference, engine failure).
    fn simulate(&self, call: &SimulatedCall) -> Option<CallOutput>;
}
