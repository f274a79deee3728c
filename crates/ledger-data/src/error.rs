//! Failure taxonomy for block tracing.
//!
//! Negative probe results are not errors and never show up here. Everything in
//! [`TraceError`] aborts the block it was raised for.

use alloy::primitives::B256;
use thiserror::Error;

/// Fatal, block-scoped tracing errors.
#[derive(Debug, Error)]
pub enum TraceError {
    /// Two upstream collections that must line up do not.
    #[error("count mismatch in block {block_hash}: {what} (expected {expected}, got {actual})")]
    CountMismatch {
        block_hash: B256,
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    /// A flat trace entry whose (type, call type) combination is not understood.
    #[error(
        "unhandled trace. block hash = {block_hash}, tx hash = {transaction_hash}, \
         trace type = {trace_type}, call type = {call_type:?}, trace address = {trace_address:?}"
    )]
    UnhandledTrace {
        block_hash: B256,
        transaction_hash: B256,
        trace_type: String,
        call_type: Option<String>,
        trace_address: Vec<usize>,
    },

    /// Required upstream data is absent.
    #[error("required value missing for block {block_hash}: {what}")]
    MissingData { block_hash: B256, what: &'static str },

    /// The host engine refused to execute a transaction during replay.
    #[error("execution failed in block {block_hash}, tx {transaction_hash}: {reason}")]
    Execution {
        block_hash: B256,
        transaction_hash: B256,
        reason: String,
    },

    /// Reward inputs that cannot be turned into a reward map.
    #[error("invalid reward input at block {block_number}: {reason}")]
    Reward { block_number: u64, reason: String },
}

impl TraceError {
    /// Shorthand for [`TraceError::MissingData`].
    pub fn missing(block_hash: B256, what: &'static str) -> Self {
        Self::MissingData { block_hash, what }
    }

    /// Shorthand for [`TraceError::CountMismatch`].
    pub fn count_mismatch(
        block_hash: B256,
        what: &'static str,
        expected: usize,
        actual: usize,
    ) -> Self {
        Self::CountMismatch {
            block_hash,
            what,
            expected,
            actual,
        }
    }
}
