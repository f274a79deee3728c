//! Post-hoc interpretation of flattened call-tree traces.
//!
//! Entries arrive depth-first. An entry whose own error flag is set, or whose
//! trace address has an errored prefix, sits in an error branch and is skipped
//! together with everything below it. `pc` is the entry's 1-based visitation
//! ordinal. A transaction whose receipt reports failure keeps no events.

use std::collections::HashSet;

use alloy::primitives::{B256, U256};
use ledger_data::trace::FlatTrace;
use ledger_data::types::Receipt;
use ledger_data::{
    BlockBundle, ContractCreated, ContractDestroyed, ExecutionOutcome, InternalTransaction,
    TraceError,
};

use super::{ExtractedTrace, TraceEvents, TraceExtractor};

/// Root error string engines report for an explicit REVERT.
const REVERTED: &str = "Reverted";

/// Walks one transaction's flat traces.
#[derive(Debug)]
pub struct FlatTraceParser {
    block_hash: B256,
    transaction_hash: B256,
    error_branches: HashSet<Vec<usize>>,
    visited: u64,
    events: TraceEvents,
}

impl FlatTraceParser {
    pub fn new(block_hash: B256, transaction_hash: B256) -> Self {
        Self {
            block_hash,
            transaction_hash,
            error_branches: HashSet::new(),
            visited: 0,
            events: TraceEvents::default(),
        }
    }

    fn in_error_branch(&self, trace_address: &[usize]) -> bool {
        (0..=trace_address.len()).any(|len| self.error_branches.contains(&trace_address[..len]))
    }

    fn unhandled(&self, entry: &FlatTrace) -> TraceError {
        tracing::warn!(
            tx_hash = %self.transaction_hash,
            trace_type = %entry.kind,
            call_type = ?entry.action.call_type,
            trace_address = ?entry.trace_address,
            "unhandled trace entry"
        );
        TraceError::UnhandledTrace {
            block_hash: self.block_hash,
            transaction_hash: self.transaction_hash,
            trace_type: entry.kind.clone(),
            call_type: entry.action.call_type.clone(),
            trace_address: entry.trace_address.clone(),
        }
    }

    /// Interprets the next entry.
    ///
    /// # Errors
    /// Returns [`TraceError::UnhandledTrace`] for an unknown (type, call type)
    /// or creation method, and [`TraceError::MissingData`] for a recognised
    /// entry lacking a field its event needs.
    pub fn apply(&mut self, entry: &FlatTrace) -> Result<(), TraceError> {
        self.visited += 1;
        let pc = self.visited;

        if entry.error.is_some() {
            self.error_branches.insert(entry.trace_address.clone());
        }
        if self.in_error_branch(&entry.trace_address) {
            tracing::trace!(
                tx_hash = %self.transaction_hash,
                trace_address = ?entry.trace_address,
                "skipping entry in error branch"
            );
            return Ok(());
        }

        let action = &entry.action;
        match (entry.kind.as_str(), action.call_type.as_deref()) {
            ("call", Some("call" | "callcode" | "delegatecall" | "staticcall"))
                if entry.is_root() => {}
            ("call", Some("call" | "callcode")) => {
                let amount = action.value.unwrap_or_default();
                if amount.is_zero() {
                    return Ok(());
                }
                self.events.internal_transactions.push(InternalTransaction {
                    from_address: action
                        .from
                        .ok_or_else(|| TraceError::missing(self.block_hash, "call sender"))?,
                    to_address: action
                        .to
                        .ok_or_else(|| TraceError::missing(self.block_hash, "call recipient"))?,
                    amount,
                    pc,
                    transaction_hash: Some(self.transaction_hash),
                });
            }
            ("call", Some("delegatecall" | "staticcall")) => {}
            ("create", _) => {
                if !matches!(action.creation_method.as_deref(), None | Some("create" | "create2")) {
                    return Err(self.unhandled(entry));
                }
                let result = entry.result.as_ref();
                let contract_address = result
                    .and_then(|result| result.address)
                    .ok_or_else(|| TraceError::missing(self.block_hash, "created contract address"))?;
                self.events.contracts_created.push(ContractCreated::new(
                    action
                        .from
                        .ok_or_else(|| TraceError::missing(self.block_hash, "creator"))?,
                    contract_address,
                    result.and_then(|result| result.code.clone()).unwrap_or_default(),
                    action.value.unwrap_or(U256::ZERO),
                    pc,
                    Some(self.transaction_hash),
                ));
            }
            ("suicide", _) => {
                self.events.contracts_destroyed.push(ContractDestroyed {
                    contract_address: action
                        .address
                        .ok_or_else(|| TraceError::missing(self.block_hash, "destroyed contract"))?,
                    refund_address: action
                        .refund_address
                        .ok_or_else(|| TraceError::missing(self.block_hash, "refund address"))?,
                    refund_amount: action.balance.unwrap_or_default(),
                    pc,
                    transaction_hash: Some(self.transaction_hash),
                });
            }
            _ => return Err(self.unhandled(entry)),
        }
        Ok(())
    }

    /// Events collected so far.
    pub fn events(&self) -> &TraceEvents {
        &self.events
    }

    /// Closes the transaction. Anything but [`ExecutionOutcome::Success`]
    /// discards the collected events, error markers or not.
    pub fn finish(self, outcome: ExecutionOutcome) -> ExtractedTrace {
        let events = if outcome.is_success() {
            self.events
        } else {
            if !self.events.is_empty() {
                tracing::debug!(
                    tx_hash = %self.transaction_hash,
                    ?outcome,
                    "failed receipt without root error, dropping events"
                );
            }
            TraceEvents::default()
        };
        events.into_trace(self.transaction_hash, outcome)
    }
}

/// Outcome from the receipt status and the root entry's error marker.
fn outcome(receipt: &Receipt, entries: &[FlatTrace]) -> ExecutionOutcome {
    if receipt.success {
        return ExecutionOutcome::Success;
    }
    let root_error = entries
        .iter()
        .find(|entry| entry.is_root())
        .and_then(|entry| entry.error.clone());
    match root_error {
        Some(error) if error == REVERTED => ExecutionOutcome::Revert {
            reason: Some(error),
        },
        Some(error) => ExecutionOutcome::Halt { reason: error },
        None => ExecutionOutcome::Revert { reason: None },
    }
}

/// [`TraceExtractor`] over the bundle's flat traces.
#[derive(Clone, Copy, Debug, Default)]
pub struct FlatTraceExtractor;

impl TraceExtractor for FlatTraceExtractor {
    #[tracing::instrument(skip_all, fields(block_number = bundle.header.number))]
    fn extract(&mut self, bundle: &BlockBundle) -> Result<Vec<ExtractedTrace>, TraceError> {
        let block_hash = bundle.header.hash;
        let traces = bundle.traces()?;
        let receipts = bundle.receipts()?;
        let tx_count = bundle.transactions.len();

        if traces.len() != tx_count {
            tracing::warn!(traces = traces.len(), tx_count, "trace count mismatch");
            return Err(TraceError::count_mismatch(
                block_hash,
                "traces vs transactions",
                tx_count,
                traces.len(),
            ));
        }
        if receipts.len() != tx_count {
            tracing::warn!(receipts = receipts.len(), tx_count, "receipt count mismatch");
            return Err(TraceError::count_mismatch(
                block_hash,
                "receipts vs transactions",
                tx_count,
                receipts.len(),
            ));
        }

        let mut extracted = Vec::with_capacity(tx_count);
        for ((tx, entries), receipt) in bundle.transactions.iter().zip(traces).zip(receipts) {
            let mut parser = FlatTraceParser::new(block_hash, tx.hash);
            for entry in entries {
                parser.apply(entry)?;
            }
            extracted.push(parser.finish(outcome(receipt, entries)));
        }

        tracing::debug!(transactions = extracted.len(), "interpreted flat traces");
        Ok(extracted)
    }
}
