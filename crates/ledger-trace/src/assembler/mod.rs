//! Transaction and block trace assembly.
//!
//! Combines interpreter output with classification, rewards and fees.

pub mod rewards;

use alloy::primitives::B256;
use ledger_data::types::{Receipt, Transaction};
use ledger_data::{BlockBundle, BlockTrace, LedgerConfig, TraceError, TransactionTrace};

use crate::executor::SimulatedCallExecutor;
use crate::interpreter::ExtractedTrace;
use crate::tokens::TokenClassifier;

/// Assembles [`BlockTrace`]s, classifying every created contract on the way.
pub struct BlockTracer<'a> {
    config: &'a LedgerConfig,
    classifier: TokenClassifier<'a>,
}

impl<'a> BlockTracer<'a> {
    /// # Arguments
    /// * `config` - Reward schedule and probe settings
    /// * `executor` - Host answering classification probes; must know the
    ///   block hash of every traced block
    pub fn new(config: &'a LedgerConfig, executor: &'a dyn SimulatedCallExecutor) -> Self {
        Self {
            config,
            classifier: TokenClassifier::new(executor, config),
        }
    }

    /// Builds one transaction's trace and classifies its created contracts
    /// against the state identified by `block_hash`.
    pub fn transaction_trace(
        &self,
        block_hash: B256,
        transaction_index: usize,
        transaction: &Transaction,
        receipt: &Receipt,
        extracted: ExtractedTrace,
    ) -> TransactionTrace {
        let contracts_created = extracted
            .contracts_created
            .into_iter()
            .map(|created| {
                let output =
                    self.classifier
                        .classify(created.contract_address, &created.code, block_hash);
                created.classified(output.classification)
            })
            .collect();

        let mut touched_accounts = extracted.touched_accounts;
        touched_accounts.insert(transaction.from);
        touched_accounts.insert(transaction.recipient());

        TransactionTrace {
            transaction: transaction.clone(),
            transaction_index,
            outcome: extracted.outcome,
            contracts_created,
            contracts_destroyed: extracted.contracts_destroyed,
            internal_transactions: extracted.internal_transactions,
            touched_accounts,
            logs: receipt.logs.clone(),
        }
    }

    /// Assembles the block trace from one extracted trace per transaction.
    ///
    /// # Errors
    /// - [`TraceError::MissingData`] if the bundle carries no receipts
    /// - [`TraceError::CountMismatch`] if traces, receipts and transactions
    ///   do not line up, or cumulative gas decreases
    /// - [`TraceError::Reward`] for inconsistent ommers
    #[tracing::instrument(
        skip_all,
        fields(block_number = bundle.header.number, block_hash = %bundle.header.hash)
    )]
    pub fn trace(
        &self,
        bundle: &BlockBundle,
        extracted: Vec<ExtractedTrace>,
    ) -> Result<BlockTrace, TraceError> {
        let header = &bundle.header;
        let receipts = bundle.receipts()?;

        if extracted.len() != bundle.transactions.len() {
            tracing::warn!(
                traces = extracted.len(),
                tx_count = bundle.transactions.len(),
                "trace count mismatch"
            );
            return Err(TraceError::count_mismatch(
                header.hash,
                "traces vs transactions",
                bundle.transactions.len(),
                extracted.len(),
            ));
        }

        let fees_by_transaction =
            rewards::fees_by_transaction(header.hash, &bundle.transactions, receipts)?;
        let total_fees = rewards::total_fees(&fees_by_transaction);
        let rewards = rewards::block_rewards(header, &bundle.ommers, &self.config.rewards)?;

        let transaction_traces: Vec<_> = bundle
            .transactions
            .iter()
            .zip(receipts)
            .zip(extracted)
            .enumerate()
            .map(|(index, ((tx, receipt), extracted))| {
                self.transaction_trace(header.hash, index, tx, receipt, extracted)
            })
            .collect();

        let created: usize = transaction_traces
            .iter()
            .map(|trace| trace.contracts_created.len())
            .sum();
        tracing::info!(
            tx_count = transaction_traces.len(),
            contracts_created = created,
            rewards = rewards.len(),
            total_fees = %total_fees,
            "assembled block trace"
        );

        Ok(BlockTrace {
            header: header.clone(),
            rewards,
            transaction_traces,
            fees_by_transaction,
            total_fees,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::{CallOutput, SimulatedCall};
    use crate::interpreter::TraceEvents;
    use alloy::primitives::{Address, Bytes, U256};
    use ledger_data::types::BlockHeader;
    use ledger_data::{ContractCreated, ContractType, ExecutionOutcome};

    struct Unreachable;

    impl SimulatedCallExecutor for Unreachable {
        fn simulate(&self, _call: &SimulatedCall) -> Option<CallOutput> {
            None
        }
    }

    fn bundle(receipts: Option<Vec<Receipt>>) -> BlockBundle {
        BlockBundle {
            header: BlockHeader {
                number: 5_000_000,
                hash: B256::repeat_byte(0xb1),
                parent_hash: B256::ZERO,
                coinbase: Address::repeat_byte(0xc0),
                timestamp: 0,
                gas_limit: 0,
                base_fee_per_gas: None,
                difficulty: U256::ZERO,
            },
            total_difficulty: None,
            ommers: Vec::new(),
            transactions: vec![Transaction {
                hash: B256::repeat_byte(0x01),
                from: Address::repeat_byte(0xaa),
                to: None,
                value: U256::from(3),
                gas_price: U256::from(2),
                gas_limit: 100_000,
                nonce: 0,
                input: Bytes::new(),
            }],
            receipts,
            traces: None,
            pre_state: Default::default(),
            post_state: None,
        }
    }

    fn creation_trace(bundle: &BlockBundle) -> ExtractedTrace {
        let tx = &bundle.transactions[0];
        TraceEvents {
            contracts_created: vec![ContractCreated::new(
                tx.from,
                tx.recipient(),
                Bytes::from_static(&[0x00]),
                tx.value,
                0,
                Some(tx.hash),
            )],
            ..TraceEvents::default()
        }
        .into_trace(tx.hash, ExecutionOutcome::Success)
    }

    #[test]
    fn assembles_rewards_fees_and_classification() {
        let bundle = bundle(Some(vec![Receipt {
            cumulative_gas_used: 60_000,
            success: true,
            logs: Vec::new(),
        }]));
        let config = LedgerConfig::default();
        let tracer = BlockTracer::new(&config, &Unreachable);

        let trace = tracer
            .trace(&bundle, vec![creation_trace(&bundle)])
            .expect("consistent bundle");

        assert_eq!(trace.rewards.len(), 1);
        assert_eq!(trace.total_fees, U256::from(120_000));
        let tx_trace = &trace.transaction_traces[0];
        assert_eq!(
            tx_trace.contracts_created[0].contract_type,
            Some(ContractType::Generic)
        );
        assert!(tx_trace.touched_accounts.contains(&Address::repeat_byte(0xaa)));
        assert!(tx_trace
            .touched_accounts
            .contains(&bundle.transactions[0].recipient()));
    }

    #[test]
    fn missing_receipts_abort_the_block() {
        let bundle = bundle(None);
        let config = LedgerConfig::default();
        let tracer = BlockTracer::new(&config, &Unreachable);

        let err = tracer
            .trace(&bundle, vec![creation_trace(&bundle)])
            .expect_err("no receipts");
        assert!(matches!(err, TraceError::MissingData { .. }));
    }

    #[test]
    fn trace_count_must_match() {
        let bundle = bundle(Some(vec![Receipt {
            cumulative_gas_used: 21_000,
            success: true,
            logs: Vec::new(),
        }]));
        let config = LedgerConfig::default();
        let tracer = BlockTracer::new(&config, &Unreachable);

        let err = tracer.trace(&bundle, Vec::new()).expect_err("no traces");
        assert!(matches!(err, TraceError::CountMismatch { expected: 1, actual: 0, .. }));
    }
}
