//! Sequential re-execution of a block's transactions with an inspector attached.

use std::collections::BTreeSet;

use alloy::primitives::{Address, B256, U256};
use alloy::sol_types::decode_revert_reason;
use ledger_data::types::{BlockHeader, StateAlloc, Transaction};
use ledger_data::{ExecutionOutcome, TraceError};
use revm::primitives::{BlockEnv, ExecutionResult, TransactTo, TxEnv};
use revm::{inspector_handle_register, DatabaseCommit, Evm, Inspector};

use super::{state_db, StateDb, SPEC_ID};

/// One replayed transaction.
#[derive(Debug)]
pub struct ReplayedTx {
    pub result: ExecutionResult,
    /// Accounts the engine marked touched: fee payer, coinbase, every frame
    /// target and storage writer that survived the transaction's reverts.
    pub touched: BTreeSet<Address>,
}

/// Replays transactions of one block on top of its parent state.
///
/// State changes of every transaction are committed before the next one runs.
pub struct BlockReplayer {
    db: StateDb,
    block_env: BlockEnv,
    block_hash: B256,
}

impl BlockReplayer {
    /// Prepares a replay of `header`'s block on top of `pre_state`.
    pub fn new(header: &BlockHeader, pre_state: &StateAlloc) -> Self {
        let block_env = BlockEnv {
            number: U256::from(header.number),
            coinbase: header.coinbase,
            timestamp: U256::from(header.timestamp),
            // Bundles without a gas limit impose none.
            gas_limit: match header.gas_limit {
                0 => U256::MAX,
                limit => U256::from(limit),
            },
            basefee: header.base_fee_per_gas.unwrap_or_default(),
            difficulty: header.difficulty,
            prevrandao: Some(B256::ZERO),
            blob_excess_gas_and_price: None,
        };

        tracing::debug!(
            block_number = header.number,
            accounts = pre_state.len(),
            "prepared block replay"
        );

        Self {
            db: state_db(pre_state),
            block_env,
            block_hash: header.hash,
        }
    }

    fn tx_env(tx: &Transaction) -> TxEnv {
        TxEnv {
            caller: tx.from,
            transact_to: tx.to.map_or(TransactTo::Create, TransactTo::Call),
            value: tx.value,
            data: tx.input.clone(),
            gas_limit: tx.gas_limit,
            gas_price: tx.gas_price,
            nonce: Some(tx.nonce),
            ..TxEnv::default()
        }
    }

    /// Executes `tx` with `inspector` attached and commits its state changes.
    ///
    /// Reverts and halts are regular results, not errors. The accounts revm
    /// reports touched are returned alongside the result.
    ///
    /// # Errors
    /// Returns [`TraceError::Execution`] if revm rejects the transaction
    /// (bad nonce, insufficient funds for gas, ...).
    pub fn replay_tx<I>(&mut self, tx: &Transaction, inspector: &mut I) -> Result<ReplayedTx, TraceError>
    where
        I: for<'db> Inspector<&'db mut StateDb>,
    {
        let block_env = &self.block_env;
        let mut evm = Evm::builder()
            .with_db(&mut self.db)
            .with_external_context(inspector)
            .with_spec_id(SPEC_ID)
            .modify_block_env(|block| *block = block_env.clone())
            .modify_tx_env(|env| *env = Self::tx_env(tx))
            .append_handler_register(inspector_handle_register)
            .build();

        let outcome = evm.transact().map_err(|error| {
            tracing::warn!(tx_hash = %tx.hash, error = %error, "replay rejected transaction");
            TraceError::Execution {
                block_hash: self.block_hash,
                transaction_hash: tx.hash,
                reason: error.to_string(),
            }
        })?;
        drop(evm);

        let touched: BTreeSet<Address> = outcome
            .state
            .iter()
            .filter(|(_, account)| account.is_touched())
            .map(|(address, _)| *address)
            .collect();
        self.db.commit(outcome.state);

        let result = outcome.result;
        tracing::trace!(
            tx_hash = %tx.hash,
            success = result.is_success(),
            gas_used = result.gas_used(),
            touched = touched.len(),
            "replayed transaction"
        );
        Ok(ReplayedTx { result, touched })
    }

    /// State after every replayed transaction.
    pub fn into_state(self) -> StateDb {
        self.db
    }
}

/// Maps revm's execution result onto the domain outcome.
pub fn execution_outcome(result: &ExecutionResult) -> ExecutionOutcome {
    match result {
        ExecutionResult::Success { .. } => ExecutionOutcome::Success,
        ExecutionResult::Revert { output, .. } => ExecutionOutcome::Revert {
            reason: decode_revert_reason(output).filter(|reason| !reason.is_empty()),
        },
        ExecutionResult::Halt { reason, .. } => ExecutionOutcome::Halt {
            reason: format!("{reason:?}"),
        },
    }
}
