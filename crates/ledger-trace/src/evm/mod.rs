//! revm-backed host: state snapshots, simulated calls and block replay.
//!
//! Snapshots are plain `CacheDB<EmptyDB>` values seeded from a [`StateAlloc`].
//! Every simulated call runs in a throwaway `CacheDB` layered over a shared
//! reference to the snapshot, so probes never observe each other's writes.

pub mod detectors;
pub mod replay;

use std::collections::HashMap;

use alloy::primitives::{Address, Bytes, B256, U256};
use ledger_data::config::DetectorAddresses;
use ledger_data::types::StateAlloc;
use revm::db::{CacheDB, DatabaseRef, EmptyDB};
use revm::primitives::{AccountInfo, Bytecode, ResultAndState, SpecId, TransactTo, KECCAK_EMPTY};
use revm::Evm;

use crate::executor::{CallOutput, SimulatedCall, SimulatedCallExecutor};

/// In-memory world state used by replay and probes.
pub type StateDb = CacheDB<EmptyDB>;

/// Fork rules used for replay and probes. Shanghai keeps SELFDESTRUCT destructive.
pub const SPEC_ID: SpecId = SpecId::SHANGHAI;

/// Builds an in-memory state database from an allocation.
pub fn state_db(alloc: &StateAlloc) -> StateDb {
    let mut db = CacheDB::new(EmptyDB::default());
    for (address, account) in alloc {
        let code = account
            .code
            .as_ref()
            .filter(|code| !code.is_empty())
            .map(|code| Bytecode::new_raw(code.clone()));
        db.insert_account_info(
            *address,
            AccountInfo {
                balance: account.balance,
                nonce: account.nonce,
                code_hash: KECCAK_EMPTY,
                code,
            },
        );
        for (slot, value) in &account.storage {
            db.insert_account_storage(*address, *slot, *value)
                .unwrap_or_else(|never| match never {});
        }
    }
    db
}

/// Balance of `address` in `db`; zero for unknown accounts.
pub fn balance_of<DB: DatabaseRef>(db: &DB, address: Address) -> U256 {
    db.basic_ref(address)
        .ok()
        .flatten()
        .map(|info| info.balance)
        .unwrap_or_default()
}

/// Executes one read-only call on top of `snapshot` and discards its writes.
fn execute(snapshot: &StateDb, to: Address, input: Bytes, gas_limit: u64) -> Option<CallOutput> {
    let mut evm = Evm::builder()
        .with_db(CacheDB::new(snapshot))
        .with_spec_id(SPEC_ID)
        .modify_tx_env(|tx| {
            tx.caller = Address::ZERO;
            tx.transact_to = TransactTo::Call(to);
            tx.data = input;
            tx.value = U256::ZERO;
            tx.gas_limit = gas_limit;
            tx.gas_price = U256::ZERO;
            tx.nonce = None;
        })
        .build();

    match evm.transact() {
        Ok(ResultAndState { result, .. }) => Some(CallOutput {
            success: result.is_success(),
            output: result.output().cloned().unwrap_or_default(),
        }),
        Err(error) => {
            tracing::debug!(to = %to, error = %error, "simulated call rejected");
            None
        }
    }
}

/// [`SimulatedCallExecutor`] over revm with per-block state snapshots.
#[derive(Default)]
pub struct RevmCallExecutor {
    snapshots: HashMap<B256, StateDb>,
    detectors: DetectorAddresses,
}

impl RevmCallExecutor {
    pub fn new(detectors: DetectorAddresses) -> Self {
        Self {
            snapshots: HashMap::new(),
            detectors,
        }
    }

    /// Executor with a single snapshot built from `alloc`.
    pub fn from_alloc(block_hash: B256, alloc: &StateAlloc, detectors: DetectorAddresses) -> Self {
        let mut executor = Self::new(detectors);
        executor.insert_snapshot(block_hash, state_db(alloc));
        executor
    }

    /// Registers the state probes referencing `block_hash` will run against.
    pub fn insert_snapshot(&mut self, block_hash: B256, db: StateDb) {
        tracing::debug!(
            block_hash = %block_hash,
            accounts = db.accounts.len(),
            "registered state snapshot"
        );
        self.snapshots.insert(block_hash, db);
    }
}

impl SimulatedCallExecutor for RevmCallExecutor {
    fn simulate(&self, call: &SimulatedCall) -> Option<CallOutput> {
        let Some(snapshot) = self.snapshots.get(&call.block_hash) else {
            tracing::debug!(block_hash = %call.block_hash, "no snapshot for simulated call");
            return None;
        };

        let detector_answer = detectors::answer(
            &self.detectors,
            call.to,
            &call.input,
            |to, input| {
                execute(snapshot, to, input, call.gas_limit)
                    .and_then(CallOutput::successful_output)
            },
        );
        if detector_answer.is_some() {
            return detector_answer;
        }

        execute(snapshot, call.to, call.input.clone(), call.gas_limit)
    }
}
