//! Projection of a [`BlockTrace`] into its ordered balance delta ledger.
//!
//! Native value deltas come in a fixed sequence: rewards, then every
//! transaction's value, creation, destruction and internal deltas in block
//! order, then one fee delta per transaction trailing the whole block.
//! Token movements form a separate sequence.

use std::collections::BTreeMap;

use alloy::primitives::{Address, B256};
use ledger_data::{BalanceDelta, BlockTrace, DeltaType, OmmerHeader, TransactionTrace};

use crate::events::parse_logs;

/// Ommer hash to ommer coinbase lookup.
pub fn ommer_coinbases(ommers: &[OmmerHeader]) -> BTreeMap<B256, Address> {
    ommers
        .iter()
        .map(|ommer| (ommer.hash, ommer.coinbase))
        .collect()
}

fn transaction_delta(trace: &TransactionTrace, delta_type: DeltaType) -> BalanceDelta {
    BalanceDelta {
        transaction_hash: Some(trace.transaction.hash),
        transaction_index: Some(trace.transaction_index),
        ..BalanceDelta::new(delta_type)
    }
}

fn reward_deltas(block: &BlockTrace, ommer_coinbases: &BTreeMap<B256, Address>) -> Vec<BalanceDelta> {
    block
        .rewards
        .iter()
        .map(|reward| {
            let (delta_type, to) = if reward.hash == block.header.hash {
                (DeltaType::BlockReward, Some(block.header.coinbase))
            } else {
                let to = ommer_coinbases.get(&reward.hash).copied();
                if to.is_none() {
                    tracing::debug!(ommer_hash = %reward.hash, "no coinbase known for ommer");
                }
                (DeltaType::OmmerReward, to)
            };
            BalanceDelta {
                to,
                amount: Some(reward.amount),
                ..BalanceDelta::new(delta_type)
            }
        })
        .collect()
}

fn transaction_value_deltas(trace: &TransactionTrace) -> Vec<BalanceDelta> {
    let tx = &trace.transaction;
    let mut deltas = Vec::with_capacity(
        1 + trace.contracts_created.len()
            + trace.contracts_destroyed.len()
            + trace.internal_transactions.len(),
    );

    deltas.push(BalanceDelta {
        from: Some(tx.from),
        to: Some(tx.recipient()),
        amount: Some(tx.value),
        ..transaction_delta(trace, DeltaType::Tx)
    });

    deltas.extend(trace.contracts_created.iter().map(|created| BalanceDelta {
        pc: created.pc as i64,
        from: Some(created.originator),
        to: Some(created.contract_address),
        amount: Some(created.amount),
        ..transaction_delta(trace, DeltaType::ContractCreation)
    }));

    deltas.extend(trace.contracts_destroyed.iter().map(|destroyed| BalanceDelta {
        pc: destroyed.pc as i64,
        from: Some(destroyed.contract_address),
        to: Some(destroyed.refund_address),
        amount: Some(destroyed.refund_amount),
        ..transaction_delta(trace, DeltaType::ContractDestruction)
    }));

    deltas.extend(trace.internal_transactions.iter().map(|internal| BalanceDelta {
        pc: internal.pc as i64,
        from: Some(internal.from_address),
        to: Some(internal.to_address),
        amount: Some(internal.amount),
        ..transaction_delta(trace, DeltaType::InternalTx)
    }));

    deltas
}

/// Native-value balance deltas of one block.
///
/// # Arguments
/// * `block` - Assembled block trace
/// * `ommer_coinbases` - Lookup resolving ommer reward recipients; an unknown
///   ommer leaves `to` unset
pub fn balance_deltas(
    block: &BlockTrace,
    ommer_coinbases: &BTreeMap<B256, Address>,
) -> Vec<BalanceDelta> {
    let mut deltas = reward_deltas(block, ommer_coinbases);

    for trace in &block.transaction_traces {
        deltas.extend(transaction_value_deltas(trace));
    }

    let coinbase = block.header.coinbase;
    deltas.extend(block.fees_by_transaction.iter().map(|fee| BalanceDelta {
        transaction_hash: Some(fee.transaction_hash),
        transaction_index: Some(fee.transaction_index),
        from: Some(fee.sender),
        to: Some(coinbase),
        amount: Some(fee.fee),
        ..BalanceDelta::new(DeltaType::TxFee)
    }));

    tracing::debug!(
        block_number = block.header.number,
        deltas = deltas.len(),
        "reconstructed balance deltas"
    );
    deltas
}

/// TOKEN_TRANSFER deltas parsed from every transaction's receipt logs.
///
/// `pc` is the log's position within its transaction.
pub fn token_transfer_deltas(block: &BlockTrace) -> Vec<BalanceDelta> {
    let mut deltas = Vec::new();
    for trace in &block.transaction_traces {
        for (log_index, event) in parse_logs(&trace.logs) {
            let contract_address = Some(event.token());
            deltas.extend(event.movements().into_iter().map(|movement| BalanceDelta {
                pc: log_index as i64,
                contract_address,
                from: movement.from,
                to: movement.to,
                amount: Some(movement.amount),
                token_id: movement.token_id,
                ..transaction_delta(trace, DeltaType::TokenTransfer)
            }));
        }
    }
    deltas
}
