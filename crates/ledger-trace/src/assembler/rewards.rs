//! Block/ommer reward and transaction fee arithmetic.

use alloy::primitives::{B256, U256};
use ledger_data::config::RewardSchedule;
use ledger_data::events::{Reward, TransactionFee};
use ledger_data::types::{BlockHeader, OmmerHeader, Receipt, Transaction};
use ledger_data::TraceError;

/// Rewards paid out for a block: the coinbase reward keyed by the block hash
/// first, then one reward per ommer keyed by the ommer hash, in body order.
///
/// Genesis pays nothing, and neither does a zero-reward era when
/// `skip_zero_block_rewards` is set.
///
/// # Errors
/// Returns [`TraceError::Reward`] for a zero divisor, or an ommer that is not
/// strictly older than the block or lies beyond the distance divisor.
pub fn block_rewards(
    header: &BlockHeader,
    ommers: &[OmmerHeader],
    schedule: &RewardSchedule,
) -> Result<Vec<Reward>, TraceError> {
    if header.is_genesis() {
        return Ok(Vec::new());
    }

    let reward = schedule.block_reward(header.number);
    if reward.is_zero() && schedule.skip_zero_block_rewards {
        return Ok(Vec::new());
    }

    let reward_error = |reason: String| TraceError::Reward {
        block_number: header.number,
        reason,
    };
    if schedule.ommer_inclusion_divisor == 0 || schedule.ommer_distance_divisor == 0 {
        return Err(reward_error("reward divisors must be non-zero".to_string()));
    }

    let inclusion_bonus =
        reward * U256::from(ommers.len()) / U256::from(schedule.ommer_inclusion_divisor);
    let mut rewards = Vec::with_capacity(ommers.len() + 1);
    rewards.push(Reward {
        hash: header.hash,
        amount: reward + inclusion_bonus,
    });

    for ommer in ommers {
        let distance = header
            .number
            .checked_sub(ommer.number)
            .filter(|distance| (1..=schedule.ommer_distance_divisor).contains(distance))
            .ok_or_else(|| {
                reward_error(format!(
                    "ommer {} at block {} is out of range",
                    ommer.hash, ommer.number
                ))
            })?;
        let penalty =
            reward * U256::from(distance) / U256::from(schedule.ommer_distance_divisor);
        rewards.push(Reward {
            hash: ommer.hash,
            amount: reward - penalty,
        });
    }

    Ok(rewards)
}

/// Fee paid by every transaction, from differences of cumulative gas used.
///
/// # Errors
/// Returns [`TraceError::CountMismatch`] if receipts and transactions differ
/// in number, or if cumulative gas decreases between receipts.
pub fn fees_by_transaction(
    block_hash: B256,
    transactions: &[Transaction],
    receipts: &[Receipt],
) -> Result<Vec<TransactionFee>, TraceError> {
    if receipts.len() != transactions.len() {
        tracing::warn!(
            receipts = receipts.len(),
            tx_count = transactions.len(),
            "receipt count mismatch"
        );
        return Err(TraceError::count_mismatch(
            block_hash,
            "receipts vs transactions",
            transactions.len(),
            receipts.len(),
        ));
    }

    let mut previous = 0u64;
    let mut fees = Vec::with_capacity(transactions.len());
    for (index, (tx, receipt)) in transactions.iter().zip(receipts).enumerate() {
        let Some(gas_used) = receipt.cumulative_gas_used.checked_sub(previous) else {
            tracing::warn!(
                tx_hash = %tx.hash,
                previous,
                cumulative = receipt.cumulative_gas_used,
                "cumulative gas decreased"
            );
            return Err(TraceError::count_mismatch(
                block_hash,
                "cumulative gas",
                previous as usize,
                receipt.cumulative_gas_used as usize,
            ));
        };
        previous = receipt.cumulative_gas_used;

        fees.push(TransactionFee {
            transaction_hash: tx.hash,
            transaction_index: index,
            sender: tx.from,
            gas_used,
            fee: U256::from(gas_used) * tx.gas_price,
        });
    }
    Ok(fees)
}

pub fn total_fees(fees: &[TransactionFee]) -> U256 {
    fees.iter().fold(U256::ZERO, |total, fee| total + fee.fee)
}
