//! Per-account netting of native-value balance deltas.
//!
//! Summing every native delta by account must reproduce the balance changes
//! the execution engine applied for the block.

use std::collections::BTreeMap;
use std::fmt;

use alloy::primitives::{Address, U256};
use ledger_data::BalanceDelta;
use serde::{Deserialize, Serialize};

/// Net effect of a block on one account.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "direction", content = "amount", rename_all = "snake_case")]
pub enum BalanceChange {
    Increase(U256),
    Decrease(U256),
    Unchanged,
}

impl fmt::Display for BalanceChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Increase(amount) => write!(f, "+{}", format_eth(*amount)),
            Self::Decrease(amount) => write!(f, "-{}", format_eth(*amount)),
            Self::Unchanged => f.write_str("0"),
        }
    }
}

/// Gross credits and debits of one account.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountLedger {
    pub credited: U256,
    pub debited: U256,
}

impl AccountLedger {
    pub fn change(&self) -> BalanceChange {
        match self.credited.cmp(&self.debited) {
            std::cmp::Ordering::Greater => BalanceChange::Increase(self.credited - self.debited),
            std::cmp::Ordering::Less => BalanceChange::Decrease(self.debited - self.credited),
            std::cmp::Ordering::Equal => BalanceChange::Unchanged,
        }
    }

    /// Balance after applying this ledger to `balance`.
    ///
    /// Returns `None` if the account would go negative or overflow.
    pub fn apply(&self, balance: U256) -> Option<U256> {
        balance.checked_add(self.credited)?.checked_sub(self.debited)
    }
}

/// Folds native-value deltas into per-account ledgers.
///
/// TOKEN_TRANSFER deltas and deltas without an amount are skipped. An unset
/// endpoint (rewards have no sender) is skipped on that side only.
pub fn net_balance_changes(deltas: &[BalanceDelta]) -> BTreeMap<Address, AccountLedger> {
    let mut ledgers: BTreeMap<Address, AccountLedger> = BTreeMap::new();

    for delta in deltas.iter().filter(|delta| delta.delta_type.is_native()) {
        let Some(amount) = delta.amount else {
            continue;
        };
        if let Some(from) = delta.from {
            let ledger = ledgers.entry(from).or_default();
            ledger.debited = ledger.debited.saturating_add(amount);
        }
        if let Some(to) = delta.to {
            let ledger = ledgers.entry(to).or_default();
            ledger.credited = ledger.credited.saturating_add(amount);
        }
    }

    ledgers
}

/// Formats a Wei amount as ETH with six decimals.
pub fn format_eth(wei: U256) -> String {
    const WEI_PER_ETH: u64 = 1_000_000_000_000_000_000;
    const SCALE: u64 = 1_000_000;

    let per_eth = U256::from(WEI_PER_ETH);
    let whole = wei / per_eth;
    let fractional = (wei % per_eth) * U256::from(SCALE) / per_eth;

    format!("{whole}.{:0>6} ETH", fractional.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledger_data::DeltaType;

    fn delta(delta_type: DeltaType, from: Option<u8>, to: Option<u8>, amount: u64) -> BalanceDelta {
        BalanceDelta {
            from: from.map(Address::repeat_byte),
            to: to.map(Address::repeat_byte),
            amount: Some(U256::from(amount)),
            ..BalanceDelta::new(delta_type)
        }
    }

    #[test]
    fn nets_native_deltas_and_ignores_tokens() {
        let deltas = vec![
            delta(DeltaType::BlockReward, None, Some(0xc0), 100),
            delta(DeltaType::Tx, Some(1), Some(2), 50),
            delta(DeltaType::InternalTx, Some(2), Some(3), 20),
            delta(DeltaType::TokenTransfer, Some(3), Some(1), 1_000),
            delta(DeltaType::TxFee, Some(1), Some(0xc0), 5),
        ];

        let ledgers = net_balance_changes(&deltas);

        assert_eq!(ledgers.len(), 4);
        assert_eq!(
            ledgers[&Address::repeat_byte(0xc0)].change(),
            BalanceChange::Increase(U256::from(105))
        );
        assert_eq!(
            ledgers[&Address::repeat_byte(1)].change(),
            BalanceChange::Decrease(U256::from(55))
        );
        assert_eq!(
            ledgers[&Address::repeat_byte(2)].change(),
            BalanceChange::Increase(U256::from(30))
        );
        assert_eq!(
            ledgers[&Address::repeat_byte(3)],
            AccountLedger {
                credited: U256::from(20),
                debited: U256::ZERO
            }
        );
    }

    #[test]
    fn self_transfer_is_unchanged() {
        let ledgers = net_balance_changes(&[delta(DeltaType::Tx, Some(1), Some(1), 7)]);
        let ledger = ledgers[&Address::repeat_byte(1)];
        assert_eq!(ledger.change(), BalanceChange::Unchanged);
        assert_eq!(ledger.apply(U256::from(7)), Some(U256::from(7)));
    }

    #[test]
    fn apply_rejects_overdraft() {
        let ledger = AccountLedger {
            credited: U256::from(1),
            debited: U256::from(5),
        };
        assert_eq!(ledger.apply(U256::from(3)), None);
        assert_eq!(ledger.apply(U256::from(10)), Some(U256::from(6)));
    }

    #[test]
    fn formats_wei_as_eth() {
        assert_eq!(format_eth(U256::ZERO), "0.000000 ETH");
        assert_eq!(
            format_eth(U256::from(1_500_000_000_000_000_000u64)),
            "1.500000 ETH"
        );
        assert_eq!(format_eth(U256::from(1_000_000_000_000u64)), "0.000001 ETH");
    }
}
