//! A block together with everything derived from it.

use std::collections::BTreeSet;

use alloy::primitives::{Address, U256};
use ledger_data::{BalanceDelta, BlockBundle, BlockHeader, BlockTrace, DeltaType, TraceError};
use serde::{Deserialize, Serialize};

use crate::deltas::{balance_deltas, ommer_coinbases, token_transfer_deltas};

/// Header, trace and ledgers of one block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FullBlock {
    pub header: BlockHeader,
    pub total_difficulty: U256,
    pub trace: BlockTrace,
    /// Native-value ledger in reconstruction order.
    pub balance_deltas: Vec<BalanceDelta>,
    pub token_deltas: Vec<BalanceDelta>,
    /// Every transaction's touched accounts plus every reward recipient.
    pub touched_accounts: BTreeSet<Address>,
}

impl FullBlock {
    /// Builds the full view of `bundle` from its assembled trace.
    ///
    /// # Errors
    /// Returns [`TraceError::MissingData`] if the bundle has no total difficulty.
    pub fn assemble(bundle: &BlockBundle, trace: BlockTrace) -> Result<Self, TraceError> {
        let total_difficulty = bundle.total_difficulty()?;
        let coinbases = ommer_coinbases(&bundle.ommers);

        let balance_deltas = balance_deltas(&trace, &coinbases);
        let token_deltas = token_transfer_deltas(&trace);

        let mut touched_accounts = trace.touched_accounts();
        touched_accounts.extend(
            balance_deltas
                .iter()
                .filter(|delta| {
                    matches!(
                        delta.delta_type,
                        DeltaType::BlockReward | DeltaType::OmmerReward
                    )
                })
                .filter_map(|delta| delta.to),
        );

        tracing::debug!(
            block_number = bundle.header.number,
            deltas = balance_deltas.len(),
            token_deltas = token_deltas.len(),
            touched = touched_accounts.len(),
            "assembled full block"
        );

        Ok(Self {
            header: bundle.header.clone(),
            total_difficulty,
            trace,
            balance_deltas,
            token_deltas,
            touched_accounts,
        })
    }
}
