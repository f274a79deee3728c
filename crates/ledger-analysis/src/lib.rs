//! ledger-analysis crate
//!
//! Post-trace analytics: balance delta reconstruction, token event parsing,
//! per-account ledger netting and full block assembly.

pub mod deltas;
pub mod events;
pub mod full_block;
pub mod ledger;

pub use deltas::{balance_deltas, ommer_coinbases, token_transfer_deltas};
pub use events::{parse_log, parse_logs, TokenEvent, TokenMovement};
pub use full_block::FullBlock;
pub use ledger::{format_eth, net_balance_changes, AccountLedger, BalanceChange};
