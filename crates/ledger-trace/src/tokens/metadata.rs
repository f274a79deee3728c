//! Metadata getters (`name`, `symbol`, ...) issued directly against the contract.
//!
//! Every getter yields `None` when the call fails or does not decode; a
//! missing value is left unset in [`ContractMetadata`](ledger_data::ContractMetadata).

use alloy::primitives::U256;

use super::probes::{ITokenMetadata, ProbeContext};

pub fn name(ctx: &ProbeContext<'_>) -> Option<String> {
    ctx.call_contract(&ITokenMetadata::nameCall {})
        .map(|ret| sanitize(&ret._0))
}

pub fn symbol(ctx: &ProbeContext<'_>) -> Option<String> {
    ctx.call_contract(&ITokenMetadata::symbolCall {})
        .map(|ret| sanitize(&ret._0))
}

pub fn decimals(ctx: &ProbeContext<'_>) -> Option<u8> {
    ctx.call_contract(&ITokenMetadata::decimalsCall {})
        .map(|ret| ret._0)
}

pub fn total_supply(ctx: &ProbeContext<'_>) -> Option<U256> {
    ctx.call_contract(&ITokenMetadata::totalSupplyCall {})
        .map(|ret| ret._0)
}

pub fn granularity(ctx: &ProbeContext<'_>) -> Option<U256> {
    ctx.call_contract(&ITokenMetadata::granularityCall {})
        .map(|ret| ret._0)
}

pub fn cap(ctx: &ProbeContext<'_>) -> Option<U256> {
    ctx.call_contract(&ITokenMetadata::capCall {}).map(|ret| ret._0)
}

/// Cleans a token string read from chain.
///
/// Drops NUL bytes (raw and JSON-escaped), non-ASCII characters and control
/// characters other than `\r`, `\n` and `\t`, then trims surrounding whitespace.
pub fn sanitize(raw: &str) -> String {
    raw.replace("\\u0000", "")
        .chars()
        .filter(|c| c.is_ascii() && (!c.is_ascii_control() || matches!(c, '\r' | '\n' | '\t')))
        .collect::<String>()
        .trim()
        .to_string()
}
