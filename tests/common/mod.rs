//! Shared test helpers: block fixtures and hand-assembled contract bytecode.
//!
//! Bytecode helpers return raw EVM code; offsets noted on each helper are the
//! program counters the replay tracer reports for the instructions involved.

#![allow(dead_code)]

use alloy::primitives::{Address, Bytes, B256, U256};
use ledger_data::trace::{TraceAction, TraceResult};
use ledger_data::types::{AccountState, StateAlloc};
use ledger_data::{BlockBundle, BlockHeader, FlatTrace, Receipt, Transaction};

pub const SENDER: Address = Address::new([0x5e; 20]);
pub const COINBASE: Address = Address::new([0xc0; 20]);
pub const BENEFICIARY: Address = Address::new([0xbe; 20]);

/// A block past the merge: no block or ommer rewards.
pub const POST_MERGE_BLOCK: u64 = 16_000_000;

pub const ETHER: u128 = 1_000_000_000_000_000_000;

/// Gas each fixture receipt attributes to its transaction.
pub const RECEIPT_GAS: u64 = 50_000;

/// Creates a header with a hash derived from `number`.
pub fn header(number: u64) -> BlockHeader {
    BlockHeader {
        number,
        hash: B256::left_padding_from(&number.to_be_bytes()),
        parent_hash: B256::ZERO,
        coinbase: COINBASE,
        timestamp: 1_700_000_000,
        gas_limit: 0,
        base_fee_per_gas: None,
        difficulty: U256::ZERO,
    }
}

/// Creates a zero gas price transaction; `tag` seeds its hash.
///
/// # Arguments
/// * `tag` - Distinguishes transactions within a block
/// * `to` - Recipient, or `None` for a contract creation
/// * `value` - Wei sent along
/// * `nonce` - Sender nonce, must match the replayed state
/// * `input` - Calldata or init code
pub fn transaction(
    tag: u8,
    from: Address,
    to: Option<Address>,
    value: u128,
    nonce: u64,
    input: Vec<u8>,
) -> Transaction {
    Transaction {
        hash: B256::repeat_byte(tag),
        from,
        to,
        value: U256::from(value),
        gas_price: U256::ZERO,
        gas_limit: 1_000_000,
        nonce,
        input: Bytes::from(input),
    }
}

/// Successful receipts, [`RECEIPT_GAS`] per transaction.
pub fn receipts(count: usize) -> Vec<Receipt> {
    (1..=count as u64)
        .map(|n| Receipt {
            cumulative_gas_used: n * RECEIPT_GAS,
            success: true,
            logs: Vec::new(),
        })
        .collect()
}

/// Bundle ready for replay: receipts attached, no flat traces.
pub fn bundle(number: u64, transactions: Vec<Transaction>, pre_state: StateAlloc) -> BlockBundle {
    BlockBundle {
        header: header(number),
        total_difficulty: Some(U256::from(58_750_003_716_598_352_816_469u128)),
        ommers: Vec::new(),
        receipts: Some(receipts(transactions.len())),
        transactions,
        traces: None,
        pre_state,
        post_state: None,
    }
}

pub fn eoa(balance: u128) -> AccountState {
    AccountState {
        balance: U256::from(balance),
        ..AccountState::default()
    }
}

pub fn contract(code: Vec<u8>, balance: u128) -> AccountState {
    AccountState {
        balance: U256::from(balance),
        code: Some(Bytes::from(code)),
        ..AccountState::default()
    }
}

/// Init code returning `runtime` as the deployed code.
pub fn deploy(runtime: &[u8]) -> Vec<u8> {
    let len = u8::try_from(runtime.len()).expect("runtime fits a PUSH1 length");
    // PUSH1 len, DUP1, PUSH1 11, PUSH1 0, CODECOPY, PUSH1 0, RETURN
    let mut code = vec![0x60, len, 0x80, 0x60, 0x0b, 0x60, 0x00, 0x39, 0x60, 0x00, 0xf3];
    code.extend_from_slice(runtime);
    code
}

fn push_call(code: &mut Vec<u8>, target: Address, value: u8) {
    // retSize, retOffset, argsSize, argsOffset
    code.extend_from_slice(&[0x60, 0x00, 0x60, 0x00, 0x60, 0x00, 0x60, 0x00]);
    code.extend_from_slice(&[0x60, value]);
    code.push(0x73);
    code.extend_from_slice(target.as_slice());
    // GAS, CALL
    code.extend_from_slice(&[0x5a, 0xf1]);
}

/// Calls `target` with `value` wei, then stops. The CALL sits at pc 32.
pub fn call_with_value(target: Address, value: u8) -> Vec<u8> {
    let mut code = Vec::new();
    push_call(&mut code, target, value);
    code.push(0x00);
    code
}

/// Calls `target` with `value` wei, then reverts the whole frame.
pub fn call_then_revert(target: Address, value: u8) -> Vec<u8> {
    let mut code = Vec::new();
    push_call(&mut code, target, value);
    // POP, PUSH1 0, DUP1, REVERT
    code.extend_from_slice(&[0x50, 0x60, 0x00, 0x80, 0xfd]);
    code
}

/// Self-destructs to `beneficiary`. The SELFDESTRUCT sits at pc 21.
pub fn selfdestruct_to(beneficiary: Address) -> Vec<u8> {
    let mut code = vec![0x73];
    code.extend_from_slice(beneficiary.as_slice());
    code.push(0xff);
    code
}

/// Calls `target` without value, then self-destructs to `beneficiary`.
/// The SELFDESTRUCT sits at pc 55.
pub fn call_then_selfdestruct(target: Address, beneficiary: Address) -> Vec<u8> {
    let mut code = Vec::new();
    push_call(&mut code, target, 0);
    code.push(0x50);
    code.extend(selfdestruct_to(beneficiary));
    code
}

/// Minimal ERC20: `totalSupply()` returns 1000, every other selector
/// reverts. The remaining mandatory selectors trail the STOP as PUSH4 data.
pub fn erc20_runtime() -> Vec<u8> {
    let mut code = vec![
        0x60, 0x00, 0x35, 0x60, 0xe0, 0x1c, // selector
        0x63, 0x18, 0x16, 0x0d, 0xdd, 0x14, // == totalSupply()
        0x60, 0x14, 0x57, // JUMPI 0x14
        0x60, 0x00, 0x60, 0x00, 0xfd, // revert
        0x5b, 0x61, 0x03, 0xe8, 0x60, 0x00, 0x52, // mstore(0, 1000)
        0x60, 0x20, 0x60, 0x00, 0xf3, // return 32 bytes
        0x00,
    ];
    for selector in [
        [0x70, 0xa0, 0x82, 0x31],
        [0xa9, 0x05, 0x9c, 0xbb],
        [0x23, 0xb8, 0x72, 0xdd],
        [0x09, 0x5e, 0xa7, 0xb3],
        [0xdd, 0x62, 0xed, 0x3e],
    ] {
        code.push(0x63);
        code.extend_from_slice(&selector);
    }
    code
}

/// ERC165 contract that supports ERC165 and ERC1155. Any selector other
/// than `supportsInterface(bytes4)` reverts.
pub fn erc1155_runtime() -> Vec<u8> {
    vec![
        0x60, 0x00, 0x35, 0x60, 0xe0, 0x1c, // selector
        0x63, 0x01, 0xff, 0xc9, 0xa7, 0x14, // == supportsInterface
        0x60, 0x13, 0x57, // JUMPI 0x13
        0x60, 0x00, 0x80, 0xfd, // revert
        0x5b, 0x60, 0x04, 0x35, 0x60, 0xe0, 0x1c, // interface id
        0x80, 0x63, 0x01, 0xff, 0xc9, 0xa7, 0x14, // == ERC165
        0x60, 0x37, 0x57, // JUMPI 0x37
        0x63, 0xd9, 0xb6, 0x7a, 0x26, 0x14, // == ERC1155
        0x60, 0x37, 0x57, // JUMPI 0x37
        0x60, 0x00, 0x60, 0x00, 0x52, 0x60, 0x20, 0x60, 0x00, 0xf3, // return false
        0x5b, 0x60, 0x01, 0x60, 0x00, 0x52, 0x60, 0x20, 0x60, 0x00, 0xf3, // return true
    ]
}

/// A `call` entry of a flat trace.
pub fn call_entry(
    trace_address: Vec<usize>,
    call_type: &str,
    from: Address,
    to: Address,
    value: u128,
) -> FlatTrace {
    FlatTrace {
        kind: "call".to_string(),
        trace_address,
        subtraces: 0,
        action: TraceAction {
            call_type: Some(call_type.to_string()),
            from: Some(from),
            to: Some(to),
            value: Some(U256::from(value)),
            ..TraceAction::default()
        },
        result: Some(TraceResult::default()),
        error: None,
        block_hash: None,
        transaction_hash: None,
    }
}

/// A successful `create` entry of a flat trace.
pub fn create_entry(
    trace_address: Vec<usize>,
    from: Address,
    address: Address,
    code: Vec<u8>,
    value: u128,
) -> FlatTrace {
    FlatTrace {
        kind: "create".to_string(),
        trace_address,
        subtraces: 0,
        action: TraceAction {
            from: Some(from),
            value: Some(U256::from(value)),
            creation_method: Some("create".to_string()),
            ..TraceAction::default()
        },
        result: Some(TraceResult {
            address: Some(address),
            code: Some(Bytes::from(code)),
            ..TraceResult::default()
        }),
        error: None,
        block_hash: None,
        transaction_hash: None,
    }
}

/// A `suicide` entry of a flat trace.
pub fn suicide_entry(
    trace_address: Vec<usize>,
    address: Address,
    refund_address: Address,
    balance: u128,
) -> FlatTrace {
    FlatTrace {
        kind: "suicide".to_string(),
        trace_address,
        subtraces: 0,
        action: TraceAction {
            address: Some(address),
            refund_address: Some(refund_address),
            balance: Some(U256::from(balance)),
            ..TraceAction::default()
        },
        result: None,
        error: None,
        block_hash: None,
        transaction_hash: None,
    }
}
