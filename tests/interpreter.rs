//! Integration tests for trace interpretation under both strategies.

mod common;

use alloy::primitives::{Address, U256};
use common::*;
use ledger_data::types::{AccountState, StateAlloc};
use ledger_data::{BlockBundle, ExecutionOutcome, FlatTrace, TraceError};
use ledger_trace::evm::balance_of;
use ledger_trace::{ExtractedTrace, FlatTraceExtractor, ReplayExtractor, TraceExtractor};

const WALLET: Address = Address::new([0xa1; 20]);
const PAYEE: Address = Address::new([0xb2; 20]);
const OUTER: Address = Address::new([0xd1; 20]);
const INNER: Address = Address::new([0xd2; 20]);

fn alloc(accounts: Vec<(Address, AccountState)>) -> StateAlloc {
    accounts.into_iter().collect()
}

fn replay(bundle: &BlockBundle) -> Vec<ExtractedTrace> {
    ReplayExtractor::new()
        .extract(bundle)
        .expect("bundle replays")
}

/// Single-transaction bundle interpreted from flat traces.
fn flat_bundle(entries: Vec<FlatTrace>) -> BlockBundle {
    let tx = transaction(1, SENDER, Some(WALLET), 0, 0, Vec::new());
    let mut bundle = bundle(POST_MERGE_BLOCK, vec![tx], StateAlloc::new());
    bundle.traces = Some(vec![entries]);
    bundle
}

/// A creation transaction reports the endowment, the sender as originator
/// and the deployed runtime code at pc 0.
#[test]
fn replay_creation_records_endowment_and_originator() {
    let runtime = erc20_runtime();
    let tx = transaction(1, SENDER, None, 1_000, 0, deploy(&runtime));
    let bundle = bundle(
        POST_MERGE_BLOCK,
        vec![tx.clone()],
        alloc(vec![(SENDER, eoa(ETHER))]),
    );

    let extracted = replay(&bundle);

    assert_eq!(extracted.len(), 1);
    let trace = &extracted[0];
    assert_eq!(trace.outcome, ExecutionOutcome::Success);
    assert_eq!(trace.contracts_created.len(), 1);

    let created = &trace.contracts_created[0];
    assert_eq!(created.contract_address, SENDER.create(0));
    assert_eq!(created.contract_address, tx.recipient());
    assert_eq!(created.originator, SENDER);
    assert_eq!(created.amount, U256::from(1_000));
    assert_eq!(created.code.as_ref(), runtime.as_slice());
    assert_eq!(created.pc, 0);
    assert_eq!(created.transaction_hash, Some(tx.hash));
    assert!(trace.internal_transactions.is_empty());
}

/// A value-bearing CALL below the root is an internal transaction at the
/// CALL's offset in the calling code.
#[test]
fn replay_internal_transfer_reports_call_offset() {
    let tx = transaction(1, SENDER, Some(WALLET), 0, 0, Vec::new());
    let bundle = bundle(
        POST_MERGE_BLOCK,
        vec![tx],
        alloc(vec![
            (SENDER, eoa(ETHER)),
            (WALLET, contract(call_with_value(PAYEE, 5), 100)),
        ]),
    );

    let extracted = replay(&bundle);
    let trace = &extracted[0];

    assert_eq!(trace.internal_transactions.len(), 1);
    let transfer = &trace.internal_transactions[0];
    assert_eq!(transfer.from_address, WALLET);
    assert_eq!(transfer.to_address, PAYEE);
    assert_eq!(transfer.amount, U256::from(5));
    assert_eq!(transfer.pc, 32);
    assert!(trace.touched_accounts.contains(&PAYEE));
}

/// A transaction that reverts after a successful inner transfer keeps
/// no events. Only the fee payer and the coinbase stay touched.
#[test]
fn replay_reverted_transaction_keeps_no_events() {
    let tx = transaction(1, SENDER, Some(WALLET), 0, 0, Vec::new());
    let bundle = bundle(
        POST_MERGE_BLOCK,
        vec![tx],
        alloc(vec![
            (SENDER, eoa(ETHER)),
            (WALLET, contract(call_then_revert(PAYEE, 5), 100)),
        ]),
    );

    let extracted = replay(&bundle);
    let trace = &extracted[0];

    assert!(matches!(trace.outcome, ExecutionOutcome::Revert { .. }));
    assert!(trace.internal_transactions.is_empty());
    assert!(trace.contracts_destroyed.is_empty());
    assert!(trace.touched_accounts.contains(&SENDER));
    assert!(trace.touched_accounts.contains(&COINBASE));
    assert!(!trace.touched_accounts.contains(&PAYEE));
}

/// Accounts the engine touched without any event still count as touched.
#[test]
fn replay_zero_value_call_target_is_touched() {
    let tx = transaction(1, SENDER, Some(WALLET), 0, 0, Vec::new());
    let bundle = bundle(
        POST_MERGE_BLOCK,
        vec![tx],
        alloc(vec![
            (SENDER, eoa(ETHER)),
            (WALLET, contract(call_with_value(PAYEE, 0), 100)),
        ]),
    );

    let extracted = replay(&bundle);
    let trace = &extracted[0];

    assert!(trace.internal_transactions.is_empty());
    for account in [SENDER, WALLET, PAYEE, COINBASE] {
        assert!(
            trace.touched_accounts.contains(&account),
            "{account} not touched"
        );
    }
}

/// Nested self-destructs are reported innermost first, each refunding the
/// balance held at destruction.
#[test]
fn replay_cascading_selfdestructs_refund_balances() {
    let tx = transaction(1, SENDER, Some(OUTER), 0, 0, Vec::new());
    let bundle = bundle(
        POST_MERGE_BLOCK,
        vec![tx],
        alloc(vec![
            (SENDER, eoa(ETHER)),
            (OUTER, contract(call_then_selfdestruct(INNER, BENEFICIARY), 300)),
            (INNER, contract(selfdestruct_to(BENEFICIARY), 200)),
        ]),
    );

    let mut extractor = ReplayExtractor::new();
    let extracted = extractor.extract(&bundle).expect("bundle replays");
    let destroyed: Vec<_> = extracted[0]
        .contracts_destroyed
        .iter()
        .map(|event| {
            (
                event.contract_address,
                event.refund_address,
                event.refund_amount,
                event.pc,
            )
        })
        .collect();

    assert_eq!(
        destroyed,
        vec![
            (INNER, BENEFICIARY, U256::from(200), 21),
            (OUTER, BENEFICIARY, U256::from(300), 55),
        ]
    );

    let post_state = extractor.take_post_state().expect("post state after replay");
    assert_eq!(balance_of(&post_state, BENEFICIARY), U256::from(500));
    assert_eq!(balance_of(&post_state, OUTER), U256::ZERO);
}

/// Entries under a failed frame are skipped; pc counts every visited entry.
#[test]
fn flat_error_branch_hides_descendants() {
    let mut failed_create = create_entry(vec![0], WALLET, INNER, Vec::new(), 0);
    failed_create.error = Some("Out of gas".to_string());
    failed_create.result = None;

    let bundle = flat_bundle(vec![
        call_entry(vec![], "call", SENDER, WALLET, 0),
        failed_create,
        call_entry(vec![0, 0], "call", INNER, PAYEE, 9),
        call_entry(vec![1], "call", WALLET, PAYEE, 7),
        call_entry(vec![2], "delegatecall", WALLET, OUTER, 0),
        suicide_entry(vec![3], WALLET, BENEFICIARY, 93),
    ]);

    let extracted = FlatTraceExtractor.extract(&bundle).expect("known entries");
    let trace = &extracted[0];

    assert_eq!(trace.outcome, ExecutionOutcome::Success);
    assert!(trace.contracts_created.is_empty());
    assert_eq!(trace.internal_transactions.len(), 1);
    assert_eq!(trace.internal_transactions[0].amount, U256::from(7));
    assert_eq!(trace.internal_transactions[0].pc, 4);
    assert_eq!(trace.contracts_destroyed.len(), 1);
    assert_eq!(trace.contracts_destroyed[0].refund_amount, U256::from(93));
    assert_eq!(trace.contracts_destroyed[0].pc, 6);
}

/// The outcome of a failed transaction comes from the root entry's error.
#[test]
fn flat_reverted_root_sets_outcome() {
    let mut root = call_entry(vec![], "call", SENDER, WALLET, 0);
    root.error = Some("Reverted".to_string());
    let mut bundle = flat_bundle(vec![root, call_entry(vec![0], "call", WALLET, PAYEE, 1)]);
    if let Some(receipts) = bundle.receipts.as_mut() {
        receipts[0].success = false;
    }

    let extracted = FlatTraceExtractor.extract(&bundle).expect("known entries");

    assert_eq!(
        extracted[0].outcome,
        ExecutionOutcome::Revert {
            reason: Some("Reverted".to_string())
        }
    );
    assert!(extracted[0].internal_transactions.is_empty());
}

/// A failed receipt drops every event even when no entry carries an error.
#[test]
fn flat_failed_receipt_without_error_markers_keeps_nothing() {
    let mut bundle = flat_bundle(vec![
        call_entry(vec![], "call", SENDER, WALLET, 0),
        call_entry(vec![0], "call", WALLET, PAYEE, 7),
    ]);
    if let Some(receipts) = bundle.receipts.as_mut() {
        receipts[0].success = false;
    }

    let extracted = FlatTraceExtractor.extract(&bundle).expect("known entries");

    assert_eq!(extracted[0].outcome, ExecutionOutcome::Revert { reason: None });
    assert!(extracted[0].internal_transactions.is_empty());
    assert!(extracted[0].touched_accounts.is_empty());
}

/// An unknown creation method makes the whole block untraceable.
#[test]
fn flat_unknown_creation_method_fails_block() {
    let mut create = create_entry(vec![0], WALLET, INNER, Vec::new(), 0);
    create.action.creation_method = Some("create3".to_string());
    let bundle = flat_bundle(vec![call_entry(vec![], "call", SENDER, WALLET, 0), create]);

    let err = FlatTraceExtractor
        .extract(&bundle)
        .expect_err("unknown creation method");

    match err {
        TraceError::UnhandledTrace {
            trace_type,
            trace_address,
            ..
        } => {
            assert_eq!(trace_type, "create");
            assert_eq!(trace_address, vec![0]);
        }
        other => panic!("expected UnhandledTrace, got {other:?}"),
    }
}

/// Both strategies report the same transfer; only the pc differs. Replay
/// also sees the fee payer and the coinbase.
#[test]
fn strategies_agree_on_internal_transfers() {
    let mut bundle = bundle(
        POST_MERGE_BLOCK,
        vec![transaction(1, SENDER, Some(WALLET), 0, 0, Vec::new())],
        alloc(vec![
            (SENDER, eoa(ETHER)),
            (WALLET, contract(call_with_value(PAYEE, 5), 100)),
        ]),
    );
    bundle.traces = Some(vec![vec![
        call_entry(vec![], "call", SENDER, WALLET, 0),
        call_entry(vec![0], "call", WALLET, PAYEE, 5),
    ]]);

    let endpoints = |traces: &[ExtractedTrace]| -> Vec<(Address, Address, U256)> {
        traces[0]
            .internal_transactions
            .iter()
            .map(|event| (event.from_address, event.to_address, event.amount))
            .collect()
    };

    let flat = FlatTraceExtractor.extract(&bundle).expect("known entries");
    let replayed = replay(&bundle);

    assert_eq!(endpoints(&flat), endpoints(&replayed));
    assert!(flat[0]
        .touched_accounts
        .is_subset(&replayed[0].touched_accounts));
    assert!(replayed[0].touched_accounts.contains(&SENDER));
    assert!(replayed[0].touched_accounts.contains(&COINBASE));
    assert_eq!(flat[0].internal_transactions[0].pc, 2);
    assert_eq!(replayed[0].internal_transactions[0].pc, 32);
}
