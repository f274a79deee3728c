//! Benchmarks for ledger-trace core components.
//!
//! Uses synthetic traces and a canned executor (no state, no engine).
//! Run with: `cargo bench --package ledger-trace`

use alloy::primitives::{Address, Bytes, B256, U256};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ledger_data::trace::{FlatTrace, TraceAction};
use ledger_data::{ExecutionOutcome, LedgerConfig};
use ledger_trace::interpreter::flat::FlatTraceParser;
use ledger_trace::{CallOutput, SimulatedCall, SimulatedCallExecutor, TokenClassifier};

/// Executor whose every call fails, so classification falls through to the bytecode scan.
struct AlwaysFails;

impl SimulatedCallExecutor for AlwaysFails {
    fn simulate(&self, _call: &SimulatedCall) -> Option<CallOutput> {
        Some(CallOutput::default())
    }
}

fn value_call(trace_address: Vec<usize>, tag: u8) -> FlatTrace {
    FlatTrace {
        kind: "call".to_string(),
        trace_address,
        subtraces: 0,
        action: TraceAction {
            call_type: Some("call".to_string()),
            from: Some(Address::repeat_byte(tag)),
            to: Some(Address::repeat_byte(tag.wrapping_add(1))),
            value: Some(U256::from(tag)),
            ..TraceAction::default()
        },
        result: None,
        error: None,
        block_hash: None,
        transaction_hash: None,
    }
}

/// Root call plus 500 nested value transfers, every tenth one errored.
fn wide_trace() -> Vec<FlatTrace> {
    let mut entries = vec![value_call(Vec::new(), 0)];
    entries.extend((0..500).map(|i| {
        let mut entry = value_call(vec![i], i as u8);
        if i % 10 == 0 {
            entry.error = Some("Out of gas".to_string());
        }
        entry
    }));
    entries
}

/// Bytecode carrying every mandatory ERC20 selector behind PUSH4s.
fn erc20_like_code() -> Bytes {
    let selectors: [[u8; 4]; 6] = [
        [0x18, 0x16, 0x0d, 0xdd],
        [0x70, 0xa0, 0x82, 0x31],
        [0xa9, 0x05, 0x9c, 0xbb],
        [0x23, 0xb8, 0x72, 0xdd],
        [0x09, 0x5e, 0xa7, 0xb3],
        [0xdd, 0x62, 0xed, 0x3e],
    ];
    let mut code = Vec::with_capacity(2_048);
    code.extend(std::iter::repeat(0x5b).take(1_000));
    for selector in selectors {
        code.push(0x63);
        code.extend_from_slice(&selector);
    }
    Bytes::from(code)
}

/// Benchmark: interpret a 501-entry flat trace.
fn bench_flat_parse_501_entries(c: &mut Criterion) {
    let entries = wide_trace();
    c.bench_function("flat_parse_501_entries", |b| {
        b.iter(|| {
            let mut parser = FlatTraceParser::new(B256::ZERO, B256::repeat_byte(1));
            for entry in &entries {
                let _ = parser.apply(black_box(entry));
            }
            parser.finish(ExecutionOutcome::Success)
        });
    });
}

/// Benchmark: classify an ERC20-shaped contract whose probes all fail.
fn bench_classify_erc20(c: &mut Criterion) {
    let config = LedgerConfig::default();
    let classifier = TokenClassifier::new(&AlwaysFails, &config);
    let code = erc20_like_code();
    c.bench_function("classify_erc20_bytecode", |b| {
        b.iter(|| {
            classifier.classify(
                black_box(Address::repeat_byte(0x42)),
                black_box(&code),
                B256::ZERO,
            )
        });
    });
}

criterion_group!(benches, bench_flat_parse_501_entries, bench_classify_erc20);
criterion_main!(benches);
