//! End-to-end block tracing: interpret, build the probe state, assemble.

use ledger_data::{BlockBundle, BlockTrace, LedgerConfig, TraceError, TraceStrategy};

use crate::assembler::BlockTracer;
use crate::evm::RevmCallExecutor;
use crate::interpreter::{FlatTraceExtractor, ReplayExtractor, TraceExtractor};

/// Traces one block with the chosen interpretation strategy.
///
/// Created contracts are probed against the post-block state: the bundle's
/// `post_state` for flat traces (falling back to `pre_state`), the replayed
/// state for the replay strategy.
///
/// # Errors
/// Any [`TraceError`] raised while interpreting or assembling the block.
#[tracing::instrument(skip(bundle, config), fields(block_number = bundle.header.number))]
pub fn trace_block(
    bundle: &BlockBundle,
    config: &LedgerConfig,
    strategy: TraceStrategy,
) -> Result<BlockTrace, TraceError> {
    let block_hash = bundle.header.hash;

    let (extracted, executor) = match strategy {
        TraceStrategy::Flat => {
            let extracted = FlatTraceExtractor.extract(bundle)?;
            let state = bundle.post_state.as_ref().unwrap_or(&bundle.pre_state);
            let executor =
                RevmCallExecutor::from_alloc(block_hash, state, config.detectors.clone());
            (extracted, executor)
        }
        TraceStrategy::Replay => {
            let mut extractor = ReplayExtractor::new();
            let extracted = extractor.extract(bundle)?;
            let mut executor = RevmCallExecutor::new(config.detectors.clone());
            if let Some(state) = extractor.take_post_state() {
                executor.insert_snapshot(block_hash, state);
            }
            (extracted, executor)
        }
    };

    BlockTracer::new(config, &executor).trace(bundle, extracted)
}
