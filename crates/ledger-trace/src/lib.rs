//! ledger-trace crate
//!
//! Trace interpretation (flat traces or live replay), token classification
//! through simulated calls, and transaction/block trace assembly.

pub mod assembler;
pub mod evm;
pub mod executor;
pub mod interpreter;
pub mod pipeline;
pub mod tokens;

pub use assembler::BlockTracer;
pub use evm::RevmCallExecutor;
pub use executor::{CallOutput, SimulatedCall, SimulatedCallExecutor};
pub use interpreter::{ExtractedTrace, FlatTraceExtractor, ReplayExtractor, TraceExtractor};
pub use pipeline::trace_block;
pub use tokens::{ClassifierOutput, DetectionState, TokenClassifier};
