//! Live interception: events are captured from revm inspector callbacks while
//! a block is re-executed.
//!
//! The parent frame never sees directly whether a child CREATE succeeded, so
//! each frame buffers its own events in a [`FrameStack`]. When a frame exits
//! successfully its buffer (preceded by the frame's own creation or transfer)
//! moves to the parent; a reverted or halted frame drops its buffer together
//! with everything its descendants handed up to it.

use alloy::primitives::{Address, Bytes, B256, U256};
use ledger_data::{
    BlockBundle, ContractCreated, ContractDestroyed, InternalTransaction, TraceError,
};
use revm::interpreter::{
    CallInputs, CallOutcome, CallScheme, CreateInputs, CreateOutcome, Interpreter,
};
use revm::{Database, EvmContext, Inspector};

use super::{ExtractedTrace, TraceEvents, TraceExtractor};
use crate::evm::replay::{execution_outcome, BlockReplayer};
use crate::evm::StateDb;

/// What a frame emits for itself once it completes successfully.
#[derive(Clone, Debug, PartialEq, Eq)]
enum FrameOrigin {
    /// Transaction root, delegate/static calls, zero-value calls.
    Plain,
    Transfer(InternalTransaction),
    Create {
        originator: Address,
        amount: U256,
        pc: u64,
    },
}

#[derive(Debug)]
struct Frame {
    origin: FrameOrigin,
    events: TraceEvents,
}

/// Per-depth frame bookkeeping for one transaction.
#[derive(Debug)]
pub struct FrameStack {
    transaction_hash: B256,
    frames: Vec<Frame>,
    committed: TraceEvents,
}

impl FrameStack {
    pub fn new(transaction_hash: B256) -> Self {
        Self {
            transaction_hash,
            frames: Vec::new(),
            committed: TraceEvents::default(),
        }
    }

    /// Current call depth; 0 before the root frame is entered.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    fn push(&mut self, origin: FrameOrigin) {
        self.frames.push(Frame {
            origin,
            events: TraceEvents::default(),
        });
    }

    /// Enters a message-call frame. `transfer` is the value moved by CALL or
    /// CALLCODE; below the root a non-zero transfer is an internal transaction.
    pub fn enter_call(&mut self, from: Address, to: Address, transfer: Option<U256>, pc: u64) {
        let origin = match transfer {
            Some(amount) if !amount.is_zero() && !self.frames.is_empty() => {
                FrameOrigin::Transfer(InternalTransaction {
                    from_address: from,
                    to_address: to,
                    amount,
                    pc,
                    transaction_hash: Some(self.transaction_hash),
                })
            }
            _ => FrameOrigin::Plain,
        };
        self.push(origin);
    }

    /// Enters a CREATE/CREATE2 frame (or the contract-creation transaction root).
    pub fn enter_create(&mut self, originator: Address, amount: U256, pc: u64) {
        self.push(FrameOrigin::Create {
            originator,
            amount,
            pc,
        });
    }

    /// Records a SELFDESTRUCT executed by the current frame.
    /// `refund_amount` is the balance held right before destruction.
    pub fn selfdestruct(
        &mut self,
        contract_address: Address,
        refund_address: Address,
        refund_amount: U256,
        pc: u64,
    ) {
        let event = ContractDestroyed {
            contract_address,
            refund_address,
            refund_amount,
            pc,
            transaction_hash: Some(self.transaction_hash),
        };
        match self.frames.last_mut() {
            Some(frame) => frame.events.contracts_destroyed.push(event),
            None => tracing::warn!(contract = %contract_address, "selfdestruct outside any frame"),
        }
    }

    /// Hands a completed frame's events to its parent, or to the committed set
    /// for the root frame.
    fn settle(&mut self, success: bool, own: Option<OwnEvent>) {
        let Some(frame) = self.frames.pop() else {
            tracing::warn!(tx_hash = %self.transaction_hash, "frame exit without matching entry");
            return;
        };
        if !success {
            return;
        }

        let mut settled = TraceEvents::default();
        match own {
            Some(OwnEvent::Created(created)) => settled.contracts_created.push(created),
            Some(OwnEvent::Transfer(transfer)) => settled.internal_transactions.push(transfer),
            None => {}
        }
        settled.append(frame.events);

        let sink = match self.frames.last_mut() {
            Some(parent) => &mut parent.events,
            None => &mut self.committed,
        };
        sink.append(settled);
    }

    /// Leaves the current message-call frame.
    pub fn exit_call(&mut self, success: bool) {
        let own = match self.frames.last().map(|frame| &frame.origin) {
            Some(FrameOrigin::Transfer(transfer)) => Some(OwnEvent::Transfer(transfer.clone())),
            _ => None,
        };
        self.settle(success, own);
    }

    /// Leaves the current create frame. The creation is kept only when the
    /// frame succeeded and produced an address.
    pub fn exit_create(&mut self, success: bool, address: Option<Address>, code: Bytes) {
        let own = match (self.frames.last().map(|frame| &frame.origin), address) {
            (
                Some(FrameOrigin::Create {
                    originator,
                    amount,
                    pc,
                }),
                Some(address),
            ) => Some(OwnEvent::Created(ContractCreated::new(
                *originator,
                address,
                code,
                *amount,
                *pc,
                Some(self.transaction_hash),
            ))),
            _ => None,
        };
        let success = success && own.is_some();
        self.settle(success, own);
    }

    /// Events of the transaction. Frames still open (never exited) count as failed.
    pub fn finish(mut self) -> TraceEvents {
        if !self.frames.is_empty() {
            tracing::warn!(
                tx_hash = %self.transaction_hash,
                open_frames = self.frames.len(),
                "discarding unterminated frames"
            );
            self.frames.clear();
        }
        self.committed
    }
}

enum OwnEvent {
    Created(ContractCreated),
    Transfer(InternalTransaction),
}

/// revm [`Inspector`] feeding a [`FrameStack`].
#[derive(Debug)]
pub struct LiveTracer {
    frames: FrameStack,
    last_pc: u64,
}

impl LiveTracer {
    pub fn new(transaction_hash: B256) -> Self {
        Self {
            frames: FrameStack::new(transaction_hash),
            last_pc: 0,
        }
    }

    /// Offset of the instruction that opened a new frame; 0 for the root.
    fn origin_pc(&self) -> u64 {
        if self.frames.depth() == 0 {
            0
        } else {
            self.last_pc
        }
    }

    pub fn finish(self) -> TraceEvents {
        self.frames.finish()
    }
}

impl<DB: Database> Inspector<DB> for LiveTracer {
    fn step(&mut self, interp: &mut Interpreter, _context: &mut EvmContext<DB>) {
        self.last_pc = interp.program_counter() as u64;
    }

    fn call(&mut self, _context: &mut EvmContext<DB>, inputs: &mut CallInputs) -> Option<CallOutcome> {
        let pc = self.origin_pc();
        let to = match inputs.scheme {
            CallScheme::CallCode => inputs.bytecode_address,
            _ => inputs.target_address,
        };
        self.frames
            .enter_call(inputs.caller, to, inputs.transfer_value(), pc);
        None
    }

    fn call_end(
        &mut self,
        _context: &mut EvmContext<DB>,
        _inputs: &CallInputs,
        outcome: CallOutcome,
    ) -> CallOutcome {
        self.frames.exit_call(outcome.result.is_ok());
        outcome
    }

    fn create(
        &mut self,
        _context: &mut EvmContext<DB>,
        inputs: &mut CreateInputs,
    ) -> Option<CreateOutcome> {
        let pc = self.origin_pc();
        self.frames.enter_create(inputs.caller, inputs.value, pc);
        None
    }

    fn create_end(
        &mut self,
        context: &mut EvmContext<DB>,
        _inputs: &CreateInputs,
        outcome: CreateOutcome,
    ) -> CreateOutcome {
        let code = outcome
            .address
            .and_then(|address| context.journaled_state.state.get(&address))
            .and_then(|account| account.info.code.as_ref())
            .map(|code| code.original_bytes())
            .unwrap_or_default();
        self.frames
            .exit_create(outcome.result.is_ok(), outcome.address, code);
        outcome
    }

    fn selfdestruct(&mut self, contract: Address, target: Address, value: U256) {
        self.frames.selfdestruct(contract, target, value, self.last_pc);
    }
}

/// [`TraceExtractor`] that replays the block from its parent state.
///
/// After [`extract`](TraceExtractor::extract) the post-block state is kept so
/// created contracts can be probed against it.
#[derive(Default)]
pub struct ReplayExtractor {
    post_state: Option<StateDb>,
}

impl ReplayExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// State after the last replayed block, if any.
    pub fn take_post_state(&mut self) -> Option<StateDb> {
        self.post_state.take()
    }
}

impl TraceExtractor for ReplayExtractor {
    #[tracing::instrument(skip_all, fields(block_number = bundle.header.number))]
    fn extract(&mut self, bundle: &BlockBundle) -> Result<Vec<ExtractedTrace>, TraceError> {
        let mut replayer = BlockReplayer::new(&bundle.header, &bundle.pre_state);
        let mut extracted = Vec::with_capacity(bundle.transactions.len());

        for tx in &bundle.transactions {
            let mut tracer = LiveTracer::new(tx.hash);
            let replayed = replayer.replay_tx(tx, &mut tracer)?;
            let mut trace = tracer
                .finish()
                .into_trace(tx.hash, execution_outcome(&replayed.result));
            trace.touched_accounts.extend(replayed.touched);
            extracted.push(trace);
        }

        self.post_state = Some(replayer.into_state());
        tracing::debug!(transactions = extracted.len(), "replayed block");
        Ok(extracted)
    }
}
