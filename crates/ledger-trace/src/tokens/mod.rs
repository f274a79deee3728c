//! Token standard classification for freshly created contracts.
//!
//! A small state machine walks a fixed-priority table of checks:
//!
//! ```text
//! Initial → ERC777 → ERC165 → ERC1155 → ERC721 → ERC20 → {TokenDetected | TokenNotDetected}
//! ```
//!
//! Each check takes the [`Classification`] accumulator by value and hands back
//! the updated one together with its verdict, which selects the next state.
//! Checks run one after another for a contract; different contracts may be
//! classified concurrently since probes are read-only.

pub mod metadata;
pub mod probes;
pub mod signatures;

use alloy::primitives::{Address, B256};
use ledger_data::config::{DetectorAddresses, LedgerConfig};
use ledger_data::{Classification, ContractCapability, ContractType};

use crate::executor::SimulatedCallExecutor;
use probes::{ITokenDetector, ProbeContext};

/// Classifier states.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DetectionState {
    Initial,
    Erc777,
    Erc165,
    Erc1155,
    Erc721,
    Erc20,
    TokenDetected,
    TokenNotDetected,
}

impl DetectionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::TokenDetected | Self::TokenNotDetected)
    }
}

type Check = fn(&ProbeContext<'_>, Classification) -> (bool, Classification);

/// One row of the transition table.
struct Transition {
    state: DetectionState,
    check: Check,
    on_positive: DetectionState,
    on_negative: DetectionState,
}

/// Checks in priority order. Earlier rows win; a new standard is a new row.
const TRANSITIONS: &[Transition] = &[
    Transition {
        state: DetectionState::Initial,
        check: start,
        on_positive: DetectionState::Erc777,
        on_negative: DetectionState::Erc777,
    },
    Transition {
        state: DetectionState::Erc777,
        check: check_erc777,
        on_positive: DetectionState::TokenDetected,
        on_negative: DetectionState::Erc165,
    },
    Transition {
        state: DetectionState::Erc165,
        check: check_erc165,
        on_positive: DetectionState::Erc1155,
        on_negative: DetectionState::Erc20,
    },
    Transition {
        state: DetectionState::Erc1155,
        check: check_erc1155,
        on_positive: DetectionState::TokenDetected,
        on_negative: DetectionState::Erc721,
    },
    Transition {
        state: DetectionState::Erc721,
        check: check_erc721,
        on_positive: DetectionState::TokenDetected,
        on_negative: DetectionState::Erc20,
    },
    Transition {
        state: DetectionState::Erc20,
        check: check_erc20,
        on_positive: DetectionState::TokenDetected,
        on_negative: DetectionState::TokenNotDetected,
    },
];

fn start(_ctx: &ProbeContext<'_>, acc: Classification) -> (bool, Classification) {
    (true, acc)
}

fn check_erc777(ctx: &ProbeContext<'_>, acc: Classification) -> (bool, Classification) {
    let call = ITokenDetector::hasERC777InterfaceCall {
        target: ctx.address,
    };
    if !ctx.probe(ctx.detectors.erc777, &call) {
        return (false, acc);
    }

    let mut acc = acc.with_type(ContractType::Erc777, ContractCapability::Erc777);
    acc.metadata.name = metadata::name(ctx);
    acc.metadata.symbol = metadata::symbol(ctx);
    acc.metadata.total_supply = metadata::total_supply(ctx);
    acc.metadata.granularity = metadata::granularity(ctx);
    (true, acc)
}

fn check_erc165(ctx: &ProbeContext<'_>, acc: Classification) -> (bool, Classification) {
    let call = ITokenDetector::hasERC165InterfaceCall {
        target: ctx.address,
    };
    if ctx.probe(ctx.detectors.erc165, &call) {
        (true, acc.with_capability(ContractCapability::Erc165))
    } else {
        (false, acc)
    }
}

fn check_erc1155(ctx: &ProbeContext<'_>, acc: Classification) -> (bool, Classification) {
    let call = ITokenDetector::hasERC1155InterfaceCall {
        target: ctx.address,
    };
    if ctx.probe(ctx.detectors.erc1155, &call) {
        return (
            true,
            acc.with_type(ContractType::Erc1155, ContractCapability::Erc1155),
        );
    }

    let receiver = ITokenDetector::hasERC1155TokenReceiverInterfaceCall {
        target: ctx.address,
    };
    if ctx.probe(ctx.detectors.erc1155, &receiver) {
        (
            false,
            acc.with_capability(ContractCapability::Erc1155TokenReceiver),
        )
    } else {
        (false, acc)
    }
}

fn check_erc721(ctx: &ProbeContext<'_>, acc: Classification) -> (bool, Classification) {
    let call = ITokenDetector::hasERC721InterfaceCall {
        target: ctx.address,
    };
    if !ctx.probe(ctx.detectors.erc721, &call) {
        return (false, acc);
    }

    let mut acc = acc.with_type(ContractType::Erc721, ContractCapability::Erc721);

    let metadata_call = ITokenDetector::hasERC721MetadataInterfaceCall {
        target: ctx.address,
    };
    if ctx.probe(ctx.detectors.erc721, &metadata_call) {
        acc = acc.with_capability(ContractCapability::Erc721Metadata);
        acc.metadata.name = metadata::name(ctx);
        acc.metadata.symbol = metadata::symbol(ctx);
    }

    let enumerable_call = ITokenDetector::hasERC721EnumerableInterfaceCall {
        target: ctx.address,
    };
    if ctx.probe(ctx.detectors.erc721, &enumerable_call) {
        acc = acc.with_capability(ContractCapability::Erc721Enumerable);
        acc.metadata.total_supply = metadata::total_supply(ctx);
    }

    (true, acc)
}

fn check_erc20(ctx: &ProbeContext<'_>, acc: Classification) -> (bool, Classification) {
    if !signatures::has_erc20_signatures(ctx.code) {
        return (false, acc);
    }

    let mut acc = acc.with_type(ContractType::Erc20, ContractCapability::Erc20);
    acc.metadata.total_supply = metadata::total_supply(ctx);

    for group in signatures::ERC20_EXTENSIONS {
        if !signatures::contains_all(ctx.code, group.signatures) {
            continue;
        }
        acc = acc.with_capability(group.capability);
        match group.capability {
            ContractCapability::Erc20Detailed => {
                acc.metadata.name = metadata::name(ctx);
                acc.metadata.symbol = metadata::symbol(ctx);
                acc.metadata.decimals = metadata::decimals(ctx);
            }
            ContractCapability::Erc20Capped => {
                acc.metadata.cap = metadata::cap(ctx);
            }
            _ => {}
        }
    }

    (true, acc)
}

/// Terminal state and accumulated classification of one contract.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassifierOutput {
    pub state: DetectionState,
    pub classification: Classification,
}

/// Classifies contracts by probing them through a [`SimulatedCallExecutor`].
pub struct TokenClassifier<'a> {
    executor: &'a dyn SimulatedCallExecutor,
    detectors: &'a DetectorAddresses,
    gas_limit: u64,
}

impl<'a> TokenClassifier<'a> {
    pub fn new(executor: &'a dyn SimulatedCallExecutor, config: &'a LedgerConfig) -> Self {
        Self {
            executor,
            detectors: &config.detectors,
            gas_limit: config.probe_gas_limit,
        }
    }

    /// Runs the state machine for one contract.
    ///
    /// # Arguments
    /// * `address` - Contract under classification
    /// * `code` - Its deployed bytecode
    /// * `block_hash` - State the probes execute against
    ///
    /// Always terminates in [`DetectionState::TokenDetected`] or
    /// [`DetectionState::TokenNotDetected`].
    pub fn classify(&self, address: Address, code: &[u8], block_hash: B256) -> ClassifierOutput {
        let ctx = ProbeContext {
            executor: self.executor,
            detectors: self.detectors,
            gas_limit: self.gas_limit,
            address,
            code,
            block_hash,
        };

        let mut state = DetectionState::Initial;
        let mut classification = Classification::default();

        while !state.is_terminal() {
            let Some(transition) = TRANSITIONS.iter().find(|t| t.state == state) else {
                state = DetectionState::TokenNotDetected;
                break;
            };
            let (positive, next) = (transition.check)(&ctx, classification);
            classification = next;
            state = if positive {
                transition.on_positive
            } else {
                transition.on_negative
            };
        }

        tracing::debug!(
            contract = %address,
            state = ?state,
            contract_type = %classification.contract_type,
            capabilities = classification.capabilities.len(),
            "classified contract"
        );

        ClassifierOutput {
            state,
            classification,
        }
    }
}
