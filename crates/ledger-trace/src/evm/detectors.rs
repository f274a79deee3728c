//! Native token-detector contracts.
//!
//! Each configured detector address answers [`ITokenDetector`] calls. The host
//! decodes the probe, runs the read-only sub-calls it needs against the target
//! contract and replies with an ABI-encoded `bool`. ERC20 has no detector: the
//! classifier scans bytecode for it directly.

use alloy::primitives::{fixed_bytes, Address, Bytes, FixedBytes};
use alloy::sol_types::{SolCall, SolInterface, SolValue};
use ledger_data::config::DetectorAddresses;

use crate::executor::CallOutput;
use crate::tokens::probes::{IERC165, ITokenDetector, ITokenMetadata};

const ERC165_ID: FixedBytes<4> = fixed_bytes!("01ffc9a7");
const INVALID_ID: FixedBytes<4> = fixed_bytes!("ffffffff");
const ERC1155_ID: FixedBytes<4> = fixed_bytes!("d9b67a26");
const ERC1155_TOKEN_RECEIVER_ID: FixedBytes<4> = fixed_bytes!("4e2312e0");
const ERC721_ID: FixedBytes<4> = fixed_bytes!("80ac58cd");
const ERC721_METADATA_ID: FixedBytes<4> = fixed_bytes!("5b5e139f");
const ERC721_ENUMERABLE_ID: FixedBytes<4> = fixed_bytes!("780e9d63");

/// A decoded probe addressed to the detector that owns it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum DetectorCall {
    Erc777(Address),
    Erc165(Address),
    Erc1155(Address),
    Erc1155TokenReceiver(Address),
    Erc721(Address),
    Erc721Metadata(Address),
    Erc721Enumerable(Address),
}

impl DetectorCall {
    /// Decodes `input` sent to detector `to`. A selector owned by another
    /// detector, or no known selector at all, yields `None`.
    fn decode(detectors: &DetectorAddresses, to: Address, input: &[u8]) -> Option<Self> {
        use ITokenDetector::ITokenDetectorCalls as Calls;

        let (owner, call) = match Calls::abi_decode(input, true).ok()? {
            Calls::hasERC777Interface(c) => (detectors.erc777, Self::Erc777(c.target)),
            Calls::hasERC165Interface(c) => (detectors.erc165, Self::Erc165(c.target)),
            Calls::hasERC1155Interface(c) => (detectors.erc1155, Self::Erc1155(c.target)),
            Calls::hasERC1155TokenReceiverInterface(c) => {
                (detectors.erc1155, Self::Erc1155TokenReceiver(c.target))
            }
            Calls::hasERC721Interface(c) => (detectors.erc721, Self::Erc721(c.target)),
            Calls::hasERC721MetadataInterface(c) => {
                (detectors.erc721, Self::Erc721Metadata(c.target))
            }
            Calls::hasERC721EnumerableInterface(c) => {
                (detectors.erc721, Self::Erc721Enumerable(c.target))
            }
        };
        (owner == to).then_some(call)
    }
}

/// True if `to` is one of the configured detector addresses.
pub fn is_detector(detectors: &DetectorAddresses, to: Address) -> bool {
    [
        detectors.erc165,
        detectors.erc721,
        detectors.erc777,
        detectors.erc1155,
    ]
    .contains(&to)
}

/// Answers a call made to a detector address.
///
/// # Arguments
/// * `to`, `input` - The incoming call
/// * `sub_call` - Read-only call against the probed state; `Some` only on success
///
/// Returns `None` if `to` is not a detector, and a failed [`CallOutput`] for
/// an unrecognised probe.
pub fn answer<S>(
    detectors: &DetectorAddresses,
    to: Address,
    input: &[u8],
    sub_call: S,
) -> Option<CallOutput>
where
    S: Fn(Address, Bytes) -> Option<Bytes>,
{
    if !is_detector(detectors, to) {
        return None;
    }

    let Some(call) = DetectorCall::decode(detectors, to, input) else {
        tracing::debug!(detector = %to, "unrecognised detector call");
        return Some(CallOutput::default());
    };

    let supports = |target: Address, interface_id: FixedBytes<4>| {
        let input = IERC165::supportsInterfaceCall {
            interfaceId: interface_id,
        }
        .abi_encode();
        sub_call(target, input.into())
            .and_then(|output| bool::abi_decode(&output, true).ok())
            .unwrap_or(false)
    };
    let succeeds = |target: Address, input: Vec<u8>| sub_call(target, input.into()).is_some();

    let verdict = match call {
        DetectorCall::Erc777(target) => {
            succeeds(target, ITokenMetadata::nameCall {}.abi_encode())
                && succeeds(target, ITokenMetadata::symbolCall {}.abi_encode())
                && succeeds(target, ITokenMetadata::totalSupplyCall {}.abi_encode())
                && succeeds(target, ITokenMetadata::granularityCall {}.abi_encode())
                && succeeds(target, ITokenMetadata::defaultOperatorsCall {}.abi_encode())
        }
        DetectorCall::Erc165(target) => {
            supports(target, ERC165_ID) && !supports(target, INVALID_ID)
        }
        DetectorCall::Erc1155(target) => supports(target, ERC1155_ID),
        DetectorCall::Erc1155TokenReceiver(target) => supports(target, ERC1155_TOKEN_RECEIVER_ID),
        DetectorCall::Erc721(target) => supports(target, ERC721_ID),
        DetectorCall::Erc721Metadata(target) => supports(target, ERC721_METADATA_ID),
        DetectorCall::Erc721Enumerable(target) => supports(target, ERC721_ENUMERABLE_ID),
    };

    tracing::trace!(detector = %to, call = ?call, verdict, "detector answered");
    Some(CallOutput {
        output: verdict.abi_encode().into(),
        success: true,
    })
}
