//! Probe and metadata call plumbing shared by the classifier and the host.
//!
//! Two kinds of simulated call exist:
//! - a *probe* asks a detector contract whether the target implements an
//!   interface and gets an ABI-encoded `bool` back;
//! - a *metadata call* invokes one of the target's own standard getters.
//!
//! Both degrade to "absent" on any failure.

use alloy::primitives::{Address, Bytes, B256};
use alloy::sol;
use alloy::sol_types::{SolCall, SolValue};
use ledger_data::config::DetectorAddresses;

use crate::executor::{SimulatedCall, SimulatedCallExecutor};

sol! {
    /// Entry points answered by the on-host detector contracts.
    interface ITokenDetector {
        function hasERC777Interface(address target) external view returns (bool);
        function hasERC165Interface(address target) external view returns (bool);
        function hasERC1155Interface(address target) external view returns (bool);
        function hasERC1155TokenReceiverInterface(address target) external view returns (bool);
        function hasERC721Interface(address target) external view returns (bool);
        function hasERC721MetadataInterface(address target) external view returns (bool);
        function hasERC721EnumerableInterface(address target) external view returns (bool);
    }
}

sol! {
    /// ERC165 introspection.
    interface IERC165 {
        function supportsInterface(bytes4 interfaceId) external view returns (bool);
    }
}

sol! {
    /// Standard token getters read for metadata.
    interface ITokenMetadata {
        function name() external view returns (string);
        function symbol() external view returns (string);
        function decimals() external view returns (uint8);
        function totalSupply() external view returns (uint256);
        function granularity() external view returns (uint256);
        function cap() external view returns (uint256);
        function defaultOperators() external view returns (address[]);
    }
}

/// Everything a classification step needs to talk to one contract.
pub struct ProbeContext<'a> {
    pub executor: &'a dyn SimulatedCallExecutor,
    pub detectors: &'a DetectorAddresses,
    pub gas_limit: u64,
    /// Contract under classification.
    pub address: Address,
    /// Its deployed bytecode.
    pub code: &'a [u8],
    /// State the probes run against.
    pub block_hash: B256,
}

impl ProbeContext<'_> {
    fn simulate(&self, to: Address, input: Vec<u8>) -> Option<Bytes> {
        let call = SimulatedCall {
            to,
            input: input.into(),
            block_hash: self.block_hash,
            gas_limit: self.gas_limit,
        };
        self.executor.simulate(&call)?.successful_output()
    }

    /// Sends a detector probe; true only for a successful call decoding to `true`.
    pub fn probe<C: SolCall>(&self, detector: Address, call: &C) -> bool {
        let Some(output) = self.simulate(detector, call.abi_encode()) else {
            tracing::debug!(
                contract = %self.address,
                probe = C::SIGNATURE,
                "probe call failed"
            );
            return false;
        };

        match bool::abi_decode(&output, true) {
            Ok(answer) => answer,
            Err(error) => {
                tracing::debug!(
                    contract = %self.address,
                    probe = C::SIGNATURE,
                    error = %error,
                    "undecodable probe output"
                );
                false
            }
        }
    }

    /// Calls one of the contract's own getters and decodes its return values.
    pub fn call_contract<C: SolCall>(&self, call: &C) -> Option<C::Return> {
        let output = self.simulate(self.address, call.abi_encode())?;
        C::abi_decode_returns(&output, true)
            .map_err(|error| {
                tracing::debug!(
                    contract = %self.address,
                    getter = C::SIGNATURE,
                    error = %error,
                    "undecodable getter output"
                );
            })
            .ok()
    }
}
