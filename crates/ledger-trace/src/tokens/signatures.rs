//! Function selectors and raw-bytecode signature scanning.
//!
//! ERC20 predates interface introspection, so it is recognised by finding the
//! 4-byte selectors of its functions inside the deployed bytecode (they appear
//! as `PUSH4` operands of the dispatcher).

use alloy::primitives::keccak256;
use ledger_data::ContractCapability;

/// The six functions every ERC20 token exposes.
pub const ERC20_MANDATORY: &[&str] = &[
    "totalSupply()",
    "balanceOf(address)",
    "transfer(address,uint256)",
    "transferFrom(address,address,uint256)",
    "approve(address,uint256)",
    "allowance(address,address)",
];

/// Optional ERC20 extension recognised when all of its selectors are present.
#[derive(Clone, Copy, Debug)]
pub struct SelectorGroup {
    pub capability: ContractCapability,
    pub signatures: &'static [&'static str],
}

pub const ERC20_EXTENSIONS: &[SelectorGroup] = &[
    SelectorGroup {
        capability: ContractCapability::Erc20Detailed,
        signatures: &["name()", "symbol()", "decimals()"],
    },
    SelectorGroup {
        capability: ContractCapability::Erc20Burnable,
        signatures: &["burn(uint256)", "burnFrom(address,uint256)"],
    },
    SelectorGroup {
        capability: ContractCapability::Erc20Mintable,
        signatures: &["mint(address,uint256)"],
    },
    SelectorGroup {
        capability: ContractCapability::Erc20Pausable,
        signatures: &["pause()", "unpause()"],
    },
    SelectorGroup {
        capability: ContractCapability::Erc20Capped,
        signatures: &["cap()"],
    },
];

/// First four bytes of `keccak256(signature)`.
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// True if `code` contains the selector of `signature` anywhere.
pub fn contains_selector(code: &[u8], signature: &str) -> bool {
    let needle = selector(signature);
    code.windows(needle.len()).any(|window| window == needle)
}

/// True if every signature's selector occurs in `code`.
pub fn contains_all(code: &[u8], signatures: &[&str]) -> bool {
    signatures
        .iter()
        .all(|signature| contains_selector(code, signature))
}

/// True if the bytecode carries all six mandatory ERC20 selectors.
pub fn has_erc20_signatures(code: &[u8]) -> bool {
    contains_all(code, ERC20_MANDATORY)
}
