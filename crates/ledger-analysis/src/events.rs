//! Token standard events decoded from receipt logs.
//!
//! ERC20 and ERC721 share the `Transfer`/`Approval` signatures and differ
//! only in whether the last parameter is indexed, so every definition is
//! matched on topic0 together with the exact topic count.

use alloy::primitives::{Address, U256};
use alloy::sol;
use alloy::sol_types::{SolEvent, TopicList};
use ledger_data::TxLog;
use serde::{Deserialize, Serialize};

sol! {
    interface IERC20 {
        event Transfer(address indexed from, address indexed to, uint256 value);
        event Approval(address indexed owner, address indexed spender, uint256 value);
    }
}

sol! {
    interface IERC721 {
        event Transfer(address indexed from, address indexed to, uint256 indexed tokenId);
        event Approval(address indexed owner, address indexed approved, uint256 indexed tokenId);
        event ApprovalForAll(address indexed owner, address indexed operator, bool approved);
    }
}

sol! {
    interface IERC1155 {
        event TransferSingle(address indexed operator, address indexed from, address indexed to, uint256 id, uint256 value);
        event TransferBatch(address indexed operator, address indexed from, address indexed to, uint256[] ids, uint256[] values);
        event URI(string value, uint256 indexed id);
    }
}

sol! {
    interface IERC777 {
        event Sent(address indexed operator, address indexed from, address indexed to, uint256 amount, bytes data, bytes operatorData);
        event Minted(address indexed operator, address indexed to, uint256 amount, bytes data, bytes operatorData);
        event Burned(address indexed operator, address indexed from, uint256 amount, bytes data, bytes operatorData);
        event AuthorizedOperator(address indexed operator, address indexed tokenHolder);
        event RevokedOperator(address indexed operator, address indexed tokenHolder);
    }
}

/// A recognised token standard event, tagged with the emitting contract.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TokenEvent {
    FungibleTransfer {
        token: Address,
        from: Address,
        to: Address,
        value: U256,
    },
    NonFungibleTransfer {
        token: Address,
        from: Address,
        to: Address,
        token_id: U256,
    },
    FungibleApproval {
        token: Address,
        owner: Address,
        spender: Address,
        value: U256,
    },
    NonFungibleApproval {
        token: Address,
        owner: Address,
        approved: Address,
        token_id: U256,
    },
    ApprovalForAll {
        token: Address,
        owner: Address,
        operator: Address,
        approved: bool,
    },
    TransferSingle {
        token: Address,
        operator: Address,
        from: Address,
        to: Address,
        id: U256,
        value: U256,
    },
    TransferBatch {
        token: Address,
        operator: Address,
        from: Address,
        to: Address,
        ids: Vec<U256>,
        values: Vec<U256>,
    },
    Uri {
        token: Address,
        id: U256,
        value: String,
    },
    Sent {
        token: Address,
        operator: Address,
        from: Address,
        to: Address,
        amount: U256,
    },
    Minted {
        token: Address,
        operator: Address,
        to: Address,
        amount: U256,
    },
    Burned {
        token: Address,
        operator: Address,
        from: Address,
        amount: U256,
    },
    AuthorizedOperator {
        token: Address,
        operator: Address,
        holder: Address,
    },
    RevokedOperator {
        token: Address,
        operator: Address,
        holder: Address,
    },
}

/// Value moved by a token event. Unset endpoints are mints and burns.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenMovement {
    pub from: Option<Address>,
    pub to: Option<Address>,
    pub amount: U256,
    pub token_id: Option<U256>,
}

impl TokenEvent {
    /// Contract that emitted the event.
    pub fn token(&self) -> Address {
        match self {
            Self::FungibleTransfer { token, .. }
            | Self::NonFungibleTransfer { token, .. }
            | Self::FungibleApproval { token, .. }
            | Self::NonFungibleApproval { token, .. }
            | Self::ApprovalForAll { token, .. }
            | Self::TransferSingle { token, .. }
            | Self::TransferBatch { token, .. }
            | Self::Uri { token, .. }
            | Self::Sent { token, .. }
            | Self::Minted { token, .. }
            | Self::Burned { token, .. }
            | Self::AuthorizedOperator { token, .. }
            | Self::RevokedOperator { token, .. } => *token,
        }
    }

    /// Token movements carried by the event; empty for approvals and metadata.
    ///
    /// A batch transfer yields one movement per id. A non-fungible transfer
    /// moves an amount of one.
    pub fn movements(&self) -> Vec<TokenMovement> {
        match self {
            Self::FungibleTransfer {
                from, to, value, ..
            } => vec![TokenMovement {
                from: Some(*from),
                to: Some(*to),
                amount: *value,
                token_id: None,
            }],
            Self::NonFungibleTransfer {
                from, to, token_id, ..
            } => vec![TokenMovement {
                from: Some(*from),
                to: Some(*to),
                amount: U256::from(1),
                token_id: Some(*token_id),
            }],
            Self::TransferSingle {
                from, to, id, value, ..
            } => vec![TokenMovement {
                from: Some(*from),
                to: Some(*to),
                amount: *value,
                token_id: Some(*id),
            }],
            Self::TransferBatch {
                from,
                to,
                ids,
                values,
                ..
            } => ids
                .iter()
                .zip(values)
                .map(|(id, value)| TokenMovement {
                    from: Some(*from),
                    to: Some(*to),
                    amount: *value,
                    token_id: Some(*id),
                })
                .collect(),
            Self::Sent {
                from, to, amount, ..
            } => vec![TokenMovement {
                from: Some(*from),
                to: Some(*to),
                amount: *amount,
                token_id: None,
            }],
            Self::Minted { to, amount, .. } => vec![TokenMovement {
                from: None,
                to: Some(*to),
                amount: *amount,
                token_id: None,
            }],
            Self::Burned { from, amount, .. } => vec![TokenMovement {
                from: Some(*from),
                to: None,
                amount: *amount,
                token_id: None,
            }],
            Self::FungibleApproval { .. }
            | Self::NonFungibleApproval { .. }
            | Self::ApprovalForAll { .. }
            | Self::Uri { .. }
            | Self::AuthorizedOperator { .. }
            | Self::RevokedOperator { .. } => Vec::new(),
        }
    }
}

/// Decodes `log` as `E` when topic0 and the topic count both match.
fn decode<E: SolEvent>(log: &TxLog) -> Option<E> {
    if log.topics.len() != <E::TopicList as TopicList>::COUNT
        || log.topics.first() != Some(&E::SIGNATURE_HASH)
    {
        return None;
    }

    match E::decode_raw_log(log.topics.iter().copied(), &log.data, true) {
        Ok(event) => Some(event),
        Err(error) => {
            tracing::trace!(
                contract = %log.address,
                event = E::SIGNATURE,
                error = %error,
                "skipping undecodable log"
            );
            None
        }
    }
}

/// Parses a receipt log into a [`TokenEvent`].
///
/// Returns `None` for logs matching no known token event.
pub fn parse_log(log: &TxLog) -> Option<TokenEvent> {
    let token = log.address;

    decode::<IERC20::Transfer>(log)
        .map(|e| TokenEvent::FungibleTransfer {
            token,
            from: e.from,
            to: e.to,
            value: e.value,
        })
        .or_else(|| {
            decode::<IERC721::Transfer>(log).map(|e| TokenEvent::NonFungibleTransfer {
                token,
                from: e.from,
                to: e.to,
                token_id: e.tokenId,
            })
        })
        .or_else(|| {
            decode::<IERC20::Approval>(log).map(|e| TokenEvent::FungibleApproval {
                token,
                owner: e.owner,
                spender: e.spender,
                value: e.value,
            })
        })
        .or_else(|| {
            decode::<IERC721::Approval>(log).map(|e| TokenEvent::NonFungibleApproval {
                token,
                owner: e.owner,
                approved: e.approved,
                token_id: e.tokenId,
            })
        })
        .or_else(|| {
            decode::<IERC721::ApprovalForAll>(log).map(|e| TokenEvent::ApprovalForAll {
                token,
                owner: e.owner,
                operator: e.operator,
                approved: e.approved,
            })
        })
        .or_else(|| {
            decode::<IERC1155::TransferSingle>(log).map(|e| TokenEvent::TransferSingle {
                token,
                operator: e.operator,
                from: e.from,
                to: e.to,
                id: e.id,
                value: e.value,
            })
        })
        .or_else(|| {
            decode::<IERC1155::TransferBatch>(log).map(|e| TokenEvent::TransferBatch {
                token,
                operator: e.operator,
                from: e.from,
                to: e.to,
                ids: e.ids,
                values: e.values,
            })
        })
        .or_else(|| {
            decode::<IERC1155::URI>(log).map(|e| TokenEvent::Uri {
                token,
                id: e.id,
                value: e.value,
            })
        })
        .or_else(|| {
            decode::<IERC777::Sent>(log).map(|e| TokenEvent::Sent {
                token,
                operator: e.operator,
                from: e.from,
                to: e.to,
                amount: e.amount,
            })
        })
        .or_else(|| {
            decode::<IERC777::Minted>(log).map(|e| TokenEvent::Minted {
                token,
                operator: e.operator,
                to: e.to,
                amount: e.amount,
            })
        })
        .or_else(|| {
            decode::<IERC777::Burned>(log).map(|e| TokenEvent::Burned {
                token,
                operator: e.operator,
                from: e.from,
                amount: e.amount,
            })
        })
        .or_else(|| {
            decode::<IERC777::AuthorizedOperator>(log).map(|e| TokenEvent::AuthorizedOperator {
                token,
                operator: e.operator,
                holder: e.tokenHolder,
            })
        })
        .or_else(|| {
            decode::<IERC777::RevokedOperator>(log).map(|e| TokenEvent::RevokedOperator {
                token,
                operator: e.operator,
                holder: e.tokenHolder,
            })
        })
}

/// Parses every recognised log, keeping its position within `logs`.
pub fn parse_logs(logs: &[TxLog]) -> Vec<(usize, TokenEvent)> {
    logs.iter()
        .enumerate()
        .filter_map(|(index, log)| parse_log(log).map(|event| (index, event)))
        .collect()
}
