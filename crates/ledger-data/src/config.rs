//! Tracing configuration: reward schedule, probe parameters, detector addresses.
//!
//! Loaded from a JSON file; every field falls back to Ethereum mainnet values.

use std::path::Path;
use std::str::FromStr;

use alloy::primitives::{address, Address, U256};
use eyre::{eyre, Context, Result};
use serde::{Deserialize, Serialize};

/// One Wei-denominated ether.
const ETHER: u128 = 1_000_000_000_000_000_000;

/// Which trace interpretation strategy to run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TraceStrategy {
    /// Parse the engine's flattened call-tree traces.
    #[default]
    Flat,
    /// Re-execute transactions with an instruction-level inspector.
    Replay,
}

impl FromStr for TraceStrategy {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "flat" => Ok(Self::Flat),
            "replay" => Ok(Self::Replay),
            other => Err(eyre!("unknown trace strategy '{other}' (expected flat|replay)")),
        }
    }
}

/// Block reward in effect from `from_block` onwards.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardEra {
    pub from_block: u64,
    pub reward: U256,
}

/// Block reward policy.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardSchedule {
    /// Eras sorted by `from_block`.
    pub eras: Vec<RewardEra>,
    /// Emit no rewards at all when the era reward is zero.
    pub skip_zero_block_rewards: bool,
    /// Coinbase bonus per included ommer is `reward / ommer_inclusion_divisor`.
    pub ommer_inclusion_divisor: u64,
    /// Ommer penalty per block of distance is `reward / ommer_distance_divisor`.
    pub ommer_distance_divisor: u64,
}

impl Default for RewardSchedule {
    fn default() -> Self {
        Self {
            eras: vec![
                RewardEra {
                    from_block: 0,
                    reward: U256::from(5 * ETHER),
                },
                // Byzantium
                RewardEra {
                    from_block: 4_370_000,
                    reward: U256::from(3 * ETHER),
                },
                // Constantinople
                RewardEra {
                    from_block: 7_280_000,
                    reward: U256::from(2 * ETHER),
                },
                // Paris
                RewardEra {
                    from_block: 15_537_394,
                    reward: U256::ZERO,
                },
            ],
            skip_zero_block_rewards: true,
            ommer_inclusion_divisor: 32,
            ommer_distance_divisor: 8,
        }
    }
}

impl RewardSchedule {
    /// Block reward in effect at `block_number`; zero before the first era.
    pub fn block_reward(&self, block_number: u64) -> U256 {
        self.eras
            .iter()
            .filter(|era| era.from_block <= block_number)
            .max_by_key(|era| era.from_block)
            .map(|era| era.reward)
            .unwrap_or_default()
    }
}

/// Addresses the host answers token-detector probes at.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorAddresses {
    pub erc165: Address,
    pub erc721: Address,
    pub erc777: Address,
    pub erc1155: Address,
}

impl Default for DetectorAddresses {
    fn default() -> Self {
        Self {
            erc165: address!("fffffffffffffffffffffffffffffffffffffffe"),
            erc721: address!("fffffffffffffffffffffffffffffffffffffffd"),
            erc777: address!("fffffffffffffffffffffffffffffffffffffffc"),
            erc1155: address!("fffffffffffffffffffffffffffffffffffffffb"),
        }
    }
}

/// Top-level configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub rewards: RewardSchedule,
    /// Gas handed to every probe and metadata call.
    pub probe_gas_limit: u64,
    pub detectors: DetectorAddresses,
    pub strategy: TraceStrategy,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            rewards: RewardSchedule::default(),
            probe_gas_limit: 100_000,
            detectors: DetectorAddresses::default(),
            strategy: TraceStrategy::default(),
        }
    }
}

impl LedgerConfig {
    /// Reads a JSON configuration file. Missing fields take their defaults.
    ///
    /// # Errors
    /// Returns error if the file cannot be read or is not valid JSON.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("failed to read config {}", path.display()))?;
        let config: Self = serde_json::from_str(&raw)
            .wrap_err_with(|| format!("failed to parse config {}", path.display()))?;

        tracing::debug!(
            path = %path.display(),
            eras = config.rewards.eras.len(),
            strategy = ?config.strategy,
            "loaded ledger config"
        );
        Ok(config)
    }
}
