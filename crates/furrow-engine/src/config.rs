//! Farm configuration.
//!
//! [`FarmConfig`] is read from a TOML or JSON file with `FURROW__*`
//! environment overrides (`FURROW__EMISSION__REWARD_PER_BLOCK=20`), then
//! turned into [`FarmParams`] and an initial pool list.
//!
//! ```toml
//! owner = "owner"
//! custody = "farm"
//! reward_asset = "reward"
//! fee_address = "dev"
//!
//! [emission]
//! kind = "staged_halving"
//! base_reward_per_block = 100
//! start_block = 200
//! blocks_per_stage = 100
//!
//! [[pools]]
//! asset = "lp"
//! weight = 200
//! deposit_fee_bps = 1000
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use furrow_core::constants::{DEFAULT_REFERRAL_BONUS_BPS, DEFAULT_WINDOW_BLOCKS, MAX_REFERRAL_BONUS_BPS};
use furrow_core::error::FarmError;
use furrow_core::traits::TokenService;
use furrow_core::types::{AccountId, Amount, AssetId, BlockHeight};

use crate::emission::{EmissionSchedule, RewardSource};
use crate::farm::{Farm, FarmParams};

/// Failures loading configuration or persisted state.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config load: {0}")] Load(#[from] config::ConfigError),
    #[error("invalid config: {0}")] Invalid(#[from] FarmError),
    #[error("io: {0}")] Io(#[from] std::io::Error),
    #[error("codec: {0}")] Codec(String),
}

/// Emission section. Amounts are plain integers in reward units.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EmissionConfig {
    FixedWindow {
        reward_per_block: u64,
        start_block: BlockHeight,
        #[serde(default)]
        end_block: Option<BlockHeight>,
    },
    StagedHalving {
        base_reward_per_block: u64,
        start_block: BlockHeight,
        blocks_per_stage: u64,
    },
    BudgetDepletion {
        reward_per_block: u64,
        start_block: BlockHeight,
        #[serde(default)]
        end_block: Option<BlockHeight>,
        budget: u64,
    },
}

impl EmissionConfig {
    /// Resolve defaults into a schedule. A missing end block gives a window
    /// of [`DEFAULT_WINDOW_BLOCKS`].
    pub fn to_schedule(&self) -> EmissionSchedule {
        let end = |start: BlockHeight, end: Option<BlockHeight>| {
            end.unwrap_or_else(|| start.saturating_add(DEFAULT_WINDOW_BLOCKS))
        };
        match *self {
            Self::FixedWindow {
                reward_per_block,
                start_block,
                end_block,
            } => EmissionSchedule::FixedWindow {
                reward_per_block: Amount::from(reward_per_block),
                start_block,
                end_block: end(start_block, end_block),
            },
            Self::StagedHalving {
                base_reward_per_block,
                start_block,
                blocks_per_stage,
            } => EmissionSchedule::StagedHalving {
                base_reward_per_block: Amount::from(base_reward_per_block),
                start_block,
                blocks_per_stage,
            },
            Self::BudgetDepletion {
                reward_per_block,
                start_block,
                end_block,
                budget,
            } => EmissionSchedule::BudgetDepletion {
                reward_per_block: Amount::from(reward_per_block),
                start_block,
                end_block: end(start_block, end_block),
                budget: Amount::from(budget),
            },
        }
    }
}

/// A pool created when the farm is built.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    pub asset: AssetId,
    pub weight: u64,
    #[serde(default)]
    pub deposit_fee_bps: u64,
}

fn default_bonus_bps() -> u64 {
    DEFAULT_REFERRAL_BONUS_BPS
}

fn default_max_bonus_bps() -> u64 {
    MAX_REFERRAL_BONUS_BPS
}

/// Top-level farm configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FarmConfig {
    pub owner: AccountId,
    pub custody: AccountId,
    pub reward_asset: AssetId,
    pub fee_address: AccountId,
    pub emission: EmissionConfig,
    #[serde(default = "default_bonus_bps")]
    pub referral_bonus_bps: u64,
    #[serde(default = "default_max_bonus_bps")]
    pub max_referral_bonus_bps: u64,
    #[serde(default)]
    pub reward_source: Option<RewardSource>,
    #[serde(default)]
    pub pools: Vec<PoolConfig>,
}

impl FarmConfig {
    /// Load from `path` (format by extension), then apply `FURROW__*`
    /// environment overrides.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let cfg = config::Config::builder()
            .add_source(config::File::from(path))
            .add_source(
                config::Environment::with_prefix("FURROW")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        let loaded: Self = cfg.try_deserialize()?;
        loaded.validate()?;
        Ok(loaded)
    }

    /// Parse a TOML document without environment overrides.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let cfg = config::Config::builder()
            .add_source(config::File::from_str(text, config::FileFormat::Toml))
            .build()?;
        let loaded: Self = cfg.try_deserialize()?;
        loaded.validate()?;
        Ok(loaded)
    }

    /// Check the schedule and the pool list.
    pub fn validate(&self) -> Result<(), FarmError> {
        self.emission.to_schedule().validate()?;
        if let Some(max) = self.emission.to_schedule().max_pools() {
            if self.pools.len() > max {
                return Err(FarmError::PoolLimitReached(max));
            }
        }
        Ok(())
    }

    pub fn to_params(&self) -> FarmParams {
        FarmParams {
            owner: self.owner,
            custody: self.custody,
            reward_asset: self.reward_asset,
            fee_address: self.fee_address,
            schedule: self.emission.to_schedule(),
            referral_bonus_bps: self.referral_bonus_bps,
            max_referral_bonus_bps: self.max_referral_bonus_bps,
            reward_source: self.reward_source,
        }
    }

    /// Build a farm over `tokens` and add the configured pools at `block`.
    pub fn build_farm<T: TokenService>(&self, tokens: T, block: BlockHeight) -> Result<Farm<T>, FarmError> {
        self.validate()?;
        let mut farm = Farm::new(self.to_params(), tokens)?;
        for pool in &self.pools {
            farm.add_pool(&self.owner, pool.weight, pool.asset, pool.deposit_fee_bps, block)?;
        }
        Ok(farm)
    }
}
