//! Simulation scripts: timed farm calls replayed against an in-memory ledger.
//!
//! A script is a JSON array of steps:
//!
//! ```json
//! [
//!   { "block": 0,   "call": { "issue": { "asset": "lp", "to": "bob", "amount": 1000 } } },
//!   { "block": 210, "call": { "deposit": { "account": "bob", "pool": 0, "amount": 100 } } },
//!   { "block": 300, "call": "mass_update" }
//! ]
//! ```
//!
//! Accounts and assets are labels (or `0x` hex). Admin calls run as the
//! configured owner. A rejected call is recorded and the run continues.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use furrow_core::ledger::MemoryTokenLedger;
use furrow_core::traits::TokenService;
use furrow_core::types::{AccountId, Amount, AssetId, BlockHeight, Pool, PoolId};
use furrow_engine::{Farm, FarmConfig, FarmState, FarmStats};

/// One scripted call at a block height.
#[derive(Debug, Clone, Deserialize)]
pub struct Step {
    pub block: BlockHeight,
    pub call: Call,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Call {
    /// Give `to` tokens of `asset` and approve the farm to pull them.
    Issue { asset: String, to: String, amount: Amount },
    Deposit {
        account: String,
        pool: PoolId,
        amount: Amount,
        #[serde(default)]
        referrer: Option<String>,
    },
    Withdraw { account: String, pool: PoolId, amount: Amount },
    Harvest { account: String, pool: PoolId },
    EmergencyWithdraw { account: String, pool: PoolId },
    FundRewards { account: String, amount: Amount },
    UpdatePool { pool: PoolId },
    MassUpdate,
    AddPool {
        asset: String,
        weight: u64,
        #[serde(default)]
        deposit_fee_bps: u64,
    },
    SetPool { pool: PoolId, weight: u64, deposit_fee_bps: u64 },
    SetReferralBonus { bps: u64 },
    SetFeeAddress { address: String },
    HandOverMinting { to: String },
}

impl Call {
    fn name(&self) -> &'static str {
        match self {
            Self::Issue { .. } => "issue",
            Self::Deposit { .. } => "deposit",
            Self::Withdraw { .. } => "withdraw",
            Self::Harvest { .. } => "harvest",
            Self::EmergencyWithdraw { .. } => "emergency_withdraw",
            Self::FundRewards { .. } => "fund_rewards",
            Self::UpdatePool { .. } => "update_pool",
            Self::MassUpdate => "mass_update",
            Self::AddPool { .. } => "add_pool",
            Self::SetPool { .. } => "set_pool",
            Self::SetReferralBonus { .. } => "set_referral_bonus",
            Self::SetFeeAddress { .. } => "set_fee_address",
            Self::HandOverMinting { .. } => "hand_over_minting",
        }
    }
}

/// Result of one step.
#[derive(Debug, Serialize)]
pub struct Outcome {
    pub index: usize,
    pub block: BlockHeight,
    pub call: &'static str,
    pub ok: bool,
    /// Amount returned to the caller (harvest, emergency withdraw) or the
    /// id of a new pool.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Amount>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PoolReport {
    pub pid: PoolId,
    pub reward_per_block: Amount,
    #[serde(flatten)]
    pub pool: Pool,
}

#[derive(Debug, Serialize)]
pub struct StakeReport {
    pub pid: PoolId,
    pub amount: Amount,
    pub pending: Amount,
}

#[derive(Debug, Serialize)]
pub struct AccountReport {
    pub name: String,
    pub reward_balance: Amount,
    pub referral_earnings: Amount,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referrer: Option<String>,
    pub stakes: Vec<StakeReport>,
}

/// End-of-run summary.
#[derive(Debug, Serialize)]
pub struct Report {
    pub block: BlockHeight,
    pub schedule: &'static str,
    pub reward_per_block: Amount,
    pub remaining_budget: Option<Amount>,
    pub reward_reserve: Amount,
    pub stats: FarmStats,
    pub pools: Vec<PoolReport>,
    pub accounts: Vec<AccountReport>,
    pub steps: Vec<Outcome>,
}

/// A farm over a fresh in-memory ledger, driven by script steps.
pub struct Simulation {
    farm: Farm<MemoryTokenLedger>,
    owner: AccountId,
    custody: AccountId,
    names: BTreeMap<AccountId, String>,
}

impl Simulation {
    /// Build the configured farm at `block`. The reward token is owned and
    /// minted by the farm's custody account; pool assets are created on
    /// demand.
    pub fn new(config: &FarmConfig, block: BlockHeight) -> Result<Self> {
        let mut tokens = MemoryTokenLedger::new();
        tokens.create_token(config.reward_asset, config.custody, None)?;
        tokens.set_master(&config.reward_asset, &config.custody, &config.custody)?;
        for pool in &config.pools {
            if tokens.owner(&pool.asset).is_none() {
                tokens.create_token(pool.asset, config.owner, None)?;
            }
        }
        let farm = config
            .build_farm(tokens, block)
            .context("building farm from config")?;
        let mut names = BTreeMap::new();
        names.insert(config.owner, "owner".to_string());
        Ok(Self {
            farm,
            owner: config.owner,
            custody: config.custody,
            names,
        })
    }

    pub fn state(&self) -> &FarmState {
        self.farm.state()
    }

    fn account(&mut self, label: &str) -> Result<AccountId> {
        let id: AccountId = label
            .parse()
            .with_context(|| format!("bad account {label:?}"))?;
        self.names.entry(id).or_insert_with(|| label.to_string());
        Ok(id)
    }

    fn asset(&mut self, label: &str) -> Result<AssetId> {
        let asset: AssetId = label
            .parse()
            .with_context(|| format!("bad asset {label:?}"))?;
        if self.farm.tokens().owner(&asset).is_none() {
            self.farm.tokens_mut().create_token(asset, self.owner, None)?;
        }
        Ok(asset)
    }

    /// Apply one call. Returns the amount paid or the new pool id, if any.
    pub fn apply(&mut self, block: BlockHeight, call: &Call) -> Result<Option<Amount>> {
        let owner = self.owner;
        let value = match call {
            Call::Issue { asset, to, amount } => {
                let asset = self.asset(asset)?;
                let to = self.account(to)?;
                let custody = self.custody;
                let tokens = self.farm.tokens_mut();
                tokens.issue(&asset, &to, *amount)?;
                let allowance = tokens.allowance(&asset, &to, &custody);
                tokens.approve(&asset, &to, &custody, allowance.saturating_add(*amount))?;
                None
            }
            Call::Deposit { account, pool, amount, referrer } => {
                let who = self.account(account)?;
                let referrer = referrer.as_deref().map(|r| self.account(r)).transpose()?;
                self.farm.deposit(&who, *pool, *amount, referrer.as_ref(), block)?;
                None
            }
            Call::Withdraw { account, pool, amount } => {
                let who = self.account(account)?;
                self.farm.withdraw(&who, *pool, *amount, block)?;
                None
            }
            Call::Harvest { account, pool } => {
                let who = self.account(account)?;
                Some(self.farm.harvest(&who, *pool, block)?)
            }
            Call::EmergencyWithdraw { account, pool } => {
                let who = self.account(account)?;
                Some(self.farm.emergency_withdraw(&who, *pool)?)
            }
            Call::FundRewards { account, amount } => {
                let who = self.account(account)?;
                self.farm.fund_rewards(&who, *amount)?;
                None
            }
            Call::UpdatePool { pool } => {
                self.farm.update_pool(*pool, block)?;
                None
            }
            Call::MassUpdate => {
                self.farm.mass_update(block)?;
                None
            }
            Call::AddPool { asset, weight, deposit_fee_bps } => {
                let asset = self.asset(asset)?;
                let pid = self.farm.add_pool(&owner, *weight, asset, *deposit_fee_bps, block)?;
                Some(pid as Amount)
            }
            Call::SetPool { pool, weight, deposit_fee_bps } => {
                self.farm.set_pool(&owner, *pool, *weight, *deposit_fee_bps, block)?;
                None
            }
            Call::SetReferralBonus { bps } => {
                self.farm.update_referral_bonus(&owner, *bps)?;
                None
            }
            Call::SetFeeAddress { address } => {
                let address = self.account(address)?;
                self.farm.set_fee_address(&owner, &address)?;
                None
            }
            Call::HandOverMinting { to } => {
                let to = self.account(to)?;
                self.farm.hand_over_minting(&owner, &to, block)?;
                None
            }
        };
        Ok(value)
    }

    /// Run every step in order, recording failures instead of stopping.
    pub fn run(&mut self, steps: &[Step]) -> Vec<Outcome> {
        let mut outcomes = Vec::with_capacity(steps.len());
        for (index, step) in steps.iter().enumerate() {
            let call = step.call.name();
            let outcome = match self.apply(step.block, &step.call) {
                Ok(value) => {
                    debug!(index, block = step.block, call, "sim: step applied");
                    Outcome { index, block: step.block, call, ok: true, value, error: None }
                }
                Err(e) => {
                    warn!(index, block = step.block, call, error = %e, "sim: step rejected");
                    Outcome {
                        index,
                        block: step.block,
                        call,
                        ok: false,
                        value: None,
                        error: Some(format!("{e:#}")),
                    }
                }
            };
            outcomes.push(outcome);
        }
        outcomes
    }

    /// Summarise the farm as seen at `block`.
    pub fn report(&self, block: BlockHeight, steps: Vec<Outcome>) -> Result<Report> {
        let farm = &self.farm;
        let mut pools = Vec::with_capacity(farm.pool_count());
        for pid in 0..farm.pool_count() {
            pools.push(PoolReport {
                pid,
                reward_per_block: farm.pool_reward_per_block(pid, block)?,
                pool: farm.pool_info(pid)?.clone(),
            });
        }

        let reward = farm.state().reward_asset;
        let mut accounts = Vec::new();
        for (id, name) in &self.names {
            let mut stakes = Vec::new();
            for pid in 0..farm.pool_count() {
                let position = farm.user_info(pid, id);
                if position.amount == 0 && position.unpaid == 0 {
                    continue;
                }
                stakes.push(StakeReport {
                    pid,
                    amount: position.amount,
                    pending: farm.pending_reward(pid, id, block)?,
                });
            }
            accounts.push(AccountReport {
                name: name.clone(),
                reward_balance: farm.tokens().balance_of(&reward, id),
                referral_earnings: farm.referral_earnings(id),
                referrer: farm.referrer_of(id).map(|r| self.name_of(&r)),
                stakes,
            });
        }

        Ok(Report {
            block,
            schedule: farm.schedule().kind(),
            reward_per_block: farm.reward_per_block(block),
            remaining_budget: farm.remaining_budget(),
            reward_reserve: farm.reward_reserve(),
            stats: farm.stats(),
            pools,
            accounts,
            steps,
        })
    }

    fn name_of(&self, id: &AccountId) -> String {
        self.names.get(id).cloned().unwrap_or_else(|| id.to_string())
    }
}
