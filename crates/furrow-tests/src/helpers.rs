//! Shared fixtures for scenario and property tests.

use furrow_core::ledger::MemoryTokenLedger;
use furrow_core::traits::TokenService;
use furrow_core::types::{AccountId, Amount, AssetId};
use furrow_engine::emission::{EmissionSchedule, RewardSource};
use furrow_engine::farm::{Farm, FarmParams};

pub type TestFarm = Farm<MemoryTokenLedger>;

/// Label-derived account.
pub fn id(label: &str) -> AccountId {
    AccountId::from_label(label)
}

/// Label-derived asset.
pub fn asset(label: &str) -> AssetId {
    AssetId::from_label(label)
}

pub fn owner() -> AccountId {
    id("owner")
}

/// The farm's custody account.
pub fn custody() -> AccountId {
    id("farm")
}

pub fn dev() -> AccountId {
    id("dev")
}

pub fn reward() -> AssetId {
    asset("reward")
}

/// Ledger with the reward token owned and minted by the farm's custody
/// account, optionally capped.
pub fn ledger(cap: Option<Amount>) -> MemoryTokenLedger {
    let mut tokens = MemoryTokenLedger::new();
    tokens.create_token(reward(), custody(), cap).unwrap();
    tokens.set_master(&reward(), &custody(), &custody()).unwrap();
    tokens
}

/// Farm with default referral settings and the schedule's default source.
pub fn farm(schedule: EmissionSchedule) -> TestFarm {
    farm_with(schedule, None, ledger(None))
}

pub fn farm_with(
    schedule: EmissionSchedule,
    source: Option<RewardSource>,
    tokens: MemoryTokenLedger,
) -> TestFarm {
    let params = FarmParams {
        owner: owner(),
        custody: custody(),
        reward_asset: reward(),
        fee_address: dev(),
        schedule,
        referral_bonus_bps: 200,
        max_referral_bonus_bps: 1_000,
        reward_source: source,
    };
    Farm::new(params, tokens).unwrap()
}

pub fn fixed_window(rate: Amount, start: u64, end: u64) -> EmissionSchedule {
    EmissionSchedule::FixedWindow {
        reward_per_block: rate,
        start_block: start,
        end_block: end,
    }
}

pub fn staged_halving(base: Amount, start: u64, blocks_per_stage: u64) -> EmissionSchedule {
    EmissionSchedule::StagedHalving {
        base_reward_per_block: base,
        start_block: start,
        blocks_per_stage,
    }
}

pub fn budget_depletion(rate: Amount, start: u64, end: u64, budget: Amount) -> EmissionSchedule {
    EmissionSchedule::BudgetDepletion {
        reward_per_block: rate,
        start_block: start,
        end_block: end,
        budget,
    }
}

/// Add a pool for `label`, registering the asset in the ledger if needed.
pub fn add_pool(farm: &mut TestFarm, label: &str, weight: u64, fee_bps: u64, block: u64) -> usize {
    let a = asset(label);
    if farm.tokens().owner(&a).is_none() {
        farm.tokens_mut().create_token(a, id("issuer"), None).unwrap();
    }
    farm.add_pool(&owner(), weight, a, fee_bps, block).unwrap()
}

/// Give `who` `amount` of `label` and approve the farm to pull all of it.
pub fn fund(farm: &mut TestFarm, label: &str, who: &AccountId, amount: Amount) {
    let a = asset(label);
    if farm.tokens().owner(&a).is_none() {
        farm.tokens_mut().create_token(a, id("issuer"), None).unwrap();
    }
    farm.tokens_mut().issue(&a, who, amount).unwrap();
    farm.tokens_mut().approve(&a, who, &custody(), Amount::MAX).unwrap();
}

/// Fund the reserve with `amount` of freshly issued reward tokens.
pub fn fund_reserve(farm: &mut TestFarm, amount: Amount) {
    let funder = id("treasury");
    farm.tokens_mut().issue(&reward(), &funder, amount).unwrap();
    farm.tokens_mut().approve(&reward(), &funder, &custody(), amount).unwrap();
    farm.fund_rewards(&funder, amount).unwrap();
}

pub fn balance(farm: &TestFarm, label: &str, who: &AccountId) -> Amount {
    farm.tokens().balance_of(&asset(label), who)
}

pub fn reward_balance(farm: &TestFarm, who: &AccountId) -> Amount {
    farm.tokens().balance_of(&reward(), who)
}
