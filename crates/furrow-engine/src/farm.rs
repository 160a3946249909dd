//! The farm: public entry points over pools, positions and payouts.
//!
//! [`Farm`] owns a [`FarmState`] and a [`TokenService`]. Every mutating
//! entry point runs inside [`Farm::atomically`]: if any step fails, both the
//! engine state and the token ledger are restored to what they were before
//! the call.
//!
//! Mutating calls follow one pattern:
//! 1. settle the target pool up to `block`
//! 2. compute the caller's pending reward
//! 3. move tokens (stake in/out, reward out, fee skim, referral bonus)
//! 4. checkpoint the position's reward debt

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use furrow_core::error::FarmError;
use furrow_core::traits::TokenService;
use furrow_core::types::{AccountId, Amount, AssetId, BlockHeight, Pool, PoolId, Position};

use crate::accrual;
use crate::emission::{ClaimPolicy, EmissionController, EmissionSchedule, RewardSource};
use crate::fees::{self, FeeCollector};
use crate::positions::PositionLedger;
use crate::referral::ReferralBook;
use crate::registry::PoolRegistry;

/// Parameters for a new farm.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FarmParams {
    /// Administrator allowed to add/set pools and tune the referral bonus.
    pub owner: AccountId,
    /// The farm's own account in the token service. Holds stake and reserve.
    pub custody: AccountId,
    pub reward_asset: AssetId,
    pub fee_address: AccountId,
    pub schedule: EmissionSchedule,
    pub referral_bonus_bps: u64,
    pub max_referral_bonus_bps: u64,
    /// Overrides the schedule's default payout source.
    pub reward_source: Option<RewardSource>,
}

/// Lifetime totals.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, bincode::Encode,
    bincode::Decode,
)]
pub struct FarmStats {
    /// Reward folded into pool accumulators.
    pub total_emitted: Amount,
    /// Reward paid to participants.
    pub total_paid: Amount,
    /// Bonus paid to referrers.
    pub total_bonus_paid: Amount,
}

/// Complete engine state. Cloned for rollback, encoded for persistence.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub struct FarmState {
    pub owner: AccountId,
    pub custody: AccountId,
    pub reward_asset: AssetId,
    pub reward_source: RewardSource,
    pub claim_policy: ClaimPolicy,
    pub emission: EmissionController,
    pub registry: PoolRegistry,
    pub positions: PositionLedger,
    pub referrals: ReferralBook,
    pub fees: FeeCollector,
    /// Reward tokens held in custody for reserve payouts.
    pub reward_reserve: Amount,
    pub stats: FarmStats,
}

impl FarmState {
    /// Fresh state with no pools.
    pub fn new(params: FarmParams) -> Result<Self, FarmError> {
        if params.owner.is_zero() || params.custody.is_zero() {
            return Err(FarmError::ZeroAddress);
        }
        let emission = EmissionController::new(params.schedule)?;
        let schedule = emission.schedule();
        Ok(Self {
            owner: params.owner,
            custody: params.custody,
            reward_asset: params.reward_asset,
            reward_source: params
                .reward_source
                .unwrap_or_else(|| schedule.default_reward_source()),
            claim_policy: schedule.claim_policy(),
            registry: PoolRegistry::new(schedule.max_pools()),
            positions: PositionLedger::new(),
            referrals: ReferralBook::new(params.referral_bonus_bps, params.max_referral_bonus_bps)?,
            fees: FeeCollector::new(params.fee_address)?,
            emission,
            reward_reserve: 0,
            stats: FarmStats::default(),
        })
    }
}

/// Multi-pool reward farm over a token service `T`.
#[derive(Debug)]
pub struct Farm<T: TokenService> {
    state: FarmState,
    tokens: T,
}

impl<T: TokenService> Farm<T> {
    /// Create a farm with no pools.
    pub fn new(params: FarmParams, tokens: T) -> Result<Self, FarmError> {
        let state = FarmState::new(params)?;
        info!(
            schedule = state.emission.schedule().kind(),
            source = ?state.reward_source,
            "farm: created"
        );
        Ok(Self { state, tokens })
    }

    /// Resume a farm from saved state.
    pub fn from_state(state: FarmState, tokens: T) -> Self {
        Self { state, tokens }
    }

    pub fn state(&self) -> &FarmState {
        &self.state
    }

    pub fn tokens(&self) -> &T {
        &self.tokens
    }

    /// Direct ledger access for setup (funding accounts, approvals).
    pub fn tokens_mut(&mut self) -> &mut T {
        &mut self.tokens
    }

    pub fn into_parts(self) -> (FarmState, T) {
        (self.state, self.tokens)
    }

    /// Run `op`, restoring engine state and ledger if it fails.
    fn atomically<R>(
        &mut self,
        op: impl FnOnce(&mut Self) -> Result<R, FarmError>,
    ) -> Result<R, FarmError> {
        let state = self.state.clone();
        let tokens = self.tokens.snapshot();
        let result = op(self);
        if let Err(e) = &result {
            debug!(error = %e, "farm: call failed, rolled back");
            self.state = state;
            self.tokens.restore(tokens);
        }
        result
    }

    // ------------------------------------------------------------------
    // Participant entry points
    // ------------------------------------------------------------------

    /// Stake `amount` of the pool's asset.
    ///
    /// Pending reward is harvested first (or parked in `unpaid` when claims
    /// are locked). A non-zero deposit binds `referrer` if the caller has no
    /// referrer yet. The deposit fee goes to the fee address and only the
    /// net amount is staked. `amount == 0` just harvests.
    pub fn deposit(
        &mut self,
        caller: &AccountId,
        pid: PoolId,
        amount: Amount,
        referrer: Option<&AccountId>,
        block: BlockHeight,
    ) -> Result<(), FarmError> {
        self.atomically(|farm| {
            farm.state.registry.get(pid)?;
            farm.state.emission.check_deposit_window(block)?;
            let acc = farm.settle(pid, block)?;

            if amount > 0 {
                if let Some(referrer) = referrer {
                    if farm.state.referrals.bind(caller, referrer) {
                        info!(%caller, %referrer, "farm: referrer bound");
                    }
                }
            }

            let mut position = farm.state.positions.get(pid, caller);
            let pending = position.pending(acc)?;
            if farm.state.claim_policy.claims_locked_until_end {
                position.unpaid = pending;
            } else {
                if pending > 0 {
                    farm.pay_claim(caller, pending)?;
                }
                position.unpaid = 0;
            }

            if amount > 0 {
                let pool = farm.state.registry.get(pid)?;
                let asset = pool.staked_asset;
                let (net, fee) = fees::split(amount, pool.deposit_fee_bps)?;
                let custody = farm.state.custody;
                farm.tokens
                    .transfer_from(&asset, &custody, caller, &custody, amount)?;
                if fee > 0 {
                    let fee_address = farm.state.fees.fee_address();
                    farm.tokens.transfer(&asset, &custody, &fee_address, fee)?;
                }
                position.amount = position
                    .amount
                    .checked_add(net)
                    .ok_or(FarmError::ArithmeticOverflow)?;
                let pool = farm.state.registry.get_mut(pid)?;
                pool.total_staked = pool
                    .total_staked
                    .checked_add(net)
                    .ok_or(FarmError::ArithmeticOverflow)?;
                info!(%caller, pid, %amount, %net, %fee, block, "farm: deposit");
            }

            position.checkpoint(acc)?;
            farm.state.positions.put(pid, caller, position);
            Ok(())
        })
    }

    /// Unstake `amount`. Stake can always be withdrawn.
    ///
    /// Single-pool windowed farms pay the pending reward once the window
    /// has closed. Before that, and on multi-pool farms, it is parked in
    /// `unpaid` for the next [`harvest`](Self::harvest).
    pub fn withdraw(
        &mut self,
        caller: &AccountId,
        pid: PoolId,
        amount: Amount,
        block: BlockHeight,
    ) -> Result<(), FarmError> {
        self.atomically(|farm| {
            farm.state.registry.get(pid)?;
            let mut position = farm.state.positions.get(pid, caller);
            if position.amount == 0 {
                return Err(FarmError::NoTokensStaked);
            }
            if amount > position.amount {
                return Err(FarmError::InsufficientStake {
                    have: position.amount,
                    need: amount,
                });
            }
            let acc = farm.settle(pid, block)?;

            let pending = position.pending(acc)?;
            let pay_now = farm.state.claim_policy.pay_on_withdraw
                && farm.state.emission.claims_open(block);
            if pay_now {
                if pending > 0 {
                    farm.pay_claim(caller, pending)?;
                }
                position.unpaid = 0;
            } else {
                position.unpaid = pending;
            }

            if amount > 0 {
                position.amount -= amount;
                let pool = farm.state.registry.get_mut(pid)?;
                pool.total_staked -= amount;
                let asset = pool.staked_asset;
                let custody = farm.state.custody;
                farm.tokens.transfer(&asset, &custody, caller, amount)?;
                info!(%caller, pid, %amount, block, "farm: withdraw");
            }

            position.checkpoint(acc)?;
            farm.state.positions.put(pid, caller, position);
            Ok(())
        })
    }

    /// Pay out all pending and unpaid reward. Returns the amount paid.
    pub fn harvest(
        &mut self,
        caller: &AccountId,
        pid: PoolId,
        block: BlockHeight,
    ) -> Result<Amount, FarmError> {
        self.atomically(|farm| {
            farm.state.registry.get(pid)?;
            farm.state.emission.check_claim_window(block)?;
            let mut position = farm.state.positions.get(pid, caller);
            if position.is_empty() {
                return Err(FarmError::NoTokensStaked);
            }
            let acc = farm.settle(pid, block)?;
            let pending = position.pending(acc)?;
            if pending == 0 {
                return Err(FarmError::NoRewardsToClaim);
            }
            let paid = farm.pay_claim(caller, pending)?;
            position.unpaid = 0;
            position.checkpoint(acc)?;
            farm.state.positions.put(pid, caller, position);
            info!(%caller, pid, %paid, block, "farm: harvest");
            Ok(paid)
        })
    }

    /// Return the whole stake, forfeiting all pending and unpaid reward.
    ///
    /// Never settles and ignores the emission window.
    pub fn emergency_withdraw(&mut self, caller: &AccountId, pid: PoolId) -> Result<Amount, FarmError> {
        self.atomically(|farm| {
            let position = farm.state.positions.get(pid, caller);
            let pool = farm.state.registry.get_mut(pid)?;
            if position.amount == 0 {
                return Err(FarmError::NoTokensStaked);
            }
            let amount = position.amount;
            pool.total_staked -= amount;
            let asset = pool.staked_asset;
            farm.state.positions.put(pid, caller, Position::default());
            let custody = farm.state.custody;
            farm.tokens.transfer(&asset, &custody, caller, amount)?;
            warn!(%caller, pid, %amount, forfeited_unpaid = %position.unpaid, "farm: emergency withdraw");
            Ok(amount)
        })
    }

    /// Pull `amount` of the reward asset from `funder` into the reserve.
    pub fn fund_rewards(&mut self, funder: &AccountId, amount: Amount) -> Result<(), FarmError> {
        self.atomically(|farm| {
            if farm.state.reward_source != RewardSource::Reserve {
                return Err(FarmError::Forbidden);
            }
            let asset = farm.state.reward_asset;
            let custody = farm.state.custody;
            farm.tokens
                .transfer_from(&asset, &custody, funder, &custody, amount)?;
            farm.state.reward_reserve = farm
                .state
                .reward_reserve
                .checked_add(amount)
                .ok_or(FarmError::ArithmeticOverflow)?;
            info!(%funder, %amount, reserve = %farm.state.reward_reserve, "farm: reserve funded");
            Ok(())
        })
    }

    // ------------------------------------------------------------------
    // Permissionless settlement
    // ------------------------------------------------------------------

    /// Settle one pool up to `block`.
    pub fn update_pool(&mut self, pid: PoolId, block: BlockHeight) -> Result<(), FarmError> {
        self.atomically(|farm| farm.settle(pid, block).map(|_| ()))
    }

    /// Settle every pool up to `block`, in pool order.
    pub fn mass_update(&mut self, block: BlockHeight) -> Result<(), FarmError> {
        self.atomically(|farm| farm.settle_all(block))
    }

    // ------------------------------------------------------------------
    // Administration
    // ------------------------------------------------------------------

    /// Register a pool for `asset`. Owner only.
    ///
    /// Existing pools are settled first since the total weight changes.
    pub fn add_pool(
        &mut self,
        caller: &AccountId,
        weight: u64,
        asset: AssetId,
        fee_bps: u64,
        block: BlockHeight,
    ) -> Result<PoolId, FarmError> {
        self.atomically(|farm| {
            farm.only_owner(caller)?;
            farm.state.registry.check_new(&asset, fee_bps)?;
            farm.settle_all(block)?;
            let start = farm.state.emission.schedule().start_block();
            let pid = farm
                .state
                .registry
                .add(asset, weight, fee_bps, block.max(start))?;
            info!(pid, %asset, weight, fee_bps, block, "farm: pool added");
            Ok(pid)
        })
    }

    /// Change a pool's weight and deposit fee. Owner only.
    pub fn set_pool(
        &mut self,
        caller: &AccountId,
        pid: PoolId,
        weight: u64,
        fee_bps: u64,
        block: BlockHeight,
    ) -> Result<(), FarmError> {
        self.atomically(|farm| {
            farm.only_owner(caller)?;
            farm.state.registry.get(pid)?;
            farm.settle_all(block)?;
            farm.state.registry.set(pid, weight, fee_bps)?;
            info!(pid, weight, fee_bps, block, "farm: pool updated");
            Ok(())
        })
    }

    /// Change the referral bonus rate. Owner only.
    pub fn update_referral_bonus(&mut self, caller: &AccountId, bps: u64) -> Result<(), FarmError> {
        self.atomically(|farm| {
            farm.only_owner(caller)?;
            farm.state.referrals.update_bonus_rate(bps)?;
            info!(bps, "farm: referral bonus updated");
            Ok(())
        })
    }

    /// Rotate the fee address. Current fee address only.
    pub fn set_fee_address(&mut self, caller: &AccountId, new_address: &AccountId) -> Result<(), FarmError> {
        self.atomically(|farm| {
            farm.state.fees.rotate(caller, new_address)?;
            info!(%new_address, "farm: fee address rotated");
            Ok(())
        })
    }

    /// Settle everything, then hand the reward token's minting right to
    /// `new_master`. Owner only. The farm's custody account must own the
    /// reward token.
    pub fn hand_over_minting(
        &mut self,
        caller: &AccountId,
        new_master: &AccountId,
        block: BlockHeight,
    ) -> Result<(), FarmError> {
        self.atomically(|farm| {
            farm.only_owner(caller)?;
            if new_master.is_zero() {
                return Err(FarmError::ZeroAddress);
            }
            farm.settle_all(block)?;
            let asset = farm.state.reward_asset;
            let custody = farm.state.custody;
            farm.tokens.set_master(&asset, &custody, new_master)?;
            info!(%new_master, block, "farm: minting handed over");
            Ok(())
        })
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Reward `who` could claim from `pid` at `block`.
    pub fn pending_reward(&self, pid: PoolId, who: &AccountId, block: BlockHeight) -> Result<Amount, FarmError> {
        let pool = self.state.registry.get(pid)?;
        let position = self.state.positions.get(pid, who);
        accrual::pending_at(
            pool,
            &position,
            self.state.registry.total_weight(),
            &self.state.emission,
            block,
        )
    }

    pub fn pool_info(&self, pid: PoolId) -> Result<&Pool, FarmError> {
        self.state.registry.get(pid)
    }

    pub fn user_info(&self, pid: PoolId, who: &AccountId) -> Position {
        self.state.positions.get(pid, who)
    }

    pub fn pool_count(&self) -> usize {
        self.state.registry.len()
    }

    pub fn total_weight(&self) -> u64 {
        self.state.registry.total_weight()
    }

    /// Total emission per block at `block`, across all pools.
    pub fn reward_per_block(&self, block: BlockHeight) -> Amount {
        self.state.emission.rate_at(block)
    }

    /// `pid`'s share of [`reward_per_block`](Self::reward_per_block).
    pub fn pool_reward_per_block(&self, pid: PoolId, block: BlockHeight) -> Result<Amount, FarmError> {
        let weight = self.state.registry.get(pid)?.weight;
        let total = self.state.registry.total_weight();
        if total == 0 {
            return Ok(0);
        }
        self.reward_per_block(block)
            .checked_mul(Amount::from(weight))
            .map(|v| v / Amount::from(total))
            .ok_or(FarmError::ArithmeticOverflow)
    }

    pub fn referrer_of(&self, who: &AccountId) -> Option<AccountId> {
        self.state.referrals.referrer_of(who)
    }

    pub fn referral_earnings(&self, referrer: &AccountId) -> Amount {
        self.state.referrals.earnings_of(referrer)
    }

    pub fn referral_bonus_bps(&self) -> u64 {
        self.state.referrals.bonus_bps()
    }

    pub fn remaining_budget(&self) -> Option<Amount> {
        self.state.emission.remaining_budget()
    }

    pub fn reward_reserve(&self) -> Amount {
        self.state.reward_reserve
    }

    pub fn fee_address(&self) -> AccountId {
        self.state.fees.fee_address()
    }

    pub fn owner(&self) -> AccountId {
        self.state.owner
    }

    pub fn schedule(&self) -> &EmissionSchedule {
        self.state.emission.schedule()
    }

    pub fn stats(&self) -> FarmStats {
        self.state.stats
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn only_owner(&self, caller: &AccountId) -> Result<(), FarmError> {
        if *caller != self.state.owner {
            return Err(FarmError::Forbidden);
        }
        Ok(())
    }

    /// Settle `pid` and return its accumulator.
    fn settle(&mut self, pid: PoolId, block: BlockHeight) -> Result<u128, FarmError> {
        let total_weight = self.state.registry.total_weight();
        let pool = self.state.registry.get_mut(pid)?;
        let emitted = accrual::settle(pool, total_weight, &mut self.state.emission, block)?;
        let acc = pool.acc_reward_per_share;
        self.state.stats.total_emitted = self.state.stats.total_emitted.saturating_add(emitted);
        Ok(acc)
    }

    fn settle_all(&mut self, block: BlockHeight) -> Result<(), FarmError> {
        for pid in 0..self.state.registry.len() {
            self.settle(pid, block)?;
        }
        Ok(())
    }

    /// Pay `amount` of claimed reward to `who` plus the referral bonus.
    /// Returns what `who` actually received.
    fn pay_claim(&mut self, who: &AccountId, amount: Amount) -> Result<Amount, FarmError> {
        let paid = self.pay_reward(who, amount)?;
        self.state.stats.total_paid = self.state.stats.total_paid.saturating_add(paid);

        if let Some((referrer, bonus)) = self.state.referrals.bonus_for(who, paid) {
            // Bonuses are emission too; a budget farm pays them from what is left.
            let bonus = self.state.emission.clamp_emission(bonus);
            if bonus > 0 {
                let bonus = self.pay_reward(&referrer, bonus)?;
                self.state.referrals.record(&referrer, bonus);
                self.state.stats.total_bonus_paid =
                    self.state.stats.total_bonus_paid.saturating_add(bonus);
                debug!(%referrer, %bonus, "farm: referral bonus paid");
            }
        }
        Ok(paid)
    }

    /// Move `amount` of reward to `to` from the configured source.
    ///
    /// Reserve payouts pay at most what the reserve holds.
    fn pay_reward(&mut self, to: &AccountId, amount: Amount) -> Result<Amount, FarmError> {
        let asset = self.state.reward_asset;
        let custody = self.state.custody;
        match self.state.reward_source {
            RewardSource::Mint => {
                self.tokens.mint(&asset, &custody, to, amount)?;
                Ok(amount)
            }
            RewardSource::Reserve => {
                let paid = amount.min(self.state.reward_reserve);
                if paid < amount {
                    warn!(%to, owed = %amount, %paid, "farm: reserve short, partial payout");
                }
                if paid > 0 {
                    self.tokens.transfer(&asset, &custody, to, paid)?;
                    self.state.reward_reserve -= paid;
                }
                Ok(paid)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use furrow_core::ledger::MemoryTokenLedger;

    fn id(label: &str) -> AccountId {
        AccountId::from_label(label)
    }

    fn asset(label: &str) -> AssetId {
        AssetId::from_label(label)
    }

    /// Fixed-window farm (rate 10, blocks 100..200) with one pool for "lp"
    /// and bob/carol each holding 1000 lp approved to the farm.
    fn fixed_farm() -> Farm<MemoryTokenLedger> {
        let mut tokens = MemoryTokenLedger::new();
        let farm_acct = id("farm");
        tokens.create_token(asset("reward"), farm_acct, None).unwrap();
        tokens.set_master(&asset("reward"), &farm_acct, &farm_acct).unwrap();
        tokens.create_token(asset("lp"), id("issuer"), None).unwrap();
        for who in ["bob", "carol"] {
            tokens.issue(&asset("lp"), &id(who), 1_000).unwrap();
            tokens.approve(&asset("lp"), &id(who), &farm_acct, Amount::MAX).unwrap();
        }
        let params = FarmParams {
            owner: id("owner"),
            custody: farm_acct,
            reward_asset: asset("reward"),
            fee_address: id("dev"),
            schedule: EmissionSchedule::FixedWindow {
                reward_per_block: 10,
                start_block: 100,
                end_block: 200,
            },
            referral_bonus_bps: 200,
            max_referral_bonus_bps: 1_000,
            reward_source: None,
        };
        let mut farm = Farm::new(params, tokens).unwrap();
        farm.add_pool(&id("owner"), 100, asset("lp"), 0, 50).unwrap();
        farm
    }

    fn reward_of(farm: &Farm<MemoryTokenLedger>, who: &str) -> Amount {
        farm.tokens().balance_of(&asset("reward"), &id(who))
    }

    #[test]
    fn single_staker_earns_full_window() {
        let mut farm = fixed_farm();
        farm.deposit(&id("bob"), 0, 100, None, 100).unwrap();
        assert_eq!(farm.pending_reward(0, &id("bob"), 100).unwrap(), 0);
        assert_eq!(farm.pending_reward(0, &id("bob"), 150).unwrap(), 500);
        farm.withdraw(&id("bob"), 0, 100, 200).unwrap();
        assert_eq!(reward_of(&farm, "bob"), 1000);
        assert_eq!(farm.tokens().balance_of(&asset("lp"), &id("bob")), 1_000);
        assert_eq!(farm.stats().total_paid, 1000);
        assert_eq!(farm.stats().total_emitted, 1000);
    }

    #[test]
    fn pool_starts_at_window_start() {
        let farm = fixed_farm();
        assert_eq!(farm.pool_info(0).unwrap().last_reward_block, 100);
    }

    #[test]
    fn second_pool_rejected_on_fixed_window() {
        let mut farm = fixed_farm();
        assert_eq!(
            farm.add_pool(&id("owner"), 100, asset("other"), 0, 60),
            Err(FarmError::PoolLimitReached(1))
        );
    }

    #[test]
    fn claims_locked_until_end() {
        let mut farm = fixed_farm();
        farm.deposit(&id("bob"), 0, 100, None, 100).unwrap();
        assert_eq!(farm.harvest(&id("bob"), 0, 150), Err(FarmError::StakingInProgress));
        assert_eq!(farm.harvest(&id("bob"), 0, 200).unwrap(), 1000);
    }

    #[test]
    fn early_withdraw_returns_stake_and_parks_reward() {
        let mut farm = fixed_farm();
        farm.deposit(&id("bob"), 0, 100, None, 100).unwrap();
        farm.withdraw(&id("bob"), 0, 40, 150).unwrap();
        assert_eq!(reward_of(&farm, "bob"), 0);
        assert_eq!(farm.tokens().balance_of(&asset("lp"), &id("bob")), 940);
        let pos = farm.user_info(0, &id("bob"));
        assert_eq!(pos.unpaid, 500);
        assert_eq!(pos.amount, 60);
        // the remaining stake still earns the whole second half, less a
        // floored unit
        assert_eq!(farm.pending_reward(0, &id("bob"), 200).unwrap(), 999);
        farm.withdraw(&id("bob"), 0, 60, 200).unwrap();
        assert_eq!(reward_of(&farm, "bob"), 999);
        assert_eq!(farm.user_info(0, &id("bob")), Position::default());
    }

    #[test]
    fn locked_deposit_parks_pending() {
        let mut farm = fixed_farm();
        farm.deposit(&id("bob"), 0, 100, None, 100).unwrap();
        farm.deposit(&id("bob"), 0, 100, None, 150).unwrap();
        let pos = farm.user_info(0, &id("bob"));
        assert_eq!(pos.unpaid, 500);
        assert_eq!(pos.amount, 200);
        assert_eq!(reward_of(&farm, "bob"), 0);
        assert_eq!(farm.pending_reward(0, &id("bob"), 200).unwrap(), 1000);
    }

    #[test]
    fn deposit_window_enforced() {
        let mut farm = fixed_farm();
        assert_eq!(
            farm.deposit(&id("bob"), 0, 100, None, 99),
            Err(FarmError::StakingNotStarted)
        );
        assert_eq!(
            farm.deposit(&id("bob"), 0, 100, None, 200),
            Err(FarmError::StakingEnded)
        );
    }

    #[test]
    fn withdraw_checks_stake() {
        let mut farm = fixed_farm();
        assert_eq!(farm.withdraw(&id("bob"), 0, 1, 200), Err(FarmError::NoTokensStaked));
        farm.deposit(&id("bob"), 0, 100, None, 100).unwrap();
        assert_eq!(
            farm.withdraw(&id("bob"), 0, 101, 200),
            Err(FarmError::InsufficientStake { have: 100, need: 101 })
        );
    }

    #[test]
    fn harvest_errors() {
        let mut farm = fixed_farm();
        assert_eq!(farm.harvest(&id("bob"), 0, 200), Err(FarmError::NoTokensStaked));
        farm.deposit(&id("bob"), 0, 100, None, 199).unwrap();
        farm.harvest(&id("bob"), 0, 200).unwrap();
        assert_eq!(farm.harvest(&id("bob"), 0, 210), Err(FarmError::NoRewardsToClaim));
    }

    #[test]
    fn emergency_withdraw_forfeits_reward() {
        let mut farm = fixed_farm();
        farm.deposit(&id("bob"), 0, 100, None, 100).unwrap();
        assert_eq!(farm.emergency_withdraw(&id("bob"), 0).unwrap(), 100);
        assert_eq!(farm.user_info(0, &id("bob")), Position::default());
        assert_eq!(farm.pool_info(0).unwrap().total_staked, 0);
        assert_eq!(farm.tokens().balance_of(&asset("lp"), &id("bob")), 1_000);
        assert_eq!(reward_of(&farm, "bob"), 0);
        assert_eq!(farm.emergency_withdraw(&id("bob"), 0), Err(FarmError::NoTokensStaked));
    }

    #[test]
    fn admin_calls_are_owner_only() {
        let mut farm = fixed_farm();
        assert_eq!(
            farm.set_pool(&id("bob"), 0, 1, 0, 100),
            Err(FarmError::Forbidden)
        );
        assert_eq!(farm.update_referral_bonus(&id("bob"), 500), Err(FarmError::Forbidden));
        assert_eq!(
            farm.hand_over_minting(&id("bob"), &id("bob"), 100),
            Err(FarmError::Forbidden)
        );
        farm.update_referral_bonus(&id("owner"), 500).unwrap();
        assert_eq!(farm.referral_bonus_bps(), 500);
    }

    #[test]
    fn fee_address_rotation() {
        let mut farm = fixed_farm();
        assert_eq!(farm.set_fee_address(&id("owner"), &id("x")), Err(FarmError::Forbidden));
        farm.set_fee_address(&id("dev"), &id("treasury")).unwrap();
        assert_eq!(farm.fee_address(), id("treasury"));
    }

    #[test]
    fn hand_over_minting_moves_master() {
        let mut farm = fixed_farm();
        farm.deposit(&id("bob"), 0, 100, None, 100).unwrap();
        farm.hand_over_minting(&id("owner"), &id("next"), 150).unwrap();
        assert_eq!(farm.tokens().master(&asset("reward")), Some(id("next")));
        assert_eq!(farm.pool_info(0).unwrap().last_reward_block, 150);
        // minting is gone, so the payout fails and rolls back
        assert!(farm.harvest(&id("bob"), 0, 200).is_err());
        assert_eq!(farm.pool_info(0).unwrap().last_reward_block, 150);
    }

    #[test]
    fn failed_call_rolls_back() {
        let mut farm = fixed_farm();
        farm.tokens_mut().issue(&asset("lp"), &id("dave"), 100).unwrap();
        let before = farm.state().clone();
        assert!(matches!(
            farm.deposit(&id("dave"), 0, 100, None, 150),
            Err(FarmError::Token(_))
        ));
        assert_eq!(farm.state(), &before);
        assert_eq!(farm.tokens().balance_of(&asset("lp"), &id("dave")), 100);
    }

    #[test]
    fn fund_rewards_rejected_for_minting_farm() {
        let mut farm = fixed_farm();
        assert_eq!(farm.fund_rewards(&id("bob"), 10), Err(FarmError::Forbidden));
    }

    #[test]
    fn reward_per_block_queries() {
        let farm = fixed_farm();
        assert_eq!(farm.reward_per_block(150), 10);
        assert_eq!(farm.pool_reward_per_block(0, 150).unwrap(), 10);
        assert_eq!(farm.pool_reward_per_block(0, 250).unwrap(), 0);
        assert_eq!(farm.pool_reward_per_block(1, 150), Err(FarmError::UnknownPool(1)));
    }

    #[test]
    fn unknown_pool_rejected() {
        let mut farm = fixed_farm();
        assert_eq!(
            farm.deposit(&id("bob"), 3, 1, None, 150),
            Err(FarmError::UnknownPool(3))
        );
        assert_eq!(farm.pending_reward(3, &id("bob"), 150), Err(FarmError::UnknownPool(3)));
    }
}
