//! Emission schedules and the controller that evaluates them.
//!
//! Three schedules share one accrual algorithm:
//!
//! - [`EmissionSchedule::FixedWindow`]: constant rate in `[start, end)`,
//!   single pool, claims locked until `end`.
//! - [`EmissionSchedule::StagedHalving`]: the rate decays by 4/5 every
//!   `blocks_per_stage` blocks and never ends.
//! - [`EmissionSchedule::BudgetDepletion`]: constant rate in `[start, end)`
//!   with total emission capped by a pre-funded budget.
//!
//! Stage rates for the halving schedule:
//! - Stage 0 (`[start, start + S)`): `base`
//! - Stage 1: `base * 8 / 10`
//! - Stage n: the stage n-1 rate times 8/10, floored
//! - Stage ≥ [`MAX_HALVING_STAGES`]: 0

use serde::{Deserialize, Serialize};
use tracing::warn;

use furrow_core::constants::{HALVING_DENOMINATOR, HALVING_NUMERATOR, MAX_HALVING_STAGES};
use furrow_core::error::FarmError;
use furrow_core::types::{Amount, BlockHeight};

/// Emission schedule parameters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub enum EmissionSchedule {
    FixedWindow {
        reward_per_block: Amount,
        start_block: BlockHeight,
        end_block: BlockHeight,
    },
    StagedHalving {
        base_reward_per_block: Amount,
        start_block: BlockHeight,
        blocks_per_stage: u64,
    },
    BudgetDepletion {
        reward_per_block: Amount,
        start_block: BlockHeight,
        end_block: BlockHeight,
        budget: Amount,
    },
}

impl EmissionSchedule {
    /// First block that emits.
    pub fn start_block(&self) -> BlockHeight {
        match self {
            Self::FixedWindow { start_block, .. }
            | Self::StagedHalving { start_block, .. }
            | Self::BudgetDepletion { start_block, .. } => *start_block,
        }
    }

    /// First block that no longer emits, for windowed schedules.
    pub fn end_block(&self) -> Option<BlockHeight> {
        match self {
            Self::FixedWindow { end_block, .. } | Self::BudgetDepletion { end_block, .. } => {
                Some(*end_block)
            }
            Self::StagedHalving { .. } => None,
        }
    }

    /// Short name used in logs and reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::FixedWindow { .. } => "fixed_window",
            Self::StagedHalving { .. } => "staged_halving",
            Self::BudgetDepletion { .. } => "budget_depletion",
        }
    }

    /// Claim rules that go with this schedule.
    pub fn claim_policy(&self) -> ClaimPolicy {
        match self {
            Self::FixedWindow { .. } => ClaimPolicy {
                claims_locked_until_end: true,
                pay_on_withdraw: true,
            },
            Self::StagedHalving { .. } | Self::BudgetDepletion { .. } => ClaimPolicy {
                claims_locked_until_end: false,
                pay_on_withdraw: false,
            },
        }
    }

    /// Where payouts come from unless configured otherwise.
    pub fn default_reward_source(&self) -> RewardSource {
        match self {
            Self::BudgetDepletion { .. } => RewardSource::Reserve,
            _ => RewardSource::Mint,
        }
    }

    /// Maximum number of pools the schedule supports.
    pub fn max_pools(&self) -> Option<usize> {
        match self {
            Self::FixedWindow { .. } => Some(1),
            _ => None,
        }
    }

    /// Check parameters for internal consistency.
    ///
    /// # Errors
    ///
    /// - [`FarmError::InvalidConfig`] for an empty window or zero-length stage
    pub fn validate(&self) -> Result<(), FarmError> {
        match self {
            Self::FixedWindow { start_block, end_block, .. }
            | Self::BudgetDepletion { start_block, end_block, .. } => {
                if end_block <= start_block {
                    return Err(FarmError::InvalidConfig(format!(
                        "end block {end_block} must be after start block {start_block}"
                    )));
                }
            }
            Self::StagedHalving { blocks_per_stage, .. } => {
                if *blocks_per_stage == 0 {
                    return Err(FarmError::InvalidConfig(
                        "blocks_per_stage must be non-zero".into(),
                    ));
                }
            }
        }
        Ok(())
    }
}

/// When settled reward may leave the engine.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode,
)]
pub struct ClaimPolicy {
    /// Harvest fails before the end block; deposits and withdrawals park
    /// pending reward in `unpaid`.
    pub claims_locked_until_end: bool,
    /// Withdraw pays pending reward; otherwise it is parked in `unpaid`
    /// for the next harvest.
    pub pay_on_withdraw: bool,
}

/// How reward payouts are funded.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode,
)]
#[serde(rename_all = "snake_case")]
pub enum RewardSource {
    /// Mint fresh reward tokens; the engine's custody account must be the
    /// reward token's minting master.
    Mint,
    /// Transfer from the pre-funded reserve held in custody.
    Reserve,
}

/// Stateful evaluator for an [`EmissionSchedule`].
///
/// Owns the remaining budget of a budget-depletion schedule. Every other
/// query is pure.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub struct EmissionController {
    schedule: EmissionSchedule,
    remaining_budget: Option<Amount>,
}

impl EmissionController {
    /// Validate `schedule` and wrap it in a controller.
    pub fn new(schedule: EmissionSchedule) -> Result<Self, FarmError> {
        schedule.validate()?;
        let remaining_budget = match &schedule {
            EmissionSchedule::BudgetDepletion { budget, .. } => Some(*budget),
            _ => None,
        };
        Ok(Self {
            schedule,
            remaining_budget,
        })
    }

    pub fn schedule(&self) -> &EmissionSchedule {
        &self.schedule
    }

    /// Budget left to emit, for budget-depletion schedules.
    pub fn remaining_budget(&self) -> Option<Amount> {
        self.remaining_budget
    }

    /// Whether `block` lies inside the emission window.
    pub fn is_active(&self, block: BlockHeight) -> bool {
        block >= self.schedule.start_block()
            && self.schedule.end_block().is_none_or(|end| block < end)
    }

    /// `block` capped at the end of the window.
    pub fn effective_block(&self, block: BlockHeight) -> BlockHeight {
        match self.schedule.end_block() {
            Some(end) => block.min(end),
            None => block,
        }
    }

    /// Halving stage `block` falls in. Always 0 for constant-rate schedules
    /// and for blocks before the start.
    pub fn stage_at(&self, block: BlockHeight) -> u64 {
        match &self.schedule {
            EmissionSchedule::StagedHalving {
                start_block,
                blocks_per_stage,
                ..
            } => block.saturating_sub(*start_block) / blocks_per_stage,
            _ => 0,
        }
    }

    /// Blocks until the next rate change after `block`.
    ///
    /// Before the start this counts down to the start block. Returns `None`
    /// for constant-rate schedules once started, and for a halving schedule
    /// whose rate has already reached zero.
    pub fn blocks_until_next_stage(&self, block: BlockHeight) -> Option<u64> {
        let start = self.schedule.start_block();
        if block < start {
            return Some(start - block);
        }
        match &self.schedule {
            EmissionSchedule::StagedHalving {
                start_block,
                blocks_per_stage,
                ..
            } => {
                let stage = self.stage_at(block);
                if self.stage_rate(stage) == 0 {
                    return None;
                }
                let next = start_block.saturating_add((stage + 1).saturating_mul(*blocks_per_stage));
                Some(next - block)
            }
            _ => None,
        }
    }

    /// Per-block rate of halving stage `stage`.
    pub fn stage_rate(&self, stage: u64) -> Amount {
        match &self.schedule {
            EmissionSchedule::StagedHalving {
                base_reward_per_block,
                ..
            } => decayed_rate(*base_reward_per_block, stage),
            EmissionSchedule::FixedWindow {
                reward_per_block, ..
            }
            | EmissionSchedule::BudgetDepletion {
                reward_per_block, ..
            } => *reward_per_block,
        }
    }

    /// Total reward emitted at `block` across all pools.
    pub fn rate_at(&self, block: BlockHeight) -> Amount {
        if !self.is_active(block) {
            return 0;
        }
        self.stage_rate(self.stage_at(block))
    }

    /// Emission over blocks `[from, to)`, clipped to the window.
    ///
    /// Spans crossing halving stages are summed stage by stage.
    pub fn emission_between(&self, from: BlockHeight, to: BlockHeight) -> Result<Amount, FarmError> {
        let from = from.max(self.schedule.start_block());
        let to = self.effective_block(to);
        if to <= from {
            return Ok(0);
        }
        match &self.schedule {
            EmissionSchedule::StagedHalving {
                start_block,
                blocks_per_stage,
                ..
            } => {
                let mut total: Amount = 0;
                let mut cursor = from;
                while cursor < to {
                    let stage = self.stage_at(cursor);
                    let rate = self.stage_rate(stage);
                    if rate == 0 {
                        break;
                    }
                    let stage_end = start_block
                        .saturating_add((stage + 1).saturating_mul(*blocks_per_stage))
                        .min(to);
                    let chunk = rate
                        .checked_mul(Amount::from(stage_end - cursor))
                        .ok_or(FarmError::ArithmeticOverflow)?;
                    total = total.checked_add(chunk).ok_or(FarmError::ArithmeticOverflow)?;
                    cursor = stage_end;
                }
                Ok(total)
            }
            _ => self
                .stage_rate(0)
                .checked_mul(Amount::from(to - from))
                .ok_or(FarmError::ArithmeticOverflow),
        }
    }

    /// Deduct `amount` from the remaining budget and return what may
    /// actually be emitted. Unbudgeted schedules pass `amount` through.
    pub fn clamp_emission(&mut self, amount: Amount) -> Amount {
        let Some(remaining) = self.remaining_budget else {
            return amount;
        };
        let granted = amount.min(remaining);
        if granted < amount {
            warn!(requested = %amount, granted = %granted, "farm: emission clamped by budget");
        }
        self.remaining_budget = Some(remaining - granted);
        granted
    }

    /// What [`clamp_emission`](Self::clamp_emission) would grant, without
    /// consuming budget.
    pub fn preview_clamp(&self, amount: Amount) -> Amount {
        match self.remaining_budget {
            Some(remaining) => amount.min(remaining),
            None => amount,
        }
    }

    /// Reject deposits outside the emission window.
    pub fn check_deposit_window(&self, block: BlockHeight) -> Result<(), FarmError> {
        if block < self.schedule.start_block() {
            return Err(FarmError::StakingNotStarted);
        }
        match self.schedule.end_block() {
            Some(end) if block >= end => Err(FarmError::StakingEnded),
            _ => Ok(()),
        }
    }

    /// Whether settled reward may be paid out at `block`.
    pub fn claims_open(&self, block: BlockHeight) -> bool {
        if !self.schedule.claim_policy().claims_locked_until_end {
            return true;
        }
        self.schedule.end_block().is_none_or(|end| block >= end)
    }

    /// Reject claims before the end block when the claim policy locks them.
    pub fn check_claim_window(&self, block: BlockHeight) -> Result<(), FarmError> {
        if self.claims_open(block) {
            Ok(())
        } else {
            Err(FarmError::StakingInProgress)
        }
    }
}

/// Apply the 4/5 decay `stage` times, flooring after each step.
///
/// Split into quotient and remainder so `rate * 8` cannot overflow.
fn decayed_rate(base: Amount, stage: u64) -> Amount {
    if stage >= MAX_HALVING_STAGES {
        return 0;
    }
    let mut rate = base;
    for _ in 0..stage {
        if rate == 0 {
            break;
        }
        rate = rate / HALVING_DENOMINATOR * HALVING_NUMERATOR
            + rate % HALVING_DENOMINATOR * HALVING_NUMERATOR / HALVING_DENOMINATOR;
    }
    rate
}
