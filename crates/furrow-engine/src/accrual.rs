//! Per-pool reward accumulator.
//!
//! Each pool tracks `acc_reward_per_share`: reward earned by one staked unit
//! since the pool was created, scaled by [`ACC_PRECISION`]. Settling folds
//! the emission since `last_reward_block` into it:
//!
//! ```text
//! reward = emission(last, now) * weight / total_weight   (then budget clamp)
//! acc   += reward * ACC_PRECISION / total_staked
//! ```
//!
//! A participant's pending reward is then
//! `amount * acc / ACC_PRECISION - reward_debt + unpaid`.

use tracing::debug;

use furrow_core::constants::ACC_PRECISION;
use furrow_core::error::FarmError;
use furrow_core::types::{Amount, BlockHeight, Pool, Position};

use crate::emission::EmissionController;

/// What settling a pool up to some block would do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    /// Already settled at or past the block.
    Skip,
    /// Advance `last_reward_block` without emitting.
    Idle(BlockHeight),
    /// Emit `reward` (before the budget clamp) and advance.
    Emit { to: BlockHeight, reward: Amount },
}

fn plan(
    pool: &Pool,
    total_weight: u64,
    emission: &EmissionController,
    block: BlockHeight,
) -> Result<Step, FarmError> {
    if block <= pool.last_reward_block {
        return Ok(Step::Skip);
    }
    let to = emission.effective_block(block);
    if to <= pool.last_reward_block {
        return Ok(Step::Skip);
    }
    if pool.total_staked == 0 || pool.weight == 0 || total_weight == 0 {
        return Ok(Step::Idle(to));
    }
    let emitted = emission.emission_between(pool.last_reward_block, to)?;
    let reward = emitted
        .checked_mul(Amount::from(pool.weight))
        .ok_or(FarmError::ArithmeticOverflow)?
        / Amount::from(total_weight);
    Ok(Step::Emit { to, reward })
}

fn acc_increment(reward: Amount, total_staked: Amount) -> Result<u128, FarmError> {
    reward
        .checked_mul(ACC_PRECISION)
        .map(|v| v / total_staked)
        .ok_or(FarmError::ArithmeticOverflow)
}

/// Bring `pool` up to date with `block`. Idempotent.
///
/// Returns the reward folded into the accumulator (after the budget clamp).
/// Emission over spans where nothing is staked is not banked.
pub fn settle(
    pool: &mut Pool,
    total_weight: u64,
    emission: &mut EmissionController,
    block: BlockHeight,
) -> Result<Amount, FarmError> {
    match plan(pool, total_weight, emission, block)? {
        Step::Skip => Ok(0),
        Step::Idle(to) => {
            pool.last_reward_block = to;
            Ok(0)
        }
        Step::Emit { to, reward } => {
            // Checked before the clamp so a failed settle consumes no budget.
            let increment = acc_increment(emission.preview_clamp(reward), pool.total_staked)?;
            let acc = pool
                .acc_reward_per_share
                .checked_add(increment)
                .ok_or(FarmError::ArithmeticOverflow)?;
            let granted = emission.clamp_emission(reward);
            let from = pool.last_reward_block;
            pool.acc_reward_per_share = acc;
            pool.last_reward_block = to;
            debug!(
                asset = %pool.staked_asset,
                from,
                to,
                reward = %granted,
                acc = %acc,
                "farm: settled pool"
            );
            Ok(granted)
        }
    }
}

/// Accumulator value `pool` would have after settling at `block`.
///
/// Pure: the budget clamp is previewed, not consumed.
pub fn preview_acc(
    pool: &Pool,
    total_weight: u64,
    emission: &EmissionController,
    block: BlockHeight,
) -> Result<u128, FarmError> {
    match plan(pool, total_weight, emission, block)? {
        Step::Skip | Step::Idle(_) => Ok(pool.acc_reward_per_share),
        Step::Emit { reward, .. } => {
            let increment = acc_increment(emission.preview_clamp(reward), pool.total_staked)?;
            pool.acc_reward_per_share
                .checked_add(increment)
                .ok_or(FarmError::ArithmeticOverflow)
        }
    }
}

/// Pending reward of `position` in `pool` as of `block`, without mutating.
pub fn pending_at(
    pool: &Pool,
    position: &Position,
    total_weight: u64,
    emission: &EmissionController,
    block: BlockHeight,
) -> Result<Amount, FarmError> {
    position.pending(preview_acc(pool, total_weight, emission, block)?)
}
