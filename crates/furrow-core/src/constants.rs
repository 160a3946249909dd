//! Protocol constants. All monetary values are in the smallest token unit.

/// Fixed-point scale of the per-share reward accumulator.
///
/// Large enough that a one-unit stake in a pool holding ~10^12 units still
/// receives a non-zero accumulator increment from a one-unit emission.
pub const ACC_PRECISION: u128 = 1_000_000_000_000;

/// Denominator for all basis-point rates (fees, referral bonus).
pub const BPS_PRECISION: u64 = 10_000;

/// Upper bound for a pool's deposit fee (100%).
pub const MAX_DEPOSIT_FEE_BPS: u64 = BPS_PRECISION;

/// Referral bonus paid on every claim unless reconfigured (2%).
pub const DEFAULT_REFERRAL_BONUS_BPS: u64 = 200;

/// Ceiling the owner may raise the referral bonus to (10%).
pub const MAX_REFERRAL_BONUS_BPS: u64 = 1_000;

/// Staged-halving decay factor, applied once per stage transition:
/// `rate_next = rate * HALVING_NUMERATOR / HALVING_DENOMINATOR`.
pub const HALVING_NUMERATOR: u128 = 8;
pub const HALVING_DENOMINATOR: u128 = 10;

/// Window length used for windowed schedules that omit `end_block`.
pub const DEFAULT_WINDOW_BLOCKS: u64 = 200_000;

/// Stage index past which the staged-halving rate is treated as exhausted.
///
/// Repeated flooring drives even `u128::MAX` to zero in fewer stages.
pub const MAX_HALVING_STAGES: u64 = 512;
