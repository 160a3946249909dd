//! Error types for the Furrow engine.
use thiserror::Error;

use crate::types::Amount;

/// Failures reported by a [`TokenService`](crate::traits::TokenService).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("insufficient balance: have {have}, need {need}")] InsufficientBalance { have: Amount, need: Amount },
    #[error("insufficient allowance: have {have}, need {need}")] InsufficientAllowance { have: Amount, need: Amount },
    #[error("only the minting master can mint")] OnlyMaster,
    #[error("mint exceeds cap: supply {supply} + {amount} > {cap}")] CapExceeded { supply: Amount, amount: Amount, cap: Amount },
    #[error("caller is not the token owner")] NotOwner,
    #[error("unknown asset: {0}")] UnknownAsset(String),
    #[error("null identity")] ZeroAddress,
    #[error("asset already registered: {0}")] AssetExists(String),
}

/// Failures of engine entry points. Every error aborts the whole call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FarmError {
    #[error("staking period has not started")] StakingNotStarted,
    #[error("staking period has ended")] StakingEnded,
    #[error("staking period is in progress")] StakingInProgress,
    #[error("no tokens staked")] NoTokensStaked,
    #[error("no rewards to claim")] NoRewardsToClaim,
    #[error("pool already exists for asset {0}")] PoolAlreadyExists(String),
    #[error("forbidden")] Forbidden,
    #[error("null identity")] ZeroAddress,
    #[error("invalid basis points: {bps} > {max}")] InvalidBasisPoints { bps: u64, max: u64 },
    #[error("value unchanged")] NoOpUpdate,
    #[error("unknown pool: {0}")] UnknownPool(usize),
    #[error("insufficient stake: have {have}, need {need}")] InsufficientStake { have: Amount, need: Amount },
    #[error("pool limit reached: {0}")] PoolLimitReached(usize),
    #[error("arithmetic overflow")] ArithmeticOverflow,
    #[error("invalid config: {0}")] InvalidConfig(String),
    #[error(transparent)] Token(#[from] TokenError),
}

/// Failures parsing an [`AccountId`](crate::types::AccountId) or
/// [`AssetId`](crate::types::AssetId).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    #[error("invalid hex: {0}")] InvalidHex(String),
    #[error("invalid length: {0} bytes, expected 32")] InvalidLength(usize),
    #[error("empty identity")] Empty,
}
