//! Core engine types: identities, pools, positions.
//!
//! All monetary values are integer token units ([`Amount`]); there are no
//! fractional types anywhere in the engine.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::constants::ACC_PRECISION;
use crate::error::{FarmError, IdentityError};

/// Token amount in the smallest unit.
pub type Amount = u128;

/// Logical clock: the block height a call executes at.
pub type BlockHeight = u64;

/// Sequence index of a pool inside its registry.
pub type PoolId = usize;

macro_rules! identity_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord,
            Default, bincode::Encode, bincode::Decode,
        )]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(pub [u8; 32]);

        impl $name {
            /// The null identity (32 zero bytes).
            pub const ZERO: Self = Self([0u8; 32]);

            /// Deterministic identity derived from a human-readable label.
            ///
            /// Used by fixtures, configs and simulation scripts so that
            /// `"alice"` always names the same identity.
            pub fn from_label(label: &str) -> Self {
                Self(*blake3::hash(label.as_bytes()).as_bytes())
            }

            /// Return the underlying bytes.
            pub fn as_bytes(&self) -> &[u8; 32] {
                &self.0
            }

            /// Check if this is the null identity.
            pub fn is_zero(&self) -> bool {
                self.0 == [0u8; 32]
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "0x{}", hex::encode(self.0))
            }
        }

        /// Parses `0x`-prefixed 64-digit hex; any other string is a label.
        impl FromStr for $name {
            type Err = IdentityError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.strip_prefix("0x") {
                    Some(digits) => {
                        let bytes = hex::decode(digits)
                            .map_err(|e| IdentityError::InvalidHex(e.to_string()))?;
                        let arr: [u8; 32] = bytes
                            .try_into()
                            .map_err(|b: Vec<u8>| IdentityError::InvalidLength(b.len()))?;
                        Ok(Self(arr))
                    }
                    None if s.is_empty() => Err(IdentityError::Empty),
                    None => Ok(Self::from_label(s)),
                }
            }
        }

        impl TryFrom<String> for $name {
            type Error = IdentityError;

            fn try_from(s: String) -> Result<Self, Self::Error> {
                s.parse()
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.to_string()
            }
        }

        impl From<[u8; 32]> for $name {
            fn from(bytes: [u8; 32]) -> Self {
                Self(bytes)
            }
        }
    };
}

identity_type!(
    /// Identity of a participant, administrator, fee collector or the
    /// engine's own custody account.
    AccountId
);

identity_type!(
    /// Identifier of a fungible asset known to the token service.
    AssetId
);

/// One staking bucket: a staked asset with its own weight and accumulator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub struct Pool {
    /// Asset participants stake into this pool. Unique per registry.
    pub staked_asset: AssetId,
    /// Relative share of total emission (`weight / total_weight`).
    pub weight: u64,
    /// Deposit fee in basis points, skimmed from the gross deposit.
    pub deposit_fee_bps: u64,
    /// Block up to which emission has been folded into the accumulator.
    pub last_reward_block: BlockHeight,
    /// Reward earned per staked unit since inception, scaled by [`ACC_PRECISION`].
    pub acc_reward_per_share: u128,
    /// Net amount currently staked across all positions.
    pub total_staked: Amount,
}

impl Pool {
    /// A fresh pool with an empty accumulator.
    pub fn new(
        staked_asset: AssetId,
        weight: u64,
        deposit_fee_bps: u64,
        last_reward_block: BlockHeight,
    ) -> Self {
        Self {
            staked_asset,
            weight,
            deposit_fee_bps,
            last_reward_block,
            acc_reward_per_share: 0,
            total_staked: 0,
        }
    }
}

/// A participant's stake in one pool.
///
/// `reward_debt` is a checkpoint, not a balance: it records
/// `amount * acc_reward_per_share / ACC_PRECISION` at the last settlement so
/// that only accrual after that point counts as pending. `unpaid` holds
/// reward that has been settled for this position but not yet transferred.
#[derive(
    Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode,
)]
pub struct Position {
    /// Net staked amount.
    pub amount: Amount,
    /// Accumulator checkpoint in reward units.
    pub reward_debt: Amount,
    /// Settled reward awaiting an explicit harvest.
    pub unpaid: Amount,
}

impl Position {
    /// Reward accrued for `amount` at accumulator value `acc`, in reward units.
    pub fn accrued(amount: Amount, acc: u128) -> Result<Amount, FarmError> {
        amount
            .checked_mul(acc)
            .map(|v| v / ACC_PRECISION)
            .ok_or(FarmError::ArithmeticOverflow)
    }

    /// Pending reward at accumulator value `acc`, including `unpaid`.
    ///
    /// The accumulator never decreases and the debt is always taken at an
    /// earlier accumulator value, so `accrued >= reward_debt` holds; a
    /// violation surfaces as [`FarmError::ArithmeticOverflow`].
    pub fn pending(&self, acc: u128) -> Result<Amount, FarmError> {
        Self::accrued(self.amount, acc)?
            .checked_sub(self.reward_debt)
            .and_then(|fresh| fresh.checked_add(self.unpaid))
            .ok_or(FarmError::ArithmeticOverflow)
    }

    /// Move the debt checkpoint to accumulator value `acc`.
    pub fn checkpoint(&mut self, acc: u128) -> Result<(), FarmError> {
        self.reward_debt = Self::accrued(self.amount, acc)?;
        Ok(())
    }

    /// Whether the position holds neither stake nor unpaid reward.
    pub fn is_empty(&self) -> bool {
        self.amount == 0 && self.unpaid == 0
    }
}
