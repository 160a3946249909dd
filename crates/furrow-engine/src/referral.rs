//! Referral bindings and bonus accounting.
//!
//! A participant may name a referrer on their first non-zero deposit. The
//! binding is permanent; every later claim pays the referrer
//! `claimed * bonus_bps / 10000` on top of the participant's payout.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use furrow_core::constants::BPS_PRECISION;
use furrow_core::error::FarmError;
use furrow_core::types::{AccountId, Amount};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub struct ReferralBook {
    referrers: BTreeMap<AccountId, AccountId>,
    earnings: BTreeMap<AccountId, Amount>,
    bonus_bps: u64,
    max_bonus_bps: u64,
}

impl ReferralBook {
    /// An empty book paying `bonus_bps`, adjustable up to `max_bonus_bps`.
    pub fn new(bonus_bps: u64, max_bonus_bps: u64) -> Result<Self, FarmError> {
        if max_bonus_bps > BPS_PRECISION {
            return Err(FarmError::InvalidBasisPoints {
                bps: max_bonus_bps,
                max: BPS_PRECISION,
            });
        }
        if bonus_bps > max_bonus_bps {
            return Err(FarmError::InvalidBasisPoints {
                bps: bonus_bps,
                max: max_bonus_bps,
            });
        }
        Ok(Self {
            referrers: BTreeMap::new(),
            earnings: BTreeMap::new(),
            bonus_bps,
            max_bonus_bps,
        })
    }

    /// Bind `participant` to `referrer`.
    ///
    /// Returns `false` without changing anything if the participant is
    /// already bound, or the referrer is null or the participant itself.
    pub fn bind(&mut self, participant: &AccountId, referrer: &AccountId) -> bool {
        if referrer.is_zero()
            || referrer == participant
            || self.referrers.contains_key(participant)
        {
            return false;
        }
        self.referrers.insert(*participant, *referrer);
        true
    }

    pub fn referrer_of(&self, participant: &AccountId) -> Option<AccountId> {
        self.referrers.get(participant).copied()
    }

    /// Bonus owed to `participant`'s referrer for a claim of `claimed`.
    ///
    /// `None` when unbound or when the bonus rounds to zero.
    pub fn bonus_for(&self, participant: &AccountId, claimed: Amount) -> Option<(AccountId, Amount)> {
        let referrer = self.referrer_of(participant)?;
        let bonus = claimed.checked_mul(Amount::from(self.bonus_bps))? / Amount::from(BPS_PRECISION);
        (bonus > 0).then_some((referrer, bonus))
    }

    /// Add `amount` to `referrer`'s lifetime earnings.
    pub fn record(&mut self, referrer: &AccountId, amount: Amount) {
        let total = self.earnings.entry(*referrer).or_insert(0);
        *total = total.saturating_add(amount);
    }

    /// Lifetime bonus paid to `referrer`.
    pub fn earnings_of(&self, referrer: &AccountId) -> Amount {
        self.earnings.get(referrer).copied().unwrap_or(0)
    }

    pub fn bonus_bps(&self) -> u64 {
        self.bonus_bps
    }

    pub fn max_bonus_bps(&self) -> u64 {
        self.max_bonus_bps
    }

    /// Change the bonus rate.
    ///
    /// # Errors
    ///
    /// - [`FarmError::InvalidBasisPoints`] above the maximum
    /// - [`FarmError::NoOpUpdate`] if equal to the current rate
    pub fn update_bonus_rate(&mut self, bps: u64) -> Result<(), FarmError> {
        if bps > self.max_bonus_bps {
            return Err(FarmError::InvalidBasisPoints {
                bps,
                max: self.max_bonus_bps,
            });
        }
        if bps == self.bonus_bps {
            return Err(FarmError::NoOpUpdate);
        }
        self.bonus_bps = bps;
        Ok(())
    }

    /// Number of bound participants.
    pub fn len(&self) -> usize {
        self.referrers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.referrers.is_empty()
    }
}

impl Default for ReferralBook {
    fn default() -> Self {
        use furrow_core::constants::{DEFAULT_REFERRAL_BONUS_BPS, MAX_REFERRAL_BONUS_BPS};
        Self {
            referrers: BTreeMap::new(),
            earnings: BTreeMap::new(),
            bonus_bps: DEFAULT_REFERRAL_BONUS_BPS,
            max_bonus_bps: MAX_REFERRAL_BONUS_BPS,
        }
    }
}
