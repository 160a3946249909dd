//! Deposit fee skim and fee-address custody.

use serde::{Deserialize, Serialize};

use furrow_core::constants::BPS_PRECISION;
use furrow_core::error::FarmError;
use furrow_core::types::{AccountId, Amount};

/// Split `gross` into `(net, fee)` with `fee = gross * fee_bps / 10000`.
pub fn split(gross: Amount, fee_bps: u64) -> Result<(Amount, Amount), FarmError> {
    let fee = gross
        .checked_mul(Amount::from(fee_bps))
        .ok_or(FarmError::ArithmeticOverflow)?
        / Amount::from(BPS_PRECISION);
    let net = gross.checked_sub(fee).ok_or(FarmError::InvalidBasisPoints {
        bps: fee_bps,
        max: BPS_PRECISION,
    })?;
    Ok((net, fee))
}

/// Holder of the fee address.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub struct FeeCollector {
    fee_address: AccountId,
}

impl FeeCollector {
    pub fn new(fee_address: AccountId) -> Result<Self, FarmError> {
        if fee_address.is_zero() {
            return Err(FarmError::ZeroAddress);
        }
        Ok(Self { fee_address })
    }

    pub fn fee_address(&self) -> AccountId {
        self.fee_address
    }

    /// Hand the fee address to `new_address`. Only the current holder may.
    pub fn rotate(&mut self, caller: &AccountId, new_address: &AccountId) -> Result<(), FarmError> {
        if *caller != self.fee_address {
            return Err(FarmError::Forbidden);
        }
        if new_address.is_zero() {
            return Err(FarmError::ZeroAddress);
        }
        self.fee_address = *new_address;
        Ok(())
    }
}
