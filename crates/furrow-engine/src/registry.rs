//! Ordered pool registry with global total weight.

use serde::{Deserialize, Serialize};

use furrow_core::constants::MAX_DEPOSIT_FEE_BPS;
use furrow_core::error::FarmError;
use furrow_core::types::{AssetId, BlockHeight, Pool, PoolId};

/// Pools indexed by [`PoolId`], plus the sum of their weights.
///
/// Pools are append-only; the staked asset is unique across the registry.
#[derive(
    Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode,
)]
pub struct PoolRegistry {
    pools: Vec<Pool>,
    total_weight: u64,
    max_pools: Option<usize>,
}

impl PoolRegistry {
    /// An empty registry accepting at most `max_pools` pools.
    pub fn new(max_pools: Option<usize>) -> Self {
        Self {
            pools: Vec::new(),
            total_weight: 0,
            max_pools,
        }
    }

    /// Check that a new pool for `asset` with `fee_bps` would be accepted.
    pub fn check_new(&self, asset: &AssetId, fee_bps: u64) -> Result<(), FarmError> {
        check_fee(fee_bps)?;
        if let Some(max) = self.max_pools {
            if self.pools.len() >= max {
                return Err(FarmError::PoolLimitReached(max));
            }
        }
        if self.pool_id_of(asset).is_some() {
            return Err(FarmError::PoolAlreadyExists(asset.to_string()));
        }
        Ok(())
    }

    /// Append a pool and return its id.
    pub fn add(
        &mut self,
        asset: AssetId,
        weight: u64,
        fee_bps: u64,
        last_reward_block: BlockHeight,
    ) -> Result<PoolId, FarmError> {
        self.check_new(&asset, fee_bps)?;
        let total = self
            .total_weight
            .checked_add(weight)
            .ok_or(FarmError::ArithmeticOverflow)?;
        self.pools.push(Pool::new(asset, weight, fee_bps, last_reward_block));
        self.total_weight = total;
        Ok(self.pools.len() - 1)
    }

    /// Change weight and fee of an existing pool.
    pub fn set(&mut self, pid: PoolId, weight: u64, fee_bps: u64) -> Result<(), FarmError> {
        check_fee(fee_bps)?;
        let old = self.get(pid)?.weight;
        let total = (self.total_weight - old)
            .checked_add(weight)
            .ok_or(FarmError::ArithmeticOverflow)?;
        let pool = self.get_mut(pid)?;
        pool.weight = weight;
        pool.deposit_fee_bps = fee_bps;
        self.total_weight = total;
        Ok(())
    }

    pub fn get(&self, pid: PoolId) -> Result<&Pool, FarmError> {
        self.pools.get(pid).ok_or(FarmError::UnknownPool(pid))
    }

    pub fn get_mut(&mut self, pid: PoolId) -> Result<&mut Pool, FarmError> {
        self.pools.get_mut(pid).ok_or(FarmError::UnknownPool(pid))
    }

    /// Id of the pool staking `asset`.
    pub fn pool_id_of(&self, asset: &AssetId) -> Option<PoolId> {
        self.pools.iter().position(|p| p.staked_asset == *asset)
    }

    pub fn total_weight(&self) -> u64 {
        self.total_weight
    }

    pub fn len(&self) -> usize {
        self.pools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }

    pub fn max_pools(&self) -> Option<usize> {
        self.max_pools
    }

    pub fn iter(&self) -> impl Iterator<Item = (PoolId, &Pool)> {
        self.pools.iter().enumerate()
    }
}

fn check_fee(fee_bps: u64) -> Result<(), FarmError> {
    if fee_bps > MAX_DEPOSIT_FEE_BPS {
        return Err(FarmError::InvalidBasisPoints {
            bps: fee_bps,
            max: MAX_DEPOSIT_FEE_BPS,
        });
    }
    Ok(())
}
