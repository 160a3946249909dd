//! Participant positions per pool.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use furrow_core::types::{AccountId, Amount, PoolId, Position};

/// All positions, keyed by pool and then participant.
///
/// Positions are created on first touch and never removed.
#[derive(
    Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode,
)]
pub struct PositionLedger {
    positions: BTreeMap<PoolId, BTreeMap<AccountId, Position>>,
}

impl PositionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Position of `who` in `pid`; empty if never touched.
    pub fn get(&self, pid: PoolId, who: &AccountId) -> Position {
        self.positions
            .get(&pid)
            .and_then(|m| m.get(who))
            .cloned()
            .unwrap_or_default()
    }

    /// Mutable position of `who` in `pid`, created empty if missing.
    pub fn entry(&mut self, pid: PoolId, who: &AccountId) -> &mut Position {
        self.positions
            .entry(pid)
            .or_default()
            .entry(*who)
            .or_default()
    }

    /// Replace the position of `who` in `pid`.
    pub fn put(&mut self, pid: PoolId, who: &AccountId, position: Position) {
        *self.entry(pid, who) = position;
    }

    /// Participants that have ever touched `pid`, in identity order.
    pub fn participants(&self, pid: PoolId) -> impl Iterator<Item = (&AccountId, &Position)> {
        self.positions.get(&pid).into_iter().flat_map(|m| m.iter())
    }

    /// Sum of staked amounts recorded in `pid`.
    pub fn staked_in(&self, pid: PoolId) -> Amount {
        self.participants(pid).map(|(_, p)| p.amount).sum()
    }

    /// Total number of positions across all pools.
    pub fn len(&self) -> usize {
        self.positions.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
