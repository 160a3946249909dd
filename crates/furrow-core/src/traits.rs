//! Trait interfaces for the Furrow engine.
//!
//! - [`TokenService`]: fungible balance ledger the engine moves stake and
//!   reward through (external; [`MemoryTokenLedger`](crate::ledger::MemoryTokenLedger)
//!   implements it in memory)

use crate::error::TokenError;
use crate::types::{AccountId, Amount, AssetId};

/// Fungible token ledger consumed by the engine.
///
/// One service hosts every asset the engine touches (staked assets and the
/// reward asset), addressed by [`AssetId`]. Each failing call must leave the
/// ledger unchanged. Multi-step engine calls rely on
/// [`snapshot`](Self::snapshot) / [`restore`](Self::restore) to undo the
/// earlier steps when a later one fails.
pub trait TokenService {
    /// Opaque saved state for rollback.
    type Snapshot;

    /// Move `amount` of `asset` from `from` to `to`.
    ///
    /// # Errors
    ///
    /// - [`TokenError::InsufficientBalance`] if `from` holds less than `amount`
    fn transfer(
        &mut self,
        asset: &AssetId,
        from: &AccountId,
        to: &AccountId,
        amount: Amount,
    ) -> Result<(), TokenError>;

    /// Pull `amount` of `asset` from `owner` to `recipient`, spending the
    /// allowance `owner` granted to `spender`.
    ///
    /// # Errors
    ///
    /// - [`TokenError::InsufficientAllowance`] if the allowance is too small
    /// - [`TokenError::InsufficientBalance`] if `owner` holds less than `amount`
    fn transfer_from(
        &mut self,
        asset: &AssetId,
        spender: &AccountId,
        owner: &AccountId,
        recipient: &AccountId,
        amount: Amount,
    ) -> Result<(), TokenError>;

    /// Create `amount` new units of `asset` for `to`.
    ///
    /// # Errors
    ///
    /// - [`TokenError::OnlyMaster`] unless `caller` is the asset's minting master
    /// - [`TokenError::CapExceeded`] if total supply would exceed the cap
    fn mint(
        &mut self,
        asset: &AssetId,
        caller: &AccountId,
        to: &AccountId,
        amount: Amount,
    ) -> Result<(), TokenError>;

    /// Destroy `amount` of `holder`'s `asset`.
    fn burn(&mut self, asset: &AssetId, holder: &AccountId, amount: Amount)
    -> Result<(), TokenError>;

    /// Reassign the minting master of `asset`. Token-owner only.
    fn set_master(
        &mut self,
        asset: &AssetId,
        caller: &AccountId,
        master: &AccountId,
    ) -> Result<(), TokenError>;

    /// Current minting master of `asset`, if any.
    fn master(&self, asset: &AssetId) -> Option<AccountId>;

    /// Total issued supply of `asset` (0 for unknown assets).
    fn total_supply(&self, asset: &AssetId) -> Amount;

    /// Balance of `account` in `asset` (0 for unknown assets).
    fn balance_of(&self, asset: &AssetId, account: &AccountId) -> Amount;

    /// Capture the full ledger state.
    fn snapshot(&self) -> Self::Snapshot;

    /// Return the ledger to a previously captured state.
    fn restore(&mut self, snapshot: Self::Snapshot);
}
