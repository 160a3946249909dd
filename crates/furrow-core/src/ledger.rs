//! In-memory token ledger.
//!
//! [`MemoryTokenLedger`] implements [`TokenService`] over `HashMap`s with
//! no persistence. It backs the engine's tests, benches and the simulator
//! CLI; production deployments plug in their own token service.

use std::collections::HashMap;

use crate::error::TokenError;
use crate::traits::TokenService;
use crate::types::{AccountId, Amount, AssetId};

/// State of one fungible asset.
#[derive(Clone, Debug, Default)]
struct TokenBook {
    /// Account allowed to reassign the minting master.
    owner: AccountId,
    /// Account allowed to mint.
    master: Option<AccountId>,
    /// Maximum total supply, if capped.
    cap: Option<Amount>,
    total_supply: Amount,
    balances: HashMap<AccountId, Amount>,
    /// (owner, spender) → remaining allowance.
    allowances: HashMap<(AccountId, AccountId), Amount>,
}

impl TokenBook {
    fn balance(&self, account: &AccountId) -> Amount {
        self.balances.get(account).copied().unwrap_or(0)
    }

    fn debit(&mut self, account: &AccountId, amount: Amount) -> Result<(), TokenError> {
        let have = self.balance(account);
        let left = have
            .checked_sub(amount)
            .ok_or(TokenError::InsufficientBalance { have, need: amount })?;
        self.balances.insert(*account, left);
        Ok(())
    }

    fn credit(&mut self, account: &AccountId, amount: Amount) {
        let entry = self.balances.entry(*account).or_insert(0);
        *entry = entry.saturating_add(amount);
    }

    /// Raise supply by `amount`, honouring the cap.
    fn issue(&mut self, to: &AccountId, amount: Amount) -> Result<(), TokenError> {
        let supply = self.total_supply;
        let next = supply.checked_add(amount).ok_or(TokenError::CapExceeded {
            supply,
            amount,
            cap: Amount::MAX,
        })?;
        if let Some(cap) = self.cap {
            if next > cap {
                return Err(TokenError::CapExceeded { supply, amount, cap });
            }
        }
        self.total_supply = next;
        self.credit(to, amount);
        Ok(())
    }
}

/// In-memory [`TokenService`] for tests and simulations.
///
/// Snapshots are full clones; fine for fixture-sized ledgers.
#[derive(Clone, Debug, Default)]
pub struct MemoryTokenLedger {
    tokens: HashMap<AssetId, TokenBook>,
}

impl MemoryTokenLedger {
    /// Create an empty ledger with no assets.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new asset owned by `owner`, optionally capped.
    ///
    /// # Errors
    ///
    /// - [`TokenError::AssetExists`] if `asset` is already registered
    pub fn create_token(
        &mut self,
        asset: AssetId,
        owner: AccountId,
        cap: Option<Amount>,
    ) -> Result<(), TokenError> {
        if self.tokens.contains_key(&asset) {
            return Err(TokenError::AssetExists(asset.to_string()));
        }
        self.tokens.insert(
            asset,
            TokenBook {
                owner,
                cap,
                ..TokenBook::default()
            },
        );
        Ok(())
    }

    /// Issue `amount` to `to` outside the minting-master rule.
    ///
    /// Stands in for a token's initial distribution in fixtures. The cap
    /// still applies.
    pub fn issue(
        &mut self,
        asset: &AssetId,
        to: &AccountId,
        amount: Amount,
    ) -> Result<(), TokenError> {
        self.book_mut(asset)?.issue(to, amount)
    }

    /// Set the allowance `owner` grants `spender`.
    pub fn approve(
        &mut self,
        asset: &AssetId,
        owner: &AccountId,
        spender: &AccountId,
        amount: Amount,
    ) -> Result<(), TokenError> {
        self.book_mut(asset)?
            .allowances
            .insert((*owner, *spender), amount);
        Ok(())
    }

    /// Remaining allowance `owner` grants `spender`.
    pub fn allowance(&self, asset: &AssetId, owner: &AccountId, spender: &AccountId) -> Amount {
        self.tokens
            .get(asset)
            .and_then(|b| b.allowances.get(&(*owner, *spender)).copied())
            .unwrap_or(0)
    }

    /// Hand token ownership (the right to reassign the master) to `new_owner`.
    pub fn transfer_ownership(
        &mut self,
        asset: &AssetId,
        caller: &AccountId,
        new_owner: &AccountId,
    ) -> Result<(), TokenError> {
        if new_owner.is_zero() {
            return Err(TokenError::ZeroAddress);
        }
        let book = self.book_mut(asset)?;
        if book.owner != *caller {
            return Err(TokenError::NotOwner);
        }
        book.owner = *new_owner;
        Ok(())
    }

    /// Current owner of `asset`.
    pub fn owner(&self, asset: &AssetId) -> Option<AccountId> {
        self.tokens.get(asset).map(|b| b.owner)
    }

    /// Supply cap of `asset`, if any.
    pub fn cap(&self, asset: &AssetId) -> Option<Amount> {
        self.tokens.get(asset).and_then(|b| b.cap)
    }

    fn book_mut(&mut self, asset: &AssetId) -> Result<&mut TokenBook, TokenError> {
        self.tokens
            .get_mut(asset)
            .ok_or_else(|| TokenError::UnknownAsset(asset.to_string()))
    }
}

impl TokenService for MemoryTokenLedger {
    type Snapshot = MemoryTokenLedger;

    fn transfer(
        &mut self,
        asset: &AssetId,
        from: &AccountId,
        to: &AccountId,
        amount: Amount,
    ) -> Result<(), TokenError> {
        if to.is_zero() {
            return Err(TokenError::ZeroAddress);
        }
        let book = self.book_mut(asset)?;
        book.debit(from, amount)?;
        book.credit(to, amount);
        Ok(())
    }

    fn transfer_from(
        &mut self,
        asset: &AssetId,
        spender: &AccountId,
        owner: &AccountId,
        recipient: &AccountId,
        amount: Amount,
    ) -> Result<(), TokenError> {
        if recipient.is_zero() {
            return Err(TokenError::ZeroAddress);
        }
        let book = self.book_mut(asset)?;
        let key = (*owner, *spender);
        let allowed = book.allowances.get(&key).copied().unwrap_or(0);
        if allowed < amount {
            return Err(TokenError::InsufficientAllowance { have: allowed, need: amount });
        }
        book.debit(owner, amount)?;
        book.credit(recipient, amount);
        book.allowances.insert(key, allowed - amount);
        Ok(())
    }

    fn mint(
        &mut self,
        asset: &AssetId,
        caller: &AccountId,
        to: &AccountId,
        amount: Amount,
    ) -> Result<(), TokenError> {
        if to.is_zero() {
            return Err(TokenError::ZeroAddress);
        }
        let book = self.book_mut(asset)?;
        if book.master != Some(*caller) {
            return Err(TokenError::OnlyMaster);
        }
        book.issue(to, amount)
    }

    fn burn(
        &mut self,
        asset: &AssetId,
        holder: &AccountId,
        amount: Amount,
    ) -> Result<(), TokenError> {
        let book = self.book_mut(asset)?;
        book.debit(holder, amount)?;
        book.total_supply -= amount;
        Ok(())
    }

    fn set_master(
        &mut self,
        asset: &AssetId,
        caller: &AccountId,
        master: &AccountId,
    ) -> Result<(), TokenError> {
        if master.is_zero() {
            return Err(TokenError::ZeroAddress);
        }
        let book = self.book_mut(asset)?;
        if book.owner != *caller {
            return Err(TokenError::NotOwner);
        }
        book.master = Some(*master);
        Ok(())
    }

    fn master(&self, asset: &AssetId) -> Option<AccountId> {
        self.tokens.get(asset).and_then(|b| b.master)
    }

    fn total_supply(&self, asset: &AssetId) -> Amount {
        self.tokens.get(asset).map(|b| b.total_supply).unwrap_or(0)
    }

    fn balance_of(&self, asset: &AssetId, account: &AccountId) -> Amount {
        self.tokens.get(asset).map(|b| b.balance(account)).unwrap_or(0)
    }

    fn snapshot(&self) -> Self::Snapshot {
        self.clone()
    }

    fn restore(&mut self, snapshot: Self::Snapshot) {
        *self = snapshot;
    }
}
