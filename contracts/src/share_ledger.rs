//! Rebasing share ledger arithmetic.
//!
//! Holders own shares; balances are shares scaled by `total_supply / total_shares`.
//! `rebase` and `submit_penalties` move only the supply, so every holder's
//! balance changes pro-rata without touching per-holder state.
//!
//! The same totals back the USB token, PtyPool staking shares and InterestPool
//! stake weights.

use odra::prelude::*;
use odra::casper_types::U256;
use crate::errors::{ProtocolError, ProtocolResult};

/// Aggregate state of a share ledger
#[odra::odra_type]
#[derive(Default, Copy)]
pub struct LedgerTotals {
    /// Sum of all holder shares
    pub total_shares: U256,
    /// Sum of all holder balances
    pub total_supply: U256,
}

impl LedgerTotals {
    /// Balance represented by `shares`
    pub fn balance_of(&self, shares: U256) -> U256 {
        if self.total_shares.is_zero() {
            return U256::zero();
        }
        shares * self.total_supply / self.total_shares
    }

    /// Shares worth `amount`, rounded down. 1:1 on an empty ledger.
    pub fn shares_for_amount(&self, amount: U256) -> U256 {
        if self.total_shares.is_zero() || self.total_supply.is_zero() {
            return amount;
        }
        amount * self.total_shares / self.total_supply
    }

    /// Shares worth `amount`, rounded up
    pub fn shares_for_amount_ceil(&self, amount: U256) -> U256 {
        if self.total_shares.is_zero() || self.total_supply.is_zero() {
            return amount;
        }
        let product = amount * self.total_shares;
        let shares = product / self.total_supply;
        if (product % self.total_supply).is_zero() {
            shares
        } else {
            shares + 1
        }
    }

    /// Add `amount` of supply, returning the shares created for it
    pub fn mint(&mut self, amount: U256) -> ProtocolResult<U256> {
        if self.total_supply.is_zero() && !self.total_shares.is_zero() {
            return Err(ProtocolError::InvalidLedgerState);
        }
        let shares = self.shares_for_amount(amount);
        self.total_shares = self.total_shares + shares;
        self.total_supply = self.total_supply + amount;
        Ok(shares)
    }

    /// Remove `amount` of supply from a holder owning `holder_shares`,
    /// returning the shares burned
    pub fn burn(&mut self, amount: U256, holder_shares: U256) -> ProtocolResult<U256> {
        if self.balance_of(holder_shares) < amount {
            return Err(ProtocolError::InsufficientBalance);
        }
        let shares = self.shares_for_amount_ceil(amount).min(holder_shares);
        self.total_shares = self.total_shares - shares;
        self.total_supply = self.total_supply - amount;
        if self.total_shares.is_zero() {
            self.total_supply = U256::zero();
        }
        Ok(shares)
    }

    /// Shares to move for a transfer of `amount` out of `holder_shares`
    pub fn transfer_shares(&self, amount: U256, holder_shares: U256) -> ProtocolResult<U256> {
        let shares = self.shares_for_amount(amount);
        if shares > holder_shares || self.balance_of(holder_shares) < amount {
            return Err(ProtocolError::InsufficientBalance);
        }
        Ok(shares)
    }

    /// Increase supply without touching shares
    pub fn rebase(&mut self, amount: U256) {
        self.total_supply = self.total_supply + amount;
    }

    /// Decrease supply without touching shares
    pub fn submit_penalties(&mut self, amount: U256) -> ProtocolResult<()> {
        if amount > self.total_supply {
            return Err(ProtocolError::InsufficientBalance);
        }
        self.total_supply = self.total_supply - amount;
        Ok(())
    }
}
