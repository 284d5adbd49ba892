//! Rebasing token (USB and stETH-like reserves)
//!
//! Holders own shares of a `LedgerTotals` ledger:
//! - balance = shares * total_supply / total_shares
//! - `rebase` grows the supply, `submit_penalties` shrinks it, shares stay put
//! - Transfers move `amount * total_shares / total_supply` shares
//!
//! Minting and burning are restricted to authorized minters (vaults).

use odra::prelude::*;
use odra::casper_types::U256;
use crate::errors::ProtocolError;
use crate::share_ledger::LedgerTotals;

const DECIMALS: u8 = 18;

pub mod events {
    use odra::prelude::*;
    use odra::casper_types::U256;

    #[odra::event]
    pub struct Rebased {
        pub amount: U256,
        pub total_supply: U256,
    }

    #[odra::event]
    pub struct PenaltiesSubmitted {
        pub amount: U256,
        pub total_supply: U256,
    }
}

/// Rebasing token contract
#[odra::module(events = [events::Rebased, events::PenaltiesSubmitted])]
pub struct RebasingToken {
    /// Token name
    name: Var<String>,
    /// Token symbol
    symbol: Var<String>,
    /// Share ledger totals
    ledger: Var<LedgerTotals>,
    /// Shares per holder
    shares: Mapping<Address, U256>,
    /// Allowance mapping (owner, spender) -> amount
    allowances: Mapping<(Address, Address), U256>,
    /// Admin address (rebases, minter management)
    admin: Var<Address>,
    /// Authorized minters
    minters: Mapping<Address, bool>,
}

#[odra::module]
impl RebasingToken {
    /// Initialize the token, the deployer becomes admin
    pub fn init(&mut self, name: String, symbol: String) {
        self.name.set(name);
        self.symbol.set(symbol);
        self.ledger.set(LedgerTotals::default());
        self.admin.set(self.env().caller());
    }

    // ========== CEP-18 Standard Functions ==========

    pub fn name(&self) -> String {
        self.name.get_or_default()
    }

    pub fn symbol(&self) -> String {
        self.symbol.get_or_default()
    }

    pub fn decimals(&self) -> u8 {
        DECIMALS
    }

    /// Get total supply (sum of balances)
    pub fn total_supply(&self) -> U256 {
        self.ledger().total_supply
    }

    /// Get balance of an account at the current share rate
    pub fn balance_of(&self, account: Address) -> U256 {
        self.ledger().balance_of(self.shares_of(account))
    }

    pub fn allowance(&self, owner: Address, spender: Address) -> U256 {
        self.allowances.get(&(owner, spender)).unwrap_or_default()
    }

    /// Transfer tokens to recipient
    pub fn transfer(&mut self, recipient: Address, amount: U256) -> bool {
        let sender = self.env().caller();
        self.transfer_internal(sender, recipient, amount);
        true
    }

    /// Approve spender to spend tokens
    pub fn approve(&mut self, spender: Address, amount: U256) -> bool {
        let owner = self.env().caller();
        self.allowances.set(&(owner, spender), amount);
        true
    }

    /// Transfer tokens from owner to recipient (requires allowance)
    pub fn transfer_from(&mut self, owner: Address, recipient: Address, amount: U256) -> bool {
        let spender = self.env().caller();
        let current_allowance = self.allowance(owner, spender);
        if current_allowance < amount {
            self.env().revert(ProtocolError::InsufficientAllowance);
        }

        self.transfer_internal(owner, recipient, amount);
        self.allowances.set(&(owner, spender), current_allowance - amount);
        true
    }

    // ========== Share Functions ==========

    pub fn is_rebasing(&self) -> bool {
        true
    }

    pub fn total_shares(&self) -> U256 {
        self.ledger().total_shares
    }

    pub fn shares_of(&self, account: Address) -> U256 {
        self.shares.get(&account).unwrap_or_default()
    }

    /// Balance represented by `shares`
    pub fn get_balance_by_shares(&self, shares: U256) -> U256 {
        let ledger = self.ledger();
        if ledger.total_shares.is_zero() {
            return shares;
        }
        ledger.balance_of(shares)
    }

    /// Shares worth `amount`
    pub fn get_shares_by_balance(&self, amount: U256) -> U256 {
        self.ledger().shares_for_amount(amount)
    }

    // ========== Minter Functions ==========

    /// Mint new tokens (only authorized minters)
    pub fn mint(&mut self, to: Address, amount: U256) {
        self.require_minter();
        if amount.is_zero() {
            return;
        }

        let mut ledger = self.ledger();
        let minted = match ledger.mint(amount) {
            Ok(minted) => minted,
            Err(error) => self.env().revert(error),
        };
        let to_shares = self.shares_of(to) + minted;
        self.ledger.set(ledger);
        self.shares.set(&to, to_shares);
    }

    /// Burn tokens from account (only authorized minters)
    pub fn burn_from(&mut self, from: Address, amount: U256) {
        self.require_minter();
        self.burn_internal(from, amount);
    }

    /// Burn tokens from caller
    pub fn burn(&mut self, amount: U256) {
        let caller = self.env().caller();
        self.burn_internal(caller, amount);
    }

    // ========== Admin Functions ==========

    /// Distribute `amount` to every holder pro-rata (admin only)
    pub fn rebase(&mut self, amount: U256) {
        self.require_admin();
        let mut ledger = self.ledger();
        ledger.rebase(amount);
        self.ledger.set(ledger);

        self.env().emit_event(events::Rebased {
            amount,
            total_supply: ledger.total_supply,
        });
    }

    /// Take `amount` from every holder pro-rata (admin only)
    pub fn submit_penalties(&mut self, amount: U256) {
        self.require_admin();
        let mut ledger = self.ledger();
        if let Err(error) = ledger.submit_penalties(amount) {
            self.env().revert(error);
        }
        self.ledger.set(ledger);

        self.env().emit_event(events::PenaltiesSubmitted {
            amount,
            total_supply: ledger.total_supply,
        });
    }

    pub fn add_minter(&mut self, minter: Address) {
        self.require_admin();
        self.minters.set(&minter, true);
    }

    pub fn remove_minter(&mut self, minter: Address) {
        self.require_admin();
        self.minters.set(&minter, false);
    }

    pub fn is_minter(&self, account: Address) -> bool {
        self.minters.get(&account).unwrap_or(false)
    }

    pub fn admin(&self) -> Option<Address> {
        self.admin.get()
    }

    // ========== Internal Functions ==========

    fn ledger(&self) -> LedgerTotals {
        self.ledger.get().unwrap_or_default()
    }

    fn transfer_internal(&mut self, from: Address, to: Address, amount: U256) {
        let ledger = self.ledger();
        let from_shares = self.shares_of(from);
        let moved = match ledger.transfer_shares(amount, from_shares) {
            Ok(moved) => moved,
            Err(error) => self.env().revert(error),
        };

        self.shares.set(&from, from_shares - moved);
        let to_shares = self.shares_of(to) + moved;
        self.shares.set(&to, to_shares);
    }

    fn burn_internal(&mut self, from: Address, amount: U256) {
        if amount.is_zero() {
            return;
        }
        let mut ledger = self.ledger();
        let from_shares = self.shares_of(from);
        let burned = match ledger.burn(amount, from_shares) {
            Ok(burned) => burned,
            Err(error) => self.env().revert(error),
        };

        self.ledger.set(ledger);
        self.shares.set(&from, from_shares - burned);
    }

    fn require_minter(&self) {
        let caller = self.env().caller();
        if !self.is_minter(caller) {
            self.env().revert(ProtocolError::UnauthorizedVault);
        }
    }

    fn require_admin(&self) {
        if self.admin.get() != Some(self.env().caller()) {
            self.env().revert(ProtocolError::Unauthorized);
        }
    }
}
