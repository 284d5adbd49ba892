//! Leveraged Token Contract
//!
//! CEP-18 compatible plain-balance token minted and burned only by its vault.
//! Exposes the share capability as identity so pools can treat it like any
//! other staking or reward token.

use odra::prelude::*;
use odra::casper_types::{U256, Key};
use odra::casper_types::bytesrepr::ToBytes;
use crate::errors::ProtocolError;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;

const DECIMALS: u8 = 18;
const CEP18_NAME_KEY: &str = "name";
const CEP18_SYMBOL_KEY: &str = "symbol";
const CEP18_DECIMALS_KEY: &str = "decimals";
const CEP18_TOTAL_SUPPLY_KEY: &str = "total_supply";
const CEP18_BALANCES_DICT: &str = "balances";
const CEP18_ALLOWANCES_DICT: &str = "allowances";

pub mod events {
    use odra::prelude::*;

    #[odra::event]
    pub struct VaultSet {
        pub vault: Address,
    }
}

/// Leveraged token of a single vault
#[odra::module(events = [events::VaultSet])]
pub struct LeveragedToken {
    /// Token name
    name: Var<String>,
    /// Token symbol
    symbol: Var<String>,
    /// Total supply
    total_supply: Var<U256>,
    /// Balance mapping
    balances: Mapping<Address, U256>,
    /// Allowance mapping (owner, spender) -> amount
    allowances: Mapping<(Address, Address), U256>,
    /// Admin address
    admin: Var<Address>,
    /// Owning vault, set once after deployment
    vault: Var<Option<Address>>,
}

#[odra::module]
impl LeveragedToken {
    /// Initialize the token, the deployer becomes admin
    pub fn init(&mut self, name: String, symbol: String) {
        self.name.set(name.clone());
        self.symbol.set(symbol.clone());
        self.total_supply.set(U256::zero());
        self.admin.set(self.env().caller());
        self.vault.set(None);
        self.env().init_dictionary(CEP18_BALANCES_DICT);
        self.env().init_dictionary(CEP18_ALLOWANCES_DICT);
        self.env().set_named_value(CEP18_NAME_KEY, name);
        self.env().set_named_value(CEP18_SYMBOL_KEY, symbol);
        self.env().set_named_value(CEP18_DECIMALS_KEY, DECIMALS);
        self.env().set_named_value(CEP18_TOTAL_SUPPLY_KEY, U256::zero());
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

    pub fn total_supply(&self) -> U256 {
        self.total_supply.get().unwrap_or(U256::zero())
    }

    pub fn balance_of(&self, account: Address) -> U256 {
        self.balances.get(&account).unwrap_or(U256::zero())
    }

    pub fn allowance(&self, owner: Address, spender: Address) -> U256 {
        self.allowances.get(&(owner, spender)).unwrap_or(U256::zero())
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
        self.approve_internal(owner, spender, amount);
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
        self.approve_internal(owner, spender, current_allowance - amount);
        true
    }

    // ========== Share Capability (identity) ==========

    pub fn is_rebasing(&self) -> bool {
        false
    }

    pub fn shares_of(&self, account: Address) -> U256 {
        self.balance_of(account)
    }

    pub fn get_balance_by_shares(&self, shares: U256) -> U256 {
        shares
    }

    pub fn get_shares_by_balance(&self, amount: U256) -> U256 {
        amount
    }

    // ========== Vault Functions (Restricted) ==========

    /// Mint new tokens (vault only)
    pub fn mint(&mut self, to: Address, amount: U256) {
        self.require_vault();

        let new_balance = self.balance_of(to) + amount;
        self.balances.set(&to, new_balance);
        self.set_balance_cep18(to, new_balance);

        let new_supply = self.total_supply() + amount;
        self.total_supply.set(new_supply);
        self.set_total_supply_cep18(new_supply);
    }

    /// Burn tokens from account (vault only)
    pub fn burn_from(&mut self, from: Address, amount: U256) {
        self.require_vault();
        self.burn_from_internal(from, amount);
    }

    /// Burn tokens from caller
    pub fn burn(&mut self, amount: U256) {
        let caller = self.env().caller();
        self.burn_from_internal(caller, amount);
    }

    // ========== Admin Functions ==========

    /// Link the owning vault (admin only, once)
    pub fn set_vault(&mut self, vault: Address) {
        self.require_admin();
        if self.get_vault().is_some() {
            self.env().revert(ProtocolError::AlreadySet);
        }
        self.vault.set(Some(vault));
        self.env().emit_event(events::VaultSet { vault });
    }

    pub fn get_vault(&self) -> Option<Address> {
        self.vault.get().flatten()
    }

    // ========== Internal Functions ==========

    fn transfer_internal(&mut self, from: Address, to: Address, amount: U256) {
        let from_balance = self.balance_of(from);
        if from_balance < amount {
            self.env().revert(ProtocolError::InsufficientBalance);
        }

        let new_from_balance = from_balance - amount;
        self.balances.set(&from, new_from_balance);
        self.set_balance_cep18(from, new_from_balance);

        let new_to_balance = self.balance_of(to) + amount;
        self.balances.set(&to, new_to_balance);
        self.set_balance_cep18(to, new_to_balance);
    }

    fn approve_internal(&mut self, owner: Address, spender: Address, amount: U256) {
        self.allowances.set(&(owner, spender), amount);
        self.set_allowance_cep18(owner, spender, amount);
    }

    fn burn_from_internal(&mut self, from: Address, amount: U256) {
        let current_balance = self.balance_of(from);
        if current_balance < amount {
            self.env().revert(ProtocolError::InsufficientBalance);
        }

        let new_balance = current_balance - amount;
        self.balances.set(&from, new_balance);
        self.set_balance_cep18(from, new_balance);

        let new_supply = self.total_supply() - amount;
        self.total_supply.set(new_supply);
        self.set_total_supply_cep18(new_supply);
    }

    fn set_balance_cep18(&self, owner: Address, amount: U256) {
        let key = Self::cep18_balance_key(owner);
        self.env().set_dictionary_value(CEP18_BALANCES_DICT, key.as_bytes(), amount);
    }

    fn set_allowance_cep18(&self, owner: Address, spender: Address, amount: U256) {
        let key = Self::cep18_allowance_key(owner, spender);
        self.env().set_dictionary_value(CEP18_ALLOWANCES_DICT, key.as_bytes(), amount);
    }

    fn set_total_supply_cep18(&self, amount: U256) {
        self.env().set_named_value(CEP18_TOTAL_SUPPLY_KEY, amount);
    }

    fn cep18_balance_key(owner: Address) -> String {
        let key = Key::from(owner);
        let bytes = key.to_bytes().unwrap_or_default();
        BASE64_STANDARD.encode(bytes)
    }

    fn cep18_allowance_key(owner: Address, spender: Address) -> String {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&Key::from(owner).to_bytes().unwrap_or_default());
        bytes.extend_from_slice(&Key::from(spender).to_bytes().unwrap_or_default());
        BASE64_STANDARD.encode(bytes)
    }

    fn require_vault(&self) {
        if self.get_vault() != Some(self.env().caller()) {
            self.env().revert(ProtocolError::UnauthorizedVault);
        }
    }

    fn require_admin(&self) {
        if self.admin.get() != Some(self.env().caller()) {
            self.env().revert(ProtocolError::Unauthorized);
        }
    }
}
