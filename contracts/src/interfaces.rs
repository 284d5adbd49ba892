//! Cross-contract interfaces of the USB protocol.
//!
//! Contracts address each other by `Address` and call through the
//! `*ContractRef` types generated for these traits.

use odra::prelude::*;
use odra::casper_types::U256;
use crate::types::{PtyPoolType, VaultParams, VaultPhase};

/// Token capability shared by rebasing and plain tokens.
///
/// Plain tokens implement the share methods as identity (`shares == balance`).
#[odra::external_contract]
pub trait ProtocolToken {
    fn balance_of(&self, account: Address) -> U256;
    fn total_supply(&self) -> U256;
    fn shares_of(&self, account: Address) -> U256;
    fn get_balance_by_shares(&self, shares: U256) -> U256;
    fn get_shares_by_balance(&self, amount: U256) -> U256;
    fn is_rebasing(&self) -> bool;
    fn transfer(&mut self, recipient: Address, amount: U256) -> bool;
    fn transfer_from(&mut self, owner: Address, recipient: Address, amount: U256) -> bool;
    fn approve(&mut self, spender: Address, amount: U256) -> bool;
    fn mint(&mut self, to: Address, amount: U256);
    fn burn_from(&mut self, from: Address, amount: U256);
}

/// Reserve asset price source
#[odra::external_contract]
pub trait AssetPriceFeed {
    fn latest_price(&self) -> (U256, u8);
}

/// Per-vault parameter store
#[odra::external_contract]
pub trait ParamStore {
    fn vault_params(&self, vault: Address) -> VaultParams;
    fn treasury(&self) -> Address;
}

/// Hooks a vault drives on its PtyPools
#[odra::external_contract]
pub trait PtyPoolHooks {
    fn add_staking_yields(&mut self, amount: U256);
    fn add_matching_yields(&mut self, amount: U256);
    fn add_matched_tokens(&mut self, matched_amount: U256, burned_staking_amount: U256);
    fn total_staking_balance(&self) -> U256;
    fn get_pool_type(&self) -> PtyPoolType;
    fn get_vault(&self) -> Address;
}

/// Phase of the vault a PtyPool serves
#[odra::external_contract]
pub trait VaultStatus {
    fn get_vault_phase(&self) -> VaultPhase;
}

/// Reward intake of the interest pool
#[odra::external_contract]
pub trait InterestRewards {
    fn add_rewards(&mut self, reward_token: Address, amount: U256);
    fn total_staking_amount(&self) -> U256;
}
