//! Interest Pool Contract
//!
//! USB stakers earn the interest vaults settle in leveraged tokens.
//! Reward accounting is "reward per share" per reward token:
//! - Rewards are discrete deposits from whitelisted rewarders, no time decay
//! - Stake weight is pool shares over the staked USB balance, so a USB rebase
//!   grows every stake without touching reward accounting
//! - Reward tokens register on their first deposit and are never removed

use odra::prelude::*;
use odra::casper_types::U256;
use odra::ContractRef;
use crate::errors::ProtocolError;
use crate::interfaces::ProtocolTokenContractRef;
use crate::share_ledger::LedgerTotals;
use crate::types::one;

pub mod events {
    use odra::prelude::*;
    use odra::casper_types::U256;

    #[odra::event]
    pub struct Staked {
        pub user: Address,
        pub amount: U256,
        pub shares: U256,
    }

    #[odra::event]
    pub struct Withdrawn {
        pub user: Address,
        pub amount: U256,
        pub shares: U256,
    }

    #[odra::event]
    pub struct RewardsAdded {
        pub rewarder: Address,
        pub reward_token: Address,
        pub amount: U256,
    }

    #[odra::event]
    pub struct RewardsPaid {
        pub user: Address,
        pub reward_token: Address,
        pub amount: U256,
    }

    #[odra::event]
    pub struct RewarderUpdated {
        pub rewarder: Address,
        pub allowed: bool,
    }
}

/// Interest pool for one stake token
#[odra::module(events = [
    events::Staked,
    events::Withdrawn,
    events::RewardsAdded,
    events::RewardsPaid,
    events::RewarderUpdated
])]
pub struct InterestPool {
    /// Admin address (rewarder whitelist)
    admin: Var<Address>,
    /// Stake token (USB)
    stake_token: Var<Address>,
    /// Whitelisted rewarders (vaults)
    rewarders: Mapping<Address, bool>,

    // === Stake State ===
    /// Sum of staker shares
    total_shares: Var<U256>,
    /// Stake token shares held for stakers
    staked_token_shares: Var<U256>,
    /// Shares per staker
    user_shares: Mapping<Address, U256>,

    // === Reward State ===
    /// Registered reward tokens in registration order
    reward_tokens: Var<Vec<Address>>,
    /// Accumulated reward per share (1e18) by reward token
    reward_per_share: Mapping<Address, U256>,
    /// Reward per share at last settlement, by (user, token)
    user_reward_paid: Mapping<(Address, Address), U256>,
    /// Settled unclaimed rewards, by (user, token)
    user_rewards_owed: Mapping<(Address, Address), U256>,
}

#[odra::module]
impl InterestPool {
    /// Initialize the pool, the deployer becomes admin
    pub fn init(&mut self, stake_token: Address) {
        self.admin.set(self.env().caller());
        self.stake_token.set(stake_token);
        self.total_shares.set(U256::zero());
        self.staked_token_shares.set(U256::zero());
        self.reward_tokens.set(Vec::new());
    }

    // ========== Staking ==========

    /// Stake `amount` of the stake token
    /// Note: Caller must have approved the pool to spend the stake token
    pub fn stake(&mut self, amount: U256) {
        if amount.is_zero() {
            self.env().revert(ProtocolError::ZeroAmount);
        }
        let user = self.env().caller();
        self.settle_all(user);
        let mut ledger = self.stake_ledger();

        let mut token = self.token(self.get_stake_token());
        let self_address = self.env().self_address();
        let before = token.shares_of(self_address);
        token.transfer_from(user, self_address, amount);
        let received_shares = token.shares_of(self_address) - before;
        let received = token.get_balance_by_shares(received_shares);

        let shares = match ledger.mint(received) {
            Ok(shares) => shares,
            Err(error) => self.env().revert(error),
        };

        let staked = self.staked_token_shares.get_or_default() + received_shares;
        self.staked_token_shares.set(staked);
        self.total_shares.set(ledger.total_shares);
        let user_shares = self.get_user_shares(user) + shares;
        self.user_shares.set(&user, user_shares);

        self.env().emit_event(events::Staked { user, amount, shares });
    }

    /// Unstake `amount` of the stake token
    pub fn unstake(&mut self, amount: U256) {
        if amount.is_zero() {
            self.env().revert(ProtocolError::ZeroAmount);
        }
        let user = self.env().caller();
        self.settle_all(user);
        let mut ledger = self.stake_ledger();
        let user_shares = self.get_user_shares(user);

        let shares = match ledger.burn(amount, user_shares) {
            Ok(shares) => shares,
            Err(_) => self.env().revert(ProtocolError::NoStakingAmount),
        };
        self.total_shares.set(ledger.total_shares);
        self.user_shares.set(&user, user_shares - shares);

        let mut token = self.token(self.get_stake_token());
        let self_address = self.env().self_address();
        let before = token.shares_of(self_address);
        token.transfer(user, amount);
        let sent_shares = before - token.shares_of(self_address);
        let staked = self.staked_token_shares.get_or_default();
        self.staked_token_shares.set(staked.saturating_sub(sent_shares));

        self.env().emit_event(events::Withdrawn { user, amount, shares });
    }

    // ========== Rewards ==========

    /// Deposit `amount` of `reward_token` for current stakers (rewarders only)
    /// Note: Caller must have approved the pool to spend the reward token
    pub fn add_rewards(&mut self, reward_token: Address, amount: U256) {
        let rewarder = self.env().caller();
        if !self.is_rewarder(rewarder) {
            self.env().revert(ProtocolError::Unauthorized);
        }
        if reward_token == self.get_stake_token() {
            self.env().revert(ProtocolError::RewardTokenIsStakingToken);
        }
        let total_shares = self.total_shares.get_or_default();
        if total_shares.is_zero() {
            self.env().revert(ProtocolError::NoStakingAmount);
        }
        if amount.is_zero() {
            return;
        }

        let self_address = self.env().self_address();
        self.token(reward_token).transfer_from(rewarder, self_address, amount);

        if !self.is_reward_token(reward_token) {
            let mut tokens = self.reward_tokens();
            tokens.push(reward_token);
            self.reward_tokens.set(tokens);
        }
        let per_share = self.reward_per_share.get(&reward_token).unwrap_or_default();
        self.reward_per_share
            .set(&reward_token, per_share + amount * one() / total_shares);

        self.env().emit_event(events::RewardsAdded {
            rewarder,
            reward_token,
            amount,
        });
    }

    /// Claim rewards of one token
    pub fn get_staking_rewards(&mut self, reward_token: Address) {
        if !self.is_reward_token(reward_token) {
            self.env().revert(ProtocolError::InvalidRewardToken);
        }
        let user = self.env().caller();
        self.claim(user, reward_token);
    }

    /// Claim rewards of every registered token
    pub fn get_all_staking_rewards(&mut self) {
        let user = self.env().caller();
        for reward_token in self.reward_tokens() {
            self.claim(user, reward_token);
        }
    }

    // ========== Admin Functions ==========

    pub fn add_rewarder(&mut self, rewarder: Address) {
        self.set_rewarder(rewarder, true);
    }

    pub fn remove_rewarder(&mut self, rewarder: Address) {
        self.set_rewarder(rewarder, false);
    }

    // ========== Query Functions ==========

    pub fn get_stake_token(&self) -> Address {
        match self.stake_token.get() {
            Some(token) => token,
            None => self.env().revert(ProtocolError::NotConfigured),
        }
    }

    pub fn is_rewarder(&self, account: Address) -> bool {
        self.rewarders.get(&account).unwrap_or(false)
    }

    pub fn reward_tokens(&self) -> Vec<Address> {
        self.reward_tokens.get().unwrap_or_default()
    }

    pub fn is_reward_token(&self, token: Address) -> bool {
        self.reward_tokens().contains(&token)
    }

    /// Staked balance of every staker, rebase-aware
    pub fn total_staking_amount(&self) -> U256 {
        let shares = self.staked_token_shares.get_or_default();
        if shares.is_zero() {
            return U256::zero();
        }
        self.token(self.get_stake_token()).get_balance_by_shares(shares)
    }

    pub fn total_staking_shares(&self) -> U256 {
        self.total_shares.get_or_default()
    }

    pub fn get_user_shares(&self, user: Address) -> U256 {
        self.user_shares.get(&user).unwrap_or_default()
    }

    pub fn user_staking_amount(&self, user: Address) -> U256 {
        self.stake_ledger().balance_of(self.get_user_shares(user))
    }

    /// Claimable `reward_token` of `user`
    pub fn staking_rewards_earned(&self, reward_token: Address, user: Address) -> U256 {
        if !self.is_reward_token(reward_token) {
            self.env().revert(ProtocolError::InvalidRewardToken);
        }
        self.earned(user, reward_token)
    }

    // ========== Internal Functions ==========

    fn stake_ledger(&self) -> LedgerTotals {
        LedgerTotals {
            total_shares: self.total_shares.get_or_default(),
            total_supply: self.total_staking_amount(),
        }
    }

    fn earned(&self, user: Address, reward_token: Address) -> U256 {
        let slot = (user, reward_token);
        let per_share = self.reward_per_share.get(&reward_token).unwrap_or_default();
        let paid = self.user_reward_paid.get(&slot).unwrap_or_default();
        let owed = self.user_rewards_owed.get(&slot).unwrap_or_default();
        owed + self.get_user_shares(user) * (per_share - paid) / one()
    }

    fn settle(&mut self, user: Address, reward_token: Address) {
        let earned = self.earned(user, reward_token);
        let per_share = self.reward_per_share.get(&reward_token).unwrap_or_default();
        let slot = (user, reward_token);
        self.user_rewards_owed.set(&slot, earned);
        self.user_reward_paid.set(&slot, per_share);
    }

    fn settle_all(&mut self, user: Address) {
        for reward_token in self.reward_tokens() {
            self.settle(user, reward_token);
        }
    }

    fn claim(&mut self, user: Address, reward_token: Address) {
        self.settle(user, reward_token);
        let slot = (user, reward_token);
        let amount = self.user_rewards_owed.get(&slot).unwrap_or_default();
        if amount.is_zero() {
            return;
        }
        self.user_rewards_owed.set(&slot, U256::zero());
        self.token(reward_token).transfer(user, amount);

        self.env().emit_event(events::RewardsPaid {
            user,
            reward_token,
            amount,
        });
    }

    fn set_rewarder(&mut self, rewarder: Address, allowed: bool) {
        if self.admin.get() != Some(self.env().caller()) {
            self.env().revert(ProtocolError::Unauthorized);
        }
        self.rewarders.set(&rewarder, allowed);
        self.env().emit_event(events::RewarderUpdated { rewarder, allowed });
    }

    fn token(&self, address: Address) -> ProtocolTokenContractRef {
        ProtocolTokenContractRef::new(self.env(), address)
    }
}
