//! PtyPool Contract
//!
//! Pre-staked capital that absorbs a vault's rebalancing trades:
//! - BelowAARS pool stakes USB; on a match the vault burns staked USB and
//!   pays reserve asset
//! - AboveAARU pool stakes reserve asset; on a match the vault takes staked
//!   asset and pays freshly minted USB
//!
//! Key mechanics:
//! - Pool shares follow the share ledger over the pool's staking balance, and
//!   the staking balance is read through the staking token's own shares, so a
//!   rebasing staking token scales every staker automatically
//! - Three accumulators (1e18 per pool share): staking yields, matched tokens
//!   and matching yields. Matching yields stay pending until the next match.
//! - A match that drains the staking balance closes the staking epoch

use odra::prelude::*;
use odra::casper_types::U256;
use odra::ContractRef;
use crate::errors::ProtocolError;
use crate::interfaces::{ProtocolTokenContractRef, VaultStatusContractRef};
use crate::share_ledger::LedgerTotals;
use crate::types::{one, PtyPoolEarnings, PtyPoolType, VaultPhase};

/// Accumulator values, per pool share
#[odra::odra_type]
#[derive(Default, Copy)]
pub struct Accumulators {
    pub staking_yields: U256,
    pub matched_tokens: U256,
    pub matching_yields: U256,
}

/// Staker snapshot
#[odra::odra_type]
#[derive(Default)]
pub struct StakerInfo {
    /// Pool shares
    pub shares: U256,
    /// Staking epoch the shares belong to
    pub epoch: u64,
    /// Accumulators at last settlement
    pub paid: Accumulators,
    /// Settled but unclaimed amounts
    pub owed: PtyPoolEarnings,
}

/// Token routing of a pool
#[odra::odra_type]
pub struct PoolTokens {
    pub staking_token: Address,
    pub target_token: Address,
    pub staking_yields_token: Address,
    pub matching_yields_token: Address,
}

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
    pub struct StakingYieldsAdded {
        pub amount: U256,
    }

    #[odra::event]
    pub struct MatchingYieldsAdded {
        pub amount: U256,
    }

    #[odra::event]
    pub struct MatchedTokensAdded {
        pub matched_amount: U256,
        pub burned_staking_amount: U256,
        pub matching_yields: U256,
    }

    #[odra::event]
    pub struct StakingYieldsPaid {
        pub user: Address,
        pub amount: U256,
    }

    #[odra::event]
    pub struct MatchedTokensPaid {
        pub user: Address,
        pub amount: U256,
    }

    #[odra::event]
    pub struct MatchingYieldsPaid {
        pub user: Address,
        pub amount: U256,
    }

    #[odra::event]
    pub struct StakingEpochClosed {
        pub epoch: u64,
    }
}

/// PtyPool of one vault
#[odra::module(events = [
    events::Staked,
    events::Withdrawn,
    events::StakingYieldsAdded,
    events::MatchingYieldsAdded,
    events::MatchedTokensAdded,
    events::StakingYieldsPaid,
    events::MatchedTokensPaid,
    events::MatchingYieldsPaid,
    events::StakingEpochClosed
])]
pub struct PtyPool {
    /// Owning vault
    vault: Var<Address>,
    /// Side of the imbalance this pool absorbs
    pool_type: Var<PtyPoolType>,
    /// Token routing
    tokens: Var<PoolTokens>,

    // === Staking State ===
    /// Sum of staker pool shares
    total_shares: Var<U256>,
    /// Staking token shares held for stakers
    staked_token_shares: Var<U256>,
    /// Current staking epoch
    epoch: Var<u64>,

    // === Reward State ===
    /// Running accumulators
    accumulators: Var<Accumulators>,
    /// Final accumulators of closed epochs
    epoch_accumulators: Mapping<u64, Accumulators>,
    /// Matching yields waiting for the next match
    pending_matching_yields: Var<U256>,
    /// Staking yields received while nobody was staked
    pending_staking_yields: Var<U256>,

    /// Staker snapshots
    stakers: Mapping<Address, StakerInfo>,
}

#[odra::module]
impl PtyPool {
    /// Initialize the pool
    pub fn init(
        &mut self,
        vault: Address,
        pool_type: PtyPoolType,
        staking_token: Address,
        target_token: Address,
        staking_yields_token: Address,
        matching_yields_token: Address,
    ) {
        self.vault.set(vault);
        self.pool_type.set(pool_type);
        self.tokens.set(PoolTokens {
            staking_token,
            target_token,
            staking_yields_token,
            matching_yields_token,
        });
        self.total_shares.set(U256::zero());
        self.staked_token_shares.set(U256::zero());
        self.epoch.set(0);
        self.accumulators.set(Accumulators::default());
    }

    // ========== Staking ==========

    /// Stake `amount` of the staking token
    /// Note: Caller must have approved the pool to spend the staking token
    pub fn stake(&mut self, amount: U256) {
        if amount.is_zero() {
            self.env().revert(ProtocolError::ZeroAmount);
        }
        let user = self.env().caller();
        let mut info = self.settled(user);
        let mut ledger = self.staking_ledger();

        let tokens = self.get_tokens();
        let mut staking_token = self.token(tokens.staking_token);
        let self_address = self.env().self_address();
        let before = staking_token.shares_of(self_address);
        staking_token.transfer_from(user, self_address, amount);
        let received_shares = staking_token.shares_of(self_address) - before;
        let received = staking_token.get_balance_by_shares(received_shares);

        let shares = match ledger.mint(received) {
            Ok(shares) => shares,
            Err(error) => self.env().revert(error),
        };

        let staked = self.staked_token_shares.get_or_default() + received_shares;
        self.staked_token_shares.set(staked);
        self.total_shares.set(ledger.total_shares);
        info.shares = info.shares + shares;
        self.stakers.set(&user, info);

        self.env().emit_event(events::Staked { user, amount, shares });
    }

    /// Withdraw `amount` of staking token
    pub fn withdraw(&mut self, amount: U256) {
        if amount.is_zero() {
            self.env().revert(ProtocolError::ZeroAmount);
        }
        let user = self.env().caller();
        let mut info = self.settled(user);
        let mut ledger = self.staking_ledger();

        if ledger.balance_of(info.shares) < amount {
            self.env().revert(ProtocolError::InsufficientStakingBalance);
        }
        let shares = match ledger.burn(amount, info.shares) {
            Ok(shares) => shares,
            Err(error) => self.env().revert(error),
        };

        info.shares = info.shares - shares;
        self.total_shares.set(ledger.total_shares);
        self.stakers.set(&user, info);
        self.send_staking_tokens(user, amount);

        self.env().emit_event(events::Withdrawn { user, amount, shares });
    }

    // ========== Yields ==========

    /// Distribute staking yields to current stakers
    /// Note: Caller must have approved the pool to spend the yields token
    pub fn add_staking_yields(&mut self, amount: U256) {
        if amount.is_zero() {
            return;
        }
        let tokens = self.get_tokens();
        self.pull(tokens.staking_yields_token, amount);

        let total_shares = self.total_shares.get_or_default();
        let pending = self.pending_staking_yields.get_or_default() + amount;
        if total_shares.is_zero() {
            self.pending_staking_yields.set(pending);
        } else {
            let mut acc = self.accumulators();
            acc.staking_yields = acc.staking_yields + pending * one() / total_shares;
            self.accumulators.set(acc);
            self.pending_staking_yields.set(U256::zero());
        }

        self.env().emit_event(events::StakingYieldsAdded { amount });
    }

    /// Deposit matching yields, distributed at the next match
    /// Note: Caller must have approved the pool to spend the yields token
    pub fn add_matching_yields(&mut self, amount: U256) {
        if amount.is_zero() {
            return;
        }
        let tokens = self.get_tokens();
        self.pull(tokens.matching_yields_token, amount);
        let pending = self.pending_matching_yields.get_or_default() + amount;
        self.pending_matching_yields.set(pending);

        self.env().emit_event(events::MatchingYieldsAdded { amount });
    }

    /// Record a match (vault only)
    ///
    /// The vault has already delivered `matched_amount` target tokens; the pool
    /// sends `burned_staking_amount` staking tokens back to the vault.
    /// The vault must be in the adjustment phase this pool absorbs.
    pub fn add_matched_tokens(&mut self, matched_amount: U256, burned_staking_amount: U256) {
        let vault = self.get_vault();
        if self.env().caller() != vault {
            self.env().revert(ProtocolError::UnauthorizedVault);
        }
        let (required, phase_error) = match self.get_pool_type() {
            PtyPoolType::BelowAars => (
                VaultPhase::AdjustmentBelowAars,
                ProtocolError::VaultNotAtAdjustmentBelowAarsPhase,
            ),
            PtyPoolType::AboveAaru => (
                VaultPhase::AdjustmentAboveAaru,
                ProtocolError::VaultNotAtAdjustmentAboveAaruPhase,
            ),
        };
        if VaultStatusContractRef::new(self.env(), vault).get_vault_phase() != required {
            self.env().revert(phase_error);
        }
        let total_shares = self.total_shares.get_or_default();
        if total_shares.is_zero() {
            self.env().revert(ProtocolError::InsufficientStakingBalance);
        }
        if burned_staking_amount > self.total_staking_balance() {
            self.env().revert(ProtocolError::InsufficientStakingBalance);
        }

        let matching_yields = self.pending_matching_yields.get_or_default();
        let mut acc = self.accumulators();
        acc.matched_tokens = acc.matched_tokens + matched_amount * one() / total_shares;
        acc.matching_yields = acc.matching_yields + matching_yields * one() / total_shares;
        self.accumulators.set(acc);
        self.pending_matching_yields.set(U256::zero());

        self.send_staking_tokens(vault, burned_staking_amount);

        if self.total_staking_balance().is_zero() {
            let epoch = self.epoch.get_or_default();
            self.epoch_accumulators.set(&epoch, acc);
            self.epoch.set(epoch + 1);
            self.total_shares.set(U256::zero());
            self.staked_token_shares.set(U256::zero());
            self.env().emit_event(events::StakingEpochClosed { epoch });
        }

        self.env().emit_event(events::MatchedTokensAdded {
            matched_amount,
            burned_staking_amount,
            matching_yields,
        });
    }

    // ========== Claims ==========

    pub fn claim_staking_yields(&mut self) {
        let user = self.env().caller();
        let mut info = self.settled(user);
        let amount = info.owed.staking_yields;
        info.owed.staking_yields = U256::zero();
        self.stakers.set(&user, info);

        if !amount.is_zero() {
            let tokens = self.get_tokens();
            self.token(tokens.staking_yields_token).transfer(user, amount);
            self.env().emit_event(events::StakingYieldsPaid { user, amount });
        }
    }

    pub fn claim_matching_tokens_and_yields(&mut self) {
        let user = self.env().caller();
        let mut info = self.settled(user);
        let matched = info.owed.matched_tokens;
        let yields = info.owed.matching_yields;
        info.owed.matched_tokens = U256::zero();
        info.owed.matching_yields = U256::zero();
        self.stakers.set(&user, info);

        let tokens = self.get_tokens();
        if !matched.is_zero() {
            self.token(tokens.target_token).transfer(user, matched);
            self.env().emit_event(events::MatchedTokensPaid { user, amount: matched });
        }
        if !yields.is_zero() {
            self.token(tokens.matching_yields_token).transfer(user, yields);
            self.env().emit_event(events::MatchingYieldsPaid { user, amount: yields });
        }
    }

    // ========== Query Functions ==========

    pub fn get_vault(&self) -> Address {
        match self.vault.get() {
            Some(vault) => vault,
            None => self.env().revert(ProtocolError::NotConfigured),
        }
    }

    pub fn get_pool_type(&self) -> PtyPoolType {
        match self.pool_type.get() {
            Some(pool_type) => pool_type,
            None => self.env().revert(ProtocolError::NotConfigured),
        }
    }

    pub fn get_tokens(&self) -> PoolTokens {
        match self.tokens.get() {
            Some(tokens) => tokens,
            None => self.env().revert(ProtocolError::NotConfigured),
        }
    }

    pub fn get_epoch(&self) -> u64 {
        self.epoch.get_or_default()
    }

    pub fn total_staking_shares(&self) -> U256 {
        self.total_shares.get_or_default()
    }

    /// Staking tokens held for stakers, rebase-aware
    pub fn total_staking_balance(&self) -> U256 {
        let shares = self.staked_token_shares.get_or_default();
        if shares.is_zero() {
            return U256::zero();
        }
        let tokens = self.get_tokens();
        self.token(tokens.staking_token).get_balance_by_shares(shares)
    }

    pub fn user_staking_shares(&self, user: Address) -> U256 {
        self.settled(user).shares
    }

    pub fn user_staking_balance(&self, user: Address) -> U256 {
        let shares = self.settled(user).shares;
        self.staking_ledger().balance_of(shares)
    }

    pub fn pending_matching_yields(&self) -> U256 {
        self.pending_matching_yields.get_or_default()
    }

    /// Unclaimed rewards of `user`
    pub fn earnings(&self, user: Address) -> PtyPoolEarnings {
        self.settled(user).owed
    }

    pub fn earned_staking_yields(&self, user: Address) -> U256 {
        self.earnings(user).staking_yields
    }

    pub fn earned_matched_tokens(&self, user: Address) -> U256 {
        self.earnings(user).matched_tokens
    }

    pub fn earned_matching_yields(&self, user: Address) -> U256 {
        self.earnings(user).matching_yields
    }

    // ========== Internal Functions ==========

    fn accumulators(&self) -> Accumulators {
        self.accumulators.get().unwrap_or_default()
    }

    fn staking_ledger(&self) -> LedgerTotals {
        LedgerTotals {
            total_shares: self.total_shares.get_or_default(),
            total_supply: self.total_staking_balance(),
        }
    }

    /// Staker snapshot with rewards settled up to now
    fn settled(&self, user: Address) -> StakerInfo {
        let mut info = self.stakers.get(&user).unwrap_or_default();
        let current_epoch = self.epoch.get_or_default();
        let current = self.accumulators();

        let reached = if info.epoch < current_epoch {
            self.epoch_accumulators.get(&info.epoch).unwrap_or_default()
        } else {
            current
        };
        if !info.shares.is_zero() {
            info.owed.staking_yields = info.owed.staking_yields
                + info.shares * (reached.staking_yields - info.paid.staking_yields) / one();
            info.owed.matched_tokens = info.owed.matched_tokens
                + info.shares * (reached.matched_tokens - info.paid.matched_tokens) / one();
            info.owed.matching_yields = info.owed.matching_yields
                + info.shares * (reached.matching_yields - info.paid.matching_yields) / one();
        }
        if info.epoch < current_epoch {
            info.shares = U256::zero();
            info.epoch = current_epoch;
        }
        info.paid = current;
        info
    }

    fn token(&self, address: Address) -> ProtocolTokenContractRef {
        ProtocolTokenContractRef::new(self.env(), address)
    }

    fn pull(&self, token: Address, amount: U256) {
        let caller = self.env().caller();
        let self_address = self.env().self_address();
        self.token(token).transfer_from(caller, self_address, amount);
    }

    /// Send staking tokens out of the staked balance
    fn send_staking_tokens(&mut self, recipient: Address, amount: U256) {
        if amount.is_zero() {
            return;
        }
        let tokens = self.get_tokens();
        let mut staking_token = self.token(tokens.staking_token);
        let self_address = self.env().self_address();
        let before = staking_token.shares_of(self_address);
        staking_token.transfer(recipient, amount);
        let sent_shares = before - staking_token.shares_of(self_address);

        let staked = self.staked_token_shares.get_or_default();
        self.staked_token_shares.set(staked.saturating_sub(sent_shares));
    }
}
