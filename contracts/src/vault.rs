//! Vault Contract
//!
//! Holds one reserve asset and issues USB and the vault's leveraged token.
//!
//! Every mutating call runs the same pipeline:
//! 1. Settle reserve yields (rebasing reserves) and accrued interest
//! 2. Snapshot `(M_asset, P, M_usb, M_lev, AAR)` and update phase and timers
//! 3. Validate phase and AAR guards, price the operation, move tokens
//! 4. Match against the PtyPools if AAR left [AARS, AARU], update phase and
//!    timers again
//!
//! ## Circuit breaker
//!
//! The first observation of `AAR < AARC` starts a cooldown of
//! `CircuitBreakPeriod`. Leveraged-only mints and discount purchases are
//! blocked while `AAR < AARC` and until the cooldown has elapsed.

use odra::prelude::*;
use odra::casper_types::U256;
use odra::{ContractEnv, ContractRef};
use crate::errors::{ProtocolError, ProtocolResult};
use crate::interest::{calculate_interest, split_by_fraction};
use crate::interfaces::{
    AssetPriceFeedContractRef, InterestRewardsContractRef, ParamStoreContractRef,
    ProtocolTokenContractRef, PtyPoolHooksContractRef,
};
use crate::types::{one, PtyPoolType, VaultParams, VaultPhase, VaultState};
use crate::vault_calculator as calc;

pub mod events {
    use odra::prelude::*;
    use odra::casper_types::U256;
    use crate::types::{PtyPoolType, VaultPhase};

    #[odra::event]
    pub struct UsbMinted {
        pub user: Address,
        pub asset_amount: U256,
        pub usb_amount: U256,
        pub price: U256,
    }

    #[odra::event]
    pub struct LeveragedTokenMinted {
        pub user: Address,
        pub asset_amount: U256,
        pub lev_amount: U256,
        pub price: U256,
    }

    #[odra::event]
    pub struct UsbBurned {
        pub user: Address,
        pub usb_amount: U256,
    }

    #[odra::event]
    pub struct LeveragedTokenBurned {
        pub user: Address,
        pub lev_amount: U256,
    }

    #[odra::event]
    pub struct AssetRedeemedWithUsb {
        pub user: Address,
        pub usb_amount: U256,
        pub asset_amount: U256,
        pub price: U256,
    }

    #[odra::event]
    pub struct AssetRedeemedWithLeveragedToken {
        pub user: Address,
        pub lev_amount: U256,
        pub asset_amount: U256,
        pub price: U256,
    }

    #[odra::event]
    pub struct AssetRedeemedWithPairs {
        pub user: Address,
        pub usb_amount: U256,
        pub lev_amount: U256,
        pub asset_amount: U256,
    }

    #[odra::event]
    pub struct RedemptionFeeCollected {
        pub user: Address,
        pub treasury: Address,
        pub fee_amount: U256,
    }

    #[odra::event]
    pub struct UsbToLeveragedTokens {
        pub user: Address,
        pub usb_amount: U256,
        pub lev_amount: U256,
        pub discount_rate: U256,
    }

    #[odra::event]
    pub struct InterestSettlement {
        pub interest: U256,
        pub distributed: bool,
    }

    #[odra::event]
    pub struct YieldsSettlement {
        pub amount: U256,
    }

    #[odra::event]
    pub struct PtyPoolMatched {
        pub pool_type: PtyPoolType,
        pub usb_amount: U256,
        pub asset_amount: U256,
    }

    #[odra::event]
    pub struct VaultPhaseUpdated {
        pub previous: VaultPhase,
        pub current: VaultPhase,
    }
}

/// Vault of one reserve asset
#[odra::module(events = [
    events::UsbMinted,
    events::LeveragedTokenMinted,
    events::UsbBurned,
    events::LeveragedTokenBurned,
    events::AssetRedeemedWithUsb,
    events::AssetRedeemedWithLeveragedToken,
    events::AssetRedeemedWithPairs,
    events::RedemptionFeeCollected,
    events::UsbToLeveragedTokens,
    events::InterestSettlement,
    events::YieldsSettlement,
    events::PtyPoolMatched,
    events::VaultPhaseUpdated
])]
pub struct Vault {
    /// Admin address (post-deploy wiring)
    admin: Var<Address>,
    /// Settings contract
    settings: Var<Address>,
    /// Reserve price feed
    price_feed: Var<Address>,
    /// Reserve asset token
    asset_token: Var<Address>,
    /// USB token
    usb_token: Var<Address>,
    /// Leveraged token of this vault
    leveraged_token: Var<Address>,
    /// PtyPool absorbing AAR drops below AARS
    pty_pool_below_aars: Var<Option<Address>>,
    /// PtyPool absorbing AAR rises above AARU
    pty_pool_above_aaru: Var<Option<Address>>,
    /// USB interest pool
    interest_pool: Var<Option<Address>>,

    // === Vault State ===
    /// Reserve asset held
    asset_total_amount: Var<U256>,
    /// USB liability of this vault
    usb_total_supply: Var<U256>,
    /// Phase at the end of the last call
    vault_phase: Var<VaultPhase>,
    /// Last interest settlement (seconds)
    last_interest_settlement_time: Var<u64>,
    /// Interest accrued but not yet distributed
    undistributed_interest: Var<U256>,
    /// First time AAR was seen at or below AARS (seconds)
    aar_below_safe_line_time: Var<Option<u64>>,
    /// First time AAR was seen below AARC (seconds)
    aar_below_circuit_breaker_line_time: Var<Option<u64>>,
}

#[odra::module]
impl Vault {
    /// Initialize the vault, the deployer becomes admin
    pub fn init(
        &mut self,
        settings: Address,
        price_feed: Address,
        asset_token: Address,
        usb_token: Address,
        leveraged_token: Address,
    ) {
        self.admin.set(self.env().caller());
        self.settings.set(settings);
        self.price_feed.set(price_feed);
        self.asset_token.set(asset_token);
        self.usb_token.set(usb_token);
        self.leveraged_token.set(leveraged_token);
        self.pty_pool_below_aars.set(None);
        self.pty_pool_above_aaru.set(None);
        self.interest_pool.set(None);

        self.asset_total_amount.set(U256::zero());
        self.usb_total_supply.set(U256::zero());
        self.vault_phase.set(VaultPhase::Empty);
        self.last_interest_settlement_time.set(self.now());
        self.undistributed_interest.set(U256::zero());
        self.aar_below_safe_line_time.set(None);
        self.aar_below_circuit_breaker_line_time.set(None);
    }

    // ========== Wiring (admin, set once) ==========

    pub fn set_pty_pools(&mut self, below_aars: Address, above_aaru: Address) {
        self.require_admin();
        if self.get_pty_pools().is_some() {
            self.env().revert(ProtocolError::AlreadySet);
        }
        if self.pool(below_aars).get_pool_type() != PtyPoolType::BelowAars
            || self.pool(above_aaru).get_pool_type() != PtyPoolType::AboveAaru
        {
            self.env().revert(ProtocolError::InvalidParam);
        }
        let self_address = self.env().self_address();
        if self.pool(below_aars).get_vault() != self_address
            || self.pool(above_aaru).get_vault() != self_address
        {
            self.env().revert(ProtocolError::UnauthorizedVault);
        }
        self.pty_pool_below_aars.set(Some(below_aars));
        self.pty_pool_above_aaru.set(Some(above_aaru));
    }

    pub fn set_interest_pool(&mut self, interest_pool: Address) {
        self.require_admin();
        if self.get_interest_pool().is_some() {
            self.env().revert(ProtocolError::AlreadySet);
        }
        self.interest_pool.set(Some(interest_pool));
    }

    // ========== Mint ==========

    /// Mint USB and leveraged tokens together
    /// Note: Caller must have approved the vault to spend the reserve asset
    pub fn mint_pairs(&mut self, asset_amount: U256) {
        let (params, state) = self.before_operation();
        let user = self.env().caller();

        let received = self.pull_asset(user, asset_amount);
        let (usb_out, lev_out) = or_revert(&self.env(), calc::calc_mint_pairs(&state, &params, received));

        self.asset_total_amount.set(state.m_asset + received);
        self.usb_total_supply.set(state.m_usb + usb_out);
        self.token(self.get_usb_token()).mint(user, usb_out);
        self.token(self.get_leveraged_token()).mint(user, lev_out);

        self.env().emit_event(events::UsbMinted {
            user,
            asset_amount: received,
            usb_amount: usb_out,
            price: state.price,
        });
        self.env().emit_event(events::LeveragedTokenMinted {
            user,
            asset_amount: received,
            lev_amount: lev_out,
            price: state.price,
        });
        self.after_operation(&params);
    }

    /// Mint USB only, AdjustmentAboveAARU phase
    pub fn mint_usb_above_aaru(&mut self, asset_amount: U256) {
        let (params, state) = self.before_operation();
        if calc::vault_phase(&state, &params) != VaultPhase::AdjustmentAboveAaru {
            self.env().revert(ProtocolError::VaultNotAtAdjustmentAboveAaruPhase);
        }
        let user = self.env().caller();

        let received = self.pull_asset(user, asset_amount);
        let usb_out = or_revert(&self.env(), calc::calc_mint_usb_above_aaru(&state, &params, received));

        self.asset_total_amount.set(state.m_asset + received);
        self.usb_total_supply.set(state.m_usb + usb_out);
        self.token(self.get_usb_token()).mint(user, usb_out);

        self.env().emit_event(events::UsbMinted {
            user,
            asset_amount: received,
            usb_amount: usb_out,
            price: state.price,
        });
        self.after_operation(&params);
    }

    /// Mint leveraged tokens only, AdjustmentBelowAARS phase
    pub fn mint_leveraged_token_below_aars(&mut self, asset_amount: U256) {
        let (params, state) = self.before_operation();
        if calc::vault_phase(&state, &params) != VaultPhase::AdjustmentBelowAars {
            self.env().revert(ProtocolError::VaultNotAtAdjustmentBelowAarsPhase);
        }
        if state.aar <= one() {
            self.env().revert(ProtocolError::AarBelow100Percent);
        }
        self.require_circuit_breaker_clear(
            &params,
            &state,
            ProtocolError::AarBelowCircuitBreakerLineThreshold,
        );
        let user = self.env().caller();

        let received = self.pull_asset(user, asset_amount);
        let lev_out = or_revert(&self.env(), calc::calc_mint_lev_below_aars(&state, &params, received));

        self.asset_total_amount.set(state.m_asset + received);
        self.token(self.get_leveraged_token()).mint(user, lev_out);

        self.env().emit_event(events::LeveragedTokenMinted {
            user,
            asset_amount: received,
            lev_amount: lev_out,
            price: state.price,
        });
        self.after_operation(&params);
    }

    /// Discount purchase of leveraged tokens with USB, AdjustmentBelowAARS phase
    pub fn usb_to_leveraged_tokens(&mut self, usb_amount: U256) {
        let (params, state) = self.before_operation();
        if calc::vault_phase(&state, &params) != VaultPhase::AdjustmentBelowAars {
            self.env().revert(ProtocolError::VaultNotAtAdjustmentBelowAarsPhase);
        }
        if state.aar <= one() {
            self.env().revert(ProtocolError::AarBelow100Percent);
        }
        self.require_circuit_breaker_clear(
            &params,
            &state,
            ProtocolError::ConditionalDiscountPurchaseSuspended,
        );
        let user = self.env().caller();

        let discount_rate = calc::calc_discount_rate(state.aar, &params, self.seconds_below_safe_line());
        let lev_out =
            or_revert(&self.env(), calc::calc_usb_to_lev(&state, &params, usb_amount, discount_rate));

        self.token(self.get_usb_token()).burn_from(user, usb_amount);
        self.usb_total_supply.set(state.m_usb - usb_amount);
        self.token(self.get_leveraged_token()).mint(user, lev_out);

        self.env().emit_event(events::UsbBurned { user, usb_amount });
        self.env().emit_event(events::UsbToLeveragedTokens {
            user,
            usb_amount,
            lev_amount: lev_out,
            discount_rate,
        });
        self.after_operation(&params);
    }

    // ========== Redeem ==========

    /// Burn USB for reserve asset, fee C1 to the treasury
    pub fn redeem_by_usb(&mut self, usb_amount: U256) {
        let (params, state) = self.before_operation();
        let user = self.env().caller();
        let (net, fee) = or_revert(&self.env(), calc::calc_redeem_by_usb(&state, &params, usb_amount));

        self.token(self.get_usb_token()).burn_from(user, usb_amount);
        self.usb_total_supply.set(state.m_usb - usb_amount);
        self.asset_total_amount.set(state.m_asset - net - fee);
        self.pay_asset(user, net);
        self.collect_fee(user, fee);

        self.env().emit_event(events::UsbBurned { user, usb_amount });
        self.env().emit_event(events::AssetRedeemedWithUsb {
            user,
            usb_amount,
            asset_amount: net,
            price: state.price,
        });
        self.after_operation(&params);
    }

    /// Burn leveraged tokens for reserve asset at NAV, fee C2 to the treasury
    pub fn redeem_by_leveraged_token(&mut self, lev_amount: U256) {
        let (params, state) = self.before_operation();
        let user = self.env().caller();
        let (net, fee) = or_revert(&self.env(), calc::calc_redeem_by_lev(&state, &params, lev_amount));

        self.token(self.get_leveraged_token()).burn_from(user, lev_amount);
        self.asset_total_amount.set(state.m_asset - net - fee);
        self.pay_asset(user, net);
        self.collect_fee(user, fee);

        self.env().emit_event(events::LeveragedTokenBurned { user, lev_amount });
        self.env().emit_event(events::AssetRedeemedWithLeveragedToken {
            user,
            lev_amount,
            asset_amount: net,
            price: state.price,
        });
        self.after_operation(&params);
    }

    /// Burn a USB amount plus the matching leveraged tokens, no fee
    pub fn redeem_by_pairs_with_usb_amount(&mut self, usb_amount: U256) {
        let (params, state) = self.before_operation();
        let (lev_amount, asset_out) =
            or_revert(&self.env(), calc::calc_pairs_with_usb_amount(&state, usb_amount));
        self.redeem_pairs(&state, usb_amount, lev_amount, asset_out);
        self.after_operation(&params);
    }

    /// Burn a leveraged token amount plus the matching USB, no fee
    pub fn redeem_by_pairs_with_leveraged_token_amount(&mut self, lev_amount: U256) {
        let (params, state) = self.before_operation();
        let (usb_amount, asset_out) =
            or_revert(&self.env(), calc::calc_pairs_with_lev_amount(&state, lev_amount));
        self.redeem_pairs(&state, usb_amount, lev_amount, asset_out);
        self.after_operation(&params);
    }

    // ========== Maintenance ==========

    /// Settle yields and interest, then re-evaluate matching and timers
    pub fn settle_interest(&mut self) {
        let (params, _) = self.before_operation();
        self.after_operation(&params);
    }

    /// Re-evaluate AAR: settle, match against the PtyPools, update timers
    pub fn check_aar(&mut self) {
        let (params, _) = self.before_operation();
        self.after_operation(&params);
    }

    // ========== Query Functions ==========

    pub fn get_vault_state(&self) -> VaultState {
        self.snapshot()
    }

    pub fn get_params(&self) -> VaultParams {
        self.params()
    }

    pub fn get_vault_phase(&self) -> VaultPhase {
        self.vault_phase.get().unwrap_or_default()
    }

    pub fn aar(&self) -> U256 {
        self.snapshot().aar
    }

    pub fn asset_total_amount(&self) -> U256 {
        self.asset_total_amount.get_or_default()
    }

    pub fn usb_total_supply(&self) -> U256 {
        self.usb_total_supply.get_or_default()
    }

    pub fn last_interest_settlement_time(&self) -> u64 {
        self.last_interest_settlement_time.get_or_default()
    }

    pub fn undistributed_interest(&self) -> U256 {
        self.undistributed_interest.get_or_default()
    }

    pub fn aar_below_safe_line_time(&self) -> Option<u64> {
        self.aar_below_safe_line_time.get().flatten()
    }

    pub fn aar_below_circuit_breaker_line_time(&self) -> Option<u64> {
        self.aar_below_circuit_breaker_line_time.get().flatten()
    }

    /// `(below_aars, above_aaru)` pools once linked
    pub fn get_pty_pools(&self) -> Option<(Address, Address)> {
        let below = self.pty_pool_below_aars.get().flatten()?;
        let above = self.pty_pool_above_aaru.get().flatten()?;
        Some((below, above))
    }

    pub fn get_interest_pool(&self) -> Option<Address> {
        self.interest_pool.get().flatten()
    }

    /// Quote of `mint_pairs` at the current state
    pub fn calc_mint_pairs(&self, asset_amount: U256) -> (U256, U256) {
        let state = self.snapshot();
        or_revert(&self.env(), calc::calc_mint_pairs(&state, &self.params(), asset_amount))
    }

    /// Quote of `usb_to_leveraged_tokens` at the current state
    pub fn calc_usb_to_leveraged_tokens(&self, usb_amount: U256) -> U256 {
        let params = self.params();
        let state = self.snapshot();
        let rate = calc::calc_discount_rate(state.aar, &params, self.seconds_below_safe_line());
        or_revert(&self.env(), calc::calc_usb_to_lev(&state, &params, usb_amount, rate))
    }

    /// Current discount rate `r`
    pub fn discount_rate(&self) -> U256 {
        let state = self.snapshot();
        calc::calc_discount_rate(state.aar, &self.params(), self.seconds_below_safe_line())
    }

    // ========== Pipeline ==========

    fn before_operation(&mut self) -> (VaultParams, VaultState) {
        let params = self.params();
        self.settle_yields(&params);
        self.settle_interest_internal(&params);
        let state = self.snapshot();
        self.update_phase_and_timers(&params, &state);
        (params, state)
    }

    fn after_operation(&mut self, params: &VaultParams) {
        let state = self.snapshot();
        // PtyPools read the stored phase when a match is recorded
        let phase = self.update_phase(params, &state);
        self.run_pty_pool_matching(params, &state, phase);
        let state = self.snapshot();
        self.update_phase_and_timers(params, &state);
    }

    fn update_phase(&mut self, params: &VaultParams, state: &VaultState) -> VaultPhase {
        let phase = calc::vault_phase(state, params);
        let previous = self.get_vault_phase();
        if previous != phase {
            self.vault_phase.set(phase);
            self.env().emit_event(events::VaultPhaseUpdated { previous, current: phase });
        }
        phase
    }

    fn update_phase_and_timers(&mut self, params: &VaultParams, state: &VaultState) {
        let phase = self.update_phase(params, state);

        let now = self.now();
        if phase == VaultPhase::AdjustmentBelowAars {
            if self.aar_below_safe_line_time().is_none() {
                self.aar_below_safe_line_time.set(Some(now));
            }
        } else {
            self.aar_below_safe_line_time.set(None);
        }

        match self.aar_below_circuit_breaker_line_time() {
            None if state.aar < params.aarc => {
                self.aar_below_circuit_breaker_line_time.set(Some(now));
            }
            Some(since) if state.aar >= params.aarc && now >= since + period_secs(params) => {
                self.aar_below_circuit_breaker_line_time.set(None);
            }
            _ => {}
        }
    }

    fn require_circuit_breaker_clear(
        &self,
        params: &VaultParams,
        state: &VaultState,
        cooldown_error: ProtocolError,
    ) {
        if state.aar < params.aarc {
            self.env().revert(ProtocolError::AarBelowCircuitBreakerLineThreshold);
        }
        if let Some(since) = self.aar_below_circuit_breaker_line_time() {
            if self.now() < since + period_secs(params) {
                self.env().revert(cooldown_error);
            }
        }
    }

    fn redeem_pairs(&mut self, state: &VaultState, usb_amount: U256, lev_amount: U256, asset_out: U256) {
        let user = self.env().caller();
        self.token(self.get_usb_token()).burn_from(user, usb_amount);
        self.token(self.get_leveraged_token()).burn_from(user, lev_amount);
        self.usb_total_supply.set(state.m_usb - usb_amount);
        self.asset_total_amount.set(state.m_asset - asset_out);
        self.pay_asset(user, asset_out);

        self.env().emit_event(events::UsbBurned { user, usb_amount });
        self.env().emit_event(events::LeveragedTokenBurned { user, lev_amount });
        self.env().emit_event(events::AssetRedeemedWithPairs {
            user,
            usb_amount,
            lev_amount,
            asset_amount: asset_out,
        });
    }

    // ========== Settlement ==========

    /// Route reserve growth of a rebasing asset to the PtyPools
    fn settle_yields(&mut self, params: &VaultParams) {
        let asset_address = self.get_asset_token();
        let asset = self.token(asset_address);
        if !asset.is_rebasing() {
            return;
        }
        let asset_total = self.asset_total_amount();
        let balance = asset.balance_of(self.env().self_address());
        if balance <= asset_total {
            return;
        }
        let yields = balance - asset_total;

        match self.get_pty_pools() {
            Some((below, above)) => {
                let (to_below, to_above) = split_by_fraction(yields, params.pty_pool_yields_split);
                self.feed_pool(asset_address, below, to_below, false);
                self.feed_pool(asset_address, above, to_above, true);
            }
            None => self.asset_total_amount.set(asset_total + yields),
        }

        self.env().emit_event(events::YieldsSettlement { amount: yields });
    }

    /// Accrue interest and distribute it in leveraged tokens
    fn settle_interest_internal(&mut self, params: &VaultParams) {
        let now = self.now();
        let lev_address = self.get_leveraged_token();
        let lev_supply = self.token(lev_address).total_supply();
        let new_interest =
            calculate_interest(lev_supply, params.y, self.last_interest_settlement_time(), now);
        self.last_interest_settlement_time.set(now);

        let mut pending = self.undistributed_interest() + new_interest;
        if pending.is_zero() {
            return;
        }

        if let Some((below, above)) = self.get_pty_pools() {
            let (to_pools, rest) = split_by_fraction(pending, params.pty_pool_interest_share);
            if !to_pools.is_zero() {
                let (to_below, to_above) = split_by_fraction(to_pools, params.pty_pool_yields_split);
                let self_address = self.env().self_address();
                self.token(lev_address).mint(self_address, to_pools);
                self.feed_pool(lev_address, below, to_below, true);
                self.feed_pool(lev_address, above, to_above, false);
            }
            pending = rest;
        }

        let distributed = match self.get_interest_pool() {
            Some(pool) if !pending.is_zero() => {
                let mut rewards = InterestRewardsContractRef::new(self.env(), pool);
                if rewards.total_staking_amount().is_zero() {
                    false
                } else {
                    let self_address = self.env().self_address();
                    let mut lev = self.token(lev_address);
                    lev.mint(self_address, pending);
                    lev.approve(pool, pending);
                    rewards.add_rewards(lev_address, pending);
                    true
                }
            }
            _ => pending.is_zero(),
        };
        self.undistributed_interest
            .set(if distributed { U256::zero() } else { pending });

        if !new_interest.is_zero() || distributed {
            self.env().emit_event(events::InterestSettlement {
                interest: new_interest,
                distributed,
            });
        }
    }

    /// Approve and push `amount` of `token` into a pool as staking or
    /// matching yields
    fn feed_pool(&mut self, token: Address, pool: Address, amount: U256, staking_yields: bool) {
        if amount.is_zero() {
            return;
        }
        self.token(token).approve(pool, amount);
        let mut hooks = self.pool(pool);
        if staking_yields {
            hooks.add_staking_yields(amount);
        } else {
            hooks.add_matching_yields(amount);
        }
    }

    // ========== PtyPool Matching ==========

    fn run_pty_pool_matching(&mut self, params: &VaultParams, state: &VaultState, phase: VaultPhase) {
        let (below, above) = match self.get_pty_pools() {
            Some(pools) => pools,
            None => return,
        };
        match phase {
            VaultPhase::AdjustmentBelowAars => self.match_below_aars(params, state, below),
            VaultPhase::AdjustmentAboveAaru => self.match_above_aaru(params, state, above),
            _ => {}
        }
    }

    /// Burn staked USB from the BelowAARS pool, pay it reserve asset
    fn match_below_aars(&mut self, params: &VaultParams, state: &VaultState, pool: Address) {
        let mut hooks = self.pool(pool);
        let usb_amount = calc::calc_usb_to_burn_below_aars(state, params)
            .min(hooks.total_staking_balance());
        let asset_amount = (usb_amount * one() / state.price).min(state.m_asset);
        if usb_amount.is_zero() || asset_amount.is_zero() {
            return;
        }

        self.pay_asset(pool, asset_amount);
        self.asset_total_amount.set(state.m_asset - asset_amount);

        let self_address = self.env().self_address();
        let mut usb = self.token(self.get_usb_token());
        let before = usb.balance_of(self_address);
        hooks.add_matched_tokens(asset_amount, usb_amount);
        let received = usb.balance_of(self_address) - before;
        usb.burn_from(self_address, received);
        self.usb_total_supply.set(state.m_usb - received.min(state.m_usb));

        self.env().emit_event(events::PtyPoolMatched {
            pool_type: PtyPoolType::BelowAars,
            usb_amount: received,
            asset_amount,
        });
    }

    /// Mint USB into the AboveAARU pool, take its staked reserve asset
    fn match_above_aaru(&mut self, params: &VaultParams, state: &VaultState, pool: Address) {
        let mut hooks = self.pool(pool);
        let target_usb = calc::calc_usb_to_mint_above_aaru(state, params);
        let mut asset_amount = target_usb * one() / state.price;
        let mut usb_amount = target_usb;
        let available = hooks.total_staking_balance();
        if asset_amount > available {
            asset_amount = available;
            usb_amount = asset_amount * state.price / one();
        }
        if usb_amount.is_zero() || asset_amount.is_zero() {
            return;
        }

        self.token(self.get_usb_token()).mint(pool, usb_amount);
        self.usb_total_supply.set(state.m_usb + usb_amount);

        let self_address = self.env().self_address();
        let asset = self.token(self.get_asset_token());
        let before = asset.balance_of(self_address);
        hooks.add_matched_tokens(usb_amount, asset_amount);
        let received = asset.balance_of(self_address) - before;
        self.asset_total_amount.set(state.m_asset + received);

        self.env().emit_event(events::PtyPoolMatched {
            pool_type: PtyPoolType::AboveAaru,
            usb_amount,
            asset_amount: received,
        });
    }

    // ========== Internal Functions ==========

    fn now(&self) -> u64 {
        self.env().get_block_time() / 1000
    }

    fn seconds_below_safe_line(&self) -> u64 {
        match self.aar_below_safe_line_time() {
            Some(since) => self.now().saturating_sub(since),
            None => 0,
        }
    }

    fn params(&self) -> VaultParams {
        let settings = ParamStoreContractRef::new(self.env(), self.get_settings());
        settings.vault_params(self.env().self_address())
    }

    fn price(&self) -> U256 {
        let feed = AssetPriceFeedContractRef::new(self.env(), self.get_price_feed());
        let (price, decimals) = feed.latest_price();
        or_revert(&self.env(), calc::normalize_price(price, decimals))
    }

    fn snapshot(&self) -> VaultState {
        let lev_supply = self.token(self.get_leveraged_token()).total_supply();
        calc::build_state(
            self.asset_total_amount(),
            self.price(),
            self.usb_total_supply(),
            lev_supply,
        )
    }

    /// Pull reserve asset from `user`, returning the amount actually received
    fn pull_asset(&mut self, user: Address, amount: U256) -> U256 {
        if amount.is_zero() {
            self.env().revert(ProtocolError::ZeroAmount);
        }
        let self_address = self.env().self_address();
        let mut asset = self.token(self.get_asset_token());
        let before = asset.balance_of(self_address);
        asset.transfer_from(user, self_address, amount);
        let received = asset.balance_of(self_address) - before;
        if received.is_zero() {
            self.env().revert(ProtocolError::ZeroAmount);
        }
        received
    }

    fn pay_asset(&mut self, recipient: Address, amount: U256) {
        if amount.is_zero() {
            return;
        }
        self.token(self.get_asset_token()).transfer(recipient, amount);
    }

    fn collect_fee(&mut self, user: Address, fee_amount: U256) {
        if fee_amount.is_zero() {
            return;
        }
        let settings = ParamStoreContractRef::new(self.env(), self.get_settings());
        let treasury = settings.treasury();
        self.pay_asset(treasury, fee_amount);
        self.env().emit_event(events::RedemptionFeeCollected {
            user,
            treasury,
            fee_amount,
        });
    }

    fn token(&self, address: Address) -> ProtocolTokenContractRef {
        ProtocolTokenContractRef::new(self.env(), address)
    }

    fn pool(&self, address: Address) -> PtyPoolHooksContractRef {
        PtyPoolHooksContractRef::new(self.env(), address)
    }

    fn configured(&self, address: Option<Address>) -> Address {
        match address {
            Some(address) => address,
            None => self.env().revert(ProtocolError::NotConfigured),
        }
    }

    fn get_settings(&self) -> Address {
        self.configured(self.settings.get())
    }

    fn get_price_feed(&self) -> Address {
        self.configured(self.price_feed.get())
    }

    fn get_asset_token(&self) -> Address {
        self.configured(self.asset_token.get())
    }

    fn get_usb_token(&self) -> Address {
        self.configured(self.usb_token.get())
    }

    fn get_leveraged_token(&self) -> Address {
        self.configured(self.leveraged_token.get())
    }

    fn require_admin(&self) {
        if self.admin.get() != Some(self.env().caller()) {
            self.env().revert(ProtocolError::Unauthorized);
        }
    }
}

/// Unwrap a calculator result, reverting the call on error
fn or_revert<T>(env: &ContractEnv, result: ProtocolResult<T>) -> T {
    match result {
        Ok(value) => value,
        Err(error) => env.revert(error),
    }
}

/// Circuit breaker cooldown in seconds
fn period_secs(params: &VaultParams) -> u64 {
    params.circuit_break_period.min(U256::from(u64::MAX)).as_u64()
}
