//! USB Protocol Integration Tests
//!
//! End-to-end scenarios across the vault, tokens, settings and pools.

#[cfg(test)]
mod fixture {
    use odra::casper_types::U256;
    use odra::host::{Deployer, HostEnv, HostRef};
    use odra::prelude::*;
    use usb_protocol_contracts::interest_pool::{InterestPool, InterestPoolHostRef, InterestPoolInitArgs};
    use usb_protocol_contracts::leveraged_token::{
        LeveragedToken, LeveragedTokenHostRef, LeveragedTokenInitArgs,
    };
    use usb_protocol_contracts::price_feed::{PriceFeed, PriceFeedHostRef, PriceFeedInitArgs};
    use usb_protocol_contracts::pty_pool::{PtyPool, PtyPoolHostRef, PtyPoolInitArgs};
    use usb_protocol_contracts::rebasing_token::{
        RebasingToken, RebasingTokenHostRef, RebasingTokenInitArgs,
    };
    use usb_protocol_contracts::settings::{
        ProtocolSettings, ProtocolSettingsHostRef, ProtocolSettingsInitArgs,
    };
    use usb_protocol_contracts::types::{PtyPoolType, PARAM_Y};
    use usb_protocol_contracts::vault::{Vault, VaultHostRef, VaultInitArgs};

    pub const SCALE: u128 = 1_000_000_000_000_000_000;

    /// One day in milliseconds
    pub const DAY_MS: u64 = 86_400_000;

    pub fn units(n: u64) -> U256 {
        U256::from(n) * U256::from(SCALE)
    }

    pub fn milli(n: u64) -> U256 {
        U256::from(n) * U256::from(SCALE) / U256::from(1000u64)
    }

    pub fn assert_close(actual: U256, expected: U256, tolerance: U256) {
        let diff = if actual > expected { actual - expected } else { expected - actual };
        assert!(
            diff <= tolerance,
            "expected {} within {} of {}",
            actual,
            tolerance,
            expected
        );
    }

    pub struct Protocol {
        pub env: HostEnv,
        pub admin: Address,
        pub treasury: Address,
        pub settings: ProtocolSettingsHostRef,
        pub feed: PriceFeedHostRef,
        pub asset: RebasingTokenHostRef,
        pub usb: RebasingTokenHostRef,
        pub lev: LeveragedTokenHostRef,
        pub vault: VaultHostRef,
        pub pool_below: PtyPoolHostRef,
        pub pool_above: PtyPoolHostRef,
        pub interest_pool: InterestPoolHostRef,
    }

    /// Full deployment at `price` (0 decimals), interest rate `Y` set to zero
    pub fn setup(price: u64) -> Protocol {
        let env = odra_test::env();
        let admin = env.get_account(0);
        let treasury = env.get_account(9);
        env.set_caller(admin);

        let mut settings = ProtocolSettings::deploy(&env, ProtocolSettingsInitArgs { treasury });
        let feed = PriceFeed::deploy(
            &env,
            PriceFeedInitArgs {
                price: U256::from(price),
                decimals: 0,
            },
        );
        let mut asset = RebasingToken::deploy(
            &env,
            RebasingTokenInitArgs {
                name: String::from("Staked ETH"),
                symbol: String::from("stETH"),
            },
        );
        let mut usb = RebasingToken::deploy(
            &env,
            RebasingTokenInitArgs {
                name: String::from("USB"),
                symbol: String::from("USB"),
            },
        );
        let mut lev = LeveragedToken::deploy(
            &env,
            LeveragedTokenInitArgs {
                name: String::from("ETH Leveraged Token"),
                symbol: String::from("ethx"),
            },
        );
        let mut vault = Vault::deploy(
            &env,
            VaultInitArgs {
                settings: settings.address().clone(),
                price_feed: feed.address().clone(),
                asset_token: asset.address().clone(),
                usb_token: usb.address().clone(),
                leveraged_token: lev.address().clone(),
            },
        );
        let vault_addr = vault.address().clone();

        let pool_below = PtyPool::deploy(
            &env,
            PtyPoolInitArgs {
                vault: vault_addr,
                pool_type: PtyPoolType::BelowAars,
                staking_token: usb.address().clone(),
                target_token: asset.address().clone(),
                staking_yields_token: lev.address().clone(),
                matching_yields_token: asset.address().clone(),
            },
        );
        let pool_above = PtyPool::deploy(
            &env,
            PtyPoolInitArgs {
                vault: vault_addr,
                pool_type: PtyPoolType::AboveAaru,
                staking_token: asset.address().clone(),
                target_token: usb.address().clone(),
                staking_yields_token: asset.address().clone(),
                matching_yields_token: lev.address().clone(),
            },
        );
        let mut interest_pool = InterestPool::deploy(
            &env,
            InterestPoolInitArgs {
                stake_token: usb.address().clone(),
            },
        );

        usb.add_minter(vault_addr);
        lev.set_vault(vault_addr);
        vault.set_pty_pools(pool_below.address().clone(), pool_above.address().clone());
        vault.set_interest_pool(interest_pool.address().clone());
        interest_pool.add_rewarder(vault_addr);
        settings.update_vault_param_value(vault_addr, String::from(PARAM_Y), U256::zero());

        // Admin funds users with reserve asset
        asset.add_minter(admin);
        for i in 1..=3 {
            asset.mint(env.get_account(i), units(10));
        }

        Protocol {
            env,
            admin,
            treasury,
            settings,
            feed,
            asset,
            usb,
            lev,
            vault,
            pool_below,
            pool_above,
            interest_pool,
        }
    }

    impl Protocol {
        pub fn user(&self, i: usize) -> Address {
            self.env.get_account(i)
        }

        pub fn set_price(&mut self, price: u64) {
            self.env.set_caller(self.admin);
            self.feed.set_price(U256::from(price), 0);
        }

        /// `user` approves and mints pairs with `asset_amount`
        pub fn mint_pairs(&mut self, user: Address, asset_amount: U256) {
            self.env.set_caller(user);
            self.asset.approve(self.vault.address().clone(), asset_amount);
            self.vault.mint_pairs(asset_amount);
        }

        pub fn set_param(&mut self, key: &str, value: U256) {
            self.env.set_caller(self.admin);
            let vault = self.vault.address().clone();
            self.settings.update_vault_param_value(vault, String::from(key), value);
        }
    }
}

#[cfg(test)]
mod mint_redeem_tests {
    use super::fixture::*;
    use odra::casper_types::U256;
    use odra::host::HostRef;
    use odra::prelude::Addressable;
    use pretty_assertions::assert_eq;
    use usb_protocol_contracts::errors::ProtocolError;
    use usb_protocol_contracts::types::VaultPhase;

    #[test]
    fn test_first_pair_mint_amounts() {
        let mut p = setup(2000);
        let alice = p.user(1);
        assert_eq!(p.vault.get_vault_phase(), VaultPhase::Empty);

        p.mint_pairs(alice, units(2));

        assert_eq!(p.usb.balance_of(alice), U256::from(2_666_666_666_666_666_666_666u128));
        assert_eq!(p.lev.balance_of(alice), U256::from(666_666_666_666_666_666u128));
        assert_eq!(p.vault.asset_total_amount(), units(2));
        assert_eq!(p.vault.usb_total_supply(), p.usb.total_supply());
        assert_eq!(p.vault.get_vault_phase(), VaultPhase::Stability);
        assert_close(p.vault.aar(), milli(1500), U256::from(1_000u64));
        assert!(p.env.emitted(&p.vault, "UsbMinted"));
        assert!(p.env.emitted(&p.vault, "LeveragedTokenMinted"));
    }

    #[test]
    fn test_quote_matches_mint() {
        let mut p = setup(2000);
        let alice = p.user(1);
        let bob = p.user(2);
        p.mint_pairs(alice, units(2));

        let (usb_quote, lev_quote) = p.vault.calc_mint_pairs(units(1));
        p.mint_pairs(bob, units(1));
        assert_eq!(p.usb.balance_of(bob), usb_quote);
        assert_eq!(p.lev.balance_of(bob), lev_quote);
    }

    #[test]
    fn test_zero_mint_rejected() {
        let mut p = setup(2000);
        let alice = p.user(1);
        p.env.set_caller(alice);
        assert_eq!(
            p.vault.try_mint_pairs(U256::zero()),
            Err(ProtocolError::ZeroAmount.into())
        );
    }

    #[test]
    fn test_pair_round_trip_returns_reserve() {
        let mut p = setup(2000);
        let alice = p.user(1);
        p.mint_pairs(alice, units(2));

        let usb_amount = p.usb.balance_of(alice);
        p.env.set_caller(alice);
        p.vault.redeem_by_pairs_with_usb_amount(usb_amount);

        let returned = p.asset.balance_of(alice) - units(8);
        assert!(returned * 10_000 >= units(2) * 9_999);
        assert_eq!(p.lev.balance_of(alice), U256::zero());
        assert_eq!(p.vault.usb_total_supply(), U256::zero());
        assert_eq!(p.vault.get_vault_phase(), VaultPhase::Empty);
        assert!(p.env.emitted(&p.vault, "AssetRedeemedWithPairs"));
    }

    #[test]
    fn test_pair_redemption_by_leveraged_amount() {
        let mut p = setup(2000);
        let alice = p.user(1);
        p.mint_pairs(alice, units(2));

        let lev_amount = p.lev.balance_of(alice) / 2;
        p.env.set_caller(alice);
        p.vault.redeem_by_pairs_with_leveraged_token_amount(lev_amount);

        let returned = p.asset.balance_of(alice) - units(8);
        assert_close(returned, units(1), U256::from(10u64));
        assert_close(
            p.vault.usb_total_supply(),
            U256::from(1_333_333_333_333_333_333_333u128),
            U256::from(10u64),
        );
    }

    #[test]
    fn test_redeem_by_usb_pays_fee_to_treasury() {
        let mut p = setup(2000);
        let alice = p.user(1);
        p.mint_pairs(alice, units(2));

        p.env.set_caller(alice);
        p.vault.redeem_by_usb(units(1000));

        assert_eq!(p.asset.balance_of(alice), units(8) + U256::from(497_500_000_000_000_000u128));
        assert_eq!(p.asset.balance_of(p.treasury), U256::from(2_500_000_000_000_000u128));
        assert_eq!(p.vault.asset_total_amount(), milli(1500));
        assert!(p.env.emitted(&p.vault, "RedemptionFeeCollected"));

        assert_eq!(
            p.vault.try_redeem_by_usb(units(5000)),
            Err(ProtocolError::TooLargeUsbAmount.into())
        );
    }

    #[test]
    fn test_redeem_by_leveraged_token_at_nav() {
        let mut p = setup(2000);
        let alice = p.user(1);
        p.mint_pairs(alice, units(2));

        p.env.set_caller(alice);
        p.vault.redeem_by_leveraged_token(U256::from(66_666_666_666_666_666u128));
        assert_eq!(
            p.asset.balance_of(alice),
            units(8) + U256::from(66_333_333_333_333_333u128)
        );
        assert_eq!(p.asset.balance_of(p.treasury), U256::from(333_333_333_333_333u128));

        // Redeeming everything would drop AAR below AARS
        let rest = p.lev.balance_of(alice);
        assert_eq!(
            p.vault.try_redeem_by_leveraged_token(rest),
            Err(ProtocolError::AarBelowSafeThreshold.into())
        );
    }

    #[test]
    fn test_usb_only_mint_needs_above_aaru() {
        let mut p = setup(2000);
        let alice = p.user(1);
        p.mint_pairs(alice, units(2));

        p.env.set_caller(alice);
        p.asset.approve(p.vault.address().clone(), units(1));
        assert_eq!(
            p.vault.try_mint_usb_above_aaru(milli(100)),
            Err(ProtocolError::VaultNotAtAdjustmentAboveAaruPhase.into())
        );

        p.set_price(3000);
        p.env.set_caller(alice);
        let before = p.usb.balance_of(alice);
        p.vault.mint_usb_above_aaru(milli(100));
        assert_eq!(p.usb.balance_of(alice) - before, units(300));
    }

    #[test]
    fn test_pair_mint_rejected_below_safe_line() {
        let mut p = setup(2000);
        let alice = p.user(1);
        p.mint_pairs(alice, units(2));
        p.set_price(1600);

        p.env.set_caller(alice);
        p.asset.approve(p.vault.address().clone(), units(1));
        assert_eq!(
            p.vault.try_mint_pairs(units(1)),
            Err(ProtocolError::AarBelowSafeThreshold.into())
        );
    }
}

#[cfg(test)]
mod phase_tests {
    use super::fixture::*;
    use odra::casper_types::U256;
    use odra::host::HostRef;
    use odra::prelude::Addressable;
    use pretty_assertions::assert_eq;
    use usb_protocol_contracts::errors::ProtocolError;
    use usb_protocol_contracts::types::VaultPhase;

    fn phase_at(p: &mut Protocol, price: u64) -> VaultPhase {
        p.set_price(price);
        p.vault.check_aar();
        p.vault.get_vault_phase()
    }

    #[test]
    fn test_phase_follows_price() {
        let mut p = setup(2000);
        let alice = p.user(1);
        p.mint_pairs(alice, units(2));

        assert_eq!(phase_at(&mut p, 1600), VaultPhase::AdjustmentBelowAars);
        assert_eq!(phase_at(&mut p, 1400), VaultPhase::AdjustmentBelowAars);
        assert_eq!(phase_at(&mut p, 3000), VaultPhase::AdjustmentAboveAaru);
        assert_eq!(phase_at(&mut p, 2000), VaultPhase::Stability);
        assert!(p.env.emitted(&p.vault, "VaultPhaseUpdated"));
    }

    #[test]
    fn test_safe_line_timer() {
        let mut p = setup(2000);
        let alice = p.user(1);
        p.mint_pairs(alice, units(2));
        assert_eq!(p.vault.aar_below_safe_line_time(), None);

        phase_at(&mut p, 1600);
        assert!(p.vault.aar_below_safe_line_time().is_some());

        // Two hours below the safe line add 0.2% to r = 0.1 * (1.5 - 1.2)
        p.env.advance_block_time(2 * 3_600_000);
        assert_close(p.vault.discount_rate(), milli(32), U256::from(1_000u64));

        phase_at(&mut p, 2000);
        assert_eq!(p.vault.aar_below_safe_line_time(), None);
    }

    #[test]
    fn test_discount_swap() {
        let mut p = setup(2000);
        let alice = p.user(1);
        p.mint_pairs(alice, units(2));
        phase_at(&mut p, 1600);

        let quote = p.vault.calc_usb_to_leveraged_tokens(units(1));
        assert_eq!(quote, U256::from(1_287_499_999_999_998u128));

        p.env.set_caller(alice);
        let lev_before = p.lev.balance_of(alice);
        let usb_before = p.vault.usb_total_supply();
        p.vault.usb_to_leveraged_tokens(units(1));
        assert_eq!(p.lev.balance_of(alice) - lev_before, quote);
        assert_eq!(usb_before - p.vault.usb_total_supply(), units(1));
        assert!(p.env.emitted(&p.vault, "UsbToLeveragedTokens"));
    }

    #[test]
    fn test_discount_swap_requires_below_aars() {
        let mut p = setup(2000);
        let alice = p.user(1);
        p.mint_pairs(alice, units(2));

        p.env.set_caller(alice);
        assert_eq!(
            p.vault.try_usb_to_leveraged_tokens(units(1)),
            Err(ProtocolError::VaultNotAtAdjustmentBelowAarsPhase.into())
        );
    }

    #[test]
    fn test_swaps_rejected_at_or_below_100_percent() {
        let mut p = setup(2000);
        let alice = p.user(1);
        p.mint_pairs(alice, units(2));
        phase_at(&mut p, 1000);

        p.env.set_caller(alice);
        assert_eq!(
            p.vault.try_usb_to_leveraged_tokens(units(1)),
            Err(ProtocolError::AarBelow100Percent.into())
        );
        p.asset.approve(p.vault.address().clone(), units(1));
        assert_eq!(
            p.vault.try_mint_leveraged_token_below_aars(units(1)),
            Err(ProtocolError::AarBelow100Percent.into())
        );
        let lev = p.lev.balance_of(alice);
        assert_eq!(
            p.vault.try_redeem_by_leveraged_token(lev / 10),
            Err(ProtocolError::AarBelow100Percent.into())
        );

        // USB redemption stays open, pro-rata on the reserve
        p.vault.redeem_by_usb(units(100));
        assert_close(
            p.asset.balance_of(alice) - units(8),
            U256::from(74_625_000_000_000_000u128),
            U256::from(10u64),
        );
    }
}

#[cfg(test)]
mod circuit_breaker_tests {
    use super::fixture::*;
    use odra::casper_types::U256;
    use odra::host::HostRef;
    use odra::prelude::Addressable;
    use pretty_assertions::assert_eq;
    use usb_protocol_contracts::errors::ProtocolError;

    const HOUR_MS: u64 = 3_600_000;

    #[test]
    fn test_cooldown_blocks_then_releases() {
        let mut p = setup(2000);
        let alice = p.user(1);
        p.mint_pairs(alice, units(2));

        // AAR 1.05 < AARC
        p.set_price(1400);
        p.vault.check_aar();
        let tripped_at = p.vault.aar_below_circuit_breaker_line_time();
        assert!(tripped_at.is_some());

        p.env.set_caller(alice);
        p.asset.approve(p.vault.address().clone(), units(2));
        assert_eq!(
            p.vault.try_mint_leveraged_token_below_aars(units(1)),
            Err(ProtocolError::AarBelowCircuitBreakerLineThreshold.into())
        );
        assert_eq!(
            p.vault.try_usb_to_leveraged_tokens(units(1)),
            Err(ProtocolError::AarBelowCircuitBreakerLineThreshold.into())
        );

        // AAR 1.17: above AARC, still within the cooldown
        p.set_price(1560);
        p.env.advance_block_time(HOUR_MS - 1_000);
        p.env.set_caller(alice);
        assert_eq!(
            p.vault.try_mint_leveraged_token_below_aars(units(1)),
            Err(ProtocolError::AarBelowCircuitBreakerLineThreshold.into())
        );
        assert_eq!(
            p.vault.try_usb_to_leveraged_tokens(units(1)),
            Err(ProtocolError::ConditionalDiscountPurchaseSuspended.into())
        );
        assert_eq!(p.vault.aar_below_circuit_breaker_line_time(), tripped_at);

        p.env.advance_block_time(1_000);
        p.env.set_caller(alice);
        let before = p.lev.balance_of(alice);
        p.vault.mint_leveraged_token_below_aars(units(1));
        assert_eq!(
            p.lev.balance_of(alice) - before,
            U256::from(2_294_117_647_058_823_527u128)
        );
        assert_eq!(p.vault.aar_below_circuit_breaker_line_time(), None);
    }

    #[test]
    fn test_pair_mint_not_guarded_by_cooldown() {
        let mut p = setup(2000);
        let alice = p.user(1);
        p.mint_pairs(alice, units(2));
        p.set_price(1400);
        p.vault.check_aar();

        // Recovery into Stability while the cooldown runs
        p.set_price(2000);
        let bob = p.user(2);
        p.mint_pairs(bob, units(1));
        assert!(p.usb.balance_of(bob) > U256::zero());
        assert!(p.vault.aar_below_circuit_breaker_line_time().is_some());
    }

    #[test]
    fn test_cooldown_starts_at_first_block() {
        let mut p = setup(2000);
        let alice = p.user(1);
        p.mint_pairs(alice, units(2));
        p.set_price(1400);
        p.vault.check_aar();
        assert_eq!(
            p.vault.aar_below_circuit_breaker_line_time(),
            Some(p.env.block_time() / 1000)
        );

        p.set_price(1560);
        p.env.set_caller(alice);
        p.asset.approve(p.vault.address().clone(), units(1));
        assert_eq!(
            p.vault.try_mint_leveraged_token_below_aars(units(1)),
            Err(ProtocolError::AarBelowCircuitBreakerLineThreshold.into())
        );
    }
}

#[cfg(test)]
mod pty_pool_matching_tests {
    use super::fixture::*;
    use odra::casper_types::U256;
    use odra::host::{Deployer, HostRef};
    use odra::prelude::Addressable;
    use pretty_assertions::assert_eq;
    use usb_protocol_contracts::errors::ProtocolError;
    use usb_protocol_contracts::types::VaultPhase;
    use usb_protocol_contracts::vault::{Vault, VaultInitArgs};

    #[test]
    fn test_below_aars_match_capped_by_pool() {
        let mut p = setup(2000);
        let alice = p.user(1);
        let bob = p.user(2);
        p.mint_pairs(alice, units(2));

        p.env.set_caller(alice);
        p.usb.transfer(bob, units(100));
        p.env.set_caller(bob);
        p.usb.approve(p.pool_below.address().clone(), units(100));
        p.pool_below.stake(units(100));

        let usb_supply = p.vault.usb_total_supply();
        p.set_price(1600);
        p.vault.check_aar();

        assert_eq!(
            p.pool_below.earned_matched_tokens(bob),
            U256::from(62_500_000_000_000_000u128)
        );
        assert_eq!(p.vault.usb_total_supply(), usb_supply - units(100));
        assert_eq!(p.usb.total_supply(), usb_supply - units(100));
        assert_eq!(p.vault.asset_total_amount(), units(2) - U256::from(62_500_000_000_000_000u128));
        assert_eq!(p.pool_below.total_staking_balance(), U256::zero());
        assert_eq!(p.pool_below.get_epoch(), 1);
        assert!(p.env.emitted(&p.vault, "PtyPoolMatched"));

        p.env.set_caller(bob);
        p.pool_below.claim_matching_tokens_and_yields();
        assert_eq!(p.asset.balance_of(bob), units(10) + U256::from(62_500_000_000_000_000u128));
    }

    #[test]
    fn test_above_aaru_match_mints_usb_into_pool() {
        let mut p = setup(2000);
        let alice = p.user(1);
        let carol = p.user(3);
        p.mint_pairs(alice, units(2));

        p.env.set_caller(carol);
        p.asset.approve(p.pool_above.address().clone(), units(1));
        p.pool_above.stake(units(1));

        let usb_supply = p.vault.usb_total_supply();
        p.set_price(3000);
        p.vault.check_aar();

        let minted = U256::from(666_666_666_666_666_666_668u128);
        assert_eq!(p.vault.usb_total_supply(), usb_supply + minted);
        assert_eq!(p.pool_above.earned_matched_tokens(carol), minted);
        assert_eq!(
            p.vault.asset_total_amount(),
            units(2) + U256::from(222_222_222_222_222_222u128)
        );
        assert_close(p.vault.aar(), units(2), U256::from(1_000_000u64));
        assert_ne!(p.vault.get_vault_phase(), VaultPhase::AdjustmentBelowAars);

        p.env.set_caller(carol);
        p.pool_above.claim_matching_tokens_and_yields();
        assert_eq!(p.usb.balance_of(carol), minted);
    }

    #[test]
    fn test_reserve_yields_routed_to_pools() {
        let mut p = setup(2000);
        let alice = p.user(1);
        p.mint_pairs(alice, units(2));

        // +10% on 30 stETH outstanding, the vault holds 2
        p.env.set_caller(p.admin);
        p.asset.rebase(units(3));
        p.vault.check_aar();

        assert_eq!(p.pool_below.pending_matching_yields(), milli(100));
        assert_eq!(p.vault.asset_total_amount(), units(2));
        assert!(p.env.emitted(&p.vault, "YieldsSettlement"));
    }

    #[test]
    fn test_pools_link_once_and_admin_only() {
        let mut p = setup(2000);
        let below = p.pool_below.address().clone();
        let above = p.pool_above.address().clone();

        p.env.set_caller(p.user(1));
        assert_eq!(
            p.vault.try_set_pty_pools(below, above),
            Err(ProtocolError::Unauthorized.into())
        );
        p.env.set_caller(p.admin);
        assert_eq!(
            p.vault.try_set_pty_pools(below, above),
            Err(ProtocolError::AlreadySet.into())
        );
        assert_eq!(p.vault.get_pty_pools(), Some((below, above)));
    }

    #[test]
    fn test_pools_of_another_vault_rejected() {
        let mut p = setup(2000);
        p.env.set_caller(p.admin);
        let mut other = Vault::deploy(
            &p.env,
            VaultInitArgs {
                settings: p.settings.address().clone(),
                price_feed: p.feed.address().clone(),
                asset_token: p.asset.address().clone(),
                usb_token: p.usb.address().clone(),
                leveraged_token: p.lev.address().clone(),
            },
        );
        assert_eq!(
            other.try_set_pty_pools(p.pool_below.address().clone(), p.pool_above.address().clone()),
            Err(ProtocolError::UnauthorizedVault.into())
        );
        assert_eq!(other.get_pty_pools(), None);
    }

    #[test]
    fn test_only_vault_records_matches() {
        let mut p = setup(2000);
        p.env.set_caller(p.user(1));
        assert_eq!(
            p.pool_below.try_add_matched_tokens(units(1), units(1)),
            Err(ProtocolError::UnauthorizedVault.into())
        );
    }
}

#[cfg(test)]
mod interest_tests {
    use super::fixture::*;
    use odra::casper_types::U256;
    use odra::host::HostRef;
    use odra::prelude::Addressable;
    use pretty_assertions::assert_eq;
    use usb_protocol_contracts::types::{PARAM_PTY_POOL_INTEREST_SHARE, PARAM_Y};

    const YEAR_MS: u64 = 365 * DAY_MS;

    #[test]
    fn test_interest_paid_to_usb_stakers() {
        let mut p = setup(2000);
        p.set_param(PARAM_Y, milli(35));
        let alice = p.user(1);
        p.mint_pairs(alice, units(2));

        p.env.set_caller(alice);
        p.usb.approve(p.interest_pool.address().clone(), units(1000));
        p.interest_pool.stake(units(1000));

        let lev_supply = p.lev.total_supply();
        p.env.advance_block_time(YEAR_MS);
        p.vault.settle_interest();

        let interest = U256::from(23_333_333_333_333_333u128);
        assert_eq!(p.lev.total_supply(), lev_supply + interest);
        assert_eq!(p.vault.undistributed_interest(), U256::zero());
        let lev_addr = p.lev.address().clone();
        assert_eq!(
            p.interest_pool.staking_rewards_earned(lev_addr, alice),
            U256::from(23_333_333_333_333_000u128)
        );
        assert!(p.env.emitted(&p.vault, "InterestSettlement"));

        p.env.set_caller(alice);
        let before = p.lev.balance_of(alice);
        p.interest_pool.get_all_staking_rewards();
        assert_eq!(
            p.lev.balance_of(alice) - before,
            U256::from(23_333_333_333_333_000u128)
        );
    }

    #[test]
    fn test_interest_held_without_stakers() {
        let mut p = setup(2000);
        p.set_param(PARAM_Y, milli(35));
        let alice = p.user(1);
        p.mint_pairs(alice, units(2));

        let lev_supply = p.lev.total_supply();
        p.env.advance_block_time(YEAR_MS);
        p.vault.settle_interest();

        assert_eq!(p.vault.undistributed_interest(), U256::from(23_333_333_333_333_333u128));
        assert_eq!(p.lev.total_supply(), lev_supply);
    }

    #[test]
    fn test_interest_share_feeds_pty_pools() {
        let mut p = setup(2000);
        p.set_param(PARAM_Y, milli(35));
        p.set_param(PARAM_PTY_POOL_INTEREST_SHARE, units(1));
        let alice = p.user(1);
        p.mint_pairs(alice, units(2));

        p.env.advance_block_time(YEAR_MS);
        p.vault.settle_interest();

        // Half to BelowAARS staking yields (pending, no stakers), half to
        // AboveAARU matching yields
        let interest = U256::from(23_333_333_333_333_333u128);
        let to_below = interest / 2;
        assert_eq!(p.pool_above.pending_matching_yields(), interest - to_below);
        assert_eq!(p.lev.balance_of(p.pool_below.address().clone()), to_below);
        assert_eq!(p.vault.undistributed_interest(), U256::zero());
    }

    #[test]
    fn test_no_interest_when_rate_is_zero() {
        let mut p = setup(2000);
        let alice = p.user(1);
        p.mint_pairs(alice, units(2));
        let lev_supply = p.lev.total_supply();

        p.env.advance_block_time(YEAR_MS);
        p.vault.settle_interest();
        assert_eq!(p.lev.total_supply(), lev_supply);
        assert_eq!(p.vault.undistributed_interest(), U256::zero());
    }
}
