//! Deploy the USB protocol to Casper livenet/testnet using Odra livenet environment.
//!
//! Usage:
//!   cargo run --bin deploy_livenet --release
//!
//! Requires .env file with:
//!   ODRA_CASPER_LIVENET_SECRET_KEY_PATH=/path/to/secret_key.pem
//!   ODRA_CASPER_LIVENET_NODE_ADDRESS=https://node.testnet.casper.network
//!   ODRA_CASPER_LIVENET_CHAIN_NAME=casper-test
//!   ODRA_CASPER_LIVENET_PAYMENT_AMOUNT=200000000000
//!
//! Optional:
//!   USB_ASSET_PRICE=2000          reserve asset price, integer
//!   USB_ASSET_PRICE_DECIMALS=0    decimals of USB_ASSET_PRICE

use odra::casper_types::U256;
use odra::host::{Deployer, HostRef};
use odra::prelude::*;

use usb_protocol_contracts::interest_pool::{InterestPool, InterestPoolInitArgs};
use usb_protocol_contracts::leveraged_token::{LeveragedToken, LeveragedTokenInitArgs};
use usb_protocol_contracts::price_feed::{PriceFeed, PriceFeedInitArgs};
use usb_protocol_contracts::pty_pool::{PtyPool, PtyPoolInitArgs};
use usb_protocol_contracts::rebasing_token::{RebasingToken, RebasingTokenInitArgs};
use usb_protocol_contracts::settings::{ProtocolSettings, ProtocolSettingsInitArgs};
use usb_protocol_contracts::types::PtyPoolType;
use usb_protocol_contracts::vault::{Vault, VaultInitArgs};

fn env_var<T: core::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn main() {
    // Load environment from .env file
    dotenv::dotenv().ok();

    println!("=== USB Protocol Livenet Deployment ===");
    println!();

    let env = odra_casper_livenet_env::env();

    // Payment amount for deployments/calls (required for Casper 2.0 txs)
    let payment_amount: u64 = env_var("ODRA_CASPER_LIVENET_PAYMENT_AMOUNT", 200_000_000_000);
    env.set_gas(payment_amount);

    let deployer = env.caller();
    println!("Deployer: {:?}", deployer);
    println!();

    let asset_price = U256::from(env_var::<u64>("USB_ASSET_PRICE", 2000));
    let asset_price_decimals: u8 = env_var("USB_ASSET_PRICE_DECIMALS", 0);

    // ==================== Phase 1: Shared Contracts ====================
    println!("=== Phase 1: Deploying Shared Contracts ===");
    println!();

    println!("Deploying ProtocolSettings...");
    let settings = ProtocolSettings::deploy(&env, ProtocolSettingsInitArgs { treasury: deployer });
    let settings_addr = settings.address().clone();
    println!("ProtocolSettings deployed at: {:?}", settings_addr);

    println!("Deploying USB...");
    let mut usb = RebasingToken::deploy(
        &env,
        RebasingTokenInitArgs {
            name: String::from("USB"),
            symbol: String::from("USB"),
        },
    );
    let usb_addr = usb.address().clone();
    println!("USB deployed at: {:?}", usb_addr);

    println!("Deploying InterestPool...");
    let mut interest_pool = InterestPool::deploy(&env, InterestPoolInitArgs { stake_token: usb_addr });
    let interest_pool_addr = interest_pool.address().clone();
    println!("InterestPool deployed at: {:?}", interest_pool_addr);

    println!();

    // ==================== Phase 2: Vault ====================
    println!("=== Phase 2: Deploying Vault ===");
    println!();

    println!("Deploying reserve asset (stETH)...");
    let asset = RebasingToken::deploy(
        &env,
        RebasingTokenInitArgs {
            name: String::from("Staked ETH"),
            symbol: String::from("stETH"),
        },
    );
    let asset_addr = asset.address().clone();
    println!("Reserve asset deployed at: {:?}", asset_addr);

    println!("Deploying PriceFeed...");
    let price_feed = PriceFeed::deploy(
        &env,
        PriceFeedInitArgs {
            price: asset_price,
            decimals: asset_price_decimals,
        },
    );
    let price_feed_addr = price_feed.address().clone();
    println!("PriceFeed deployed at: {:?}", price_feed_addr);

    println!("Deploying LeveragedToken...");
    let mut lev = LeveragedToken::deploy(
        &env,
        LeveragedTokenInitArgs {
            name: String::from("ETH Leveraged Token"),
            symbol: String::from("ethx"),
        },
    );
    let lev_addr = lev.address().clone();
    println!("LeveragedToken deployed at: {:?}", lev_addr);

    println!("Deploying Vault...");
    let mut vault = Vault::deploy(
        &env,
        VaultInitArgs {
            settings: settings_addr,
            price_feed: price_feed_addr,
            asset_token: asset_addr,
            usb_token: usb_addr,
            leveraged_token: lev_addr,
        },
    );
    let vault_addr = vault.address().clone();
    println!("Vault deployed at: {:?}", vault_addr);

    println!("Deploying PtyPool (below AARS)...");
    let pool_below = PtyPool::deploy(
        &env,
        PtyPoolInitArgs {
            vault: vault_addr,
            pool_type: PtyPoolType::BelowAars,
            staking_token: usb_addr,
            target_token: asset_addr,
            staking_yields_token: lev_addr,
            matching_yields_token: asset_addr,
        },
    );
    let pool_below_addr = pool_below.address().clone();
    println!("PtyPool (below AARS) deployed at: {:?}", pool_below_addr);

    println!("Deploying PtyPool (above AARU)...");
    let pool_above = PtyPool::deploy(
        &env,
        PtyPoolInitArgs {
            vault: vault_addr,
            pool_type: PtyPoolType::AboveAaru,
            staking_token: asset_addr,
            target_token: usb_addr,
            staking_yields_token: asset_addr,
            matching_yields_token: lev_addr,
        },
    );
    let pool_above_addr = pool_above.address().clone();
    println!("PtyPool (above AARU) deployed at: {:?}", pool_above_addr);

    println!();

    // ==================== Phase 3: Cross-contract Configuration ====================
    println!("=== Phase 3: Cross-contract Configuration ===");
    println!();

    println!("Granting Vault USB minter role...");
    usb.add_minter(vault_addr);
    println!("Done.");

    println!("Binding LeveragedToken -> Vault...");
    lev.set_vault(vault_addr);
    println!("Done.");

    println!("Linking Vault -> PtyPools...");
    vault.set_pty_pools(pool_below_addr, pool_above_addr);
    println!("Done.");

    println!("Linking Vault -> InterestPool...");
    vault.set_interest_pool(interest_pool_addr);
    interest_pool.add_rewarder(vault_addr);
    println!("Done.");

    println!();
    println!("=== Deployment Complete ===");
    println!();
    println!("Contract Addresses:");
    println!("  ProtocolSettings:   {:?}", settings_addr);
    println!("  USB:                {:?}", usb_addr);
    println!("  InterestPool:       {:?}", interest_pool_addr);
    println!("  Reserve asset:      {:?}", asset_addr);
    println!("  PriceFeed:          {:?}", price_feed_addr);
    println!("  LeveragedToken:     {:?}", lev_addr);
    println!("  Vault:              {:?}", vault_addr);
    println!("  PtyPool (AARS):     {:?}", pool_below_addr);
    println!("  PtyPool (AARU):     {:?}", pool_above_addr);
}
