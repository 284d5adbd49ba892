//! USB Protocol Contracts
//!
//! Casper-native stablecoin and leveraged-token vault protocol.
//!
//! ## Architecture
//!
//! - **Vault**: Holds one reserve asset, mints/redeems USB and leveraged tokens
//! - **RebasingToken (USB)**: Share-based stablecoin, minted by vaults
//! - **LeveragedToken**: Per-vault leveraged token, minted by its vault
//! - **ProtocolSettings**: Parameter defaults, per-vault overrides, treasury
//! - **PriceFeed**: Reserve asset price source
//! - **PtyPool**: Pre-staked liquidity matched when AAR leaves [AARS, AARU]
//! - **InterestPool**: USB stakers earn vault interest
//!
//! ## Circuit Breaker
//!
//! When AAR falls below AARC the vault blocks leveraged-only mints and
//! discount purchases for `CircuitBreakPeriod` seconds.

#![cfg_attr(target_arch = "wasm32", no_std)]

#[cfg(target_arch = "wasm32")]
extern crate alloc;

// Re-export odra for downstream usage
pub use odra;

// Core module declarations
pub mod types;
pub mod errors;
pub mod interfaces;
pub mod interest;
pub mod share_ledger;
pub mod vault_calculator;

// Contract modules
pub mod settings;
pub mod price_feed;
pub mod rebasing_token;
pub mod leveraged_token;
pub mod vault;
pub mod pty_pool;
pub mod interest_pool;
