//! Common types used across the USB protocol.

use odra::prelude::*;
use odra::casper_types::U256;

/// Fixed-point precision for amounts, prices, ratios and rates (1e18)
pub const PRECISION: u128 = 1_000_000_000_000_000_000;

/// Seconds in a year (365 days)
pub const SECONDS_PER_YEAR: u64 = 31_536_000;

/// Seconds in an hour
pub const SECONDS_PER_HOUR: u64 = 3_600;

// Parameter keys understood by the settings contract.
pub const PARAM_Y: &str = "Y";
pub const PARAM_AARU: &str = "AARU";
pub const PARAM_AART: &str = "AART";
pub const PARAM_AARS: &str = "AARS";
pub const PARAM_AARC: &str = "AARC";
pub const PARAM_C1: &str = "C1";
pub const PARAM_C2: &str = "C2";
pub const PARAM_BASIS_R: &str = "BasisR";
pub const PARAM_RATE_R: &str = "RateR";
pub const PARAM_CIRCUIT_BREAK_PERIOD: &str = "CircuitBreakPeriod";
pub const PARAM_PTY_POOL_INTEREST_SHARE: &str = "PtyPoolInterestShare";
pub const PARAM_PTY_POOL_YIELDS_SPLIT: &str = "PtyPoolYieldsSplit";

/// Every key the settings contract accepts, in storage order
pub const PARAM_KEYS: [&str; 12] = [
    PARAM_Y,
    PARAM_AARU,
    PARAM_AART,
    PARAM_AARS,
    PARAM_AARC,
    PARAM_C1,
    PARAM_C2,
    PARAM_BASIS_R,
    PARAM_RATE_R,
    PARAM_CIRCUIT_BREAK_PERIOD,
    PARAM_PTY_POOL_INTEREST_SHARE,
    PARAM_PTY_POOL_YIELDS_SPLIT,
];

/// 1e18 as U256
pub fn one() -> U256 {
    U256::from(PRECISION)
}

/// `numerator / 10^exp` expressed in 1e18 precision
pub fn ratio(numerator: u64, exp: u32) -> U256 {
    U256::from(numerator) * one() / U256::from(10u64).pow(U256::from(exp))
}

/// Vault phase, derived from AAR against the configured thresholds
#[odra::odra_type]
#[derive(Copy, Default)]
pub enum VaultPhase {
    /// No USB liability outstanding
    #[default]
    Empty,
    /// AARS < AAR < AARU
    Stability,
    /// AAR <= AARS
    AdjustmentBelowAars,
    /// AAR >= AARU
    AdjustmentAboveAaru,
}

/// Which side of an imbalance a PtyPool absorbs
#[odra::odra_type]
#[derive(Copy)]
pub enum PtyPoolType {
    /// Stakes USB, receives reserve asset when AAR falls below AARS
    BelowAars,
    /// Stakes reserve asset, receives USB when AAR rises above AARU
    AboveAaru,
}

/// Snapshot of every per-vault parameter, all 1e18-scaled except
/// `circuit_break_period` (seconds)
#[odra::odra_type]
pub struct VaultParams {
    /// Annual interest rate paid to USB stakers
    pub y: U256,
    /// Upper AAR threshold
    pub aaru: U256,
    /// Target AAR
    pub aart: U256,
    /// Safe AAR threshold
    pub aars: U256,
    /// Circuit breaker AAR threshold
    pub aarc: U256,
    /// Fee on USB redemption
    pub c1: U256,
    /// Fee on leveraged token redemption
    pub c2: U256,
    /// Discount rate per unit of AAR below target
    pub basis_r: U256,
    /// Discount rate per hour below the safe line
    pub rate_r: U256,
    /// Circuit breaker cooldown in seconds
    pub circuit_break_period: U256,
    /// Fraction of settled interest routed to the PtyPools
    pub pty_pool_interest_share: U256,
    /// Fraction of routed yields sent to the BelowAARS pool
    pub pty_pool_yields_split: U256,
}

impl Default for VaultParams {
    fn default() -> Self {
        Self {
            y: ratio(35, 3),
            aaru: ratio(200, 2),
            aart: ratio(150, 2),
            aars: ratio(130, 2),
            aarc: ratio(110, 2),
            c1: ratio(5, 3),
            c2: ratio(5, 3),
            basis_r: ratio(1, 1),
            rate_r: ratio(1, 3),
            circuit_break_period: U256::from(SECONDS_PER_HOUR),
            pty_pool_interest_share: U256::zero(),
            pty_pool_yields_split: ratio(5, 1),
        }
    }
}

impl VaultParams {
    /// Value of a named parameter
    pub fn get(&self, key: &str) -> Option<U256> {
        let value = match key {
            PARAM_Y => self.y,
            PARAM_AARU => self.aaru,
            PARAM_AART => self.aart,
            PARAM_AARS => self.aars,
            PARAM_AARC => self.aarc,
            PARAM_C1 => self.c1,
            PARAM_C2 => self.c2,
            PARAM_BASIS_R => self.basis_r,
            PARAM_RATE_R => self.rate_r,
            PARAM_CIRCUIT_BREAK_PERIOD => self.circuit_break_period,
            PARAM_PTY_POOL_INTEREST_SHARE => self.pty_pool_interest_share,
            PARAM_PTY_POOL_YIELDS_SPLIT => self.pty_pool_yields_split,
            _ => return None,
        };
        Some(value)
    }

    /// Set a named parameter, returning false for unknown keys
    pub fn set(&mut self, key: &str, value: U256) -> bool {
        let slot = match key {
            PARAM_Y => &mut self.y,
            PARAM_AARU => &mut self.aaru,
            PARAM_AART => &mut self.aart,
            PARAM_AARS => &mut self.aars,
            PARAM_AARC => &mut self.aarc,
            PARAM_C1 => &mut self.c1,
            PARAM_C2 => &mut self.c2,
            PARAM_BASIS_R => &mut self.basis_r,
            PARAM_RATE_R => &mut self.rate_r,
            PARAM_CIRCUIT_BREAK_PERIOD => &mut self.circuit_break_period,
            PARAM_PTY_POOL_INTEREST_SHARE => &mut self.pty_pool_interest_share,
            PARAM_PTY_POOL_YIELDS_SPLIT => &mut self.pty_pool_yields_split,
            _ => return false,
        };
        *slot = value;
        true
    }

    /// AARC < AARS < AART < AARU and AARC > 100%
    pub fn thresholds_ordered(&self) -> bool {
        self.aarc > one() && self.aarc < self.aars && self.aars < self.aart && self.aart < self.aaru
    }
}

/// Vault state snapshot taken at call entry
#[odra::odra_type]
#[derive(Default, Copy)]
pub struct VaultState {
    /// Reserve asset held by the vault
    pub m_asset: U256,
    /// Reserve price, normalized to 1e18
    pub price: U256,
    /// USB liability of the vault
    pub m_usb: U256,
    /// Leveraged token supply
    pub m_lev: U256,
    /// Adequacy asset ratio (U256::MAX when no USB is outstanding)
    pub aar: U256,
}

/// Pending rewards of a PtyPool staker
#[odra::odra_type]
#[derive(Default)]
pub struct PtyPoolEarnings {
    /// Staking yields claimable
    pub staking_yields: U256,
    /// Matched target tokens claimable
    pub matched_tokens: U256,
    /// Matching yields claimable
    pub matching_yields: U256,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_params_are_ordered() {
        let params = VaultParams::default();
        assert!(params.thresholds_ordered());
        assert_eq!(params.aart, U256::from(1_500_000_000_000_000_000u128));
        assert_eq!(params.c1, U256::from(5_000_000_000_000_000u128));
        assert_eq!(params.rate_r, U256::from(1_000_000_000_000_000u128));
    }

    #[test]
    fn test_param_lookup_by_key() {
        let mut params = VaultParams::default();
        for key in PARAM_KEYS {
            assert!(params.get(key).is_some());
        }
        assert!(params.get("Unknown").is_none());
        assert!(params.set(PARAM_Y, U256::zero()));
        assert_eq!(params.y, U256::zero());
        assert!(!params.set("Unknown", U256::one()));
    }

    #[test]
    fn test_misordered_thresholds_rejected() {
        let mut params = VaultParams::default();
        params.aars = params.aart;
        assert!(!params.thresholds_ordered());
    }
}
