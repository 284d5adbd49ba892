//! Interest accrual on the leveraged token supply.
//!
//! Leveraged token holders pay the annual rate `Y` to USB stakers:
//! - Simple interest on the current supply, no compounding between settlements
//! - Accrued in leveraged token units and minted on settlement

use odra::casper_types::U256;
use crate::types::{PRECISION, SECONDS_PER_YEAR};

/// New interest accrued since the last settlement
///
/// `I = M_lev * Y * Δt / 365 days`, with `Y` 1e18-scaled.
///
/// # Arguments
/// * `lev_supply` - Current leveraged token supply
/// * `rate` - Annual rate (1e18 = 100%)
/// * `last_settlement` - Last settlement time in seconds
/// * `now` - Current time in seconds
pub fn calculate_interest(lev_supply: U256, rate: U256, last_settlement: u64, now: u64) -> U256 {
    if now <= last_settlement || lev_supply.is_zero() || rate.is_zero() {
        return U256::zero();
    }

    let elapsed = now - last_settlement;
    lev_supply
        .checked_mul(rate)
        .and_then(|v| v.checked_mul(U256::from(elapsed)))
        .and_then(|v| v.checked_div(U256::from(PRECISION)))
        .and_then(|v| v.checked_div(U256::from(SECONDS_PER_YEAR)))
        .unwrap_or(U256::zero())
}

/// Split `amount` by a 1e18-scaled fraction, returning `(part, rest)`
pub fn split_by_fraction(amount: U256, fraction: U256) -> (U256, U256) {
    let part = amount * fraction / U256::from(PRECISION);
    let part = part.min(amount);
    (part, amount - part)
}
