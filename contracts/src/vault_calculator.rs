//! Pure pricing formulas for the vault.
//!
//! Every function works on a `VaultState` snapshot taken at call entry and the
//! vault's `VaultParams`, both 1e18 fixed point:
//! - `V = M_asset * P` is the reserve value, `E = V - M_usb` the equity
//! - Leveraged tokens are priced at NAV `E / M_lev`
//! - Phase checks live here; timer checks live in the vault
//!
//! No state is mutated, so a rejected call leaves nothing half-applied.

use odra::casper_types::U256;
use crate::errors::{ProtocolError, ProtocolResult};
use crate::types::{one, VaultParams, VaultPhase, VaultState, SECONDS_PER_HOUR};

/// Premium slope applied while AAR is below target (10%)
fn premium_slope() -> U256 {
    one() / U256::from(10u64)
}

/// Normalize an oracle price with `decimals` to 1e18
pub fn normalize_price(price: U256, decimals: u8) -> ProtocolResult<U256> {
    if price.is_zero() {
        return Err(ProtocolError::InvalidPrice);
    }
    let normalized = if decimals <= 18 {
        let factor = U256::from(10u64).pow(U256::from(18 - decimals));
        price.checked_mul(factor).ok_or(ProtocolError::ArithmeticOverflow)?
    } else {
        price / U256::from(10u64).pow(U256::from(decimals - 18))
    };
    if normalized.is_zero() {
        return Err(ProtocolError::InvalidPrice);
    }
    Ok(normalized)
}

/// `M_asset * P / M_usb`, `U256::MAX` when no USB is outstanding
pub fn calc_aar(m_asset: U256, price: U256, m_usb: U256) -> U256 {
    if m_usb.is_zero() {
        return U256::MAX;
    }
    m_asset * price / m_usb
}

/// Build a snapshot from raw vault figures
pub fn build_state(m_asset: U256, price: U256, m_usb: U256, m_lev: U256) -> VaultState {
    VaultState {
        m_asset,
        price,
        m_usb,
        m_lev,
        aar: calc_aar(m_asset, price, m_usb),
    }
}

/// Phase implied by a snapshot
pub fn vault_phase(state: &VaultState, params: &VaultParams) -> VaultPhase {
    if state.m_usb.is_zero() {
        VaultPhase::Empty
    } else if state.aar >= params.aaru {
        VaultPhase::AdjustmentAboveAaru
    } else if state.aar <= params.aars {
        VaultPhase::AdjustmentBelowAars
    } else {
        VaultPhase::Stability
    }
}

/// Reserve value in USB units
pub fn asset_value(state: &VaultState) -> U256 {
    state.m_asset * state.price / one()
}

/// Leveraged tokens worth `value` USB at current NAV
pub fn lev_for_value(state: &VaultState, value: U256) -> ProtocolResult<U256> {
    let total_value = asset_value(state);
    if state.m_lev.is_zero() || total_value <= state.m_usb {
        if state.price.is_zero() {
            return Err(ProtocolError::InvalidPrice);
        }
        return Ok(value * one() / state.price);
    }
    Ok(value * state.m_lev / (total_value - state.m_usb))
}

/// `R2 = 0.1 * (2 * AART - AAR - AAR') / 2`, with AAR floored at AARS and
/// AAR' capped at AART
pub fn calc_premium(aar: U256, aar_after: U256, params: &VaultParams) -> U256 {
    if aar >= params.aart {
        return U256::zero();
    }
    let from = aar.max(params.aars);
    let to = aar_after.min(params.aart).max(from);
    let gap = params.aart * 2 - from - to;
    premium_slope() * gap / one() / 2
}

/// `r = BasisR * max(0, AART - AAR) + RateR * hours below the safe line`
pub fn calc_discount_rate(aar: U256, params: &VaultParams, seconds_below_safe_line: u64) -> U256 {
    let depth = if params.aart > aar {
        params.basis_r * (params.aart - aar) / one()
    } else {
        U256::zero()
    };
    let duration =
        params.rate_r * U256::from(seconds_below_safe_line) / U256::from(SECONDS_PER_HOUR);
    depth + duration
}

/// Pair mint quote: `(usb_out, lev_out)` for `asset_amount` deposited
pub fn calc_mint_pairs(
    state: &VaultState,
    params: &VaultParams,
    asset_amount: U256,
) -> ProtocolResult<(U256, U256)> {
    if asset_amount.is_zero() {
        return Err(ProtocolError::ZeroAmount);
    }
    if vault_phase(state, params) == VaultPhase::AdjustmentBelowAars {
        return Err(ProtocolError::AarBelowSafeThreshold);
    }

    let deposit_value = asset_amount * state.price / one();
    let usb_out = asset_amount * state.price / params.aart;

    if state.m_lev.is_zero() {
        let lev_out = asset_amount * (params.aart - one()) / params.aart;
        return Ok((usb_out, lev_out));
    }

    let mut lev_out = lev_for_value(state, deposit_value - usb_out)?;
    if !state.m_usb.is_zero() && state.aar < params.aart {
        let aar_after = calc_aar(
            state.m_asset + asset_amount,
            state.price,
            state.m_usb + usb_out,
        );
        let premium = calc_premium(state.aar, aar_after, params);
        lev_out = lev_out * (one() + premium) / one();
    }
    Ok((usb_out, lev_out))
}

/// USB-only mint quote, AdjustmentAboveAARU only
pub fn calc_mint_usb_above_aaru(
    state: &VaultState,
    params: &VaultParams,
    asset_amount: U256,
) -> ProtocolResult<U256> {
    if asset_amount.is_zero() {
        return Err(ProtocolError::ZeroAmount);
    }
    if vault_phase(state, params) != VaultPhase::AdjustmentAboveAaru {
        return Err(ProtocolError::VaultNotAtAdjustmentAboveAaruPhase);
    }

    let usb_out = asset_amount * state.price / one();
    let aar_after = calc_aar(state.m_asset + asset_amount, state.price, state.m_usb + usb_out);
    if aar_after < params.aars {
        return Err(ProtocolError::AarBelowSafeThreshold);
    }
    Ok(usb_out)
}

/// Leveraged-only mint quote, AdjustmentBelowAARS only
pub fn calc_mint_lev_below_aars(
    state: &VaultState,
    params: &VaultParams,
    asset_amount: U256,
) -> ProtocolResult<U256> {
    if asset_amount.is_zero() {
        return Err(ProtocolError::ZeroAmount);
    }
    if vault_phase(state, params) != VaultPhase::AdjustmentBelowAars {
        return Err(ProtocolError::VaultNotAtAdjustmentBelowAarsPhase);
    }
    if state.aar <= one() {
        return Err(ProtocolError::AarBelow100Percent);
    }
    lev_for_value(state, asset_amount * state.price / one())
}

/// Discount purchase quote: leveraged tokens for `usb_amount` burned at
/// discount rate `r`.
///
/// The burn is split where AAR crosses AARS and AART. Below AARS a piece earns
/// `1 + r`, between AARS and AART it earns the `R2` premium, at or above AART
/// it is priced at NAV. Supplies advance after each piece.
pub fn calc_usb_to_lev(
    state: &VaultState,
    params: &VaultParams,
    usb_amount: U256,
    discount_rate: U256,
) -> ProtocolResult<U256> {
    if usb_amount.is_zero() {
        return Err(ProtocolError::ZeroAmount);
    }
    if vault_phase(state, params) != VaultPhase::AdjustmentBelowAars {
        return Err(ProtocolError::VaultNotAtAdjustmentBelowAarsPhase);
    }
    if state.aar <= one() {
        return Err(ProtocolError::AarBelow100Percent);
    }
    if usb_amount > state.m_usb {
        return Err(ProtocolError::TooLargeUsbAmount);
    }

    let total_value = asset_value(state);
    let mut current = *state;
    let mut remaining = usb_amount;
    let mut lev_out = U256::zero();

    while !remaining.is_zero() {
        let aar = if current.m_usb.is_zero() {
            U256::MAX
        } else {
            total_value * one() / current.m_usb
        };
        current.aar = aar;

        let (piece, bonus) = if aar < params.aars {
            let to_safe = current.m_usb - total_value * one() / params.aars;
            (remaining.min(to_safe.max(U256::one())), discount_rate)
        } else if aar < params.aart {
            let to_target = current.m_usb - total_value * one() / params.aart;
            if to_target.is_zero() {
                (remaining, U256::zero())
            } else {
                let piece = remaining.min(to_target);
                let aar_after = total_value * one() / (current.m_usb - piece);
                (piece, calc_premium(aar, aar_after, params))
            }
        } else {
            (remaining, U256::zero())
        };

        let minted = lev_for_value(&current, piece)? * (one() + bonus) / one();
        lev_out = lev_out + minted;
        current.m_usb = current.m_usb - piece;
        current.m_lev = current.m_lev + minted;
        remaining = remaining - piece;
    }
    Ok(lev_out)
}

/// Redemption by USB: `(net_asset, fee)`. Pro-rata below 100% AAR.
pub fn calc_redeem_by_usb(
    state: &VaultState,
    params: &VaultParams,
    usb_amount: U256,
) -> ProtocolResult<(U256, U256)> {
    if usb_amount.is_zero() {
        return Err(ProtocolError::ZeroAmount);
    }
    if usb_amount > state.m_usb {
        return Err(ProtocolError::TooLargeUsbAmount);
    }

    let gross = if state.aar < one() {
        usb_amount * state.m_asset / state.m_usb
    } else {
        (usb_amount * one() / state.price).min(state.m_asset)
    };
    let fee = gross * params.c1 / one();
    Ok((gross - fee, fee))
}

/// Redemption by leveraged token at NAV: `(net_asset, fee)`
pub fn calc_redeem_by_lev(
    state: &VaultState,
    params: &VaultParams,
    lev_amount: U256,
) -> ProtocolResult<(U256, U256)> {
    if lev_amount.is_zero() {
        return Err(ProtocolError::ZeroAmount);
    }
    if state.m_lev.is_zero() {
        return Err(ProtocolError::EmptyVault);
    }
    if lev_amount > state.m_lev {
        return Err(ProtocolError::TooLargeLeveragedTokenAmount);
    }
    if !state.m_usb.is_zero() && state.aar <= one() {
        return Err(ProtocolError::AarBelow100Percent);
    }

    // Asset backing the USB liability, rounded up
    let liability = state.m_usb * one();
    let mut backing = liability / state.price;
    if !(liability % state.price).is_zero() {
        backing = backing + 1;
    }
    let equity = state.m_asset.saturating_sub(backing);
    let gross = lev_amount * equity / state.m_lev;

    if !state.m_usb.is_zero() {
        let aar_after = calc_aar(state.m_asset - gross, state.price, state.m_usb);
        if aar_after < params.aars {
            return Err(ProtocolError::AarBelowSafeThreshold);
        }
    }

    let fee = gross * params.c2 / one();
    Ok((gross - fee, fee))
}

/// Pair redemption driven by a USB amount: `(lev_burned, asset_out)`
pub fn calc_pairs_with_usb_amount(
    state: &VaultState,
    usb_amount: U256,
) -> ProtocolResult<(U256, U256)> {
    if usb_amount.is_zero() {
        return Err(ProtocolError::ZeroAmount);
    }
    if state.m_usb.is_zero() || state.m_lev.is_zero() {
        return Err(ProtocolError::EmptyVault);
    }
    if usb_amount > state.m_usb {
        return Err(ProtocolError::TooLargeUsbAmount);
    }
    let lev_amount = usb_amount * state.m_lev / state.m_usb;
    let asset_out = usb_amount * state.m_asset / state.m_usb;
    Ok((lev_amount, asset_out))
}

/// Pair redemption driven by a leveraged token amount: `(usb_burned, asset_out)`
pub fn calc_pairs_with_lev_amount(
    state: &VaultState,
    lev_amount: U256,
) -> ProtocolResult<(U256, U256)> {
    if lev_amount.is_zero() {
        return Err(ProtocolError::ZeroAmount);
    }
    if state.m_usb.is_zero() || state.m_lev.is_zero() {
        return Err(ProtocolError::EmptyVault);
    }
    if lev_amount > state.m_lev {
        return Err(ProtocolError::TooLargeLeveragedTokenAmount);
    }
    let usb_amount = lev_amount * state.m_usb / state.m_lev;
    let asset_out = lev_amount * state.m_asset / state.m_lev;
    Ok((usb_amount, asset_out))
}

/// USB to burn from the BelowAARS pool to lift AAR back to AARS:
/// `x = (AARS * M_usb - V) / (AARS - 1)`. Zero at or below 100%.
pub fn calc_usb_to_burn_below_aars(state: &VaultState, params: &VaultParams) -> U256 {
    if state.m_usb.is_zero() || state.aar <= one() || state.aar >= params.aars {
        return U256::zero();
    }
    let target = params.aars * state.m_usb / one();
    let value = asset_value(state);
    if target <= value {
        return U256::zero();
    }
    (target - value) * one() / (params.aars - one())
}

/// USB to mint into the AboveAARU pool to pull AAR back to AARU:
/// `y = (V - AARU * M_usb) / (AARU - 1)`
pub fn calc_usb_to_mint_above_aaru(state: &VaultState, params: &VaultParams) -> U256 {
    if state.m_usb.is_zero() || state.aar <= params.aaru {
        return U256::zero();
    }
    let target = params.aaru * state.m_usb / one();
    let value = asset_value(state);
    if value <= target {
        return U256::zero();
    }
    (value - target) * one() / (params.aaru - one())
}
