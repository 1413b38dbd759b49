//! U256 fixed-point arithmetic for price normalization and rate conversion.
//!
//! All conversions that can grow are checked and surface
//! [`Error::ArithmeticOverflow`] instead of wrapping.

use crate::error::{Error, Result};
use alloy::primitives::U256;

/// WAD constant: 1e18 for 18-decimal fixed-point arithmetic
pub const WAD: U256 = U256::from_limbs([1_000_000_000_000_000_000u64, 0, 0, 0]);

/// RAY constant: 1e27 for 27-decimal fixed-point arithmetic
pub const RAY: U256 = U256::from_limbs([0x9fd0_803c_e800_0000, 0x033b_2e3c, 0, 0]);

/// Basis points denominator (10000 = 100%)
pub const BPS_DENOMINATOR: U256 = U256::from_limbs([10000u64, 0, 0, 0]);

/// Oracle price decimals (8)
pub const PRICE_DECIMALS: u8 = 8;

/// Largest positive exponent accepted from an exponent-based price source.
pub const MAX_POSITIVE_EXPO: i32 = 8;

/// Largest absolute negative exponent accepted from an exponent-based price source.
pub const MAX_NEGATIVE_EXPO: u32 = 18;

/// 365 days.
pub const SECONDS_PER_YEAR: u64 = 31_536_000;

/// Scale between an 8-decimal price and an 18-decimal USD value.
const PRICE_TO_WAD: U256 = U256::from_limbs([10_000_000_000u64, 0, 0, 0]);

/// RAY annual rate → basis points: 1e27 / 1e4.
const RAY_PER_BPS: U256 = U256::from_limbs([0x02c7_e14a_f680_0000, 0x152d, 0, 0]);

/// Pre-computed powers of 10 for fast decimal conversion
const POW10: [u128; 39] = [
    1,
    10,
    100,
    1_000,
    10_000,
    100_000,
    1_000_000,
    10_000_000,
    100_000_000,
    1_000_000_000,
    10_000_000_000,
    100_000_000_000,
    1_000_000_000_000,
    10_000_000_000_000,
    100_000_000_000_000,
    1_000_000_000_000_000,
    10_000_000_000_000_000,
    100_000_000_000_000_000,
    1_000_000_000_000_000_000,
    10_000_000_000_000_000_000,
    100_000_000_000_000_000_000,
    1_000_000_000_000_000_000_000,
    10_000_000_000_000_000_000_000,
    100_000_000_000_000_000_000_000,
    1_000_000_000_000_000_000_000_000,
    10_000_000_000_000_000_000_000_000,
    100_000_000_000_000_000_000_000_000,
    1_000_000_000_000_000_000_000_000_000,
    10_000_000_000_000_000_000_000_000_000,
    100_000_000_000_000_000_000_000_000_000,
    1_000_000_000_000_000_000_000_000_000_000,
    10_000_000_000_000_000_000_000_000_000_000,
    100_000_000_000_000_000_000_000_000_000_000,
    1_000_000_000_000_000_000_000_000_000_000_000,
    10_000_000_000_000_000_000_000_000_000_000_000,
    100_000_000_000_000_000_000_000_000_000_000_000,
    1_000_000_000_000_000_000_000_000_000_000_000_000,
    10_000_000_000_000_000_000_000_000_000_000_000_000,
    100_000_000_000_000_000_000_000_000_000_000_000_000,
];

/// Power of 10, table lookup up to 10^38.
///
/// 10^78 and above do not fit in 256 bits and are reported as
/// [`Error::ArithmeticOverflow`].
#[inline(always)]
pub fn pow10(exp: u8) -> Result<U256> {
    if exp < 39 {
        Ok(U256::from(POW10[exp as usize]))
    } else {
        U256::from(10u64)
            .checked_pow(U256::from(exp))
            .ok_or(Error::ArithmeticOverflow)
    }
}

/// Table-only power of 10 for the fixed exponents used internally.
#[inline(always)]
fn small_pow10(exp: u8) -> U256 {
    U256::from(POW10[exp as usize])
}

#[inline(always)]
fn checked_mul(a: U256, b: U256) -> Result<U256> {
    a.checked_mul(b).ok_or(Error::ArithmeticOverflow)
}

/// Rescale a fixed-point value from `from` decimals to `to` decimals.
///
/// Downscaling floors.
pub fn rescale(value: U256, from: u8, to: u8) -> Result<U256> {
    if from == to {
        Ok(value)
    } else if from < to {
        checked_mul(value, pow10(to - from)?)
    } else {
        Ok(value / pow10(from - to)?)
    }
}

/// Normalize a `mantissa * 10^expo` reading to an 8-decimal price.
///
/// Returns `None` when the exponent is outside `[-18, 8]` or the result
/// does not fit.
pub fn normalize_expo(mantissa: U256, expo: i32) -> Option<U256> {
    if expo >= 0 {
        if expo > MAX_POSITIVE_EXPO {
            return None;
        }
        mantissa.checked_mul(small_pow10(expo as u8 + PRICE_DECIMALS))
    } else {
        let abs = expo.unsigned_abs();
        if abs > MAX_NEGATIVE_EXPO {
            return None;
        }
        let abs = abs as u8;
        match abs.cmp(&PRICE_DECIMALS) {
            std::cmp::Ordering::Equal => Some(mantissa),
            std::cmp::Ordering::Greater => Some(mantissa / small_pow10(abs - PRICE_DECIMALS)),
            std::cmp::Ordering::Less => mantissa.checked_mul(small_pow10(PRICE_DECIMALS - abs)),
        }
    }
}

/// Token amount → 18-decimal USD value.
///
/// Formula: amount * price * 10^10 / 10^decimals (price at 8 decimals).
pub fn to_usd_wad(amount: U256, price: U256, decimals: u8) -> Result<U256> {
    let scaled = checked_mul(checked_mul(amount, price)?, PRICE_TO_WAD)?;
    Ok(scaled / pow10(decimals)?)
}

/// 18-decimal USD value → token amount.
///
/// Formula: usd * 10^decimals / (price * 10^10). Zero price is rejected by
/// the caller before we get here.
pub fn from_usd_wad(usd_wad: U256, price: U256, decimals: u8) -> Result<U256> {
    let numerator = checked_mul(usd_wad, pow10(decimals)?)?;
    let denominator = checked_mul(price, PRICE_TO_WAD)?;
    if denominator.is_zero() {
        return Err(Error::ArithmeticOverflow);
    }
    Ok(numerator / denominator)
}

/// Annual rate in RAY (1e27 = 100%) → basis points.
#[inline(always)]
pub fn ray_rate_to_bps(rate_ray: U256) -> U256 {
    rate_ray / RAY_PER_BPS
}

/// Per-second rate in WAD (1e18 = 100%/s) → annualized basis points.
pub fn per_second_wad_rate_to_bps(rate_per_second: U256) -> Result<U256> {
    let annual = checked_mul(rate_per_second, U256::from(SECONDS_PER_YEAR))?;
    Ok(checked_mul(annual, BPS_DENOMINATOR)? / WAD)
}

/// `a - b` clamped at zero.
#[inline(always)]
pub fn saturating_diff(a: U256, b: U256) -> U256 {
    a.saturating_sub(b)
}

/// Convert WAD (18 decimals) to f64.
/// Use only for display/logging, not for computation.
#[inline(always)]
pub fn wad_to_f64(wad: U256) -> f64 {
    if wad <= U256::from(u128::MAX) {
        let value: u128 = wad.to();
        value as f64 / 1e18
    } else {
        let limbs = wad.as_limbs();
        let high = limbs[1] as f64 * (u64::MAX as f64 + 1.0);
        let low = limbs[0] as f64;
        (high + low) / 1e18
    }
}

/// 8-decimal price → f64, for display only.
#[inline(always)]
pub fn price_to_f64(price: U256) -> f64 {
    wad_to_f64(price.saturating_mul(PRICE_TO_WAD))
}
