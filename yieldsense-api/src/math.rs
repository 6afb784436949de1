//! Price, tick and liquidity math
//!
//! Thin adapter over `orca_whirlpools_core`: the conversions here never
//! reimplement the Whirlpool math, they only validate inputs, convert between
//! human decimal amounts and raw token units, and map core errors into
//! [`ServiceError`].

use orca_whirlpools_core::{
    get_initializable_tick_index, get_tick_array_start_tick_index, increase_liquidity_quote_a,
    increase_liquidity_quote_b, price_to_tick_index, sqrt_price_to_price, tick_index_to_price,
    tick_index_to_sqrt_price, IncreaseLiquidityQuote, U128,
};
use rust_decimal::{prelude::ToPrimitive, Decimal};

use crate::core::{DepositError, ServiceError, ServiceResult, TickRange};

/// Slippage tolerance applied to every liquidity quote (1%)
pub const LIQUIDITY_SLIPPAGE_BPS: u16 = 100;

pub const MIN_TICK_INDEX: i32 = -443636;
pub const MAX_TICK_INDEX: i32 = 443636;
pub const MIN_SQRT_PRICE: u128 = 4295048016;
pub const MAX_SQRT_PRICE: u128 = 79226673515401279992447579055;

/// Basis point denominator
pub const BPS_DENOMINATOR: u64 = 10_000;

/// Fee rates are expressed in hundredths of a basis point
pub const FEE_RATE_DENOMINATOR: u128 = 1_000_000;

/// Tick index for a human price (token B per token A)
pub fn price_to_tick(price: Decimal, decimals_a: u8, decimals_b: u8) -> ServiceResult<i32> {
    let value = price
        .to_f64()
        .filter(|p| p.is_finite() && *p > 0.0)
        .ok_or_else(|| {
            ServiceError::InvalidRequest(format!("Price must be a positive number, got {}", price))
        })?;

    let tick = price_to_tick_index(value, decimals_a, decimals_b);
    Ok(tick.clamp(MIN_TICK_INDEX, MAX_TICK_INDEX))
}

/// Human price (token B per token A) at a tick
pub fn tick_to_price(tick_index: i32, decimals_a: u8, decimals_b: u8) -> f64 {
    tick_index_to_price(tick_index, decimals_a, decimals_b)
}

/// Human price for a Q64.64 sqrt price
pub fn sqrt_price_to_human(sqrt_price: u128, decimals_a: u8, decimals_b: u8) -> f64 {
    sqrt_price_to_price(U128::from(sqrt_price), decimals_a, decimals_b)
}

/// Lowest and highest ticks initializable under `tick_spacing`
pub fn usable_tick_bounds(tick_spacing: u16) -> (i32, i32) {
    let spacing = i32::from(tick_spacing.max(1));
    let max = (MAX_TICK_INDEX / spacing) * spacing;
    (-max, max)
}

/// Round a tick to the nearest index initializable under `tick_spacing`,
/// kept inside the usable bounds
pub fn snap_to_spacing(tick_index: i32, tick_spacing: u16) -> i32 {
    let (min, max) = usable_tick_bounds(tick_spacing);
    get_initializable_tick_index(tick_index, tick_spacing, None).clamp(min, max)
}

/// Start index of the tick array containing `tick_index`
pub fn tick_array_start(tick_index: i32, tick_spacing: u16) -> i32 {
    get_tick_array_start_tick_index(tick_index, tick_spacing)
}

/// Q64.64 sqrt price at a tick
pub fn sqrt_price_at_tick(tick_index: i32) -> u128 {
    tick_index_to_sqrt_price(tick_index).into()
}

/// Truncate a human amount to raw token units
pub fn to_raw_amount(amount: Decimal, decimals: u8) -> Result<u64, DepositError> {
    let scale = (0..decimals).try_fold(Decimal::ONE, |acc, _| acc.checked_mul(Decimal::TEN));
    scale
        .and_then(|scale| amount.checked_mul(scale))
        .and_then(|raw| raw.trunc().to_u64())
        .ok_or(DepositError::AmountOverflow)
}

/// Convert raw token units to a human amount
pub fn to_human_amount(raw: u64, decimals: u8) -> Decimal {
    let mut amount = Decimal::from(raw);
    // rust_decimal supports at most 28 fractional digits
    amount.set_scale(u32::from(decimals.min(28))).ok();
    amount.normalize()
}

/// Liquidity quote for depositing into a range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiquidityQuote {
    pub liquidity_delta: u128,
    pub token_est_a: u64,
    pub token_est_b: u64,
    pub token_max_a: u64,
    pub token_max_b: u64,
}

impl From<IncreaseLiquidityQuote> for LiquidityQuote {
    fn from(quote: IncreaseLiquidityQuote) -> Self {
        Self {
            liquidity_delta: quote.liquidity_delta,
            token_est_a: quote.token_est_a,
            token_est_b: quote.token_est_b,
            token_max_a: quote.token_max_a,
            token_max_b: quote.token_max_b,
        }
    }
}

impl LiquidityQuote {
    fn checked(self) -> ServiceResult<Self> {
        if self.liquidity_delta == 0 {
            return Err(DepositError::TooSmall.into());
        }
        Ok(self)
    }
}

/// Quote liquidity for `amount_a` raw units of token A
pub fn liquidity_quote_by_a(
    amount_a: u64,
    current_sqrt_price: u128,
    range: TickRange,
) -> ServiceResult<LiquidityQuote> {
    if amount_a == 0 {
        return Err(DepositError::TooSmall.into());
    }
    let quote = increase_liquidity_quote_a(
        amount_a,
        LIQUIDITY_SLIPPAGE_BPS,
        U128::from(current_sqrt_price),
        range.lower(),
        range.upper(),
        None,
        None,
    )
    .map_err(ServiceError::core)?;
    LiquidityQuote::from(quote).checked()
}

/// Quote liquidity for `amount_b` raw units of token B
pub fn liquidity_quote_by_b(
    amount_b: u64,
    current_sqrt_price: u128,
    range: TickRange,
) -> ServiceResult<LiquidityQuote> {
    if amount_b == 0 {
        return Err(DepositError::TooSmall.into());
    }
    let quote = increase_liquidity_quote_b(
        amount_b,
        LIQUIDITY_SLIPPAGE_BPS,
        U128::from(current_sqrt_price),
        range.lower(),
        range.upper(),
        None,
        None,
    )
    .map_err(ServiceError::core)?;
    LiquidityQuote::from(quote).checked()
}

/// Minimum output after slippage: `amount * (10000 - bps) / 10000`
pub fn apply_slippage_floor(amount: u64, slippage_bps: u16) -> u64 {
    let bps = u64::from(slippage_bps).min(BPS_DENOMINATOR);
    ((amount as u128 * (BPS_DENOMINATOR - bps) as u128) / BPS_DENOMINATOR as u128) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_raw_amount_truncates_extra_precision() {
        let amount = Decimal::from_str("1.2345678919").unwrap();
        assert_eq!(to_raw_amount(amount, 9).unwrap(), 1_234_567_891);
        assert_eq!(to_raw_amount(Decimal::from_str("0.5").unwrap(), 0).unwrap(), 0);
    }

    #[test]
    fn test_raw_amount_overflow() {
        let amount = Decimal::from_str("100000000000").unwrap();
        assert_eq!(to_raw_amount(amount, 9), Err(DepositError::AmountOverflow));
    }

    #[test]
    fn test_human_amount_round_trip() {
        assert_eq!(to_human_amount(1_500_000, 6), Decimal::from_str("1.5").unwrap());
        assert_eq!(to_human_amount(42, 0), Decimal::from(42));
    }

    #[test]
    fn test_price_to_tick_rejects_non_positive() {
        assert!(price_to_tick(Decimal::ZERO, 9, 6).is_err());
        assert!(price_to_tick(Decimal::from(-1), 9, 6).is_err());
    }

    #[test]
    fn test_unit_price_is_tick_zero() {
        assert_eq!(price_to_tick(Decimal::ONE, 6, 6).unwrap(), 0);
        assert_eq!(sqrt_price_at_tick(0), 1u128 << 64);
        assert!((tick_to_price(0, 6, 6) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_snap_to_spacing_rounds_to_nearest() {
        assert_eq!(snap_to_spacing(100, 64), 128);
        assert_eq!(snap_to_spacing(90, 64), 64);
        assert_eq!(snap_to_spacing(-100, 64), -128);
    }

    #[test]
    fn test_snap_stays_within_tick_bounds() {
        for (spacing, max) in [(1u16, 443636), (8, 443632), (64, 443584), (128, 443520)] {
            assert_eq!(usable_tick_bounds(spacing), (-max, max));
            assert_eq!(snap_to_spacing(MAX_TICK_INDEX, spacing), max);
            assert_eq!(snap_to_spacing(MIN_TICK_INDEX, spacing), -max);
            assert_eq!(snap_to_spacing(max, spacing), max);
        }
    }

    #[test]
    fn test_tick_array_start() {
        assert_eq!(tick_array_start(0, 64), 0);
        assert_eq!(tick_array_start(5631, 64), 0);
        assert_eq!(tick_array_start(5632, 64), 5632);
        assert_eq!(tick_array_start(-1, 64), -5632);
    }

    #[test]
    fn test_zero_amount_is_too_small() {
        let range = TickRange::new(-128, 128).unwrap();
        let err = liquidity_quote_by_a(0, 1 << 64, range).unwrap_err();
        assert!(matches!(err, ServiceError::Deposit(DepositError::TooSmall)));
    }

    #[test]
    fn test_in_range_quote_needs_both_tokens() {
        let range = TickRange::new(-128, 128).unwrap();
        let quote = liquidity_quote_by_a(1_000_000, 1 << 64, range).unwrap();
        assert!(quote.liquidity_delta > 0);
        assert!(quote.token_est_b > 0);
        assert!(quote.token_max_a >= quote.token_est_a);
    }

    #[test]
    fn test_slippage_floor() {
        assert_eq!(apply_slippage_floor(10_000, 50), 9_950);
        assert_eq!(apply_slippage_floor(10_000, 20_000), 0);
    }
}
