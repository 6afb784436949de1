//! Deposit-side selection
//!
//! Where the current tick sits relative to the target range decides which
//! token the position holds:
//!
//! | current tick      | holds       | quoted by |
//! |-------------------|-------------|-----------|
//! | `c < lower`       | A only      | A         |
//! | `lower <= c < up` | A and B     | A         |
//! | `c >= upper`      | B only      | B         |
//!
//! Above the range the A-denominated request amount is converted into B at
//! the current tick price.

use rust_decimal::{prelude::FromPrimitive, Decimal};
use serde::Serialize;
use tracing::debug;

use crate::core::{DepositError, PoolSnapshot, ServiceResult, TickRange, TokenSide};
use crate::math::{self, LiquidityQuote};

/// Current price location relative to a position range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RangePosition {
    BelowRange,
    InRange,
    AboveRange,
}

impl RangePosition {
    pub fn classify(current_tick: i32, range: TickRange) -> Self {
        if current_tick >= range.upper() {
            RangePosition::AboveRange
        } else if current_tick < range.lower() {
            RangePosition::BelowRange
        } else {
            RangePosition::InRange
        }
    }

    /// Token the liquidity quote is computed from
    pub fn input_side(&self) -> TokenSide {
        match self {
            RangePosition::AboveRange => TokenSide::B,
            RangePosition::BelowRange | RangePosition::InRange => TokenSide::A,
        }
    }
}

/// A fully quoted deposit
#[derive(Debug, Clone, PartialEq)]
pub struct DepositPlan {
    pub range: TickRange,
    pub position: RangePosition,
    pub input_side: TokenSide,
    /// Input amount in raw units of the input token
    pub input_amount: u64,
    pub quote: LiquidityQuote,
}

/// Convert a token A amount into the token B amount worth the same at `current_tick`
pub fn convert_a_to_b(amount_a: Decimal, current_tick: i32, decimals_a: u8, decimals_b: u8) -> Result<Decimal, DepositError> {
    let price = math::tick_to_price(current_tick, decimals_a, decimals_b);
    Decimal::from_f64(price)
        .and_then(|price| amount_a.checked_mul(price))
        .ok_or(DepositError::AmountOverflow)
}

/// Choose the deposit side for `range` and quote the liquidity for `amount_a`
pub fn plan_deposit(snapshot: &PoolSnapshot, range: TickRange, amount_a: Decimal) -> ServiceResult<DepositPlan> {
    let pool = &snapshot.pool;
    let position = RangePosition::classify(pool.tick_current_index, range);
    let input_side = position.input_side();

    let (input_amount, quote) = match position {
        RangePosition::AboveRange => {
            let amount_b = convert_a_to_b(
                amount_a,
                pool.tick_current_index,
                snapshot.token_a.decimals,
                snapshot.token_b.decimals,
            )?;
            let raw = math::to_raw_amount(amount_b, snapshot.token_b.decimals)?;
            (raw, math::liquidity_quote_by_b(raw, pool.sqrt_price, range)?)
        }
        RangePosition::BelowRange | RangePosition::InRange => {
            let raw = math::to_raw_amount(amount_a, snapshot.token_a.decimals)?;
            (raw, math::liquidity_quote_by_a(raw, pool.sqrt_price, range)?)
        }
    };

    debug!(
        ?position,
        ?input_side,
        input_amount,
        liquidity = %quote.liquidity_delta,
        "Planned deposit"
    );

    Ok(DepositPlan {
        range,
        position,
        input_side,
        input_amount,
        quote,
    })
}
