//! Exact-in swap simulation
//!
//! Walks the initialized ticks of the loaded tick arrays in the swap
//! direction, one constant-liquidity step at a time, charging the pool fee on
//! each step's input. Step amounts come from `orca_whirlpools_core`.

use orca_whirlpools_core::{
    sqrt_price_to_tick_index, try_get_amount_delta_a, try_get_amount_delta_b,
    try_get_next_sqrt_price_from_a, try_get_next_sqrt_price_from_b, U128,
};
use rust_decimal::{prelude::FromPrimitive, Decimal};
use std::collections::BTreeMap;

use crate::core::{PoolState, ServiceError, ServiceResult};
use crate::math::{self, FEE_RATE_DENOMINATOR, MAX_TICK_INDEX, MIN_TICK_INDEX};
use crate::whirlpool::{TickArray, TICK_ARRAY_SIZE};

/// Number of tick arrays a single swap instruction can traverse
pub const SWAP_TICK_ARRAY_COUNT: usize = 3;

/// Start indices of the tick arrays a swap traverses, in traversal order
///
/// B to A swaps start from the array holding `current + tick_spacing`, since
/// the current tick may sit on the last index of its array.
pub fn swap_tick_array_starts(pool: &PoolState, a_to_b: bool) -> [i32; SWAP_TICK_ARRAY_COUNT] {
    let spacing = pool.tick_spacing as i32;
    let span = spacing * TICK_ARRAY_SIZE as i32;
    let shift = if a_to_b { 0 } else { spacing };
    let first = math::tick_array_start(pool.tick_current_index + shift, pool.tick_spacing);
    let step = if a_to_b { -span } else { span };
    [first, first + step, first + 2 * step]
}

/// Initialized ticks across the loaded tick arrays, with the loaded bounds
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickSequence {
    ticks: BTreeMap<i32, i128>,
    /// Lowest tick index covered by the loaded arrays
    lower_bound: i32,
    /// First tick index past the loaded arrays
    upper_bound: i32,
}

impl TickSequence {
    /// `starts` are the traversal-ordered array starts; `arrays` holds the
    /// decoded arrays that exist. Missing arrays contribute no ticks.
    pub fn new(tick_spacing: u16, starts: &[i32], arrays: &[TickArray]) -> Self {
        let span = tick_spacing as i32 * TICK_ARRAY_SIZE as i32;
        let lower_bound = starts.iter().copied().min().unwrap_or(0);
        let upper_bound = starts.iter().copied().max().unwrap_or(0) + span;

        let ticks = arrays
            .iter()
            .flat_map(|array| array.initialized_ticks(tick_spacing))
            .collect();

        Self {
            ticks,
            lower_bound: lower_bound.max(MIN_TICK_INDEX),
            upper_bound: upper_bound.min(MAX_TICK_INDEX),
        }
    }

    /// Next initialized tick at or below `tick` (A to B)
    fn next_down(&self, tick: i32) -> Option<(i32, i128)> {
        if tick < self.lower_bound {
            return None;
        }
        self.ticks
            .range(self.lower_bound..=tick)
            .next_back()
            .map(|(t, net)| (*t, *net))
    }

    /// Next initialized tick strictly above `tick` (B to A)
    fn next_up(&self, tick: i32) -> Option<(i32, i128)> {
        if tick >= self.upper_bound {
            return None;
        }
        self.ticks
            .range(tick + 1..self.upper_bound)
            .next()
            .map(|(t, net)| (*t, *net))
    }
}

/// Result of a simulated exact-in swap
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapQuote {
    pub a_to_b: bool,
    pub amount_in: u64,
    pub amount_out: u64,
    pub fee_amount: u64,
    pub start_sqrt_price: u128,
    pub end_sqrt_price: u128,
    pub end_tick_index: i32,
}

impl SwapQuote {
    /// Price movement as a percentage string: `|1 - (end / start)^2| * 100`
    pub fn price_impact_pct(&self) -> String {
        if self.start_sqrt_price == 0 {
            return "0".to_string();
        }
        let ratio = self.end_sqrt_price as f64 / self.start_sqrt_price as f64;
        let impact = (1.0 - ratio * ratio).abs() * 100.0;
        Decimal::from_f64(impact)
            .map(|d| d.round_dp(6).normalize().to_string())
            .unwrap_or_else(|| "0".to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SwapStep {
    amount_in: u64,
    amount_out: u64,
    fee_amount: u64,
    next_sqrt_price: u128,
}

fn amount_delta_a(p1: u128, p2: u128, liquidity: u128, round_up: bool) -> ServiceResult<u64> {
    try_get_amount_delta_a(
        U128::from(p1.min(p2)),
        U128::from(p1.max(p2)),
        U128::from(liquidity),
        round_up,
    )
    .map_err(ServiceError::core)
}

fn amount_delta_b(p1: u128, p2: u128, liquidity: u128, round_up: bool) -> ServiceResult<u64> {
    try_get_amount_delta_b(
        U128::from(p1.min(p2)),
        U128::from(p1.max(p2)),
        U128::from(liquidity),
        round_up,
    )
    .map_err(ServiceError::core)
}

/// One step towards `target_sqrt_price` with constant `liquidity`
fn compute_swap_step(
    amount_remaining: u64,
    fee_rate: u16,
    liquidity: u128,
    current_sqrt_price: u128,
    target_sqrt_price: u128,
    a_to_b: bool,
) -> ServiceResult<SwapStep> {
    if liquidity == 0 || current_sqrt_price == target_sqrt_price {
        return Ok(SwapStep {
            amount_in: 0,
            amount_out: 0,
            fee_amount: 0,
            next_sqrt_price: target_sqrt_price,
        });
    }

    let fee_rate = fee_rate as u128;
    let amount_after_fee =
        (amount_remaining as u128 * (FEE_RATE_DENOMINATOR - fee_rate) / FEE_RATE_DENOMINATOR) as u64;

    // Input needed to reach the target; an overflow means it cannot be reached
    let max_in = if a_to_b {
        amount_delta_a(target_sqrt_price, current_sqrt_price, liquidity, true).ok()
    } else {
        amount_delta_b(current_sqrt_price, target_sqrt_price, liquidity, true).ok()
    };

    let (amount_in, next_sqrt_price) = match max_in {
        Some(max_in) if max_in <= amount_after_fee => (max_in, target_sqrt_price),
        _ => {
            let next: u128 = if a_to_b {
                try_get_next_sqrt_price_from_a(
                    U128::from(current_sqrt_price),
                    U128::from(liquidity),
                    amount_after_fee,
                    true,
                )
                .map_err(ServiceError::core)?
                .into()
            } else {
                try_get_next_sqrt_price_from_b(
                    U128::from(current_sqrt_price),
                    U128::from(liquidity),
                    amount_after_fee,
                    true,
                )
                .map_err(ServiceError::core)?
                .into()
            };
            let next = if a_to_b {
                next.max(target_sqrt_price)
            } else {
                next.min(target_sqrt_price)
            };
            (amount_after_fee, next)
        }
    };

    let amount_out = if a_to_b {
        amount_delta_b(next_sqrt_price, current_sqrt_price, liquidity, false)?
    } else {
        amount_delta_a(current_sqrt_price, next_sqrt_price, liquidity, false)?
    };

    let fee_amount = if next_sqrt_price == target_sqrt_price {
        let numerator = amount_in as u128 * fee_rate;
        let denominator = FEE_RATE_DENOMINATOR - fee_rate;
        numerator.div_ceil(denominator) as u64
    } else {
        amount_remaining - amount_in
    };

    Ok(SwapStep {
        amount_in,
        amount_out,
        fee_amount,
        next_sqrt_price,
    })
}

/// Simulate swapping exactly `amount` of the input token
pub fn quote_exact_in(
    pool: &PoolState,
    ticks: &TickSequence,
    amount: u64,
    a_to_b: bool,
) -> ServiceResult<SwapQuote> {
    let mut remaining = amount;
    let mut amount_out: u64 = 0;
    let mut fee_total: u64 = 0;
    let mut sqrt_price = pool.sqrt_price;
    let mut liquidity = pool.liquidity;
    let mut current_tick = pool.tick_current_index;

    while remaining > 0 {
        let next = if a_to_b {
            ticks.next_down(current_tick)
        } else {
            ticks.next_up(current_tick)
        };
        let target_tick = match next {
            Some((tick, _)) => tick,
            None if a_to_b => ticks.lower_bound,
            None => ticks.upper_bound,
        };
        let target_sqrt_price = math::sqrt_price_at_tick(target_tick);

        let step = compute_swap_step(
            remaining,
            pool.fee_rate,
            liquidity,
            sqrt_price,
            target_sqrt_price,
            a_to_b,
        )?;

        remaining = remaining
            .checked_sub(step.amount_in + step.fee_amount)
            .ok_or_else(|| ServiceError::Quote("Swap step consumed more than the remaining input".into()))?;
        amount_out = amount_out
            .checked_add(step.amount_out)
            .ok_or_else(|| ServiceError::Quote("Swap output exceeds u64".into()))?;
        fee_total += step.fee_amount;
        sqrt_price = step.next_sqrt_price;

        if step.next_sqrt_price != target_sqrt_price {
            current_tick = sqrt_price_to_tick_index(U128::from(sqrt_price));
            break;
        }

        match next {
            Some((tick, liquidity_net)) => {
                liquidity = if a_to_b {
                    apply_liquidity_net(liquidity, -liquidity_net)?
                } else {
                    apply_liquidity_net(liquidity, liquidity_net)?
                };
                current_tick = if a_to_b { tick - 1 } else { tick };
            }
            None => {
                if remaining > 0 {
                    return Err(ServiceError::Quote(
                        "Swap amount exceeds the liquidity in the loaded tick arrays".into(),
                    ));
                }
                current_tick = target_tick;
            }
        }
    }

    Ok(SwapQuote {
        a_to_b,
        amount_in: amount - remaining,
        amount_out,
        fee_amount: fee_total,
        start_sqrt_price: pool.sqrt_price,
        end_sqrt_price: sqrt_price,
        end_tick_index: current_tick,
    })
}

fn apply_liquidity_net(liquidity: u128, delta: i128) -> ServiceResult<u128> {
    let updated = if delta >= 0 {
        liquidity.checked_add(delta as u128)
    } else {
        liquidity.checked_sub(delta.unsigned_abs())
    };
    updated.ok_or_else(|| ServiceError::Quote("Liquidity out of range while crossing tick".into()))
}
