/// Ceiling for dynamically widened slippage (10%)
pub const MAX_DYNAMIC_SLIPPAGE_BPS: u16 = 1000;

/// Multiplier applied to trade size before comparing against pool liquidity
const LARGE_TRADE_FACTOR: u128 = 1000;

/// Slippage to quote with for a trade of `amount` raw units
///
/// Trades large relative to the pool's active liquidity
/// (`amount * 1000 > liquidity`) get double the requested slippage, capped at
/// [`MAX_DYNAMIC_SLIPPAGE_BPS`]. Otherwise the request is used unchanged.
pub fn effective_slippage_bps(amount: u64, pool_liquidity: u128, requested_bps: u16) -> u16 {
    let is_large = (amount as u128).saturating_mul(LARGE_TRADE_FACTOR) > pool_liquidity;
    if is_large {
        requested_bps.saturating_mul(2).min(MAX_DYNAMIC_SLIPPAGE_BPS)
    } else {
        requested_bps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_trade_keeps_requested_slippage() {
        assert_eq!(effective_slippage_bps(1_000, 1_000_000, 50), 50);
        // Exactly at the threshold is not large
        assert_eq!(effective_slippage_bps(1_000, 1_000_000, 2_000), 2_000);
    }

    #[test]
    fn test_large_trade_doubles_slippage() {
        assert_eq!(effective_slippage_bps(1_001, 1_000_000, 50), 100);
    }

    #[test]
    fn test_doubling_is_capped() {
        assert_eq!(effective_slippage_bps(u64::MAX, 0, 600), 1000);
        assert_eq!(effective_slippage_bps(10, 0, 40_000), 1000);
    }
}
