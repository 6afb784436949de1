//! Exact-in swap quoting against a single Orca Whirlpool

pub mod quote;
pub mod service;
pub mod slippage;
pub mod tiers;

pub use quote::{quote_exact_in, swap_tick_array_starts, SwapQuote, TickSequence};
pub use service::{SwapQuoteRequest, SwapQuoteResponse, SwapService};
pub use slippage::effective_slippage_bps;
pub use tiers::{find_pool, ResolvedPool, FEE_TIER_TICK_SPACINGS};
