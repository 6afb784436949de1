//! Pool resolution across fee tiers
//!
//! Whirlpool addresses are seeded with the tick spacing, so each fee tier is a
//! distinct PDA. Tiers are probed in a fixed order, with both mint orderings
//! tried at each tier before moving on.

use solana_sdk::{account::Account, pubkey::Pubkey};
use tracing::debug;

use crate::core::{ChainReader, ServiceError, ServiceResult};
use crate::whirlpool::PdaBuilder;

/// Tick spacings probed, most liquid tiers first
pub const FEE_TIER_TICK_SPACINGS: [u16; 5] = [64, 128, 1, 8, 16];

/// A pool found for a token pair
#[derive(Debug, Clone)]
pub struct ResolvedPool {
    pub address: Pubkey,
    pub account: Account,
    pub tick_spacing: u16,
}

/// Find the first existing Whirlpool for `mint_x`/`mint_y` under `config`
pub async fn find_pool(
    chain: &dyn ChainReader,
    pda: &PdaBuilder,
    config: &Pubkey,
    mint_x: &Pubkey,
    mint_y: &Pubkey,
) -> ServiceResult<ResolvedPool> {
    for tick_spacing in FEE_TIER_TICK_SPACINGS {
        for (mint_a, mint_b) in [(mint_x, mint_y), (mint_y, mint_x)] {
            let (address, _) = pda.whirlpool(config, mint_a, mint_b, tick_spacing);
            if let Some(account) = chain.get_account(&address).await? {
                debug!(pool = %address, tick_spacing, "Resolved pool for pair");
                return Ok(ResolvedPool {
                    address,
                    account,
                    tick_spacing,
                });
            }
        }
    }
    Err(ServiceError::NoPoolForPair)
}
