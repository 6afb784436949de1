//! Wallet position listing
//!
//! Pools referenced by the wallet's positions are fetched concurrently. A pool
//! that fails to load only degrades its positions' labels to `Unknown`.

use ahash::{AHashMap, AHashSet};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::core::{ChainReader, PositionState, ServiceResult};
use crate::pool::load_pool_snapshot;
use crate::position::fetch_owned_positions;
use crate::tokens::PoolPair;
use crate::whirlpool::PdaBuilder;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionInfo {
    /// Position NFT mint; the bundled position address for bundled positions
    pub position_mint: String,
    pub whirlpool_address: String,
    pub tick_lower_index: i32,
    pub tick_upper_index: i32,
    pub liquidity: String,
    pub is_bundle: bool,
    pub pool_pair: String,
    pub token_a: String,
    pub token_b: String,
}

impl PositionInfo {
    fn new(position: &PositionState, pair: &PoolPair) -> Self {
        let position_mint = if position.is_bundled() {
            position.address
        } else {
            position.position_mint
        };
        Self {
            position_mint: position_mint.to_string(),
            whirlpool_address: position.whirlpool.to_string(),
            tick_lower_index: position.tick_lower_index,
            tick_upper_index: position.tick_upper_index,
            liquidity: position.liquidity.to_string(),
            is_bundle: position.is_bundled(),
            pool_pair: pair.pair.clone(),
            token_a: pair.token_a.clone(),
            token_b: pair.token_b.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionsResponse {
    pub positions: Vec<PositionInfo>,
}

pub struct PortfolioService {
    chain: Arc<dyn ChainReader>,
    pda: PdaBuilder,
}

impl PortfolioService {
    pub fn new(chain: Arc<dyn ChainReader>, program_id: Pubkey) -> Self {
        Self {
            chain,
            pda: PdaBuilder::new(program_id),
        }
    }

    #[instrument(skip(self))]
    pub async fn list_positions(&self, wallet: &Pubkey) -> ServiceResult<Vec<PositionInfo>> {
        let chain = self.chain.as_ref();
        let positions = fetch_owned_positions(chain, &self.pda, wallet).await?;

        let mut seen = AHashSet::new();
        let pools: Vec<Pubkey> = positions
            .iter()
            .map(|p| p.whirlpool)
            .filter(|pool| seen.insert(*pool))
            .collect();

        let program_id = self.pda.program_id;
        let lookups = pools.iter().map(|address| async move {
            let pair = match load_pool_snapshot(chain, &program_id, address).await {
                Ok(snapshot) => PoolPair::resolve(&snapshot.pool.token_mint_a, &snapshot.pool.token_mint_b),
                Err(e) => {
                    warn!(pool = %address, "Failed to fetch pool: {}", e);
                    PoolPair::unknown()
                }
            };
            (*address, pair)
        });
        let pairs: AHashMap<Pubkey, PoolPair> = join_all(lookups).await.into_iter().collect();

        let unknown = PoolPair::unknown();
        let infos: Vec<PositionInfo> = positions
            .iter()
            .map(|p| PositionInfo::new(p, pairs.get(&p.whirlpool).unwrap_or(&unknown)))
            .collect();

        info!(wallet = %wallet, positions = infos.len(), pools = pools.len(), "Listed positions");
        Ok(infos)
    }
}
