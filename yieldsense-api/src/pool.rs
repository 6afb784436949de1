//! Pool snapshot loading and the pool info endpoint
//!
//! A snapshot is the decoded Whirlpool plus both token mints. It is fetched
//! fresh for every request.

use rust_decimal::{prelude::FromPrimitive, Decimal};
use serde::Serialize;
use solana_program::program_pack::Pack;
use solana_sdk::{account::Account, pubkey::Pubkey};
use spl_token::state::Mint;
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::core::{ChainReader, PoolSnapshot, ServiceError, ServiceResult, TokenInfo};
use crate::math;
use crate::whirlpool::{ProgramAccount, Whirlpool, TOKEN_2022_PROGRAM_ID};

/// Load and decode a Whirlpool together with both of its mints
pub async fn load_pool_snapshot(
    chain: &dyn ChainReader,
    program_id: &Pubkey,
    address: &Pubkey,
) -> ServiceResult<PoolSnapshot> {
    let account = chain
        .get_account(address)
        .await?
        .ok_or_else(|| ServiceError::PoolNotFound {
            address: address.to_string(),
        })?;
    decode_pool_snapshot(chain, program_id, address, &account).await
}

/// Decode an already fetched Whirlpool account and load its mints
pub async fn decode_pool_snapshot(
    chain: &dyn ChainReader,
    program_id: &Pubkey,
    address: &Pubkey,
    account: &Account,
) -> ServiceResult<PoolSnapshot> {
    let pool = Whirlpool::decode_owned(account, program_id)?.into_state(*address);

    let mints = chain
        .get_multiple_accounts(&[pool.token_mint_a, pool.token_mint_b])
        .await?;
    let [mint_a, mint_b]: [Option<Account>; 2] = mints
        .try_into()
        .map_err(|_| ServiceError::invalid_account("Mint", "expected two mint accounts"))?;

    let token_a = decode_mint(&pool.token_mint_a, mint_a)?;
    let token_b = decode_mint(&pool.token_mint_b, mint_b)?;

    debug!(
        pool = %address,
        tick = pool.tick_current_index,
        tick_spacing = pool.tick_spacing,
        "Loaded pool snapshot"
    );

    Ok(PoolSnapshot {
        pool,
        token_a,
        token_b,
    })
}

/// Decode the base mint layout shared by SPL Token and Token-2022
pub fn decode_mint(mint: &Pubkey, account: Option<Account>) -> ServiceResult<TokenInfo> {
    let account = account.ok_or_else(|| {
        ServiceError::invalid_account("Mint", format!("mint {} does not exist", mint))
    })?;

    if account.owner != spl_token::id() && account.owner != TOKEN_2022_PROGRAM_ID {
        return Err(ServiceError::invalid_account(
            "Mint",
            format!("mint {} is owned by {}", mint, account.owner),
        ));
    }
    if account.data.len() < Mint::LEN {
        return Err(ServiceError::invalid_account("Mint", "account data too small"));
    }

    let state = Mint::unpack_from_slice(&account.data[..Mint::LEN])
        .map_err(|e| ServiceError::invalid_account("Mint", e.to_string()))?;

    Ok(TokenInfo {
        mint: *mint,
        decimals: state.decimals,
        token_program: account.owner,
    })
}

/// Pool details returned by the API
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolInfo {
    pub address: String,
    pub token_mint_a: String,
    pub token_mint_b: String,
    pub decimals_a: u8,
    pub decimals_b: u8,
    pub tick_spacing: u16,
    pub tick_current_index: i32,
    pub sqrt_price: String,
    pub liquidity: String,
    /// Hundredths of a basis point
    pub fee_rate: u16,
    /// Token B per token A
    pub price: String,
}

impl From<&PoolSnapshot> for PoolInfo {
    fn from(snapshot: &PoolSnapshot) -> Self {
        let pool = &snapshot.pool;
        let price = math::sqrt_price_to_human(
            pool.sqrt_price,
            snapshot.token_a.decimals,
            snapshot.token_b.decimals,
        );
        let price = Decimal::from_f64(price)
            .map(|p| p.round_dp(12).normalize().to_string())
            .unwrap_or_else(|| "0".to_string());

        Self {
            address: pool.address.to_string(),
            token_mint_a: pool.token_mint_a.to_string(),
            token_mint_b: pool.token_mint_b.to_string(),
            decimals_a: snapshot.token_a.decimals,
            decimals_b: snapshot.token_b.decimals,
            tick_spacing: pool.tick_spacing,
            tick_current_index: pool.tick_current_index,
            sqrt_price: pool.sqrt_price.to_string(),
            liquidity: pool.liquidity.to_string(),
            fee_rate: pool.fee_rate,
            price,
        }
    }
}

/// Read-only pool lookups
pub struct PoolService {
    chain: Arc<dyn ChainReader>,
    program_id: Pubkey,
}

impl PoolService {
    pub fn new(chain: Arc<dyn ChainReader>, program_id: Pubkey) -> Self {
        Self { chain, program_id }
    }

    #[instrument(skip(self))]
    pub async fn get_pool(&self, address: &Pubkey) -> ServiceResult<PoolInfo> {
        let snapshot = load_pool_snapshot(self.chain.as_ref(), &self.program_id, address).await?;
        Ok(PoolInfo::from(&snapshot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockChain, PoolFixture};
    use crate::whirlpool::ORCA_WHIRLPOOL_PROGRAM_ID;

    #[tokio::test]
    async fn test_missing_pool_is_not_found() {
        let chain = MockChain::new();
        let err = load_pool_snapshot(&chain, &ORCA_WHIRLPOOL_PROGRAM_ID, &Pubkey::new_unique())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::PoolNotFound { .. }));
    }

    #[tokio::test]
    async fn test_snapshot_reads_mint_decimals() {
        let chain = MockChain::new();
        let fixture = PoolFixture::new().decimals(9, 6).install(&chain);

        let snapshot = load_pool_snapshot(&chain, &ORCA_WHIRLPOOL_PROGRAM_ID, &fixture.address)
            .await
            .unwrap();
        assert_eq!(snapshot.token_a.decimals, 9);
        assert_eq!(snapshot.token_b.decimals, 6);
        assert_eq!(snapshot.token_a.token_program, spl_token::id());
    }

    #[tokio::test]
    async fn test_foreign_owner_is_rejected() {
        let chain = MockChain::new();
        let fixture = PoolFixture::new().install(&chain);
        let err = load_pool_snapshot(&chain, &Pubkey::new_unique(), &fixture.address)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidAccountData { .. }));
    }

    #[tokio::test]
    async fn test_pool_info_reports_unit_price() {
        let chain = Arc::new(MockChain::new());
        let fixture = PoolFixture::new().decimals(6, 6).tick(0).install(&chain);
        let service = PoolService::new(chain.clone(), ORCA_WHIRLPOOL_PROGRAM_ID);

        let info = service.get_pool(&fixture.address).await.unwrap();
        assert_eq!(info.price, "1");
        assert_eq!(info.tick_current_index, 0);
        assert_eq!(info.sqrt_price, (1u128 << 64).to_string());
    }
}
