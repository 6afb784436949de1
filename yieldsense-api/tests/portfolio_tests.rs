//! Wallet position listing across standard and bundled positions

use solana_sdk::pubkey::Pubkey;
use std::sync::Arc;
use yieldsense_api::{
    portfolio::{PortfolioService, PositionsResponse},
    testing::{install_bundle, install_position, MockChain, PoolFixture},
    whirlpool::{PdaBuilder, ORCA_WHIRLPOOL_PROGRAM_ID},
};

fn service(chain: &Arc<MockChain>) -> PortfolioService {
    PortfolioService::new(chain.clone(), ORCA_WHIRLPOOL_PROGRAM_ID)
}

#[tokio::test]
async fn test_empty_wallet_has_no_positions() {
    let chain = Arc::new(MockChain::new());
    let positions = service(&chain).list_positions(&Pubkey::new_unique()).await.unwrap();
    assert!(positions.is_empty());
}

#[tokio::test]
async fn test_bundled_positions_report_their_address() {
    let chain = Arc::new(MockChain::new());
    let owner = Pubkey::new_unique();
    let pool = PoolFixture::new().install(&chain);
    let bundle_mint = install_bundle(&chain, &owner, &[(12, pool.address, -64, 64, 7)]);

    let positions = service(&chain).list_positions(&owner).await.unwrap();

    let pda = PdaBuilder::new(ORCA_WHIRLPOOL_PROGRAM_ID);
    let (expected, _) = pda.bundled_position(&bundle_mint, 12);
    assert_eq!(positions.len(), 1);
    assert!(positions[0].is_bundle);
    assert_eq!(positions[0].position_mint, expected.to_string());
    assert_eq!(positions[0].whirlpool_address, pool.address.to_string());
    assert_eq!(positions[0].tick_lower_index, -64);
    assert_eq!(positions[0].tick_upper_index, 64);
}

#[tokio::test]
async fn test_standard_positions_report_their_mint() {
    let chain = Arc::new(MockChain::new());
    let owner = Pubkey::new_unique();
    let pool = PoolFixture::new().install(&chain);
    let position = install_position(&chain, &owner, &pool.address, -128, 256, 99);

    let positions = service(&chain).list_positions(&owner).await.unwrap();

    assert_eq!(positions.len(), 1);
    assert_eq!(positions[0].position_mint, position.mint.to_string());
    assert_eq!(positions[0].liquidity, "99");
}

#[tokio::test]
async fn test_response_is_camel_case() {
    let chain = Arc::new(MockChain::new());
    let owner = Pubkey::new_unique();
    let pool = PoolFixture::new().install(&chain);
    install_position(&chain, &owner, &pool.address, -64, 64, 1);

    let positions = service(&chain).list_positions(&owner).await.unwrap();
    let json = serde_json::to_value(PositionsResponse { positions }).unwrap();

    let first = &json["positions"][0];
    for key in [
        "positionMint",
        "whirlpoolAddress",
        "tickLowerIndex",
        "tickUpperIndex",
        "liquidity",
        "isBundle",
        "poolPair",
        "tokenA",
        "tokenB",
    ] {
        assert!(first.get(key).is_some(), "missing {}", key);
    }
}
