//! HTTP routing, status codes and response bodies

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use solana_sdk::pubkey::Pubkey;
use std::sync::Arc;
use tower::ServiceExt;
use yieldsense_api::{
    api::{create_router, ApiState},
    testing::{InstalledPool, MockChain, PoolFixture},
    ServiceConfig,
};

fn router(chain: &Arc<MockChain>) -> Router {
    let config = ServiceConfig::default();
    let state = ApiState::new(chain.clone(), &config).unwrap();
    create_router(state, &config.api)
}

async fn send(app: Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(value) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };

    let response = app.oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

fn deposit_body(wallet: &Pubkey, pool: &InstalledPool, lower: i32, upper: i32) -> Value {
    json!({
        "wallet": wallet.to_string(),
        "whirlpool": pool.address.to_string(),
        "tickLower": lower,
        "tickUpper": upper,
        "amountA": "1",
    })
}

#[tokio::test]
async fn test_health() {
    let chain = Arc::new(MockChain::new());
    let (status, body) = send(router(&chain), Method::GET, "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "yieldsense-api");
}

#[tokio::test]
async fn test_create_or_deposit_success() {
    let chain = Arc::new(MockChain::new());
    let pool = PoolFixture::new().install(&chain);
    let wallet = Pubkey::new_unique();

    let (status, body) = send(
        router(&chain),
        Method::POST,
        "/api/positions/create-or-deposit",
        Some(deposit_body(&wallet, &pool, -128, 128)),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["isNewPosition"], true);
    assert!(body["serializedTransaction"].is_string());
    assert!(body["positionMint"].is_string());
    assert!(body.get("error").is_none());
}

#[tokio::test]
async fn test_create_or_deposit_rejects_inverted_range() {
    let chain = Arc::new(MockChain::new());
    let pool = PoolFixture::new().install(&chain);

    let (status, body) = send(
        router(&chain),
        Method::POST,
        "/api/positions/create-or-deposit",
        Some(deposit_body(&Pubkey::new_unique(), &pool, 128, -128)),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["isNewPosition"], false);
    assert!(body["error"].as_str().unwrap().contains("lower tick (128)"));
    assert!(chain.calls().is_empty());
}

#[tokio::test]
async fn test_create_or_deposit_rejects_malformed_body() {
    let chain = Arc::new(MockChain::new());

    let (status, body) = send(
        router(&chain),
        Method::POST,
        "/api/positions/create-or-deposit",
        Some(json!({ "wallet": 42 })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_create_or_deposit_unknown_pool_is_not_found() {
    let chain = Arc::new(MockChain::new());
    let body = json!({
        "wallet": Pubkey::new_unique().to_string(),
        "whirlpool": Pubkey::new_unique().to_string(),
        "priceLower": "1",
        "priceUpper": "2",
        "amountA": "1",
    });

    let (status, body) = send(
        router(&chain),
        Method::POST,
        "/api/positions/create-or-deposit",
        Some(body),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_swap_quote() {
    let chain = Arc::new(MockChain::new());
    let pool = PoolFixture::new().install(&chain);
    let body = json!({
        "inputMint": pool.state.token_mint_a.to_string(),
        "outputMint": pool.state.token_mint_b.to_string(),
        "amount": "1000000",
        "slippageBps": 50,
        "userPubkey": Pubkey::new_unique().to_string(),
    });

    let (status, body) = send(router(&chain), Method::POST, "/api/swap/quote", Some(body)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["route"], "ORCA");
    assert_eq!(body["inAmount"], "1000000");
    assert!(body["outAmount"].is_string());
    assert!(body["tx"].is_string());
    assert_eq!(body["mevProtected"], false);
}

#[tokio::test]
async fn test_swap_quote_without_pool_is_not_found() {
    let chain = Arc::new(MockChain::new());
    let body = json!({
        "inputMint": Pubkey::new_unique().to_string(),
        "outputMint": Pubkey::new_unique().to_string(),
        "amount": "1000",
        "slippageBps": 50,
        "userPubkey": Pubkey::new_unique().to_string(),
    });

    let (status, body) = send(router(&chain), Method::POST, "/api/swap/quote", Some(body)).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], 404);
    assert_eq!(body["error"], "No Orca whirlpool found for this token pair");
}

#[tokio::test]
async fn test_get_pool() {
    let chain = Arc::new(MockChain::new());
    let pool = PoolFixture::new().tick(64).install(&chain);

    let uri = format!("/api/pools/{}", pool.address);
    let (status, body) = send(router(&chain), Method::GET, &uri, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["address"], pool.address.to_string());
    assert_eq!(body["tickSpacing"], 64);
    assert_eq!(body["tickCurrentIndex"], 64);
    assert_eq!(body["decimalsA"], 9);
}

#[tokio::test]
async fn test_get_pool_status_codes() {
    let chain = Arc::new(MockChain::new());
    let failing = PoolFixture::new().install(&chain);
    chain.fail_account(failing.address);

    let (status, _) = send(router(&chain), Method::GET, "/api/pools/not-a-key", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let uri = format!("/api/pools/{}", Pubkey::new_unique());
    let (status, body) = send(router(&chain), Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], 404);

    let uri = format!("/api/pools/{}", failing.address);
    let (status, _) = send(router(&chain), Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_list_wallet_positions() {
    let chain = Arc::new(MockChain::new());
    let pool = PoolFixture::new().install(&chain);
    let wallet = Pubkey::new_unique();
    yieldsense_api::testing::install_position(&chain, &wallet, &pool.address, -64, 64, 10);

    let uri = format!("/api/positions/{}", wallet);
    let (status, body) = send(router(&chain), Method::GET, &uri, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["positions"].as_array().unwrap().len(), 1);
    assert_eq!(body["positions"][0]["liquidity"], "10");
}
