//! HTTP API for building liquidity and swap transactions

mod handlers;
mod responses;
mod routes;

pub use responses::ErrorResponse;
pub use routes::*;

use crate::config::{ApiConfig, ServiceConfig};
use crate::core::ChainReader;
use crate::pool::PoolService;
use crate::portfolio::PortfolioService;
use crate::position::PositionService;
use crate::swap::SwapService;
use anyhow::Result;
use axum::{response::Json, routing::get, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};
use tracing::info;

/// Start the API server
pub async fn start_server(
    state: ApiState,
    config: &ApiConfig,
) -> Result<tokio::task::JoinHandle<()>> {
    let app = create_router(state, config);

    let listener = TcpListener::bind(&config.bind_address).await?;
    info!("API server listening on {}", config.bind_address);

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!("API server error: {}", e);
        }
    });

    Ok(handle)
}

/// Create the main API application
pub fn create_router(state: ApiState, config: &ApiConfig) -> Router {
    let app = Router::new()
        .merge(create_position_routes())
        .merge(create_swap_routes())
        .merge(create_pool_routes())
        .route("/health", get(health_handler))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::new(Duration::from_secs(
                    config.request_timeout_secs,
                ))),
        );

    if config.enable_cors {
        app.layer(CorsLayer::permissive())
    } else {
        app
    }
}

/// Health check handler
async fn health_handler(
    axum::extract::State(state): axum::extract::State<ApiState>,
) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().timestamp(),
        "service": "yieldsense-api",
        "version": env!("CARGO_PKG_VERSION"),
        "uptimeSecs": state.start_time.elapsed().as_secs(),
    }))
}

/// Shared API state
#[derive(Clone)]
pub struct ApiState {
    pub positions: Arc<PositionService>,
    pub swaps: Arc<SwapService>,
    pub portfolio: Arc<PortfolioService>,
    pub pools: Arc<PoolService>,
    pub start_time: Instant,
}

impl ApiState {
    /// Wire every service to one chain reader
    pub fn new(chain: Arc<dyn ChainReader>, config: &ServiceConfig) -> Result<Self> {
        let program_id = config.whirlpools.program_id()?;
        let config_address = config.whirlpools.config_address()?;

        Ok(Self {
            positions: Arc::new(PositionService::new(chain.clone(), program_id)),
            swaps: Arc::new(SwapService::new(
                chain.clone(),
                program_id,
                config_address,
                config.trading.use_private_relay,
            )
            .with_default_slippage(config.trading.default_slippage_bps)),
            portfolio: Arc::new(PortfolioService::new(chain.clone(), program_id)),
            pools: Arc::new(PoolService::new(chain, program_id)),
            start_time: Instant::now(),
        })
    }
}
