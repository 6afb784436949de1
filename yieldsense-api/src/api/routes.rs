//! API route definitions

use super::{handlers::*, ApiState};
use axum::{
    routing::{get, post},
    Router,
};

/// Create position-related routes
pub fn create_position_routes() -> Router<ApiState> {
    Router::new()
        .route("/api/positions/create-or-deposit", post(create_or_deposit))
        .route("/api/positions/:wallet", get(list_wallet_positions))
}

/// Create swap-related routes
pub fn create_swap_routes() -> Router<ApiState> {
    Router::new().route("/api/swap/quote", post(swap_quote))
}

/// Create pool-related routes
pub fn create_pool_routes() -> Router<ApiState> {
    Router::new().route("/api/pools/:address", get(get_pool))
}
