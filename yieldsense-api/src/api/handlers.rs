//! API request handlers

use super::{
    responses::{status_for, ErrorResponse},
    ApiState,
};
use crate::core::{ServiceError, ServiceResult};
use crate::pool::PoolInfo;
use crate::portfolio::PositionsResponse;
use crate::position::{CreateOrDepositRequest, CreateOrDepositResponse};
use crate::swap::{SwapQuoteRequest, SwapQuoteResponse};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::Json,
};
use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;

fn parse_path_pubkey(value: &str, field: &str) -> ServiceResult<Pubkey> {
    Pubkey::from_str(value)
        .map_err(|_| ServiceError::InvalidRequest(format!("Invalid {} address: {}", field, value)))
}

/// Build an open-position or increase-liquidity transaction
///
/// Failures keep the `{success: false, error}` shape so clients can read one body type.
pub async fn create_or_deposit(
    State(state): State<ApiState>,
    body: Result<Json<CreateOrDepositRequest>, JsonRejection>,
) -> (StatusCode, Json<CreateOrDepositResponse>) {
    let request = match body {
        Ok(Json(request)) => request,
        Err(rejection) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(CreateOrDepositResponse::failure(rejection.body_text())),
            )
        }
    };

    match state.positions.create_or_deposit(&request).await {
        Ok(response) => (StatusCode::OK, Json(response)),
        Err(e) => {
            let status = status_for(&e);
            if status.is_server_error() {
                tracing::error!("create-or-deposit failed: {}", e);
            }
            (status, Json(CreateOrDepositResponse::failure(e.to_string())))
        }
    }
}

/// Quote an exact-in swap and build its transaction
pub async fn swap_quote(
    State(state): State<ApiState>,
    body: Result<Json<SwapQuoteRequest>, JsonRejection>,
) -> Result<Json<SwapQuoteResponse>, (StatusCode, Json<ErrorResponse>)> {
    let Json(request) = body.map_err(|rejection| {
        let status = StatusCode::BAD_REQUEST;
        (status, Json(ErrorResponse::new(status, rejection.body_text())))
    })?;

    match state.swaps.quote(&request).await {
        Ok(response) => Ok(Json(response)),
        Err(e) => {
            let status = status_for(&e);
            Err((status, Json(ErrorResponse::new(status, e.to_string()))))
        }
    }
}

/// List every position held by a wallet
pub async fn list_wallet_positions(
    State(state): State<ApiState>,
    Path(wallet): Path<String>,
) -> ServiceResult<Json<PositionsResponse>> {
    let wallet = parse_path_pubkey(&wallet, "wallet")?;
    let positions = state.portfolio.list_positions(&wallet).await?;
    Ok(Json(PositionsResponse { positions }))
}

/// Get pool details
pub async fn get_pool(
    State(state): State<ApiState>,
    Path(address): Path<String>,
) -> ServiceResult<Json<PoolInfo>> {
    let address = parse_path_pubkey(&address, "whirlpool")?;
    let pool = state.pools.get_pool(&address).await?;
    Ok(Json(pool))
}
