//! Create-or-deposit orchestration

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use std::{str::FromStr, sync::Arc};
use tracing::{info, instrument};

use super::{
    builder::PositionTransactionBuilder, deposit::plan_deposit, discovery::fetch_owned_positions,
    resolver::PositionIndex,
};
use crate::core::{ChainReader, PoolSnapshot, ServiceError, ServiceResult, TickRange};
use crate::math;
use crate::pool::load_pool_snapshot;
use crate::transaction::encode_base64;
use crate::whirlpool::WhirlpoolInstructionBuilder;

/// Request body for `POST /api/positions/create-or-deposit`
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrDepositRequest {
    pub wallet: String,
    pub whirlpool: String,
    pub tick_lower: Option<i32>,
    pub tick_upper: Option<i32>,
    pub price_lower: Option<String>,
    pub price_upper: Option<String>,
    /// Human amount of token A, e.g. `"1.25"`
    pub amount_a: String,
    /// Accepted for compatibility; the paired amount always comes from the quote
    pub amount_b: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrDepositResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position_mint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serialized_transaction: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub is_new_position: bool,
}

impl CreateOrDepositResponse {
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            position_mint: None,
            serialized_transaction: None,
            error: Some(error.into()),
            is_new_position: false,
        }
    }
}

/// How the caller described the target range
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RangeInput {
    /// Raw tick indices, snapped to the pool's spacing after the pool loads
    Ticks(TickRange),
    /// Human prices (token B per token A)
    Prices { lower: Decimal, upper: Decimal },
}

/// A request that passed every check possible without touching the network
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedDeposit {
    pub wallet: Pubkey,
    pub whirlpool: Pubkey,
    pub range: RangeInput,
    pub amount_a: Decimal,
}

pub(crate) fn parse_pubkey(value: &str, field: &str) -> ServiceResult<Pubkey> {
    Pubkey::from_str(value.trim())
        .map_err(|_| ServiceError::InvalidRequest(format!("Invalid {} address: {}", field, value)))
}

fn parse_amount(value: &str, field: &str) -> ServiceResult<Decimal> {
    let amount = Decimal::from_str(value.trim())
        .map_err(|_| ServiceError::InvalidRequest(format!("Invalid {}: {}", field, value)))?;
    if amount.is_sign_negative() {
        return Err(ServiceError::InvalidRequest(format!("{} must not be negative", field)));
    }
    Ok(amount)
}

impl CreateOrDepositRequest {
    pub fn validate(&self) -> ServiceResult<ValidatedDeposit> {
        let wallet = parse_pubkey(&self.wallet, "wallet")?;
        let whirlpool = parse_pubkey(&self.whirlpool, "whirlpool")?;

        let amount_a = parse_amount(&self.amount_a, "amountA")?;
        if amount_a.is_zero() {
            return Err(ServiceError::InvalidRequest("amountA must be greater than zero".into()));
        }
        if let Some(amount_b) = &self.amount_b {
            parse_amount(amount_b, "amountB")?;
        }

        let ticks = (self.tick_lower, self.tick_upper);
        let prices = (self.price_lower.as_deref(), self.price_upper.as_deref());
        let range = match (ticks, prices) {
            ((Some(lower), Some(upper)), (None, None)) => RangeInput::Ticks(TickRange::new(lower, upper)?),
            ((None, None), (Some(lower), Some(upper))) => RangeInput::Prices {
                lower: parse_amount(lower, "priceLower")?,
                upper: parse_amount(upper, "priceUpper")?,
            },
            ((None, None), (None, None)) => {
                return Err(ServiceError::InvalidRequest(
                    "Must provide either tick indices or prices".into(),
                ))
            }
            _ => {
                return Err(ServiceError::InvalidRequest(
                    "Provide exactly one complete pair: tickLower/tickUpper or priceLower/priceUpper".into(),
                ))
            }
        };

        Ok(ValidatedDeposit {
            wallet,
            whirlpool,
            range,
            amount_a,
        })
    }
}

/// Snap the requested range onto the pool's initializable ticks
pub fn resolve_range(input: &RangeInput, snapshot: &PoolSnapshot) -> ServiceResult<TickRange> {
    let spacing = snapshot.pool.tick_spacing;
    let (lower, upper) = match input {
        RangeInput::Ticks(range) => (range.lower(), range.upper()),
        RangeInput::Prices { lower, upper } => {
            let (decimals_a, decimals_b) = (snapshot.token_a.decimals, snapshot.token_b.decimals);
            (
                math::price_to_tick(*lower, decimals_a, decimals_b)?,
                math::price_to_tick(*upper, decimals_a, decimals_b)?,
            )
        }
    };
    TickRange::new(
        math::snap_to_spacing(lower, spacing),
        math::snap_to_spacing(upper, spacing),
    )
}

/// Builds create-or-deposit transactions
pub struct PositionService {
    chain: Arc<dyn ChainReader>,
    instructions: WhirlpoolInstructionBuilder,
}

impl PositionService {
    pub fn new(chain: Arc<dyn ChainReader>, program_id: Pubkey) -> Self {
        Self {
            chain,
            instructions: WhirlpoolInstructionBuilder::new(program_id),
        }
    }

    #[instrument(skip(self, request), fields(wallet = %request.wallet, whirlpool = %request.whirlpool))]
    pub async fn create_or_deposit(
        &self,
        request: &CreateOrDepositRequest,
    ) -> ServiceResult<CreateOrDepositResponse> {
        let deposit = request.validate()?;
        let chain = self.chain.as_ref();
        let program_id = self.instructions.program_id();

        let snapshot = load_pool_snapshot(chain, &program_id, &deposit.whirlpool).await?;
        let range = resolve_range(&deposit.range, &snapshot)?;
        let plan = plan_deposit(&snapshot, range, deposit.amount_a)?;

        let owned = fetch_owned_positions(chain, self.instructions.pda(), &deposit.wallet).await?;
        let index = PositionIndex::build(owned);

        let builder = PositionTransactionBuilder::new(chain, &self.instructions);
        let built = match index.find(&deposit.whirlpool, range) {
            Some(existing) => {
                info!(position = %existing.address, "Depositing into existing position");
                builder
                    .increase_liquidity(&deposit.wallet, &snapshot, existing, &plan.quote)
                    .await?
            }
            None => {
                info!(lower = range.lower(), upper = range.upper(), "Opening new position");
                builder
                    .open_new_position(&deposit.wallet, &snapshot, range, &plan.quote)
                    .await?
            }
        };

        Ok(CreateOrDepositResponse {
            success: true,
            position_mint: Some(built.position_mint.to_string()),
            serialized_transaction: Some(encode_base64(&built.transaction)?),
            error: None,
            is_new_position: built.is_new_position,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> CreateOrDepositRequest {
        CreateOrDepositRequest {
            wallet: Pubkey::new_unique().to_string(),
            whirlpool: Pubkey::new_unique().to_string(),
            amount_a: "1.5".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_requires_a_range() {
        let err = request().validate().unwrap_err();
        assert_eq!(err.to_string(), "Must provide either tick indices or prices");
    }

    #[test]
    fn test_rejects_mixed_range_inputs() {
        let mut req = request();
        req.tick_lower = Some(-64);
        req.price_upper = Some("2".into());
        assert!(matches!(req.validate(), Err(ServiceError::InvalidRequest(_))));

        req.tick_upper = Some(64);
        req.price_lower = Some("1".into());
        assert!(matches!(req.validate(), Err(ServiceError::InvalidRequest(_))));
    }

    #[test]
    fn test_inverted_ticks_fail_validation() {
        let mut req = request();
        req.tick_lower = Some(128);
        req.tick_upper = Some(-128);
        assert!(matches!(
            req.validate(),
            Err(ServiceError::InvalidTickRange { lower: 128, upper: -128 })
        ));
    }

    #[test]
    fn test_rejects_bad_amounts() {
        let mut req = request();
        req.tick_lower = Some(-64);
        req.tick_upper = Some(64);
        req.amount_a = "abc".into();
        assert!(req.validate().is_err());
        req.amount_a = "0".into();
        assert!(req.validate().is_err());
        req.amount_a = "-1".into();
        assert!(req.validate().is_err());
        req.amount_a = "1".into();
        req.amount_b = Some("x".into());
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_response_omits_empty_fields() {
        let json = serde_json::to_value(CreateOrDepositResponse::failure("boom")).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "boom");
        assert_eq!(json["isNewPosition"], false);
        assert!(json.get("positionMint").is_none());
    }
}
