//! Swap quote orchestration
//!
//! Resolves the pool, widens slippage for large trades, simulates the swap
//! over the next three tick arrays and returns an unsigned swap transaction.

use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::{
    quote::{quote_exact_in, swap_tick_array_starts, SwapQuote, TickSequence},
    slippage::effective_slippage_bps,
    tiers::find_pool,
};
use crate::core::{ChainReader, PoolSnapshot, ServiceError, ServiceResult, TokenSide};
use crate::math::{apply_slippage_floor, BPS_DENOMINATOR, MAX_SQRT_PRICE, MIN_SQRT_PRICE};
use crate::pool::decode_pool_snapshot;
use crate::position::service::parse_pubkey;
use crate::transaction::{encode_base64, finalize, InstructionPlan};
use crate::whirlpool::{
    instructions::SwapArgs, ProgramAccount, SwapAccounts, TickArray, WhirlpoolInstructionBuilder,
    TOKEN_2022_PROGRAM_ID,
};

pub const ROUTE_ORCA: &str = "ORCA";

pub const DEFAULT_SLIPPAGE_BPS: u16 = 50;

/// Request body for `POST /api/swap/quote`
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapQuoteRequest {
    pub input_mint: String,
    pub output_mint: String,
    /// Raw input amount in base units
    pub amount: String,
    /// Falls back to the service default when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slippage_bps: Option<u16>,
    pub user_pubkey: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapQuoteResponse {
    pub route: String,
    pub input_mint: String,
    pub output_mint: String,
    pub in_amount: String,
    pub out_amount: String,
    pub other_amount_threshold: String,
    pub price_impact: String,
    /// Slippage actually applied, after dynamic widening
    pub slippage_bps: u16,
    pub tx: String,
    pub mev_protected: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ValidatedSwap {
    input_mint: Pubkey,
    output_mint: Pubkey,
    amount: u64,
    slippage_bps: u16,
    user: Pubkey,
}

impl SwapQuoteRequest {
    fn validate(&self, default_slippage_bps: u16) -> ServiceResult<ValidatedSwap> {
        let input_mint = parse_pubkey(&self.input_mint, "inputMint")?;
        let output_mint = parse_pubkey(&self.output_mint, "outputMint")?;
        let user = parse_pubkey(&self.user_pubkey, "userPubkey")?;
        if input_mint == output_mint {
            return Err(ServiceError::InvalidRequest(
                "inputMint and outputMint must differ".into(),
            ));
        }

        let amount: u64 = self.amount.trim().parse().map_err(|_| {
            ServiceError::InvalidRequest(format!("Invalid amount: {}", self.amount))
        })?;
        if amount == 0 {
            return Err(ServiceError::InvalidRequest("amount must be greater than zero".into()));
        }
        let slippage_bps = self.slippage_bps.unwrap_or(default_slippage_bps);
        if u64::from(slippage_bps) > BPS_DENOMINATOR {
            return Err(ServiceError::InvalidRequest(format!(
                "slippageBps must be at most {}",
                BPS_DENOMINATOR
            )));
        }

        Ok(ValidatedSwap {
            input_mint,
            output_mint,
            amount,
            slippage_bps,
            user,
        })
    }
}

/// Quotes and builds exact-in swaps
pub struct SwapService {
    chain: Arc<dyn ChainReader>,
    instructions: WhirlpoolInstructionBuilder,
    config_address: Pubkey,
    use_private_relay: bool,
    default_slippage_bps: u16,
}

impl SwapService {
    pub fn new(
        chain: Arc<dyn ChainReader>,
        program_id: Pubkey,
        config_address: Pubkey,
        use_private_relay: bool,
    ) -> Self {
        Self {
            chain,
            instructions: WhirlpoolInstructionBuilder::new(program_id),
            config_address,
            use_private_relay,
            default_slippage_bps: DEFAULT_SLIPPAGE_BPS,
        }
    }

    pub fn with_default_slippage(mut self, slippage_bps: u16) -> Self {
        self.default_slippage_bps = slippage_bps;
        self
    }

    #[instrument(skip(self, request), fields(input = %request.input_mint, output = %request.output_mint))]
    pub async fn quote(&self, request: &SwapQuoteRequest) -> ServiceResult<SwapQuoteResponse> {
        let swap = request.validate(self.default_slippage_bps)?;
        let chain = self.chain.as_ref();
        let program_id = self.instructions.program_id();

        let resolved = find_pool(
            chain,
            self.instructions.pda(),
            &self.config_address,
            &swap.input_mint,
            &swap.output_mint,
        )
        .await?;
        let snapshot = decode_pool_snapshot(chain, &program_id, &resolved.address, &resolved.account).await?;
        ensure_supported(&snapshot)?;

        let a_to_b = match snapshot.side_of(&swap.input_mint) {
            Some(TokenSide::A) => true,
            Some(TokenSide::B) => false,
            None => {
                return Err(ServiceError::Quote(format!(
                    "Pool {} does not hold input mint {}",
                    resolved.address, swap.input_mint
                )))
            }
        };

        let slippage_bps = effective_slippage_bps(swap.amount, snapshot.pool.liquidity, swap.slippage_bps);
        if slippage_bps != swap.slippage_bps {
            warn!(
                requested = swap.slippage_bps,
                applied = slippage_bps,
                liquidity = %snapshot.pool.liquidity,
                "Large trade relative to pool liquidity, widening slippage"
            );
        }

        let starts = swap_tick_array_starts(&snapshot.pool, a_to_b);
        let pda = self.instructions.pda();
        let tick_array_addresses = starts.map(|start| pda.tick_array(&snapshot.pool.address, start).0);
        let tick_arrays: Vec<TickArray> = chain
            .get_multiple_accounts(&tick_array_addresses)
            .await?
            .iter()
            .flatten()
            .map(|account| TickArray::decode_owned(account, &program_id))
            .collect::<ServiceResult<_>>()?;
        let ticks = TickSequence::new(snapshot.pool.tick_spacing, &starts, &tick_arrays);

        let quote = quote_exact_in(&snapshot.pool, &ticks, swap.amount, a_to_b)?;
        let other_amount_threshold = apply_slippage_floor(quote.amount_out, slippage_bps);

        let tx = self
            .build_transaction(&swap, &snapshot, &quote, other_amount_threshold, tick_array_addresses)
            .await?;

        info!(
            pool = %snapshot.pool.address,
            amount_in = quote.amount_in,
            amount_out = quote.amount_out,
            slippage_bps,
            "Built swap quote"
        );

        Ok(SwapQuoteResponse {
            route: ROUTE_ORCA.to_string(),
            input_mint: swap.input_mint.to_string(),
            output_mint: swap.output_mint.to_string(),
            in_amount: swap.amount.to_string(),
            out_amount: quote.amount_out.to_string(),
            other_amount_threshold: other_amount_threshold.to_string(),
            price_impact: quote.price_impact_pct(),
            slippage_bps,
            tx,
            mev_protected: self.use_private_relay,
        })
    }

    async fn build_transaction(
        &self,
        swap: &ValidatedSwap,
        snapshot: &PoolSnapshot,
        quote: &SwapQuote,
        other_amount_threshold: u64,
        tick_arrays: [Pubkey; 3],
    ) -> ServiceResult<String> {
        let (wrap_a, wrap_b) = if quote.a_to_b {
            (swap.amount, 0)
        } else {
            (0, swap.amount)
        };

        let mut plan = InstructionPlan::new();
        let owner_a = plan.prepare_token_account(&swap.user, &snapshot.token_a, wrap_a)?;
        let owner_b = plan.prepare_token_account(&swap.user, &snapshot.token_b, wrap_b)?;

        let accounts = SwapAccounts {
            token_authority: swap.user,
            token_owner_account_a: owner_a,
            token_owner_account_b: owner_b,
            tick_arrays,
        };
        let args = SwapArgs {
            amount: swap.amount,
            other_amount_threshold,
            sqrt_price_limit: if quote.a_to_b { MIN_SQRT_PRICE } else { MAX_SQRT_PRICE },
            amount_specified_is_input: true,
            a_to_b: quote.a_to_b,
        };
        plan.push(self.instructions.swap(&snapshot.pool, &accounts, args)?);

        let transaction = finalize(self.chain.as_ref(), &swap.user, &plan.into_instructions(), &[]).await?;
        encode_base64(&transaction)
    }
}

fn ensure_supported(snapshot: &PoolSnapshot) -> ServiceResult<()> {
    if snapshot.token_a.token_program == TOKEN_2022_PROGRAM_ID
        || snapshot.token_b.token_program == TOKEN_2022_PROGRAM_ID
    {
        return Err(ServiceError::Unsupported(
            "Swaps through Token-2022 pools are not supported".into(),
        ));
    }
    Ok(())
}
