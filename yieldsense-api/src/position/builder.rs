//! Position transaction assembly
//!
//! Both paths emit, in order: ATA creation and SOL wrapping for both tokens,
//! tick array initialization where missing, `open_position` (new path only),
//! `increase_liquidity`, then wSOL cleanup.

use solana_sdk::{
    pubkey::Pubkey,
    signature::Keypair,
    signer::Signer,
    transaction::Transaction,
};
use spl_associated_token_account::get_associated_token_address;
use tracing::info;

use crate::core::{ChainReader, PoolSnapshot, PositionState, ServiceError, ServiceResult, TickRange};
use crate::math::{self, LiquidityQuote};
use crate::transaction::{finalize, InstructionPlan};
use crate::whirlpool::{
    instructions::IncreaseLiquidityArgs, IncreaseLiquidityAccounts, WhirlpoolInstructionBuilder,
    TOKEN_2022_PROGRAM_ID,
};

/// Output of the position transaction builder
#[derive(Debug)]
pub struct BuiltPositionTransaction {
    pub transaction: Transaction,
    pub position_mint: Pubkey,
    pub is_new_position: bool,
}

pub struct PositionTransactionBuilder<'a> {
    chain: &'a dyn ChainReader,
    instructions: &'a WhirlpoolInstructionBuilder,
}

impl<'a> PositionTransactionBuilder<'a> {
    pub fn new(chain: &'a dyn ChainReader, instructions: &'a WhirlpoolInstructionBuilder) -> Self {
        Self { chain, instructions }
    }

    /// Open a fresh position NFT over `range` and deposit the quoted liquidity
    pub async fn open_new_position(
        &self,
        wallet: &Pubkey,
        snapshot: &PoolSnapshot,
        range: TickRange,
        quote: &LiquidityQuote,
    ) -> ServiceResult<BuiltPositionTransaction> {
        ensure_supported(snapshot)?;

        let position_mint = Keypair::new();
        let mint = position_mint.pubkey();
        let (position, _) = self.instructions.pda().position(&mint);
        let position_token_account = get_associated_token_address(wallet, &mint);

        let mut plan = self.prepare(wallet, snapshot, range, quote).await?;
        plan.plan.push(self.instructions.open_position(
            *wallet,
            *wallet,
            snapshot.pool.address,
            mint,
            range,
        )?);
        plan.push_increase(
            self.instructions,
            snapshot,
            wallet,
            position,
            position_token_account,
            quote,
        )?;

        let transaction = finalize(
            self.chain,
            wallet,
            &plan.plan.into_instructions(),
            &[&position_mint],
        )
        .await?;

        info!(position_mint = %mint, pool = %snapshot.pool.address, "Built open position transaction");
        Ok(BuiltPositionTransaction {
            transaction,
            position_mint: mint,
            is_new_position: true,
        })
    }

    /// Add the quoted liquidity to an existing position
    pub async fn increase_liquidity(
        &self,
        wallet: &Pubkey,
        snapshot: &PoolSnapshot,
        position: &PositionState,
        quote: &LiquidityQuote,
    ) -> ServiceResult<BuiltPositionTransaction> {
        ensure_supported(snapshot)?;

        let range = TickRange::new(position.tick_lower_index, position.tick_upper_index)?;
        let mut plan = self.prepare(wallet, snapshot, range, quote).await?;
        plan.push_increase(
            self.instructions,
            snapshot,
            wallet,
            position.address,
            position.token_account,
            quote,
        )?;

        let transaction = finalize(self.chain, wallet, &plan.plan.into_instructions(), &[]).await?;

        // Bundled positions share the bundle mint, so they are identified by address
        let position_mint = if position.is_bundled() {
            position.address
        } else {
            position.position_mint
        };
        info!(position_mint = %position_mint, pool = %snapshot.pool.address, "Built increase liquidity transaction");
        Ok(BuiltPositionTransaction {
            transaction,
            position_mint,
            is_new_position: false,
        })
    }

    /// Token accounts and tick arrays shared by both paths
    async fn prepare(
        &self,
        wallet: &Pubkey,
        snapshot: &PoolSnapshot,
        range: TickRange,
        quote: &LiquidityQuote,
    ) -> ServiceResult<PreparedDeposit> {
        let mut plan = InstructionPlan::new();
        let owner_a = plan.prepare_token_account(wallet, &snapshot.token_a, quote.token_max_a)?;
        let owner_b = plan.prepare_token_account(wallet, &snapshot.token_b, quote.token_max_b)?;

        let pool = &snapshot.pool;
        let lower_start = math::tick_array_start(range.lower(), pool.tick_spacing);
        let upper_start = math::tick_array_start(range.upper(), pool.tick_spacing);
        let pda = self.instructions.pda();
        let tick_array_lower = pda.tick_array(&pool.address, lower_start).0;
        let tick_array_upper = pda.tick_array(&pool.address, upper_start).0;

        let mut starts = vec![(lower_start, tick_array_lower)];
        if upper_start != lower_start {
            starts.push((upper_start, tick_array_upper));
        }
        let addresses: Vec<Pubkey> = starts.iter().map(|(_, address)| *address).collect();
        let existing = self.chain.get_multiple_accounts(&addresses).await?;

        for ((start, _), account) in starts.iter().zip(existing) {
            if account.is_none() {
                plan.push(self.instructions.initialize_tick_array(pool.address, *wallet, *start)?);
            }
        }

        Ok(PreparedDeposit {
            plan,
            owner_a,
            owner_b,
            tick_array_lower,
            tick_array_upper,
        })
    }
}

struct PreparedDeposit {
    plan: InstructionPlan,
    owner_a: Pubkey,
    owner_b: Pubkey,
    tick_array_lower: Pubkey,
    tick_array_upper: Pubkey,
}

impl PreparedDeposit {
    fn push_increase(
        &mut self,
        instructions: &WhirlpoolInstructionBuilder,
        snapshot: &PoolSnapshot,
        wallet: &Pubkey,
        position: Pubkey,
        position_token_account: Pubkey,
        quote: &LiquidityQuote,
    ) -> ServiceResult<()> {
        let accounts = IncreaseLiquidityAccounts {
            position_authority: *wallet,
            position,
            position_token_account,
            token_owner_account_a: self.owner_a,
            token_owner_account_b: self.owner_b,
            tick_array_lower: self.tick_array_lower,
            tick_array_upper: self.tick_array_upper,
        };
        let args = IncreaseLiquidityArgs {
            liquidity_amount: quote.liquidity_delta,
            token_max_a: quote.token_max_a,
            token_max_b: quote.token_max_b,
        };
        self.plan
            .push(instructions.increase_liquidity(&snapshot.pool, &accounts, args)?);
        Ok(())
    }
}

fn ensure_supported(snapshot: &PoolSnapshot) -> ServiceResult<()> {
    for token in [&snapshot.token_a, &snapshot.token_b] {
        if token.token_program == TOKEN_2022_PROGRAM_ID {
            return Err(ServiceError::Unsupported(format!(
                "Token-2022 mint {} is not supported",
                token.mint
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::TokenInfo;
    use crate::testing::{install_tick_array, ChainCall, MockChain, PoolFixture};
    use crate::whirlpool::ORCA_WHIRLPOOL_PROGRAM_ID;

    fn quote() -> LiquidityQuote {
        LiquidityQuote {
            liquidity_delta: 1_000,
            token_est_a: 10,
            token_est_b: 10,
            token_max_a: 11,
            token_max_b: 11,
        }
    }

    fn snapshot_of(pool: &crate::testing::InstalledPool) -> PoolSnapshot {
        PoolSnapshot {
            pool: pool.state.clone(),
            token_a: TokenInfo { mint: pool.state.token_mint_a, decimals: 9, token_program: spl_token::id() },
            token_b: TokenInfo { mint: pool.state.token_mint_b, decimals: 6, token_program: spl_token::id() },
        }
    }

    #[tokio::test]
    async fn test_missing_tick_arrays_are_initialized_once() {
        let chain = MockChain::new();
        let pool = PoolFixture::new().install(&chain);
        let instructions = WhirlpoolInstructionBuilder::new(ORCA_WHIRLPOOL_PROGRAM_ID);
        let builder = PositionTransactionBuilder::new(&chain, &instructions);
        let wallet = Pubkey::new_unique();

        // Both bounds live in the array starting at 0
        let range = TickRange::new(64, 128).unwrap();
        let built = builder
            .open_new_position(&wallet, &snapshot_of(&pool), range, &quote())
            .await
            .unwrap();

        let message = &built.transaction.message;
        let init_count = message
            .instructions
            .iter()
            .filter(|ix| {
                message.account_keys[ix.program_id_index as usize] == ORCA_WHIRLPOOL_PROGRAM_ID
                    && ix.data[..8] == [11, 188, 193, 214, 141, 91, 149, 184]
            })
            .count();
        assert_eq!(init_count, 1);
        assert!(built.is_new_position);
    }

    #[tokio::test]
    async fn test_existing_tick_arrays_are_not_initialized() {
        let chain = MockChain::new();
        let pool = PoolFixture::new().install(&chain);
        install_tick_array(&chain, &pool, -5632, &[]);
        install_tick_array(&chain, &pool, 0, &[]);
        let instructions = WhirlpoolInstructionBuilder::new(ORCA_WHIRLPOOL_PROGRAM_ID);
        let builder = PositionTransactionBuilder::new(&chain, &instructions);
        let wallet = Pubkey::new_unique();

        let range = TickRange::new(-128, 128).unwrap();
        let built = builder
            .open_new_position(&wallet, &snapshot_of(&pool), range, &quote())
            .await
            .unwrap();

        // 2 ATA creations, open_position, increase_liquidity
        assert_eq!(built.transaction.message.instructions.len(), 4);
    }

    #[tokio::test]
    async fn test_blockhash_is_fetched_last() {
        let chain = MockChain::new();
        let pool = PoolFixture::new().install(&chain);
        let instructions = WhirlpoolInstructionBuilder::new(ORCA_WHIRLPOOL_PROGRAM_ID);
        let builder = PositionTransactionBuilder::new(&chain, &instructions);
        let wallet = Pubkey::new_unique();

        builder
            .open_new_position(&wallet, &snapshot_of(&pool), TickRange::new(-64, 64).unwrap(), &quote())
            .await
            .unwrap();

        assert_eq!(chain.calls().last(), Some(&ChainCall::GetLatestBlockhash));
    }

    #[tokio::test]
    async fn test_token_2022_pools_are_unsupported() {
        let chain = MockChain::new();
        let pool = PoolFixture::new().install(&chain);
        let mut snapshot = snapshot_of(&pool);
        snapshot.token_b.token_program = TOKEN_2022_PROGRAM_ID;
        let instructions = WhirlpoolInstructionBuilder::new(ORCA_WHIRLPOOL_PROGRAM_ID);
        let builder = PositionTransactionBuilder::new(&chain, &instructions);

        let err = builder
            .open_new_position(&Pubkey::new_unique(), &snapshot, TickRange::new(-64, 64).unwrap(), &quote())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Unsupported(_)));
        assert!(chain.calls().is_empty());
    }
}
