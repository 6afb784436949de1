//! Whirlpool instruction encoders
//!
//! Instruction data is the Anchor discriminator (`sha256("global:<name>")[..8]`)
//! followed by the Borsh encoded arguments. Account order follows the program IDL.

use anchor_lang::{AnchorDeserialize, AnchorSerialize};
use solana_sdk::{
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
    system_program, sysvar,
};
use spl_associated_token_account::get_associated_token_address;

use super::pda::PdaBuilder;
use crate::core::{PoolState, ServiceError, ServiceResult, TickRange};

const OPEN_POSITION_DISCRIMINATOR: [u8; 8] = [135, 128, 47, 77, 15, 152, 240, 49];
const INCREASE_LIQUIDITY_DISCRIMINATOR: [u8; 8] = [46, 156, 243, 118, 13, 205, 251, 178];
const INITIALIZE_TICK_ARRAY_DISCRIMINATOR: [u8; 8] = [11, 188, 193, 214, 141, 91, 149, 184];
const SWAP_DISCRIMINATOR: [u8; 8] = [248, 198, 158, 145, 225, 117, 135, 200];

/// Instruction arguments with their discriminator
pub trait InstructionArgs: AnchorSerialize {
    const DISCRIMINATOR: [u8; 8];

    fn build_data(&self) -> ServiceResult<Vec<u8>> {
        let mut data = Self::DISCRIMINATOR.to_vec();
        self.serialize(&mut data)
            .map_err(|e| ServiceError::Serialization(e.to_string()))?;
        Ok(data)
    }
}

macro_rules! impl_instruction {
    ($name:ident, $discriminator:expr) => {
        impl InstructionArgs for $name {
            const DISCRIMINATOR: [u8; 8] = $discriminator;
        }
    };
}

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct OpenPositionBumps {
    pub position_bump: u8,
}

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct OpenPositionArgs {
    pub bumps: OpenPositionBumps,
    pub tick_lower_index: i32,
    pub tick_upper_index: i32,
}

impl_instruction!(OpenPositionArgs, OPEN_POSITION_DISCRIMINATOR);

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct IncreaseLiquidityArgs {
    pub liquidity_amount: u128,
    pub token_max_a: u64,
    pub token_max_b: u64,
}

impl_instruction!(IncreaseLiquidityArgs, INCREASE_LIQUIDITY_DISCRIMINATOR);

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct InitializeTickArrayArgs {
    pub start_tick_index: i32,
}

impl_instruction!(InitializeTickArrayArgs, INITIALIZE_TICK_ARRAY_DISCRIMINATOR);

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct SwapArgs {
    pub amount: u64,
    pub other_amount_threshold: u64,
    pub sqrt_price_limit: u128,
    pub amount_specified_is_input: bool,
    pub a_to_b: bool,
}

impl_instruction!(SwapArgs, SWAP_DISCRIMINATOR);

/// Accumulates account metas in program order
struct AccountList {
    accounts: Vec<AccountMeta>,
}

impl AccountList {
    fn new() -> Self {
        Self { accounts: Vec::new() }
    }

    fn signer(mut self, pubkey: Pubkey) -> Self {
        self.accounts.push(AccountMeta::new(pubkey, true));
        self
    }

    fn readonly_signer(mut self, pubkey: Pubkey) -> Self {
        self.accounts.push(AccountMeta::new_readonly(pubkey, true));
        self
    }

    fn writable(mut self, pubkey: Pubkey) -> Self {
        self.accounts.push(AccountMeta::new(pubkey, false));
        self
    }

    fn readonly(mut self, pubkey: Pubkey) -> Self {
        self.accounts.push(AccountMeta::new_readonly(pubkey, false));
        self
    }

    fn build(self, program_id: Pubkey, data: Vec<u8>) -> Instruction {
        Instruction {
            program_id,
            accounts: self.accounts,
            data,
        }
    }
}

/// Accounts for `increase_liquidity` that are not derived from the pool
#[derive(Debug, Clone)]
pub struct IncreaseLiquidityAccounts {
    pub position_authority: Pubkey,
    pub position: Pubkey,
    pub position_token_account: Pubkey,
    pub token_owner_account_a: Pubkey,
    pub token_owner_account_b: Pubkey,
    pub tick_array_lower: Pubkey,
    pub tick_array_upper: Pubkey,
}

/// Accounts for `swap` that are not derived from the pool
#[derive(Debug, Clone)]
pub struct SwapAccounts {
    pub token_authority: Pubkey,
    pub token_owner_account_a: Pubkey,
    pub token_owner_account_b: Pubkey,
    pub tick_arrays: [Pubkey; 3],
}

/// Builds Whirlpool program instructions
pub struct WhirlpoolInstructionBuilder {
    pda: PdaBuilder,
}

impl WhirlpoolInstructionBuilder {
    pub fn new(program_id: Pubkey) -> Self {
        Self {
            pda: PdaBuilder::new(program_id),
        }
    }

    pub fn program_id(&self) -> Pubkey {
        self.pda.program_id
    }

    pub fn pda(&self) -> &PdaBuilder {
        &self.pda
    }

    /// Open a position NFT for `owner` over `range`. The position mint must sign.
    pub fn open_position(
        &self,
        funder: Pubkey,
        owner: Pubkey,
        whirlpool: Pubkey,
        position_mint: Pubkey,
        range: TickRange,
    ) -> ServiceResult<Instruction> {
        let (position, position_bump) = self.pda.position(&position_mint);
        let position_token_account = get_associated_token_address(&owner, &position_mint);

        let args = OpenPositionArgs {
            bumps: OpenPositionBumps { position_bump },
            tick_lower_index: range.lower(),
            tick_upper_index: range.upper(),
        };

        Ok(AccountList::new()
            .signer(funder)
            .readonly(owner)
            .writable(position)
            .signer(position_mint)
            .writable(position_token_account)
            .readonly(whirlpool)
            .readonly(spl_token::id())
            .readonly(system_program::id())
            .readonly(sysvar::rent::id())
            .readonly(spl_associated_token_account::id())
            .build(self.program_id(), args.build_data()?))
    }

    pub fn increase_liquidity(
        &self,
        pool: &PoolState,
        accounts: &IncreaseLiquidityAccounts,
        args: IncreaseLiquidityArgs,
    ) -> ServiceResult<Instruction> {
        Ok(AccountList::new()
            .writable(pool.address)
            .readonly(spl_token::id())
            .readonly_signer(accounts.position_authority)
            .writable(accounts.position)
            .readonly(accounts.position_token_account)
            .writable(accounts.token_owner_account_a)
            .writable(accounts.token_owner_account_b)
            .writable(pool.token_vault_a)
            .writable(pool.token_vault_b)
            .writable(accounts.tick_array_lower)
            .writable(accounts.tick_array_upper)
            .build(self.program_id(), args.build_data()?))
    }

    pub fn initialize_tick_array(
        &self,
        whirlpool: Pubkey,
        funder: Pubkey,
        start_tick_index: i32,
    ) -> ServiceResult<Instruction> {
        let (tick_array, _) = self.pda.tick_array(&whirlpool, start_tick_index);
        let args = InitializeTickArrayArgs { start_tick_index };

        Ok(AccountList::new()
            .readonly(whirlpool)
            .signer(funder)
            .writable(tick_array)
            .readonly(system_program::id())
            .build(self.program_id(), args.build_data()?))
    }

    pub fn swap(
        &self,
        pool: &PoolState,
        accounts: &SwapAccounts,
        args: SwapArgs,
    ) -> ServiceResult<Instruction> {
        let (oracle, _) = self.pda.oracle(&pool.address);
        let [tick_array_0, tick_array_1, tick_array_2] = accounts.tick_arrays;

        Ok(AccountList::new()
            .readonly(spl_token::id())
            .readonly_signer(accounts.token_authority)
            .writable(pool.address)
            .writable(accounts.token_owner_account_a)
            .writable(pool.token_vault_a)
            .writable(accounts.token_owner_account_b)
            .writable(pool.token_vault_b)
            .writable(tick_array_0)
            .writable(tick_array_1)
            .writable(tick_array_2)
            .writable(oracle)
            .build(self.program_id(), args.build_data()?))
    }
}
