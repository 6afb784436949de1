//! Unsigned transaction assembly
//!
//! Token account preparation (idempotent ATA creation, native SOL
//! wrapping), blockhash attachment, partial signing with ephemeral keypairs
//! and the bincode + base64 wire encoding handed to the client wallet.

use base64::Engine;
use solana_sdk::{
    instruction::Instruction,
    message::Message,
    pubkey::Pubkey,
    signature::Keypair,
    system_instruction,
    transaction::Transaction,
};
use spl_associated_token_account::{
    get_associated_token_address_with_program_id,
    instruction::create_associated_token_account_idempotent,
};
use tracing::debug;

use crate::core::{ChainReader, ServiceError, ServiceResult, TokenInfo};

/// Instructions accumulated around a program call
///
/// `setup` runs before the main instructions, `cleanup` after them.
#[derive(Debug, Default)]
pub struct InstructionPlan {
    pub setup: Vec<Instruction>,
    pub main: Vec<Instruction>,
    pub cleanup: Vec<Instruction>,
}

impl InstructionPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ensure `owner` has an associated token account for `token`, funding it
    /// with `wrap_lamports` when the mint is wrapped SOL.
    ///
    /// Returns the token account address.
    pub fn prepare_token_account(
        &mut self,
        owner: &Pubkey,
        token: &TokenInfo,
        wrap_lamports: u64,
    ) -> ServiceResult<Pubkey> {
        let account =
            get_associated_token_address_with_program_id(owner, &token.mint, &token.token_program);

        self.setup.push(create_associated_token_account_idempotent(
            owner,
            owner,
            &token.mint,
            &token.token_program,
        ));

        if token.mint == spl_token::native_mint::id() {
            if wrap_lamports > 0 {
                self.setup
                    .push(system_instruction::transfer(owner, &account, wrap_lamports));
                self.setup.push(
                    spl_token::instruction::sync_native(&spl_token::id(), &account)
                        .map_err(|e| ServiceError::Serialization(e.to_string()))?,
                );
            }
            self.cleanup.push(
                spl_token::instruction::close_account(
                    &spl_token::id(),
                    &account,
                    owner,
                    owner,
                    &[],
                )
                .map_err(|e| ServiceError::Serialization(e.to_string()))?,
            );
        }

        Ok(account)
    }

    pub fn push(&mut self, instruction: Instruction) {
        self.main.push(instruction);
    }

    pub fn into_instructions(self) -> Vec<Instruction> {
        let mut instructions = self.setup;
        instructions.extend(self.main);
        instructions.extend(self.cleanup);
        instructions
    }
}

/// Attach a fresh blockhash and the fee payer, then partially sign with
/// any ephemeral keypairs. The wallet signature is left for the client.
pub async fn finalize(
    chain: &dyn ChainReader,
    fee_payer: &Pubkey,
    instructions: &[Instruction],
    signers: &[&Keypair],
) -> ServiceResult<Transaction> {
    let latest = chain.get_latest_blockhash().await?;
    debug!(
        blockhash = %latest.blockhash,
        last_valid_block_height = latest.last_valid_block_height,
        "Attaching blockhash"
    );

    let message = Message::new(instructions, Some(fee_payer));
    let mut transaction = Transaction::new_unsigned(message);

    if signers.is_empty() {
        transaction.message.recent_blockhash = latest.blockhash;
    } else {
        transaction
            .try_partial_sign(signers, latest.blockhash)
            .map_err(|e| ServiceError::Other(anyhow::anyhow!("Failed to sign transaction: {}", e)))?;
    }

    Ok(transaction)
}

/// Serialize a transaction for the client: bincode, then standard base64
pub fn encode_base64(transaction: &Transaction) -> ServiceResult<String> {
    let serialized = bincode::serialize(transaction)?;
    Ok(base64::engine::general_purpose::STANDARD.encode(serialized))
}

pub fn decode_base64(encoded: &str) -> ServiceResult<Transaction> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .map_err(|e| ServiceError::Serialization(e.to_string()))?;
    Ok(bincode::deserialize(&bytes)?)
}
