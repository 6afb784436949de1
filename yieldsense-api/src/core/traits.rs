//! Ledger read port
//!
//! Services only ever read from the chain: pool and position accounts, mint
//! accounts and a recent blockhash. Signing and submission happen in the
//! client wallet.

use async_trait::async_trait;
use solana_sdk::{account::Account, pubkey::Pubkey};

use super::error::ServiceResult;
use super::types::LatestBlockhash;

/// Read-only access to the ledger
#[async_trait]
pub trait ChainReader: Send + Sync {
    /// Fetch a single account, `None` if it does not exist
    async fn get_account(&self, address: &Pubkey) -> ServiceResult<Option<Account>>;

    /// Fetch many accounts at once, preserving the order of `addresses`
    async fn get_multiple_accounts(&self, addresses: &[Pubkey]) -> ServiceResult<Vec<Option<Account>>>;

    /// List the token accounts of `owner` under the given token program
    async fn get_token_accounts_by_owner(
        &self,
        owner: &Pubkey,
        token_program: &Pubkey,
    ) -> ServiceResult<Vec<(Pubkey, Account)>>;

    /// Fetch the most recent blockhash
    async fn get_latest_blockhash(&self) -> ServiceResult<LatestBlockhash>;
}
