//! Domain types shared across services

use serde::{Deserialize, Serialize};
use solana_sdk::{hash::Hash, pubkey::Pubkey};

use super::error::{ServiceError, ServiceResult};

/// A blockhash together with the last block height at which it is valid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatestBlockhash {
    pub blockhash: Hash,
    pub last_valid_block_height: u64,
}

/// Which side of a pool a token sits on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenSide {
    A,
    B,
}

/// A validated tick range with `lower < upper`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TickRange {
    lower: i32,
    upper: i32,
}

impl TickRange {
    pub fn new(lower: i32, upper: i32) -> ServiceResult<Self> {
        if lower >= upper {
            return Err(ServiceError::InvalidTickRange { lower, upper });
        }
        Ok(Self { lower, upper })
    }

    pub fn lower(&self) -> i32 {
        self.lower
    }

    pub fn upper(&self) -> i32 {
        self.upper
    }
}

/// Mint metadata needed for amount conversion and account derivation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenInfo {
    pub mint: Pubkey,
    pub decimals: u8,
    pub token_program: Pubkey,
}

/// Decoded Whirlpool state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolState {
    pub address: Pubkey,
    pub whirlpools_config: Pubkey,
    pub tick_spacing: u16,
    /// Fee rate in hundredths of a basis point
    pub fee_rate: u16,
    pub liquidity: u128,
    pub sqrt_price: u128,
    pub tick_current_index: i32,
    pub token_mint_a: Pubkey,
    pub token_vault_a: Pubkey,
    pub token_mint_b: Pubkey,
    pub token_vault_b: Pubkey,
}

/// A pool together with both of its token mints, read in one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolSnapshot {
    pub pool: PoolState,
    pub token_a: TokenInfo,
    pub token_b: TokenInfo,
}

impl PoolSnapshot {
    pub fn token(&self, side: TokenSide) -> &TokenInfo {
        match side {
            TokenSide::A => &self.token_a,
            TokenSide::B => &self.token_b,
        }
    }

    /// Side of the pool holding `mint`, if any
    pub fn side_of(&self, mint: &Pubkey) -> Option<TokenSide> {
        if *mint == self.token_a.mint {
            Some(TokenSide::A)
        } else if *mint == self.token_b.mint {
            Some(TokenSide::B)
        } else {
            None
        }
    }
}

/// Location of a position inside a position bundle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BundleSlot {
    pub bundle_mint: Pubkey,
    pub bundle_index: u16,
}

/// A position owned by a wallet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionState {
    /// Position account address
    pub address: Pubkey,
    pub position_mint: Pubkey,
    pub whirlpool: Pubkey,
    pub liquidity: u128,
    pub tick_lower_index: i32,
    pub tick_upper_index: i32,
    pub fee_owed_a: u64,
    pub fee_owed_b: u64,
    /// Token account holding the position NFT (or the bundle NFT)
    pub token_account: Pubkey,
    pub bundle: Option<BundleSlot>,
}

impl PositionState {
    pub fn is_bundled(&self) -> bool {
        self.bundle.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_range_rejects_empty_and_inverted() {
        assert!(TickRange::new(-64, 64).is_ok());
        assert!(matches!(
            TickRange::new(64, 64),
            Err(ServiceError::InvalidTickRange { lower: 64, upper: 64 })
        ));
        assert!(matches!(
            TickRange::new(128, -128),
            Err(ServiceError::InvalidTickRange { .. })
        ));
    }
}
