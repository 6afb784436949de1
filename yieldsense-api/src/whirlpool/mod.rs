//! Orca Whirlpools on-chain program bindings
//!
//! Account layouts, program-derived addresses and instruction encoders for the
//! subset of the Whirlpool program used by the position and swap services.

pub mod accounts;
pub mod instructions;
pub mod pda;

use solana_sdk::{pubkey, pubkey::Pubkey};

pub use accounts::{Position, PositionBundle, ProgramAccount, Tick, TickArray, Whirlpool};
pub use instructions::{IncreaseLiquidityAccounts, SwapAccounts, WhirlpoolInstructionBuilder};
pub use pda::PdaBuilder;

/// Orca Whirlpool program on mainnet and devnet
pub const ORCA_WHIRLPOOL_PROGRAM_ID: Pubkey = pubkey!("whirLbMiicVdio4qvUfM5KAg6Ct8VwpYzGff3uctyCc");

/// Orca's canonical WhirlpoolsConfig account on mainnet
pub const ORCA_WHIRLPOOLS_CONFIG: Pubkey = pubkey!("2LecshUwdy9xi7meFgHtFJQNSKk4KdTrcpvaB56dP2NQ");

pub const TOKEN_2022_PROGRAM_ID: Pubkey = pubkey!("TokenzQdBNbLqP5VEhdkAS6EPFLC1PHnBqCXEpPxuEb");

/// Number of ticks stored in one tick array account
pub const TICK_ARRAY_SIZE: usize = 88;

/// Number of position slots in a position bundle
pub const POSITION_BUNDLE_SIZE: u16 = 256;
