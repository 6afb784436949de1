//! Whirlpool program account layouts
//!
//! Anchor accounts: an 8 byte discriminator (`sha256("account:<Name>")[..8]`)
//! followed by the Borsh encoded struct.

use anchor_lang::{AnchorDeserialize, AnchorSerialize};
use solana_sdk::{account::Account, hash::hashv, pubkey::Pubkey};

use super::{POSITION_BUNDLE_SIZE, TICK_ARRAY_SIZE};
use crate::core::{BundleSlot, PoolState, PositionState, ServiceError, ServiceResult};

pub const DISCRIMINATOR_LEN: usize = 8;

/// Anchor account discriminator for `name`
pub fn account_discriminator(name: &str) -> [u8; 8] {
    let hash = hashv(&[b"account:", name.as_bytes()]);
    let mut discriminator = [0u8; 8];
    discriminator.copy_from_slice(&hash.to_bytes()[..8]);
    discriminator
}

/// An Anchor account owned by the Whirlpool program
pub trait ProgramAccount: AnchorSerialize + AnchorDeserialize {
    const NAME: &'static str;

    /// Decode raw account data, checking the discriminator
    fn decode(data: &[u8]) -> ServiceResult<Self> {
        if data.len() < DISCRIMINATOR_LEN {
            return Err(ServiceError::invalid_account(Self::NAME, "account data too small"));
        }
        if data[..DISCRIMINATOR_LEN] != account_discriminator(Self::NAME) {
            return Err(ServiceError::invalid_account(Self::NAME, "discriminator mismatch"));
        }
        Self::deserialize(&mut &data[DISCRIMINATOR_LEN..])
            .map_err(|e| ServiceError::invalid_account(Self::NAME, e.to_string()))
    }

    /// Decode an account after checking that `program_id` owns it
    fn decode_owned(account: &Account, program_id: &Pubkey) -> ServiceResult<Self> {
        if account.owner != *program_id {
            return Err(ServiceError::invalid_account(
                Self::NAME,
                format!("owned by {} instead of {}", account.owner, program_id),
            ));
        }
        Self::decode(&account.data)
    }

    /// Encode with the discriminator prefix
    fn encode(&self) -> ServiceResult<Vec<u8>> {
        let mut data = account_discriminator(Self::NAME).to_vec();
        self.serialize(&mut data)
            .map_err(|e| ServiceError::Serialization(e.to_string()))?;
        Ok(data)
    }
}

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct WhirlpoolRewardInfo {
    pub mint: Pubkey,
    pub vault: Pubkey,
    pub authority: Pubkey,
    pub emissions_per_second_x64: u128,
    pub growth_global_x64: u128,
}

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct Whirlpool {
    pub whirlpools_config: Pubkey,
    pub whirlpool_bump: [u8; 1],
    pub tick_spacing: u16,
    pub fee_tier_index_seed: [u8; 2],
    pub fee_rate: u16,
    pub protocol_fee_rate: u16,
    pub liquidity: u128,
    pub sqrt_price: u128,
    pub tick_current_index: i32,
    pub protocol_fee_owed_a: u64,
    pub protocol_fee_owed_b: u64,
    pub token_mint_a: Pubkey,
    pub token_vault_a: Pubkey,
    pub fee_growth_global_a: u128,
    pub token_mint_b: Pubkey,
    pub token_vault_b: Pubkey,
    pub fee_growth_global_b: u128,
    pub reward_last_updated_timestamp: u64,
    pub reward_infos: [WhirlpoolRewardInfo; 3],
}

impl ProgramAccount for Whirlpool {
    const NAME: &'static str = "Whirlpool";
}

impl Whirlpool {
    pub fn into_state(self, address: Pubkey) -> PoolState {
        PoolState {
            address,
            whirlpools_config: self.whirlpools_config,
            tick_spacing: self.tick_spacing,
            fee_rate: self.fee_rate,
            liquidity: self.liquidity,
            sqrt_price: self.sqrt_price,
            tick_current_index: self.tick_current_index,
            token_mint_a: self.token_mint_a,
            token_vault_a: self.token_vault_a,
            token_mint_b: self.token_mint_b,
            token_vault_b: self.token_vault_b,
        }
    }
}

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct PositionRewardInfo {
    pub growth_inside_checkpoint: u128,
    pub amount_owed: u64,
}

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct Position {
    pub whirlpool: Pubkey,
    pub position_mint: Pubkey,
    pub liquidity: u128,
    pub tick_lower_index: i32,
    pub tick_upper_index: i32,
    pub fee_growth_checkpoint_a: u128,
    pub fee_owed_a: u64,
    pub fee_growth_checkpoint_b: u128,
    pub fee_owed_b: u64,
    pub reward_infos: [PositionRewardInfo; 3],
}

impl ProgramAccount for Position {
    const NAME: &'static str = "Position";
}

impl Position {
    pub fn into_state(
        self,
        address: Pubkey,
        token_account: Pubkey,
        bundle: Option<BundleSlot>,
    ) -> PositionState {
        PositionState {
            address,
            position_mint: self.position_mint,
            whirlpool: self.whirlpool,
            liquidity: self.liquidity,
            tick_lower_index: self.tick_lower_index,
            tick_upper_index: self.tick_upper_index,
            fee_owed_a: self.fee_owed_a,
            fee_owed_b: self.fee_owed_b,
            token_account,
            bundle,
        }
    }
}

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct PositionBundle {
    pub position_bundle_mint: Pubkey,
    pub position_bitmap: [u8; 32],
}

impl ProgramAccount for PositionBundle {
    const NAME: &'static str = "PositionBundle";
}

impl PositionBundle {
    /// Bundle indices whose slot holds an open position
    pub fn occupied_indices(&self) -> Vec<u16> {
        (0..POSITION_BUNDLE_SIZE)
            .filter(|index| {
                let byte = self.position_bitmap[(index / 8) as usize];
                byte & (1u8 << (index % 8)) != 0
            })
            .collect()
    }
}

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Tick {
    pub initialized: bool,
    pub liquidity_net: i128,
    pub liquidity_gross: u128,
    pub fee_growth_outside_a: u128,
    pub fee_growth_outside_b: u128,
    pub reward_growths_outside: [u128; 3],
}

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct TickArray {
    pub start_tick_index: i32,
    pub ticks: [Tick; TICK_ARRAY_SIZE],
    pub whirlpool: Pubkey,
}

impl ProgramAccount for TickArray {
    const NAME: &'static str = "TickArray";
}

impl TickArray {
    pub fn empty(whirlpool: Pubkey, start_tick_index: i32) -> Self {
        Self {
            start_tick_index,
            ticks: [Tick::default(); TICK_ARRAY_SIZE],
            whirlpool,
        }
    }

    /// `(tick_index, liquidity_net)` of every initialized tick, ascending
    pub fn initialized_ticks(&self, tick_spacing: u16) -> impl Iterator<Item = (i32, i128)> + '_ {
        let spacing = tick_spacing as i32;
        self.ticks
            .iter()
            .enumerate()
            .filter(|(_, tick)| tick.initialized)
            .map(move |(offset, tick)| {
                (self.start_tick_index + offset as i32 * spacing, tick.liquidity_net)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whirlpool_layout_size() {
        let data = Whirlpool::default().encode().unwrap();
        assert_eq!(data.len(), 653);
    }

    #[test]
    fn test_position_layout_size() {
        let data = Position::default().encode().unwrap();
        assert_eq!(data.len(), 216);
    }

    #[test]
    fn test_tick_array_layout_size() {
        let data = TickArray::empty(Pubkey::new_unique(), 0).encode().unwrap();
        assert_eq!(data.len(), 9988);
    }

    #[test]
    fn test_decode_rejects_foreign_discriminator() {
        let data = Position::default().encode().unwrap();
        let err = Whirlpool::decode(&data).unwrap_err();
        assert!(err.to_string().contains("discriminator mismatch"));
    }

    #[test]
    fn test_decode_owned_checks_owner() {
        let account = Account {
            lamports: 1,
            data: Whirlpool::default().encode().unwrap(),
            owner: Pubkey::new_unique(),
            executable: false,
            rent_epoch: 0,
        };
        assert!(Whirlpool::decode_owned(&account, &super::super::ORCA_WHIRLPOOL_PROGRAM_ID).is_err());
        assert!(Whirlpool::decode_owned(&account, &account.owner.clone()).is_ok());
    }

    #[test]
    fn test_bundle_bitmap_is_lsb_first() {
        let mut bundle = PositionBundle::default();
        bundle.position_bitmap[0] = 0b0000_0101;
        bundle.position_bitmap[31] = 0b1000_0000;
        assert_eq!(bundle.occupied_indices(), vec![0, 2, 255]);
    }

    #[test]
    fn test_initialized_ticks_use_spacing() {
        let mut array = TickArray::empty(Pubkey::new_unique(), -5632);
        array.ticks[0] = Tick { initialized: true, liquidity_net: 10, ..Tick::default() };
        array.ticks[87] = Tick { initialized: true, liquidity_net: -10, ..Tick::default() };
        let ticks: Vec<_> = array.initialized_ticks(64).collect();
        assert_eq!(ticks, vec![(-5632, 10), (-5632 + 87 * 64, -10)]);
    }
}
