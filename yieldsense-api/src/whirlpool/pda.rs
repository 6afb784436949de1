use solana_sdk::pubkey::Pubkey;

pub mod seeds {
    pub const WHIRLPOOL: &[u8] = b"whirlpool";
    pub const POSITION: &[u8] = b"position";
    pub const POSITION_BUNDLE: &[u8] = b"position_bundle";
    pub const BUNDLED_POSITION: &[u8] = b"bundled_position";
    pub const TICK_ARRAY: &[u8] = b"tick_array";
    pub const ORACLE: &[u8] = b"oracle";
}

/// Program-derived addresses of the Whirlpool program
///
/// Addresses are derived on every call and never retained.
#[derive(Clone, Copy, Debug)]
pub struct PdaBuilder {
    pub program_id: Pubkey,
}

impl PdaBuilder {
    pub fn new(program_id: Pubkey) -> Self {
        Self { program_id }
    }

    pub fn whirlpool(
        &self,
        config: &Pubkey,
        mint_a: &Pubkey,
        mint_b: &Pubkey,
        tick_spacing: u16,
    ) -> (Pubkey, u8) {
        Pubkey::find_program_address(
            &[
                seeds::WHIRLPOOL,
                config.as_ref(),
                mint_a.as_ref(),
                mint_b.as_ref(),
                &tick_spacing.to_le_bytes(),
            ],
            &self.program_id,
        )
    }

    pub fn position(&self, position_mint: &Pubkey) -> (Pubkey, u8) {
        Pubkey::find_program_address(&[seeds::POSITION, position_mint.as_ref()], &self.program_id)
    }

    pub fn position_bundle(&self, bundle_mint: &Pubkey) -> (Pubkey, u8) {
        Pubkey::find_program_address(
            &[seeds::POSITION_BUNDLE, bundle_mint.as_ref()],
            &self.program_id,
        )
    }

    /// Bundle indices are seeded as decimal strings
    pub fn bundled_position(&self, bundle_mint: &Pubkey, bundle_index: u16) -> (Pubkey, u8) {
        let index = bundle_index.to_string();
        Pubkey::find_program_address(
            &[seeds::BUNDLED_POSITION, bundle_mint.as_ref(), index.as_bytes()],
            &self.program_id,
        )
    }

    /// Start indices are seeded as decimal strings
    pub fn tick_array(&self, whirlpool: &Pubkey, start_tick_index: i32) -> (Pubkey, u8) {
        let start = start_tick_index.to_string();
        Pubkey::find_program_address(
            &[seeds::TICK_ARRAY, whirlpool.as_ref(), start.as_bytes()],
            &self.program_id,
        )
    }

    pub fn oracle(&self, whirlpool: &Pubkey) -> (Pubkey, u8) {
        Pubkey::find_program_address(&[seeds::ORACLE, whirlpool.as_ref()], &self.program_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::whirlpool::ORCA_WHIRLPOOL_PROGRAM_ID;

    #[test]
    fn test_tick_array_seed_is_decimal_string() {
        let pda = PdaBuilder::new(ORCA_WHIRLPOOL_PROGRAM_ID);
        let whirlpool = Pubkey::new_unique();
        let (address, _) = pda.tick_array(&whirlpool, -5632);
        let (expected, _) = Pubkey::find_program_address(
            &[b"tick_array", whirlpool.as_ref(), b"-5632"],
            &ORCA_WHIRLPOOL_PROGRAM_ID,
        );
        assert_eq!(address, expected);
    }

    #[test]
    fn test_addresses_are_derived_per_call() {
        let pda = PdaBuilder::new(ORCA_WHIRLPOOL_PROGRAM_ID);
        for _ in 0..64 {
            let mint = Pubkey::new_unique();
            let expected =
                Pubkey::find_program_address(&[b"position", mint.as_ref()], &ORCA_WHIRLPOOL_PROGRAM_ID);
            assert_eq!(pda.position(&mint), expected);
            assert_eq!(pda.position(&mint), expected);
            assert_ne!(pda.position(&mint).0, pda.position_bundle(&mint).0);
        }
        // Only the program id is held
        assert_eq!(std::mem::size_of::<PdaBuilder>(), std::mem::size_of::<Pubkey>());
    }

    #[test]
    fn test_bundled_position_seed_is_decimal_string() {
        let pda = PdaBuilder::new(ORCA_WHIRLPOOL_PROGRAM_ID);
        let bundle_mint = Pubkey::new_unique();
        let (expected, _) = Pubkey::find_program_address(
            &[b"bundled_position", bundle_mint.as_ref(), b"42"],
            &ORCA_WHIRLPOOL_PROGRAM_ID,
        );
        assert_eq!(pda.bundled_position(&bundle_mint, 42).0, expected);
    }

    #[test]
    fn test_whirlpool_address_depends_on_spacing() {
        let pda = PdaBuilder::new(ORCA_WHIRLPOOL_PROGRAM_ID);
        let (config, a, b) = (Pubkey::new_unique(), Pubkey::new_unique(), Pubkey::new_unique());
        assert_ne!(pda.whirlpool(&config, &a, &b, 64).0, pda.whirlpool(&config, &a, &b, 128).0);
    }
}
