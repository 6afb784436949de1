use ahash::AHashMap;
use solana_sdk::pubkey::Pubkey;

use crate::core::{PositionState, TickRange};

/// Owned positions indexed by `(pool, tick_lower, tick_upper)`
///
/// Built once per request. When two positions share a key the first one in
/// scan order is kept.
#[derive(Debug, Default)]
pub struct PositionIndex {
    by_range: AHashMap<(Pubkey, i32, i32), PositionState>,
}

impl PositionIndex {
    pub fn build(positions: impl IntoIterator<Item = PositionState>) -> Self {
        let mut by_range = AHashMap::new();
        for position in positions {
            let key = (
                position.whirlpool,
                position.tick_lower_index,
                position.tick_upper_index,
            );
            by_range.entry(key).or_insert(position);
        }
        Self { by_range }
    }

    /// Position on `pool` whose bounds equal `range` exactly
    pub fn find(&self, pool: &Pubkey, range: TickRange) -> Option<&PositionState> {
        self.by_range.get(&(*pool, range.lower(), range.upper()))
    }

    pub fn len(&self) -> usize {
        self.by_range.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_range.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position(pool: Pubkey, lower: i32, upper: i32) -> PositionState {
        PositionState {
            address: Pubkey::new_unique(),
            position_mint: Pubkey::new_unique(),
            whirlpool: pool,
            liquidity: 1,
            tick_lower_index: lower,
            tick_upper_index: upper,
            fee_owed_a: 0,
            fee_owed_b: 0,
            token_account: Pubkey::new_unique(),
            bundle: None,
        }
    }

    #[test]
    fn test_exact_match_only() {
        let pool = Pubkey::new_unique();
        let index = PositionIndex::build(vec![position(pool, -128, 128)]);

        assert!(index.find(&pool, TickRange::new(-128, 128).unwrap()).is_some());
        assert!(index.find(&pool, TickRange::new(-128, 192).unwrap()).is_none());
        assert!(index.find(&pool, TickRange::new(-64, 128).unwrap()).is_none());
        assert!(index
            .find(&Pubkey::new_unique(), TickRange::new(-128, 128).unwrap())
            .is_none());
    }

    #[test]
    fn test_first_match_wins() {
        let pool = Pubkey::new_unique();
        let first = position(pool, 0, 64);
        let second = position(pool, 0, 64);
        let index = PositionIndex::build(vec![first.clone(), second]);

        assert_eq!(index.len(), 1);
        let found = index.find(&pool, TickRange::new(0, 64).unwrap()).unwrap();
        assert_eq!(found.position_mint, first.position_mint);
    }
}
