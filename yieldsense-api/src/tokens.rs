//! Display symbols for well-known mints

use solana_sdk::{pubkey, pubkey::Pubkey};

pub const UNKNOWN_SYMBOL: &str = "Unknown";

const KNOWN_TOKENS: &[(Pubkey, &str)] = &[
    (pubkey!("So11111111111111111111111111111111111111112"), "SOL"),
    (pubkey!("EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v"), "USDC"),
    (pubkey!("Es9vMFrzaCERmJfrF4H2FYD4KCoNkY11McCe8BenwNYB"), "USDT"),
    (pubkey!("DezXAZ8z7PnrnRJjz3wXBoRgixCa6xjnB7YaB1pPB263"), "BONK"),
    (pubkey!("JUPyiwrYJFskUPiHa7hkeR8VUtAeFoSYbKedZNsDvCN"), "JUP"),
    (pubkey!("mSoLzYCxHdYgdzU16g5QSh3i5K3z3KZK7ytfqcJm7So"), "mSOL"),
    (pubkey!("J1toso1uCk3RLmjorhTtrVwY9HJ7X8V9yYac6Y7kGCPn"), "JitoSOL"),
    (pubkey!("orcaEKTdK7LKz57vaAYr9QeNsVEPfiu6QeMU1kektZE"), "ORCA"),
];

/// Symbol for a mint, or a shortened address when it is not well known
pub fn resolve_symbol(mint: &Pubkey) -> String {
    KNOWN_TOKENS
        .iter()
        .find(|(known, _)| known == mint)
        .map(|(_, symbol)| symbol.to_string())
        .unwrap_or_else(|| shorten(mint))
}

fn shorten(mint: &Pubkey) -> String {
    let address = mint.to_string();
    format!("{}...{}", &address[..4], &address[address.len() - 4..])
}

/// Symbols for both tokens of a pool and the `A/B` pair label
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolPair {
    pub pair: String,
    pub token_a: String,
    pub token_b: String,
}

impl PoolPair {
    pub fn resolve(mint_a: &Pubkey, mint_b: &Pubkey) -> Self {
        let token_a = resolve_symbol(mint_a);
        let token_b = resolve_symbol(mint_b);
        Self {
            pair: format!("{}/{}", token_a, token_b),
            token_a,
            token_b,
        }
    }

    pub fn unknown() -> Self {
        Self {
            pair: format!("{}/{}", UNKNOWN_SYMBOL, UNKNOWN_SYMBOL),
            token_a: UNKNOWN_SYMBOL.to_string(),
            token_b: UNKNOWN_SYMBOL.to_string(),
        }
    }
}
