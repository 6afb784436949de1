//! Owned position discovery
//!
//! A wallet owns a position when it holds exactly one unit of the position
//! NFT mint (or of a position bundle mint). Token accounts under both token
//! programs are scanned, then the derived Position and PositionBundle
//! accounts are fetched in batches.

use ahash::AHashMap;
use solana_program::program_pack::Pack;
use solana_sdk::{account::Account, pubkey::Pubkey};
use spl_token::state::Account as TokenAccount;
use tracing::{debug, warn};

use crate::core::{BundleSlot, ChainReader, PositionState, ServiceResult};
use crate::whirlpool::{PdaBuilder, Position, PositionBundle, ProgramAccount, TOKEN_2022_PROGRAM_ID};

/// Upper bound of accounts requested per `getMultipleAccounts` call
pub const MAX_ACCOUNTS_PER_REQUEST: usize = 100;

/// A mint held by the owner that may be a position or a bundle NFT
#[derive(Debug, Clone, Copy)]
struct HeldMint {
    mint: Pubkey,
    token_account: Pubkey,
}

enum Discovered {
    Standard(PositionState),
    Bundle {
        held: HeldMint,
        slots: Vec<(u16, Pubkey)>,
    },
}

/// Fetch accounts in batches, preserving order
pub async fn fetch_in_batches(
    chain: &dyn ChainReader,
    addresses: &[Pubkey],
) -> ServiceResult<Vec<Option<Account>>> {
    let mut accounts = Vec::with_capacity(addresses.len());
    for batch in addresses.chunks(MAX_ACCOUNTS_PER_REQUEST) {
        accounts.extend(chain.get_multiple_accounts(batch).await?);
    }
    Ok(accounts)
}

async fn held_single_mints(chain: &dyn ChainReader, owner: &Pubkey) -> ServiceResult<Vec<HeldMint>> {
    let mut held = Vec::new();
    for token_program in [spl_token::id(), TOKEN_2022_PROGRAM_ID] {
        for (address, account) in chain.get_token_accounts_by_owner(owner, &token_program).await? {
            if account.data.len() < TokenAccount::LEN {
                continue;
            }
            let Ok(state) = TokenAccount::unpack_from_slice(&account.data[..TokenAccount::LEN]) else {
                continue;
            };
            if state.amount == 1 {
                held.push(HeldMint {
                    mint: state.mint,
                    token_account: address,
                });
            }
        }
    }
    Ok(held)
}

fn decode_position(account: Option<&Account>, program_id: &Pubkey) -> Option<Position> {
    let account = account?;
    match Position::decode_owned(account, program_id) {
        Ok(position) => Some(position),
        Err(e) => {
            warn!("Skipping undecodable position account: {}", e);
            None
        }
    }
}

/// List every position `owner` holds, standard and bundled, in scan order
pub async fn fetch_owned_positions(
    chain: &dyn ChainReader,
    pda: &PdaBuilder,
    owner: &Pubkey,
) -> ServiceResult<Vec<PositionState>> {
    let program_id = pda.program_id;
    let held = held_single_mints(chain, owner).await?;
    if held.is_empty() {
        return Ok(Vec::new());
    }

    // Position PDA and bundle PDA for every held mint, interleaved
    let candidates: Vec<Pubkey> = held
        .iter()
        .flat_map(|h| [pda.position(&h.mint).0, pda.position_bundle(&h.mint).0])
        .collect();
    let accounts = fetch_in_batches(chain, &candidates).await?;

    let mut discovered = Vec::new();
    for (i, h) in held.iter().enumerate() {
        let position_address = candidates[2 * i];
        if let Some(position) = decode_position(accounts[2 * i].as_ref(), &program_id) {
            discovered.push(Discovered::Standard(position.into_state(
                position_address,
                h.token_account,
                None,
            )));
            continue;
        }

        let Some(bundle_account) = accounts[2 * i + 1].as_ref() else {
            continue;
        };
        match PositionBundle::decode_owned(bundle_account, &program_id) {
            Ok(bundle) => {
                let slots = bundle
                    .occupied_indices()
                    .into_iter()
                    .map(|index| (index, pda.bundled_position(&h.mint, index).0))
                    .collect();
                discovered.push(Discovered::Bundle { held: *h, slots });
            }
            Err(e) => warn!(mint = %h.mint, "Skipping undecodable position bundle: {}", e),
        }
    }

    let bundled_addresses: Vec<Pubkey> = discovered
        .iter()
        .filter_map(|d| match d {
            Discovered::Bundle { slots, .. } => Some(slots.iter().map(|(_, address)| *address)),
            Discovered::Standard(_) => None,
        })
        .flatten()
        .collect();
    let bundled: AHashMap<Pubkey, Account> = bundled_addresses
        .iter()
        .copied()
        .zip(fetch_in_batches(chain, &bundled_addresses).await?)
        .filter_map(|(address, account)| account.map(|a| (address, a)))
        .collect();

    let mut positions = Vec::new();
    for entry in discovered {
        match entry {
            Discovered::Standard(position) => positions.push(position),
            Discovered::Bundle { held, slots } => {
                for (bundle_index, address) in slots {
                    if let Some(position) = decode_position(bundled.get(&address), &program_id) {
                        positions.push(position.into_state(
                            address,
                            held.token_account,
                            Some(BundleSlot {
                                bundle_mint: held.mint,
                                bundle_index,
                            }),
                        ));
                    }
                }
            }
        }
    }

    debug!(owner = %owner, count = positions.len(), "Discovered owned positions");
    Ok(positions)
}
