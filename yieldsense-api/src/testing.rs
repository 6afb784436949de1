//! Testing utilities
//!
//! An in-memory [`ChainReader`] with a call log, plus fixtures that install
//! Whirlpool, position, bundle, tick array, mint and token accounts into it.

use ahash::{AHashMap, AHashSet};
use async_trait::async_trait;
use solana_program::{program_option::COption, program_pack::Pack};
use solana_sdk::{
    account::Account,
    hash::{hash, Hash},
    pubkey::Pubkey,
};
use spl_token::state::{Account as TokenAccount, AccountState, Mint};
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Mutex, MutexGuard, RwLock,
};

use crate::core::{
    ChainReader, LatestBlockhash, NetworkError, PoolState, ServiceResult,
};
use crate::math;
use crate::whirlpool::{
    accounts::WhirlpoolRewardInfo, PdaBuilder, Position, PositionBundle, ProgramAccount, Tick,
    TickArray, Whirlpool, ORCA_WHIRLPOOLS_CONFIG, ORCA_WHIRLPOOL_PROGRAM_ID, TICK_ARRAY_SIZE,
};

/// A recorded ledger read
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainCall {
    GetAccount(Pubkey),
    GetMultipleAccounts(Vec<Pubkey>),
    GetTokenAccountsByOwner { owner: Pubkey, token_program: Pubkey },
    GetLatestBlockhash,
}

/// In-memory ledger
#[derive(Default)]
pub struct MockChain {
    accounts: RwLock<AHashMap<Pubkey, Account>>,
    failing: RwLock<AHashSet<Pubkey>>,
    calls: Mutex<Vec<ChainCall>>,
    blockhashes: AtomicU64,
}

fn relock<T>(guard: std::sync::LockResult<T>) -> T {
    guard.unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_account(&self, address: Pubkey, account: Account) {
        relock(self.accounts.write()).insert(address, account);
    }

    pub fn account(&self, address: &Pubkey) -> Option<Account> {
        relock(self.accounts.read()).get(address).cloned()
    }

    /// Make every read touching `address` fail with a transport error
    pub fn fail_account(&self, address: Pubkey) {
        relock(self.failing.write()).insert(address);
    }

    pub fn calls(&self) -> Vec<ChainCall> {
        self.call_log().clone()
    }

    pub fn clear_calls(&self) {
        self.call_log().clear();
    }

    /// The blockhash handed out by the `n`th `get_latest_blockhash` call (1-based)
    pub fn blockhash_at(&self, n: u64) -> Hash {
        hash(&n.to_le_bytes())
    }

    pub fn blockhashes_served(&self) -> u64 {
        self.blockhashes.load(Ordering::SeqCst)
    }

    fn call_log(&self) -> MutexGuard<'_, Vec<ChainCall>> {
        relock(self.calls.lock())
    }

    fn record(&self, call: ChainCall) {
        self.call_log().push(call);
    }

    fn check_reachable(&self, address: &Pubkey) -> ServiceResult<()> {
        if relock(self.failing.read()).contains(address) {
            return Err(NetworkError::Transport(format!("connection reset reading {}", address)).into());
        }
        Ok(())
    }
}

#[async_trait]
impl ChainReader for MockChain {
    async fn get_account(&self, address: &Pubkey) -> ServiceResult<Option<Account>> {
        self.record(ChainCall::GetAccount(*address));
        self.check_reachable(address)?;
        Ok(self.account(address))
    }

    async fn get_multiple_accounts(&self, addresses: &[Pubkey]) -> ServiceResult<Vec<Option<Account>>> {
        self.record(ChainCall::GetMultipleAccounts(addresses.to_vec()));
        for address in addresses {
            self.check_reachable(address)?;
        }
        Ok(addresses.iter().map(|a| self.account(a)).collect())
    }

    async fn get_token_accounts_by_owner(
        &self,
        owner: &Pubkey,
        token_program: &Pubkey,
    ) -> ServiceResult<Vec<(Pubkey, Account)>> {
        self.record(ChainCall::GetTokenAccountsByOwner {
            owner: *owner,
            token_program: *token_program,
        });

        let accounts = relock(self.accounts.read());
        let mut owned: Vec<(Pubkey, Account)> = accounts
            .iter()
            .filter(|(_, account)| account.owner == *token_program)
            .filter(|(_, account)| account.data.len() == TokenAccount::LEN)
            .filter(|(_, account)| {
                TokenAccount::unpack_from_slice(&account.data)
                    .map(|state| state.owner == *owner)
                    .unwrap_or(false)
            })
            .map(|(address, account)| (*address, account.clone()))
            .collect();
        owned.sort_by_key(|(address, _)| *address);
        Ok(owned)
    }

    async fn get_latest_blockhash(&self) -> ServiceResult<LatestBlockhash> {
        self.record(ChainCall::GetLatestBlockhash);
        let n = self.blockhashes.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(LatestBlockhash {
            blockhash: self.blockhash_at(n),
            last_valid_block_height: 1_000 + n,
        })
    }
}

/// A program account with rent-exempt-looking lamports
pub fn program_account(owner: Pubkey, data: Vec<u8>) -> Account {
    Account {
        lamports: 1_000_000,
        data,
        owner,
        executable: false,
        rent_epoch: 0,
    }
}

fn encoded<T: ProgramAccount>(account: &T) -> Vec<u8> {
    account
        .encode()
        .unwrap_or_else(|e| panic!("fixture encoding failed: {}", e))
}

pub fn mint_account(decimals: u8, token_program: Pubkey) -> Account {
    let mint = Mint {
        mint_authority: COption::None,
        supply: 0,
        decimals,
        is_initialized: true,
        freeze_authority: COption::None,
    };
    let mut data = vec![0u8; Mint::LEN];
    mint.pack_into_slice(&mut data);
    program_account(token_program, data)
}

pub fn token_account(mint: Pubkey, owner: Pubkey, amount: u64, token_program: Pubkey) -> Account {
    let state = TokenAccount {
        mint,
        owner,
        amount,
        delegate: COption::None,
        state: AccountState::Initialized,
        is_native: COption::None,
        delegated_amount: 0,
        close_authority: COption::None,
    };
    let mut data = vec![0u8; TokenAccount::LEN];
    state.pack_into_slice(&mut data);
    program_account(token_program, data)
}

/// Builder for a Whirlpool fixture
#[derive(Debug, Clone)]
pub struct PoolFixture {
    mint_a: Pubkey,
    mint_b: Pubkey,
    decimals_a: u8,
    decimals_b: u8,
    token_program_a: Pubkey,
    token_program_b: Pubkey,
    tick_spacing: u16,
    fee_rate: u16,
    liquidity: u128,
    tick: i32,
}

impl Default for PoolFixture {
    fn default() -> Self {
        Self::new()
    }
}

impl PoolFixture {
    pub fn new() -> Self {
        let mut mints = [Pubkey::new_unique(), Pubkey::new_unique()];
        mints.sort();
        Self {
            mint_a: mints[0],
            mint_b: mints[1],
            decimals_a: 9,
            decimals_b: 6,
            token_program_a: spl_token::id(),
            token_program_b: spl_token::id(),
            tick_spacing: 64,
            fee_rate: 3000,
            liquidity: 1_000_000_000_000,
            tick: 0,
        }
    }

    pub fn mints(mut self, mint_a: Pubkey, mint_b: Pubkey) -> Self {
        self.mint_a = mint_a;
        self.mint_b = mint_b;
        self
    }

    pub fn decimals(mut self, decimals_a: u8, decimals_b: u8) -> Self {
        self.decimals_a = decimals_a;
        self.decimals_b = decimals_b;
        self
    }

    pub fn token_programs(mut self, program_a: Pubkey, program_b: Pubkey) -> Self {
        self.token_program_a = program_a;
        self.token_program_b = program_b;
        self
    }

    pub fn tick_spacing(mut self, tick_spacing: u16) -> Self {
        self.tick_spacing = tick_spacing;
        self
    }

    pub fn fee_rate(mut self, fee_rate: u16) -> Self {
        self.fee_rate = fee_rate;
        self
    }

    pub fn liquidity(mut self, liquidity: u128) -> Self {
        self.liquidity = liquidity;
        self
    }

    /// Current tick; the sqrt price is set to the tick's exact price
    pub fn tick(mut self, tick: i32) -> Self {
        self.tick = tick;
        self
    }

    /// Whirlpool account data at the canonical PDA for this fixture
    pub fn whirlpool(&self) -> Whirlpool {
        Whirlpool {
            whirlpools_config: ORCA_WHIRLPOOLS_CONFIG,
            whirlpool_bump: [255],
            tick_spacing: self.tick_spacing,
            fee_tier_index_seed: self.tick_spacing.to_le_bytes(),
            fee_rate: self.fee_rate,
            protocol_fee_rate: 300,
            liquidity: self.liquidity,
            sqrt_price: math::sqrt_price_at_tick(self.tick),
            tick_current_index: self.tick,
            protocol_fee_owed_a: 0,
            protocol_fee_owed_b: 0,
            token_mint_a: self.mint_a,
            token_vault_a: Pubkey::new_unique(),
            fee_growth_global_a: 0,
            token_mint_b: self.mint_b,
            token_vault_b: Pubkey::new_unique(),
            fee_growth_global_b: 0,
            reward_last_updated_timestamp: 0,
            reward_infos: [
                WhirlpoolRewardInfo::default(),
                WhirlpoolRewardInfo::default(),
                WhirlpoolRewardInfo::default(),
            ],
        }
    }

    /// Write the pool and both mints into `chain`
    pub fn install(&self, chain: &MockChain) -> InstalledPool {
        let pda = PdaBuilder::new(ORCA_WHIRLPOOL_PROGRAM_ID);
        let (address, _) = pda.whirlpool(
            &ORCA_WHIRLPOOLS_CONFIG,
            &self.mint_a,
            &self.mint_b,
            self.tick_spacing,
        );
        let whirlpool = self.whirlpool();

        chain.set_account(
            address,
            program_account(ORCA_WHIRLPOOL_PROGRAM_ID, encoded(&whirlpool)),
        );
        chain.set_account(self.mint_a, mint_account(self.decimals_a, self.token_program_a));
        chain.set_account(self.mint_b, mint_account(self.decimals_b, self.token_program_b));

        InstalledPool {
            address,
            state: whirlpool.into_state(address),
        }
    }
}

/// A pool written into a [`MockChain`]
#[derive(Debug, Clone)]
pub struct InstalledPool {
    pub address: Pubkey,
    pub state: PoolState,
}

/// A standard position written into a [`MockChain`]
#[derive(Debug, Clone, Copy)]
pub struct InstalledPosition {
    pub address: Pubkey,
    pub mint: Pubkey,
    pub token_account: Pubkey,
}

fn position_data(whirlpool: Pubkey, position_mint: Pubkey, lower: i32, upper: i32, liquidity: u128) -> Position {
    Position {
        whirlpool,
        position_mint,
        liquidity,
        tick_lower_index: lower,
        tick_upper_index: upper,
        ..Position::default()
    }
}

/// Install a position NFT held by `owner`
pub fn install_position(
    chain: &MockChain,
    owner: &Pubkey,
    whirlpool: &Pubkey,
    tick_lower: i32,
    tick_upper: i32,
    liquidity: u128,
) -> InstalledPosition {
    let pda = PdaBuilder::new(ORCA_WHIRLPOOL_PROGRAM_ID);
    let mint = Pubkey::new_unique();
    let (address, _) = pda.position(&mint);
    let token_account_address = Pubkey::new_unique();

    let position = position_data(*whirlpool, mint, tick_lower, tick_upper, liquidity);
    chain.set_account(address, program_account(ORCA_WHIRLPOOL_PROGRAM_ID, encoded(&position)));
    chain.set_account(
        token_account_address,
        token_account(mint, *owner, 1, spl_token::id()),
    );

    InstalledPosition {
        address,
        mint,
        token_account: token_account_address,
    }
}

/// A bundled position to install: `(bundle_index, whirlpool, lower, upper, liquidity)`
pub type BundledFixture = (u16, Pubkey, i32, i32, u128);

/// Install a position bundle held by `owner` with the given occupied slots
///
/// Returns the bundle mint.
pub fn install_bundle(chain: &MockChain, owner: &Pubkey, positions: &[BundledFixture]) -> Pubkey {
    let pda = PdaBuilder::new(ORCA_WHIRLPOOL_PROGRAM_ID);
    let bundle_mint = Pubkey::new_unique();
    let mut bundle = PositionBundle {
        position_bundle_mint: bundle_mint,
        position_bitmap: [0u8; 32],
    };

    for &(index, whirlpool, lower, upper, liquidity) in positions {
        bundle.position_bitmap[(index / 8) as usize] |= 1 << (index % 8);
        let (address, _) = pda.bundled_position(&bundle_mint, index);
        let position = position_data(whirlpool, bundle_mint, lower, upper, liquidity);
        chain.set_account(address, program_account(ORCA_WHIRLPOOL_PROGRAM_ID, encoded(&position)));
    }

    let (bundle_address, _) = pda.position_bundle(&bundle_mint);
    chain.set_account(bundle_address, program_account(ORCA_WHIRLPOOL_PROGRAM_ID, encoded(&bundle)));
    chain.set_account(
        Pubkey::new_unique(),
        token_account(bundle_mint, *owner, 1, spl_token::id()),
    );

    bundle_mint
}

/// Install a tick array with `(tick_index, liquidity_net)` initialized ticks
///
/// Returns the tick array address.
pub fn install_tick_array(
    chain: &MockChain,
    pool: &InstalledPool,
    start_tick_index: i32,
    ticks: &[(i32, i128)],
) -> Pubkey {
    let pda = PdaBuilder::new(ORCA_WHIRLPOOL_PROGRAM_ID);
    let spacing = pool.state.tick_spacing as i32;
    let mut array = TickArray::empty(pool.address, start_tick_index);

    for &(tick_index, liquidity_net) in ticks {
        let offset = (tick_index - start_tick_index) / spacing;
        assert!(
            (0..TICK_ARRAY_SIZE as i32).contains(&offset) && (tick_index - start_tick_index) % spacing == 0,
            "tick {} does not belong to array {}",
            tick_index,
            start_tick_index
        );
        array.ticks[offset as usize] = Tick {
            initialized: true,
            liquidity_net,
            liquidity_gross: liquidity_net.unsigned_abs(),
            ..Tick::default()
        };
    }

    let (address, _) = pda.tick_array(&pool.address, start_tick_index);
    chain.set_account(address, program_account(ORCA_WHIRLPOOL_PROGRAM_ID, encoded(&array)));
    address
}
