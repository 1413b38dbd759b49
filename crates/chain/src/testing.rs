//! In-memory collaborators for unit tests.

use crate::contracts::{AavePool, AavePoolView, CometMarket, CometView, TokenBalances, TokenLedger};
use crate::oracle::{ExponentPrice, PrimaryFeed, RoundData, SecondaryFeed};
use crate::strategy::Strategy;
use alloy::primitives::{Address, B256, U256};
use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

/// ERC-20 balances keyed by (token, holder).
#[derive(Debug, Default)]
pub struct MockLedger {
    balances: Mutex<HashMap<(Address, Address), U256>>,
}

impl MockLedger {
    pub fn mint(&self, token: Address, to: Address, amount: U256) {
        *self.balances.lock().entry((token, to)).or_default() += amount;
    }

    pub fn burn(&self, token: Address, from: Address, amount: U256) -> Result<()> {
        let mut balances = self.balances.lock();
        let balance = balances.entry((token, from)).or_default();
        if *balance < amount {
            bail!("insufficient {token} balance for {from}: {balance} < {amount}");
        }
        *balance -= amount;
        Ok(())
    }

    pub fn balance(&self, token: Address, holder: Address) -> U256 {
        self.balances
            .lock()
            .get(&(token, holder))
            .copied()
            .unwrap_or_default()
    }

    fn move_funds(&self, token: Address, from: Address, to: Address, amount: U256) -> Result<()> {
        self.burn(token, from, amount)?;
        self.mint(token, to, amount);
        Ok(())
    }
}

#[async_trait]
impl TokenBalances for MockLedger {
    async fn balance_of(&self, token: Address, account: Address) -> Result<U256> {
        Ok(self.balance(token, account))
    }
}

#[async_trait]
impl TokenLedger for MockLedger {
    async fn transfer(&self, token: Address, from: Address, to: Address, amount: U256) -> Result<()> {
        self.move_funds(token, from, to, amount)
    }
}

type Reentry = (Weak<dyn Strategy>, Address, Address);

/// Aave pool that mints aTokens 1:1 and keeps underlying at its own address.
pub struct MockAavePool {
    address: Address,
    ledger: Arc<MockLedger>,
    reserves: Mutex<HashMap<Address, Address>>,
    rates: Mutex<HashMap<Address, U256>>,
    shortfall: Mutex<U256>,
    fail_supply: AtomicBool,
    reentry: Mutex<Option<Reentry>>,
    reentry_result: Mutex<Option<yieldvault_core::Result<()>>>,
}

impl std::fmt::Debug for MockAavePool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockAavePool")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

impl MockAavePool {
    pub fn new(ledger: Arc<MockLedger>) -> Self {
        Self {
            address: Address::repeat_byte(0xa0),
            ledger,
            reserves: Mutex::new(HashMap::new()),
            rates: Mutex::new(HashMap::new()),
            shortfall: Mutex::new(U256::ZERO),
            fail_supply: AtomicBool::new(false),
            reentry: Mutex::new(None),
            reentry_result: Mutex::new(None),
        }
    }

    pub fn list_reserve(&self, token: Address, a_token: Address) {
        self.reserves.lock().insert(token, a_token);
    }

    pub fn set_liquidity_rate(&self, token: Address, rate_ray: U256) {
        self.rates.lock().insert(token, rate_ray);
    }

    /// Deliver `shortfall` less than requested on every withdrawal.
    pub fn set_shortfall(&self, shortfall: U256) {
        *self.shortfall.lock() = shortfall;
    }

    pub fn fail_supply(&self, fail: bool) {
        self.fail_supply.store(fail, Ordering::SeqCst);
    }

    /// Interest: credit aTokens to `holder`, backed by fresh underlying.
    pub fn accrue(&self, token: Address, holder: Address, interest: U256) {
        if let Some(a_token) = self.reserves.lock().get(&token).copied() {
            self.ledger.mint(a_token, holder, interest);
            self.ledger.mint(token, self.address, interest);
        }
    }

    /// On the next supply, call back into `strategy.deposit(caller, token, ..)`.
    pub fn reenter_on_supply(&self, strategy: Weak<dyn Strategy>, caller: Address, token: Address) {
        *self.reentry.lock() = Some((strategy, caller, token));
    }

    pub fn take_reentry_result(&self) -> Option<yieldvault_core::Result<()>> {
        self.reentry_result.lock().take()
    }

    fn a_token(&self, token: Address) -> Result<Address> {
        self.reserves
            .lock()
            .get(&token)
            .copied()
            .ok_or_else(|| anyhow!("reserve {token} not listed"))
    }
}

#[async_trait]
impl AavePoolView for MockAavePool {
    async fn reserve_receipt_token(&self, token: Address) -> Result<Address> {
        Ok(self.reserves.lock().get(&token).copied().unwrap_or_default())
    }

    async fn liquidity_rate(&self, token: Address) -> Result<U256> {
        Ok(self.rates.lock().get(&token).copied().unwrap_or_default())
    }
}

#[async_trait]
impl AavePool for MockAavePool {
    async fn supply(
        &self,
        caller: Address,
        token: Address,
        amount: U256,
        on_behalf_of: Address,
        _referral_code: u16,
    ) -> Result<()> {
        if self.fail_supply.load(Ordering::SeqCst) {
            bail!("supply reverted");
        }

        let reentry = self.reentry.lock().take();
        if let Some((strategy, reentry_caller, reentry_token)) = reentry {
            if let Some(strategy) = strategy.upgrade() {
                let result = strategy.deposit(reentry_caller, reentry_token, amount).await;
                *self.reentry_result.lock() = Some(result);
            }
        }

        let a_token = self.a_token(token)?;
        self.ledger.move_funds(token, caller, self.address, amount)?;
        self.ledger.mint(a_token, on_behalf_of, amount);
        Ok(())
    }

    async fn withdraw(&self, caller: Address, token: Address, amount: U256, to: Address) -> Result<U256> {
        let a_token = self.a_token(token)?;
        self.ledger.burn(a_token, caller, amount)?;
        let delivered = amount.saturating_sub(*self.shortfall.lock());
        self.ledger.move_funds(token, self.address, to, delivered)?;
        Ok(delivered)
    }
}

#[derive(Debug, Default, Clone)]
struct MarketState {
    base: Address,
    utilization: U256,
    supply_rate: U256,
    balances: HashMap<Address, U256>,
    rewards: HashMap<Address, U256>,
}

/// Comet markets keyed by market address. Underlying sits at the market.
#[derive(Debug)]
pub struct MockComet {
    ledger: Arc<MockLedger>,
    markets: Mutex<HashMap<Address, MarketState>>,
    shortfall: Mutex<U256>,
    fail_rewards: AtomicBool,
}

impl MockComet {
    pub fn new(ledger: Arc<MockLedger>) -> Self {
        Self {
            ledger,
            markets: Mutex::new(HashMap::new()),
            shortfall: Mutex::new(U256::ZERO),
            fail_rewards: AtomicBool::new(false),
        }
    }

    pub fn list_market(&self, market: Address, base: Address) {
        self.markets.lock().insert(
            market,
            MarketState {
                base,
                ..Default::default()
            },
        );
    }

    pub fn set_rates(&self, market: Address, utilization: U256, supply_rate: U256) {
        if let Some(state) = self.markets.lock().get_mut(&market) {
            state.utilization = utilization;
            state.supply_rate = supply_rate;
        }
    }

    pub fn set_reward(&self, market: Address, account: Address, accrued: U256) {
        if let Some(state) = self.markets.lock().get_mut(&market) {
            state.rewards.insert(account, accrued);
        }
    }

    pub fn set_shortfall(&self, shortfall: U256) {
        *self.shortfall.lock() = shortfall;
    }

    pub fn fail_rewards(&self, fail: bool) {
        self.fail_rewards.store(fail, Ordering::SeqCst);
    }

    pub fn accrue(&self, market: Address, account: Address, interest: U256) {
        let base = {
            let mut markets = self.markets.lock();
            let Some(state) = markets.get_mut(&market) else {
                return;
            };
            *state.balances.entry(account).or_default() += interest;
            state.base
        };
        self.ledger.mint(base, market, interest);
    }

    fn with_market<R>(&self, market: Address, f: impl FnOnce(&mut MarketState) -> Result<R>) -> Result<R> {
        let mut markets = self.markets.lock();
        let state = markets
            .get_mut(&market)
            .ok_or_else(|| anyhow!("unknown market {market}"))?;
        f(state)
    }
}

#[async_trait]
impl CometView for MockComet {
    async fn base_token(&self, market: Address) -> Result<Address> {
        self.with_market(market, |s| Ok(s.base))
    }

    async fn balance_of(&self, market: Address, account: Address) -> Result<U256> {
        self.with_market(market, |s| {
            Ok(s.balances.get(&account).copied().unwrap_or_default())
        })
    }

    async fn utilization(&self, market: Address) -> Result<U256> {
        self.with_market(market, |s| Ok(s.utilization))
    }

    async fn supply_rate(&self, market: Address, _utilization: U256) -> Result<U256> {
        self.with_market(market, |s| Ok(s.supply_rate))
    }

    async fn reward_accrued(&self, market: Address, account: Address) -> Result<U256> {
        if self.fail_rewards.load(Ordering::SeqCst) {
            bail!("userBasic reverted");
        }
        self.with_market(market, |s| {
            Ok(s.rewards.get(&account).copied().unwrap_or_default())
        })
    }
}

#[async_trait]
impl CometMarket for MockComet {
    async fn supply(&self, market: Address, caller: Address, token: Address, amount: U256) -> Result<()> {
        self.with_market(market, |s| {
            if s.base != token {
                bail!("{token} is not the base of {market}");
            }
            Ok(())
        })?;
        self.ledger.move_funds(token, caller, market, amount)?;
        self.with_market(market, |s| {
            *s.balances.entry(caller).or_default() += amount;
            Ok(())
        })
    }

    async fn withdraw(
        &self,
        market: Address,
        caller: Address,
        to: Address,
        token: Address,
        amount: U256,
    ) -> Result<()> {
        self.with_market(market, |s| {
            let balance = s.balances.entry(caller).or_default();
            if *balance < amount {
                bail!("withdraw {amount} exceeds balance {balance}");
            }
            *balance -= amount;
            Ok(())
        })?;
        let delivered = amount.saturating_sub(*self.shortfall.lock());
        self.ledger.move_funds(token, market, to, delivered)
    }
}

/// Aggregator rounds keyed by feed address.
#[derive(Debug, Default)]
pub struct MockPrimaryFeed {
    rounds: Mutex<HashMap<Address, RoundData>>,
    failing: Mutex<HashSet<Address>>,
}

impl MockPrimaryFeed {
    pub fn set_round(&self, feed: Address, answer: u128, updated_at: u64) {
        self.set_round_data(
            feed,
            RoundData {
                round_id: 1,
                answer: U256::from(answer),
                started_at: updated_at,
                updated_at,
                answered_in_round: 1,
            },
        );
    }

    pub fn set_round_data(&self, feed: Address, round: RoundData) {
        self.failing.lock().remove(&feed);
        self.rounds.lock().insert(feed, round);
    }

    /// Make every read of `feed` fail like an RPC error.
    pub fn fail(&self, feed: Address) {
        self.failing.lock().insert(feed);
    }
}

#[async_trait]
impl PrimaryFeed for MockPrimaryFeed {
    async fn latest_round(&self, feed: Address) -> Result<RoundData> {
        if self.failing.lock().contains(&feed) {
            bail!("latestRoundData failed for {feed}");
        }
        self.rounds
            .lock()
            .get(&feed)
            .cloned()
            .ok_or_else(|| anyhow!("no round for {feed}"))
    }
}

/// Exponent prices keyed by price id.
#[derive(Debug, Default)]
pub struct MockSecondaryFeed {
    prices: Mutex<HashMap<B256, ExponentPrice>>,
}

impl MockSecondaryFeed {
    pub fn set_price(&self, price_id: B256, price: i64, expo: i32, publish_time: u64) {
        self.prices.lock().insert(
            price_id,
            ExponentPrice {
                price,
                conf: 0,
                expo,
                publish_time,
            },
        );
    }
}

#[async_trait]
impl SecondaryFeed for MockSecondaryFeed {
    async fn latest_unsafe(&self, price_id: B256) -> Result<ExponentPrice> {
        self.prices
            .lock()
            .get(&price_id)
            .copied()
            .ok_or_else(|| anyhow!("price id {price_id} not found"))
    }
}
