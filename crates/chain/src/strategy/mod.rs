//! Strategy adapters.
//!
//! A strategy holds one vault's funds in an external lending market on
//! behalf of a single coordinator. Every adapter shares the same
//! [`StrategyCore`] (access control, run state, bookkeeping, event journal,
//! re-entrancy guard) and differs only in how it talks to its market:
//!
//! - [`AaveV3Strategy`]: pool-based, the market handle is the reserve's aToken
//! - [`CompoundV3Strategy`]: market-based, the handle is the Comet market
//!
//! # Example
//!
//! ```rust,ignore
//! use yieldvault_chain::strategy::{AaveV3Strategy, Strategy};
//!
//! let strategy = AaveV3Strategy::new(account, owner, coordinator, pool, ledger)?;
//! strategy.add_supported_token(owner, usdc).await?;
//! strategy.deposit(coordinator, usdc, amount).await?;
//! ```

#[cfg(feature = "aave-v3")]
mod aave_v3;
#[cfg(feature = "compound-v3")]
mod compound_v3;

#[cfg(feature = "aave-v3")]
pub use aave_v3::AaveV3Strategy;
#[cfg(feature = "compound-v3")]
pub use compound_v3::CompoundV3Strategy;

use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::info;
use yieldvault_core::{
    AccessControl, Error, EventLog, GovernanceCall, GuardToken, ReentrancyGuard, Result, RunState,
    StrategyAnalytics, StrategyBook, StrategyEvent,
};

/// Lending market family a strategy targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StrategyKind {
    /// Aave V3 and forks
    AaveV3,
    /// Compound V3 (Comet)
    CompoundV3,
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AaveV3 => write!(f, "aave-v3"),
            Self::CompoundV3 => write!(f, "compound-v3"),
        }
    }
}

/// State shared by every adapter.
///
/// Locks are short and synchronous: callers copy what they need out of the
/// book before awaiting a collaborator, and write results back afterwards.
#[derive(Debug)]
pub struct StrategyCore {
    /// The strategy's own account (holds market positions)
    account: Address,
    access: Mutex<AccessControl>,
    book: Mutex<StrategyBook>,
    events: Mutex<EventLog>,
    guard: ReentrancyGuard,
}

impl StrategyCore {
    pub fn new(account: Address, owner: Address, coordinator: Address) -> Result<Self> {
        if account.is_zero() {
            return Err(Error::InvalidAddress);
        }
        Ok(Self {
            account,
            access: Mutex::new(AccessControl::new(owner, coordinator)?),
            book: Mutex::new(StrategyBook::new()),
            events: Mutex::new(EventLog::default()),
            guard: ReentrancyGuard::default(),
        })
    }

    pub fn account(&self) -> Address {
        self.account
    }

    pub fn owner(&self) -> Address {
        self.access.lock().owner()
    }

    pub fn coordinator(&self) -> Address {
        self.access.lock().coordinator()
    }

    pub fn timelock(&self) -> Option<Address> {
        self.access.lock().timelock()
    }

    pub fn state(&self) -> RunState {
        self.access.lock().state()
    }

    pub fn is_supported(&self, token: &Address) -> bool {
        self.book.lock().is_supported(token)
    }

    pub fn supported_tokens(&self) -> Vec<Address> {
        self.book.lock().supported_tokens()
    }

    /// Market handle for a token (aToken or Comet market).
    pub fn market(&self, token: &Address) -> Option<Address> {
        self.book.lock().market(token)
    }

    pub fn total_deposited(&self, token: &Address) -> U256 {
        self.book.lock().total_deposited(token)
    }

    pub fn total_withdrawn(&self, token: &Address) -> U256 {
        self.book.lock().total_withdrawn(token)
    }

    pub fn net_deposits(&self, token: &Address) -> Result<U256> {
        self.book.lock().net_deposits(token)
    }

    pub fn accrued_yield(&self, token: &Address, current_balance: U256) -> Result<U256> {
        self.book.lock().accrued_yield(token, current_balance)
    }

    pub fn events(&self) -> Vec<StrategyEvent> {
        self.events.lock().all().to_vec()
    }

    pub(crate) fn emit(&self, event: StrategyEvent) {
        self.events.lock().emit(event);
    }

    pub(crate) fn enter(&self) -> Result<GuardToken<'_>> {
        self.guard.enter()
    }

    pub(crate) fn only_governance(&self, caller: Address) -> Result<()> {
        self.access.lock().only_governance(caller)
    }

    /// Checks shared by deposit and withdraw.
    pub(crate) fn check_flow(&self, caller: Address, token: Address, amount: U256) -> Result<()> {
        {
            let access = self.access.lock();
            access.only_coordinator(caller)?;
            access.require_active()?;
        }
        if !self.is_supported(&token) {
            return Err(Error::UnsupportedToken(token));
        }
        if amount.is_zero() {
            return Err(Error::InvalidAmount);
        }
        Ok(())
    }

    /// Checks for an emergency withdrawal. Handle resolution is left to the
    /// adapter.
    pub(crate) fn check_emergency(&self, caller: Address, recipient: Address) -> Result<()> {
        let access = self.access.lock();
        access.only_owner(caller)?;
        access.require_halted()?;
        if recipient.is_zero() {
            return Err(Error::InvalidAddress);
        }
        Ok(())
    }

    /// Governance check plus "already supported" short-circuit, run before
    /// any market lookup.
    pub(crate) fn check_add(&self, caller: Address, token: Address) -> Result<()> {
        self.only_governance(caller)?;
        if token.is_zero() {
            return Err(Error::InvalidTokenAddress);
        }
        if self.is_supported(&token) {
            return Err(Error::TokenSupportUnchanged(token));
        }
        Ok(())
    }

    pub(crate) fn add_token(&self, token: Address, market: Address) -> Result<()> {
        self.book.lock().add_token(token, market)?;
        self.emit(StrategyEvent::TokenSupportUpdated {
            token,
            supported: true,
        });
        info!(token = %token, market = %market, "Token support added");
        Ok(())
    }

    pub(crate) fn remove_token(&self, caller: Address, token: Address) -> Result<()> {
        self.only_governance(caller)?;
        let market = self.book.lock().remove_token(token)?;
        self.emit(StrategyEvent::TokenSupportUpdated {
            token,
            supported: false,
        });
        info!(token = %token, market = ?market, "Token support removed");
        Ok(())
    }

    /// Set or clear a handle without changing support. Returns the previous one.
    pub(crate) fn set_market(&self, token: Address, market: Option<Address>) -> Option<Address> {
        let previous = self.book.lock().set_market(token, market);
        self.emit(StrategyEvent::MarketUpdated { token, market });
        info!(token = %token, market = ?market, previous = ?previous, "Market handle updated");
        previous
    }

    pub(crate) fn record_deposit(&self, token: Address, amount: U256) -> Result<()> {
        self.book.lock().record_deposit(token, amount)?;
        self.emit(StrategyEvent::Deposited { token, amount });
        Ok(())
    }

    pub(crate) fn record_withdrawal(&self, token: Address, requested: U256, received: U256) -> Result<()> {
        self.book.lock().record_withdrawal(token, received)?;
        self.emit(StrategyEvent::Withdrawn {
            token,
            requested,
            received,
        });
        Ok(())
    }

    pub(crate) fn analytics(
        &self,
        token: &Address,
        balance: U256,
        apy_bps: U256,
        reward_accrued: U256,
    ) -> Result<StrategyAnalytics> {
        self.book.lock().analytics(token, balance, apy_bps, reward_accrued)
    }

    pub fn pause(&self, caller: Address) -> Result<()> {
        self.access.lock().halt(caller)?;
        self.emit(StrategyEvent::Halted { by: caller });
        info!(by = %caller, "Strategy halted");
        Ok(())
    }

    pub fn unpause(&self, caller: Address) -> Result<()> {
        self.access.lock().resume(caller)?;
        self.emit(StrategyEvent::Resumed { by: caller });
        info!(by = %caller, "Strategy resumed");
        Ok(())
    }

    pub fn set_coordinator(&self, caller: Address, coordinator: Address) -> Result<()> {
        let previous = self.access.lock().set_coordinator(caller, coordinator)?;
        self.emit(StrategyEvent::CoordinatorUpdated {
            previous,
            current: coordinator,
        });
        info!(previous = %previous, current = %coordinator, "Coordinator updated");
        Ok(())
    }

    pub fn set_timelock(&self, caller: Address, timelock: Address) -> Result<()> {
        let previous = self.access.lock().set_timelock(caller, timelock)?;
        self.emit(StrategyEvent::TimelockUpdated {
            previous,
            current: Some(timelock),
        });
        info!(previous = ?previous, current = %timelock, "Timelock updated");
        Ok(())
    }

    pub fn renounce_timelock(&self, caller: Address) -> Result<()> {
        let previous = self.access.lock().renounce_timelock(caller)?;
        self.emit(StrategyEvent::TimelockUpdated {
            previous: Some(previous),
            current: None,
        });
        info!(previous = %previous, "Timelock renounced");
        Ok(())
    }
}

/// Operations every strategy adapter exposes.
#[async_trait]
pub trait Strategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    fn core(&self) -> &StrategyCore;

    /// Resolve the market handle for `token` and mark it supported.
    async fn add_supported_token(&self, caller: Address, token: Address) -> Result<()>;

    /// Deactivate `token` and clear its handle. Accrual counters survive.
    async fn remove_supported_token(&self, caller: Address, token: Address) -> Result<()> {
        self.core().remove_token(caller, token)
    }

    /// Set or clear the market a token is routed to. Only market-based
    /// adapters have a configurable handle.
    async fn set_market(&self, caller: Address, token: Address, _market: Option<Address>) -> Result<()> {
        self.core().only_governance(caller)?;
        Err(Error::NoMarketConfigured(token))
    }

    /// Pull `amount` from the coordinator and supply it to the market.
    async fn deposit(&self, caller: Address, token: Address, amount: U256) -> Result<()>;

    /// Withdraw from the market and forward what arrived to the coordinator.
    async fn withdraw(&self, caller: Address, token: Address, amount: U256) -> Result<U256>;

    /// Live market balance; zero when the token has no handle.
    async fn balance_of(&self, token: Address) -> Result<U256>;

    /// Current supply APY in basis points.
    async fn current_apy(&self, token: Address) -> Result<U256>;

    /// Protocol reward accrued to the strategy account. Never fails.
    async fn reward_accrued(&self, _token: Address) -> U256 {
        U256::ZERO
    }

    /// Owner-only exit while halted. `amount == 0` withdraws everything.
    /// Funds go straight to `recipient`; bookkeeping is not touched.
    async fn emergency_withdraw(
        &self,
        caller: Address,
        token: Address,
        amount: U256,
        recipient: Address,
    ) -> Result<U256>;

    async fn analytics(&self, token: Address) -> Result<StrategyAnalytics> {
        if !self.core().is_supported(&token) {
            return Ok(StrategyAnalytics::default());
        }
        let balance = self.balance_of(token).await?;
        let apy = self.current_apy(token).await?;
        let reward = self.reward_accrued(token).await;
        self.core().analytics(&token, balance, apy, reward)
    }

    fn pause(&self, caller: Address) -> Result<()> {
        self.core().pause(caller)
    }

    fn unpause(&self, caller: Address) -> Result<()> {
        self.core().unpause(caller)
    }

    fn set_coordinator(&self, caller: Address, coordinator: Address) -> Result<()> {
        self.core().set_coordinator(caller, coordinator)
    }

    fn set_timelock(&self, caller: Address, timelock: Address) -> Result<()> {
        self.core().set_timelock(caller, timelock)
    }

    fn renounce_timelock(&self, caller: Address) -> Result<()> {
        self.core().renounce_timelock(caller)
    }

    fn events(&self) -> Vec<StrategyEvent> {
        self.core().events()
    }

    /// Apply a governance call released by a timelock (or sent by the owner).
    async fn apply(&self, caller: Address, call: GovernanceCall) -> Result<()> {
        match call {
            GovernanceCall::AddSupportedToken { token } => {
                self.add_supported_token(caller, token).await
            }
            GovernanceCall::RemoveSupportedToken { token } => {
                self.remove_supported_token(caller, token).await
            }
            GovernanceCall::SetMarket { token, market } => {
                self.set_market(caller, token, market).await
            }
            GovernanceCall::SetCoordinator { coordinator } => {
                self.set_coordinator(caller, coordinator)
            }
            GovernanceCall::SetTimelock { timelock } => self.set_timelock(caller, timelock),
            GovernanceCall::RenounceTimelock => self.renounce_timelock(caller),
        }
    }
}
