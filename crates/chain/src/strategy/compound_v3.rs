//! Compound V3 (Comet) supply strategy.
//!
//! Each token is routed to its own Comet market, configured with
//! [`Strategy::set_market`] before the token can be supported. The market's
//! base token must equal the token. Withdrawals accept whatever the market
//! delivers; rounding inside Comet routinely returns one unit less than
//! requested.

use super::{Strategy, StrategyCore, StrategyKind};
use crate::contracts::{CometMarket, TokenLedger};
use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};
use yieldvault_core::u256_math;
use yieldvault_core::{Error, Result, StrategyEvent};

pub struct CompoundV3Strategy {
    core: StrategyCore,
    comet: Arc<dyn CometMarket>,
    ledger: Arc<dyn TokenLedger>,
}

impl std::fmt::Debug for CompoundV3Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompoundV3Strategy")
            .field("account", &self.core.account())
            .finish_non_exhaustive()
    }
}

impl CompoundV3Strategy {
    pub fn new(
        account: Address,
        owner: Address,
        coordinator: Address,
        comet: Arc<dyn CometMarket>,
        ledger: Arc<dyn TokenLedger>,
    ) -> Result<Self> {
        Ok(Self {
            core: StrategyCore::new(account, owner, coordinator)?,
            comet,
            ledger,
        })
    }

    async fn check_base_token(&self, token: Address, market: Address) -> Result<()> {
        let base = self.comet.base_token(market).await?;
        if base != token {
            debug!(token = %token, market = %market, base = %base, "Market base token mismatch");
            return Err(Error::UnsupportedTokenForPool(token));
        }
        Ok(())
    }

    fn configured_market(&self, token: Address) -> Result<Address> {
        self.core
            .market(&token)
            .ok_or(Error::NoMarketConfigured(token))
    }
}

#[async_trait]
impl Strategy for CompoundV3Strategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::CompoundV3
    }

    fn core(&self) -> &StrategyCore {
        &self.core
    }

    async fn add_supported_token(&self, caller: Address, token: Address) -> Result<()> {
        self.core.check_add(caller, token)?;
        let market = self.configured_market(token)?;
        self.check_base_token(token, market).await?;
        self.core.add_token(token, market)
    }

    async fn set_market(&self, caller: Address, token: Address, market: Option<Address>) -> Result<()> {
        self.core.only_governance(caller)?;
        if token.is_zero() {
            return Err(Error::InvalidTokenAddress);
        }
        if market.is_some_and(|m| m.is_zero()) {
            return Err(Error::InvalidAddress);
        }
        if self.core.market(&token) == market {
            return Err(Error::PoolSupportUnchanged(token));
        }
        // An active token keeps its market until it is removed
        if self.core.is_supported(&token) {
            return Err(Error::TokenSupportUnchanged(token));
        }
        if let Some(market) = market {
            self.check_base_token(token, market).await?;
        }

        self.core.set_market(token, market);
        Ok(())
    }

    async fn deposit(&self, caller: Address, token: Address, amount: U256) -> Result<()> {
        let _entered = self.core.enter()?;
        self.core.check_flow(caller, token, amount)?;
        let market = self.configured_market(token)?;
        let account = self.core.account();

        self.ledger.transfer(token, caller, account, amount).await?;
        self.comet.supply(market, account, token, amount).await?;

        self.core.record_deposit(token, amount)?;
        info!(token = %token, market = %market, amount = %amount, "Supplied to Comet");
        Ok(())
    }

    async fn withdraw(&self, caller: Address, token: Address, amount: U256) -> Result<U256> {
        let _entered = self.core.enter()?;
        self.core.check_flow(caller, token, amount)?;
        let market = self.configured_market(token)?;
        let account = self.core.account();

        let before = self.ledger.balance_of(token, account).await?;
        self.comet
            .withdraw(market, account, account, token, amount)
            .await?;
        let after = self.ledger.balance_of(token, account).await?;
        let received = u256_math::saturating_diff(after, before);

        if received < amount {
            debug!(token = %token, requested = %amount, received = %received, "Comet delivered less than requested");
        }
        if !received.is_zero() {
            self.ledger.transfer(token, account, caller, received).await?;
        }

        self.core.record_withdrawal(token, amount, received)?;
        info!(token = %token, market = %market, requested = %amount, received = %received, "Withdrew from Comet");
        Ok(received)
    }

    async fn balance_of(&self, token: Address) -> Result<U256> {
        match self.core.market(&token) {
            Some(market) => Ok(self.comet.balance_of(market, self.core.account()).await?),
            None => Ok(U256::ZERO),
        }
    }

    async fn current_apy(&self, token: Address) -> Result<U256> {
        let Some(market) = self.core.market(&token) else {
            return Ok(U256::ZERO);
        };
        let utilization = self.comet.utilization(market).await?;
        let rate = self.comet.supply_rate(market, utilization).await?;
        let apy = u256_math::per_second_wad_rate_to_bps(rate)?;
        debug!(token = %token, utilization = %utilization, rate = %rate, apy_bps = %apy, "Comet supply APY");
        Ok(apy)
    }

    async fn reward_accrued(&self, token: Address) -> U256 {
        let Some(market) = self.core.market(&token) else {
            return U256::ZERO;
        };
        match self.comet.reward_accrued(market, self.core.account()).await {
            Ok(accrued) => accrued,
            Err(e) => {
                warn!(token = %token, market = %market, error = %e, "Reward read failed, reporting zero");
                U256::ZERO
            }
        }
    }

    async fn emergency_withdraw(
        &self,
        caller: Address,
        token: Address,
        amount: U256,
        recipient: Address,
    ) -> Result<U256> {
        let _entered = self.core.enter()?;
        self.core.check_emergency(caller, recipient)?;
        let market = self.configured_market(token)?;

        let amount = if amount.is_zero() {
            self.comet.balance_of(market, self.core.account()).await?
        } else {
            amount
        };
        if amount.is_zero() {
            return Err(Error::InvalidAmount);
        }

        self.comet
            .withdraw(market, self.core.account(), recipient, token, amount)
            .await?;

        self.core.emit(StrategyEvent::EmergencyWithdrawn {
            token,
            amount,
            recipient,
        });
        warn!(token = %token, amount = %amount, recipient = %recipient, "Emergency withdrawal from Comet");
        Ok(amount)
    }
}
