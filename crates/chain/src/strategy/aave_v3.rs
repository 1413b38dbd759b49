//! Aave V3 supply strategy.
//!
//! Tokens are supplied to a single pool; the strategy's position in each
//! reserve is its aToken balance. A withdrawal must deliver the full
//! requested amount.

use super::{Strategy, StrategyCore, StrategyKind};
use crate::contracts::{AavePool, TokenLedger};
use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};
use yieldvault_core::u256_math;
use yieldvault_core::{Error, Result, StrategyEvent};

pub struct AaveV3Strategy {
    core: StrategyCore,
    pool: Arc<dyn AavePool>,
    ledger: Arc<dyn TokenLedger>,
    referral_code: u16,
}

impl std::fmt::Debug for AaveV3Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AaveV3Strategy")
            .field("account", &self.core.account())
            .field("pool", &self.pool)
            .finish()
    }
}

impl AaveV3Strategy {
    pub fn new(
        account: Address,
        owner: Address,
        coordinator: Address,
        pool: Arc<dyn AavePool>,
        ledger: Arc<dyn TokenLedger>,
    ) -> Result<Self> {
        Ok(Self {
            core: StrategyCore::new(account, owner, coordinator)?,
            pool,
            ledger,
            referral_code: 0,
        })
    }

    pub fn with_referral_code(mut self, referral_code: u16) -> Self {
        self.referral_code = referral_code;
        self
    }

    /// aToken for a supported token.
    pub fn receipt_token(&self, token: &Address) -> Option<Address> {
        self.core.market(token)
    }

    fn pool_handle(&self, token: Address) -> Result<Address> {
        self.core.market(&token).ok_or(Error::NoPoolForToken(token))
    }
}

#[async_trait]
impl Strategy for AaveV3Strategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::AaveV3
    }

    fn core(&self) -> &StrategyCore {
        &self.core
    }

    async fn add_supported_token(&self, caller: Address, token: Address) -> Result<()> {
        self.core.check_add(caller, token)?;

        let a_token = self.pool.reserve_receipt_token(token).await?;
        if a_token.is_zero() {
            return Err(Error::UnsupportedTokenForPool(token));
        }

        self.core.add_token(token, a_token)
    }

    async fn deposit(&self, caller: Address, token: Address, amount: U256) -> Result<()> {
        let _entered = self.core.enter()?;
        self.core.check_flow(caller, token, amount)?;
        let account = self.core.account();

        self.ledger.transfer(token, caller, account, amount).await?;
        self.pool
            .supply(account, token, amount, account, self.referral_code)
            .await?;

        self.core.record_deposit(token, amount)?;
        info!(token = %token, amount = %amount, "Supplied to Aave pool");
        Ok(())
    }

    async fn withdraw(&self, caller: Address, token: Address, amount: U256) -> Result<U256> {
        let _entered = self.core.enter()?;
        self.core.check_flow(caller, token, amount)?;
        let account = self.core.account();

        let before = self.ledger.balance_of(token, account).await?;
        let reported = self.pool.withdraw(account, token, amount, account).await?;
        let after = self.ledger.balance_of(token, account).await?;
        let received = u256_math::saturating_diff(after, before);

        if received < amount {
            warn!(
                token = %token,
                requested = %amount,
                received = %received,
                reported = %reported,
                "Aave withdrawal short"
            );
            return Err(Error::InsufficientWithdrawal {
                requested: amount,
                received,
            });
        }

        self.ledger.transfer(token, account, caller, received).await?;
        self.core.record_withdrawal(token, amount, received)?;
        info!(token = %token, requested = %amount, received = %received, "Withdrew from Aave pool");
        Ok(received)
    }

    async fn balance_of(&self, token: Address) -> Result<U256> {
        match self.core.market(&token) {
            Some(a_token) => Ok(self.ledger.balance_of(a_token, self.core.account()).await?),
            None => Ok(U256::ZERO),
        }
    }

    async fn current_apy(&self, token: Address) -> Result<U256> {
        if self.core.market(&token).is_none() {
            return Ok(U256::ZERO);
        }
        let rate = self.pool.liquidity_rate(token).await?;
        let apy = u256_math::ray_rate_to_bps(rate);
        debug!(token = %token, rate = %rate, apy_bps = %apy, "Aave supply APY");
        Ok(apy)
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
        let a_token = self.pool_handle(token)?;

        let amount = if amount.is_zero() {
            self.ledger.balance_of(a_token, self.core.account()).await?
        } else {
            amount
        };
        if amount.is_zero() {
            return Err(Error::InvalidAmount);
        }

        let withdrawn = self
            .pool
            .withdraw(self.core.account(), token, amount, recipient)
            .await?;

        self.core.emit(StrategyEvent::EmergencyWithdrawn {
            token,
            amount: withdrawn,
            recipient,
        });
        warn!(token = %token, amount = %withdrawn, recipient = %recipient, "Emergency withdrawal from Aave pool");
        Ok(withdrawn)
    }
}
