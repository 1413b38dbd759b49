//! Per-strategy bookkeeping: the supported token set, market handles and
//! cumulative deposit/withdrawal counters.
//!
//! Counters only ever move forward. Withdrawals are recorded with the
//! amount actually received from the market, never the amount requested.

use crate::error::{Error, Result};
use alloy::primitives::{Address, U256};
use serde::Serialize;
use smallvec::SmallVec;
use std::collections::HashMap;

/// Cumulative counters for a single token.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AccrualAccount {
    pub total_deposited: U256,
    pub total_withdrawn: U256,
}

/// Dashboard view of a token position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StrategyAnalytics {
    pub current_balance: U256,
    pub total_deposited: U256,
    pub total_withdrawn: U256,
    pub net_deposits: U256,
    pub accrued_yield: U256,
    pub apy_bps: U256,
    /// Protocol reward accrual (1e6 scale), zero where unsupported
    pub reward_accrued: U256,
}

/// An active token with its resolved market handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SupportedToken {
    pub token: Address,
    pub market: Address,
}

/// Supported-token set plus accrual accounts for one strategy instance.
#[derive(Debug, Default)]
pub struct StrategyBook {
    /// Unordered list, swap-removed
    tokens: SmallVec<[Address; 8]>,
    /// Position of each supported token in `tokens`
    index: HashMap<Address, usize>,
    /// Market handle per token
    markets: HashMap<Address, Address>,
    accounts: HashMap<Address, AccrualAccount>,
}

impl StrategyBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the token is active.
    pub fn is_supported(&self, token: &Address) -> bool {
        self.index.contains_key(token)
    }

    /// Supported tokens, in no particular order.
    pub fn supported_tokens(&self) -> Vec<Address> {
        self.tokens.to_vec()
    }

    /// Market handle for a token, if one is set.
    pub fn market(&self, token: &Address) -> Option<Address> {
        self.markets.get(token).copied()
    }

    /// Support record for an active token. A handle configured ahead of
    /// [`add_token`](Self::add_token) does not make the token active.
    pub fn supported_token(&self, token: &Address) -> Option<SupportedToken> {
        if !self.is_supported(token) {
            return None;
        }
        Some(SupportedToken {
            token: *token,
            market: self.market(token).unwrap_or(Address::ZERO),
        })
    }

    /// Set or clear the market handle without touching the active flag.
    ///
    /// Returns the previous handle.
    pub fn set_market(&mut self, token: Address, market: Option<Address>) -> Option<Address> {
        match market {
            Some(market) => self.markets.insert(token, market),
            None => self.markets.remove(&token),
        }
    }

    /// Mark a token active with its market handle.
    pub fn add_token(&mut self, token: Address, market: Address) -> Result<()> {
        if self.is_supported(&token) {
            return Err(Error::TokenSupportUnchanged(token));
        }
        self.index.insert(token, self.tokens.len());
        self.tokens.push(token);
        self.markets.insert(token, market);
        Ok(())
    }

    /// Deactivate a token and clear its market handle. O(1).
    ///
    /// Accrual counters are kept.
    pub fn remove_token(&mut self, token: Address) -> Result<Option<Address>> {
        let position = self
            .index
            .remove(&token)
            .ok_or(Error::TokenSupportUnchanged(token))?;

        self.tokens.swap_remove(position);
        if let Some(moved) = self.tokens.get(position) {
            self.index.insert(*moved, position);
        }

        Ok(self.markets.remove(&token))
    }

    pub fn record_deposit(&mut self, token: Address, amount: U256) -> Result<()> {
        if !self.is_supported(&token) {
            return Err(Error::UnsupportedToken(token));
        }
        if amount.is_zero() {
            return Err(Error::InvalidAmount);
        }
        let account = self.accounts.entry(token).or_default();
        account.total_deposited = account
            .total_deposited
            .checked_add(amount)
            .ok_or(Error::ArithmeticOverflow)?;
        Ok(())
    }

    /// Record what the market actually returned.
    pub fn record_withdrawal(&mut self, token: Address, received: U256) -> Result<()> {
        if !self.is_supported(&token) {
            return Err(Error::UnsupportedToken(token));
        }
        let account = self.accounts.entry(token).or_default();
        account.total_withdrawn = account
            .total_withdrawn
            .checked_add(received)
            .ok_or(Error::ArithmeticOverflow)?;
        Ok(())
    }

    pub fn account(&self, token: &Address) -> AccrualAccount {
        self.accounts.get(token).copied().unwrap_or_default()
    }

    pub fn total_deposited(&self, token: &Address) -> U256 {
        self.account(token).total_deposited
    }

    pub fn total_withdrawn(&self, token: &Address) -> U256 {
        self.account(token).total_withdrawn
    }

    /// Deposits minus received withdrawals.
    ///
    /// Withdrawals exceeding deposits are a bookkeeping defect and are
    /// reported as [`Error::AccountingUnderflow`], never clamped.
    pub fn net_deposits(&self, token: &Address) -> Result<U256> {
        let account = self.account(token);
        account
            .total_deposited
            .checked_sub(account.total_withdrawn)
            .ok_or(Error::AccountingUnderflow(*token))
    }

    /// `max(0, current_balance - net_deposits)`.
    pub fn accrued_yield(&self, token: &Address, current_balance: U256) -> Result<U256> {
        Ok(current_balance.saturating_sub(self.net_deposits(token)?))
    }

    /// Compose the dashboard view. Unsupported tokens read as all zeros.
    pub fn analytics(
        &self,
        token: &Address,
        current_balance: U256,
        apy_bps: U256,
        reward_accrued: U256,
    ) -> Result<StrategyAnalytics> {
        if !self.is_supported(token) {
            return Ok(StrategyAnalytics::default());
        }
        let account = self.account(token);
        let net_deposits = self.net_deposits(token)?;
        Ok(StrategyAnalytics {
            current_balance,
            total_deposited: account.total_deposited,
            total_withdrawn: account.total_withdrawn,
            net_deposits,
            accrued_yield: current_balance.saturating_sub(net_deposits),
            apy_bps,
            reward_accrued,
        })
    }
}
