//! Lending market and token interfaces.
//!
//! Strategies never talk to a provider directly. They go through the traits
//! below so the same strategy code runs against live contracts or in-memory
//! doubles:
//!
//! - [`TokenBalances`] / [`TokenLedger`]: ERC-20 balance reads and transfers
//! - [`AavePoolView`] / [`AavePool`]: pool-based market (Aave V3 and forks)
//! - [`CometView`] / [`CometMarket`]: market-based lending (Compound V3)
//!
//! The `*View` traits have alloy RPC implementations. Write paths require a
//! signer and are supplied by the embedding application.
//!
//! # Example
//!
//! ```rust,ignore
//! use yieldvault_chain::contracts::{AavePoolView, RpcAavePool};
//!
//! let pool = RpcAavePool::new(pool_address, provider.clone());
//! let a_token = pool.reserve_receipt_token(usdc).await?;
//! ```

#[cfg(feature = "aave-v3")]
mod aave_v3;
#[cfg(feature = "compound-v3")]
mod comet;
mod erc20;

#[cfg(feature = "aave-v3")]
pub use aave_v3::RpcAavePool;
#[cfg(feature = "compound-v3")]
pub use comet::RpcComet;
pub use erc20::RpcErc20;

use alloy::primitives::{Address, U256};
use anyhow::Result;
use async_trait::async_trait;
use std::fmt::Debug;

/// ERC-20 balance reads.
#[async_trait]
pub trait TokenBalances: Send + Sync + Debug {
    async fn balance_of(&self, token: Address, account: Address) -> Result<U256>;
}

/// ERC-20 transfers on behalf of `from`.
///
/// Implementations perform `transferFrom` when `from` is not the sender's
/// own account and plain `transfer` otherwise.
#[async_trait]
pub trait TokenLedger: TokenBalances {
    async fn transfer(&self, token: Address, from: Address, to: Address, amount: U256) -> Result<()>;
}

/// Read side of an Aave V3 pool.
#[async_trait]
pub trait AavePoolView: Send + Sync + Debug {
    /// The reserve's aToken, or `Address::ZERO` when the pool does not list
    /// `token`.
    async fn reserve_receipt_token(&self, token: Address) -> Result<Address>;

    /// `currentLiquidityRate` (annual, RAY).
    async fn liquidity_rate(&self, token: Address) -> Result<U256>;
}

/// Write side of an Aave V3 pool.
#[async_trait]
pub trait AavePool: AavePoolView {
    /// `supply(asset, amount, onBehalfOf, referralCode)` sent by `caller`.
    async fn supply(
        &self,
        caller: Address,
        token: Address,
        amount: U256,
        on_behalf_of: Address,
        referral_code: u16,
    ) -> Result<()>;

    /// `withdraw(asset, amount, to)` sent by `caller`. Returns the amount the
    /// pool reports as withdrawn.
    async fn withdraw(&self, caller: Address, token: Address, amount: U256, to: Address)
        -> Result<U256>;
}

/// Read side of a Comet market. Every call names the market.
#[async_trait]
pub trait CometView: Send + Sync + Debug {
    async fn base_token(&self, market: Address) -> Result<Address>;

    /// Base-asset balance including accrued interest.
    async fn balance_of(&self, market: Address, account: Address) -> Result<U256>;

    /// Utilization, 1e18 scale.
    async fn utilization(&self, market: Address) -> Result<U256>;

    /// Per-second supply rate at `utilization`, 1e18 scale.
    async fn supply_rate(&self, market: Address, utilization: U256) -> Result<U256>;

    /// `baseTrackingAccrued` for `account` (1e6 scale).
    async fn reward_accrued(&self, market: Address, account: Address) -> Result<U256>;
}

/// Write side of a Comet market.
#[async_trait]
pub trait CometMarket: CometView {
    /// `supply(asset, amount)` sent by `caller`.
    async fn supply(&self, market: Address, caller: Address, token: Address, amount: U256)
        -> Result<()>;

    /// `withdrawTo(to, asset, amount)` sent by `caller`.
    async fn withdraw(
        &self,
        market: Address,
        caller: Address,
        to: Address,
        token: Address,
        amount: U256,
    ) -> Result<()>;
}
