//! Yield vault chain interaction layer.
//!
//! This crate provides:
//! - Oracle collaborator traits with Chainlink and Pyth RPC implementations
//! - Dual-source price resolution with staleness fallback
//! - ERC-20 and lending market traits (Aave V3 pools, Compound V3 markets)
//! - Strategy adapters that move coordinator funds into those markets
//!
//! Market support is controlled via the `aave-v3` and `compound-v3` feature
//! flags (both on by default).

pub mod contracts;
pub mod oracle;
mod price_feed;
pub mod strategy;

#[cfg(test)]
mod testing;

#[cfg(feature = "aave-v3")]
pub use contracts::RpcAavePool;
#[cfg(feature = "compound-v3")]
pub use contracts::RpcComet;
pub use contracts::{
    AavePool, AavePoolView, CometMarket, CometView, RpcErc20, TokenBalances, TokenLedger,
};
pub use oracle::{
    ChainlinkFeed, ExponentPrice, PriceReading, PriceSource, PriceSourceKind, PrimaryFeed,
    PrimaryFeedSource, PythFeed, RoundData, SecondaryFeed, StalenessPolicy,
};
pub use price_feed::PriceFeedManager;
#[cfg(feature = "aave-v3")]
pub use strategy::AaveV3Strategy;
#[cfg(feature = "compound-v3")]
pub use strategy::CompoundV3Strategy;
pub use strategy::{Strategy, StrategyCore, StrategyKind};
