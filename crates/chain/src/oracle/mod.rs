//! Oracle abstraction layer for dual-source pricing.
//!
//! This module provides the collaborator traits the price feed manager reads
//! from, and their RPC implementations.
//!
//! # Architecture
//!
//! - [`PrimaryFeed`]: round-based aggregators addressed by feed contract
//! - [`SecondaryFeed`]: exponent-based pull oracle addressed by price id
//!
//! # Supported Oracle Types
//!
//! - **Chainlink**: AggregatorV3 `latestRoundData` (primary)
//! - **Pyth**: `getPriceUnsafe` (secondary)
//!
//! # Example
//!
//! ```rust,ignore
//! use yieldvault_chain::oracle::{ChainlinkFeed, PrimaryFeed};
//!
//! let chainlink = ChainlinkFeed::new(provider.clone());
//! let round = chainlink.latest_round(eth_usd_aggregator).await?;
//! ```

mod chainlink;
mod pyth;
mod types;

pub use chainlink::ChainlinkFeed;
pub use pyth::PythFeed;
pub use types::{PriceReading, PriceSource, PriceSourceKind, PrimaryFeedSource, StalenessPolicy};

use alloy::primitives::{Address, B256, U256};
use anyhow::Result;
use async_trait::async_trait;
use std::fmt::Debug;

/// Round-based price feed (Chainlink AggregatorV3 shape).
#[async_trait]
pub trait PrimaryFeed: Send + Sync + Debug {
    /// Latest round reported by the aggregator at `feed`.
    async fn latest_round(&self, feed: Address) -> Result<RoundData>;
}

/// Exponent-based price feed (Pyth shape).
#[async_trait]
pub trait SecondaryFeed: Send + Sync + Debug {
    /// Latest price for `price_id`, without on-chain freshness checks.
    async fn latest_unsafe(&self, price_id: B256) -> Result<ExponentPrice>;
}

/// Round data from an aggregator.
#[derive(Debug, Clone)]
pub struct RoundData {
    /// Round ID
    pub round_id: u128,
    /// Price answer (negative answers are mapped to zero)
    pub answer: U256,
    /// Timestamp when round started
    pub started_at: u64,
    /// Timestamp when answer was computed
    pub updated_at: u64,
    /// Round ID for which answer was computed
    pub answered_in_round: u128,
}

impl RoundData {
    /// Check if this round's data is usable: positive answer, not carried
    /// over from an earlier round.
    pub fn is_valid(&self) -> bool {
        !self.answer.is_zero() && self.answered_in_round >= self.round_id
    }
}

/// `price * 10^expo` reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExponentPrice {
    /// Signed mantissa
    pub price: i64,
    /// Confidence interval, same exponent
    pub conf: u64,
    pub expo: i32,
    /// Unix timestamp
    pub publish_time: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_data_validity() {
        let valid_round = RoundData {
            round_id: 100,
            answer: U256::from(200_000_000_000u64), // $2000
            started_at: 1700000000,
            updated_at: 1700000100,
            answered_in_round: 100,
        };
        assert!(valid_round.is_valid());

        let carried_over = RoundData {
            answered_in_round: 99,
            ..valid_round.clone()
        };
        assert!(!carried_over.is_valid());

        let zero = RoundData {
            answer: U256::ZERO,
            ..valid_round
        };
        assert!(!zero.is_valid());
    }
}
