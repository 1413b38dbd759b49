//! Oracle type definitions.

use alloy::primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Which source answered a price request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PriceSourceKind {
    /// Round-based aggregator (Chainlink)
    Primary,
    /// Exponent-based pull oracle (Pyth)
    Secondary,
}

impl PriceSourceKind {
    /// Default staleness threshold for this source.
    pub fn default_max_age(&self) -> Duration {
        match self {
            Self::Primary => Duration::from_secs(3600), // 1 hour
            Self::Secondary => Duration::from_secs(20),
        }
    }
}

/// A validated price, normalized to 8 decimals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceReading {
    /// Price with 8 decimals
    pub price: U256,
    /// Unix timestamp of the observation
    pub observed_at: u64,
    /// Source that produced it
    pub source: PriceSourceKind,
}

impl PriceReading {
    /// Get age in seconds.
    pub fn age_secs(&self, current_time: u64) -> u64 {
        current_time.saturating_sub(self.observed_at)
    }
}

/// Primary feed configuration for a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimaryFeedSource {
    /// Aggregator address
    pub feed: Address,
    /// Answer decimals
    pub decimals: u8,
}

/// Configured price sources for a token.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceSource {
    pub primary: Option<PrimaryFeedSource>,
    pub secondary: Option<B256>,
}

impl PriceSource {
    /// Whether any source is configured.
    pub fn is_configured(&self) -> bool {
        self.primary.is_some() || self.secondary.is_some()
    }
}

/// Max ages per source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StalenessPolicy {
    pub primary_max_age: Duration,
    pub secondary_max_age: Duration,
}

impl Default for StalenessPolicy {
    fn default() -> Self {
        Self {
            primary_max_age: PriceSourceKind::Primary.default_max_age(),
            secondary_max_age: PriceSourceKind::Secondary.default_max_age(),
        }
    }
}

impl StalenessPolicy {
    pub fn max_age(&self, kind: PriceSourceKind) -> Duration {
        match kind {
            PriceSourceKind::Primary => self.primary_max_age,
            PriceSourceKind::Secondary => self.secondary_max_age,
        }
    }
}

impl From<&yieldvault_core::OracleSettings> for StalenessPolicy {
    fn from(settings: &yieldvault_core::OracleSettings) -> Self {
        Self {
            primary_max_age: settings.primary_max_age(),
            secondary_max_age: settings.secondary_max_age(),
        }
    }
}
