//! Chainlink aggregator reads over RPC.

use super::{PrimaryFeed, RoundData};
use alloy::primitives::{Address, U256};
use alloy::providers::Provider;
use alloy::sol;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;

// Chainlink AggregatorV3 interface
sol! {
    #[sol(rpc)]
    interface IAggregatorV3 {
        function latestRoundData() external view returns (
            uint80 roundId,
            int256 answer,
            uint256 startedAt,
            uint256 updatedAt,
            uint80 answeredInRound
        );

        function decimals() external view returns (uint8);

        function description() external view returns (string memory);
    }
}

/// Reads any AggregatorV3 feed through one provider.
#[derive(Clone)]
pub struct ChainlinkFeed<P> {
    provider: Arc<P>,
}

impl<P> std::fmt::Debug for ChainlinkFeed<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainlinkFeed").finish_non_exhaustive()
    }
}

impl<P: Provider + Clone + 'static> ChainlinkFeed<P> {
    pub fn new(provider: Arc<P>) -> Self {
        Self { provider }
    }

    /// Fetch answer decimals from the aggregator.
    pub async fn fetch_decimals(&self, feed: Address) -> Result<u8> {
        let contract = IAggregatorV3::new(feed, &*self.provider);
        let decimals = contract.decimals().call().await?;
        Ok(decimals._0)
    }

    /// Fetch the aggregator description (e.g. "ETH / USD").
    pub async fn fetch_description(&self, feed: Address) -> Result<String> {
        let contract = IAggregatorV3::new(feed, &*self.provider);
        let desc = contract.description().call().await?;
        Ok(desc._0)
    }
}

#[async_trait]
impl<P: Provider + Clone + Send + Sync + 'static> PrimaryFeed for ChainlinkFeed<P> {
    async fn latest_round(&self, feed: Address) -> Result<RoundData> {
        let contract = IAggregatorV3::new(feed, &*self.provider);
        let round = contract
            .latestRoundData()
            .call()
            .await
            .with_context(|| format!("latestRoundData failed for {feed}"))?;

        // Convert int256 answer to U256 (price should always be positive)
        let answer = if round.answer.is_negative() {
            U256::ZERO
        } else {
            // I256 is two's complement, so positive values have same bit representation
            U256::from_limbs(round.answer.into_raw().into_limbs())
        };

        Ok(RoundData {
            round_id: round.roundId.to::<u128>(),
            answer,
            started_at: round.startedAt.saturating_to::<u64>(),
            updated_at: round.updatedAt.saturating_to::<u64>(),
            answered_in_round: round.answeredInRound.to::<u128>(),
        })
    }
}
