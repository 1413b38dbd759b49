//! Pyth price reads over RPC.

use super::{ExponentPrice, SecondaryFeed};
use alloy::primitives::{Address, B256};
use alloy::providers::Provider;
use alloy::sol;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;

sol! {
    #[sol(rpc)]
    interface IPyth {
        struct Price {
            int64 price;
            uint64 conf;
            int32 expo;
            uint256 publishTime;
        }

        function getPriceUnsafe(bytes32 id) external view returns (Price memory);
    }
}

/// Reads prices from a deployed Pyth contract.
#[derive(Clone)]
pub struct PythFeed<P> {
    /// Pyth contract address
    pyth: Address,
    provider: Arc<P>,
}

impl<P> std::fmt::Debug for PythFeed<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PythFeed").field("pyth", &self.pyth).finish()
    }
}

impl<P: Provider + Clone + 'static> PythFeed<P> {
    pub fn new(pyth: Address, provider: Arc<P>) -> Self {
        Self { pyth, provider }
    }

    pub fn address(&self) -> Address {
        self.pyth
    }
}

#[async_trait]
impl<P: Provider + Clone + Send + Sync + 'static> SecondaryFeed for PythFeed<P> {
    async fn latest_unsafe(&self, price_id: B256) -> Result<ExponentPrice> {
        let contract = IPyth::new(self.pyth, &*self.provider);
        let price = contract
            .getPriceUnsafe(price_id)
            .call()
            .await
            .with_context(|| format!("getPriceUnsafe failed for {price_id}"))?
            ._0;

        Ok(ExponentPrice {
            price: price.price,
            conf: price.conf,
            expo: price.expo,
            publish_time: price.publishTime.saturating_to::<u64>(),
        })
    }
}
