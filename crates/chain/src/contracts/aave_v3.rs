//! Aave V3 pool reads.

use super::AavePoolView;
use alloy::primitives::{Address, U256};
use alloy::providers::Provider;
use alloy::sol;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;

sol! {
    /// Aave V3 Pool interface (reserve reads)
    #[sol(rpc)]
    interface IPool {
        // ReserveConfigurationMap is a single-word struct; it is ABI-identical
        // to a bare uint256.
        struct ReserveData {
            uint256 configuration;
            uint128 liquidityIndex;
            uint128 currentLiquidityRate;
            uint128 variableBorrowIndex;
            uint128 currentVariableBorrowRate;
            uint128 currentStableBorrowRate;
            uint40 lastUpdateTimestamp;
            uint16 id;
            address aTokenAddress;
            address stableDebtTokenAddress;
            address variableDebtTokenAddress;
            address interestRateStrategyAddress;
            uint128 accruedToTreasury;
            uint128 unbacked;
            uint128 isolationModeTotalDebt;
        }

        function getReserveData(address asset) external view returns (ReserveData memory);
    }
}

/// Reads reserve state from an Aave V3 pool.
#[derive(Clone)]
pub struct RpcAavePool<P> {
    pool: Address,
    provider: Arc<P>,
}

impl<P> std::fmt::Debug for RpcAavePool<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcAavePool").field("pool", &self.pool).finish()
    }
}

impl<P: Provider + Clone + 'static> RpcAavePool<P> {
    pub fn new(pool: Address, provider: Arc<P>) -> Self {
        Self { pool, provider }
    }

    pub fn address(&self) -> Address {
        self.pool
    }

    async fn reserve_data(&self, token: Address) -> Result<IPool::ReserveData> {
        let contract = IPool::new(self.pool, &*self.provider);
        let data = contract
            .getReserveData(token)
            .call()
            .await
            .with_context(|| format!("getReserveData({token}) failed on pool {}", self.pool))?;
        Ok(data._0)
    }
}

#[async_trait]
impl<P: Provider + Clone + Send + Sync + 'static> AavePoolView for RpcAavePool<P> {
    async fn reserve_receipt_token(&self, token: Address) -> Result<Address> {
        Ok(self.reserve_data(token).await?.aTokenAddress)
    }

    async fn liquidity_rate(&self, token: Address) -> Result<U256> {
        Ok(U256::from(self.reserve_data(token).await?.currentLiquidityRate))
    }
}
