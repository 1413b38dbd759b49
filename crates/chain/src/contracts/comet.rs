//! Compound V3 (Comet) reads.

use super::CometView;
use alloy::primitives::{Address, U256};
use alloy::providers::Provider;
use alloy::sol;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;

sol! {
    #[sol(rpc)]
    interface IComet {
        struct UserBasic {
            int104 principal;
            uint64 baseTrackingIndex;
            uint64 baseTrackingAccrued;
            uint16 assetsIn;
            uint8 _reserved;
        }

        function baseToken() external view returns (address);
        function balanceOf(address account) external view returns (uint256);
        function getUtilization() external view returns (uint256);
        function getSupplyRate(uint256 utilization) external view returns (uint64);
        function userBasic(address account) external view returns (UserBasic memory);
    }
}

/// Reads any Comet market through one provider.
#[derive(Clone)]
pub struct RpcComet<P> {
    provider: Arc<P>,
}

impl<P> std::fmt::Debug for RpcComet<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcComet").finish_non_exhaustive()
    }
}

impl<P: Provider + Clone + 'static> RpcComet<P> {
    pub fn new(provider: Arc<P>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl<P: Provider + Clone + Send + Sync + 'static> CometView for RpcComet<P> {
    async fn base_token(&self, market: Address) -> Result<Address> {
        let comet = IComet::new(market, &*self.provider);
        let base = comet
            .baseToken()
            .call()
            .await
            .with_context(|| format!("baseToken failed on {market}"))?;
        Ok(base._0)
    }

    async fn balance_of(&self, market: Address, account: Address) -> Result<U256> {
        let comet = IComet::new(market, &*self.provider);
        let balance = comet
            .balanceOf(account)
            .call()
            .await
            .with_context(|| format!("balanceOf({account}) failed on {market}"))?;
        Ok(balance._0)
    }

    async fn utilization(&self, market: Address) -> Result<U256> {
        let comet = IComet::new(market, &*self.provider);
        let utilization = comet
            .getUtilization()
            .call()
            .await
            .with_context(|| format!("getUtilization failed on {market}"))?;
        Ok(utilization._0)
    }

    async fn supply_rate(&self, market: Address, utilization: U256) -> Result<U256> {
        let comet = IComet::new(market, &*self.provider);
        let rate = comet
            .getSupplyRate(utilization)
            .call()
            .await
            .with_context(|| format!("getSupplyRate failed on {market}"))?;
        Ok(U256::from(rate._0))
    }

    async fn reward_accrued(&self, market: Address, account: Address) -> Result<U256> {
        let comet = IComet::new(market, &*self.provider);
        let basic = comet.userBasic(account).call().await?._0;
        Ok(U256::from(basic.baseTrackingAccrued))
    }
}
