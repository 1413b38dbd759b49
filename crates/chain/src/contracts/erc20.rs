use super::TokenBalances;
use alloy::primitives::{Address, U256};
use alloy::providers::Provider;
use alloy::sol;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;

sol! {
    #[sol(rpc)]
    interface IERC20 {
        function balanceOf(address account) external view returns (uint256);
        function decimals() external view returns (uint8);
        function symbol() external view returns (string);
    }
}

/// ERC-20 reads over RPC.
#[derive(Clone)]
pub struct RpcErc20<P> {
    provider: Arc<P>,
}

impl<P> std::fmt::Debug for RpcErc20<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcErc20").finish_non_exhaustive()
    }
}

impl<P: Provider + Clone + 'static> RpcErc20<P> {
    pub fn new(provider: Arc<P>) -> Self {
        Self { provider }
    }

    pub async fn decimals(&self, token: Address) -> Result<u8> {
        let contract = IERC20::new(token, &*self.provider);
        Ok(contract.decimals().call().await?._0)
    }

    pub async fn symbol(&self, token: Address) -> Result<String> {
        let contract = IERC20::new(token, &*self.provider);
        Ok(contract.symbol().call().await?._0)
    }
}

#[async_trait]
impl<P: Provider + Clone + Send + Sync + 'static> TokenBalances for RpcErc20<P> {
    async fn balance_of(&self, token: Address, account: Address) -> Result<U256> {
        let contract = IERC20::new(token, &*self.provider);
        let balance = contract
            .balanceOf(account)
            .call()
            .await
            .with_context(|| format!("balanceOf({account}) failed on {token}"))?;
        Ok(balance._0)
    }
}
