//! Yield vault strategy inspector
//!
//! Loads a deployment file, wires live RPC collaborators and prints a JSON
//! report of:
//! - resolved USD prices per configured token, with the answering source
//! - Aave V3 reserve state (aToken, supply APY, strategy position)
//! - Compound V3 market state (base token, utilization, supply APY,
//!   strategy position, accrued rewards)

use std::sync::Arc;

use alloy::primitives::{Address, U256};
use alloy::providers::{Provider, ProviderBuilder};
use anyhow::{Context, Result};
use futures::future::join_all;
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use yieldvault_chain::{
    AavePoolView, ChainlinkFeed, CometView, PriceFeedManager, PriceSourceKind, PythFeed,
    RpcAavePool, RpcComet, RpcErc20, StalenessPolicy, TokenBalances,
};
use yieldvault_core::config::{AaveConfig, CompoundConfig};
use yieldvault_core::u256_math::{self, price_to_f64};
use yieldvault_core::{DeploymentConfig, SystemClock};

#[derive(Debug, Serialize)]
struct Report {
    deployment: String,
    generated_at: String,
    block: u64,
    strategy_account: Address,
    prices: Vec<PriceEntry>,
    aave: Vec<AaveReserveEntry>,
    compound: Vec<CometMarketEntry>,
}

#[derive(Debug, Serialize)]
struct PriceEntry {
    symbol: String,
    token: Address,
    #[serde(skip_serializing_if = "Option::is_none")]
    price_usd: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    price_raw: Option<U256>,
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<PriceSourceKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    observed_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct AaveReserveEntry {
    token: Address,
    a_token: Address,
    listed: bool,
    apy_bps: U256,
    position: U256,
}

#[derive(Debug, Serialize)]
struct CometMarketEntry {
    token: Address,
    comet: Address,
    base_matches: bool,
    utilization: U256,
    apy_bps: U256,
    position: U256,
    reward_accrued: U256,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                EnvFilter::new("info,yieldvault_core=debug,yieldvault_chain=debug")
            }),
        )
        .init();

    let config = DeploymentConfig::from_env().context("Failed to load deployment config")?;
    config.log_config();

    let provider = Arc::new(
        ProviderBuilder::new().on_http(config.rpc_url.parse().context("Invalid rpc_url")?),
    );
    let block = provider.get_block_number().await?;
    info!(block = block, "Provider connection verified");

    let manager = build_price_feeds(&config, provider.clone())?;
    let prices = resolve_prices(&config, &manager).await;

    let aave = match &config.aave {
        Some(aave) => inspect_aave(aave, config.strategy_account, provider.clone()).await?,
        None => Vec::new(),
    };
    let compound = match &config.compound {
        Some(compound) => {
            inspect_compound(compound, config.strategy_account, provider.clone()).await?
        }
        None => Vec::new(),
    };

    let report = Report {
        deployment: config.name.clone(),
        generated_at: chrono::Utc::now().to_rfc3339(),
        block,
        strategy_account: config.strategy_account,
        prices,
        aave,
        compound,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}

/// Register every configured source with a fresh manager.
fn build_price_feeds<P>(config: &DeploymentConfig, provider: Arc<P>) -> Result<PriceFeedManager>
where
    P: Provider + Clone + Send + Sync + 'static,
{
    let chainlink = Arc::new(ChainlinkFeed::new(provider.clone()));
    let pyth = Arc::new(PythFeed::new(
        config.oracle.pyth.unwrap_or_default(),
        provider,
    ));

    let manager = PriceFeedManager::new(config.owner, chainlink, pyth, Arc::new(SystemClock))
        .with_policy(StalenessPolicy::from(&config.oracle));

    for feed in &config.price_feeds {
        if let Some(aggregator) = feed.chainlink {
            manager.set_primary_feed(
                config.owner,
                feed.token,
                Some(aggregator),
                feed.chainlink_decimals,
            )?;
        }
        if let Some(price_id) = feed.price_id()? {
            manager.set_secondary_feed(config.owner, feed.token, price_id)?;
        }
    }

    info!(tokens = manager.tokens().len(), "Price feeds registered");
    Ok(manager)
}

async fn resolve_prices(config: &DeploymentConfig, manager: &PriceFeedManager) -> Vec<PriceEntry> {
    let tokens: Vec<Address> = config.price_feeds.iter().map(|f| f.token).collect();
    let readings = manager.get_prices(&tokens).await;

    config
        .price_feeds
        .iter()
        .zip(readings)
        .map(|(feed, (token, reading))| match reading {
            Ok(reading) => PriceEntry {
                symbol: feed.symbol.clone(),
                token,
                price_usd: Some(price_to_f64(reading.price)),
                price_raw: Some(reading.price),
                source: Some(reading.source),
                observed_at: chrono::DateTime::from_timestamp(reading.observed_at as i64, 0)
                    .map(|t| t.to_rfc3339()),
                error: None,
            },
            Err(e) => {
                warn!(symbol = %feed.symbol, token = %token, error = %e, "Price unavailable");
                PriceEntry {
                    symbol: feed.symbol.clone(),
                    token,
                    price_usd: None,
                    price_raw: None,
                    source: None,
                    observed_at: None,
                    error: Some(e.to_string()),
                }
            }
        })
        .collect()
}

async fn inspect_aave<P>(
    aave: &AaveConfig,
    account: Address,
    provider: Arc<P>,
) -> Result<Vec<AaveReserveEntry>>
where
    P: Provider + Clone + Send + Sync + 'static,
{
    let pool = RpcAavePool::new(aave.pool, provider.clone());
    let erc20 = RpcErc20::new(provider);

    let entries = join_all(aave.tokens.iter().map(|&token| {
        let pool = &pool;
        let erc20 = &erc20;
        async move {
            let a_token = pool.reserve_receipt_token(token).await?;
            if a_token.is_zero() {
                warn!(token = %token, pool = %aave.pool, "Token not listed by pool");
                return Ok(AaveReserveEntry {
                    token,
                    a_token,
                    listed: false,
                    apy_bps: U256::ZERO,
                    position: U256::ZERO,
                });
            }
            let rate = pool.liquidity_rate(token).await?;
            let position = erc20.balance_of(a_token, account).await?;
            Ok::<_, anyhow::Error>(AaveReserveEntry {
                token,
                a_token,
                listed: true,
                apy_bps: u256_math::ray_rate_to_bps(rate),
                position,
            })
        }
    }))
    .await;

    entries.into_iter().collect()
}

async fn inspect_compound<P>(
    compound: &CompoundConfig,
    account: Address,
    provider: Arc<P>,
) -> Result<Vec<CometMarketEntry>>
where
    P: Provider + Clone + Send + Sync + 'static,
{
    let comet = RpcComet::new(provider);

    let entries = join_all(compound.markets.iter().map(|market| {
        let comet = &comet;
        async move {
            let base = comet.base_token(market.comet).await?;
            let utilization = comet.utilization(market.comet).await?;
            let rate = comet.supply_rate(market.comet, utilization).await?;
            let position = comet.balance_of(market.comet, account).await?;
            let reward_accrued = comet
                .reward_accrued(market.comet, account)
                .await
                .unwrap_or_else(|e| {
                    warn!(comet = %market.comet, error = %e, "Reward read failed");
                    U256::ZERO
                });
            if base != market.token {
                warn!(token = %market.token, comet = %market.comet, base = %base, "Market base token mismatch");
            }
            Ok::<_, anyhow::Error>(CometMarketEntry {
                token: market.token,
                comet: market.comet,
                base_matches: base == market.token,
                utilization,
                apy_bps: u256_math::per_second_wad_rate_to_bps(rate)?,
                position,
                reward_accrued,
            })
        }
    }))
    .await;

    entries.into_iter().collect()
}
