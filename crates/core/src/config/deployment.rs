//! Deployment file: RPC endpoint, identities, price feeds and strategy markets.

use super::expand_env;
use alloy::primitives::{Address, B256};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Top-level deployment configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentConfig {
    /// Deployment name (for logging)
    #[serde(default = "default_name")]
    pub name: String,
    /// JSON-RPC endpoint, `${VAR}` references are expanded
    pub rpc_url: String,
    /// Account that holds strategy positions
    pub strategy_account: Address,
    /// Strategy owner
    pub owner: Address,
    /// Coordinator (vault) allowed to deposit/withdraw
    pub coordinator: Address,
    /// Oracle staleness policy and contracts
    #[serde(default)]
    pub oracle: OracleSettings,
    /// Per-token price sources
    #[serde(default)]
    pub price_feeds: Vec<PriceFeedConfig>,
    /// AAVE V3 pool strategy
    #[serde(default)]
    pub aave: Option<AaveConfig>,
    /// Compound V3 market strategy
    #[serde(default)]
    pub compound: Option<CompoundConfig>,
}

fn default_name() -> String {
    "default".to_string()
}

/// Oracle staleness thresholds and the Pyth contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleSettings {
    /// Max age of a Chainlink answer
    #[serde(default = "default_primary_max_age")]
    pub primary_max_age_secs: u64,
    /// Max age of a Pyth price
    #[serde(default = "default_secondary_max_age")]
    pub secondary_max_age_secs: u64,
    /// Pyth contract address
    #[serde(default)]
    pub pyth: Option<Address>,
}

fn default_primary_max_age() -> u64 {
    3600
}
fn default_secondary_max_age() -> u64 {
    20
}

impl Default for OracleSettings {
    fn default() -> Self {
        Self {
            primary_max_age_secs: default_primary_max_age(),
            secondary_max_age_secs: default_secondary_max_age(),
            pyth: None,
        }
    }
}

impl OracleSettings {
    pub fn primary_max_age(&self) -> Duration {
        Duration::from_secs(self.primary_max_age_secs)
    }

    pub fn secondary_max_age(&self) -> Duration {
        Duration::from_secs(self.secondary_max_age_secs)
    }
}

/// Price sources for one token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceFeedConfig {
    /// Token symbol (display only)
    pub symbol: String,
    pub token: Address,
    /// Token decimals, used for USD conversion
    pub decimals: u8,
    /// Chainlink aggregator
    #[serde(default)]
    pub chainlink: Option<Address>,
    /// Chainlink answer decimals
    #[serde(default = "default_feed_decimals")]
    pub chainlink_decimals: u8,
    /// Pyth price id (hex, 32 bytes)
    #[serde(default)]
    pub pyth_id: Option<String>,
}

fn default_feed_decimals() -> u8 {
    8
}

impl PriceFeedConfig {
    /// Decode the Pyth price id.
    pub fn price_id(&self) -> Result<Option<B256>> {
        let Some(raw) = self.pyth_id.as_deref() else {
            return Ok(None);
        };
        let bytes = hex::decode(raw.trim_start_matches("0x"))
            .with_context(|| format!("Invalid pyth_id for {}", self.symbol))?;
        if bytes.len() != 32 {
            bail!("pyth_id for {} must be 32 bytes, got {}", self.symbol, bytes.len());
        }
        Ok(Some(B256::from_slice(&bytes)))
    }
}

/// AAVE V3 pool strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AaveConfig {
    pub pool: Address,
    /// Tokens to enable at startup
    #[serde(default)]
    pub tokens: Vec<Address>,
}

/// Compound V3 strategy: one Comet market per base token.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompoundConfig {
    #[serde(default)]
    pub markets: Vec<CometMarketConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CometMarketConfig {
    pub token: Address,
    pub comet: Address,
}

impl DeploymentConfig {
    /// Parse from TOML content and expand environment references.
    pub fn from_toml(content: &str) -> Result<Self> {
        let mut config: Self =
            toml::from_str(content).context("Failed to parse deployment config")?;
        config.rpc_url = expand_env(&config.rpc_url);
        config.validate()?;
        Ok(config)
    }

    /// Load from file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_toml(&content)
    }

    /// Load from `YIELDVAULT_CONFIG` (default `./config/deployment.toml`).
    pub fn from_env() -> Result<Self> {
        let path = std::env::var("YIELDVAULT_CONFIG")
            .unwrap_or_else(|_| "./config/deployment.toml".to_string());
        Self::from_file(path)
    }

    /// Reject configurations the strategies would refuse anyway.
    pub fn validate(&self) -> Result<()> {
        if self.rpc_url.contains("${") {
            bail!("Unresolved environment reference in rpc_url: {}", self.rpc_url);
        }
        for (name, address) in [
            ("strategy_account", self.strategy_account),
            ("owner", self.owner),
            ("coordinator", self.coordinator),
        ] {
            if address.is_zero() {
                bail!("{name} must not be the zero address");
            }
        }
        for feed in &self.price_feeds {
            if feed.token.is_zero() {
                bail!("price feed {} has a zero token address", feed.symbol);
            }
            if feed.chainlink.is_none() && feed.pyth_id.is_none() {
                bail!("price feed {} has neither chainlink nor pyth_id", feed.symbol);
            }
            if feed.pyth_id.is_some() && self.oracle.pyth.is_none() {
                bail!("price feed {} uses pyth but [oracle].pyth is not set", feed.symbol);
            }
            feed.price_id()?;
        }
        Ok(())
    }

    /// Log a summary.
    pub fn log_config(&self) {
        tracing::info!(
            name = %self.name,
            strategy_account = %self.strategy_account,
            coordinator = %self.coordinator,
            "Deployment configuration loaded"
        );
        tracing::info!(
            feeds = self.price_feeds.len(),
            primary_max_age = self.oracle.primary_max_age_secs,
            secondary_max_age = self.oracle.secondary_max_age_secs,
            "Oracle settings"
        );
        if let Some(aave) = &self.aave {
            tracing::info!(pool = %aave.pool, tokens = aave.tokens.len(), "AAVE V3 strategy");
        }
        if let Some(compound) = &self.compound {
            tracing::info!(markets = compound.markets.len(), "Compound V3 strategy");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
name = "mainnet"
rpc_url = "${YV_DEPLOYMENT_TEST_RPC}/v2"
strategy_account = "0x00000000000000000000000000000000000000aa"
owner = "0x00000000000000000000000000000000000000bb"
coordinator = "0x00000000000000000000000000000000000000cc"

[oracle]
primary_max_age_secs = 1800
pyth = "0x4305FB66699C3B2702D4d05CF36551390A4c69C6"

[[price_feeds]]
symbol = "WETH"
token = "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2"
decimals = 18
chainlink = "0x5f4eC3Df9cbd43714FE2740f5E3616155c5b8419"
pyth_id = "0xff61491a931112ddf1bd8147cd1b641375f79f5825126d665480874634fd0ace"

[[price_feeds]]
symbol = "USDC"
token = "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48"
decimals = 6
chainlink = "0x8fFfFfd4AfB6115b954Bd326cbe7B4BA576818f6"

[aave]
pool = "0x87870Bca3F3fD6335C3F4ce8392D69350B4fA4E2"
tokens = ["0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48"]

[[compound.markets]]
token = "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48"
comet = "0xc3d688B66703497DAA19211EEdff47f25384cdc3"
"#;

    #[test]
    fn test_deployment_parsing() {
        std::env::set_var("YV_DEPLOYMENT_TEST_RPC", "https://eth.example");
        let config = DeploymentConfig::from_toml(SAMPLE).unwrap();
        std::env::remove_var("YV_DEPLOYMENT_TEST_RPC");

        assert_eq!(config.name, "mainnet");
        assert_eq!(config.rpc_url, "https://eth.example/v2");
        assert_eq!(config.oracle.primary_max_age_secs, 1800);
        assert_eq!(config.oracle.secondary_max_age_secs, 20); // default
        assert_eq!(config.price_feeds.len(), 2);

        let weth = &config.price_feeds[0];
        assert_eq!(weth.chainlink_decimals, 8); // default
        assert!(weth.price_id().unwrap().is_some());
        assert!(config.price_feeds[1].price_id().unwrap().is_none());

        assert_eq!(config.aave.as_ref().unwrap().tokens.len(), 1);
        assert_eq!(config.compound.as_ref().unwrap().markets.len(), 1);
    }

    #[test]
    fn test_unresolved_env_is_rejected() {
        let err = DeploymentConfig::from_toml(
            &SAMPLE.replace("YV_DEPLOYMENT_TEST_RPC", "YV_DEPLOYMENT_MISSING_RPC"),
        )
        .unwrap_err();
        assert!(err.to_string().contains("Unresolved environment reference"));
    }

    #[test]
    fn test_bad_price_id_is_rejected() {
        let feed = PriceFeedConfig {
            symbol: "X".to_string(),
            token: Address::repeat_byte(1),
            decimals: 18,
            chainlink: None,
            chainlink_decimals: 8,
            pyth_id: Some("0xabcd".to_string()),
        };
        assert!(feed.price_id().is_err());
    }
}
