//! Deployment configuration.
//!
//! A single TOML file describes the RPC endpoint, the strategy identities,
//! per-token price sources and the lending markets each strategy uses.

mod deployment;

pub use deployment::{
    AaveConfig, CometMarketConfig, CompoundConfig, DeploymentConfig, OracleSettings,
    PriceFeedConfig,
};

use std::sync::OnceLock;

/// Expand ${VAR_NAME} patterns with environment variable values.
///
/// Unknown variables are left in place.
pub fn expand_env(s: &str) -> String {
    static PATTERN: OnceLock<regex_lite::Regex> = OnceLock::new();
    let re = PATTERN.get_or_init(|| {
        regex_lite::Regex::new(r"\$\{([^}]+)\}").expect("static pattern compiles")
    });

    let mut result = s.to_string();
    for cap in re.captures_iter(s) {
        if let (Some(full_match), Some(var_match)) = (cap.get(0), cap.get(1)) {
            if let Ok(value) = std::env::var(var_match.as_str()) {
                result = result.replace(full_match.as_str(), &value);
            }
        }
    }
    result
}
