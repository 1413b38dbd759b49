//! Dual-oracle price resolution.
//!
//! Each token may have a primary (round-based) and a secondary
//! (exponent-based) source. Resolution tries the primary first and falls back
//! to the secondary on any primary failure; if the secondary fails too, its
//! error is returned. Nothing is cached: every call reads live feed state and
//! measures staleness against the current clock.

use crate::oracle::{
    PriceReading, PriceSource, PriceSourceKind, PrimaryFeed, PrimaryFeedSource, SecondaryFeed,
    StalenessPolicy,
};
use alloy::primitives::{Address, B256, U256};
use dashmap::DashMap;
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, info, warn};
use yieldvault_core::u256_math::{self, PRICE_DECIMALS};
use yieldvault_core::{Clock, Error, Result};

/// Largest answer precision accepted for a primary feed.
const MAX_FEED_DECIMALS: u8 = 18;

/// Resolves USD prices for tokens from two independent sources.
pub struct PriceFeedManager {
    owner: Address,
    primary: Arc<dyn PrimaryFeed>,
    secondary: Arc<dyn SecondaryFeed>,
    clock: Arc<dyn Clock>,
    policy: StalenessPolicy,
    /// Configured sources by token
    sources: DashMap<Address, PriceSource>,
}

impl std::fmt::Debug for PriceFeedManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PriceFeedManager")
            .field("owner", &self.owner)
            .field("token_count", &self.sources.len())
            .field("policy", &self.policy)
            .finish()
    }
}

impl PriceFeedManager {
    pub fn new(
        owner: Address,
        primary: Arc<dyn PrimaryFeed>,
        secondary: Arc<dyn SecondaryFeed>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            owner,
            primary,
            secondary,
            clock,
            policy: StalenessPolicy::default(),
            sources: DashMap::new(),
        }
    }

    /// Override the staleness thresholds.
    pub fn with_policy(mut self, policy: StalenessPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> StalenessPolicy {
        self.policy
    }

    fn only_owner(&self, caller: Address) -> Result<()> {
        if caller != self.owner {
            return Err(Error::UnauthorizedAccess { caller });
        }
        Ok(())
    }

    /// Set or clear (`None`) the primary feed. Clearing wipes feed and decimals.
    pub fn set_primary_feed(
        &self,
        caller: Address,
        token: Address,
        feed: Option<Address>,
        decimals: u8,
    ) -> Result<()> {
        self.only_owner(caller)?;
        if token.is_zero() {
            return Err(Error::InvalidTokenAddress);
        }

        let primary = match feed {
            Some(feed) if feed.is_zero() => return Err(Error::InvalidAddress),
            Some(_) if decimals > MAX_FEED_DECIMALS => return Err(Error::InvalidAmount),
            Some(feed) => Some(PrimaryFeedSource { feed, decimals }),
            None => None,
        };

        self.update_source(token, |source| source.primary = primary);
        info!(token = %token, feed = ?feed, decimals, "Primary price feed updated");
        Ok(())
    }

    /// Set the secondary price id. A zero id is rejected.
    pub fn set_secondary_feed(&self, caller: Address, token: Address, price_id: B256) -> Result<()> {
        self.only_owner(caller)?;
        if token.is_zero() {
            return Err(Error::InvalidTokenAddress);
        }
        if price_id.is_zero() {
            return Err(Error::InvalidPriceId);
        }

        self.update_source(token, |source| source.secondary = Some(price_id));
        info!(token = %token, price_id = %price_id, "Secondary price feed updated");
        Ok(())
    }

    /// Remove the secondary price id.
    pub fn clear_secondary_feed(&self, caller: Address, token: Address) -> Result<()> {
        self.only_owner(caller)?;
        self.update_source(token, |source| source.secondary = None);
        info!(token = %token, "Secondary price feed cleared");
        Ok(())
    }

    fn update_source(&self, token: Address, apply: impl FnOnce(&mut PriceSource)) {
        let mut source = self.source(&token);
        apply(&mut source);
        if source.is_configured() {
            self.sources.insert(token, source);
        } else {
            self.sources.remove(&token);
        }
    }

    /// Configured sources for a token (empty when none).
    pub fn source(&self, token: &Address) -> PriceSource {
        self.sources.get(token).map(|s| *s).unwrap_or_default()
    }

    /// True iff at least one source is configured.
    pub fn has_price_feed(&self, token: &Address) -> bool {
        self.sources.get(token).is_some_and(|s| s.is_configured())
    }

    /// Tokens with at least one source.
    pub fn tokens(&self) -> Vec<Address> {
        self.sources.iter().map(|e| *e.key()).collect()
    }

    /// Readings timestamped ahead of the clock are rejected as invalid.
    fn check_fresh(&self, token: Address, observed_at: u64, kind: PriceSourceKind) -> Result<()> {
        let age_secs = self
            .clock
            .now()
            .checked_sub(observed_at)
            .ok_or(Error::InvalidPrice(token))?;
        let max_age_secs = self.policy.max_age(kind).as_secs();
        if age_secs > max_age_secs {
            return Err(Error::StalePrice {
                token,
                age_secs,
                max_age_secs,
            });
        }
        Ok(())
    }

    /// Read and validate the primary feed.
    pub async fn read_primary(&self, token: Address) -> Result<PriceReading> {
        let source = self
            .source(&token)
            .primary
            .ok_or(Error::PriceFeedNotFound(token))?;

        let round = self.primary.latest_round(source.feed).await?;

        if !round.is_valid() {
            return Err(Error::InvalidPrice(token));
        }
        self.check_fresh(token, round.updated_at, PriceSourceKind::Primary)?;

        let price = u256_math::rescale(round.answer, source.decimals, PRICE_DECIMALS)?;
        if price.is_zero() {
            return Err(Error::InvalidPrice(token));
        }

        Ok(PriceReading {
            price,
            observed_at: round.updated_at,
            source: PriceSourceKind::Primary,
        })
    }

    /// Read, validate and normalize the secondary feed.
    pub async fn read_secondary(&self, token: Address) -> Result<PriceReading> {
        let price_id = self
            .source(&token)
            .secondary
            .ok_or(Error::PriceFeedNotFound(token))?;

        let reading = self.secondary.latest_unsafe(price_id).await?;

        if reading.price <= 0 {
            return Err(Error::InvalidPrice(token));
        }
        self.check_fresh(token, reading.publish_time, PriceSourceKind::Secondary)?;

        let mantissa = U256::from(reading.price.unsigned_abs());
        let price = u256_math::normalize_expo(mantissa, reading.expo)
            .filter(|p| !p.is_zero())
            .ok_or(Error::InvalidPrice(token))?;

        Ok(PriceReading {
            price,
            observed_at: reading.publish_time,
            source: PriceSourceKind::Secondary,
        })
    }

    /// Resolve a price and report which source answered.
    pub async fn get_price_with_source(&self, token: Address) -> Result<PriceReading> {
        match self.read_primary(token).await {
            Ok(reading) => {
                debug!(token = %token, price = %reading.price, "Primary price");
                Ok(reading)
            }
            Err(primary_err) => {
                if !matches!(primary_err, Error::PriceFeedNotFound(_)) {
                    warn!(token = %token, error = %primary_err, "Primary feed rejected, trying secondary");
                }
                let reading = self.read_secondary(token).await?;
                debug!(token = %token, price = %reading.price, "Secondary price");
                Ok(reading)
            }
        }
    }

    /// Resolve the 8-decimal USD price of a token.
    pub async fn get_price(&self, token: Address) -> Result<U256> {
        Ok(self.get_price_with_source(token).await?.price)
    }

    /// Resolve several tokens concurrently.
    pub async fn get_prices(&self, tokens: &[Address]) -> Vec<(Address, Result<PriceReading>)> {
        let readings = join_all(tokens.iter().map(|t| self.get_price_with_source(*t))).await;
        tokens.iter().copied().zip(readings).collect()
    }

    /// Token amount → 18-decimal USD value.
    pub async fn to_usd(&self, token: Address, amount: U256, token_decimals: u8) -> Result<U256> {
        let price = self.get_price(token).await?;
        u256_math::to_usd_wad(amount, price, token_decimals)
    }

    /// 18-decimal USD value → token amount.
    pub async fn from_usd(&self, token: Address, usd_value: U256, token_decimals: u8) -> Result<U256> {
        let price = self.get_price(token).await?;
        u256_math::from_usd_wad(usd_value, price, token_decimals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockPrimaryFeed, MockSecondaryFeed};
    use yieldvault_core::ManualClock;

    const OWNER: Address = Address::repeat_byte(0xee);
    const WETH: Address = Address::repeat_byte(0x01);
    const FEED: Address = Address::repeat_byte(0xf1);
    const NOW: u64 = 1_700_000_000;

    fn price_id() -> B256 {
        B256::repeat_byte(0xab)
    }

    struct Fixture {
        manager: PriceFeedManager,
        primary: Arc<MockPrimaryFeed>,
        secondary: Arc<MockSecondaryFeed>,
        clock: Arc<ManualClock>,
    }

    fn fixture() -> Fixture {
        let primary = Arc::new(MockPrimaryFeed::default());
        let secondary = Arc::new(MockSecondaryFeed::default());
        let clock = Arc::new(ManualClock::new(NOW));
        let manager = PriceFeedManager::new(OWNER, primary.clone(), secondary.clone(), clock.clone());
        manager.set_primary_feed(OWNER, WETH, Some(FEED), 8).unwrap();
        manager.set_secondary_feed(OWNER, WETH, price_id()).unwrap();
        Fixture {
            manager,
            primary,
            secondary,
            clock,
        }
    }

    #[tokio::test]
    async fn test_primary_price() {
        let f = fixture();
        f.primary.set_round(FEED, 200_000_000_000, NOW - 60);

        let reading = f.manager.get_price_with_source(WETH).await.unwrap();
        assert_eq!(reading.price, U256::from(200_000_000_000u64));
        assert_eq!(reading.source, PriceSourceKind::Primary);
    }

    #[tokio::test]
    async fn test_primary_decimals_are_normalized() {
        let f = fixture();
        f.manager.set_primary_feed(OWNER, WETH, Some(FEED), 18).unwrap();
        f.primary
            .set_round(FEED, 2_000 * 10u128.pow(18), NOW);

        let price = f.manager.read_primary(WETH).await.unwrap().price;
        assert_eq!(price, U256::from(200_000_000_000u64));
    }

    #[tokio::test]
    async fn test_stale_primary_falls_back_to_fresh_secondary() {
        let f = fixture();
        f.primary.set_round(FEED, 200_000_000_000, NOW - 3601);
        f.secondary.set_price(price_id(), 199_950, -2, NOW - 5);

        let err = f.manager.read_primary(WETH).await.unwrap_err();
        assert!(matches!(err, Error::StalePrice { age_secs: 3601, max_age_secs: 3600, .. }));

        let reading = f.manager.get_price_with_source(WETH).await.unwrap();
        assert_eq!(reading.source, PriceSourceKind::Secondary);
        assert_eq!(reading.price, U256::from(199_950_000_000u64));
    }

    #[tokio::test]
    async fn test_both_stale_fails_closed() {
        let f = fixture();
        f.primary.set_round(FEED, 200_000_000_000, NOW - 7200);
        f.secondary.set_price(price_id(), 2_000, 0, NOW - 21);

        let err = f.manager.get_price(WETH).await.unwrap_err();
        assert!(matches!(err, Error::StalePrice { max_age_secs: 20, .. }));
    }

    #[tokio::test]
    async fn test_staleness_boundary_is_inclusive() {
        let f = fixture();
        f.primary.set_round(FEED, 100_000_000, NOW - 3600);
        assert!(f.manager.read_primary(WETH).await.is_ok());

        f.secondary.set_price(price_id(), 1, 0, NOW - 20);
        assert!(f.manager.read_secondary(WETH).await.is_ok());

        f.clock.advance(1);
        assert!(f.manager.read_primary(WETH).await.is_err());
        assert!(f.manager.read_secondary(WETH).await.is_err());
    }

    #[tokio::test]
    async fn test_primary_validation() {
        let f = fixture();

        f.primary.set_round(FEED, 0, NOW);
        assert!(matches!(
            f.manager.read_primary(WETH).await,
            Err(Error::InvalidPrice(_))
        ));

        // Answer carried over from an earlier round
        f.primary.set_round_data(
            FEED,
            crate::oracle::RoundData {
                round_id: 10,
                answer: U256::from(100_000_000u64),
                started_at: NOW,
                updated_at: NOW,
                answered_in_round: 9,
            },
        );
        assert!(matches!(
            f.manager.read_primary(WETH).await,
            Err(Error::InvalidPrice(_))
        ));
    }

    #[tokio::test]
    async fn test_primary_rpc_failure_falls_back() {
        let f = fixture();
        f.primary.fail(FEED);
        f.secondary.set_price(price_id(), 3, 0, NOW);

        assert!(matches!(
            f.manager.read_primary(WETH).await,
            Err(Error::External(_))
        ));
        assert_eq!(
            f.manager.get_price(WETH).await.unwrap(),
            U256::from(300_000_000u64)
        );
    }

    #[tokio::test]
    async fn test_secondary_validation() {
        let f = fixture();
        f.secondary.set_price(price_id(), -5, -8, NOW);
        assert!(matches!(
            f.manager.read_secondary(WETH).await,
            Err(Error::InvalidPrice(_))
        ));

        f.secondary.set_price(price_id(), 5, 9, NOW);
        assert!(matches!(
            f.manager.read_secondary(WETH).await,
            Err(Error::InvalidPrice(_))
        ));

        f.secondary.set_price(price_id(), 5, -19, NOW);
        assert!(matches!(
            f.manager.read_secondary(WETH).await,
            Err(Error::InvalidPrice(_))
        ));

        // Precision loss down to zero is not a valid price
        f.secondary.set_price(price_id(), 5, -18, NOW);
        assert!(matches!(
            f.manager.read_secondary(WETH).await,
            Err(Error::InvalidPrice(_))
        ));
    }

    #[tokio::test]
    async fn test_exponent_normalization() {
        let f = fixture();

        f.secondary.set_price(price_id(), 2, 3, NOW);
        assert_eq!(
            f.manager.read_secondary(WETH).await.unwrap().price,
            U256::from(2_000u64) * U256::from(100_000_000u64)
        );

        f.secondary.set_price(price_id(), 2_000_000, -6, NOW);
        assert_eq!(
            f.manager.read_secondary(WETH).await.unwrap().price,
            U256::from(200_000_000u64)
        );
    }

    #[tokio::test]
    async fn test_source_configuration() {
        let f = fixture();
        let other = Address::repeat_byte(0x02);

        assert!(f.manager.has_price_feed(&WETH));
        assert!(!f.manager.has_price_feed(&other));
        assert!(matches!(
            f.manager.get_price(other).await,
            Err(Error::PriceFeedNotFound(t)) if t == other
        ));

        assert!(matches!(
            f.manager.set_secondary_feed(OWNER, other, B256::ZERO),
            Err(Error::InvalidPriceId)
        ));
        assert!(matches!(
            f.manager.set_primary_feed(WETH, other, Some(FEED), 8),
            Err(Error::UnauthorizedAccess { .. })
        ));
        assert!(matches!(
            f.manager.set_primary_feed(OWNER, other, Some(Address::ZERO), 8),
            Err(Error::InvalidAddress)
        ));

        // Clearing the primary wipes feed and decimals but keeps the secondary
        f.manager.set_primary_feed(OWNER, WETH, None, 0).unwrap();
        assert_eq!(f.manager.source(&WETH).primary, None);
        assert!(f.manager.has_price_feed(&WETH));

        f.manager.clear_secondary_feed(OWNER, WETH).unwrap();
        assert!(!f.manager.has_price_feed(&WETH));
        assert!(f.manager.tokens().is_empty());
    }

    #[tokio::test]
    async fn test_usd_conversions() {
        let f = fixture();
        f.primary.set_round(FEED, 200_000_000_000, NOW);

        let one_token = U256::from(10u64).pow(U256::from(18u64));
        let usd = f.manager.to_usd(WETH, one_token, 18).await.unwrap();
        assert_eq!(usd, U256::from(2_000u64) * one_token);

        let back = f.manager.from_usd(WETH, usd, 18).await.unwrap();
        assert_eq!(back, one_token);
    }

    #[tokio::test]
    async fn test_usd_conversion_overflow_is_reported() {
        let f = fixture();
        f.primary.set_round(FEED, 100_000_000, NOW);

        assert!(matches!(
            f.manager.to_usd(WETH, U256::from(1u64), 100).await,
            Err(Error::ArithmeticOverflow)
        ));
        assert!(matches!(
            f.manager.from_usd(WETH, U256::from(1u64), 80).await,
            Err(Error::ArithmeticOverflow)
        ));
    }

    #[tokio::test]
    async fn test_future_timestamp_is_rejected() {
        let f = fixture();
        f.primary.set_round(FEED, 200_000_000_000, NOW + 1);
        f.secondary.set_price(price_id(), 1_999, 0, NOW);

        assert!(matches!(
            f.manager.read_primary(WETH).await,
            Err(Error::InvalidPrice(t)) if t == WETH
        ));
        let reading = f.manager.get_price_with_source(WETH).await.unwrap();
        assert_eq!(reading.source, PriceSourceKind::Secondary);
        assert_eq!(reading.price, U256::from(199_900_000_000u64));

        f.secondary.set_price(price_id(), 1_999, 0, NOW + 30);
        assert!(matches!(
            f.manager.get_price(WETH).await,
            Err(Error::InvalidPrice(_))
        ));
    }

    #[tokio::test]
    async fn test_get_prices_batch() {
        let f = fixture();
        f.primary.set_round(FEED, 100_000_000, NOW);
        let missing = Address::repeat_byte(0x09);

        let results = f.manager.get_prices(&[WETH, missing]).await;
        assert!(results[0].1.is_ok());
        assert!(matches!(results[1].1, Err(Error::PriceFeedNotFound(_))));
    }
}
