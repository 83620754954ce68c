use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};

use crate::{
    chains::{ChainConfig, ChainRegistry},
    error::Result,
    utils::Clock,
};

/// Seam over the external price index.
#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn fetch_usd_price(&self, coingecko_id: &str) -> Result<f64>;
}

#[derive(Debug, Clone, Copy)]
struct PriceEntry {
    price: f64,
    timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PriceQuote {
    pub chain: String,
    pub price_usd: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fetched_at: Option<DateTime<Utc>>,
}

/// USD price per chain with a TTL and stale-on-error fallback.
pub struct PriceCache {
    registry: Arc<ChainRegistry>,
    source: Arc<dyn PriceSource>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    entries: RwLock<HashMap<String, PriceEntry>>,
    /// One lock per registered chain; held across a fetch so concurrent
    /// misses share a single request.
    fetch_locks: HashMap<String, Mutex<()>>,
}

impl PriceCache {
    pub fn new(
        registry: Arc<ChainRegistry>,
        source: Arc<dyn PriceSource>,
        clock: Arc<dyn Clock>,
        ttl: Duration,
    ) -> Self {
        let fetch_locks = registry
            .chains()
            .map(|c| (c.name.clone(), Mutex::new(())))
            .collect();
        Self {
            fetch_locks,
            registry,
            source,
            clock,
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Never fails: fresh cache, then the price index, then the last known
    /// price, then the registry fallback, then zero.
    pub async fn get_price(&self, chain: &str) -> f64 {
        let Some(config) = self.registry.find(chain) else {
            tracing::warn!("Price requested for unknown chain {}", chain);
            return 0.0;
        };

        let Some(coingecko_id) = config.coingecko_id.as_deref() else {
            return fallback_for(config);
        };

        if let Some(price) = self.fresh_price(&config.name).await {
            return price;
        }

        let _guard = match self.fetch_locks.get(&config.name) {
            Some(lock) => Some(lock.lock().await),
            None => None,
        };
        // another caller may have filled the entry while we waited
        if let Some(price) = self.fresh_price(&config.name).await {
            return price;
        }

        let now = self.clock.now();
        let cached = self.entries.read().await.get(&config.name).copied();
        match self.source.fetch_usd_price(coingecko_id).await {
            Ok(price) if price.is_finite() && price >= 0.0 => {
                self.entries.write().await.insert(
                    config.name.clone(),
                    PriceEntry {
                        price,
                        timestamp: now,
                    },
                );
                price
            }
            Ok(price) => {
                tracing::warn!("Discarding invalid price {} for {}", price, config.name);
                cached.map(|e| e.price).unwrap_or_else(|| fallback_for(config))
            }
            Err(e) => {
                tracing::warn!("Price fetch for {} failed: {}", config.name, e);
                cached.map(|e| e.price).unwrap_or_else(|| fallback_for(config))
            }
        }
    }

    pub async fn quote(&self, chain: &str) -> PriceQuote {
        let name = self.registry.resolve_name(chain);
        let price_usd = self.get_price(&name).await;
        let fetched_at = self.entries.read().await.get(&name).map(|e| e.timestamp);
        PriceQuote {
            chain: name,
            price_usd,
            fetched_at,
        }
    }

    async fn fresh_price(&self, name: &str) -> Option<f64> {
        let entry = self.entries.read().await.get(name).copied()?;
        if self.is_fresh(&entry, self.clock.now()) {
            tracing::debug!("Price cache hit for {}", name);
            Some(entry.price)
        } else {
            None
        }
    }

    fn is_fresh(&self, entry: &PriceEntry, now: DateTime<Utc>) -> bool {
        match (now - entry.timestamp).to_std() {
            Ok(age) => age < self.ttl,
            // clock went backwards
            Err(_) => true,
        }
    }
}

fn fallback_for(config: &ChainConfig) -> f64 {
    config.fallback_price.unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chains::registry::test_chain;
    use crate::test_support::{FakePriceSource, ManualClock};

    fn registry() -> Arc<ChainRegistry> {
        let mut juno = test_chain("juno", "juno-1", "juno", "ujuno");
        juno.coingecko_id = Some("juno-network".to_string());
        juno.fallback_price = Some(0.25);

        let mut regen = test_chain("regen", "regen-1", "regen", "uregen");
        regen.coingecko_id = None;
        regen.fallback_price = Some(0.03);

        let chains = vec![test_chain("osmosis", "osmosis-1", "osmo", "uosmo"), juno, regen];
        let aliases = HashMap::from([("osmo".to_string(), "osmosis".to_string())]);
        Arc::new(ChainRegistry::new(chains, aliases).unwrap())
    }

    fn cache(source: Arc<FakePriceSource>, clock: Arc<ManualClock>) -> PriceCache {
        PriceCache::new(registry(), source, clock, Duration::from_secs(300))
    }

    #[tokio::test]
    async fn fresh_entry_skips_the_source() {
        let source = FakePriceSource::with_prices(&[("osmosis", 0.5)]);
        let clock = ManualClock::new();
        let cache = cache(source.clone(), clock.clone());

        assert_eq!(cache.get_price("osmosis").await, 0.5);
        clock.advance_secs(299);
        assert_eq!(cache.get_price("osmosis").await, 0.5);
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn expired_entry_is_refetched() {
        let source = FakePriceSource::with_prices(&[("osmosis", 0.5)]);
        let clock = ManualClock::new();
        let cache = cache(source.clone(), clock.clone());

        cache.get_price("osmosis").await;
        source.set_prices(&[("osmosis", 0.6)]);
        clock.advance_secs(300);
        assert_eq!(cache.get_price("osmosis").await, 0.6);
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn stale_price_served_when_source_fails() {
        let source = FakePriceSource::with_prices(&[("osmosis", 0.95)]);
        let clock = ManualClock::new();
        let cache = cache(source.clone(), clock.clone());

        cache.get_price("osmosis").await;
        source.set_prices(&[]);
        clock.advance_secs(3_600);
        assert_eq!(cache.get_price("osmosis").await, 0.95);
        // timestamp untouched, so the next call tries again
        assert_eq!(cache.get_price("osmosis").await, 0.95);
        assert_eq!(source.calls(), 3);
    }

    #[tokio::test]
    async fn recent_price_served_while_index_is_down() {
        let source = FakePriceSource::with_prices(&[("juno-network", 0.95)]);
        let clock = ManualClock::new();
        let cache = cache(source.clone(), clock.clone());

        cache.get_price("juno").await;
        source.set_prices(&[]);
        clock.advance_secs(120);
        assert_eq!(cache.get_price("juno").await, 0.95);
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn cold_failure_uses_registry_fallback_then_zero() {
        let source = FakePriceSource::with_prices(&[]);
        let cache = cache(source, ManualClock::new());

        assert_eq!(cache.get_price("juno").await, 0.25);
        assert_eq!(cache.get_price("osmosis").await, 0.0);
        assert_eq!(cache.get_price("nonexistent").await, 0.0);
    }

    #[tokio::test]
    async fn chain_without_index_id_never_calls_source() {
        let source = FakePriceSource::with_prices(&[("regen", 9.0)]);
        let cache = cache(source.clone(), ManualClock::new());

        assert_eq!(cache.get_price("regen").await, 0.03);
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test]
    async fn aliases_share_one_entry() {
        let source = FakePriceSource::with_prices(&[("osmosis", 0.5)]);
        let cache = cache(source.clone(), ManualClock::new());

        cache.get_price("osmo").await;
        cache.get_price("osmosis").await;
        assert_eq!(source.calls(), 1);

        let quote = cache.quote("osmo").await;
        assert_eq!(quote.chain, "osmosis");
        assert!(quote.fetched_at.is_some());
    }

    #[tokio::test]
    async fn concurrent_misses_share_one_request() {
        let source = FakePriceSource::with_prices(&[("osmosis", 0.5)]);
        source.set_delay(Duration::from_millis(100));
        let cache = cache(source.clone(), ManualClock::new());

        let (a, b) = tokio::join!(cache.get_price("osmosis"), cache.get_price("osmo"));
        assert_eq!((a, b), (0.5, 0.5));
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn invalid_price_falls_back() {
        let source = FakePriceSource::with_prices(&[("juno-network", f64::NAN)]);
        let cache = cache(source, ManualClock::new());
        assert_eq!(cache.get_price("juno").await, 0.25);
    }
}
