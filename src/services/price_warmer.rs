use std::sync::Arc;
use std::time::Duration;

use super::{chain_settings::EnabledChains, price_cache::PriceCache};
use crate::error::Result;

/// Keeps prices of enabled chains warm so refresh cycles rarely wait on the index.
pub struct PriceWarmer {
    prices: Arc<PriceCache>,
    settings: Arc<dyn EnabledChains>,
    interval: Duration,
}

impl PriceWarmer {
    pub fn new(prices: Arc<PriceCache>, settings: Arc<dyn EnabledChains>, interval: Duration) -> Self {
        Self {
            prices,
            settings,
            interval,
        }
    }

    pub async fn start(self: Arc<Self>) {
        tokio::spawn(async move {
            loop {
                match self.warm_once().await {
                    Ok(count) => tracing::debug!("Warmed prices for {} chains", count),
                    Err(e) => tracing::error!("Price warm-up failed: {}", e),
                }

                tokio::time::sleep(self.interval).await;
            }
        });
    }

    pub async fn warm_once(&self) -> Result<usize> {
        let chains = self.settings.enabled_chains().await?;
        for chain in &chains {
            let price = self.prices.get_price(chain).await;
            tracing::debug!("Price {}: {}", chain, price);
        }
        Ok(chains.len())
    }
}
