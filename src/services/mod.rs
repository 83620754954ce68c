// All service modules
pub mod balance_aggregator;
pub mod balance_cache;
pub mod chain_settings;
pub mod gas_estimator;
pub mod price_cache;
pub mod price_warmer;
pub mod tx_feedback;

// Re-export for convenience
pub use balance_aggregator::BalanceAggregator;
pub use balance_cache::BalanceCache;
pub use chain_settings::ChainSettingsStore;
pub use price_cache::PriceCache;
pub use price_warmer::PriceWarmer;

use crate::config::Config;
use chain_settings::EnabledChains;
use std::sync::Arc;
use std::time::Duration;

/// Start all background services
pub async fn start_background_services(
    config: &Config,
    prices: Arc<PriceCache>,
    settings: Arc<dyn EnabledChains>,
) {
    tracing::info!("Starting background services...");

    if config.price_warmer_interval_secs == 0 {
        tracing::warn!("Price warmer disabled via PRICE_WARMER_INTERVAL_SECS=0");
        return;
    }

    let warmer = Arc::new(PriceWarmer::new(
        prices,
        settings,
        Duration::from_secs(config.price_warmer_interval_secs),
    ));
    warmer.start().await;
    tracing::info!(
        "Price warmer started (every {}s)",
        config.price_warmer_interval_secs
    );
}
