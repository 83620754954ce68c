// src/api/mod.rs

pub mod balances;
pub mod chains;
pub mod health;
pub mod prices;
pub mod settings;
pub mod staking;
pub mod tx;

use std::sync::Arc;

use crate::{
    chains::ChainRegistry,
    config::Config,
    error::{AppError, Result},
    integrations::{CoinGeckoClient, CosmosRestClient, FetchClient},
    services::{BalanceAggregator, BalanceCache, ChainSettingsStore, PriceCache},
    utils::SystemClock,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub registry: Arc<ChainRegistry>,
    pub rest: CosmosRestClient,
    pub prices: Arc<PriceCache>,
    pub settings: Arc<ChainSettingsStore>,
    pub balances: Arc<BalanceAggregator>,
}

impl AppState {
    /// Wires the registry, caches and clients from configuration.
    pub async fn from_config(config: Config) -> Result<Self> {
        let registry = Arc::new(ChainRegistry::load(config.chain_registry_path.as_deref())?);
        tracing::info!("Chain registry loaded with {} chains", registry.len());

        let fetch = FetchClient::from_config(&config);
        let rest = CosmosRestClient::new(fetch.clone());
        let clock = Arc::new(SystemClock);

        let price_source = Arc::new(CoinGeckoClient::new(config.price_api_url.clone(), fetch));
        let prices = Arc::new(PriceCache::new(
            registry.clone(),
            price_source,
            clock.clone(),
            config.price_cache_ttl(),
        ));
        let settings =
            Arc::new(ChainSettingsStore::load(&config.chain_settings_path, registry.clone()).await?);
        let cache = Arc::new(BalanceCache::new(clock, config.balance_cache_ttl()));
        let balances = Arc::new(BalanceAggregator::new(
            registry.clone(),
            settings.clone(),
            Arc::new(rest.clone()),
            prices.clone(),
            cache,
        ));

        Ok(Self {
            config,
            registry,
            rest,
            prices,
            settings,
            balances,
        })
    }
}

/// Rejects anything that is not a bech32 account address.
pub fn require_bech32(address: &str) -> Result<String> {
    let address = address.trim();
    bech32::decode(address)
        .map_err(|e| AppError::BadRequest(format!("Invalid address '{}': {}", address, e)))?;
    Ok(address.to_string())
}

#[cfg(test)]
pub(crate) async fn test_state(tag: &str) -> AppState {
    let mut config = crate::config::test_config();
    config.chain_settings_path = crate::services::chain_settings::temp_settings_path(tag)
        .to_string_lossy()
        .into_owned();
    AppState::from_config(config).await.unwrap()
}
