use serde::Deserialize;
use std::env;
use std::time::Duration;

use crate::constants::{
    BALANCE_CACHE_TTL_SECS, FETCH_MAX_ATTEMPTS, FETCH_RETRY_DELAY_MS, FETCH_TIMEOUT_SECS,
    PRICE_CACHE_TTL_SECS, PRICE_WARMER_INTERVAL_SECS,
};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // Server
    pub host: String,
    pub port: u16,
    pub environment: String,

    // Chain registry and persisted settings
    pub chain_registry_path: Option<String>,
    pub chain_settings_path: String,

    // Price index
    pub price_api_url: String,
    pub price_cache_ttl_secs: u64,

    // Balance cache
    pub balance_cache_ttl_secs: u64,

    // Fetch retry wrapper
    pub fetch_timeout_secs: u64,
    pub fetch_max_attempts: u32,
    pub fetch_retry_delay_ms: u64,
    pub rate_limit_per_host_rps: Option<u32>,

    // Background services
    pub price_warmer_interval_secs: u64,

    // CORS
    pub cors_allowed_origins: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();

        Ok(Config {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()?,
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),

            chain_registry_path: env::var("CHAIN_REGISTRY_PATH")
                .ok()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            chain_settings_path: env::var("CHAIN_SETTINGS_PATH")
                .unwrap_or_else(|_| "chain-settings.json".to_string()),

            price_api_url: env::var("PRICE_API_URL")
                .unwrap_or_else(|_| "https://api.coingecko.com/api/v3".to_string()),
            price_cache_ttl_secs: env::var("PRICE_CACHE_TTL_SECS")
                .unwrap_or_else(|_| PRICE_CACHE_TTL_SECS.to_string())
                .parse()?,

            balance_cache_ttl_secs: env::var("BALANCE_CACHE_TTL_SECS")
                .unwrap_or_else(|_| BALANCE_CACHE_TTL_SECS.to_string())
                .parse()?,

            fetch_timeout_secs: env::var("FETCH_TIMEOUT_SECS")
                .unwrap_or_else(|_| FETCH_TIMEOUT_SECS.to_string())
                .parse()?,
            fetch_max_attempts: env::var("FETCH_MAX_ATTEMPTS")
                .unwrap_or_else(|_| FETCH_MAX_ATTEMPTS.to_string())
                .parse()?,
            fetch_retry_delay_ms: env::var("FETCH_RETRY_DELAY_MS")
                .unwrap_or_else(|_| FETCH_RETRY_DELAY_MS.to_string())
                .parse()?,
            rate_limit_per_host_rps: env::var("RATE_LIMIT_PER_HOST_RPS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|rps: &u32| *rps > 0),

            price_warmer_interval_secs: env::var("PRICE_WARMER_INTERVAL_SECS")
                .unwrap_or_else(|_| PRICE_WARMER_INTERVAL_SECS.to_string())
                .parse()?,

            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .unwrap_or_else(|_| "*".to_string()),
        })
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.fetch_max_attempts == 0 {
            anyhow::bail!("FETCH_MAX_ATTEMPTS must be at least 1");
        }
        if self.fetch_timeout_secs == 0 {
            anyhow::bail!("FETCH_TIMEOUT_SECS must be > 0");
        }
        if url::Url::parse(&self.price_api_url).is_err() {
            anyhow::bail!("PRICE_API_URL is not a valid URL: {}", self.price_api_url);
        }
        if self.chain_settings_path.trim().is_empty() {
            anyhow::bail!("CHAIN_SETTINGS_PATH is empty");
        }

        if self.price_cache_ttl_secs == 0 {
            tracing::warn!("PRICE_CACHE_TTL_SECS is 0; every price lookup will hit the price index");
        }
        if self.balance_cache_ttl_secs == 0 {
            tracing::warn!("BALANCE_CACHE_TTL_SECS is 0; cached snapshots are never served");
        }
        if self.fetch_max_attempts > 10 {
            tracing::warn!("FETCH_MAX_ATTEMPTS={} is unusually high", self.fetch_max_attempts);
        }
        if self.cors_allowed_origins.trim().is_empty() {
            tracing::warn!("CORS_ALLOWED_ORIGINS is empty; requests may be blocked");
        }

        Ok(())
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn fetch_retry_delay(&self) -> Duration {
        Duration::from_millis(self.fetch_retry_delay_ms)
    }

    pub fn price_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.price_cache_ttl_secs)
    }

    pub fn balance_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.balance_cache_ttl_secs)
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        environment: "test".to_string(),
        chain_registry_path: None,
        chain_settings_path: "chain-settings.json".to_string(),
        price_api_url: "https://api.coingecko.com/api/v3".to_string(),
        price_cache_ttl_secs: PRICE_CACHE_TTL_SECS,
        balance_cache_ttl_secs: BALANCE_CACHE_TTL_SECS,
        fetch_timeout_secs: FETCH_TIMEOUT_SECS,
        fetch_max_attempts: FETCH_MAX_ATTEMPTS,
        fetch_retry_delay_ms: FETCH_RETRY_DELAY_MS,
        rate_limit_per_host_rps: None,
        price_warmer_interval_secs: 0,
        cors_allowed_origins: "*".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_rejects_zero_attempts() {
        let mut config = test_config();
        config.fetch_max_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_bad_price_url() {
        let mut config = test_config();
        config.price_api_url = "not a url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn defaults_validate() {
        assert!(test_config().validate().is_ok());
        assert_eq!(test_config().price_cache_ttl(), Duration::from_secs(300));
    }
}
