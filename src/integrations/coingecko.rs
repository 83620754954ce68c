use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;

use super::fetch::{FetchClient, FetchOptions};
use crate::{
    error::{AppError, Result},
    services::price_cache::PriceSource,
};

#[derive(Debug, Deserialize)]
struct SimplePricePayload {
    usd: Option<f64>,
}

type SimplePriceResponse = HashMap<String, SimplePricePayload>;

/// `/simple/price` client for the CoinGecko-compatible price index.
#[derive(Clone)]
pub struct CoinGeckoClient {
    base_url: String,
    fetch: FetchClient,
}

impl CoinGeckoClient {
    pub fn new(base_url: impl Into<String>, fetch: FetchClient) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            fetch,
        }
    }

    fn simple_price_url(&self, id: &str) -> String {
        format!("{}/simple/price?ids={}&vs_currencies=usd", self.base_url, id)
    }
}

#[async_trait]
impl PriceSource for CoinGeckoClient {
    async fn fetch_usd_price(&self, coingecko_id: &str) -> Result<f64> {
        let url = self.simple_price_url(coingecko_id);
        let payload: SimplePriceResponse = self.fetch.get_typed(&url, &FetchOptions::default()).await?;

        let price = payload
            .get(coingecko_id)
            .and_then(|p| p.usd)
            .ok_or_else(|| AppError::Validation(format!("No USD price for {}", coingecko_id)))?;
        if !price.is_finite() || price < 0.0 {
            return Err(AppError::Validation(format!(
                "Invalid USD price {} for {}",
                price, coingecko_id
            )));
        }

        Ok(price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integrations::fetch::fast_client;
    use crate::test_support::spawn_stub;
    use axum::{extract::Query, routing::get, Json, Router};
    use serde_json::{json, Value};

    async fn stub_index() -> String {
        spawn_stub(Router::new().route(
            "/simple/price",
            get(|Query(params): Query<HashMap<String, String>>| async move {
                let body = match params.get("ids").map(String::as_str) {
                    Some("osmosis") => json!({"osmosis": {"usd": 0.5}}),
                    Some("broken") => json!({"broken": {"usd": -1.0}}),
                    _ => json!({}),
                };
                Json::<Value>(body)
            }),
        ))
        .await
    }

    #[tokio::test]
    async fn reads_usd_price_for_id() {
        let client = CoinGeckoClient::new(stub_index().await, fast_client(1));
        assert_eq!(client.fetch_usd_price("osmosis").await.unwrap(), 0.5);
    }

    #[tokio::test]
    async fn missing_id_is_validation_error() {
        let client = CoinGeckoClient::new(stub_index().await, fast_client(1));
        assert!(matches!(
            client.fetch_usd_price("unknown").await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn negative_price_is_rejected() {
        let client = CoinGeckoClient::new(stub_index().await, fast_client(1));
        assert!(client.fetch_usd_price("broken").await.is_err());
    }
}
