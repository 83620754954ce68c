// Shared helpers for async tests: in-process HTTP stubs and a manual clock.

use axum::Router;
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::utils::Clock;

/// Serves `router` on an ephemeral local port and returns its base URL.
pub async fn spawn_stub(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind stub listener");
    let addr = listener.local_addr().expect("stub local addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("stub server");
    });
    format!("http://{}", addr)
}

#[derive(Debug, Clone, Default)]
pub struct HitCounter(Arc<AtomicUsize>);

impl HitCounter {
    /// Records a hit and returns the 1-based hit number.
    pub fn hit(&self) -> usize {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            now: Mutex::new(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()),
        })
    }

    pub fn advance_secs(&self, secs: i64) {
        let mut now = self.now.lock().unwrap();
        *now += ChronoDuration::seconds(secs);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

/// Price source answering from a fixed table; ids missing from it fail.
#[derive(Debug, Default)]
pub struct FakePriceSource {
    prices: Mutex<std::collections::HashMap<String, f64>>,
    delay: Mutex<Option<std::time::Duration>>,
    calls: HitCounter,
}

impl FakePriceSource {
    pub fn with_prices(prices: &[(&str, f64)]) -> Arc<Self> {
        let source = Self::default();
        source.set_prices(prices);
        Arc::new(source)
    }

    pub fn set_prices(&self, prices: &[(&str, f64)]) {
        let mut table = self.prices.lock().unwrap();
        table.clear();
        table.extend(prices.iter().map(|(id, p)| (id.to_string(), *p)));
    }

    pub fn set_delay(&self, delay: std::time::Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn calls(&self) -> usize {
        self.calls.count()
    }
}

#[async_trait::async_trait]
impl crate::services::price_cache::PriceSource for FakePriceSource {
    async fn fetch_usd_price(&self, coingecko_id: &str) -> crate::error::Result<f64> {
        self.calls.hit();
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.prices
            .lock()
            .unwrap()
            .get(coingecko_id)
            .copied()
            .ok_or_else(|| crate::error::AppError::Network(format!("price index down for {}", coingecko_id)))
    }
}

/// Chain data keyed by REST base URL, with optional per-chain delay and panic.
#[derive(Debug, Default)]
pub struct FakeChainData {
    balances: Mutex<std::collections::HashMap<String, (String, String, String)>>,
    delays: Mutex<std::collections::HashMap<String, std::time::Duration>>,
    panics: Mutex<std::collections::HashSet<String>>,
    seen: Mutex<Vec<(String, String)>>,
}

impl FakeChainData {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_balance(&self, rest: &str, available: &str, staked: &str, rewards: &str) {
        self.balances.lock().unwrap().insert(
            rest.to_string(),
            (available.to_string(), staked.to_string(), rewards.to_string()),
        );
    }

    pub fn set_delay(&self, rest: &str, delay: std::time::Duration) {
        self.delays.lock().unwrap().insert(rest.to_string(), delay);
    }

    pub fn set_panic(&self, rest: &str) {
        self.panics.lock().unwrap().insert(rest.to_string());
    }

    /// `(rest, address)` pairs seen by `fetch_available`.
    pub fn seen(&self) -> Vec<(String, String)> {
        self.seen.lock().unwrap().clone()
    }

    fn lookup(&self, rest: &str) -> ((String, String, String), Option<std::time::Duration>) {
        if self.panics.lock().unwrap().contains(rest) {
            panic!("chain data exploded for {}", rest);
        }
        let values = self
            .balances
            .lock()
            .unwrap()
            .get(rest)
            .cloned()
            .unwrap_or_else(|| ("0".to_string(), "0".to_string(), "0".to_string()));
        let delay = self.delays.lock().unwrap().get(rest).copied();
        (values, delay)
    }
}

#[async_trait::async_trait]
impl crate::integrations::cosmos_rest::ChainDataSource for FakeChainData {
    async fn fetch_available(&self, rest: &str, address: &str, _denom: &str, _decimals: u32) -> String {
        self.seen
            .lock()
            .unwrap()
            .push((rest.to_string(), address.to_string()));
        let ((available, _, _), delay) = self.lookup(rest);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        available
    }

    async fn fetch_staked(&self, rest: &str, _address: &str, _decimals: u32) -> String {
        self.lookup(rest).0 .1
    }

    async fn fetch_rewards(&self, rest: &str, _address: &str, _denom: &str, _decimals: u32) -> String {
        self.lookup(rest).0 .2
    }
}

/// Enabled-chain source; `None` simulates unreadable settings.
#[derive(Debug)]
pub struct FakeEnabledChains(Mutex<Option<Vec<String>>>);

impl FakeEnabledChains {
    pub fn new(chains: &[&str]) -> Arc<Self> {
        Arc::new(Self(Mutex::new(Some(
            chains.iter().map(|c| c.to_string()).collect(),
        ))))
    }

    pub fn set(&self, chains: &[&str]) {
        *self.0.lock().unwrap() = Some(chains.iter().map(|c| c.to_string()).collect());
    }

    pub fn fail(&self) {
        *self.0.lock().unwrap() = None;
    }
}

#[async_trait::async_trait]
impl crate::services::chain_settings::EnabledChains for FakeEnabledChains {
    async fn enabled_chains(&self) -> crate::error::Result<Vec<String>> {
        self.0
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| crate::error::AppError::Settings("settings unavailable".to_string()))
    }
}
