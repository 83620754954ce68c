use chrono::{DateTime, Utc};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::task::{AbortHandle, JoinHandle, JoinSet};

use super::{
    balance_cache::{BalanceCache, CachedSnapshot},
    chain_settings::EnabledChains,
    price_cache::PriceCache,
};
use crate::{
    chains::{translate, ChainConfig, ChainRegistry},
    constants::OWNER_IDLE_TTL_FACTOR,
    error::Result,
    integrations::cosmos_rest::ChainDataSource,
    models::{BalanceView, ChainBalance, MultiChainBalanceSnapshot, RefreshStatus, UsdValues},
    utils::{parse_display_amount, usd_value},
};

#[derive(Debug)]
struct OwnerState {
    cycle: u64,
    status: RefreshStatus,
    loading: BTreeSet<String>,
    error: Option<String>,
    last_requested: Option<DateTime<Utc>>,
}

impl Default for OwnerState {
    fn default() -> Self {
        Self {
            cycle: 0,
            status: RefreshStatus::Idle,
            loading: BTreeSet::new(),
            error: None,
            last_requested: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    Complete(CachedSnapshot),
    /// A newer cycle started for the same owner; this result was dropped.
    Superseded { cycle: u64 },
}

/// Orchestrates refresh cycles: one task per enabled chain, merged into a
/// snapshot that replaces the cached one wholesale.
pub struct BalanceAggregator {
    registry: Arc<ChainRegistry>,
    settings: Arc<dyn EnabledChains>,
    data: Arc<dyn ChainDataSource>,
    prices: Arc<PriceCache>,
    cache: Arc<BalanceCache>,
    owners: RwLock<HashMap<String, OwnerState>>,
    idle_after: Duration,
    fan_out: Mutex<Option<AbortHandle>>,
}

impl BalanceAggregator {
    pub fn new(
        registry: Arc<ChainRegistry>,
        settings: Arc<dyn EnabledChains>,
        data: Arc<dyn ChainDataSource>,
        prices: Arc<PriceCache>,
        cache: Arc<BalanceCache>,
    ) -> Self {
        let idle_after = cache.ttl().saturating_mul(OWNER_IDLE_TTL_FACTOR);
        Self {
            registry,
            settings,
            data,
            prices,
            cache,
            owners: RwLock::new(HashMap::new()),
            idle_after,
            fan_out: Mutex::new(None),
        }
    }

    pub async fn refresh(&self, owner: &str) -> Result<CycleOutcome> {
        let owner = owner.trim();
        self.prune_idle().await;
        let requested_at = self.cache.now();

        let enabled = match self.settings.enabled_chains().await {
            Ok(enabled) => enabled,
            Err(e) => {
                tracing::error!("Refresh for {} failed reading enabled chains: {}", owner, e);
                let mut owners = self.owners.write().await;
                let state = owners.entry(owner.to_string()).or_default();
                // an in-flight cycle must not complete over this failure
                state.cycle += 1;
                state.last_requested = Some(requested_at);
                state.status = RefreshStatus::Failed;
                state.loading.clear();
                state.error = Some(e.to_string());
                return Err(e);
            }
        };

        let chains: Vec<ChainConfig> = enabled
            .iter()
            .filter_map(|name| {
                let chain = self.registry.find(name);
                if chain.is_none() {
                    tracing::warn!("Enabled chain {} is not registered, skipping", name);
                }
                chain.cloned()
            })
            .collect();

        let cycle = {
            let mut owners = self.owners.write().await;
            let state = owners.entry(owner.to_string()).or_default();
            state.cycle += 1;
            state.last_requested = Some(requested_at);
            state.status = RefreshStatus::Loading;
            state.error = None;
            state.loading = chains.iter().map(|c| c.name.clone()).collect();
            state.cycle
        };
        tracing::debug!(
            "Balance cycle {} for {} over {} chains",
            cycle,
            owner,
            chains.len()
        );

        let mut tasks = JoinSet::new();
        let mut task_chains = HashMap::new();
        for chain in chains {
            let name = chain.name.clone();
            let registry = self.registry.clone();
            let data = self.data.clone();
            let prices = self.prices.clone();
            let owner = owner.to_string();
            let handle = tasks.spawn(async move {
                let balance = fetch_chain_balance(&registry, data.as_ref(), &prices, &owner, &chain).await;
                (chain.name, balance)
            });
            task_chains.insert(handle.id(), name);
        }

        let mut snapshot = MultiChainBalanceSnapshot::new();
        while let Some(joined) = tasks.join_next_with_id().await {
            let finished = match joined {
                Ok((_, (name, balance))) => {
                    if let Some(balance) = balance {
                        snapshot.insert(name.clone(), balance);
                    }
                    Some(name)
                }
                Err(e) => {
                    let name = task_chains.get(&e.id()).cloned();
                    tracing::error!(
                        "Balance task for {} in cycle {} failed: {}",
                        name.as_deref().unwrap_or("unknown chain"),
                        cycle,
                        e
                    );
                    name
                }
            };

            if let Some(name) = finished {
                let mut owners = self.owners.write().await;
                if let Some(state) = owners.get_mut(owner).filter(|s| s.cycle == cycle) {
                    state.loading.remove(&name);
                }
            }
        }

        let mut owners = self.owners.write().await;
        let Some(state) = owners.get_mut(owner).filter(|s| s.cycle == cycle) else {
            tracing::debug!(
                "Discarding cycle {} for {}, a newer cycle started or the owner was evicted",
                cycle,
                owner
            );
            return Ok(CycleOutcome::Superseded { cycle });
        };

        let entry = self.cache.replace(owner, snapshot).await;
        state.status = RefreshStatus::Complete;
        state.error = None;
        state.loading.clear();
        tracing::info!(
            "Balance cycle {} for {} complete with {} chains",
            cycle,
            owner,
            entry.balances.len()
        );
        Ok(CycleOutcome::Complete(entry))
    }

    pub async fn view(&self, owner: &str) -> BalanceView {
        let owner = owner.trim();
        let cached = self.cache.get(owner).await;
        let owners = self.owners.read().await;
        let state = owners.get(owner);

        BalanceView {
            owner: owner.to_string(),
            status: state.map(|s| s.status).unwrap_or(RefreshStatus::Idle),
            balances: cached
                .as_ref()
                .map(|c| c.balances.clone())
                .unwrap_or_default(),
            loading_chains: state
                .map(|s| s.loading.iter().cloned().collect())
                .unwrap_or_default(),
            error: state.and_then(|s| s.error.clone()),
            updated_at: cached.map(|c| c.updated_at),
        }
    }

    /// Owners refreshed within the idle window, after evicting the rest.
    pub async fn recent_owners(&self) -> Vec<String> {
        self.prune_idle().await;
        let mut owners: Vec<String> = self.owners.read().await.keys().cloned().collect();
        owners.sort();
        owners
    }

    /// Starts one background pass refreshing every recent owner. A pass
    /// still running from an earlier call is aborted first.
    pub async fn refresh_recent_owners(self: &Arc<Self>) -> JoinHandle<()> {
        let mut fan_out = self.fan_out.lock().await;
        if let Some(previous) = fan_out.take() {
            previous.abort();
        }

        let aggregator = self.clone();
        let handle = tokio::spawn(async move {
            for owner in aggregator.recent_owners().await {
                if let Err(e) = aggregator.refresh(&owner).await {
                    tracing::warn!("Background refresh for {} failed: {}", owner, e);
                }
            }
        });
        *fan_out = Some(handle.abort_handle());
        handle
    }

    /// Drops owner state and snapshots not requested within the idle window.
    async fn prune_idle(&self) {
        let now = self.cache.now();
        let expired: Vec<String> = {
            let mut owners = self.owners.write().await;
            let expired: Vec<String> = owners
                .iter()
                .filter(|(_, state)| match state.last_requested {
                    Some(at) => (now - at).to_std().is_ok_and(|age| age > self.idle_after),
                    None => true,
                })
                .map(|(owner, _)| owner.clone())
                .collect();
            for owner in &expired {
                owners.remove(owner);
            }
            expired
        };

        for owner in &expired {
            self.cache.remove(owner).await;
        }
        if !expired.is_empty() {
            tracing::debug!("Evicted {} idle owners", expired.len());
        }
    }

    /// Serves a fresh cached snapshot, or runs a cycle first.
    pub async fn current(&self, owner: &str) -> Result<BalanceView> {
        if self.cache.get_fresh(owner.trim()).await.is_none() {
            self.refresh(owner).await?;
        } else {
            tracing::debug!("Balance cache hit for {}", owner);
        }
        Ok(self.view(owner).await)
    }
}

/// Balance for one chain, or `None` when the address can't be derived or
/// every component is zero.
async fn fetch_chain_balance(
    registry: &ChainRegistry,
    data: &dyn ChainDataSource,
    prices: &PriceCache,
    owner: &str,
    chain: &ChainConfig,
) -> Option<ChainBalance> {
    let address = translate(registry, owner, &chain.chain_id);
    if address.is_empty() {
        tracing::warn!("Skipping {}: could not derive address from {}", chain.name, owner);
        return None;
    }

    let rest = chain.rest_base();
    let (available, staked, rewards) = tokio::join!(
        data.fetch_available(rest, &address, &chain.denom, chain.decimals),
        data.fetch_staked(rest, &address, chain.decimals),
        data.fetch_rewards(rest, &address, &chain.denom, chain.decimals),
    );

    let available_amount = parse_display_amount(&available);
    let staked_amount = parse_display_amount(&staked);
    let rewards_amount = parse_display_amount(&rewards);
    if available_amount.is_zero() && staked_amount.is_zero() && rewards_amount.is_zero() {
        tracing::debug!("No holdings on {} for {}", chain.name, address);
        return None;
    }

    let price = prices.get_price(&chain.name).await;
    Some(ChainBalance {
        usd_values: UsdValues {
            available: usd_value(available_amount, price),
            staked: usd_value(staked_amount, price),
            rewards: usd_value(rewards_amount, price),
            total: usd_value(available_amount + staked_amount + rewards_amount, price),
        },
        available,
        staked,
        rewards,
    })
}
