use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::{models::MultiChainBalanceSnapshot, utils::Clock};

#[derive(Debug, Clone, PartialEq)]
pub struct CachedSnapshot {
    pub balances: MultiChainBalanceSnapshot,
    pub updated_at: DateTime<Utc>,
}

/// Last completed snapshot per owner address. Entries are replaced whole.
pub struct BalanceCache {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    entries: RwLock<HashMap<String, CachedSnapshot>>,
}

impl BalanceCache {
    pub fn new(clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            ttl,
            clock,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Cached snapshot regardless of age.
    pub async fn get(&self, owner: &str) -> Option<CachedSnapshot> {
        self.entries.read().await.get(owner).cloned()
    }

    pub async fn get_fresh(&self, owner: &str) -> Option<CachedSnapshot> {
        self.get(owner).await.filter(|entry| self.is_fresh(entry))
    }

    pub async fn replace(&self, owner: &str, balances: MultiChainBalanceSnapshot) -> CachedSnapshot {
        let entry = CachedSnapshot {
            balances,
            updated_at: self.clock.now(),
        };
        self.entries
            .write()
            .await
            .insert(owner.to_string(), entry.clone());
        tracing::debug!(
            "Balance snapshot for {} replaced ({} chains)",
            owner,
            entry.balances.len()
        );
        entry
    }

    pub async fn remove(&self, owner: &str) {
        self.entries.write().await.remove(owner);
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn is_fresh(&self, entry: &CachedSnapshot) -> bool {
        match (self.clock.now() - entry.updated_at).to_std() {
            Ok(age) => age < self.ttl,
            Err(_) => true,
        }
    }
}
