use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::{
    chains::ChainRegistry,
    constants::{DEFAULT_ENABLED_CHAINS, REQUIRED_CHAIN},
    error::{AppError, Result},
};

/// Source of the enabled-chain set read at the start of a refresh cycle.
#[async_trait]
pub trait EnabledChains: Send + Sync {
    async fn enabled_chains(&self) -> Result<Vec<String>>;
}

#[derive(Debug, Serialize, Deserialize)]
struct SettingsFile {
    enabled_chains: Vec<String>,
}

/// Enabled chains persisted as JSON. The required chain is always present.
pub struct ChainSettingsStore {
    path: PathBuf,
    registry: Arc<ChainRegistry>,
    enabled: RwLock<BTreeSet<String>>,
}

impl ChainSettingsStore {
    pub async fn load(path: impl Into<PathBuf>, registry: Arc<ChainRegistry>) -> Result<Self> {
        let path = path.into();
        let stored = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => {
                let file: SettingsFile = serde_json::from_str(&raw).map_err(|e| {
                    AppError::Settings(format!("Malformed settings file {}: {}", path.display(), e))
                })?;
                file.enabled_chains
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(
                    "No chain settings at {}, using defaults",
                    path.display()
                );
                DEFAULT_ENABLED_CHAINS.iter().map(|c| c.to_string()).collect()
            }
            Err(e) => {
                return Err(AppError::Settings(format!(
                    "Failed to read {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        let enabled = normalize(&registry, stored);
        Ok(Self {
            path,
            registry,
            enabled: RwLock::new(enabled),
        })
    }

    pub async fn snapshot(&self) -> Vec<String> {
        self.enabled.read().await.iter().cloned().collect()
    }

    pub async fn is_enabled(&self, chain: &str) -> bool {
        let name = self.registry.resolve_name(chain);
        self.enabled.read().await.contains(&name)
    }

    /// Flips one chain. The required chain cannot be disabled.
    pub async fn toggle_chain(&self, chain: &str) -> Result<Vec<String>> {
        let name = self.registry.get(chain)?.name.clone();
        if name == REQUIRED_CHAIN {
            tracing::debug!("Ignoring toggle of required chain {}", name);
            return Ok(self.snapshot().await);
        }

        let mut enabled = self.enabled.write().await;
        let mut next = enabled.clone();
        if !next.remove(&name) {
            next.insert(name);
        }
        self.persist(&next).await?;
        *enabled = next;
        Ok(enabled.iter().cloned().collect())
    }

    /// Enables exactly `chains`, or only the required chain when all of
    /// them are already enabled.
    pub async fn toggle_all(&self, chains: &[String]) -> Result<Vec<String>> {
        let mut names = Vec::with_capacity(chains.len());
        for chain in chains {
            names.push(self.registry.get(chain)?.name.clone());
        }

        let mut enabled = self.enabled.write().await;
        let all_enabled = names.iter().all(|n| enabled.contains(n));
        let mut next: BTreeSet<String> = if all_enabled {
            BTreeSet::new()
        } else {
            names.into_iter().collect()
        };
        next.insert(REQUIRED_CHAIN.to_string());

        self.persist(&next).await?;
        *enabled = next;
        Ok(enabled.iter().cloned().collect())
    }

    async fn persist(&self, enabled: &BTreeSet<String>) -> Result<()> {
        let file = SettingsFile {
            enabled_chains: enabled.iter().cloned().collect(),
        };
        let body = serde_json::to_vec_pretty(&file)
            .map_err(|e| AppError::Internal(format!("Failed to encode settings: {}", e)))?;

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, body)
            .await
            .map_err(|e| AppError::Settings(format!("Failed to write {}: {}", tmp.display(), e)))?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(|e| {
            AppError::Settings(format!("Failed to replace {}: {}", self.path.display(), e))
        })?;
        Ok(())
    }
}

#[async_trait]
impl EnabledChains for ChainSettingsStore {
    async fn enabled_chains(&self) -> Result<Vec<String>> {
        Ok(self.snapshot().await)
    }
}

fn normalize(registry: &ChainRegistry, stored: Vec<String>) -> BTreeSet<String> {
    let mut enabled = BTreeSet::new();
    for chain in stored {
        match registry.find(&chain) {
            Some(config) => {
                enabled.insert(config.name.clone());
            }
            None => tracing::warn!("Dropping unknown chain '{}' from settings", chain),
        }
    }
    enabled.insert(REQUIRED_CHAIN.to_string());
    enabled
}

#[cfg(test)]
pub(crate) fn temp_settings_path(tag: &str) -> PathBuf {
    use std::sync::atomic::{AtomicUsize, Ordering};
    static SEQ: AtomicUsize = AtomicUsize::new(0);
    std::env::temp_dir().join(format!(
        "chain-settings-{}-{}-{}.json",
        tag,
        std::process::id(),
        SEQ.fetch_add(1, Ordering::SeqCst)
    ))
}
