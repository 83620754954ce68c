use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::str::FromStr;

use crate::{
    constants::REQUIRED_CHAIN,
    error::{AppError, Result},
};

const EMBEDDED_REGISTRY: &str = include_str!("../../config/chains.json");

/// Highest decimals we can scale exactly with `rust_decimal`.
const MAX_DECIMALS: u32 = 18;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainConfig {
    pub name: String,
    pub display_name: String,
    pub chain_id: String,
    pub rest: String,
    pub rpc: String,
    pub denom: String,
    pub symbol: String,
    pub decimals: u32,
    pub bech32_prefix: String,
    pub unbonding_days: u32,
    pub gas_price: String,
    pub gas_multiplier: f64,
    #[serde(default)]
    pub coingecko_id: Option<String>,
    #[serde(default)]
    pub fallback_price: Option<f64>,
    #[serde(default)]
    pub required: bool,
}

impl ChainConfig {
    /// REST base without a trailing slash.
    pub fn rest_base(&self) -> &str {
        self.rest.trim_end_matches('/')
    }

    fn validate(&self) -> Result<()> {
        let invalid = |reason: &str| {
            Err(AppError::Config(format!(
                "Chain '{}' is invalid: {}",
                self.name, reason
            )))
        };

        if self.name.trim().is_empty() || self.name != self.name.to_ascii_lowercase() {
            return invalid("name must be a non-empty lowercase key");
        }
        if self.chain_id.trim().is_empty() {
            return invalid("chain_id is empty");
        }
        if self.denom.trim().is_empty() || self.symbol.trim().is_empty() {
            return invalid("denom and symbol are required");
        }
        if self.decimals > MAX_DECIMALS {
            return invalid("decimals must be <= 18");
        }
        for (label, endpoint) in [("rest", &self.rest), ("rpc", &self.rpc)] {
            match url::Url::parse(endpoint) {
                Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
                _ => return invalid(&format!("{} endpoint '{}' is not an http(s) URL", label, endpoint)),
            }
        }
        if bech32::Hrp::parse(&self.bech32_prefix).is_err() || self.bech32_prefix.is_empty() {
            return invalid("bech32_prefix is not a valid human-readable part");
        }
        if !self.gas_multiplier.is_finite() || self.gas_multiplier <= 0.0 {
            return invalid("gas_multiplier must be positive");
        }
        if parse_gas_price(&self.gas_price).is_none() {
            return invalid("gas_price must look like '0.025uatom'");
        }
        if let Some(price) = self.fallback_price {
            if !price.is_finite() || price < 0.0 {
                return invalid("fallback_price must be a non-negative number");
            }
        }
        if self.coingecko_id.as_deref().is_some_and(|id| id.trim().is_empty()) {
            return invalid("coingecko_id is empty");
        }

        Ok(())
    }
}

/// Splits a gas price such as `0.0025uosmo` into amount and denom.
/// The denom part may be empty.
pub fn parse_gas_price(gas_price: &str) -> Option<(Decimal, &str)> {
    let gas_price = gas_price.trim();
    let end = gas_price
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(gas_price.len());
    let amount = Decimal::from_str(&gas_price[..end]).ok()?;
    (!amount.is_sign_negative()).then_some((amount, &gas_price[end..]))
}

#[derive(Debug, Deserialize)]
struct RegistryFile {
    #[serde(default)]
    aliases: HashMap<String, String>,
    chains: Vec<ChainConfig>,
}

/// Immutable chain table, validated once at startup.
#[derive(Debug, Clone)]
pub struct ChainRegistry {
    chains: BTreeMap<String, ChainConfig>,
    aliases: HashMap<String, String>,
}

impl ChainRegistry {
    pub fn load(path: Option<&str>) -> Result<Self> {
        match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|e| {
                    AppError::Config(format!("Failed to read chain registry {}: {}", path, e))
                })?;
                tracing::info!("Loading chain registry from {}", path);
                Self::from_json(&raw)
            }
            None => Self::embedded(),
        }
    }

    pub fn embedded() -> Result<Self> {
        Self::from_json(EMBEDDED_REGISTRY)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let file: RegistryFile = serde_json::from_str(raw)
            .map_err(|e| AppError::Config(format!("Malformed chain registry: {}", e)))?;
        Self::new(file.chains, file.aliases)
    }

    pub fn new(chains: Vec<ChainConfig>, aliases: HashMap<String, String>) -> Result<Self> {
        let mut by_name = BTreeMap::new();
        let mut chain_ids = HashSet::new();

        for chain in chains {
            chain.validate()?;
            if !chain_ids.insert(chain.chain_id.clone()) {
                return Err(AppError::Config(format!(
                    "Duplicate chain_id '{}'",
                    chain.chain_id
                )));
            }
            if by_name.contains_key(&chain.name) {
                return Err(AppError::Config(format!("Duplicate chain '{}'", chain.name)));
            }
            by_name.insert(chain.name.clone(), chain);
        }

        if !by_name.contains_key(REQUIRED_CHAIN) {
            return Err(AppError::Config(format!(
                "Required chain '{}' is missing from the registry",
                REQUIRED_CHAIN
            )));
        }

        let mut normalized = HashMap::new();
        for (alias, target) in aliases {
            if !by_name.contains_key(&target) {
                return Err(AppError::Config(format!(
                    "Alias '{}' points to unknown chain '{}'",
                    alias, target
                )));
            }
            normalized.insert(alias.to_ascii_lowercase(), target);
        }

        Ok(Self {
            chains: by_name,
            aliases: normalized,
        })
    }

    /// Maps aliases like `cosmos` to internal keys like `cosmoshub`.
    pub fn resolve_name(&self, name: &str) -> String {
        let key = name.trim().to_ascii_lowercase();
        self.aliases.get(&key).cloned().unwrap_or(key)
    }

    pub fn find(&self, name: &str) -> Option<&ChainConfig> {
        self.chains.get(&self.resolve_name(name))
    }

    pub fn get(&self, name: &str) -> Result<&ChainConfig> {
        self.find(name)
            .ok_or_else(|| AppError::UnsupportedChain(name.to_string()))
    }

    pub fn by_chain_id(&self, chain_id: &str) -> Option<&ChainConfig> {
        self.chains.values().find(|c| c.chain_id == chain_id)
    }

    pub fn chains(&self) -> impl Iterator<Item = &ChainConfig> {
        self.chains.values()
    }

    pub fn len(&self) -> usize {
        self.chains.len()
    }
}

#[cfg(test)]
pub(crate) fn test_chain(name: &str, chain_id: &str, prefix: &str, denom: &str) -> ChainConfig {
    ChainConfig {
        name: name.to_string(),
        display_name: name.to_string(),
        chain_id: chain_id.to_string(),
        rest: format!("https://rest.example.com/{}", name),
        rpc: format!("https://rpc.example.com/{}", name),
        denom: denom.to_string(),
        symbol: denom.trim_start_matches('u').to_ascii_uppercase(),
        decimals: 6,
        bech32_prefix: prefix.to_string(),
        unbonding_days: 21,
        gas_price: format!("0.025{}", denom),
        gas_multiplier: 1.3,
        coingecko_id: Some(name.to_string()),
        fallback_price: None,
        required: name == REQUIRED_CHAIN,
    }
}
