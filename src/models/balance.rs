use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-chain holdings in display units, priced at fetch time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainBalance {
    pub available: String,
    pub staked: String,
    pub rewards: String,
    pub usd_values: UsdValues,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsdValues {
    pub available: String,
    pub staked: String,
    pub rewards: String,
    pub total: String,
}

/// Chain name -> balance, only chains with non-zero holdings.
pub type MultiChainBalanceSnapshot = BTreeMap<String, ChainBalance>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshStatus {
    Idle,
    Loading,
    Complete,
    Failed,
}

/// What a consumer sees for one owner address.
#[derive(Debug, Clone, Serialize)]
pub struct BalanceView {
    pub owner: String,
    pub status: RefreshStatus,
    pub balances: MultiChainBalanceSnapshot,
    pub loading_chains: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
}
