use async_trait::async_trait;
use futures_util::future::join_all;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;

use super::fetch::{FetchClient, FetchOptions};
use crate::{
    constants::{
        BANK_BALANCES_PATH, BOND_STATUS_BONDED, DISTRIBUTION_DELEGATORS_PATH,
        STAKING_DELEGATIONS_PATH, STAKING_VALIDATORS_PATH, UNKNOWN_VALIDATOR_NAME,
    },
    error::Result,
    models::{BondedValidator, Delegation, DelegationSummary, ValidatorInfo},
    utils::{format_fixed, minor_to_display},
};

/// Per-chain balance reads used by the aggregator. Implementations swallow
/// their own failures and report `"0"`.
#[async_trait]
pub trait ChainDataSource: Send + Sync {
    async fn fetch_available(&self, rest: &str, address: &str, denom: &str, decimals: u32) -> String;
    async fn fetch_staked(&self, rest: &str, address: &str, decimals: u32) -> String;
    async fn fetch_rewards(&self, rest: &str, address: &str, denom: &str, decimals: u32) -> String;
}

#[derive(Debug, Deserialize)]
struct Coin {
    denom: String,
    amount: String,
}

#[derive(Debug, Deserialize)]
struct BankBalancesResponse {
    balances: Vec<Coin>,
}

#[derive(Debug, Deserialize)]
struct DelegationsResponse {
    delegation_responses: Vec<DelegationResponse>,
}

#[derive(Debug, Deserialize)]
struct DelegationResponse {
    delegation: DelegationEntry,
    balance: Coin,
}

#[derive(Debug, Deserialize)]
struct DelegationEntry {
    validator_address: String,
}

#[derive(Debug, Deserialize)]
struct RewardsResponse {
    #[serde(default)]
    total: Vec<Coin>,
}

#[derive(Debug, Deserialize)]
struct ValidatorResponse {
    validator: RestValidator,
}

#[derive(Debug, Deserialize)]
struct ValidatorsResponse {
    validators: Vec<RestValidator>,
}

#[derive(Debug, Deserialize)]
struct RestValidator {
    operator_address: String,
    #[serde(default)]
    tokens: String,
    #[serde(default)]
    status: String,
    description: ValidatorDescription,
    commission: ValidatorCommission,
}

#[derive(Debug, Deserialize)]
struct ValidatorDescription {
    #[serde(default)]
    moniker: String,
    identity: Option<String>,
    website: Option<String>,
    details: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ValidatorCommission {
    commission_rates: CommissionRates,
}

#[derive(Debug, Deserialize)]
struct CommissionRates {
    rate: String,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn rest_url(rest: &str, path: &str) -> String {
    format!("{}{}", rest.trim_end_matches('/'), path)
}

/// Cosmos SDK REST reader over the retrying fetch client.
#[derive(Clone)]
pub struct CosmosRestClient {
    fetch: FetchClient,
}

impl CosmosRestClient {
    pub fn new(fetch: FetchClient) -> Self {
        Self { fetch }
    }

    async fn try_available(&self, rest: &str, address: &str, denom: &str, decimals: u32) -> Result<String> {
        let url = rest_url(rest, &format!("{}/{}", BANK_BALANCES_PATH, address));
        let options =
            FetchOptions::default().with_validator(|v: &Value| v.get("balances").is_some_and(Value::is_array));
        let response: BankBalancesResponse = self.fetch.get_typed(&url, &options).await?;

        match response.balances.iter().find(|c| c.denom == denom) {
            Some(coin) => Ok(format_fixed(minor_to_display(&coin.amount, decimals)?, decimals)),
            None => Ok("0".to_string()),
        }
    }

    async fn try_staked(&self, rest: &str, address: &str, decimals: u32) -> Result<String> {
        let response = self.delegations(rest, address).await?;
        let mut total = Decimal::ZERO;
        for entry in &response.delegation_responses {
            total += minor_to_display(&entry.balance.amount, decimals)?;
        }
        Ok(format_fixed(total, decimals))
    }

    async fn try_rewards(&self, rest: &str, address: &str, denom: &str, decimals: u32) -> Result<String> {
        let url = rest_url(
            rest,
            &format!("{}/{}/rewards", DISTRIBUTION_DELEGATORS_PATH, address),
        );
        let response: RewardsResponse = self.fetch.get_typed(&url, &FetchOptions::default()).await?;

        match response.total.iter().find(|c| c.denom == denom) {
            Some(coin) => Ok(format_fixed(minor_to_display(&coin.amount, decimals)?, decimals)),
            None => Ok("0".to_string()),
        }
    }

    async fn delegations(&self, rest: &str, address: &str) -> Result<DelegationsResponse> {
        let url = rest_url(rest, &format!("{}/{}", STAKING_DELEGATIONS_PATH, address));
        self.fetch.get_typed(&url, &FetchOptions::default()).await
    }

    /// Validator metadata, or `None` when the lookup fails.
    pub async fn fetch_validator_info(&self, rest: &str, validator_address: &str) -> Option<ValidatorInfo> {
        let url = rest_url(rest, &format!("{}/{}", STAKING_VALIDATORS_PATH, validator_address));
        match self
            .fetch
            .get_typed::<ValidatorResponse>(&url, &FetchOptions::default())
            .await
        {
            Ok(response) => {
                let v = response.validator;
                Some(ValidatorInfo {
                    address: validator_address.to_string(),
                    name: v.description.moniker,
                    commission: v.commission.commission_rates.rate,
                    details: non_empty(v.description.details),
                    website: non_empty(v.description.website),
                    identity: non_empty(v.description.identity),
                })
            }
            Err(e) => {
                tracing::warn!("Failed to fetch validator info for {}: {}", validator_address, e);
                None
            }
        }
    }

    /// Delegations with validator metadata; a failed listing yields an empty summary.
    pub async fn fetch_delegations(&self, rest: &str, address: &str, decimals: u32) -> DelegationSummary {
        let response = match self.delegations(rest, address).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("Fetching delegations for {} failed: {}", address, e);
                return DelegationSummary::empty();
            }
        };

        let enriched = join_all(response.delegation_responses.iter().map(|entry| async move {
            let validator_address = &entry.delegation.validator_address;
            let validator = self
                .fetch_validator_info(rest, validator_address)
                .await
                .unwrap_or_else(|| ValidatorInfo {
                    address: validator_address.clone(),
                    name: UNKNOWN_VALIDATOR_NAME.to_string(),
                    commission: "0".to_string(),
                    details: None,
                    website: None,
                    identity: None,
                });
            let amount = minor_to_display(&entry.balance.amount, decimals).unwrap_or_else(|e| {
                tracing::warn!("Bad delegation amount from {}: {}", validator_address, e);
                Decimal::ZERO
            });
            (validator, amount)
        }))
        .await;

        let total: Decimal = enriched.iter().map(|(_, amount)| *amount).sum();
        let delegations = enriched
            .into_iter()
            .map(|(validator, amount)| Delegation {
                validator,
                amount: format_fixed(amount, decimals),
            })
            .collect();

        DelegationSummary {
            delegations,
            total: format_fixed(total, decimals),
        }
    }

    /// Bonded validators sorted by voting power, largest first.
    pub async fn fetch_bonded_validators(&self, rest: &str) -> Result<Vec<BondedValidator>> {
        let url = rest_url(
            rest,
            &format!("{}?status={}", STAKING_VALIDATORS_PATH, BOND_STATUS_BONDED),
        );
        let response: ValidatorsResponse = self.fetch.get_typed(&url, &FetchOptions::default()).await?;

        let mut validators: Vec<BondedValidator> = response
            .validators
            .into_iter()
            .filter(|v| v.status == BOND_STATUS_BONDED)
            .map(|v| BondedValidator {
                address: v.operator_address,
                name: v.description.moniker,
                commission: v.commission.commission_rates.rate,
                tokens: v.tokens,
                status: v.status,
            })
            .collect();

        validators.sort_by_key(|v| std::cmp::Reverse(v.tokens.parse::<u128>().unwrap_or(0)));
        Ok(validators)
    }
}

#[async_trait]
impl ChainDataSource for CosmosRestClient {
    async fn fetch_available(&self, rest: &str, address: &str, denom: &str, decimals: u32) -> String {
        self.try_available(rest, address, denom, decimals)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!("Fetching available balance for {} failed: {}", address, e);
                "0".to_string()
            })
    }

    async fn fetch_staked(&self, rest: &str, address: &str, decimals: u32) -> String {
        self.try_staked(rest, address, decimals)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!("Fetching staked balance for {} failed: {}", address, e);
                "0".to_string()
            })
    }

    async fn fetch_rewards(&self, rest: &str, address: &str, denom: &str, decimals: u32) -> String {
        self.try_rewards(rest, address, denom, decimals)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!("Fetching rewards for {} failed: {}", address, e);
                "0".to_string()
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integrations::fetch::fast_client;
    use crate::test_support::spawn_stub;
    use axum::{extract::Path, http::StatusCode, routing::get, Json, Router};
    use serde_json::json;

    const OWNER: &str = "osmo1qypqxpq9qcrsszg2pvxq6rs0zqg3yyc5helwsw";

    fn validator_json(address: &str, moniker: &str, tokens: &str, status: &str) -> Value {
        json!({
            "operator_address": address,
            "tokens": tokens,
            "status": status,
            "description": {"moniker": moniker, "identity": "", "website": "https://example.com", "details": ""},
            "commission": {"commission_rates": {"rate": "0.050000000000000000"}}
        })
    }

    async fn stub_chain() -> String {
        let router = Router::new()
            .route(
                "/cosmos/bank/v1beta1/balances/{address}",
                get(|| async {
                    Json(json!({"balances": [
                        {"denom": "ibc/ABC", "amount": "42"},
                        {"denom": "uosmo", "amount": "5000000"}
                    ]}))
                }),
            )
            .route(
                "/cosmos/staking/v1beta1/delegations/{address}",
                get(|| async {
                    Json(json!({"delegation_responses": [
                        {"delegation": {"validator_address": "osmovaloper1good"}, "balance": {"denom": "uosmo", "amount": "1500000"}},
                        {"delegation": {"validator_address": "osmovaloper1gone"}, "balance": {"denom": "uosmo", "amount": "250000"}}
                    ]}))
                }),
            )
            .route(
                "/cosmos/distribution/v1beta1/delegators/{address}/rewards",
                get(|| async {
                    Json(json!({
                        "rewards": [],
                        "total": [{"denom": "uosmo", "amount": "123456.789000000000000000"}]
                    }))
                }),
            )
            .route(
                "/cosmos/staking/v1beta1/validators/{validator}",
                get(|Path(validator): Path<String>| async move {
                    if validator == "osmovaloper1good" {
                        Ok(Json(json!({"validator": validator_json(&validator, "Good Node", "100", BOND_STATUS_BONDED)})))
                    } else {
                        Err(StatusCode::NOT_FOUND)
                    }
                }),
            )
            .route(
                "/cosmos/staking/v1beta1/validators",
                get(|| async {
                    Json(json!({"validators": [
                        validator_json("osmovaloper1small", "Small", "900", BOND_STATUS_BONDED),
                        validator_json("osmovaloper1jailed", "Jailed", "99999999", "BOND_STATUS_UNBONDED"),
                        validator_json("osmovaloper1big", "Big", "1000000000000000000000", BOND_STATUS_BONDED)
                    ]}))
                }),
            );
        spawn_stub(router).await
    }

    #[tokio::test]
    async fn available_matches_denom_and_scales() {
        let client = CosmosRestClient::new(fast_client(1));
        let rest = stub_chain().await;
        assert_eq!(client.fetch_available(&rest, OWNER, "uosmo", 6).await, "5.000000");
        assert_eq!(client.fetch_available(&rest, OWNER, "uatom", 6).await, "0");
    }

    #[tokio::test]
    async fn staked_sums_all_delegations() {
        let client = CosmosRestClient::new(fast_client(1));
        let rest = stub_chain().await;
        assert_eq!(client.fetch_staked(&rest, OWNER, 6).await, "1.750000");
    }

    #[tokio::test]
    async fn rewards_are_truncated_to_decimals() {
        let client = CosmosRestClient::new(fast_client(1));
        let rest = stub_chain().await;
        assert_eq!(client.fetch_rewards(&rest, OWNER, "uosmo", 6).await, "0.123456");
    }

    #[tokio::test]
    async fn unreachable_endpoint_reports_zero() {
        let client = CosmosRestClient::new(fast_client(1));
        let rest = spawn_stub(Router::new()).await;
        assert_eq!(client.fetch_available(&rest, OWNER, "uosmo", 6).await, "0");
        assert_eq!(client.fetch_staked(&rest, OWNER, 6).await, "0");
        assert_eq!(client.fetch_rewards(&rest, OWNER, "uosmo", 6).await, "0");
    }

    #[tokio::test]
    async fn delegations_are_enriched_with_placeholder_on_failure() {
        let client = CosmosRestClient::new(fast_client(1));
        let rest = stub_chain().await;
        let summary = client.fetch_delegations(&rest, OWNER, 6).await;

        assert_eq!(summary.total, "1.750000");
        assert_eq!(summary.delegations.len(), 2);
        assert_eq!(summary.delegations[0].validator.name, "Good Node");
        assert_eq!(summary.delegations[0].validator.website.as_deref(), Some("https://example.com"));
        assert_eq!(summary.delegations[0].validator.identity, None);
        assert_eq!(summary.delegations[1].validator.name, UNKNOWN_VALIDATOR_NAME);
        assert_eq!(summary.delegations[1].validator.commission, "0");
        assert_eq!(summary.delegations[1].amount, "0.250000");
    }

    #[tokio::test]
    async fn failed_listing_yields_empty_summary() {
        let client = CosmosRestClient::new(fast_client(1));
        let rest = spawn_stub(Router::new()).await;
        assert_eq!(client.fetch_delegations(&rest, OWNER, 6).await, DelegationSummary::empty());
    }

    #[tokio::test]
    async fn bonded_validators_sorted_by_tokens() {
        let client = CosmosRestClient::new(fast_client(1));
        let rest = stub_chain().await;
        let validators = client.fetch_bonded_validators(&rest).await.unwrap();

        let names: Vec<&str> = validators.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["Big", "Small"]);
    }
}
