use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use super::{require_bech32, AppState};
use crate::{
    chains::translate,
    error::{AppError, Result},
    models::{ApiResponse, BondedValidator, DelegationSummary},
    services::gas_estimator::{estimate_fee, FeeEstimate, TxKind},
};

#[derive(Debug, Serialize)]
pub struct DelegationsResponse {
    pub chain: String,
    pub address: String,
    #[serde(flatten)]
    pub summary: DelegationSummary,
}

#[derive(Debug, Deserialize)]
pub struct FeeQuery {
    pub kind: Option<String>,
    pub validators: Option<u32>,
}

/// GET /api/v1/chains/{chain}/delegations/{address}
pub async fn get_delegations(
    State(state): State<AppState>,
    Path((chain, address)): Path<(String, String)>,
) -> Result<Json<ApiResponse<DelegationsResponse>>> {
    let config = state.registry.get(&chain)?;
    let owner = require_bech32(&address)?;
    let address = translate(&state.registry, &owner, &config.chain_id);
    if address.is_empty() {
        return Err(AppError::Translation(format!(
            "Cannot derive a {} address from {}",
            config.name, owner
        )));
    }

    let summary = state
        .rest
        .fetch_delegations(config.rest_base(), &address, config.decimals)
        .await;

    Ok(Json(ApiResponse::success(DelegationsResponse {
        chain: config.name.clone(),
        address,
        summary,
    })))
}

/// GET /api/v1/chains/{chain}/validators
pub async fn get_validators(
    State(state): State<AppState>,
    Path(chain): Path<String>,
) -> Result<Json<ApiResponse<Vec<BondedValidator>>>> {
    let config = state.registry.get(&chain)?;
    let validators = state.rest.fetch_bonded_validators(config.rest_base()).await?;
    Ok(Json(ApiResponse::success(validators)))
}

/// GET /api/v1/chains/{chain}/fee?kind=delegate&validators=3
pub async fn get_fee_estimate(
    State(state): State<AppState>,
    Path(chain): Path<String>,
    Query(query): Query<FeeQuery>,
) -> Result<Json<ApiResponse<FeeEstimate>>> {
    let config = state.registry.get(&chain)?;
    let kind = match query.kind.as_deref() {
        Some(kind) => TxKind::parse(kind)?,
        None => TxKind::Delegate,
    };
    let estimate = estimate_fee(config, kind, query.validators.unwrap_or(1))?;
    Ok(Json(ApiResponse::success(estimate)))
}
