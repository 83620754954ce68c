use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;

use super::{require_bech32, AppState};
use crate::{
    chains::translate,
    error::{AppError, Result},
    models::ApiResponse,
};

#[derive(Debug, Serialize)]
pub struct ChainSummary {
    pub name: String,
    pub display_name: String,
    pub chain_id: String,
    pub symbol: String,
    pub denom: String,
    pub decimals: u32,
    pub unbonding_days: u32,
    pub required: bool,
    pub enabled: bool,
}

#[derive(Debug, Serialize)]
pub struct ChainAddressResponse {
    pub chain: String,
    pub chain_id: String,
    pub address: String,
}

/// GET /api/v1/chains
pub async fn list_chains(State(state): State<AppState>) -> Result<Json<ApiResponse<Vec<ChainSummary>>>> {
    let mut chains = Vec::with_capacity(state.registry.len());
    for chain in state.registry.chains() {
        chains.push(ChainSummary {
            name: chain.name.clone(),
            display_name: chain.display_name.clone(),
            chain_id: chain.chain_id.clone(),
            symbol: chain.symbol.clone(),
            denom: chain.denom.clone(),
            decimals: chain.decimals,
            unbonding_days: chain.unbonding_days,
            required: chain.required,
            enabled: state.settings.is_enabled(&chain.name).await,
        });
    }
    Ok(Json(ApiResponse::success(chains)))
}

/// GET /api/v1/chains/{chain}/address/{address}
pub async fn get_chain_address(
    State(state): State<AppState>,
    Path((chain, address)): Path<(String, String)>,
) -> Result<Json<ApiResponse<ChainAddressResponse>>> {
    let config = state.registry.get(&chain)?;
    let source = require_bech32(&address)?;

    let translated = translate(&state.registry, &source, &config.chain_id);
    if translated.is_empty() {
        return Err(AppError::Translation(format!(
            "Cannot derive a {} address from {}",
            config.name, source
        )));
    }

    Ok(Json(ApiResponse::success(ChainAddressResponse {
        chain: config.name.clone(),
        chain_id: config.chain_id.clone(),
        address: translated,
    })))
}
