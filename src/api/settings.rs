use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::{error::Result, models::ApiResponse};

#[derive(Debug, Serialize)]
pub struct ChainSettingsResponse {
    pub enabled_chains: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct ToggleChainRequest {
    pub chain: String,
}

#[derive(Debug, Deserialize)]
pub struct ToggleAllRequest {
    pub chains: Vec<String>,
}

/// GET /api/v1/settings/chains
pub async fn get_chain_settings(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<ChainSettingsResponse>>> {
    Ok(Json(ApiResponse::success(ChainSettingsResponse {
        enabled_chains: state.settings.snapshot().await,
    })))
}

/// POST /api/v1/settings/chains/toggle
pub async fn toggle_chain(
    State(state): State<AppState>,
    Json(req): Json<ToggleChainRequest>,
) -> Result<Json<ApiResponse<ChainSettingsResponse>>> {
    let enabled_chains = state.settings.toggle_chain(&req.chain).await?;
    tracing::info!("Chain {} toggled, enabled: {:?}", req.chain, enabled_chains);
    // detached; a later toggle aborts it
    let _ = state.balances.refresh_recent_owners().await;
    Ok(Json(ApiResponse::success(ChainSettingsResponse { enabled_chains })))
}

/// POST /api/v1/settings/chains/toggle-all
pub async fn toggle_all(
    State(state): State<AppState>,
    Json(req): Json<ToggleAllRequest>,
) -> Result<Json<ApiResponse<ChainSettingsResponse>>> {
    let enabled_chains = state.settings.toggle_all(&req.chains).await?;
    let _ = state.balances.refresh_recent_owners().await;
    Ok(Json(ApiResponse::success(ChainSettingsResponse { enabled_chains })))
}
