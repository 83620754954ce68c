use axum::{
    extract::{Path, State},
    Json,
};

use super::{require_bech32, AppState};
use crate::{
    error::Result,
    models::{ApiResponse, BalanceView},
    services::balance_aggregator::CycleOutcome,
};

/// GET /api/v1/balances/{address}
///
/// Serves the cached snapshot while it is fresh, otherwise runs a cycle.
pub async fn get_balances(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<ApiResponse<BalanceView>>> {
    let owner = require_bech32(&address)?;
    let view = state.balances.current(&owner).await?;
    Ok(Json(ApiResponse::success(view)))
}

/// POST /api/v1/balances/{address}/refresh
pub async fn refresh_balances(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<ApiResponse<BalanceView>>> {
    let owner = require_bech32(&address)?;
    if let CycleOutcome::Superseded { cycle } = state.balances.refresh(&owner).await? {
        tracing::debug!("Refresh cycle {} for {} was superseded", cycle, owner);
    }
    Ok(Json(ApiResponse::success(state.balances.view(&owner).await)))
}
