use axum::{
    extract::{Path, State},
    Json,
};

use super::AppState;
use crate::{error::Result, models::ApiResponse, services::price_cache::PriceQuote};

/// GET /api/v1/prices/{chain}
pub async fn get_price(
    State(state): State<AppState>,
    Path(chain): Path<String>,
) -> Result<Json<ApiResponse<PriceQuote>>> {
    let config = state.registry.get(&chain)?;
    let quote = state.prices.quote(&config.name).await;
    Ok(Json(ApiResponse::success(quote)))
}
