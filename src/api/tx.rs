use axum::Json;
use serde::Serialize;

use crate::{
    error::{AppError, Result},
    models::ApiResponse,
    services::tx_feedback::{classify, BroadcastOutcome},
};

#[derive(Debug, Serialize)]
pub struct ClassifyResponse {
    pub ok: bool,
}

/// POST /api/v1/tx/classify
///
/// A failed broadcast comes back as a wallet error with a readable message.
pub async fn classify_broadcast(
    Json(outcome): Json<BroadcastOutcome>,
) -> Result<Json<ApiResponse<ClassifyResponse>>> {
    match classify(&outcome) {
        Some(failure) => {
            tracing::debug!("Broadcast classified as {}", failure.code());
            Err(AppError::Wallet(failure))
        }
        None => Ok(Json(ApiResponse::success(ClassifyResponse { ok: true }))),
    }
}
