use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::services::tx_feedback::WalletFailure;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unsupported chain: {0}")]
    UnsupportedChain(String),

    #[error("Address translation failed: {0}")]
    Translation(String),

    #[error("Wallet error: {0}")]
    Wallet(WalletFailure),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// Errors a per-field fetcher may swallow and degrade to a zero value.
    pub fn is_degradable(&self) -> bool {
        matches!(self, AppError::Network(_) | AppError::Validation(_))
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AppError::Network(format!("request timed out: {}", err))
        } else if err.is_decode() {
            AppError::Validation(err.to_string())
        } else {
            AppError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Validation(err.to_string())
    }
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AppError::Network(ref msg) => (StatusCode::BAD_GATEWAY, "NETWORK_ERROR", msg.clone()),
            AppError::Validation(ref msg) => {
                (StatusCode::BAD_GATEWAY, "VALIDATION_ERROR", msg.clone())
            }
            AppError::UnsupportedChain(ref chain) => (
                StatusCode::NOT_FOUND,
                "UNSUPPORTED_CHAIN",
                format!("Unsupported chain: {}", chain),
            ),
            AppError::Translation(ref msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "TRANSLATION_ERROR",
                msg.clone(),
            ),
            AppError::Wallet(ref failure) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                failure.code(),
                failure.to_string(),
            ),
            AppError::BadRequest(ref msg) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone())
            }
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                self.to_string(),
            ),
        };

        let body = Json(ErrorResponse {
            success: false,
            error: ErrorDetail {
                code: code.to_string(),
                message,
                details: None,
            },
        });

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
