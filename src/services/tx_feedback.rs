// Turns broadcast results reported by the wallet into user-facing errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum WalletFailure {
    #[error("Wallet extension not available")]
    ExtensionMissing,

    #[error("Request rejected by user")]
    Rejected,

    #[error("Insufficient funds to pay for transaction fees")]
    InsufficientFunds,

    #[error("Transaction failed due to insufficient gas. Please try again.")]
    OutOfGas,

    #[error("{0}")]
    Chain(String),
}

impl WalletFailure {
    pub fn code(&self) -> &'static str {
        match self {
            WalletFailure::ExtensionMissing => "WALLET_MISSING",
            WalletFailure::Rejected => "WALLET_REJECTED",
            WalletFailure::InsufficientFunds => "INSUFFICIENT_FUNDS",
            WalletFailure::OutOfGas => "OUT_OF_GAS",
            WalletFailure::Chain(_) => "CHAIN_REJECTED",
        }
    }
}

/// Broadcast result as relayed by the UI after `signAndBroadcast`.
#[derive(Debug, Clone, Deserialize)]
pub struct BroadcastOutcome {
    pub code: Option<u32>,
    pub raw_log: Option<String>,
    pub error: Option<String>,
}

/// Returns `None` for a successful broadcast (code 0 and no wallet error).
pub fn classify(outcome: &BroadcastOutcome) -> Option<WalletFailure> {
    if let Some(message) = outcome.error.as_deref().filter(|m| !m.trim().is_empty()) {
        return Some(classify_message(message));
    }

    match outcome.code {
        Some(0) | None => None,
        Some(code) => {
            let raw_log = outcome.raw_log.as_deref().unwrap_or_default();
            if raw_log.trim().is_empty() {
                return Some(WalletFailure::Chain(format!(
                    "Transaction failed with code {}",
                    code
                )));
            }
            Some(classify_message(raw_log))
        }
    }
}

fn classify_message(message: &str) -> WalletFailure {
    let lower = message.to_ascii_lowercase();
    if lower.contains("insufficient funds") || lower.contains("insufficient fee") {
        WalletFailure::InsufficientFunds
    } else if lower.contains("out of gas") {
        WalletFailure::OutOfGas
    } else if lower.contains("request rejected") || lower.contains("user rejected") {
        WalletFailure::Rejected
    } else if lower.contains("keplr") && lower.contains("not") && lower.contains("install") {
        WalletFailure::ExtensionMissing
    } else {
        WalletFailure::Chain(message.trim().to_string())
    }
}
