// Gas limit and fee hints per transaction kind. Nothing here signs or broadcasts.

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    chains::{registry::parse_gas_price, ChainConfig},
    constants::{
        GAS_BUFFER, GAS_CLAIM_REWARDS_BASE, GAS_CLAIM_REWARDS_PER_VALIDATOR, GAS_DELEGATE,
        GAS_REDELEGATE, GAS_TRANSFER, GAS_UNDELEGATE,
    },
    error::{AppError, Result},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxKind {
    Delegate,
    Undelegate,
    Redelegate,
    Transfer,
    ClaimRewards,
}

impl TxKind {
    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "delegate" => Ok(TxKind::Delegate),
            "undelegate" => Ok(TxKind::Undelegate),
            "redelegate" => Ok(TxKind::Redelegate),
            "transfer" | "send" => Ok(TxKind::Transfer),
            "claim_rewards" | "claim" => Ok(TxKind::ClaimRewards),
            other => Err(AppError::BadRequest(format!("Unknown transaction kind: {}", other))),
        }
    }

    fn base_gas(self) -> u64 {
        match self {
            TxKind::Delegate => GAS_DELEGATE,
            TxKind::Undelegate => GAS_UNDELEGATE,
            TxKind::Redelegate => GAS_REDELEGATE,
            TxKind::Transfer => GAS_TRANSFER,
            TxKind::ClaimRewards => GAS_CLAIM_REWARDS_BASE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeeCoin {
    pub denom: String,
    pub amount: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeeEstimate {
    pub chain: String,
    pub kind: TxKind,
    pub gas_limit: u64,
    pub gas_price: String,
    pub fee: FeeCoin,
}

fn decimal(value: f64, what: &str) -> Result<Decimal> {
    Decimal::from_f64(value).ok_or_else(|| AppError::Internal(format!("Invalid {}: {}", what, value)))
}

/// `ceil((base + per_validator * n) * buffer)` for claims and
/// `ceil(base * chain multiplier * buffer)` for everything else.
pub fn gas_limit(chain: &ChainConfig, kind: TxKind, validator_count: u32) -> Result<u64> {
    let buffer = decimal(GAS_BUFFER, "gas buffer")?;
    let raw = match kind {
        TxKind::ClaimRewards => {
            let validators = u64::from(validator_count.max(1));
            Decimal::from(kind.base_gas() + GAS_CLAIM_REWARDS_PER_VALIDATOR * validators) * buffer
        }
        _ => {
            let multiplier = decimal(chain.gas_multiplier, "gas multiplier")?;
            Decimal::from(kind.base_gas()) * multiplier * buffer
        }
    };

    raw.ceil()
        .to_u64()
        .ok_or_else(|| AppError::Internal(format!("Gas limit out of range for {}", chain.name)))
}

pub fn estimate_fee(chain: &ChainConfig, kind: TxKind, validator_count: u32) -> Result<FeeEstimate> {
    let gas_limit = gas_limit(chain, kind, validator_count)?;
    let (price, price_denom) = parse_gas_price(&chain.gas_price)
        .ok_or_else(|| AppError::Config(format!("Invalid gas price for {}", chain.name)))?;
    let denom = if price_denom.is_empty() {
        chain.denom.clone()
    } else {
        price_denom.to_string()
    };
    let amount = (Decimal::from(gas_limit) * price).ceil();

    Ok(FeeEstimate {
        chain: chain.name.clone(),
        kind,
        gas_limit,
        gas_price: chain.gas_price.clone(),
        fee: FeeCoin {
            denom,
            amount: amount.normalize().to_string(),
        },
    })
}
