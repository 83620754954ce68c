// src/models/mod.rs
pub mod balance;
pub mod response;
pub mod staking;

pub use balance::{BalanceView, ChainBalance, MultiChainBalanceSnapshot, RefreshStatus, UsdValues};
pub use response::ApiResponse;
pub use staking::{BondedValidator, Delegation, DelegationSummary, ValidatorInfo};
