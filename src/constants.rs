/// Application constants

// API version
pub const API_VERSION: &str = "v1";

// Chain that is always enabled and cannot be toggled off
pub const REQUIRED_CHAIN: &str = "osmosis";

pub const DEFAULT_ENABLED_CHAINS: [&str; 5] = ["osmosis", "cosmoshub", "celestia", "akashnet", "juno"];

// Fetch retry wrapper
pub const FETCH_MAX_ATTEMPTS: u32 = 3;
pub const FETCH_RETRY_DELAY_MS: u64 = 2_000;
pub const FETCH_TIMEOUT_SECS: u64 = 15;
// Upper bound on a server-advertised Retry-After wait
pub const FETCH_MAX_RETRY_AFTER_SECS: u64 = 30;

// Caches
pub const PRICE_CACHE_TTL_SECS: u64 = 300;
pub const BALANCE_CACHE_TTL_SECS: u64 = 120;
// Owners not refreshed for this many balance TTLs are evicted
pub const OWNER_IDLE_TTL_FACTOR: u32 = 10;

// USD values are rendered with cent precision
pub const USD_DECIMALS: u32 = 2;

pub const UNKNOWN_VALIDATOR_NAME: &str = "Unknown Validator";

// Gas configuration
pub const GAS_DELEGATE: u64 = 300_000;
pub const GAS_UNDELEGATE: u64 = 300_000;
pub const GAS_REDELEGATE: u64 = 350_000;
pub const GAS_TRANSFER: u64 = 100_000;
pub const GAS_CLAIM_REWARDS_BASE: u64 = 200_000;
pub const GAS_CLAIM_REWARDS_PER_VALIDATOR: u64 = 80_000;
pub const GAS_BUFFER: f64 = 1.5;

// Background service intervals
pub const PRICE_WARMER_INTERVAL_SECS: u64 = 60;

// Cosmos SDK REST paths
pub const BANK_BALANCES_PATH: &str = "/cosmos/bank/v1beta1/balances";
pub const STAKING_DELEGATIONS_PATH: &str = "/cosmos/staking/v1beta1/delegations";
pub const DISTRIBUTION_DELEGATORS_PATH: &str = "/cosmos/distribution/v1beta1/delegators";
pub const STAKING_VALIDATORS_PATH: &str = "/cosmos/staking/v1beta1/validators";
pub const BOND_STATUS_BONDED: &str = "BOND_STATUS_BONDED";
