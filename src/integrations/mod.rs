pub mod coingecko;
pub mod cosmos_rest;
pub mod fetch;
pub mod rate_limit;

pub use coingecko::CoinGeckoClient;
pub use cosmos_rest::{ChainDataSource, CosmosRestClient};
pub use fetch::{FetchClient, FetchOptions, RetryPolicy};
