pub mod address;
pub mod registry;

pub use address::{convert_address, translate};
pub use registry::{ChainConfig, ChainRegistry};
