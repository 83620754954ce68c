// Bech32 re-prefixing between Cosmos chains that share key derivation.

use bech32::{Bech32, Hrp};

use super::registry::ChainRegistry;
use crate::error::{AppError, Result};

/// Re-encodes the payload of `address` under `prefix`.
pub fn convert_address(address: &str, prefix: &str) -> Result<String> {
    let (_, data) = bech32::decode(address.trim())
        .map_err(|e| AppError::Translation(format!("Invalid bech32 address '{}': {}", address, e)))?;
    let hrp = Hrp::parse(prefix)
        .map_err(|e| AppError::Translation(format!("Invalid bech32 prefix '{}': {}", prefix, e)))?;
    bech32::encode::<Bech32>(hrp, &data)
        .map_err(|e| AppError::Translation(format!("Failed to encode address: {}", e)))
}

/// Address of the same key on `target_chain_id`, or an empty string when
/// the source is malformed or the chain is unknown.
pub fn translate(registry: &ChainRegistry, source_address: &str, target_chain_id: &str) -> String {
    let Some(chain) = registry
        .by_chain_id(target_chain_id)
        .or_else(|| registry.find(target_chain_id))
    else {
        tracing::warn!("No chain registered for chain id {}", target_chain_id);
        return String::new();
    };

    match convert_address(source_address, &chain.bech32_prefix) {
        Ok(address) => address,
        Err(e) => {
            tracing::warn!("Address translation to {} failed: {}", chain.chain_id, e);
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OSMO: &str = "osmo1qypqxpq9qcrsszg2pvxq6rs0zqg3yyc5helwsw";
    const COSMOS: &str = "cosmos1qypqxpq9qcrsszg2pvxq6rs0zqg3yyc5lzv7xu";
    const JUNO: &str = "juno1qypqxpq9qcrsszg2pvxq6rs0zqg3yyc5fs09pq";

    #[test]
    fn reprefixes_to_target_chain() {
        let registry = ChainRegistry::embedded().unwrap();
        assert_eq!(translate(&registry, OSMO, "cosmoshub-4"), COSMOS);
        assert_eq!(translate(&registry, COSMOS, "juno-1"), JUNO);
    }

    #[test]
    fn translation_is_idempotent() {
        let registry = ChainRegistry::embedded().unwrap();
        let once = translate(&registry, OSMO, "cosmoshub-4");
        let twice = translate(&registry, &once, "cosmoshub-4");
        assert_eq!(once, twice);
        assert_eq!(translate(&registry, OSMO, "osmosis-1"), OSMO);
    }

    #[test]
    fn payload_survives_round_trip() {
        let cosmos = convert_address(OSMO, "cosmos").unwrap();
        assert_eq!(convert_address(&cosmos, "osmo").unwrap(), OSMO);
    }

    #[test]
    fn malformed_or_unknown_yields_empty() {
        let registry = ChainRegistry::embedded().unwrap();
        assert_eq!(translate(&registry, "not-an-address", "cosmoshub-4"), "");
        assert_eq!(translate(&registry, OSMO, "unknown-9"), "");
    }

    #[test]
    fn invalid_prefix_is_translation_error() {
        assert!(matches!(
            convert_address(OSMO, ""),
            Err(AppError::Translation(_))
        ));
    }
}
