//! Relay configuration.

use std::time::Duration;

use ed25519_dalek::SigningKey;
use thiserror::Error;

use crate::core::address::{decode_fixed, HexError};

/// Default chain id for the local devnet.
pub const DEFAULT_CHAIN_ID: &str = "linkedup-devnet";

/// Default claim page.
pub const DEFAULT_CLAIM_URL: &str = "http://localhost:3000/claim";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No master key configured.
    #[error("LINKEDUP_MASTER_KEY is not set")]
    MissingMasterKey,

    /// Master key is not a 32-byte hex seed.
    #[error("invalid master key: {0}")]
    InvalidMasterKey(#[from] HexError),
}

/// Master-key relay configuration.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Chain the relay signs for.
    pub chain_id: String,
    /// Hex-encoded ed25519 seed of the custodial key.
    pub master_key_hex: Option<String>,
    /// Bounded wait for the sequence lock. `None` waits forever.
    pub lock_timeout: Option<Duration>,
    /// Base URL of the claim page sent to attendees.
    pub claim_url: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            chain_id: DEFAULT_CHAIN_ID.to_string(),
            master_key_hex: None,
            lock_timeout: None,
            claim_url: DEFAULT_CLAIM_URL.to_string(),
        }
    }
}

impl RelayConfig {
    /// Load from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            chain_id: std::env::var("LINKEDUP_CHAIN_ID").unwrap_or(defaults.chain_id),
            master_key_hex: std::env::var("LINKEDUP_MASTER_KEY").ok(),
            lock_timeout: std::env::var("LINKEDUP_LOCK_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .map(Duration::from_millis),
            claim_url: std::env::var("LINKEDUP_CLAIM_URL").unwrap_or(defaults.claim_url),
        }
    }

    /// Decode the custodial signing key.
    pub fn signing_key(&self) -> Result<SigningKey, ConfigError> {
        let hex = self
            .master_key_hex
            .as_deref()
            .ok_or(ConfigError::MissingMasterKey)?;
        let seed: [u8; 32] = decode_fixed(hex)?;
        Ok(SigningKey::from_bytes(&seed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RelayConfig::default();
        assert_eq!(config.chain_id, DEFAULT_CHAIN_ID);
        assert!(config.lock_timeout.is_none());
        assert!(matches!(
            config.signing_key(),
            Err(ConfigError::MissingMasterKey)
        ));
    }

    #[test]
    fn test_signing_key_decoding() {
        let config = RelayConfig {
            master_key_hex: Some(format!("0x{}", "07".repeat(32))),
            ..Default::default()
        };
        let key = config.signing_key().unwrap();
        assert_eq!(key.to_bytes(), [7u8; 32]);

        let short = RelayConfig {
            master_key_hex: Some("abcd".into()),
            ..Default::default()
        };
        assert!(matches!(
            short.signing_key(),
            Err(ConfigError::InvalidMasterKey(HexError::Length { .. }))
        ));
    }
}
