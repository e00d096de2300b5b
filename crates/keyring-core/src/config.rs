//! Keyring configuration.
//!
//! ```
//! use evm_keyring_core::KeyringConfig;
//!
//! let config = KeyringConfig::from_json(r#"{"max_hd_accounts": 5}"#).unwrap();
//! assert_eq!(config.hd_base_path.to_string(), "m/44'/60'/0'/0");
//! assert_eq!(config.max_hd_accounts, 5);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::path::{DerivationPath, HARDENED_BIT};

/// The BIP44 external chain for Ethereum, `m/44'/60'/0'/0`.
pub const DEFAULT_HD_BASE_PATH: &str = "m/44'/60'/0'/0";

/// The default cap on accounts an HD keyring will derive.
pub const DEFAULT_MAX_HD_ACCOUNTS: u32 = 100;

/// Settings shared by keyring instances.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyringConfig {
    /// Parent path of sequentially added HD accounts; account `i` lives at
    /// `hd_base_path/i`.
    pub hd_base_path: DerivationPath,

    /// Maximum number of accounts an HD keyring will hold.
    pub max_hd_accounts: u32,
}

impl Default for KeyringConfig {
    fn default() -> Self {
        Self {
            hd_base_path: bip44_ethereum_base(),
            max_hd_accounts: DEFAULT_MAX_HD_ACCOUNTS,
        }
    }
}

impl KeyringConfig {
    /// Parses and validates a configuration from JSON. Missing fields take
    /// their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the JSON is malformed, the base
    /// path does not parse, or validation fails.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| Error::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the invariants of the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if `max_hd_accounts` is zero or does
    /// not fit in the non-hardened index range.
    pub fn validate(&self) -> Result<()> {
        if self.max_hd_accounts == 0 {
            return Err(Error::InvalidConfig(
                "max_hd_accounts must be greater than 0".to_string(),
            ));
        }
        if self.max_hd_accounts > HARDENED_BIT {
            return Err(Error::InvalidConfig(format!(
                "max_hd_accounts must be at most {HARDENED_BIT}"
            )));
        }
        Ok(())
    }
}

fn bip44_ethereum_base() -> DerivationPath {
    // Infallible for the constant above
    DEFAULT_HD_BASE_PATH.parse().unwrap_or_default()
}
