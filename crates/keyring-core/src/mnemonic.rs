//! BIP39 mnemonic to seed conversion.
//!
//! The vault layer normally hands the keyring an already-derived seed; this
//! helper exists for importing a recovery phrase and for test fixtures.

use bip39::Mnemonic;
use zeroize::Zeroizing;

use crate::error::{Error, Result};
use crate::hdkey::Seed;

/// Validates an English BIP39 phrase and derives its 64-byte seed.
///
/// Whitespace between words is normalized before validation.
///
/// # Errors
///
/// Returns [`Error::InvalidMnemonic`] if a word is unknown, the word count is
/// wrong, or the checksum does not match.
///
/// # Example
///
/// ```
/// use evm_keyring_core::mnemonic::seed_from_mnemonic;
///
/// let seed = seed_from_mnemonic(
///     "test test test test test test test test test test test junk",
///     "",
/// )
/// .unwrap();
/// assert_eq!(seed.len(), 64);
/// ```
pub fn seed_from_mnemonic(phrase: &str, passphrase: &str) -> Result<Seed> {
    let normalized = Zeroizing::new(phrase.split_whitespace().collect::<Vec<_>>().join(" "));
    let mnemonic = Mnemonic::parse_normalized(&normalized)
        .map_err(|e| Error::InvalidMnemonic(e.to_string()))?;

    let seed = Zeroizing::new(mnemonic.to_seed(passphrase));
    Seed::from_slice(seed.as_slice())
}
