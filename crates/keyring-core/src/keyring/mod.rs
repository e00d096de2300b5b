//! Keyrings: named collections of accounts that can sign.
//!
//! Every variant implements [`Keyring`], so callers can hold a
//! `Vec<Box<dyn Keyring>>` and route a signing request to whichever keyring
//! [`contains`](Keyring::contains) the address.
//!
//! | Variant           | Holds                          | Signs |
//! |-------------------|--------------------------------|-------|
//! | [`HdKeyring`]     | one seed, accounts by path     | yes   |
//! | [`SimpleKeyring`] | imported private keys          | yes   |
//! | [`WatchKeyring`]  | addresses only                 | no    |
//! | [`GnosisKeyring`] | Safe accounts, via owner keys  | yes   |
//!
//! # Example
//!
//! ```
//! use evm_keyring_core::keyring::{Keyring, SimpleKeyring};
//! use evm_keyring_core::hash_personal_message;
//!
//! let key =
//!     hex::decode("ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80").unwrap();
//! let mut keyring = SimpleKeyring::new();
//! let account = keyring.import_key(&key).unwrap();
//!
//! let sig = keyring.sign_personal_message(&account.address, b"hello").unwrap();
//! let hash = hash_personal_message(b"hello");
//! let signer = evm_keyring_core::crypto::recover_address(&hash, &sig).unwrap();
//! assert_eq!(signer, account.address);
//! ```

mod gnosis;
mod hd;
mod simple;
mod watch;

use std::fmt;

use alloy_primitives::B256;
use serde::{Deserialize, Serialize};

pub use gnosis::GnosisKeyring;
pub use hd::HdKeyring;
pub use simple::SimpleKeyring;
pub use watch::WatchKeyring;

use crate::address::Address;
use crate::eip191::hash_personal_message;
use crate::eip712::TypedData;
use crate::error::Result;
use crate::path::DerivationPath;
use crate::safe::SafeInfo;
use crate::signature::Signature;
use crate::transaction::Transaction;

/// The kind of a keyring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyringKind {
    /// Accounts derived from one BIP32 seed.
    Hd,
    /// Individually imported private keys.
    Simple,
    /// Watch-only addresses.
    Watch,
    /// Safe multisig accounts.
    Gnosis,
}

impl fmt::Display for KeyringKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Hd => "hd",
            Self::Simple => "simple",
            Self::Watch => "watch",
            Self::Gnosis => "gnosis",
        };
        f.write_str(s)
    }
}

/// Opaque identifier of an imported key inside a [`SimpleKeyring`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyHandle(u64);

impl KeyHandle {
    pub(crate) const fn new(id: u64) -> Self {
        Self(id)
    }

    /// The numeric id.
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for KeyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "key#{}", self.0)
    }
}

/// Where an account's signing authority comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "source", rename_all = "lowercase")]
pub enum AccountBackend {
    /// Derived from the keyring seed at this path.
    Hd(DerivationPath),
    /// An imported key.
    Simple(KeyHandle),
    /// No key material.
    Watch,
    /// A Safe, signed for by its owners.
    Gnosis(SafeInfo),
}

/// An account exposed by a keyring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// The account address.
    pub address: Address,

    /// How the account signs.
    pub backend: AccountBackend,
}

/// A collection of accounts that may be able to sign.
///
/// Implementations are shared across threads; mutation (adding or removing
/// accounts) goes through the concrete type's `&mut self` methods.
pub trait Keyring: Send + Sync {
    /// The keyring variant.
    fn kind(&self) -> KeyringKind;

    /// Every account, in insertion or address order.
    fn accounts(&self) -> Vec<Account>;

    /// Whether this keyring can produce signatures at all.
    fn supports_signing(&self) -> bool {
        true
    }

    /// Signs a 32-byte digest as `address`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::UnknownAccount`] if `address` is not held here,
    /// [`crate::Error::UnsupportedOperation`] for keyrings without keys, or
    /// the signing engine's error.
    fn sign_hash(&self, address: &Address, hash: &B256) -> Result<Signature>;

    /// Whether `address` is one of this keyring's accounts.
    fn contains(&self, address: &Address) -> bool {
        self.accounts().iter().any(|account| account.address == *address)
    }

    /// Signs a transaction and returns its signed encoding.
    ///
    /// # Errors
    ///
    /// Same as [`Keyring::sign_hash`], plus encoding errors.
    fn sign_transaction(&self, address: &Address, tx: &Transaction) -> Result<Vec<u8>> {
        let signature = self.sign_hash(address, &tx.signing_hash())?;
        tx.signed_rlp(&signature)
    }

    /// Signs an EIP-191 personal message.
    ///
    /// # Errors
    ///
    /// Same as [`Keyring::sign_hash`].
    fn sign_personal_message(&self, address: &Address, message: &[u8]) -> Result<Signature> {
        self.sign_hash(address, &hash_personal_message(message))
    }

    /// Signs EIP-712 typed data.
    ///
    /// # Errors
    ///
    /// Same as [`Keyring::sign_hash`], plus typed data encoding errors.
    fn sign_typed_data(&self, address: &Address, typed_data: &TypedData) -> Result<Signature> {
        self.sign_hash(address, &typed_data.signing_hash()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_display() {
        assert_eq!(KeyringKind::Hd.to_string(), "hd");
        assert_eq!(KeyringKind::Gnosis.to_string(), "gnosis");
        assert_eq!(serde_json::to_string(&KeyringKind::Watch).unwrap(), "\"watch\"");
    }

    #[test]
    fn account_serialization() {
        let account = Account {
            address: Address::zero(),
            backend: AccountBackend::Hd("m/44'/60'/0'/0/0".parse().unwrap()),
        };
        let json = serde_json::to_value(&account).unwrap();
        assert_eq!(json["backend"]["type"], "hd");
        assert_eq!(json["backend"]["source"], "m/44'/60'/0'/0/0");

        let back: Account = serde_json::from_value(json).unwrap();
        assert_eq!(back, account);
    }

    #[test]
    fn keyrings_are_object_safe() {
        let keyrings: Vec<Box<dyn Keyring>> = vec![
            Box::new(SimpleKeyring::new()),
            Box::new(WatchKeyring::new()),
        ];
        assert!(keyrings.iter().all(|k| k.accounts().is_empty()));
        assert!(keyrings[0].supports_signing());
        assert!(!keyrings[1].supports_signing());
    }
}
