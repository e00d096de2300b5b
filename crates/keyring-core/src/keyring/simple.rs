use std::collections::BTreeMap;
use std::fmt;

use alloy_primitives::B256;
use tracing::{debug, info};
use zeroize::Zeroizing;

use super::{Account, AccountBackend, KeyHandle, Keyring, KeyringKind};
use crate::address::Address;
use crate::crypto;
use crate::error::{Error, Result};
use crate::signature::Signature;

struct ImportedKey {
    handle: KeyHandle,
    secret: Zeroizing<[u8; 32]>,
}

/// A keyring of individually imported private keys.
#[derive(Default)]
pub struct SimpleKeyring {
    keys: BTreeMap<Address, ImportedKey>,
    next_handle: u64,
}

impl SimpleKeyring {
    /// Creates an empty keyring.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Imports a raw 32-byte private key. Importing the same key twice
    /// returns the existing account.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKeyLength`] or [`Error::SignatureFailure`] if
    /// the key is not a valid secp256k1 scalar.
    pub fn import_key(&mut self, private_key: &[u8]) -> Result<Account> {
        let public_key = crypto::public_key_from_private(private_key)?;
        let address = Address::from_public_key(&public_key);

        if let Some(existing) = self.keys.get(&address) {
            return Ok(account(address, existing.handle));
        }

        let mut secret = Zeroizing::new([0u8; 32]);
        secret.copy_from_slice(private_key);

        let handle = KeyHandle::new(self.next_handle);
        self.next_handle += 1;
        self.keys.insert(address, ImportedKey { handle, secret });

        info!(%address, %handle, "private key imported");
        Ok(account(address, handle))
    }

    /// Imports a hex-encoded private key, with or without `0x`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HexDecodeFailed`] for invalid hex, otherwise as
    /// [`SimpleKeyring::import_key`].
    pub fn import_hex_key(&mut self, private_key: &str) -> Result<Account> {
        let bytes = Zeroizing::new(hex::decode(
            private_key.strip_prefix("0x").unwrap_or(private_key),
        )?);
        self.import_key(&bytes)
    }

    /// Removes an account and zeroizes its key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownAccount`] if `address` is not held here.
    pub fn remove(&mut self, address: &Address) -> Result<()> {
        self.keys
            .remove(address)
            .map(|_| info!(%address, "imported key removed"))
            .ok_or(Error::UnknownAccount(address.inner()))
    }

    /// The handle of the key behind `address`.
    #[must_use]
    pub fn handle_of(&self, address: &Address) -> Option<KeyHandle> {
        self.keys.get(address).map(|key| key.handle)
    }
}

impl Keyring for SimpleKeyring {
    fn kind(&self) -> KeyringKind {
        KeyringKind::Simple
    }

    fn accounts(&self) -> Vec<Account> {
        self.keys
            .iter()
            .map(|(address, key)| account(*address, key.handle))
            .collect()
    }

    fn contains(&self, address: &Address) -> bool {
        self.keys.contains_key(address)
    }

    fn sign_hash(&self, address: &Address, hash: &B256) -> Result<Signature> {
        let key = self
            .keys
            .get(address)
            .ok_or(Error::UnknownAccount(address.inner()))?;

        let signature = crypto::sign_hash(hash, key.secret.as_slice())?;
        debug!(%address, handle = %key.handle, "imported key signed hash");
        Ok(signature)
    }
}

impl fmt::Debug for SimpleKeyring {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimpleKeyring")
            .field("accounts", &self.keys.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

const fn account(address: Address, handle: KeyHandle) -> Account {
    Account {
        address,
        backend: AccountBackend::Simple(handle),
    }
}
