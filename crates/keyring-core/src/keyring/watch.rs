use std::collections::BTreeSet;

use alloy_primitives::B256;
use tracing::info;

use super::{Account, AccountBackend, Keyring, KeyringKind};
use crate::address::Address;
use crate::error::{Error, Result};
use crate::signature::Signature;

/// A keyring of watch-only addresses. It never signs.
#[derive(Debug, Clone, Default)]
pub struct WatchKeyring {
    addresses: BTreeSet<Address>,
}

impl WatchKeyring {
    /// Creates an empty keyring.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts watching `address`. Returns `false` if it was already watched.
    pub fn add(&mut self, address: Address) -> bool {
        let added = self.addresses.insert(address);
        if added {
            info!(%address, "watch-only account added");
        }
        added
    }

    /// Stops watching `address`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownAccount`] if `address` is not watched.
    pub fn remove(&mut self, address: &Address) -> Result<()> {
        if self.addresses.remove(address) {
            Ok(())
        } else {
            Err(Error::UnknownAccount(address.inner()))
        }
    }
}

impl Keyring for WatchKeyring {
    fn kind(&self) -> KeyringKind {
        KeyringKind::Watch
    }

    fn accounts(&self) -> Vec<Account> {
        self.addresses
            .iter()
            .map(|address| Account {
                address: *address,
                backend: AccountBackend::Watch,
            })
            .collect()
    }

    fn supports_signing(&self) -> bool {
        false
    }

    fn contains(&self, address: &Address) -> bool {
        self.addresses.contains(address)
    }

    fn sign_hash(&self, address: &Address, _hash: &B256) -> Result<Signature> {
        if !self.contains(address) {
            return Err(Error::UnknownAccount(address.inner()));
        }
        Err(Error::UnsupportedOperation(format!(
            "{address} is watch-only"
        )))
    }
}
