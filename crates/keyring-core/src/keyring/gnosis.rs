use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use alloy_primitives::B256;
use tracing::{debug, info};

use super::{Account, AccountBackend, Keyring, KeyringKind};
use crate::address::Address;
use crate::eip712::TypedData;
use crate::error::{Error, Result};
use crate::safe::{SafeInfo, SafeTransaction};
use crate::signature::Signature;
use crate::transaction::Transaction;

/// A keyring of Safe multisig accounts.
///
/// The keyring holds no keys of its own: owner signatures are produced by
/// `owner_signer`, usually the wallet's HD or simple keyring shared behind
/// an [`Arc`]. Signatures from owners held elsewhere are added with
/// [`GnosisKeyring::confirm_with`].
pub struct GnosisKeyring {
    safes: BTreeMap<Address, SafeInfo>,
    owner_signer: Arc<dyn Keyring>,
}

impl GnosisKeyring {
    /// Creates an empty keyring that signs through `owner_signer`.
    #[must_use]
    pub fn new(owner_signer: Arc<dyn Keyring>) -> Self {
        Self {
            safes: BTreeMap::new(),
            owner_signer,
        }
    }

    /// Tracks a Safe, replacing any previous state for the same address.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSafeState`] if the owner set or threshold is
    /// inconsistent.
    pub fn add_safe(&mut self, safe: SafeInfo) -> Result<Account> {
        safe.validate()?;
        info!(
            safe = %safe.address,
            chain_id = safe.chain_id,
            owners = safe.owners.len(),
            threshold = safe.threshold,
            "safe added"
        );

        let account = account(&safe);
        self.safes.insert(safe.address, safe);
        Ok(account)
    }

    /// Stops tracking a Safe.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownSafe`] if the Safe is not tracked.
    pub fn remove_safe(&mut self, address: &Address) -> Result<SafeInfo> {
        self.safes
            .remove(address)
            .ok_or(Error::UnknownSafe(address.inner()))
    }

    /// The tracked state of a Safe.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownSafe`] if the Safe is not tracked.
    pub fn safe(&self, address: &Address) -> Result<&SafeInfo> {
        self.safes
            .get(address)
            .ok_or(Error::UnknownSafe(address.inner()))
    }

    /// Records a new on-chain nonce, e.g. after an execution.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownSafe`] if the Safe is not tracked.
    pub fn set_nonce(&mut self, address: &Address, nonce: u64) -> Result<()> {
        let safe = self
            .safes
            .get_mut(address)
            .ok_or(Error::UnknownSafe(address.inner()))?;
        safe.nonce = nonce;
        Ok(())
    }

    /// The owners of `safe` that the owner signer can sign for, ascending.
    #[must_use]
    pub fn local_owners(&self, safe: &SafeInfo) -> Vec<Address> {
        if !self.owner_signer.supports_signing() {
            return Vec::new();
        }
        let mut owners: Vec<Address> = safe
            .owners
            .iter()
            .filter(|owner| self.owner_signer.contains(owner))
            .copied()
            .collect();
        owners.sort();
        owners
    }

    /// Adds one local owner's signature to `tx`.
    ///
    /// The first local owner that has not yet signed is used; if all of
    /// them have, the repeat signature is ignored by the transaction.
    /// Returns the owner that signed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownSafe`] for an untracked Safe,
    /// [`Error::InvalidSafeState`] if the nonce is already used or the
    /// transaction was submitted, or [`Error::UnsupportedOperation`] if no
    /// owner is held locally.
    pub fn sign_safe_transaction(
        &self,
        safe: &Address,
        tx: &mut SafeTransaction,
    ) -> Result<Address> {
        let info = self.safe(safe)?;
        ensure_nonce_unused(info, tx)?;

        let owners = self.local_owners(info);
        let owner = owners
            .iter()
            .find(|owner| !tx.signatures().contains_key(*owner))
            .or_else(|| owners.first())
            .ok_or_else(|| {
                Error::UnsupportedOperation(format!("no owner of {safe} is held locally"))
            })?;

        let hash = tx.safe_tx_hash(info)?;
        let signature = self.owner_signer.sign_hash(owner, &hash)?;
        tx.add_signature(info, signature)
    }

    /// Adds a signature produced by an owner outside this wallet.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownSafe`] for an untracked Safe,
    /// [`Error::InvalidSafeState`] if the nonce is already used, otherwise
    /// as [`SafeTransaction::add_signature`].
    pub fn confirm_with(
        &self,
        safe: &Address,
        tx: &mut SafeTransaction,
        signature: Signature,
    ) -> Result<Address> {
        let info = self.safe(safe)?;
        ensure_nonce_unused(info, tx)?;
        let signer = tx.add_signature(info, signature)?;
        debug!(safe = %safe, %signer, "external owner confirmation");
        Ok(signer)
    }
}

impl Keyring for GnosisKeyring {
    fn kind(&self) -> KeyringKind {
        KeyringKind::Gnosis
    }

    fn accounts(&self) -> Vec<Account> {
        self.safes.values().map(account).collect()
    }

    fn contains(&self, address: &Address) -> bool {
        self.safes.contains_key(address)
    }

    /// Signs `hash` with the lowest local owner of the Safe `address`.
    fn sign_hash(&self, address: &Address, hash: &B256) -> Result<Signature> {
        let safe = self
            .safes
            .get(address)
            .ok_or(Error::UnknownAccount(address.inner()))?;

        let owner = self.local_owners(safe).into_iter().next().ok_or_else(|| {
            Error::UnsupportedOperation(format!("no owner of {address} is held locally"))
        })?;
        self.owner_signer.sign_hash(&owner, hash)
    }

    fn sign_transaction(&self, address: &Address, _tx: &Transaction) -> Result<Vec<u8>> {
        Err(Error::UnsupportedOperation(format!(
            "{address} is a Safe; use sign_safe_transaction"
        )))
    }

    fn sign_personal_message(&self, address: &Address, _message: &[u8]) -> Result<Signature> {
        Err(Error::UnsupportedOperation(format!(
            "message signing for Safe {address} is not supported"
        )))
    }

    fn sign_typed_data(&self, address: &Address, _typed_data: &TypedData) -> Result<Signature> {
        Err(Error::UnsupportedOperation(format!(
            "typed data signing for Safe {address} is not supported"
        )))
    }
}

impl fmt::Debug for GnosisKeyring {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GnosisKeyring")
            .field("safes", &self.safes)
            .field("owner_signer", &self.owner_signer.kind())
            .finish()
    }
}

fn ensure_nonce_unused(safe: &SafeInfo, tx: &SafeTransaction) -> Result<()> {
    if tx.nonce() < safe.nonce {
        return Err(Error::InvalidSafeState(format!(
            "nonce {} already used, Safe is at {}",
            tx.nonce(),
            safe.nonce
        )));
    }
    Ok(())
}

fn account(safe: &SafeInfo) -> Account {
    Account {
        address: safe.address,
        backend: AccountBackend::Gnosis(safe.clone()),
    }
}
