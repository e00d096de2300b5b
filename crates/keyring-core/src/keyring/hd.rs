use alloy_primitives::B256;
use tracing::{debug, info};

use super::{Account, AccountBackend, Keyring, KeyringKind};
use crate::address::Address;
use crate::config::KeyringConfig;
use crate::crypto;
use crate::error::{Error, Result};
use crate::hdkey::{ExtendedKey, Seed, derive_private_key};
use crate::mnemonic::seed_from_mnemonic;
use crate::path::{ChildIndex, DerivationPath};
use crate::signature::Signature;

/// A keyring whose accounts are all derived from one seed.
///
/// Only addresses and paths are kept per account; the private key is
/// re-derived for every signature and dropped afterwards.
#[derive(Debug)]
pub struct HdKeyring {
    seed: Seed,
    config: KeyringConfig,
    accounts: Vec<(Address, DerivationPath)>,
    next_index: u32,
}

impl HdKeyring {
    /// Creates an empty keyring over `seed`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if `config` is invalid, or
    /// [`Error::InvalidSeedLength`] / [`Error::DerivationFailed`] if the seed
    /// does not yield a master key.
    pub fn new(seed: Seed, config: KeyringConfig) -> Result<Self> {
        config.validate()?;
        // Fail early instead of on the first account
        ExtendedKey::master(seed.as_bytes())?;

        Ok(Self {
            seed,
            config,
            accounts: Vec::new(),
            next_index: 0,
        })
    }

    /// Creates an empty keyring from a BIP39 phrase.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidMnemonic`] for an invalid phrase, otherwise
    /// as [`HdKeyring::new`].
    pub fn from_mnemonic(phrase: &str, passphrase: &str, config: KeyringConfig) -> Result<Self> {
        Self::new(seed_from_mnemonic(phrase, passphrase)?, config)
    }

    /// The keyring configuration.
    #[must_use]
    pub const fn config(&self) -> &KeyringConfig {
        &self.config
    }

    /// Derives and adds the account at `path`. Adding a path twice returns
    /// the existing account.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedOperation`] once `max_hd_accounts` is
    /// reached, or a derivation error.
    pub fn add_account(&mut self, path: DerivationPath) -> Result<Account> {
        if let Some((address, existing)) = self.accounts.iter().find(|(_, p)| *p == path) {
            return Ok(account(*address, existing.clone()));
        }
        if self.accounts.len() >= self.config.max_hd_accounts as usize {
            return Err(Error::UnsupportedOperation(format!(
                "HD keyring is limited to {} accounts",
                self.config.max_hd_accounts
            )));
        }

        let address = ExtendedKey::master(self.seed.as_bytes())?
            .derive_path(&path)?
            .address()?;

        info!(%address, %path, "hd account added");
        self.accounts.push((address, path.clone()));
        Ok(account(address, path))
    }

    /// Adds the account at `hd_base_path/i` for the next unused `i`.
    ///
    /// # Errors
    ///
    /// Same as [`HdKeyring::add_account`].
    pub fn add_next_account(&mut self) -> Result<Account> {
        loop {
            let path = self
                .config
                .hd_base_path
                .child(ChildIndex::normal(self.next_index)?);
            let taken = self.accounts.iter().any(|(_, p)| *p == path);

            self.next_index = self.next_index.checked_add(1).ok_or_else(|| {
                Error::UnsupportedOperation("HD account index space exhausted".to_string())
            })?;

            if !taken {
                return self.add_account(path);
            }
        }
    }

    /// The derivation path of `address`.
    #[must_use]
    pub fn path_of(&self, address: &Address) -> Option<&DerivationPath> {
        self.accounts
            .iter()
            .find(|(a, _)| a == address)
            .map(|(_, path)| path)
    }
}

impl Keyring for HdKeyring {
    fn kind(&self) -> KeyringKind {
        KeyringKind::Hd
    }

    fn accounts(&self) -> Vec<Account> {
        self.accounts
            .iter()
            .map(|(address, path)| account(*address, path.clone()))
            .collect()
    }

    fn contains(&self, address: &Address) -> bool {
        self.path_of(address).is_some()
    }

    fn sign_hash(&self, address: &Address, hash: &B256) -> Result<Signature> {
        let path = self
            .path_of(address)
            .ok_or(Error::UnknownAccount(address.inner()))?;

        let private_key = derive_private_key(self.seed.as_bytes(), path)?;
        let signature = crypto::sign_hash(hash, private_key.as_slice())?;

        debug!(%address, "hd account signed hash");
        Ok(signature)
    }
}

const fn account(address: Address, path: DerivationPath) -> Account {
    Account {
        address,
        backend: AccountBackend::Hd(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::{LegacyTransaction, Transaction};
    use alloy_primitives::U256;

    const PHRASE: &str = "test test test test test test test test test test test junk";

    fn keyring() -> HdKeyring {
        HdKeyring::from_mnemonic(PHRASE, "", KeyringConfig::default()).unwrap()
    }

    #[test]
    fn sequential_accounts_follow_bip44() {
        let mut keyring = keyring();
        let first = keyring.add_next_account().unwrap();
        let second = keyring.add_next_account().unwrap();

        assert_eq!(
            first.address.to_checksum_hex(),
            "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"
        );
        assert_eq!(
            second.address.to_checksum_hex(),
            "0x70997970C51812dc3A010C7d01b50e0d17dc79C8"
        );
        assert_eq!(
            second.backend,
            AccountBackend::Hd("m/44'/60'/0'/0/1".parse().unwrap())
        );
        assert_eq!(keyring.accounts().len(), 2);
    }

    #[test]
    fn add_account_is_idempotent() {
        let mut keyring = keyring();
        let path: DerivationPath = "m/44'/60'/0'/0/0".parse().unwrap();
        let a = keyring.add_account(path.clone()).unwrap();
        let b = keyring.add_account(path).unwrap();
        assert_eq!(a, b);
        assert_eq!(keyring.accounts().len(), 1);

        // Index 0 is taken, so the next sequential account is index 1
        let next = keyring.add_next_account().unwrap();
        assert_eq!(
            next.backend,
            AccountBackend::Hd("m/44'/60'/0'/0/1".parse().unwrap())
        );
    }

    #[test]
    fn account_cap_is_enforced() {
        let config = KeyringConfig {
            max_hd_accounts: 1,
            ..KeyringConfig::default()
        };
        let mut keyring = HdKeyring::from_mnemonic(PHRASE, "", config).unwrap();
        keyring.add_next_account().unwrap();
        assert!(matches!(
            keyring.add_next_account(),
            Err(Error::UnsupportedOperation(_))
        ));
    }

    #[test]
    fn signs_for_own_accounts_only() {
        let mut keyring = keyring();
        let account = keyring.add_next_account().unwrap();
        let hash = B256::repeat_byte(7);

        let sig = keyring.sign_hash(&account.address, &hash).unwrap();
        assert_eq!(crypto::recover_address(&hash, &sig).unwrap(), account.address);

        let stranger = Address::new([9; 20]);
        assert!(matches!(
            keyring.sign_hash(&stranger, &hash),
            Err(Error::UnknownAccount(_))
        ));
    }

    #[test]
    fn signs_transactions() {
        let mut keyring = keyring();
        let account = keyring.add_next_account().unwrap();
        let tx = Transaction::Legacy(LegacyTransaction {
            chain_id: 31337,
            nonce: 0,
            gas_price: U256::from(1_000_000_000u64),
            gas_limit: 21000,
            to: Some(Address::new([0x22; 20])),
            value: U256::from(1u64),
            data: vec![],
        });

        let raw = keyring.sign_transaction(&account.address, &tx).unwrap();
        let (decoded, sig) = Transaction::decode_signed(&raw).unwrap();
        assert_eq!(decoded, tx);
        assert_eq!(
            crypto::recover_address(&tx.signing_hash(), &sig).unwrap(),
            account.address
        );
    }

    #[test]
    fn rejects_short_seed() {
        assert!(matches!(
            Seed::from_slice(&[0u8; 8]).and_then(|s| HdKeyring::new(s, KeyringConfig::default())),
            Err(Error::InvalidSeedLength(8))
        ));
    }

    #[test]
    fn debug_does_not_leak_seed() {
        let keyring = keyring();
        let debug = format!("{keyring:?}");
        assert!(debug.contains("Seed { len: 64"));
    }
}
