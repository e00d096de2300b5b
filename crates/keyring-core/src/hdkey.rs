//! BIP32 hierarchical deterministic key derivation over secp256k1.
//!
//! # Derivation
//!
//! The master key is `HMAC-SHA512(key = "Bitcoin seed", data = seed)`: the
//! first 32 bytes are the master scalar, the last 32 the chain code.
//!
//! A child key is derived from its parent with
//!
//! ```text
//! hardened:  I = HMAC-SHA512(c_par, 0x00 || k_par || ser32(i))
//! normal:    I = HMAC-SHA512(c_par, serP(k_par·G) || ser32(i))
//! k_child   = (I_L + k_par) mod n
//! c_child   = I_R
//! ```
//!
//! If `I_L ≥ n` or `k_child = 0` the index is invalid and derivation proceeds
//! with `i + 1`, bounded at [`MAX_DERIVATION_ATTEMPTS`].
//!
//! # Key Material
//!
//! [`Seed`] and [`ExtendedKey`] are zeroized on drop, cannot be cloned and
//! redact themselves in `Debug` output. Intermediate keys along a path are
//! dropped as soon as the next segment has been derived.
//!
//! # Example
//!
//! ```
//! use evm_keyring_core::hdkey::ExtendedKey;
//! use evm_keyring_core::DerivationPath;
//!
//! let seed = hex::decode("000102030405060708090a0b0c0d0e0f").unwrap();
//! let master = ExtendedKey::master(&seed).unwrap();
//!
//! let path: DerivationPath = "m/0'/1".parse().unwrap();
//! let child = master.derive_path(&path).unwrap();
//! assert_eq!(
//!     hex::encode(child.private_key()),
//!     "3c6cb8d0f6a264c91ea8b5030fadaa8e538b020f0a387421a12de9319dc93368"
//! );
//! ```

use std::fmt;

use hmac::{Hmac, Mac};
use k256::ecdsa::{SigningKey, VerifyingKey};
use sha2::Sha512;
use tracing::warn;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::address::Address;
use crate::error::{Error, Result};
use crate::field;
use crate::path::{ChildIndex, DerivationPath};

type HmacSha512 = Hmac<Sha512>;

/// The minimum seed length accepted by BIP32.
pub const MIN_SEED_LEN: usize = 16;

/// Upper bound on candidate indices tried for a single child derivation.
pub const MAX_DERIVATION_ATTEMPTS: usize = 1024;

/// HMAC key for master key generation on secp256k1.
const MASTER_KEY_DOMAIN: &[u8] = b"Bitcoin seed";

/// Root secret bytes from which all HD keys are derived.
///
/// Owned by exactly one keyring; zeroized when dropped.
pub struct Seed(Zeroizing<Vec<u8>>);

impl Seed {
    /// Wraps seed bytes, taking ownership of the buffer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSeedLength`] if the seed is shorter than
    /// [`MIN_SEED_LEN`] bytes.
    pub fn new(bytes: Vec<u8>) -> Result<Self> {
        let bytes = Zeroizing::new(bytes);
        if bytes.len() < MIN_SEED_LEN {
            return Err(Error::InvalidSeedLength(bytes.len()));
        }
        Ok(Self(bytes))
    }

    /// Copies seed bytes out of a borrowed buffer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSeedLength`] if the seed is too short.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        Self::new(bytes.to_vec())
    }

    /// The raw seed bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// The seed length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always `false`; a [`Seed`] is never shorter than [`MIN_SEED_LEN`].
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Seed")
            .field("len", &self.0.len())
            .finish_non_exhaustive()
    }
}

/// A private scalar together with its BIP32 chain code.
///
/// The scalar is always in `[1, n-1]`.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct ExtendedKey {
    scalar: [u8; 32],
    chain_code: [u8; 32],
}

impl ExtendedKey {
    /// Derives the master key from a seed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSeedLength`] for seeds under 16 bytes, or
    /// [`Error::DerivationFailed`] if the master scalar is zero or not below
    /// the curve order.
    pub fn master(seed: &[u8]) -> Result<Self> {
        if seed.len() < MIN_SEED_LEN {
            return Err(Error::InvalidSeedLength(seed.len()));
        }

        let output = hmac_sha512(MASTER_KEY_DOMAIN, &[seed])?;
        let (scalar, chain_code) = split_output(&output);

        if !field::is_valid_scalar(&scalar) {
            return Err(Error::DerivationFailed(
                "master scalar is zero or exceeds the curve order".to_string(),
            ));
        }

        Ok(Self {
            scalar: *scalar,
            chain_code: *chain_code,
        })
    }

    /// Derives the child key for a single path segment.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DerivationFailed`] if no valid child is found within
    /// [`MAX_DERIVATION_ATTEMPTS`] candidate indices, or if the next
    /// candidate would leave the segment's index range.
    pub fn derive_child(&self, child: ChildIndex) -> Result<Self> {
        self.derive_child_with(child, |candidate| self.ckd_output(candidate))
    }

    /// Derives the key at `path`, starting from this key.
    ///
    /// # Errors
    ///
    /// Propagates the first child derivation failure.
    pub fn derive_path(&self, path: &DerivationPath) -> Result<Self> {
        let mut current: Option<Self> = None;
        for segment in path {
            let parent = current.as_ref().unwrap_or(self);
            // Assigning drops (and zeroizes) the previous intermediate key
            current = Some(parent.derive_child(*segment)?);
        }
        Ok(current.unwrap_or_else(|| self.duplicate()))
    }

    /// The 32-byte private scalar.
    #[must_use]
    pub fn private_key(&self) -> &[u8; 32] {
        &self.scalar
    }

    /// The 32-byte chain code.
    #[must_use]
    pub fn chain_code(&self) -> &[u8; 32] {
        &self.chain_code
    }

    /// The public key `scalar·G`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DerivationFailed`] if the scalar is out of range.
    pub fn public_key(&self) -> Result<VerifyingKey> {
        Ok(VerifyingKey::from(&self.signing_key()?))
    }

    /// The 33-byte SEC1 compressed public key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DerivationFailed`] if the scalar is out of range.
    pub fn compressed_public_key(&self) -> Result<[u8; 33]> {
        let point = self.public_key()?.to_encoded_point(true);
        let mut out = [0u8; 33];
        out.copy_from_slice(point.as_bytes());
        Ok(out)
    }

    /// The Ethereum address of this key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DerivationFailed`] if the scalar is out of range.
    pub fn address(&self) -> Result<Address> {
        Ok(Address::from_public_key(&self.public_key()?))
    }

    fn signing_key(&self) -> Result<SigningKey> {
        SigningKey::from_slice(&self.scalar)
            .map_err(|e| Error::DerivationFailed(format!("invalid scalar: {e}")))
    }

    fn duplicate(&self) -> Self {
        Self {
            scalar: self.scalar,
            chain_code: self.chain_code,
        }
    }

    /// Computes `HMAC-SHA512(c_par, data || ser32(i))` for one candidate.
    fn ckd_output(&self, child: ChildIndex) -> Result<Zeroizing<[u8; 64]>> {
        let index = child.index().to_be_bytes();
        if child.is_hardened() {
            hmac_sha512(&self.chain_code, &[&[0x00], &self.scalar, &index])
        } else {
            let public = self.compressed_public_key()?;
            hmac_sha512(&self.chain_code, &[&public, &index])
        }
    }

    /// Runs the bounded BIP32 retry loop over candidate indices.
    fn derive_child_with<F>(&self, child: ChildIndex, mut ckd: F) -> Result<Self>
    where
        F: FnMut(ChildIndex) -> Result<Zeroizing<[u8; 64]>>,
    {
        let mut candidate = child;

        for attempt in 1..=MAX_DERIVATION_ATTEMPTS {
            let output = ckd(candidate)?;
            if let Some(key) = self.child_from_output(&output) {
                return Ok(key);
            }

            warn!(
                index = candidate.index(),
                attempt, "derived child key is invalid, retrying with next index"
            );

            candidate = candidate.next().ok_or_else(|| {
                Error::DerivationFailed(format!(
                    "no valid child key before the end of the index range at {candidate}"
                ))
            })?;
        }

        Err(Error::DerivationFailed(format!(
            "no valid child key for index {child} after {MAX_DERIVATION_ATTEMPTS} attempts"
        )))
    }

    /// Combines an HMAC output with this parent, or `None` if `I_L ≥ n` or
    /// the resulting scalar is zero.
    fn child_from_output(&self, output: &[u8; 64]) -> Option<Self> {
        let (il, ir) = split_output(output);
        if field::exceeds_order(&il) {
            return None;
        }

        let scalar = Zeroizing::new(field::add_mod_n(&il, &self.scalar));
        if *scalar == [0u8; 32] {
            return None;
        }

        Some(Self {
            scalar: *scalar,
            chain_code: *ir,
        })
    }
}

impl fmt::Debug for ExtendedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtendedKey").finish_non_exhaustive()
    }
}

/// Derives the 32-byte private key at `path` from `seed`.
///
/// # Errors
///
/// Returns [`Error::InvalidSeedLength`] or [`Error::DerivationFailed`].
pub fn derive_private_key(seed: &[u8], path: &DerivationPath) -> Result<Zeroizing<[u8; 32]>> {
    let key = ExtendedKey::master(seed)?.derive_path(path)?;
    Ok(Zeroizing::new(*key.private_key()))
}

/// Derives the Ethereum address at `path` from `seed`.
///
/// # Errors
///
/// Returns [`Error::InvalidSeedLength`] or [`Error::DerivationFailed`].
pub fn derive_address(seed: &[u8], path: &DerivationPath) -> Result<Address> {
    ExtendedKey::master(seed)?.derive_path(path)?.address()
}

fn hmac_sha512(key: &[u8], parts: &[&[u8]]) -> Result<Zeroizing<[u8; 64]>> {
    let mut mac = HmacSha512::new_from_slice(key)
        .map_err(|e| Error::DerivationFailed(format!("HMAC key rejected: {e}")))?;
    for part in parts {
        mac.update(part);
    }

    let mut output = Zeroizing::new([0u8; 64]);
    output.copy_from_slice(&mac.finalize().into_bytes());
    Ok(output)
}

fn split_output(output: &[u8; 64]) -> (Zeroizing<[u8; 32]>, Zeroizing<[u8; 32]>) {
    let mut left = Zeroizing::new([0u8; 32]);
    let mut right = Zeroizing::new([0u8; 32]);
    left.copy_from_slice(&output[..32]);
    right.copy_from_slice(&output[32..]);
    (left, right)
}
