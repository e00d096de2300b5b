//! Ethereum addresses, EIP-55 checksums and validation.
//!
//! An address is the last 20 bytes of the Keccak-256 hash of an uncompressed
//! secp256k1 public key (without its `0x04` prefix):
//!
//! 1. Take the uncompressed public key (65 bytes: `0x04 || x || y`)
//! 2. Remove the `0x04` prefix to get 64 bytes (`x || y`)
//! 3. Compute the Keccak-256 hash of the 64 bytes
//! 4. Take the last 20 bytes of the hash as the address
//!
//! # Example
//!
//! ```
//! use evm_keyring_core::address::{is_valid_address, to_checksum_address};
//!
//! let checksummed = to_checksum_address("0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed").unwrap();
//! assert_eq!(checksummed, "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed");
//! assert!(is_valid_address(&checksummed));
//! ```

use std::fmt;
use std::str::FromStr;

use alloy_primitives::{Address as AlloyAddress, B256, keccak256};
use k256::ecdsa::VerifyingKey;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// An Ethereum address (20 bytes).
///
/// This is a wrapper around [`alloy_primitives::Address`]. Ordering is
/// byte-wise, which is the ascending order multisig contracts expect.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Address(AlloyAddress);

impl Address {
    /// The length of an Ethereum address in bytes.
    pub const BYTE_LEN: usize = 20;

    /// Creates a new address from a 20-byte array.
    #[must_use]
    pub const fn new(bytes: [u8; Self::BYTE_LEN]) -> Self {
        Self(AlloyAddress::new(bytes))
    }

    /// Returns the zero address (`0x0000...0000`).
    #[must_use]
    pub const fn zero() -> Self {
        Self(AlloyAddress::ZERO)
    }

    /// Checks if this is the zero address.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Derives the address of a secp256k1 public key.
    #[must_use]
    pub fn from_public_key(public_key: &VerifyingKey) -> Self {
        let encoded = public_key.to_encoded_point(false);

        // Skip the 0x04 prefix; hash only x || y
        let hash = keccak256(&encoded.as_bytes()[1..]);

        let mut address_bytes = [0u8; Self::BYTE_LEN];
        address_bytes.copy_from_slice(&hash[12..]);
        Self::new(address_bytes)
    }

    /// Derives an address from a SEC1-encoded public key.
    ///
    /// Accepts compressed (33 bytes), uncompressed (65 bytes) and raw
    /// `x || y` (64 bytes) encodings. Every encoding is checked to be a point
    /// on the curve.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPublicKey`] if the bytes are not a valid point.
    pub fn from_public_key_bytes(bytes: &[u8]) -> Result<Self> {
        let key = match bytes.len() {
            33 | 65 => VerifyingKey::from_sec1_bytes(bytes),
            64 => {
                let mut uncompressed = [0u8; 65];
                uncompressed[0] = 0x04;
                uncompressed[1..].copy_from_slice(bytes);
                VerifyingKey::from_sec1_bytes(&uncompressed)
            }
            len => {
                return Err(Error::InvalidPublicKey(format!(
                    "expected 33, 64 or 65 bytes, got {len}"
                )));
            }
        }
        .map_err(|e| Error::InvalidPublicKey(e.to_string()))?;

        Ok(Self::from_public_key(&key))
    }

    /// Returns the [`Address`] as a byte slice.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; Self::BYTE_LEN] {
        self.0.as_ref()
    }

    /// Returns the [`Address`] as a 20-byte array.
    #[must_use]
    pub const fn to_bytes(&self) -> [u8; Self::BYTE_LEN] {
        self.0.0.0
    }

    /// Returns the [`Address`] as an EIP-55 checksummed hex string.
    #[must_use]
    pub fn to_checksum_hex(&self) -> String {
        self.0.to_checksum(None)
    }

    /// Returns the [`Address`] as a lowercase hex string.
    #[must_use]
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.as_bytes()))
    }

    /// Parses an [`Address`] from a hex string.
    ///
    /// The `0x` prefix is optional. All-lowercase and all-uppercase strings
    /// are accepted as-is; mixed-case strings must carry a valid EIP-55
    /// checksum.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAddress`] if the string is not 40 hex digits
    /// or a mixed-case checksum does not match.
    pub fn from_hex(hex_str: &str) -> Result<Self> {
        let digits = strip_hex_prefix(hex_str);

        if digits.len() != Self::BYTE_LEN * 2 {
            return Err(Error::InvalidAddress(format!(
                "expected 40 hex digits, got {}",
                digits.len()
            )));
        }

        let bytes = hex::decode(digits).map_err(|e| Error::InvalidAddress(e.to_string()))?;
        let mut address_bytes = [0u8; Self::BYTE_LEN];
        address_bytes.copy_from_slice(&bytes);
        let address = Self::new(address_bytes);

        let has_lower = digits.bytes().any(|b| b.is_ascii_lowercase());
        let has_upper = digits.bytes().any(|b| b.is_ascii_uppercase());
        if has_lower && has_upper && address.to_checksum_hex()[2..] != *digits {
            return Err(Error::InvalidAddress(format!(
                "checksum mismatch for {hex_str}"
            )));
        }

        Ok(address)
    }

    /// Returns the inner [`alloy_primitives::Address`].
    #[must_use]
    pub const fn inner(&self) -> AlloyAddress {
        self.0
    }

    /// Left-pads the address to a 32-byte ABI word.
    #[must_use]
    pub fn to_word(&self) -> B256 {
        self.0.into_word()
    }
}

/// Converts an address string to its EIP-55 checksummed form.
///
/// # Errors
///
/// Returns [`Error::InvalidAddress`] if `address` is not a valid address.
pub fn to_checksum_address(address: &str) -> Result<String> {
    Ok(Address::from_hex(address)?.to_checksum_hex())
}

/// Returns `true` if `address` is a valid hex address.
///
/// Lowercase and uppercase forms are always accepted; mixed-case forms must
/// pass the EIP-55 checksum.
#[must_use]
pub fn is_valid_address(address: &str) -> bool {
    Address::from_hex(address).is_ok()
}

/// Computes the Keccak-256 hash of `data`.
#[must_use]
pub fn keccak(data: impl AsRef<[u8]>) -> B256 {
    keccak256(data)
}

fn strip_hex_prefix(s: &str) -> &str {
    s.strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s)
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_checksum_hex())
    }
}

impl FromStr for Address {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}

impl From<AlloyAddress> for Address {
    fn from(addr: AlloyAddress) -> Self {
        Self(addr)
    }
}

impl From<Address> for AlloyAddress {
    fn from(addr: Address) -> Self {
        addr.0
    }
}

impl From<[u8; 20]> for Address {
    fn from(bytes: [u8; 20]) -> Self {
        Self::new(bytes)
    }
}
