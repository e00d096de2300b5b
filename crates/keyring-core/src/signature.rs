//! Recoverable secp256k1 ECDSA signatures.
//!
//! # Signature Format
//!
//! - `r`: x-coordinate of the ephemeral point (32 bytes)
//! - `s`: the signature scalar (32 bytes), at most `n/2` when produced here
//! - `v`: the bare recovery id (`0` or `1`)
//!
//! The chain-specific `v` convention is applied by the consumer: legacy
//! transactions use `35 + 2·chainId + v`, typed transactions the bare `v`,
//! and personal messages and Safe signatures `27 + v`.
//!
//! # Example
//!
//! ```
//! use evm_keyring_core::Signature;
//!
//! let sig = Signature::new([1u8; 32], [2u8; 32], 1).unwrap();
//! assert_eq!(sig.v(), 1);
//! assert_eq!(sig.to_legacy_bytes()[64], 28);
//!
//! assert!(Signature::new([1u8; 32], [2u8; 32], 27).is_err());
//! ```

use core::fmt;

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::field;

/// A recoverable ECDSA signature over secp256k1.
///
/// # Wire Format
///
/// [`Signature::to_bytes`] yields `r (32 bytes) || s (32 bytes) || v (1 byte)`
/// with the bare recovery id; [`Signature::to_legacy_bytes`] uses `27 + v`.
///
/// `v` is always `0` or `1`; constructors and deserialization reject
/// anything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawSignature")]
pub struct Signature {
    /// The R component of the signature (32 bytes).
    #[serde(with = "hex_bytes")]
    r: [u8; 32],

    /// The S component of the signature (32 bytes).
    #[serde(with = "hex_bytes")]
    s: [u8; 32],

    /// The recovery id (`0` or `1`).
    v: u8,
}

/// Serde helper for hex encoding/decoding 32-byte arrays.
mod hex_bytes {
    use hex::{decode, encode};
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub(super) fn serialize<S>(bytes: &[u8; 32], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("0x{}", encode(bytes)))
    }

    pub(super) fn deserialize<'de, D>(deserializer: D) -> Result<[u8; 32], D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let s = s.strip_prefix("0x").unwrap_or(&s);
        let bytes = decode(s).map_err(de::Error::custom)?;
        bytes
            .try_into()
            .map_err(|_| de::Error::custom("expected 32 bytes"))
    }
}

/// Unvalidated wire form of a [`Signature`].
#[derive(Deserialize)]
struct RawSignature {
    #[serde(with = "hex_bytes")]
    r: [u8; 32],
    #[serde(with = "hex_bytes")]
    s: [u8; 32],
    v: u8,
}

impl TryFrom<RawSignature> for Signature {
    type Error = Error;

    fn try_from(raw: RawSignature) -> Result<Self> {
        Self::new(raw.r, raw.s, raw.v)
    }
}

impl Signature {
    /// The length of a serialized signature in bytes.
    pub const BYTE_LEN: usize = 65;

    /// Offset added to the recovery id for personal messages and Safe
    /// signatures.
    pub const LEGACY_V_OFFSET: u8 = 27;

    /// Creates a new signature from raw components.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSignature`] unless `v` is a bare recovery id
    /// (`0` or `1`).
    pub fn new(r: [u8; 32], s: [u8; 32], v: u8) -> Result<Self> {
        if v > 1 {
            return Err(Error::InvalidSignature(format!(
                "recovery id must be 0 or 1, got {v}"
            )));
        }
        Ok(Self { r, s, v })
    }

    /// Creates a signature from a 65-byte `r || s || v` slice.
    ///
    /// `v` may be the bare recovery id (`0`/`1`) or the legacy form
    /// (`27`/`28`); it is stored as the bare recovery id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSignature`] if the slice is not 65 bytes or
    /// `v` is not one of `0`, `1`, `27`, `28`.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != Self::BYTE_LEN {
            return Err(Error::InvalidSignature(format!(
                "expected {} bytes, got {}",
                Self::BYTE_LEN,
                bytes.len()
            )));
        }

        let r: [u8; 32] = bytes[0..32]
            .try_into()
            .map_err(|_| Error::InvalidSignature("invalid r component".to_string()))?;
        let s: [u8; 32] = bytes[32..64]
            .try_into()
            .map_err(|_| Error::InvalidSignature("invalid s component".to_string()))?;
        let v = match bytes[64] {
            v @ (0 | 1) => v,
            v @ (27 | 28) => v - Self::LEGACY_V_OFFSET,
            other => {
                return Err(Error::InvalidSignature(format!(
                    "invalid recovery parameter {other}"
                )));
            }
        };

        Self::new(r, s, v)
    }

    /// Serializes the signature to `r || s || v` with the bare recovery id.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; Self::BYTE_LEN] {
        let mut bytes = [0u8; Self::BYTE_LEN];
        bytes[0..32].copy_from_slice(&self.r);
        bytes[32..64].copy_from_slice(&self.s);
        bytes[64] = self.v;
        bytes
    }

    /// Serializes the signature to `r || s || (27 + v)`.
    ///
    /// This is the form returned by `personal_sign` and expected by Safe
    /// contracts for owner ECDSA signatures.
    #[must_use]
    pub fn to_legacy_bytes(&self) -> [u8; Self::BYTE_LEN] {
        let mut bytes = self.to_bytes();
        bytes[64] = self.v.saturating_add(Self::LEGACY_V_OFFSET);
        bytes
    }

    /// Returns the R component of the signature.
    #[must_use]
    pub const fn r(&self) -> &[u8; 32] {
        &self.r
    }

    /// Returns the S component of the signature.
    #[must_use]
    pub const fn s(&self) -> &[u8; 32] {
        &self.s
    }

    /// Returns the recovery id (`0` or `1`).
    #[must_use]
    pub const fn v(&self) -> u8 {
        self.v
    }

    /// Returns the R component as a [`U256`].
    #[must_use]
    pub const fn r_u256(&self) -> U256 {
        U256::from_be_bytes(self.r)
    }

    /// Returns the S component as a [`U256`].
    #[must_use]
    pub const fn s_u256(&self) -> U256 {
        U256::from_be_bytes(self.s)
    }

    /// Whether `s` is in the lower half of the curve order.
    #[must_use]
    pub fn is_low_s(&self) -> bool {
        !field::is_high_s(&self.s)
    }

    /// Encodes the signature as a hex string with `0x` prefix.
    #[must_use]
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.to_bytes()))
    }

    /// Parses a signature from a hex string.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HexDecodeFailed`] if the hex string is invalid, or
    /// [`Error::InvalidSignature`] if the decoded bytes are not a signature.
    pub fn from_hex(hex_str: &str) -> Result<Self> {
        let hex_str = hex_str.strip_prefix("0x").unwrap_or(hex_str);
        let bytes = hex::decode(hex_str)?;
        Self::from_bytes(&bytes)
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}
