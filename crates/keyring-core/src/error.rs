//! Error types for the EVM keyring core.
//!
//! This module provides a single error type [`enum@Error`] that covers every
//! failure mode of key derivation, signing, encoding and keyring operations.
//!
//! # Error Categories
//!
//! - **Derivation errors**: seed length, path format, out-of-range scalars
//! - **Signing errors**: key length, public keys, signature production
//! - **Encoding errors**: RLP, EIP-712 typed data, transactions
//! - **Keyring errors**: unknown accounts, watch-only signing, Safe quorum
//!
//! There is no local recovery for a cryptographic failure: every error is
//! returned to the caller and the in-progress action must be treated as not
//! having happened.
//!
//! # Example
//!
//! ```
//! use evm_keyring_core::Error;
//!
//! fn example() -> Result<(), Error> {
//!     let err = Error::TransactionNotSigned;
//!     assert!(matches!(err, Error::TransactionNotSigned));
//!     Ok(())
//! }
//! ```

use alloy_primitives::Address as AlloyAddress;
use alloy_rlp::Error as AlloyRlpError;
use core::result::Result as CoreResult;
use hex::FromHexError;
use serde_json::Error as SerdeJsonError;
use thiserror::Error;

/// The main error type for the keyring core.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    // =========================================================================
    // Derivation Errors
    // =========================================================================
    /// The seed is shorter than the BIP32 minimum of 16 bytes.
    #[error("invalid seed length: expected at least 16 bytes, got {0}")]
    InvalidSeedLength(usize),

    /// A derivation path string could not be parsed.
    #[error("invalid derivation path: {0}")]
    InvalidPathFormat(String),

    /// Derivation produced an out-of-range scalar and retries were exhausted.
    #[error("key derivation failed: {0}")]
    DerivationFailed(String),

    /// The mnemonic phrase is not a valid BIP39 phrase.
    #[error("invalid mnemonic: {0}")]
    InvalidMnemonic(String),

    // =========================================================================
    // Cryptographic Errors
    // =========================================================================
    /// A private key was not exactly 32 bytes.
    #[error("invalid private key length: expected 32 bytes, got {0}")]
    InvalidKeyLength(usize),

    /// The public key is invalid or malformed.
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    /// The signing primitive rejected the key or failed to sign.
    #[error("signature failure: {0}")]
    SignatureFailure(String),

    /// The signature is invalid or malformed.
    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    // =========================================================================
    // Transaction Errors
    // =========================================================================
    /// A signed encoding was requested before a signature exists.
    #[error("transaction has not been signed")]
    TransactionNotSigned,

    /// The transaction data is invalid.
    #[error("invalid transaction: {0}")]
    InvalidTransaction(String),

    /// RLP decoding failed.
    #[error("RLP error: {0}")]
    RlpError(String),

    // =========================================================================
    // EIP-712 Errors
    // =========================================================================
    /// The domain, types or message of typed data are malformed.
    #[error("invalid EIP-712 typed data: {0}")]
    InvalidTypedData(String),

    /// A type referenced in the typed data is not defined.
    #[error("undefined type in EIP-712 data: {0}")]
    UndefinedType(String),

    // =========================================================================
    // Keyring Errors
    // =========================================================================
    /// The keyring cannot perform the requested operation.
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// The account is not held by this keyring.
    #[error("unknown account {0}")]
    UnknownAccount(AlloyAddress),

    /// The address is not a valid hex or checksummed address.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// The keyring configuration is invalid.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    // =========================================================================
    // Safe (Multisig) Errors
    // =========================================================================
    /// A Safe transaction does not have enough owner signatures.
    #[error("threshold not met: {have} of {need} signatures")]
    ThresholdNotMet {
        /// Number of collected signatures.
        have: usize,
        /// Configured threshold.
        need: usize,
    },

    /// The signer is not a registered owner of the Safe.
    #[error("{0} is not an owner of the Safe")]
    NotSafeOwner(AlloyAddress),

    /// The Safe is not tracked by this keyring.
    #[error("unknown Safe {0}")]
    UnknownSafe(AlloyAddress),

    /// The Safe transaction is not in a state that allows the operation.
    #[error("invalid Safe transaction state: {0}")]
    InvalidSafeState(String),

    // =========================================================================
    // Serialization Errors
    // =========================================================================
    /// Failed to parse hex data.
    #[error("hex decoding failed: {0}")]
    HexDecodeFailed(String),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    JsonError(String),
}

impl From<FromHexError> for Error {
    fn from(err: FromHexError) -> Self {
        Error::HexDecodeFailed(err.to_string())
    }
}

impl From<SerdeJsonError> for Error {
    fn from(err: SerdeJsonError) -> Self {
        Error::JsonError(err.to_string())
    }
}

impl From<AlloyRlpError> for Error {
    fn from(err: AlloyRlpError) -> Self {
        Error::RlpError(err.to_string())
    }
}

/// A specialized [`Result`] type for keyring core operations.
pub type Result<T> = CoreResult<T, Error>;
