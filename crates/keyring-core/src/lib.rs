//! EVM Keyring Core Library
//!
//! This crate provides the cryptographic core of a self-custodial EVM wallet:
//! hierarchical key derivation, secp256k1 recoverable signing, and the
//! canonical byte encodings that Ethereum nodes and contracts verify.
//!
//! # Overview
//!
//! Every signature produced by a wallet is a signature over a 32-byte digest.
//! This library computes those digests exactly as the network does and signs
//! them with keys held in one of several keyrings:
//!
//! - **Key Derivation**: BIP39 seeds and BIP32/BIP44 paths (`m/44'/60'/0'/0/i`)
//! - **Transaction Types**: EIP-155 legacy and EIP-1559 transactions, encode and decode
//! - **Message Signing**: EIP-191 personal messages and EIP-712 typed data
//! - **Keyrings**: HD, imported-key, watch-only and Safe multisig accounts
//! - **Safe Transactions**: signature collection up to an owner threshold
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Application Layer                        │
//! ├─────────────────────────────────────────────────────────────┤
//! │   HdKeyring   │ SimpleKeyring │  WatchKeyring │ GnosisKeyring│
//! │               │               │               │  + SafeTx    │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Transaction  │    EIP-191    │    EIP-712    │   Address    │
//! │  RLP codec    │   messages    │  typed data   │  checksums   │
//! ├─────────────────────────────────────────────────────────────┤
//! │        BIP32 derivation  │  secp256k1 recoverable ECDSA     │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ## Deriving Accounts
//!
//! ```rust
//! use evm_keyring_core::keyring::{HdKeyring, Keyring};
//! use evm_keyring_core::KeyringConfig;
//!
//! let phrase = "test test test test test test test test test test test junk";
//! let mut keyring = HdKeyring::from_mnemonic(phrase, "", KeyringConfig::default()).unwrap();
//!
//! let account = keyring.add_next_account().unwrap();
//! assert_eq!(
//!     account.address.to_checksum_hex(),
//!     "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"
//! );
//! ```
//!
//! ## Creating a Transaction
//!
//! ```rust
//! use evm_keyring_core::{Transaction, Eip1559Transaction, Address};
//! use alloy_primitives::U256;
//!
//! // Create an EIP-1559 transaction
//! let tx = Transaction::Eip1559(Eip1559Transaction {
//!     chain_id: 1,
//!     nonce: 0,
//!     max_priority_fee_per_gas: U256::from(1_000_000_000u64),
//!     max_fee_per_gas: U256::from(100_000_000_000u64),
//!     gas_limit: 21000,
//!     to: Some(Address::zero()),
//!     value: U256::from(1_000_000_000_000_000_000u128),
//!     data: vec![],
//!     access_list: vec![],
//! });
//!
//! // Get the hash to sign
//! let hash = tx.signing_hash();
//! let raw = evm_keyring_core::encode_unsigned_transaction(&tx);
//! assert_eq!(raw[0], 0x02);
//! # let _ = hash;
//! ```
//!
//! ## Hashing EIP-712 Typed Data
//!
//! ```rust
//! use evm_keyring_core::{TypedData, Eip712Domain};
//! use serde_json::json;
//!
//! let domain = Eip712Domain {
//!     name: Some("My DApp".to_string()),
//!     version: Some("1".to_string()),
//!     chain_id: Some(1),
//!     verifying_contract: None,
//!     salt: None,
//! };
//!
//! let types = json!({
//!     "Transfer": [
//!         {"name": "to", "type": "address"},
//!         {"name": "amount", "type": "uint256"}
//!     ]
//! });
//!
//! let message = json!({
//!     "to": "0x0000000000000000000000000000000000000001",
//!     "amount": "1000000000000000000"
//! });
//!
//! let typed_data = TypedData::new(domain, types, "Transfer", message).unwrap();
//! let hash = typed_data.signing_hash().unwrap();
//! # let _ = hash;
//! ```
//!
//! # Concurrency
//!
//! Keyrings implement [`keyring::Keyring`], which requires `Send + Sync`.
//! Signing takes `&self`, so a keyring can be shared behind an
//! [`Arc`](std::sync::Arc) and used from many threads; adding or removing
//! accounts takes `&mut self` and needs the caller's own lock.
//!
//! # Security Considerations
//!
//! - Seeds and private keys are zeroized on drop and redacted from `Debug`
//! - HD keyrings re-derive the private key per signature instead of caching it
//! - Signatures are normalized to low-S form, and high-S signatures are
//!   rejected on recovery
//! - Unprotected (pre-EIP-155) legacy transactions are never produced

// Modules
pub mod address;
pub mod config;
pub mod crypto;
pub mod eip191;
pub mod eip712;
pub mod error;
pub mod field;
pub mod hdkey;
pub mod keyring;
pub mod mnemonic;
pub mod path;
pub mod safe;
pub mod signature;
pub mod transaction;

// Re-exports for convenience
pub use address::{Address, is_valid_address, to_checksum_address};
pub use config::KeyringConfig;
pub use crypto::sign_hash;
pub use eip191::hash_personal_message;
pub use eip712::{Eip712Domain, TypeField, TypedData, hash_typed_data};
pub use error::{Error, Result};
pub use hdkey::{ExtendedKey, Seed, derive_address, derive_private_key};
pub use keyring::{
    Account, AccountBackend, GnosisKeyring, HdKeyring, KeyHandle, Keyring, KeyringKind,
    SimpleKeyring, WatchKeyring,
};
pub use path::{ChildIndex, DerivationPath};
pub use safe::{Operation, SafeInfo, SafeTransaction, SafeTransactionStatus};
pub use signature::Signature;
pub use transaction::{
    AccessListEntry, Eip1559Transaction, LegacyTransaction, Transaction, TransactionEnvelope,
    encode_signed_transaction, encode_unsigned_transaction,
};

// Re-export commonly used alloy types
pub use alloy_primitives::{B256, U256};
