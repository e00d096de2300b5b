//! Safe (Gnosis Safe) multisig transactions.
//!
//! A [`SafeTransaction`] collects owner signatures over its EIP-712 hash
//! until the Safe's threshold is reached, then moves through submission
//! and confirmation:
//!
//! ```text
//! Draft ──sign──▶ CollectingSignatures ──sign──▶ ReadyToExecute
//!                                                     │
//!                                               mark_submitted
//!                                                     ▼
//!                                   Confirmed ◀── Submitted ──▶ Failed
//! ```
//!
//! Signatures are keyed by the recovered signer, so a second signature
//! from the same owner never counts twice. They are packed for
//! `execTransaction` in ascending signer order with `v = 27 + recovery_id`.

use std::collections::BTreeMap;
use std::fmt;

use alloy_primitives::{B256, U256};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::address::Address;
use crate::crypto;
use crate::eip712::{DOMAIN_TYPE, Eip712Domain, TypeField, TypedData, Types};
use crate::error::{Error, Result};
use crate::signature::Signature;

/// The EIP-712 primary type of a Safe transaction.
pub const SAFE_TX_TYPE: &str = "SafeTx";

/// The on-chain state of a Safe this keyring tracks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SafeInfo {
    /// The Safe proxy address.
    pub address: Address,

    /// The chain the Safe is deployed on.
    pub chain_id: u64,

    /// The owner addresses.
    pub owners: Vec<Address>,

    /// Number of owner signatures required to execute.
    pub threshold: usize,

    /// The Safe's current nonce.
    pub nonce: u64,
}

impl SafeInfo {
    /// Whether `address` is one of the owners.
    #[must_use]
    pub fn is_owner(&self, address: &Address) -> bool {
        self.owners.contains(address)
    }

    /// Checks that the owner set and threshold are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSafeState`] if there are no owners, an owner
    /// is the zero address or listed twice, or the threshold is zero or
    /// exceeds the number of owners.
    pub fn validate(&self) -> Result<()> {
        if self.owners.is_empty() {
            return Err(Error::InvalidSafeState("Safe has no owners".to_string()));
        }
        for (i, owner) in self.owners.iter().enumerate() {
            if owner.is_zero() {
                return Err(Error::InvalidSafeState("zero address owner".to_string()));
            }
            if self.owners[..i].contains(owner) {
                return Err(Error::InvalidSafeState(format!("duplicate owner {owner}")));
            }
        }
        if self.threshold == 0 || self.threshold > self.owners.len() {
            return Err(Error::InvalidSafeState(format!(
                "threshold {} is not within 1..={}",
                self.threshold,
                self.owners.len()
            )));
        }
        Ok(())
    }

    /// The EIP-712 domain, `{chainId, verifyingContract}`.
    #[must_use]
    pub fn domain(&self) -> Eip712Domain {
        Eip712Domain {
            chain_id: Some(self.chain_id),
            verifying_contract: Some(self.address),
            ..Eip712Domain::default()
        }
    }
}

/// How the Safe calls the target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operation {
    /// A regular `CALL`.
    #[default]
    Call,
    /// A `DELEGATECALL` into the target.
    DelegateCall,
}

impl Operation {
    /// The `uint8` value the Safe contract expects.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        match self {
            Self::Call => 0,
            Self::DelegateCall => 1,
        }
    }
}

/// Lifecycle of a Safe transaction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SafeTransactionStatus {
    /// No signatures yet.
    #[default]
    Draft,
    /// At least one signature, fewer than the threshold.
    CollectingSignatures,
    /// Enough owner signatures to execute.
    ReadyToExecute,
    /// Handed to the network.
    Submitted,
    /// Included on-chain and succeeded.
    Confirmed,
    /// Reverted or dropped.
    Failed,
}

impl SafeTransactionStatus {
    /// Whether the transaction has left the signing phase.
    #[must_use]
    pub const fn is_final(self) -> bool {
        matches!(self, Self::Submitted | Self::Confirmed | Self::Failed)
    }
}

impl fmt::Display for SafeTransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Draft => "draft",
            Self::CollectingSignatures => "collecting signatures",
            Self::ReadyToExecute => "ready to execute",
            Self::Submitted => "submitted",
            Self::Confirmed => "confirmed",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// A proposed Safe transaction and the owner signatures collected for it.
///
/// The signed content is fixed at construction; changing the refund
/// parameters with [`SafeTransaction::with_refund`] discards every
/// signature. Stored signatures are re-checked against the current hash
/// whenever they are counted or packed, so an entry that does not recover
/// to its owner never contributes to the threshold.
///
/// When read back from JSON the status is not taken from the input: it
/// starts as [`SafeTransactionStatus::Draft`] until
/// [`SafeTransaction::verify_signatures`] recomputes it from the signatures
/// that verify.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SafeTransaction {
    to: Address,
    value: U256,
    #[serde(with = "hex_data")]
    data: Vec<u8>,
    operation: Operation,
    safe_tx_gas: U256,
    base_gas: U256,
    gas_price: U256,
    gas_token: Address,
    refund_receiver: Address,
    nonce: u64,
    signatures: BTreeMap<Address, Signature>,
    #[serde(skip_deserializing)]
    status: SafeTransactionStatus,
}

mod hex_data {
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub(super) fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("0x{}", hex::encode(bytes)))
    }

    pub(super) fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        hex::decode(s.strip_prefix("0x").unwrap_or(&s)).map_err(de::Error::custom)
    }
}

impl SafeTransaction {
    /// Creates a draft transaction with no refund parameters.
    #[must_use]
    pub fn new(to: Address, value: U256, data: Vec<u8>, operation: Operation, nonce: u64) -> Self {
        Self {
            to,
            value,
            data,
            operation,
            safe_tx_gas: U256::ZERO,
            base_gas: U256::ZERO,
            gas_price: U256::ZERO,
            gas_token: Address::zero(),
            refund_receiver: Address::zero(),
            nonce,
            signatures: BTreeMap::new(),
            status: SafeTransactionStatus::Draft,
        }
    }

    /// Sets the gas refund parameters, discarding any collected signatures.
    #[must_use]
    pub fn with_refund(
        mut self,
        safe_tx_gas: U256,
        base_gas: U256,
        gas_price: U256,
        gas_token: Address,
        refund_receiver: Address,
    ) -> Self {
        self.safe_tx_gas = safe_tx_gas;
        self.base_gas = base_gas;
        self.gas_price = gas_price;
        self.gas_token = gas_token;
        self.refund_receiver = refund_receiver;
        self.signatures.clear();
        self.status = SafeTransactionStatus::Draft;
        self
    }

    /// The call target.
    #[must_use]
    pub const fn to(&self) -> Address {
        self.to
    }

    /// Wei sent with the call.
    #[must_use]
    pub const fn value(&self) -> U256 {
        self.value
    }

    /// Call data.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Call or delegate call.
    #[must_use]
    pub const fn operation(&self) -> Operation {
        self.operation
    }

    /// Gas forwarded to the inner call.
    #[must_use]
    pub const fn safe_tx_gas(&self) -> U256 {
        self.safe_tx_gas
    }

    /// Gas charged independently of the inner call.
    #[must_use]
    pub const fn base_gas(&self) -> U256 {
        self.base_gas
    }

    /// Gas price used for the refund.
    #[must_use]
    pub const fn gas_price(&self) -> U256 {
        self.gas_price
    }

    /// Token used for the refund, zero for ether.
    #[must_use]
    pub const fn gas_token(&self) -> Address {
        self.gas_token
    }

    /// Refund recipient, zero for `tx.origin`.
    #[must_use]
    pub const fn refund_receiver(&self) -> Address {
        self.refund_receiver
    }

    /// The Safe nonce this transaction consumes.
    #[must_use]
    pub const fn nonce(&self) -> u64 {
        self.nonce
    }

    /// The current lifecycle state.
    #[must_use]
    pub const fn status(&self) -> SafeTransactionStatus {
        self.status
    }

    /// The collected signatures, in ascending signer order.
    #[must_use]
    pub const fn signatures(&self) -> &BTreeMap<Address, Signature> {
        &self.signatures
    }

    /// The number of distinct owner signatures.
    #[must_use]
    pub fn signature_count(&self) -> usize {
        self.signatures.len()
    }

    /// Builds the EIP-712 typed data the owners sign.
    #[must_use]
    pub fn to_typed_data(&self, safe: &SafeInfo) -> TypedData {
        let message = json!({
            "to": self.to.to_hex(),
            "value": self.value.to_string(),
            "data": format!("0x{}", hex::encode(&self.data)),
            "operation": self.operation.as_u8(),
            "safeTxGas": self.safe_tx_gas.to_string(),
            "baseGas": self.base_gas.to_string(),
            "gasPrice": self.gas_price.to_string(),
            "gasToken": self.gas_token.to_hex(),
            "refundReceiver": self.refund_receiver.to_hex(),
            "nonce": self.nonce,
        });
        TypedData::from_parts(safe.domain(), safe_tx_types(), SAFE_TX_TYPE, message)
    }

    /// The EIP-712 hash owners sign, as computed by `getTransactionHash`.
    ///
    /// # Errors
    ///
    /// Propagates typed data encoding errors.
    pub fn safe_tx_hash(&self, safe: &SafeInfo) -> Result<B256> {
        self.to_typed_data(safe).signing_hash()
    }

    /// Adds an owner signature over [`SafeTransaction::safe_tx_hash`].
    ///
    /// The signer is recovered from the signature; a repeat signature from
    /// an owner whose stored signature still verifies is ignored. Returns
    /// the signer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSafeState`] once the transaction has been
    /// submitted, [`Error::InvalidSignature`] if recovery fails, or
    /// [`Error::NotSafeOwner`] if the signer is not an owner.
    pub fn add_signature(&mut self, safe: &SafeInfo, signature: Signature) -> Result<Address> {
        if self.status.is_final() {
            return Err(Error::InvalidSafeState(format!(
                "cannot sign a transaction that is {}",
                self.status
            )));
        }

        let hash = self.safe_tx_hash(safe)?;
        let signer = crypto::recover_address(&hash, &signature)?;
        if !safe.is_owner(&signer) {
            return Err(Error::NotSafeOwner(signer.inner()));
        }

        let already_signed = self
            .signatures
            .get(&signer)
            .is_some_and(|existing| signs_as(&hash, safe, &signer, existing));
        if already_signed {
            debug!(safe = %safe.address, %signer, "duplicate owner signature ignored");
        } else {
            self.signatures.insert(signer, signature);
            info!(
                safe = %safe.address,
                %signer,
                signatures = self.signatures.len(),
                threshold = safe.threshold,
                "owner signature added"
            );
        }

        self.refresh_status(safe, &hash);
        Ok(signer)
    }

    /// Drops every stored signature that does not recover to its owner over
    /// the current hash, then recomputes the status. Returns the number of
    /// signatures dropped.
    ///
    /// # Errors
    ///
    /// Propagates typed data encoding errors.
    pub fn verify_signatures(&mut self, safe: &SafeInfo) -> Result<usize> {
        let hash = self.safe_tx_hash(safe)?;
        let before = self.signatures.len();
        self.signatures
            .retain(|signer, signature| signs_as(&hash, safe, signer, signature));

        let dropped = before - self.signatures.len();
        if dropped > 0 {
            warn!(safe = %safe.address, dropped, "unverifiable signatures dropped");
        }
        if !self.status.is_final() {
            self.refresh_status(safe, &hash);
        }
        Ok(dropped)
    }

    /// Whether every stored signature verifies and the threshold is met.
    #[must_use]
    pub fn is_executable(&self, safe: &SafeInfo) -> bool {
        self.execution_signatures(safe).is_ok()
    }

    /// Packs the signatures for `execTransaction`: `r || s || v` per owner,
    /// ascending by owner address, with `v = 27 + recovery_id`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSignature`] if a stored signature does not
    /// recover to its owner over the current hash, [`Error::NotSafeOwner`]
    /// if a signer has since been removed from the owner set, or
    /// [`Error::ThresholdNotMet`] if fewer than `threshold` owners have
    /// signed.
    pub fn execution_signatures(&self, safe: &SafeInfo) -> Result<Vec<u8>> {
        let hash = self.safe_tx_hash(safe)?;

        let mut packed = Vec::with_capacity(self.signatures.len() * Signature::BYTE_LEN);
        for (signer, signature) in &self.signatures {
            if !safe.is_owner(signer) {
                return Err(Error::NotSafeOwner(signer.inner()));
            }
            if !signs_as(&hash, safe, signer, signature) {
                return Err(Error::InvalidSignature(format!(
                    "signature stored for {signer} does not cover this transaction"
                )));
            }
            packed.extend_from_slice(&signature.to_legacy_bytes());
        }

        if self.signatures.len() < safe.threshold {
            return Err(Error::ThresholdNotMet {
                have: self.signatures.len(),
                need: safe.threshold,
            });
        }
        Ok(packed)
    }

    /// Records that the transaction was handed to the network.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSafeState`] if already submitted, otherwise
    /// as [`SafeTransaction::execution_signatures`].
    pub fn mark_submitted(&mut self, safe: &SafeInfo) -> Result<()> {
        if self.status.is_final() {
            return Err(Error::InvalidSafeState(format!(
                "cannot submit a transaction that is {}",
                self.status
            )));
        }
        self.execution_signatures(safe)?;
        self.transition(safe, SafeTransactionStatus::Submitted);
        Ok(())
    }

    /// Records successful on-chain execution.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSafeState`] unless the transaction is submitted.
    pub fn mark_confirmed(&mut self, safe: &SafeInfo) -> Result<()> {
        self.finish(safe, SafeTransactionStatus::Confirmed)
    }

    /// Records a revert or a dropped transaction.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSafeState`] unless the transaction is submitted.
    pub fn mark_failed(&mut self, safe: &SafeInfo) -> Result<()> {
        self.finish(safe, SafeTransactionStatus::Failed)
    }

    fn finish(&mut self, safe: &SafeInfo, outcome: SafeTransactionStatus) -> Result<()> {
        if self.status != SafeTransactionStatus::Submitted {
            return Err(Error::InvalidSafeState(format!(
                "cannot mark a transaction that is {} as {outcome}",
                self.status
            )));
        }
        self.transition(safe, outcome);
        Ok(())
    }

    fn refresh_status(&mut self, safe: &SafeInfo, hash: &B256) {
        let valid = self
            .signatures
            .iter()
            .filter(|(signer, signature)| signs_as(hash, safe, signer, signature))
            .count();
        let next = match valid {
            0 => SafeTransactionStatus::Draft,
            n if n < safe.threshold => SafeTransactionStatus::CollectingSignatures,
            _ => SafeTransactionStatus::ReadyToExecute,
        };
        if next != self.status {
            self.transition(safe, next);
        }
    }

    fn transition(&mut self, safe: &SafeInfo, next: SafeTransactionStatus) {
        info!(
            safe = %safe.address,
            nonce = self.nonce,
            from = %self.status,
            to = %next,
            "safe transaction state changed"
        );
        self.status = next;
    }
}

/// Whether `signature` is an owner signature by `signer` over `hash`.
fn signs_as(hash: &B256, safe: &SafeInfo, signer: &Address, signature: &Signature) -> bool {
    safe.is_owner(signer)
        && crypto::recover_address(hash, signature).is_ok_and(|recovered| recovered == *signer)
}

/// The `EIP712Domain` and `SafeTx` type definitions.
fn safe_tx_types() -> Types {
    let mut types = Types::new();
    types.insert(
        DOMAIN_TYPE.to_string(),
        vec![
            TypeField::new("chainId", "uint256"),
            TypeField::new("verifyingContract", "address"),
        ],
    );
    types.insert(
        SAFE_TX_TYPE.to_string(),
        vec![
            TypeField::new("to", "address"),
            TypeField::new("value", "uint256"),
            TypeField::new("data", "bytes"),
            TypeField::new("operation", "uint8"),
            TypeField::new("safeTxGas", "uint256"),
            TypeField::new("baseGas", "uint256"),
            TypeField::new("gasPrice", "uint256"),
            TypeField::new("gasToken", "address"),
            TypeField::new("refundReceiver", "address"),
            TypeField::new("nonce", "uint256"),
        ],
    );
    types
}
