//! Ethereum transaction types, RLP encoding and decoding.
//!
//! This module provides types for representing Ethereum transactions and
//! generating the hash that needs to be signed. It supports:
//!
//! - **EIP-155 Legacy Transactions**: Traditional transactions with chain ID replay protection
//! - **EIP-1559 Transactions**: Type 2 transactions with priority fees and max fees
//!
//! # Signing Flow
//!
//! 1. Create a transaction with the appropriate type
//! 2. Call [`Transaction::signing_hash`] to get the hash to sign
//! 3. Sign the hash with a keyring
//! 4. Encode the signed transaction with [`Transaction::signed_rlp`]
//!
//! Both encodings can be decoded again with [`Transaction::decode_unsigned`]
//! and [`Transaction::decode_signed`]; decoding is strict and rejects
//! non-canonical integers and trailing bytes.
//!
//! # Example
//!
//! ```
//! use evm_keyring_core::{Transaction, Eip1559Transaction, Address};
//! use alloy_primitives::U256;
//!
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
//! let encoded = tx.unsigned_rlp();
//! assert_eq!(encoded[0], 0x02);
//! assert_eq!(Transaction::decode_unsigned(&encoded).unwrap(), tx);
//! ```

use alloy_primitives::{B256, U256, keccak256};
use alloy_rlp::{Decodable, Encodable, Header, RlpDecodable, RlpEncodable};
use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::crypto;
use crate::error::{Error, Result};
use crate::signature::Signature;

/// An access list entry for EIP-2930/EIP-1559 transactions.
///
/// Access lists specify which addresses and storage keys will be accessed
/// during transaction execution, potentially reducing gas costs.
#[derive(
    Debug, Clone, PartialEq, Eq, Serialize, Deserialize, RlpEncodable, RlpDecodable,
)]
#[serde(rename_all = "camelCase")]
pub struct AccessListEntry {
    /// The address being accessed.
    pub address: alloy_primitives::Address,

    /// The storage keys being accessed at this address.
    pub storage_keys: Vec<B256>,
}

/// An EIP-155 legacy transaction.
///
/// This is the traditional Ethereum transaction format with chain ID
/// replay protection as specified in [EIP-155].
///
/// [EIP-155]: https://eips.ethereum.org/EIPS/eip-155
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyTransaction {
    /// The chain ID for replay protection.
    pub chain_id: u64,

    /// The transaction nonce.
    pub nonce: u64,

    /// The gas price in wei.
    pub gas_price: U256,

    /// The gas limit.
    pub gas_limit: u64,

    /// The recipient address, or `None` for contract creation.
    pub to: Option<Address>,

    /// The value to transfer in wei.
    pub value: U256,

    /// The transaction input data.
    pub data: Vec<u8>,
}

impl LegacyTransaction {
    /// Returns the EIP-155 signing pre-image
    /// `rlp([nonce, gasPrice, gasLimit, to, value, data, chainId, 0, 0])`.
    #[must_use]
    pub fn unsigned_rlp(&self) -> Vec<u8> {
        let mut buf = Vec::new();

        encode_rlp_list(&mut buf, |buf| {
            self.encode_common_fields(buf);
            self.chain_id.encode(buf);
            0u8.encode(buf);
            0u8.encode(buf);
        });

        buf
    }

    /// Generates the signing hash for this transaction.
    ///
    /// For EIP-155 transactions, the signing hash is:
    /// `keccak256(rlp([nonce, gasPrice, gasLimit, to, value, data, chainId, 0, 0]))`
    #[must_use]
    pub fn signing_hash(&self) -> B256 {
        keccak256(self.unsigned_rlp())
    }

    /// Creates a signed transaction by combining this transaction with a signature.
    ///
    /// The signature's recovery id becomes `v = 35 + 2·chainId + recovery_id`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTransaction`] if the chain id is too large for
    /// an EIP-155 `v`.
    pub fn signed_rlp(&self, signature: &Signature) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        let v = crypto::legacy_v(signature.v(), Some(self.chain_id))?;

        // [nonce, gasPrice, gasLimit, to, value, data, v, r, s]
        encode_rlp_list(&mut buf, |buf| {
            self.encode_common_fields(buf);
            v.encode(buf);
            signature.r_u256().encode(buf);
            signature.s_u256().encode(buf);
        });

        Ok(buf)
    }

    fn encode_common_fields(&self, buf: &mut Vec<u8>) {
        self.nonce.encode(buf);
        self.gas_price.encode(buf);
        self.gas_limit.encode(buf);
        encode_optional_address(self.to.as_ref(), buf);
        self.value.encode(buf);
        self.data.as_slice().encode(buf);
    }

    fn decode_common_fields(buf: &mut &[u8], chain_id: u64) -> Result<Self> {
        Ok(Self {
            chain_id,
            nonce: u64::decode(buf)?,
            gas_price: U256::decode(buf)?,
            gas_limit: u64::decode(buf)?,
            to: decode_optional_address(buf)?,
            value: U256::decode(buf)?,
            data: decode_bytes(buf)?,
        })
    }

    fn decode_unsigned_fields(buf: &mut &[u8]) -> Result<Self> {
        let mut payload = decode_list(buf)?;
        let mut tx = Self::decode_common_fields(&mut payload, 0)?;
        tx.chain_id = u64::decode(&mut payload)?;

        if u64::decode(&mut payload)? != 0 || u64::decode(&mut payload)? != 0 {
            return Err(Error::InvalidTransaction(
                "EIP-155 pre-image must end with 0, 0".to_string(),
            ));
        }
        ensure_consumed(payload, "legacy transaction")?;

        Ok(tx)
    }

    fn decode_signed_fields(buf: &mut &[u8]) -> Result<(Self, Signature)> {
        let mut payload = decode_list(buf)?;
        let mut tx = Self::decode_common_fields(&mut payload, 0)?;

        let v = u64::decode(&mut payload)?;
        let r = U256::decode(&mut payload)?;
        let s = U256::decode(&mut payload)?;
        ensure_consumed(payload, "legacy transaction")?;

        let (chain_id, recovery_id) = crypto::split_eip155_v(v)?;
        tx.chain_id = chain_id;

        Ok((tx, Signature::new(r.to_be_bytes(), s.to_be_bytes(), recovery_id)?))
    }
}

/// An EIP-1559 (Type 2) transaction.
///
/// This transaction type introduces:
///
/// - Base fee burning
/// - Priority fee (tip) for miners/validators
/// - More predictable gas pricing
///
/// See [EIP-1559] for details.
///
/// [EIP-1559]: https://eips.ethereum.org/EIPS/eip-1559
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Eip1559Transaction {
    /// The chain ID.
    pub chain_id: u64,

    /// The transaction nonce.
    pub nonce: u64,

    /// The maximum priority fee per gas (tip).
    pub max_priority_fee_per_gas: U256,

    /// The maximum total fee per gas.
    pub max_fee_per_gas: U256,

    /// The gas limit.
    pub gas_limit: u64,

    /// The recipient address, or `None` for contract creation.
    pub to: Option<Address>,

    /// The value to transfer in wei.
    pub value: U256,

    /// The transaction input data.
    pub data: Vec<u8>,

    /// The access list.
    #[serde(default)]
    pub access_list: Vec<AccessListEntry>,
}

impl Eip1559Transaction {
    /// The transaction type identifier for EIP-1559.
    pub const TX_TYPE: u8 = 0x02;

    /// Returns the signing pre-image
    /// `0x02 || rlp([chainId, nonce, maxPriorityFeePerGas, maxFeePerGas,
    /// gasLimit, to, value, data, accessList])`.
    #[must_use]
    pub fn unsigned_rlp(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(256);
        buf.push(Self::TX_TYPE);

        encode_rlp_list(&mut buf, |buf| self.encode_fields(buf));

        buf
    }

    /// Generates the signing hash for this transaction.
    #[must_use]
    pub fn signing_hash(&self) -> B256 {
        keccak256(self.unsigned_rlp())
    }

    /// Creates a signed transaction by combining this transaction with a signature.
    ///
    /// The recovery id is encoded as-is (`0` or `1`).
    #[must_use]
    pub fn signed_rlp(&self, signature: &Signature) -> Vec<u8> {
        let mut buf = Vec::with_capacity(256);
        buf.push(Self::TX_TYPE);

        encode_rlp_list(&mut buf, |buf| {
            self.encode_fields(buf);
            signature.v().encode(buf);
            signature.r_u256().encode(buf);
            signature.s_u256().encode(buf);
        });

        buf
    }

    fn encode_fields(&self, buf: &mut Vec<u8>) {
        self.chain_id.encode(buf);
        self.nonce.encode(buf);
        self.max_priority_fee_per_gas.encode(buf);
        self.max_fee_per_gas.encode(buf);
        self.gas_limit.encode(buf);
        encode_optional_address(self.to.as_ref(), buf);
        self.value.encode(buf);
        self.data.as_slice().encode(buf);
        self.access_list.encode(buf);
    }

    fn decode_fields(buf: &mut &[u8]) -> Result<Self> {
        Ok(Self {
            chain_id: u64::decode(buf)?,
            nonce: u64::decode(buf)?,
            max_priority_fee_per_gas: U256::decode(buf)?,
            max_fee_per_gas: U256::decode(buf)?,
            gas_limit: u64::decode(buf)?,
            to: decode_optional_address(buf)?,
            value: U256::decode(buf)?,
            data: decode_bytes(buf)?,
            access_list: Vec::<AccessListEntry>::decode(buf)?,
        })
    }

    fn decode_unsigned_fields(buf: &mut &[u8]) -> Result<Self> {
        let mut payload = decode_list(buf)?;
        let tx = Self::decode_fields(&mut payload)?;
        ensure_consumed(payload, "EIP-1559 transaction")?;
        Ok(tx)
    }

    fn decode_signed_fields(buf: &mut &[u8]) -> Result<(Self, Signature)> {
        let mut payload = decode_list(buf)?;
        let tx = Self::decode_fields(&mut payload)?;

        let y_parity = u64::decode(&mut payload)?;
        let r = U256::decode(&mut payload)?;
        let s = U256::decode(&mut payload)?;
        ensure_consumed(payload, "EIP-1559 transaction")?;

        let recovery_id = match y_parity {
            0 => 0,
            1 => 1,
            other => {
                return Err(Error::InvalidTransaction(format!(
                    "y parity must be 0 or 1, got {other}"
                )));
            }
        };

        Ok((tx, Signature::new(r.to_be_bytes(), s.to_be_bytes(), recovery_id)?))
    }
}

/// Encodes an RLP list using a closure to write elements.
fn encode_rlp_list<F>(out: &mut Vec<u8>, f: F)
where
    F: FnOnce(&mut Vec<u8>),
{
    let mut content = Vec::new();
    f(&mut content);

    let header = Header {
        list: true,
        payload_length: content.len(),
    };
    header.encode(out);
    out.extend_from_slice(&content);
}

/// Encodes an optional address; contract creation is the empty string.
fn encode_optional_address(addr: Option<&Address>, out: &mut Vec<u8>) {
    match addr {
        Some(a) => a.inner().encode(out),
        None => out.push(alloy_rlp::EMPTY_STRING_CODE),
    }
}

/// Reads a list header and returns its payload, advancing `buf` past it.
fn decode_list<'a>(buf: &mut &'a [u8]) -> Result<&'a [u8]> {
    let header = Header::decode(buf)?;
    if !header.list {
        return Err(alloy_rlp::Error::UnexpectedString.into());
    }
    if header.payload_length > buf.len() {
        return Err(alloy_rlp::Error::InputTooShort.into());
    }

    let (payload, rest) = buf.split_at(header.payload_length);
    *buf = rest;
    Ok(payload)
}

fn decode_bytes(buf: &mut &[u8]) -> Result<Vec<u8>> {
    Ok(Header::decode_bytes(buf, false)?.to_vec())
}

fn decode_optional_address(buf: &mut &[u8]) -> Result<Option<Address>> {
    let bytes = Header::decode_bytes(buf, false)?;
    match bytes.len() {
        0 => Ok(None),
        Address::BYTE_LEN => {
            let mut raw = [0u8; Address::BYTE_LEN];
            raw.copy_from_slice(bytes);
            Ok(Some(Address::new(raw)))
        }
        len => Err(Error::InvalidTransaction(format!(
            "recipient must be 0 or 20 bytes, got {len}"
        ))),
    }
}

fn ensure_consumed(rest: &[u8], what: &str) -> Result<()> {
    if rest.is_empty() {
        Ok(())
    } else {
        Err(Error::InvalidTransaction(format!(
            "{} unexpected trailing bytes in {what}",
            rest.len()
        )))
    }
}

/// A unified transaction type supporting multiple formats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Transaction {
    /// EIP-155 legacy transaction.
    #[serde(rename = "legacy")]
    Legacy(LegacyTransaction),
    /// EIP-1559 (Type 2) transaction.
    #[serde(rename = "eip1559")]
    Eip1559(Eip1559Transaction),
}

impl Transaction {
    /// Returns the unsigned encoding (the signing pre-image).
    #[must_use]
    pub fn unsigned_rlp(&self) -> Vec<u8> {
        match self {
            Self::Legacy(tx) => tx.unsigned_rlp(),
            Self::Eip1559(tx) => tx.unsigned_rlp(),
        }
    }

    /// Returns the signing hash for this transaction.
    #[must_use]
    pub fn signing_hash(&self) -> B256 {
        match self {
            Self::Legacy(tx) => tx.signing_hash(),
            Self::Eip1559(tx) => tx.signing_hash(),
        }
    }

    /// Returns the chain ID for this transaction.
    #[must_use]
    pub const fn chain_id(&self) -> u64 {
        match self {
            Self::Legacy(tx) => tx.chain_id,
            Self::Eip1559(tx) => tx.chain_id,
        }
    }

    /// Creates a signed transaction by combining this transaction with a signature.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTransaction`] if a legacy chain id is too large
    /// for an EIP-155 `v`.
    pub fn signed_rlp(&self, signature: &Signature) -> Result<Vec<u8>> {
        match self {
            Self::Legacy(tx) => tx.signed_rlp(signature),
            Self::Eip1559(tx) => Ok(tx.signed_rlp(signature)),
        }
    }

    /// Returns the transaction hash, `keccak256` of the signed encoding.
    ///
    /// # Errors
    ///
    /// Same as [`Transaction::signed_rlp`].
    pub fn tx_hash(&self, signature: &Signature) -> Result<B256> {
        Ok(keccak256(self.signed_rlp(signature)?))
    }

    /// Decodes an unsigned encoding produced by [`Transaction::unsigned_rlp`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::RlpError`] for malformed or non-canonical RLP, or
    /// [`Error::InvalidTransaction`] for an unknown type byte, a wrong field
    /// count or trailing bytes.
    pub fn decode_unsigned(bytes: &[u8]) -> Result<Self> {
        let mut buf = bytes;
        let tx = match envelope_type(&mut buf)? {
            None => Self::Legacy(LegacyTransaction::decode_unsigned_fields(&mut buf)?),
            Some(_) => Self::Eip1559(Eip1559Transaction::decode_unsigned_fields(&mut buf)?),
        };
        ensure_consumed(buf, "transaction envelope")?;
        Ok(tx)
    }

    /// Decodes a signed encoding into the transaction and its signature.
    ///
    /// Legacy transactions must carry an EIP-155 `v`; the unprotected
    /// `27`/`28` form is rejected.
    ///
    /// # Errors
    ///
    /// Same as [`Transaction::decode_unsigned`].
    pub fn decode_signed(bytes: &[u8]) -> Result<(Self, Signature)> {
        let mut buf = bytes;
        let decoded = match envelope_type(&mut buf)? {
            None => {
                let (tx, sig) = LegacyTransaction::decode_signed_fields(&mut buf)?;
                (Self::Legacy(tx), sig)
            }
            Some(_) => {
                let (tx, sig) = Eip1559Transaction::decode_signed_fields(&mut buf)?;
                (Self::Eip1559(tx), sig)
            }
        };
        ensure_consumed(buf, "transaction envelope")?;
        Ok(decoded)
    }

    /// Parses a transaction from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::JsonError`] if parsing fails.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serializes the transaction to JSON.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::JsonError`] if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Consumes the type byte of a typed envelope. `None` means a legacy list.
fn envelope_type(buf: &mut &[u8]) -> Result<Option<u8>> {
    match buf.first() {
        None => Err(alloy_rlp::Error::InputTooShort.into()),
        Some(&b) if b >= alloy_rlp::EMPTY_LIST_CODE => Ok(None),
        Some(&Eip1559Transaction::TX_TYPE) => {
            *buf = &buf[1..];
            Ok(Some(Eip1559Transaction::TX_TYPE))
        }
        Some(&other) => Err(Error::InvalidTransaction(format!(
            "unsupported transaction type 0x{other:02x}"
        ))),
    }
}

/// A transaction together with its signature, once one exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionEnvelope {
    /// The transaction.
    pub transaction: Transaction,

    /// The signature over [`Transaction::signing_hash`], if signed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<Signature>,
}

impl TransactionEnvelope {
    /// Wraps an unsigned transaction.
    #[must_use]
    pub const fn new(transaction: Transaction) -> Self {
        Self {
            transaction,
            signature: None,
        }
    }

    /// Attaches a signature.
    #[must_use]
    pub const fn with_signature(mut self, signature: Signature) -> Self {
        self.signature = Some(signature);
        self
    }

    /// Whether a signature is attached.
    #[must_use]
    pub const fn is_signed(&self) -> bool {
        self.signature.is_some()
    }

    /// Returns the signed encoding.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TransactionNotSigned`] if no signature is attached.
    pub fn encode_signed(&self) -> Result<Vec<u8>> {
        encode_signed_transaction(&self.transaction, self.signature.as_ref())
    }

    /// Returns the transaction hash.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TransactionNotSigned`] if no signature is attached.
    pub fn tx_hash(&self) -> Result<B256> {
        let signature = self.signature.as_ref().ok_or(Error::TransactionNotSigned)?;
        self.transaction.tx_hash(signature)
    }

    /// Decodes a signed encoding into an envelope.
    ///
    /// # Errors
    ///
    /// Same as [`Transaction::decode_signed`].
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let (transaction, signature) = Transaction::decode_signed(bytes)?;
        Ok(Self::new(transaction).with_signature(signature))
    }
}

/// Returns the unsigned encoding of `tx`.
#[must_use]
pub fn encode_unsigned_transaction(tx: &Transaction) -> Vec<u8> {
    tx.unsigned_rlp()
}

/// Returns the signed encoding of `tx`.
///
/// # Errors
///
/// Returns [`Error::TransactionNotSigned`] if `signature` is `None`.
pub fn encode_signed_transaction(
    tx: &Transaction,
    signature: Option<&Signature>,
) -> Result<Vec<u8>> {
    let signature = signature.ok_or(Error::TransactionNotSigned)?;
    tx.signed_rlp(signature)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{recover_address, sign_hash};

    /// The example transaction from EIP-155.
    fn eip155_example() -> LegacyTransaction {
        LegacyTransaction {
            chain_id: 1,
            nonce: 9,
            gas_price: U256::from(20_000_000_000u64),
            gas_limit: 21000,
            to: Some(Address::new([0x35; 20])),
            value: U256::from(1_000_000_000_000_000_000u128),
            data: vec![],
        }
    }

    fn sample_eip1559() -> Eip1559Transaction {
        Eip1559Transaction {
            chain_id: 1,
            nonce: 42,
            max_priority_fee_per_gas: U256::from(1_000_000_000u64),
            max_fee_per_gas: U256::from(100_000_000_000u64),
            gas_limit: 21000,
            to: Some(Address::zero()),
            value: U256::from(1_000_000_000_000_000_000u128),
            data: vec![0xde, 0xad, 0xbe, 0xef],
            access_list: vec![],
        }
    }

    #[test]
    fn eip155_preimage_and_hash() {
        let tx = eip155_example();
        assert_eq!(
            hex::encode(tx.unsigned_rlp()),
            "ec098504a817c800825208943535353535353535353535353535353535353535880de0b6b3a764000080018080"
        );
        assert_eq!(
            tx.signing_hash().to_string(),
            "0xdaf5a779ae972f972197303d7b574746c7ef83eadac0f2791ad23db92e4c8e53"
        );
    }

    #[test]
    fn eip155_signed_transaction() {
        let tx = eip155_example();
        let key = [0x46u8; 32];
        let sig = sign_hash(&tx.signing_hash(), &key).unwrap();

        let signed = tx.signed_rlp(&sig).unwrap();
        assert_eq!(
            hex::encode(&signed),
            "f86c098504a817c800825208943535353535353535353535353535353535353535880de0b6b3a7640000\
             8025a028ef61340bd939bc2195fe537567866003e1a15d3c71ff63e1590620aa636276a067cbe9d899\
             7f761aecb703304b3800ccf555c9f3dc64214b297fb1966a3b6d83"
        );

        let (decoded, decoded_sig) = Transaction::decode_signed(&signed).unwrap();
        assert_eq!(decoded, Transaction::Legacy(tx));
        assert_eq!(decoded_sig, sig);
    }

    #[test]
    fn eip1559_sign_and_decode() {
        let tx = Transaction::Eip1559(sample_eip1559());
        let key = [0x46u8; 32];
        let sig = sign_hash(&tx.signing_hash(), &key).unwrap();

        let signed = tx.signed_rlp(&sig).unwrap();
        assert_eq!(signed[0], Eip1559Transaction::TX_TYPE);

        let (decoded, decoded_sig) = Transaction::decode_signed(&signed).unwrap();
        assert_eq!(decoded, tx);
        assert_eq!(decoded_sig, sig);

        let signer = crate::crypto::public_key_from_private(&key).unwrap();
        assert_eq!(
            recover_address(&decoded.signing_hash(), &decoded_sig).unwrap(),
            Address::from_public_key(&signer)
        );
    }

    #[test]
    fn zero_fields_encode_as_empty_strings() {
        let tx = LegacyTransaction {
            chain_id: 1,
            nonce: 0,
            gas_price: U256::ZERO,
            gas_limit: 0,
            to: None,
            value: U256::ZERO,
            data: vec![],
        };
        // [0x80 x6, 0x01, 0x80, 0x80]
        assert_eq!(hex::encode(tx.unsigned_rlp()), "c9808080808080018080");
    }

    #[test]
    fn unsigned_roundtrip_contract_creation() {
        let legacy = Transaction::Legacy(LegacyTransaction {
            chain_id: 137,
            nonce: 0,
            gas_price: U256::from(20_000_000_000u64),
            gas_limit: 100_000,
            to: None,
            value: U256::ZERO,
            data: vec![0x60, 0x80, 0x60, 0x40],
        });
        let encoded = encode_unsigned_transaction(&legacy);
        assert_eq!(Transaction::decode_unsigned(&encoded).unwrap(), legacy);

        let mut eip1559 = sample_eip1559();
        eip1559.to = None;
        eip1559.access_list = vec![AccessListEntry {
            address: alloy_primitives::Address::repeat_byte(0x11),
            storage_keys: vec![B256::ZERO, B256::repeat_byte(0x01)],
        }];
        let eip1559 = Transaction::Eip1559(eip1559);
        let encoded = encode_unsigned_transaction(&eip1559);
        assert_eq!(Transaction::decode_unsigned(&encoded).unwrap(), eip1559);
    }

    #[test]
    fn legacy_and_typed_hashes_differ() {
        let legacy = Transaction::Legacy(eip155_example());
        let typed = Transaction::Eip1559(sample_eip1559());
        assert_ne!(legacy.signing_hash(), typed.signing_hash());
    }

    #[test]
    fn transaction_chain_id() {
        let legacy = Transaction::Legacy(LegacyTransaction {
            chain_id: 137,
            ..eip155_example()
        });
        let eip1559 = Transaction::Eip1559(Eip1559Transaction {
            chain_id: 42161,
            ..sample_eip1559()
        });

        assert_eq!(legacy.chain_id(), 137);
        assert_eq!(eip1559.chain_id(), 42161);
    }

    #[test]
    fn transaction_json_roundtrip() {
        let original = Transaction::Eip1559(sample_eip1559());
        let json = original.to_json().unwrap();
        assert!(json.contains("\"type\":\"eip1559\""));
        assert_eq!(Transaction::from_json(&json).unwrap(), original);
    }

    #[test]
    fn rejects_trailing_bytes() {
        let mut encoded = eip155_example().unsigned_rlp();
        encoded.push(0x00);
        assert!(matches!(
            Transaction::decode_unsigned(&encoded),
            Err(Error::InvalidTransaction(_))
        ));
    }

    #[test]
    fn rejects_non_canonical_integer() {
        // nonce 9 encoded as the string 0x81 0x09
        let mut encoded = eip155_example().unsigned_rlp();
        encoded[0] += 1;
        encoded.splice(1..2, [0x81, 0x09]);
        assert!(matches!(
            Transaction::decode_unsigned(&encoded),
            Err(Error::RlpError(_))
        ));
    }

    #[test]
    fn rejects_unknown_type_and_empty_input() {
        assert!(matches!(
            Transaction::decode_unsigned(&[0x01, 0xc0]),
            Err(Error::InvalidTransaction(_))
        ));
        assert!(matches!(
            Transaction::decode_unsigned(&[]),
            Err(Error::RlpError(_))
        ));
    }

    #[test]
    fn rejects_unprotected_legacy_v() {
        let tx = eip155_example();
        let mut buf = Vec::new();
        encode_rlp_list(&mut buf, |buf| {
            tx.encode_common_fields(buf);
            27u64.encode(buf);
            U256::from(1).encode(buf);
            U256::from(1).encode(buf);
        });
        assert!(matches!(
            Transaction::decode_signed(&buf),
            Err(Error::InvalidTransaction(_))
        ));
    }

    #[test]
    fn envelope_requires_signature() {
        let envelope = TransactionEnvelope::new(Transaction::Legacy(eip155_example()));
        assert!(!envelope.is_signed());
        assert!(matches!(
            envelope.encode_signed(),
            Err(Error::TransactionNotSigned)
        ));
        assert!(matches!(envelope.tx_hash(), Err(Error::TransactionNotSigned)));
        assert!(matches!(
            encode_signed_transaction(&envelope.transaction, None),
            Err(Error::TransactionNotSigned)
        ));
    }

    #[test]
    fn envelope_roundtrip_and_tx_hash() {
        let tx = Transaction::Legacy(eip155_example());
        let sig = sign_hash(&tx.signing_hash(), &[0x46u8; 32]).unwrap();
        let envelope = TransactionEnvelope::new(tx).with_signature(sig);

        let encoded = envelope.encode_signed().unwrap();
        assert_eq!(envelope.tx_hash().unwrap(), keccak256(&encoded));
        assert_eq!(TransactionEnvelope::decode(&encoded).unwrap(), envelope);
    }
}
