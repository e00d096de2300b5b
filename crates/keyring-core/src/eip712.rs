//! EIP-712 typed structured data hashing.
//!
//! This module implements [EIP-712] for hashing typed structured data,
//! enabling human-readable signing of structured messages in Ethereum wallets.
//!
//! # Overview
//!
//! EIP-712 defines a standard for hashing and signing typed data, consisting of:
//!
//! 1. **Domain Separator**: Identifies the DApp and prevents replay across apps
//! 2. **Type Definitions**: Describe the structure of the data being signed
//! 3. **Message Data**: The actual data conforming to the type definitions
//!
//! # Hash Computation
//!
//! The final hash to sign is:
//! ```text
//! keccak256("\x19\x01" || domainSeparator || hashStruct(message))
//! ```
//!
//! Every field is encoded by its declared type. Values that do not match
//! their type (wrong JSON kind, out-of-range integers, wrong `bytesN` length,
//! wrong fixed array length) are errors; nothing is silently defaulted.
//!
//! # Example
//!
//! ```
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
//!     "Person": [
//!         {"name": "name", "type": "string"},
//!         {"name": "wallet", "type": "address"}
//!     ]
//! });
//!
//! let message = json!({
//!     "name": "Alice",
//!     "wallet": "0x0000000000000000000000000000000000000001"
//! });
//!
//! let typed_data = TypedData::new(domain, types, "Person", message).unwrap();
//! let hash = typed_data.signing_hash().unwrap();
//! ```
//!
//! [EIP-712]: https://eips.ethereum.org/EIPS/eip-712

use std::collections::{BTreeSet, HashMap};

use alloy_primitives::{B256, U256, keccak256};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::address::Address;
use crate::error::{Error, Result};

/// The name of the domain struct type.
pub const DOMAIN_TYPE: &str = "EIP712Domain";

/// Type definitions keyed by struct name.
pub type Types = HashMap<String, Vec<TypeField>>;

/// The EIP-712 domain separator parameters.
///
/// The domain separator is used to prevent signature replay attacks across
/// different applications.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Eip712Domain {
    /// The human-readable name of the signing domain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// The version of the signing domain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// The chain ID where signatures are valid. Accepts a number or a
    /// decimal or `0x` hex string.
    #[serde(
        default,
        deserialize_with = "chain_id::deserialize",
        skip_serializing_if = "Option::is_none"
    )]
    pub chain_id: Option<u64>,

    /// The address of the contract verifying the signature.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verifying_contract: Option<Address>,

    /// A disambiguating salt for the protocol.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salt: Option<B256>,
}

mod chain_id {
    use serde::{Deserialize, Deserializer, de};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(u64),
        String(String),
    }

    pub(super) fn deserialize<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = match Option::<NumberOrString>::deserialize(deserializer)? {
            None => return Ok(None),
            Some(NumberOrString::Number(n)) => return Ok(Some(n)),
            Some(NumberOrString::String(s)) => s,
        };

        let (digits, radix) = match s.strip_prefix("0x") {
            Some(hex_str) => (hex_str, 16),
            None => (s.as_str(), 10),
        };
        if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
            return Err(de::Error::custom(format!("invalid chain id {s:?}")));
        }
        u64::from_str_radix(digits, radix)
            .map(Some)
            .map_err(|_| de::Error::custom(format!("chain id {s} does not fit in 64 bits")))
    }
}

impl Eip712Domain {
    /// The domain fields that are set, in canonical order.
    #[must_use]
    pub fn canonical_fields(&self) -> Vec<TypeField> {
        let mut fields = Vec::with_capacity(5);
        if self.name.is_some() {
            fields.push(TypeField::new("name", "string"));
        }
        if self.version.is_some() {
            fields.push(TypeField::new("version", "string"));
        }
        if self.chain_id.is_some() {
            fields.push(TypeField::new("chainId", "uint256"));
        }
        if self.verifying_contract.is_some() {
            fields.push(TypeField::new("verifyingContract", "address"));
        }
        if self.salt.is_some() {
            fields.push(TypeField::new("salt", "bytes32"));
        }
        fields
    }

    /// Computes the domain separator over the canonical fields that are set.
    ///
    /// # Errors
    ///
    /// Returns [`Error::JsonError`] if the domain cannot be serialized.
    pub fn separator_hash(&self) -> Result<B256> {
        let types = Types::new();
        Encoder::new(&types).hash_fields(DOMAIN_TYPE, &self.canonical_fields(), &self.to_value()?)
    }

    /// Computes the domain separator using the `EIP712Domain` entry of
    /// `types` when present, otherwise the canonical fields.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTypedData`] if the entry names a field the
    /// domain does not set or declares a mismatching type.
    pub fn separator_hash_with(&self, types: &Types) -> Result<B256> {
        match types.get(DOMAIN_TYPE) {
            Some(fields) => Encoder::new(types).hash_fields(DOMAIN_TYPE, fields, &self.to_value()?),
            None => self.separator_hash(),
        }
    }

    fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }
}

/// A type field definition for EIP-712.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeField {
    /// The name of the field.
    pub name: String,

    /// The type of the field (e.g., "string", "uint256", "address").
    #[serde(rename = "type")]
    pub field_type: String,
}

impl TypeField {
    /// Creates a field definition.
    #[must_use]
    pub fn new(name: impl Into<String>, field_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_type: field_type.into(),
        }
    }
}

/// Typed structured data for EIP-712 signing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypedData {
    /// The EIP-712 domain.
    pub domain: Eip712Domain,

    /// The type definitions.
    pub types: Types,

    /// The primary type being signed.
    pub primary_type: String,

    /// The message data.
    pub message: Value,
}

impl TypedData {
    /// Creates a new typed data instance from JSON type definitions.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTypedData`] if `types` is not an object mapping
    /// type names to arrays of `{name, type}` fields.
    pub fn new(
        domain: Eip712Domain,
        types: Value,
        primary_type: impl Into<String>,
        message: Value,
    ) -> Result<Self> {
        let types: Types = serde_json::from_value(types)
            .map_err(|e| Error::InvalidTypedData(format!("malformed type definitions: {e}")))?;
        Ok(Self::from_parts(domain, types, primary_type, message))
    }

    /// Creates a new typed data instance from parsed type definitions.
    #[must_use]
    pub fn from_parts(
        domain: Eip712Domain,
        types: Types,
        primary_type: impl Into<String>,
        message: Value,
    ) -> Self {
        Self {
            domain,
            types,
            primary_type: primary_type.into(),
            message,
        }
    }

    /// Computes the signing hash for this typed data.
    ///
    /// The hash is computed as:
    /// `keccak256("\x19\x01" || domainSeparator || hashStruct(message))`
    ///
    /// # Errors
    ///
    /// Returns [`Error::UndefinedType`] if a referenced type is not defined,
    /// or [`Error::InvalidTypedData`] if a value does not match its type.
    pub fn signing_hash(&self) -> Result<B256> {
        hash_typed_data(&self.domain, &self.primary_type, &self.types, &self.message)
    }

    /// Returns the domain separator.
    ///
    /// # Errors
    ///
    /// See [`Eip712Domain::separator_hash_with`].
    pub fn domain_separator(&self) -> Result<B256> {
        self.domain.separator_hash_with(&self.types)
    }

    /// Returns `encodeType(type_name)`: the type followed by every
    /// transitively referenced struct type, sorted by name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UndefinedType`] if `type_name` is not defined.
    pub fn encode_type(&self, type_name: &str) -> Result<String> {
        Encoder::new(&self.types).encode_type(type_name)
    }

    /// Returns `hashStruct(type_name, data)`.
    ///
    /// # Errors
    ///
    /// Same as [`TypedData::signing_hash`].
    pub fn hash_struct(&self, type_name: &str, data: &Value) -> Result<B256> {
        Encoder::new(&self.types).hash_struct(type_name, data)
    }

    /// Parses typed data from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns [`Error::JsonError`] if parsing fails.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serializes the typed data to JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Error::JsonError`] if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Computes the EIP-712 digest of `message` as `primary_type`.
///
/// # Errors
///
/// Returns [`Error::UndefinedType`] if a referenced type is not defined, or
/// [`Error::InvalidTypedData`] if a value does not match its type.
pub fn hash_typed_data(
    domain: &Eip712Domain,
    primary_type: &str,
    types: &Types,
    message: &Value,
) -> Result<B256> {
    let domain_separator = domain.separator_hash_with(types)?;
    let struct_hash = Encoder::new(types).hash_struct(primary_type, message)?;

    let mut data = [0u8; 66];
    data[0] = 0x19;
    data[1] = 0x01;
    data[2..34].copy_from_slice(domain_separator.as_slice());
    data[34..].copy_from_slice(struct_hash.as_slice());

    Ok(keccak256(data))
}

/// Encodes values against a set of type definitions.
struct Encoder<'a> {
    types: &'a Types,
}

impl<'a> Encoder<'a> {
    const fn new(types: &'a Types) -> Self {
        Self { types }
    }

    fn definition(&self, type_name: &str) -> Result<(&'a str, &'a [TypeField])> {
        self.types
            .get_key_value(type_name)
            .map(|(name, fields)| (name.as_str(), fields.as_slice()))
            .ok_or_else(|| Error::UndefinedType(type_name.to_string()))
    }

    fn encode_type(&self, type_name: &str) -> Result<String> {
        let (primary, fields) = self.definition(type_name)?;

        let mut dependencies = BTreeSet::new();
        self.collect_dependencies(primary, &mut dependencies)?;
        dependencies.remove(primary);

        let mut result = format_struct(primary, fields);
        for dependency in dependencies {
            let (_, fields) = self.definition(dependency)?;
            result.push_str(&format_struct(dependency, fields));
        }
        Ok(result)
    }

    fn collect_dependencies(
        &self,
        type_name: &'a str,
        found: &mut BTreeSet<&'a str>,
    ) -> Result<()> {
        if !found.insert(type_name) {
            return Ok(());
        }
        let (_, fields) = self.definition(type_name)?;
        for field in fields {
            let base = base_type(&field.field_type);
            if self.types.contains_key(base) {
                self.collect_dependencies(base, found)?;
            }
        }
        Ok(())
    }

    /// `hashStruct(s) = keccak256(typeHash || encodeData(s))`
    fn hash_struct(&self, type_name: &str, data: &Value) -> Result<B256> {
        let type_hash = keccak256(self.encode_type(type_name)?);
        let (_, fields) = self.definition(type_name)?;
        self.hash_with_type_hash(type_hash, fields, data)
    }

    /// Hashes a struct given an explicit field list, for the domain.
    fn hash_fields(&self, type_name: &str, fields: &[TypeField], data: &Value) -> Result<B256> {
        let type_hash = keccak256(format_struct(type_name, fields));
        self.hash_with_type_hash(type_hash, fields, data)
    }

    fn hash_with_type_hash(
        &self,
        type_hash: B256,
        fields: &[TypeField],
        data: &Value,
    ) -> Result<B256> {
        let obj = data
            .as_object()
            .ok_or_else(|| Error::InvalidTypedData(format!("expected object, got {data}")))?;

        let mut buf = Vec::with_capacity(32 * (fields.len() + 1));
        buf.extend_from_slice(type_hash.as_slice());

        for field in fields {
            let value = obj
                .get(&field.name)
                .ok_or_else(|| Error::InvalidTypedData(format!("missing field: {}", field.name)))?;
            buf.extend_from_slice(self.encode_value(&field.field_type, value)?.as_slice());
        }

        Ok(keccak256(&buf))
    }

    /// Encodes one value into its 32-byte slot.
    fn encode_value(&self, field_type: &str, value: &Value) -> Result<B256> {
        if let Some((element_type, length)) = split_array(field_type)? {
            let items = value.as_array().ok_or_else(|| {
                Error::InvalidTypedData(format!("expected array for {field_type}"))
            })?;

            if let Some(length) = length
                && items.len() != length
            {
                return Err(Error::InvalidTypedData(format!(
                    "{field_type} expects {length} elements, got {}",
                    items.len()
                )));
            }

            let mut buf = Vec::with_capacity(32 * items.len());
            for item in items {
                buf.extend_from_slice(self.encode_value(element_type, item)?.as_slice());
            }
            return Ok(keccak256(&buf));
        }

        if self.types.contains_key(field_type) {
            return self.hash_struct(field_type, value);
        }

        encode_atomic(field_type, value)
    }
}

fn format_struct(name: &str, fields: &[TypeField]) -> String {
    let members: Vec<String> = fields
        .iter()
        .map(|f| format!("{} {}", f.field_type, f.name))
        .collect();
    format!("{name}({})", members.join(","))
}

/// Strips every array suffix, `Foo[2][]` → `Foo`.
fn base_type(field_type: &str) -> &str {
    field_type.find('[').map_or(field_type, |i| &field_type[..i])
}

/// Splits the outermost array suffix: `T[]` → `(T, None)`, `T[k]` →
/// `(T, Some(k))`.
fn split_array(field_type: &str) -> Result<Option<(&str, Option<usize>)>> {
    let Some(body) = field_type.strip_suffix(']') else {
        return Ok(None);
    };
    let open = body
        .rfind('[')
        .ok_or_else(|| Error::InvalidTypedData(format!("malformed array type: {field_type}")))?;

    let (element, length) = (&body[..open], &body[open + 1..]);
    if element.is_empty() {
        return Err(Error::InvalidTypedData(format!("malformed array type: {field_type}")));
    }
    if length.is_empty() {
        return Ok(Some((element, None)));
    }
    if !length.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::InvalidTypedData(format!("malformed array length: {field_type}")));
    }
    let length = length
        .parse()
        .map_err(|_| Error::InvalidTypedData(format!("malformed array length: {field_type}")))?;
    Ok(Some((element, Some(length))))
}

/// Encodes an atomic or dynamic primitive value.
fn encode_atomic(field_type: &str, value: &Value) -> Result<B256> {
    match field_type {
        "string" => {
            let s = value
                .as_str()
                .ok_or_else(|| Error::InvalidTypedData("expected string".to_string()))?;
            Ok(keccak256(s.as_bytes()))
        }
        "bytes" => Ok(keccak256(parse_hex_bytes(value)?)),
        "bool" => {
            let b = value
                .as_bool()
                .ok_or_else(|| Error::InvalidTypedData(format!("expected bool, got {value}")))?;
            Ok(B256::with_last_byte(u8::from(b)))
        }
        "address" => {
            let s = value
                .as_str()
                .ok_or_else(|| Error::InvalidTypedData("expected address string".to_string()))?;
            Ok(parse_address(s)?.to_word())
        }
        t => {
            if let Some(size) = t.strip_prefix("bytes") {
                encode_fixed_bytes(t, size_suffix(t, size, 1, 32, 1)?, value)
            } else if let Some(bits) = t.strip_prefix("uint") {
                encode_uint(t, size_suffix(t, bits, 8, 256, 8)?, value)
            } else if let Some(bits) = t.strip_prefix("int") {
                encode_int(t, size_suffix(t, bits, 8, 256, 8)?, value)
            } else {
                Err(Error::UndefinedType(t.to_string()))
            }
        }
    }
}

/// Parses the numeric suffix of `bytesN`, `uintN` or `intN`.
fn size_suffix(
    field_type: &str,
    digits: &str,
    min: usize,
    max: usize,
    step: usize,
) -> Result<usize> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::UndefinedType(field_type.to_string()));
    }
    match digits.parse::<usize>() {
        Ok(n) if (min..=max).contains(&n) && n % step == 0 => Ok(n),
        _ => Err(Error::InvalidTypedData(format!("invalid type size: {field_type}"))),
    }
}

fn encode_fixed_bytes(field_type: &str, size: usize, value: &Value) -> Result<B256> {
    let bytes = parse_hex_bytes(value)?;
    if bytes.len() != size {
        return Err(Error::InvalidTypedData(format!(
            "{field_type} expects {size} bytes, got {}",
            bytes.len()
        )));
    }
    // Right-padded
    let mut word = B256::ZERO;
    word[..size].copy_from_slice(&bytes);
    Ok(word)
}

fn encode_uint(field_type: &str, bits: usize, value: &Value) -> Result<B256> {
    let n = parse_uint(value)?;
    if bits < 256 && n >= U256::from(1) << bits {
        return Err(Error::InvalidTypedData(format!("{n} overflows {field_type}")));
    }
    Ok(B256::from(n))
}

/// Encodes a signed integer as 256-bit two's complement.
fn encode_int(field_type: &str, bits: usize, value: &Value) -> Result<B256> {
    let (negative, magnitude) = parse_int(value)?;
    let limit = U256::from(1) << (bits - 1);

    let in_range = if negative {
        magnitude <= limit
    } else {
        magnitude < limit
    };
    if !in_range {
        return Err(Error::InvalidTypedData(format!("value out of range for {field_type}")));
    }

    let word = if negative {
        U256::ZERO.wrapping_sub(magnitude)
    } else {
        magnitude
    };
    Ok(B256::from(word))
}

/// Parses an address from a hex string, without enforcing the checksum.
fn parse_address(s: &str) -> Result<Address> {
    let hex_str = s.strip_prefix("0x").unwrap_or(s);
    let bytes = hex::decode(hex_str)
        .map_err(|e| Error::InvalidTypedData(format!("invalid address {s}: {e}")))?;
    let bytes: [u8; Address::BYTE_LEN] = bytes
        .try_into()
        .map_err(|_| Error::InvalidTypedData(format!("invalid address length: {s}")))?;
    Ok(Address::new(bytes))
}

/// Parses hex bytes.
fn parse_hex_bytes(value: &Value) -> Result<Vec<u8>> {
    let s = value
        .as_str()
        .ok_or_else(|| Error::InvalidTypedData(format!("expected hex string, got {value}")))?;
    let hex_str = s.strip_prefix("0x").unwrap_or(s);
    hex::decode(hex_str).map_err(|e| Error::InvalidTypedData(format!("invalid hex {s}: {e}")))
}

/// Parses a uint value from a JSON number, decimal string or `0x` hex string.
fn parse_uint(value: &Value) -> Result<U256> {
    if let Some(n) = value.as_u64() {
        return Ok(U256::from(n));
    }
    if let Some(s) = value.as_str() {
        return parse_uint_str(s);
    }
    Err(Error::InvalidTypedData(format!("expected uint, got {value}")))
}

/// Parses a decimal or `0x` hex string. Empty digits and separators are
/// rejected.
fn parse_uint_str(s: &str) -> Result<U256> {
    let (digits, radix) = match s.strip_prefix("0x") {
        Some(hex_str) => (hex_str, 16),
        None => (s, 10),
    };
    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return Err(Error::InvalidTypedData(format!("invalid uint: {s:?}")));
    }
    U256::from_str_radix(digits, u64::from(radix))
        .map_err(|_| Error::InvalidTypedData(format!("uint out of range: {s}")))
}

/// Parses an int value into `(is_negative, magnitude)`.
fn parse_int(value: &Value) -> Result<(bool, U256)> {
    if let Some(n) = value.as_i64() {
        return Ok((n < 0, U256::from(n.unsigned_abs())));
    }
    if let Some(s) = value.as_str() {
        return match s.strip_prefix('-') {
            Some(rest) => Ok((true, parse_uint_str(rest)?)),
            None => Ok((false, parse_uint_str(s)?)),
        };
    }
    Err(Error::InvalidTypedData(format!("expected int, got {value}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn mail_domain() -> Eip712Domain {
        Eip712Domain {
            name: Some("Ether Mail".to_string()),
            version: Some("1".to_string()),
            chain_id: Some(1),
            verifying_contract: Some(
                "0xCcCCccccCCCCcCCCCCCcCcCccCcCCCcCcccccccC".parse().unwrap(),
            ),
            salt: None,
        }
    }

    fn mail_typed_data() -> TypedData {
        let types = json!({
            "EIP712Domain": [
                {"name": "name", "type": "string"},
                {"name": "version", "type": "string"},
                {"name": "chainId", "type": "uint256"},
                {"name": "verifyingContract", "type": "address"}
            ],
            "Person": [
                {"name": "name", "type": "string"},
                {"name": "wallet", "type": "address"}
            ],
            "Mail": [
                {"name": "from", "type": "Person"},
                {"name": "to", "type": "Person"},
                {"name": "contents", "type": "string"}
            ]
        });
        let message = json!({
            "from": {"name": "Cow", "wallet": "0xCD2a3d9F938E13CD947Ec05AbC7FE734Df8DD826"},
            "to": {"name": "Bob", "wallet": "0xbBbBBBBbbBBBbbbBbbBbbbbBBbBbbbbBbBbbBBbB"},
            "contents": "Hello, Bob!"
        });
        TypedData::new(mail_domain(), types, "Mail", message).unwrap()
    }

    fn simple(types: Value, primary: &str, message: Value) -> TypedData {
        TypedData::new(Eip712Domain::default(), types, primary, message).unwrap()
    }

    #[test]
    fn mail_example_vectors() {
        let typed_data = mail_typed_data();

        assert_eq!(
            typed_data.encode_type("Mail").unwrap(),
            "Mail(Person from,Person to,string contents)Person(string name,address wallet)"
        );
        assert_eq!(
            keccak256(typed_data.encode_type("Mail").unwrap()).to_string(),
            "0xa0cedeb2dc280ba39b857546d74f5549c3a1d7bdc2dd96bf881f76108e23dac2"
        );
        assert_eq!(
            typed_data.domain_separator().unwrap().to_string(),
            "0xf2cee375fa42b42143804025fc449deafd50cc031ca257e0b194a650a912090f"
        );
        assert_eq!(
            typed_data
                .hash_struct("Mail", &typed_data.message)
                .unwrap()
                .to_string(),
            "0xc52c0ee5d84264471806290a3f2c4cecfc5490626bf912d01f240d7a274b371e"
        );
        assert_eq!(
            typed_data.signing_hash().unwrap().to_string(),
            "0xbe609aee343fb3c4b28e1df9e632fca64fcfaede20f02e86244efddf30957bd2"
        );
    }

    #[test]
    fn canonical_domain_matches_explicit_entry() {
        let typed_data = mail_typed_data();
        assert_eq!(
            typed_data.domain.separator_hash().unwrap(),
            typed_data.domain_separator().unwrap()
        );
    }

    #[test]
    fn domain_entry_requires_values() {
        let mut typed_data = mail_typed_data();
        typed_data.domain.verifying_contract = None;
        assert!(matches!(
            typed_data.signing_hash(),
            Err(Error::InvalidTypedData(_))
        ));
    }

    #[test]
    fn encode_type_collects_transitive_references() {
        let types = json!({
            "Top": [{"name": "middle", "type": "Middle[]"}],
            "Middle": [{"name": "leaf", "type": "Leaf"}, {"name": "back", "type": "Top[2]"}],
            "Leaf": [{"name": "value", "type": "uint256"}],
            "Unused": [{"name": "x", "type": "bool"}]
        });
        let typed_data = simple(types, "Top", json!({}));

        assert_eq!(
            typed_data.encode_type("Top").unwrap(),
            "Top(Middle[] middle)Leaf(uint256 value)Middle(Leaf leaf,Top[2] back)"
        );
    }

    #[test]
    fn fixed_arrays_check_length() {
        let types = json!({"Pair": [{"name": "values", "type": "uint8[2]"}]});

        let ok = simple(types.clone(), "Pair", json!({"values": [1, 2]}));
        let mut expected = Vec::new();
        expected.extend_from_slice(B256::with_last_byte(1).as_slice());
        expected.extend_from_slice(B256::with_last_byte(2).as_slice());
        let type_hash = keccak256("Pair(uint8[2] values)");
        let mut preimage = type_hash.to_vec();
        preimage.extend_from_slice(keccak256(&expected).as_slice());
        assert_eq!(ok.hash_struct("Pair", &ok.message).unwrap(), keccak256(&preimage));

        let short = simple(types, "Pair", json!({"values": [1]}));
        assert!(matches!(
            short.signing_hash(),
            Err(Error::InvalidTypedData(_))
        ));
    }

    #[test]
    fn signed_integers_use_twos_complement() {
        assert_eq!(encode_atomic("int8", &json!(-1)).unwrap(), B256::repeat_byte(0xff));
        assert_eq!(encode_atomic("int256", &json!("-2")).unwrap(), {
            let mut word = B256::repeat_byte(0xff);
            word[31] = 0xfe;
            word
        });
        assert_eq!(encode_atomic("int8", &json!(-128)).unwrap()[0], 0xff);
        assert!(encode_atomic("int8", &json!(127)).is_ok());
        assert!(encode_atomic("int8", &json!(128)).is_err());
        assert!(encode_atomic("int8", &json!(-129)).is_err());
    }

    #[test]
    fn unsigned_integer_ranges() {
        assert_eq!(
            encode_atomic("uint8", &json!(255)).unwrap(),
            B256::with_last_byte(255)
        );
        assert_eq!(
            encode_atomic("uint256", &json!("0x10")).unwrap(),
            B256::with_last_byte(16)
        );
        assert!(matches!(
            encode_atomic("uint8", &json!(256)),
            Err(Error::InvalidTypedData(_))
        ));
        assert!(matches!(
            encode_atomic("uint256", &json!(-1)),
            Err(Error::InvalidTypedData(_))
        ));
        assert!(matches!(
            encode_atomic("uint7", &json!(1)),
            Err(Error::InvalidTypedData(_))
        ));
    }

    #[test]
    fn fixed_bytes_are_right_padded() {
        let word = encode_atomic("bytes2", &json!("0xabcd")).unwrap();
        assert_eq!(&word[..2], &[0xab, 0xcd]);
        assert!(word[2..].iter().all(|&b| b == 0));

        assert!(encode_atomic("bytes2", &json!("0xab")).is_err());
        assert!(encode_atomic("bytes33", &json!("0x00")).is_err());
    }

    #[test]
    fn dynamic_values_are_hashed() {
        assert_eq!(
            encode_atomic("string", &json!("hello")).unwrap(),
            keccak256("hello")
        );
        assert_eq!(
            encode_atomic("bytes", &json!("0xdeadbeef")).unwrap(),
            keccak256([0xde, 0xad, 0xbe, 0xef])
        );
        assert_eq!(
            encode_atomic("bool", &json!(true)).unwrap(),
            B256::with_last_byte(1)
        );
        assert!(encode_atomic("bool", &json!("true")).is_err());
    }

    #[test]
    fn undefined_types() {
        let typed_data = simple(json!({}), "NonExistent", json!({"foo": "bar"}));
        assert!(matches!(
            typed_data.signing_hash(),
            Err(Error::UndefinedType(_))
        ));

        let typed_data = simple(
            json!({"Holder": [{"name": "item", "type": "Item"}]}),
            "Holder",
            json!({"item": {}}),
        );
        assert!(matches!(
            typed_data.signing_hash(),
            Err(Error::UndefinedType(_))
        ));
    }

    #[test]
    fn missing_field_is_an_error() {
        let typed_data = simple(
            json!({"Person": [{"name": "name", "type": "string"}]}),
            "Person",
            json!({}),
        );
        assert!(matches!(
            typed_data.signing_hash(),
            Err(Error::InvalidTypedData(_))
        ));
    }

    #[test]
    fn malformed_types_are_rejected() {
        let result = TypedData::new(
            Eip712Domain::default(),
            json!({"Person": [{"name": "name"}]}),
            "Person",
            json!({}),
        );
        assert!(matches!(result, Err(Error::InvalidTypedData(_))));
    }

    #[test]
    fn typed_data_json_roundtrip() {
        let original = mail_typed_data();
        let json = original.to_json().unwrap();
        let recovered = TypedData::from_json(&json).unwrap();

        assert_eq!(
            original.signing_hash().unwrap(),
            recovered.signing_hash().unwrap()
        );
    }

    #[test]
    fn hash_typed_data_matches_method() {
        let typed_data = mail_typed_data();
        assert_eq!(
            hash_typed_data(
                &typed_data.domain,
                &typed_data.primary_type,
                &typed_data.types,
                &typed_data.message
            )
            .unwrap(),
            typed_data.signing_hash().unwrap()
        );
    }

    fn single_field(kind: &str, value: Value) -> Result<B256> {
        TypedData::new(
            Eip712Domain::default(),
            json!({"Amount": [{"name": "value", "type": kind}]}),
            "Amount",
            json!({"value": value}),
        )?
        .signing_hash()
    }

    #[test]
    fn uint_strings_must_be_plain_digits() {
        for bad in ["", "0x", "1_000", "+5", " 5", "0xg1", "-1"] {
            assert!(
                matches!(single_field("uint256", json!(bad)), Err(Error::InvalidTypedData(_))),
                "accepted {bad:?}"
            );
        }

        let decimal = single_field("uint256", json!("1000")).unwrap();
        assert_eq!(single_field("uint256", json!("0x3e8")).unwrap(), decimal);
        assert_eq!(single_field("uint256", json!("0x3E8")).unwrap(), decimal);
        assert_eq!(single_field("uint256", json!(1000)).unwrap(), decimal);
    }

    #[test]
    fn int_strings_must_be_plain_digits() {
        for bad in ["", "-", "0x", "-0x", "1_000", "-1_0", "--5"] {
            assert!(
                matches!(single_field("int256", json!(bad)), Err(Error::InvalidTypedData(_))),
                "accepted {bad:?}"
            );
        }

        assert_eq!(
            single_field("int256", json!("-10")).unwrap(),
            single_field("int256", json!(-10)).unwrap()
        );
    }

    #[test]
    fn domain_chain_id_accepts_numeric_strings() {
        for chain_id in [json!(1), json!("1"), json!("0x1")] {
            let domain: Eip712Domain =
                serde_json::from_value(json!({"name": "Ether Mail", "chainId": chain_id}))
                    .unwrap();
            assert_eq!(domain.chain_id, Some(1));
        }

        let domain: Eip712Domain = serde_json::from_value(json!({"chainId": null})).unwrap();
        assert_eq!(domain.chain_id, None);
        let domain: Eip712Domain = serde_json::from_value(json!({})).unwrap();
        assert_eq!(domain.chain_id, None);

        for bad in ["", "0x", "one", "1_0", "0x1ffffffffffffffff"] {
            assert!(
                serde_json::from_value::<Eip712Domain>(json!({"chainId": bad})).is_err(),
                "accepted {bad:?}"
            );
        }
    }

    #[test]
    fn typed_data_with_string_chain_id_hashes_like_number() {
        let mut json = mail_typed_data().to_json().unwrap();
        let numeric = TypedData::from_json(&json).unwrap().signing_hash().unwrap();

        json = json.replace("\"chainId\":1", "\"chainId\":\"0x1\"");
        assert!(json.contains("\"0x1\""));
        let stringly = TypedData::from_json(&json).unwrap();
        assert_eq!(stringly.signing_hash().unwrap(), numeric);
    }
}
