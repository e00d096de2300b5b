//! Recoverable secp256k1 ECDSA over 32-byte digests.
//!
//! This module is the signing engine shared by every keyring variant:
//!
//! - Signing with RFC 6979 deterministic nonces
//! - Low-S normalization (EIP-2) with recovery parity adjustment
//! - Public key and address recovery
//! - The `v` conventions used on the wire
//!
//! The underlying curve implementation holds no shared state, so any number
//! of threads may sign concurrently.
//!
//! # Example
//!
//! ```
//! use alloy_primitives::B256;
//! use evm_keyring_core::crypto::{recover_address, sign_hash};
//! use evm_keyring_core::Address;
//!
//! let key =
//!     hex::decode("ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80").unwrap();
//! let hash = B256::repeat_byte(0x42);
//!
//! let sig = sign_hash(&hash, &key).unwrap();
//! assert!(sig.is_low_s());
//!
//! let signer: Address = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266".parse().unwrap();
//! assert_eq!(recover_address(&hash, &sig).unwrap(), signer);
//! ```

use alloy_primitives::B256;
use k256::ecdsa::signature::hazmat::PrehashVerifier;
use k256::ecdsa::{RecoveryId, Signature as K256Signature, SigningKey, VerifyingKey};

use crate::address::Address;
use crate::error::{Error, Result};
use crate::field;
use crate::signature::Signature;

/// Offset of the EIP-155 `v` value: `v = 35 + 2·chainId + recovery_id`.
pub const EIP155_V_OFFSET: u64 = 35;

/// Signs a 32-byte digest with a raw private key.
///
/// The returned signature always has `s ≤ n/2`; when the curve library
/// produces a high `s` it is replaced by `n - s` and the recovery parity is
/// flipped so that recovery still yields the signer.
///
/// # Errors
///
/// Returns [`Error::InvalidKeyLength`] unless `private_key` is 32 bytes, or
/// [`Error::SignatureFailure`] if the key is zero, not below the curve order,
/// or signing fails.
pub fn sign_hash(hash: &B256, private_key: &[u8]) -> Result<Signature> {
    let signing_key = signing_key(private_key)?;

    let (signature, recovery_id) = signing_key
        .sign_prehash_recoverable(hash.as_slice())
        .map_err(|e| Error::SignatureFailure(e.to_string()))?;

    let (r, s) = signature.split_bytes();
    let (s, flipped) = field::normalize_s(s.into());

    let mut v = recovery_id.to_byte();
    if flipped {
        v ^= 1;
    }
    // x-reduced recovery ids (2, 3) are not representable on the wire
    if v > 1 {
        return Err(Error::SignatureFailure(format!(
            "unsupported recovery id {v}"
        )));
    }

    Signature::new(r.into(), s, v)
}

/// Derives the public key `d·G` of a raw private key.
///
/// # Errors
///
/// Same as [`sign_hash`].
pub fn public_key_from_private(private_key: &[u8]) -> Result<VerifyingKey> {
    Ok(VerifyingKey::from(&signing_key(private_key)?))
}

/// Recovers the public key that produced `signature` over `hash`.
///
/// # Errors
///
/// Returns [`Error::InvalidSignature`] if `r` or `s` is out of range, `s` is
/// in the upper half of the order, or no point can be recovered.
pub fn recover_public_key(hash: &B256, signature: &Signature) -> Result<VerifyingKey> {
    if !signature.is_low_s() {
        return Err(Error::InvalidSignature("s is not in the lower half".to_string()));
    }

    let sig = to_k256(signature)?;
    let recovery_id = RecoveryId::from_byte(signature.v())
        .ok_or_else(|| Error::InvalidSignature(format!("invalid recovery id {}", signature.v())))?;

    VerifyingKey::recover_from_prehash(hash.as_slice(), &sig, recovery_id)
        .map_err(|e| Error::InvalidSignature(format!("public key recovery failed: {e}")))
}

/// Recovers the address that produced `signature` over `hash`.
///
/// # Errors
///
/// Same as [`recover_public_key`].
pub fn recover_address(hash: &B256, signature: &Signature) -> Result<Address> {
    Ok(Address::from_public_key(&recover_public_key(hash, signature)?))
}

/// Verifies `signature` over `hash` against `public_key`.
///
/// Returns [`false`](bool) for malformed or high-S signatures.
#[must_use]
pub fn verify_signature(hash: &B256, signature: &Signature, public_key: &VerifyingKey) -> bool {
    if !signature.is_low_s() {
        return false;
    }

    match to_k256(signature) {
        Ok(sig) => public_key.verify_prehash(hash.as_slice(), &sig).is_ok(),
        Err(_) => false,
    }
}

/// Returns the wire `v` for a recovery id.
///
/// With a chain id this is the EIP-155 value `35 + 2·chainId + rid`;
/// without one it is the pre-EIP-155 (and `personal_sign`) value `27 + rid`.
///
/// # Errors
///
/// Returns [`Error::InvalidSignature`] if `recovery_id` is not `0` or `1`,
/// or [`Error::InvalidTransaction`] if the EIP-155 value overflows.
pub fn legacy_v(recovery_id: u8, chain_id: Option<u64>) -> Result<u64> {
    if recovery_id > 1 {
        return Err(Error::InvalidSignature(format!(
            "recovery id must be 0 or 1, got {recovery_id}"
        )));
    }
    let rid = u64::from(recovery_id);
    match chain_id {
        None => Ok(u64::from(Signature::LEGACY_V_OFFSET) + rid),
        Some(chain_id) => chain_id
            .checked_mul(2)
            .and_then(|v| v.checked_add(EIP155_V_OFFSET + rid))
            .ok_or_else(|| {
                Error::InvalidTransaction(format!("chain id {chain_id} is too large for EIP-155"))
            }),
    }
}

/// Splits an EIP-155 `v` into `(chain_id, recovery_id)`.
///
/// # Errors
///
/// Returns [`Error::InvalidTransaction`] for `v < 35`, which includes the
/// unprotected `27`/`28` form.
pub fn split_eip155_v(v: u64) -> Result<(u64, u8)> {
    if v < EIP155_V_OFFSET {
        return Err(Error::InvalidTransaction(format!(
            "v = {v} is not an EIP-155 value"
        )));
    }
    let rest = v - EIP155_V_OFFSET;
    // `rest % 2` is 0 or 1
    let recovery_id = u8::from(rest % 2 == 1);
    Ok((rest / 2, recovery_id))
}

fn signing_key(private_key: &[u8]) -> Result<SigningKey> {
    if private_key.len() != 32 {
        return Err(Error::InvalidKeyLength(private_key.len()));
    }
    SigningKey::from_slice(private_key).map_err(|_| {
        Error::SignatureFailure("private key is zero or exceeds the curve order".to_string())
    })
}

fn to_k256(signature: &Signature) -> Result<K256Signature> {
    K256Signature::from_slice(&signature.to_bytes()[..64])
        .map_err(|e| Error::InvalidSignature(format!("invalid signature scalars: {e}")))
}

#[cfg(test)]
mod tests {
    use alloy_primitives::keccak256;

    use super::*;

    const HARDHAT_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const HARDHAT_ADDRESS: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";

    fn hardhat_key() -> Vec<u8> {
        hex::decode(HARDHAT_KEY).unwrap()
    }

    #[test]
    fn sign_and_recover() {
        let key = hardhat_key();
        let expected: Address = HARDHAT_ADDRESS.parse().unwrap();

        for i in 0u8..32 {
            let hash = keccak256([i]);
            let sig = sign_hash(&hash, &key).unwrap();

            assert!(sig.is_low_s(), "s must be normalized for message {i}");
            assert!(sig.v() <= 1);
            assert_eq!(recover_address(&hash, &sig).unwrap(), expected);
        }
    }

    #[test]
    fn signing_is_deterministic() {
        let key = hardhat_key();
        let hash = keccak256(b"deterministic");
        assert_eq!(sign_hash(&hash, &key).unwrap(), sign_hash(&hash, &key).unwrap());
    }

    #[test]
    fn verify_against_public_key() {
        let key = hardhat_key();
        let public = public_key_from_private(&key).unwrap();
        let hash = keccak256(b"verify me");
        let sig = sign_hash(&hash, &key).unwrap();

        assert!(verify_signature(&hash, &sig, &public));
        assert!(!verify_signature(&keccak256(b"other"), &sig, &public));
    }

    #[test]
    fn high_s_is_rejected() {
        let key = hardhat_key();
        let hash = keccak256(b"malleable");
        let sig = sign_hash(&hash, &key).unwrap();

        let high = Signature::new(*sig.r(), field::negate_mod_n(sig.s()), sig.v() ^ 1).unwrap();
        let public = public_key_from_private(&key).unwrap();

        assert!(!verify_signature(&hash, &high, &public));
        assert!(matches!(
            recover_public_key(&hash, &high),
            Err(Error::InvalidSignature(_))
        ));
    }

    #[test]
    fn wrong_parity_recovers_different_address() {
        let key = hardhat_key();
        let hash = keccak256(b"parity");
        let sig = sign_hash(&hash, &key).unwrap();
        let flipped = Signature::new(*sig.r(), *sig.s(), sig.v() ^ 1).unwrap();

        let expected: Address = HARDHAT_ADDRESS.parse().unwrap();
        match recover_address(&hash, &flipped) {
            Ok(addr) => assert_ne!(addr, expected),
            Err(err) => assert!(matches!(err, Error::InvalidSignature(_))),
        }
    }

    #[test]
    fn rejects_bad_keys() {
        let hash = B256::ZERO;
        assert!(matches!(
            sign_hash(&hash, &[1u8; 31]),
            Err(Error::InvalidKeyLength(31))
        ));
        assert!(matches!(
            sign_hash(&hash, &[0u8; 32]),
            Err(Error::SignatureFailure(_))
        ));
        assert!(matches!(
            sign_hash(&hash, &[0xffu8; 32]),
            Err(Error::SignatureFailure(_))
        ));
    }

    #[test]
    fn v_conventions() {
        assert_eq!(legacy_v(0, None).unwrap(), 27);
        assert_eq!(legacy_v(1, None).unwrap(), 28);
        assert_eq!(legacy_v(0, Some(1)).unwrap(), 37);
        assert_eq!(legacy_v(1, Some(1)).unwrap(), 38);
        assert_eq!(legacy_v(1, Some(137)).unwrap(), 310);
        assert!(legacy_v(0, Some(u64::MAX)).is_err());
        assert!(matches!(legacy_v(2, Some(1)), Err(Error::InvalidSignature(_))));
        assert!(matches!(legacy_v(250, None), Err(Error::InvalidSignature(_))));

        assert_eq!(split_eip155_v(37).unwrap(), (1, 0));
        assert_eq!(split_eip155_v(310).unwrap(), (137, 1));
        assert!(matches!(
            split_eip155_v(27),
            Err(Error::InvalidTransaction(_))
        ));
    }
}
