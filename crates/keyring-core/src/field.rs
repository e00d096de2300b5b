//! Arithmetic over the secp256k1 scalar field.
//!
//! All values are 32-byte big-endian integers. Operations are reduced modulo
//! the curve order `n`:
//!
//! ```text
//! n = 0xFFFFFFFF_FFFFFFFF_FFFFFFFF_FFFFFFFE_BAAEDCE6_AF48A03B_BFD25E8C_D0364141
//! ```
//!
//! These helpers are used by child-key derivation (`IL + k_par mod n`) and by
//! low-S signature normalization.
//!
//! # Example
//!
//! ```
//! use evm_keyring_core::field::{add_mod_n, is_valid_scalar};
//!
//! let mut one = [0u8; 32];
//! one[31] = 1;
//! assert!(is_valid_scalar(&one));
//!
//! let two = add_mod_n(&one, &one);
//! assert_eq!(two[31], 2);
//! ```

use std::cmp::Ordering;

use alloy_primitives::U256;

/// The order of the secp256k1 curve.
const N: [u8; 32] = [
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFE,
    0xBA, 0xAE, 0xDC, 0xE6, 0xAF, 0x48, 0xA0, 0x3B, 0xBF, 0xD2, 0x5E, 0x8C, 0xD0, 0x36, 0x41, 0x41,
];

/// The order of the secp256k1 curve divided by 2 (rounded down).
const HALF_N: [u8; 32] = [
    0x7F, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0x5D, 0x57, 0x6E, 0x73, 0x57, 0xA4, 0x50, 0x1D, 0xDF, 0xE9, 0x2F, 0x46, 0x68, 0x1B, 0x20, 0xA0,
];

/// The curve order `n`.
pub const CURVE_ORDER: U256 = U256::from_be_bytes(N);

/// `n / 2`, the upper bound for a low-S signature.
pub const HALF_CURVE_ORDER: U256 = U256::from_be_bytes(HALF_N);

/// Returns `true` if `bytes` is a usable private scalar, i.e. `0 < x < n`.
#[must_use]
pub fn is_valid_scalar(bytes: &[u8; 32]) -> bool {
    let x = U256::from_be_bytes(*bytes);
    !x.is_zero() && x < CURVE_ORDER
}

/// Returns `true` if `bytes` is greater than or equal to the curve order.
#[must_use]
pub fn exceeds_order(bytes: &[u8; 32]) -> bool {
    compare_bytes(bytes, &N) != Ordering::Less
}

/// Compares two big-endian 256-bit values.
#[must_use]
pub fn compare_bytes(a: &[u8; 32], b: &[u8; 32]) -> Ordering {
    a.iter()
        .zip(b)
        .map(|(x, y)| x.cmp(y))
        .find(|ordering| ordering.is_ne())
        .unwrap_or(Ordering::Equal)
}

/// Computes `(a + b) mod n`.
///
/// The sum is computed without overflow, so inputs may be any 256-bit value.
#[must_use]
pub fn add_mod_n(a: &[u8; 32], b: &[u8; 32]) -> [u8; 32] {
    let a = U256::from_be_bytes(*a);
    let b = U256::from_be_bytes(*b);
    a.add_mod(b, CURVE_ORDER).to_be_bytes::<32>()
}

/// Computes `(n - x) mod n`.
#[must_use]
pub fn negate_mod_n(x: &[u8; 32]) -> [u8; 32] {
    let x = U256::from_be_bytes(*x).reduce_mod(CURVE_ORDER);
    if x.is_zero() {
        return [0u8; 32];
    }
    (CURVE_ORDER - x).to_be_bytes::<32>()
}

/// Returns `true` if `s` lies in the upper half of the curve order.
#[must_use]
pub fn is_high_s(s: &[u8; 32]) -> bool {
    U256::from_be_bytes(*s) > HALF_CURVE_ORDER
}

/// Normalizes a signature `s` value to low-S form.
///
/// Per BIP-62 and EIP-2, `s` must be at most `n / 2`. Returns the normalized
/// value and whether it was negated; a negated `s` flips the parity of the
/// signature's recovery id.
#[must_use]
pub fn normalize_s(s: [u8; 32]) -> ([u8; 32], bool) {
    if is_high_s(&s) {
        (negate_mod_n(&s), true)
    } else {
        (s, false)
    }
}
