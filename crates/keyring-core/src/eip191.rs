//! EIP-191 `personal_sign` message hashing.

use alloy_primitives::{B256, keccak256};

/// The prefix prepended to personal messages before hashing.
pub const PERSONAL_MESSAGE_PREFIX: &[u8] = b"\x19Ethereum Signed Message:\n";

/// Hashes a message the way `personal_sign` does:
/// `keccak256("\x19Ethereum Signed Message:\n" || len(message) || message)`,
/// with the length written as an ASCII decimal.
///
/// # Example
///
/// ```
/// use evm_keyring_core::hash_personal_message;
///
/// let hash = hash_personal_message(b"hello world");
/// assert_eq!(
///     hash.to_string(),
///     "0xd9eba16ed0ecae432b71fe008c98cc872bb4cc214d3220a36f365326cf807d68"
/// );
/// ```
#[must_use]
pub fn hash_personal_message(message: &[u8]) -> B256 {
    let length = message.len().to_string();

    let mut buf = Vec::with_capacity(PERSONAL_MESSAGE_PREFIX.len() + length.len() + message.len());
    buf.extend_from_slice(PERSONAL_MESSAGE_PREFIX);
    buf.extend_from_slice(length.as_bytes());
    buf.extend_from_slice(message);

    keccak256(&buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_message() {
        assert_eq!(
            hash_personal_message(b""),
            keccak256(b"\x19Ethereum Signed Message:\n0")
        );
    }

    #[test]
    fn length_is_decimal() {
        let message = [0xabu8; 123];
        let mut expected = b"\x19Ethereum Signed Message:\n123".to_vec();
        expected.extend_from_slice(&message);
        assert_eq!(hash_personal_message(&message), keccak256(&expected));
    }

    #[test]
    fn differs_from_plain_keccak() {
        assert_ne!(hash_personal_message(b"hello"), keccak256(b"hello"));
    }
}
