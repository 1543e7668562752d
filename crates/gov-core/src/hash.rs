//! Hashing helpers shared by the audit trail (sanitized-context digest),
//! the password verifier, and the execution ledger.

use sha2::{Digest, Sha256};

/// Lowercase hex SHA-256 digest of `bytes`.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// `true` iff `s` has the exact shape of a SHA-256 hex digest: 64 lowercase
/// hex characters (§6: "The hash is always 64 lowercase hex chars; any other
/// shape fails validation with a configuration error.").
pub fn is_valid_sha256_hex(s: &str) -> bool {
    s.len() == 64 && s.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_digest() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn rejects_uppercase_and_wrong_length() {
        assert!(!is_valid_sha256_hex("ABCDEF"));
        assert!(!is_valid_sha256_hex(&"a".repeat(63)));
        assert!(is_valid_sha256_hex(&"a".repeat(64)));
    }
}
