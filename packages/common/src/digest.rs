//! SHA-256 digests over canonical encodings.

use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::canonical::canonical_string;

/// Length of a hex-encoded digest
pub const DIGEST_HEX_LEN: usize = 64;

/// Lowercase hex SHA-256 of raw bytes
pub fn digest_bytes(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Digest of the canonical encoding of a JSON value
pub fn digest_value(value: &Value) -> String {
    digest_bytes(canonical_string(value).as_bytes())
}

/// Whether `candidate` looks like a digest produced by this module
pub fn is_digest(candidate: &str) -> bool {
    candidate.len() == DIGEST_HEX_LEN
        && candidate
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_known_vector() {
        assert_eq!(
            digest_bytes(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_digest_value_ignores_key_order() {
        let a = json!({ "a": 1, "b": [1, 2] });
        let b: Value = serde_json::from_str(r#"{"b":[1,2],"a":1}"#).unwrap();
        assert_eq!(digest_value(&a), digest_value(&b));
        assert!(is_digest(&digest_value(&a)));
    }

    #[test]
    fn test_is_digest_rejects_uppercase_and_short() {
        assert!(!is_digest("ABC"));
        assert!(!is_digest(&"A".repeat(64)));
        assert!(is_digest(&"a".repeat(64)));
    }
}
