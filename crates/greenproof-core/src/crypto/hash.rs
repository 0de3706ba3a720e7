//! Blake3 hashing and hex helpers.

use thiserror::Error;

/// Size of a Blake3 hash in bytes.
pub const HASH_SIZE: usize = 32;

/// Type alias for a 32-byte hash.
pub type Hash = [u8; HASH_SIZE];

/// The all-zero hash. Never produced by a real commitment.
pub const ZERO_HASH: Hash = [0u8; HASH_SIZE];

/// Error returned when a hex string cannot be decoded into a [`Hash`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HexError {
    /// Input length was not `2 * HASH_SIZE` characters.
    #[error("expected {expected} hex characters, got {actual}")]
    InvalidLength {
        /// Required length.
        expected: usize,
        /// Length supplied.
        actual: usize,
    },

    /// Input contained a non-hex character.
    #[error("invalid hex character at offset {offset}")]
    InvalidCharacter {
        /// Byte offset of the offending character.
        offset: usize,
    },
}

/// Hashes raw content.
#[must_use]
pub fn hash_content(content: &[u8]) -> Hash {
    *blake3::hash(content).as_bytes()
}

/// Hashes the concatenation of `parts` without separators.
#[must_use]
pub fn hash_concat(parts: &[&[u8]]) -> Hash {
    let mut hasher = blake3::Hasher::new();
    for part in parts {
        hasher.update(part);
    }
    *hasher.finalize().as_bytes()
}

/// Encodes a hash as lowercase hex.
#[must_use]
pub fn hex_encode(hash: &Hash) -> String {
    hex::encode(hash)
}

/// Decodes a 64-character hex string into a [`Hash`].
///
/// # Errors
///
/// Returns [`HexError`] on a length mismatch or a non-hex character.
pub fn parse_hex(input: &str) -> Result<Hash, HexError> {
    let mut out = ZERO_HASH;
    hex::decode_to_slice(input, &mut out).map_err(|e| match e {
        hex::FromHexError::InvalidHexCharacter { index, .. } => {
            HexError::InvalidCharacter { offset: index }
        },
        _ => {
            HexError::InvalidLength {
                expected: HASH_SIZE * 2,
                actual: input.len(),
            }
        },
    })?;
    Ok(out)
}

/// Serde adapter that writes a [`Hash`] as a hex string.
pub mod serde_hex {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::{Hash, hex_encode, parse_hex};

    /// Serializes a hash as lowercase hex.
    ///
    /// # Errors
    ///
    /// Propagates serializer errors.
    pub fn serialize<S>(hash: &Hash, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex_encode(hash))
    }

    /// Deserializes a hash from a hex string.
    ///
    /// # Errors
    ///
    /// Fails when the string is not 64 hex characters.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Hash, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_hex(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_hash_content() {
        let content = b"hello world";
        let hash = hash_content(content);

        assert_eq!(hash, hash_content(content));
        assert_ne!(hash, hash_content(b"different"));
    }

    #[test]
    fn test_hash_concat_matches_single_buffer() {
        assert_eq!(hash_concat(&[b"vol".as_slice(), b"ume".as_slice()]), hash_content(b"volume"));
    }

    #[test]
    fn test_hex_round_trip() {
        let hash = hash_content(b"match output");
        let encoded = hex_encode(&hash);
        assert_eq!(encoded.len(), 64);
        assert_eq!(parse_hex(&encoded).unwrap(), hash);
        assert_eq!(parse_hex(&encoded.to_uppercase()).unwrap(), hash);
        assert_eq!(encoded, hex::encode(hash));
    }

    #[test]
    fn test_parse_hex_rejects_bad_input() {
        assert_eq!(
            parse_hex("abc"),
            Err(HexError::InvalidLength {
                expected: 64,
                actual: 3
            })
        );
        let mut bad = "0".repeat(64);
        bad.replace_range(10..11, "g");
        assert_eq!(parse_hex(&bad), Err(HexError::InvalidCharacter { offset: 10 }));
        assert_eq!(
            parse_hex(&"0".repeat(66)),
            Err(HexError::InvalidLength {
                expected: 64,
                actual: 66
            })
        );
    }
}
