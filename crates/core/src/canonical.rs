//! [JSON Canonicalization Scheme][jcs] (RFC 8785).
//!
//! [jcs]: https://identity.foundation/sidetree/spec/v1.0.0/#json-canonicalization-scheme
use serde::Serialize;
use serde_json::Value;

/// Largest integer that every I-JSON implementation represents exactly.
const MAX_SAFE_INTEGER: u64 = (1 << 53) - 1;

#[derive(Debug, thiserror::Error)]
pub enum EncodingError {
    #[error("number {0} is outside the I-JSON exactly representable range")]
    NumberOutOfRange(String),

    #[error("unable to serialize value")]
    Serialization(#[source] serde_json::Error),

    #[error("invalid base64url hash encoding")]
    Base64(#[source] base64::DecodeError),

    #[error("malformed multihash")]
    Multihash(#[source] unsigned_varint::decode::Error),

    #[error("multihash digest length mismatch (declared {declared}, found {found})")]
    DigestLength { declared: usize, found: usize },

    #[error("hash algorithm 0x{code:x} produces {expected} byte digests, found {found}")]
    DigestSize {
        code: u64,
        expected: usize,
        found: usize,
    },

    #[error("unsupported hash algorithm 0x{0:x}")]
    UnsupportedHashAlgorithm(u64),

    #[error("hash algorithm 0x{0:x} is not allowed")]
    HashAlgorithmNotAllowed(u64),

    #[error("encoded hash is {length} characters long (maximum {max})")]
    HashTooLong { length: usize, max: usize },
}

/// Canonicalize a value.
///
/// Fails on integers that do not survive a round-trip through an IEEE 754
/// double, since other implementations would not agree on their encoding.
pub fn canonicalize<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, EncodingError> {
    let value = serde_json::to_value(value).map_err(EncodingError::Serialization)?;
    check_numbers(&value)?;
    serde_jcs::to_vec(&value).map_err(EncodingError::Serialization)
}

/// Size in bytes of the canonical form of `value`.
pub fn canonical_size<T: Serialize + ?Sized>(value: &T) -> Result<usize, EncodingError> {
    canonicalize(value).map(|bytes| bytes.len())
}

fn check_numbers(value: &Value) -> Result<(), EncodingError> {
    match value {
        Value::Number(n) => {
            let in_range = match (n.as_u64(), n.as_i64()) {
                (Some(u), _) => u <= MAX_SAFE_INTEGER,
                (None, Some(i)) => i.unsigned_abs() <= MAX_SAFE_INTEGER,
                (None, None) => n.as_f64().is_some_and(f64::is_finite),
            };
            if in_range {
                Ok(())
            } else {
                Err(EncodingError::NumberOutOfRange(n.to_string()))
            }
        }
        Value::Array(items) => items.iter().try_for_each(check_numbers),
        Value::Object(map) => map.values().try_for_each(check_numbers),
        Value::Null | Value::Bool(_) | Value::String(_) => Ok(()),
    }
}
