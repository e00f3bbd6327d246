//! Multihash values and the registry of supported hash algorithms.
//!
//! A hash is encoded as `varint(code) || varint(length) || digest`, then
//! base64url without padding. The leading code selects the algorithm, so a
//! chain can mix algorithms over time.
use core::fmt;
use std::{collections::BTreeMap, sync::Arc};

use base64::Engine;
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

use crate::EncodingError;

pub const SHA2_256: u64 = 0x12;
pub const SHA2_512: u64 = 0x13;
pub const SHA3_256: u64 = 0x16;

/// Hash algorithm capability, identified by its multihash code.
pub trait HashAlgorithm: Send + Sync {
    fn code(&self) -> u64;

    fn name(&self) -> &'static str;

    /// Digest size in bytes.
    fn digest_len(&self) -> usize;

    fn digest(&self, data: &[u8]) -> Vec<u8>;
}

macro_rules! digest_algorithms {
    ($($id:ident: $code:ident, $name:literal, $hasher:ty),*) => {
        $(
            #[derive(Debug, Clone, Copy, Default)]
            pub struct $id;

            impl HashAlgorithm for $id {
                fn code(&self) -> u64 {
                    $code
                }

                fn name(&self) -> &'static str {
                    $name
                }

                fn digest_len(&self) -> usize {
                    <$hasher as sha2::Digest>::output_size()
                }

                fn digest(&self, data: &[u8]) -> Vec<u8> {
                    use sha2::Digest;
                    <$hasher>::digest(data).to_vec()
                }
            }
        )*
    };
}

digest_algorithms! {
    Sha2_256: SHA2_256, "sha2-256", sha2::Sha256,
    Sha2_512: SHA2_512, "sha2-512", sha2::Sha512,
    Sha3_256: SHA3_256, "sha3-256", sha3::Sha3_256
}

/// Hash algorithms keyed by multihash code.
#[derive(Clone)]
pub struct HashRegistry {
    algorithms: BTreeMap<u64, Arc<dyn HashAlgorithm>>,
}

impl HashRegistry {
    pub fn empty() -> Self {
        Self {
            algorithms: BTreeMap::new(),
        }
    }

    /// Add (or replace) an algorithm.
    pub fn register(&mut self, algorithm: impl HashAlgorithm + 'static) {
        self.algorithms.insert(algorithm.code(), Arc::new(algorithm));
    }

    pub fn get(&self, code: u64) -> Result<&dyn HashAlgorithm, EncodingError> {
        self.algorithms
            .get(&code)
            .map(|a| a.as_ref())
            .ok_or(EncodingError::UnsupportedHashAlgorithm(code))
    }

    pub fn codes(&self) -> impl Iterator<Item = u64> + '_ {
        self.algorithms.keys().copied()
    }

    pub fn hash(&self, code: u64, data: &[u8]) -> Result<Multihash, EncodingError> {
        let algorithm = self.get(code)?;
        Ok(Multihash {
            code,
            digest: algorithm.digest(data),
        })
    }
}

impl Default for HashRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(Sha2_256);
        registry.register(Sha2_512);
        registry.register(Sha3_256);
        registry
    }
}

impl fmt::Debug for HashRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.algorithms.iter().map(|(code, a)| (code, a.name())))
            .finish()
    }
}

/// Decoded multihash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Multihash {
    code: u64,
    digest: Vec<u8>,
}

impl Multihash {
    pub fn new(code: u64, digest: Vec<u8>) -> Self {
        Self { code, digest }
    }

    pub fn code(&self) -> u64 {
        self.code
    }

    pub fn digest(&self) -> &[u8] {
        &self.digest
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut code_buffer = unsigned_varint::encode::u64_buffer();
        let mut len_buffer = unsigned_varint::encode::usize_buffer();
        let code = unsigned_varint::encode::u64(self.code, &mut code_buffer);
        let len = unsigned_varint::encode::usize(self.digest.len(), &mut len_buffer);
        let mut bytes = Vec::with_capacity(code.len() + len.len() + self.digest.len());
        bytes.extend(code);
        bytes.extend(len);
        bytes.extend(&self.digest);
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, EncodingError> {
        let (code, rest) = unsigned_varint::decode::u64(bytes).map_err(EncodingError::Multihash)?;
        let (declared, digest) =
            unsigned_varint::decode::usize(rest).map_err(EncodingError::Multihash)?;
        if digest.len() != declared {
            return Err(EncodingError::DigestLength {
                declared,
                found: digest.len(),
            });
        }
        Ok(Self {
            code,
            digest: digest.to_vec(),
        })
    }

    pub fn encode(&self) -> EncodedHash {
        EncodedHash(base64::prelude::BASE64_URL_SAFE_NO_PAD.encode(self.to_bytes()))
    }

    /// Compare without exiting early on the first differing byte.
    pub fn ct_eq(&self, other: &Self) -> bool {
        let same_code = self.code.ct_eq(&other.code);
        let same_digest = self.digest.as_slice().ct_eq(other.digest.as_slice());
        (same_code & same_digest).into()
    }
}

/// Encoded multihash, as it appears on the wire.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct EncodedHash(pub String);

impl EncodedHash {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Decode without checking the algorithm against any registry.
    pub fn decode(&self) -> Result<Multihash, EncodingError> {
        let bytes = base64::prelude::BASE64_URL_SAFE_NO_PAD
            .decode(&self.0)
            .map_err(EncodingError::Base64)?;
        Multihash::from_bytes(&bytes)
    }
}

impl fmt::Display for EncodedHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EncodedHash {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}
