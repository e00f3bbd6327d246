//! Protocol parameters and the hashing context derived from them.
//!
//! Defaults follow [Sidetree §5 Default Parameters][params].
//!
//! [params]: https://identity.foundation/sidetree/spec/v1.0.0/#default-parameters
use serde::{Deserialize, Serialize};
use sidetree_jwk::{Algorithm, PublicKeyJwk};

use crate::{
    canonicalize,
    hash::{HashRegistry, Multihash, SHA2_256, SHA2_512, SHA3_256},
    DIDSuffix, EncodedHash, EncodingError, SuffixData,
};

/// Tunable protocol parameters.
///
/// Every field has a default, so a JSON configuration only needs to name the
/// values it changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProtocolParameters {
    /// Multihash code used for new hashes (DID suffixes, delta hashes,
    /// commitments built by this crate).
    pub hash_algorithm: u64,

    /// Maximum length of an encoded hash, in characters.
    pub max_operation_hash_length: usize,

    /// Maximum size of a raw operation request, in bytes.
    pub max_operation_size: usize,

    pub max_patches_per_delta: usize,

    /// Maximum size of the canonical resolved document, in bytes.
    pub max_document_size: usize,

    /// Compare-and-swap attempts before giving up on a contended suffix.
    pub max_store_retries: usize,

    /// JWS algorithms accepted for signed data.
    pub signature_algorithms: Vec<Algorithm>,

    /// Multihash codes accepted in declared hashes and commitments.
    pub allowed_hash_algorithms: Vec<u64>,
}

impl Default for ProtocolParameters {
    fn default() -> Self {
        Self {
            hash_algorithm: SHA2_256,
            max_operation_hash_length: 100,
            max_operation_size: 10_000,
            max_patches_per_delta: 100,
            max_document_size: 32 * 1024,
            max_store_retries: 8,
            signature_algorithms: Algorithm::ALL.to_vec(),
            allowed_hash_algorithms: vec![SHA2_256, SHA2_512, SHA3_256],
        }
    }
}

impl ProtocolParameters {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("hash algorithm 0x{0:x} is not registered")]
    UnregisteredHashAlgorithm(u64),

    #[error("hash algorithm 0x{0:x} is not in the allowed hash algorithms")]
    HashAlgorithmNotAllowed(u64),

    #[error("no signature algorithm is allowed")]
    NoSignatureAlgorithm,
}

/// Protocol parameters together with the hash algorithms they refer to.
#[derive(Debug, Clone)]
pub struct Protocol {
    parameters: ProtocolParameters,
    hashes: HashRegistry,
}

impl Default for Protocol {
    fn default() -> Self {
        Self {
            parameters: ProtocolParameters::default(),
            hashes: HashRegistry::default(),
        }
    }
}

impl Protocol {
    pub fn new(parameters: ProtocolParameters) -> Result<Self, ConfigError> {
        Self::with_registry(parameters, HashRegistry::default())
    }

    pub fn with_registry(
        parameters: ProtocolParameters,
        hashes: HashRegistry,
    ) -> Result<Self, ConfigError> {
        let code = parameters.hash_algorithm;
        if hashes.get(code).is_err() {
            return Err(ConfigError::UnregisteredHashAlgorithm(code));
        }
        if !parameters.allowed_hash_algorithms.contains(&code) {
            return Err(ConfigError::HashAlgorithmNotAllowed(code));
        }
        if let Some(code) = parameters
            .allowed_hash_algorithms
            .iter()
            .find(|code| hashes.get(**code).is_err())
        {
            return Err(ConfigError::UnregisteredHashAlgorithm(*code));
        }
        if parameters.signature_algorithms.is_empty() {
            return Err(ConfigError::NoSignatureAlgorithm);
        }
        Ok(Self { parameters, hashes })
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Self::new(ProtocolParameters::from_json(json)?)
    }

    pub fn parameters(&self) -> &ProtocolParameters {
        &self.parameters
    }

    pub fn hashes(&self) -> &HashRegistry {
        &self.hashes
    }

    /// Decode an encoded hash found in a request or chain state, checking its
    /// length and algorithm.
    pub fn decode_hash(&self, hash: &EncodedHash) -> Result<Multihash, EncodingError> {
        let max = self.parameters.max_operation_hash_length;
        if hash.0.len() > max {
            return Err(EncodingError::HashTooLong {
                length: hash.0.len(),
                max,
            });
        }
        let multihash = hash.decode()?;
        if !self.parameters.allowed_hash_algorithms.contains(&multihash.code()) {
            return Err(EncodingError::HashAlgorithmNotAllowed(multihash.code()));
        }
        let expected = self.hashes.get(multihash.code())?.digest_len();
        if multihash.digest().len() != expected {
            return Err(EncodingError::DigestSize {
                code: multihash.code(),
                expected,
                found: multihash.digest().len(),
            });
        }
        Ok(multihash)
    }

    /// Hash bytes with the given algorithm.
    pub fn hash_with(&self, code: u64, data: &[u8]) -> Result<Multihash, EncodingError> {
        let multihash = self.hashes.hash(code, data)?;
        log::trace!("hashed {} bytes with 0x{code:x}", data.len());
        Ok(multihash)
    }

    /// Hash bytes with the configured algorithm, and encode.
    pub fn hash(&self, data: &[u8]) -> Result<EncodedHash, EncodingError> {
        let encoded = self.hash_with(self.parameters.hash_algorithm, data)?.encode();
        let max = self.parameters.max_operation_hash_length;
        if encoded.0.len() > max {
            return Err(EncodingError::HashTooLong {
                length: encoded.0.len(),
                max,
            });
        }
        Ok(encoded)
    }

    /// Hash the canonical form of a value with the configured algorithm.
    pub fn hash_value<T: Serialize + ?Sized>(
        &self,
        value: &T,
    ) -> Result<EncodedHash, EncodingError> {
        self.hash(&canonicalize(value)?)
    }

    /// Recompute `declared` over the canonical form of `value`, using the
    /// algorithm `declared` names. Returns the recomputed hash and whether it
    /// matches.
    pub fn check_hash<T: Serialize + ?Sized>(
        &self,
        declared: &EncodedHash,
        value: &T,
    ) -> Result<(EncodedHash, bool), EncodingError> {
        let declared_multihash = self.decode_hash(declared)?;
        let computed = self.hash_with(declared_multihash.code(), &canonicalize(value)?)?;
        let matches = computed.ct_eq(&declared_multihash);
        Ok((computed.encode(), matches))
    }

    /// [Public key commitment][pkcs] of `key` with the configured algorithm.
    ///
    /// [pkcs]: https://identity.foundation/sidetree/spec/v1.0.0/#public-key-commitment-scheme
    pub fn commitment(&self, key: &PublicKeyJwk) -> Result<EncodedHash, EncodingError> {
        self.hash_value(key)
    }

    /// DID suffix derived from create-time suffix data.
    pub fn did_suffix(&self, suffix_data: &SuffixData) -> Result<DIDSuffix, EncodingError> {
        self.hash_value(suffix_data).map(|hash| DIDSuffix(hash.0))
    }

    /// Check that a DID suffix is an encoded hash of an allowed algorithm.
    ///
    /// Suffixes derived under an earlier `hash_algorithm` stay valid as long
    /// as their algorithm is still allowed.
    pub fn validate_did_suffix(&self, did_suffix: &DIDSuffix) -> Result<(), EncodingError> {
        self.decode_hash(&EncodedHash(did_suffix.0.clone())).map(|_| ())
    }
}
