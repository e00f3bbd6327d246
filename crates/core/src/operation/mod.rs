mod create;
mod deactivate;
mod recover;
mod update;

use core::fmt;

pub use create::*;
pub use deactivate::*;
pub use recover::*;
pub use update::*;

use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize, Serializer};
use sidetree_jwk::PublicKeyJwk;
use sidetree_jws::{decode_unverified, DecodedJws, Header, SignatureVerifier};

use crate::{
    commitment::check_reveal, verify_signature, CommitmentTrack, ConsumedCommitments,
    DIDStatePatch, DIDSuffix, EncodedHash, EncodingError, OperationError, Protocol,
};

/// Sidetree DID operation request
///
/// ### References
/// - <https://identity.foundation/sidetree/spec/v1.0.0/#did-operations>
/// - <https://identity.foundation/sidetree/api/#sidetree-operations>
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(tag = "type")]
#[serde(rename_all = "lowercase")]
pub enum OperationRequest {
    Create(CreateRequest),
    Update(UpdateRequest),
    Recover(RecoverRequest),
    Deactivate(DeactivateRequest),
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum OperationType {
    Create,
    Update,
    Recover,
    Deactivate,
}

impl OperationType {
    pub const ALL: [Self; 4] = [Self::Create, Self::Update, Self::Recover, Self::Deactivate];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Recover => "recover",
            Self::Deactivate => "deactivate",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == tag)
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl OperationRequest {
    pub fn operation_type(&self) -> OperationType {
        match self {
            Self::Create(_) => OperationType::Create,
            Self::Update(_) => OperationType::Update,
            Self::Recover(_) => OperationType::Recover,
            Self::Deactivate(_) => OperationType::Deactivate,
        }
    }

    /// Suffix of the DID this operation targets. Derived from the suffix data
    /// for a Create operation.
    pub fn did_suffix(&self, protocol: &Protocol) -> Result<DIDSuffix, EncodingError> {
        match self {
            Self::Create(op) => op.did_suffix(protocol),
            Self::Update(op) => Ok(op.did_suffix.clone()),
            Self::Recover(op) => Ok(op.did_suffix.clone()),
            Self::Deactivate(op) => Ok(op.did_suffix.clone()),
        }
    }

    pub fn delta(&self) -> Option<&Delta> {
        match self {
            Self::Create(op) => Some(&op.delta),
            Self::Update(op) => Some(&op.delta),
            Self::Recover(op) => Some(&op.delta),
            Self::Deactivate(_) => None,
        }
    }

    /// Hash of the canonical request, identifying this operation.
    pub fn operation_hash(&self, protocol: &Protocol) -> Result<EncodedHash, EncodingError> {
        protocol.hash_value(self)
    }

    pub fn to_vec(&self) -> Result<Vec<u8>, EncodingError> {
        serde_json::to_vec(self).map_err(EncodingError::Serialization)
    }
}

impl From<CreateRequest> for OperationRequest {
    fn from(value: CreateRequest) -> Self {
        Self::Create(value)
    }
}

impl From<UpdateRequest> for OperationRequest {
    fn from(value: UpdateRequest) -> Self {
        Self::Update(value)
    }
}

impl From<RecoverRequest> for OperationRequest {
    fn from(value: RecoverRequest) -> Self {
        Self::Recover(value)
    }
}

impl From<DeactivateRequest> for OperationRequest {
    fn from(value: DeactivateRequest) -> Self {
        Self::Deactivate(value)
    }
}

/// Create/Update/Recover Delta Object
///
/// ### References
/// - [Sidetree §11.1 Create - Create Operation Delta Object][codo]
/// - [Sidetree §11.2 Update - Update Operation Delta Object][uodo]
/// - [Sidetree §11.3 Recover - Recover Operation Delta Object][rodo]
///
/// [codo]: https://identity.foundation/sidetree/spec/v1.0.0/#create-delta-object
/// [uodo]: https://identity.foundation/sidetree/spec/v1.0.0/#update-delta-object
/// [rodo]: https://identity.foundation/sidetree/spec/v1.0.0/#recover-delta-object
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct Delta {
    /// Commitment for the next Update operation.
    pub update_commitment: EncodedHash,

    /// DID state patches to apply, in order.
    pub patches: Vec<DIDStatePatch>,
}

#[derive(Debug, thiserror::Error)]
pub enum SignedDataError {
    #[error(transparent)]
    Jws(#[from] sidetree_jws::Error),

    #[error("invalid signed data payload")]
    Payload(#[source] serde_json::Error),
}

/// Compact JWS together with its decoded, not yet verified, payload.
///
/// Serialized as the compact JWS string.
#[derive(Debug, Clone)]
pub struct SignedData<T> {
    compact: String,
    decoded: DecodedJws,
    payload: T,
}

impl<T: DeserializeOwned> SignedData<T> {
    pub fn decode(compact: String) -> Result<Self, SignedDataError> {
        let decoded = decode_unverified(&compact)?;
        let payload = serde_json::from_slice(&decoded.payload).map_err(SignedDataError::Payload)?;
        Ok(Self {
            compact,
            decoded,
            payload,
        })
    }
}

impl<T> SignedData<T> {
    pub fn as_str(&self) -> &str {
        &self.compact
    }

    pub fn header(&self) -> &Header {
        &self.decoded.header
    }

    pub fn signing_input(&self) -> &[u8] {
        &self.decoded.signing_input
    }

    pub fn signature(&self) -> &[u8] {
        &self.decoded.signature
    }

    /// Payload, before its signature is verified.
    pub fn unverified_payload(&self) -> &T {
        &self.payload
    }
}

impl<T> Serialize for SignedData<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.compact.serialize(serializer)
    }
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for SignedData<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let compact = String::deserialize(deserializer)?;
        Self::decode(compact).map_err(serde::de::Error::custom)
    }
}

/// Everything the per-operation checks need besides the operation itself.
pub(crate) struct Verification<'a> {
    pub protocol: &'a Protocol,
    pub verifier: &'a dyn SignatureVerifier,
    pub consumed: &'a ConsumedCommitments,
    pub operation_hash: &'a EncodedHash,
}

impl Verification<'_> {
    /// The revealed key must open the current commitment of `track`.
    pub fn reveal(
        &self,
        key: &PublicKeyJwk,
        track: CommitmentTrack,
        current: &EncodedHash,
    ) -> Result<(), OperationError> {
        check_reveal(
            self.protocol,
            self.consumed,
            key,
            track,
            current,
            self.operation_hash,
        )
    }

    pub fn signature<'s, T>(
        &self,
        signed_data: &'s SignedData<T>,
        key: &PublicKeyJwk,
    ) -> Result<&'s T, OperationError> {
        Ok(verify_signature(
            self.protocol,
            self.verifier,
            signed_data,
            key,
        )?)
    }

    pub fn delta_hash(&self, declared: &EncodedHash, delta: &Delta) -> Result<(), OperationError> {
        let (computed, matches) = self.protocol.check_hash(declared, delta)?;
        if matches {
            Ok(())
        } else {
            Err(OperationError::HashMismatch {
                field: "delta_hash",
                declared: declared.clone(),
                computed,
            })
        }
    }
}
