//! [Public key commitments][pkcs] and the ledger of consumed commitments.
//!
//! [pkcs]: https://identity.foundation/sidetree/spec/v1.0.0/#public-key-commitment-scheme
use core::fmt;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sidetree_jwk::PublicKeyJwk;

use crate::{canonicalize, EncodedHash, EncodingError, OperationError, OperationReference, Protocol};

/// Commitment track. Update operations consume the update commitment,
/// Recover and Deactivate operations the recovery commitment.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CommitmentTrack {
    Update,
    Recovery,
}

impl fmt::Display for CommitmentTrack {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Update => f.write_str("update"),
            Self::Recovery => f.write_str("recovery"),
        }
    }
}

/// Check that `revealed_key` is the pre-image of `expected`.
///
/// The commitment is recomputed with the hash algorithm `expected` declares,
/// and compared in constant time.
pub fn verify_commitment(
    protocol: &Protocol,
    revealed_key: &PublicKeyJwk,
    expected: &EncodedHash,
) -> Result<(), OperationError> {
    let (computed, matches) = protocol.check_hash(expected, revealed_key)?;
    if matches {
        Ok(())
    } else {
        Err(OperationError::CommitmentMismatch {
            expected: expected.clone(),
            computed,
        })
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ConsumedCommitment {
    pub track: CommitmentTrack,
    pub consumed_by: OperationReference,
}

/// Commitments whose pre-image has been revealed by an admitted operation.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(transparent)]
pub struct ConsumedCommitments(BTreeMap<EncodedHash, ConsumedCommitment>);

impl ConsumedCommitments {
    pub fn get(&self, commitment: &EncodedHash) -> Option<&ConsumedCommitment> {
        self.0.get(commitment)
    }

    pub fn contains(&self, commitment: &EncodedHash) -> bool {
        self.0.contains_key(commitment)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&EncodedHash, &ConsumedCommitment)> {
        self.0.iter()
    }

    pub(crate) fn insert(&mut self, commitment: EncodedHash, consumed: ConsumedCommitment) {
        self.0.insert(commitment, consumed);
    }

    /// Find a consumed commitment of `track` that `key` is the pre-image of.
    pub fn find_reveal(
        &self,
        protocol: &Protocol,
        key: &PublicKeyJwk,
        track: CommitmentTrack,
    ) -> Result<Option<(&EncodedHash, &ConsumedCommitment)>, EncodingError> {
        let canonical_key = canonicalize(key)?;
        for (commitment, consumed) in self.0.iter().filter(|(_, c)| c.track == track) {
            let Ok(multihash) = commitment.decode() else {
                continue;
            };
            let Ok(computed) = protocol.hash_with(multihash.code(), &canonical_key) else {
                continue;
            };
            if computed.ct_eq(&multihash) {
                return Ok(Some((commitment, consumed)));
            }
        }
        Ok(None)
    }
}

/// Check a reveal against the current commitment of `track`.
///
/// A key that misses the current commitment but opens an already consumed one
/// is reported as [`OperationError::CommitmentAlreadyConsumed`], so that the
/// competing operations can be told apart.
pub(crate) fn check_reveal(
    protocol: &Protocol,
    consumed: &ConsumedCommitments,
    revealed_key: &PublicKeyJwk,
    track: CommitmentTrack,
    current: &EncodedHash,
    candidate: &EncodedHash,
) -> Result<(), OperationError> {
    let error = match verify_commitment(protocol, revealed_key, current) {
        Ok(()) => return Ok(()),
        Err(error) => error,
    };
    if let OperationError::CommitmentMismatch { .. } = error {
        if let Some((commitment, previous)) = consumed.find_reveal(protocol, revealed_key, track)? {
            log::warn!(
                "operation {candidate} reveals {track} commitment {commitment}, already consumed by {}",
                previous.consumed_by
            );
            return Err(OperationError::CommitmentAlreadyConsumed {
                commitment: commitment.clone(),
                track,
                consumed_by: previous.consumed_by.clone(),
                candidate: candidate.clone(),
            });
        }
    }
    Err(error)
}
