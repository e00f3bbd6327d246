//! Per-suffix operation chains and the rules for extending them.
use core::fmt;

use serde::{Deserialize, Serialize};
use sidetree_jws::SignatureVerifier;

use crate::{
    apply_patches, operation::Verification, schema, CommitmentTrack, ConsumedCommitment,
    ConsumedCommitments, DIDSuffix, DocumentState, EncodedHash, OperationError,
    OperationRequest, OperationType, Protocol, Rejection, SchemaError,
};

/// Lifecycle of a DID suffix.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ChainStatus {
    /// No Create operation admitted yet.
    #[default]
    Uninitialized,

    Active {
        update_commitment: EncodedHash,
        recovery_commitment: EncodedHash,
    },

    /// Terminal.
    Deactivated,
}

/// Position and identity of an admitted operation within its chain.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct OperationReference {
    pub index: usize,
    pub operation_type: OperationType,
    pub operation_hash: EncodedHash,
}

impl fmt::Display for OperationReference {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} operation #{} ({})",
            self.operation_type, self.index, self.operation_hash
        )
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AdmittedOperation {
    pub reference: OperationReference,
    pub request: OperationRequest,
}

/// State of one DID suffix: its admitted operations, current commitments,
/// consumed commitments and resolved document.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct ChainState {
    #[serde(skip_serializing_if = "Option::is_none")]
    did_suffix: Option<DIDSuffix>,
    #[serde(flatten)]
    status: ChainStatus,
    operations: Vec<AdmittedOperation>,
    consumed: ConsumedCommitments,
    document: DocumentState,
}

/// Structural problem in a stored chain state. Never caused by an operation
/// request; the record itself is damaged.
#[derive(Debug, thiserror::Error)]
pub enum CorruptRecord {
    #[error("uninitialized chain has history")]
    HistoryBeforeCreate,

    #[error("record belongs to {found:?}")]
    SuffixMismatch { found: Option<DIDSuffix> },

    #[error("chain does not start with a create operation")]
    MissingCreate,

    #[error("create operation at position {0}")]
    LateCreate(usize),

    #[error("operation at position {position} has index {found}")]
    OperationIndex { position: usize, found: usize },

    #[error("deactivated chain does not end with a deactivate operation")]
    MissingDeactivate,

    #[error("operation after deactivate")]
    OperationAfterDeactivate,
}

/// Operation is well formed but does not fit the chain it targets.
#[derive(Debug, thiserror::Error)]
pub enum ChainStateError {
    #[error("DID has not been created")]
    NotCreated,

    #[error("DID has already been created")]
    AlreadyCreated,

    #[error("DID has been deactivated")]
    Deactivated,

    #[error("operation targets {found}, chain is {expected}")]
    SuffixMismatch {
        expected: DIDSuffix,
        found: DIDSuffix,
    },

    #[error("signed DID suffix {signed} does not match {expected}")]
    SignedSuffixMismatch {
        expected: DIDSuffix,
        signed: DIDSuffix,
    },

    #[error("next {track} commitment {commitment} was already used")]
    CommitmentReuse {
        commitment: EncodedHash,
        track: CommitmentTrack,
    },
}

impl ChainState {
    pub fn did_suffix(&self) -> Option<&DIDSuffix> {
        self.did_suffix.as_ref()
    }

    pub fn status(&self) -> &ChainStatus {
        &self.status
    }

    pub fn operations(&self) -> &[AdmittedOperation] {
        &self.operations
    }

    pub fn consumed(&self) -> &ConsumedCommitments {
        &self.consumed
    }

    pub fn is_deactivated(&self) -> bool {
        self.status == ChainStatus::Deactivated
    }

    /// Check that a stored state is a plausible chain for `did_suffix`.
    pub fn check_integrity(&self, did_suffix: &DIDSuffix) -> Result<(), CorruptRecord> {
        if self.status == ChainStatus::Uninitialized {
            if self.did_suffix.is_some() || !self.operations.is_empty() || !self.consumed.is_empty()
            {
                return Err(CorruptRecord::HistoryBeforeCreate);
            }
            return Ok(());
        }
        if self.did_suffix.as_ref() != Some(did_suffix) {
            return Err(CorruptRecord::SuffixMismatch {
                found: self.did_suffix.clone(),
            });
        }
        match self.operations.first() {
            Some(first) if first.reference.operation_type == OperationType::Create => (),
            _ => return Err(CorruptRecord::MissingCreate),
        }
        for (position, operation) in self.operations.iter().enumerate() {
            if operation.reference.index != position {
                return Err(CorruptRecord::OperationIndex {
                    position,
                    found: operation.reference.index,
                });
            }
            match operation.reference.operation_type {
                OperationType::Create if position > 0 => {
                    return Err(CorruptRecord::LateCreate(position))
                }
                OperationType::Deactivate if position + 1 < self.operations.len() => {
                    return Err(CorruptRecord::OperationAfterDeactivate)
                }
                _ => (),
            }
        }
        let ends_deactivated = self.operations.last().map(|op| op.reference.operation_type)
            == Some(OperationType::Deactivate);
        if self.is_deactivated() != ends_deactivated {
            return Err(CorruptRecord::MissingDeactivate);
        }
        Ok(())
    }

    /// Mark `commitment` as consumed by `reference`.
    fn consume(
        &mut self,
        commitment: &EncodedHash,
        track: CommitmentTrack,
        reference: &OperationReference,
    ) {
        self.consumed.insert(
            commitment.clone(),
            ConsumedCommitment {
                track,
                consumed_by: reference.clone(),
            },
        );
    }

    /// A next commitment may be neither a consumed commitment nor the one
    /// being consumed by the same operation.
    fn ensure_fresh(
        &self,
        next: &EncodedHash,
        track: CommitmentTrack,
        consuming: Option<&EncodedHash>,
    ) -> Result<(), ChainStateError> {
        if self.consumed.contains(next) || consuming == Some(next) {
            return Err(ChainStateError::CommitmentReuse {
                commitment: next.clone(),
                track,
            });
        }
        Ok(())
    }
}

/// Result of admitting an operation.
#[derive(Debug, Clone)]
pub struct Admission {
    /// Chain state after the operation.
    pub state: ChainState,

    /// Resolved document after the operation.
    pub document: DocumentState,

    pub operation: OperationReference,
}

/// Validate a raw operation request against a chain state, and compute the
/// state that admitting it produces.
///
/// `state` is never modified: a rejected operation leaves no trace.
pub fn validate_and_admit(
    protocol: &Protocol,
    verifier: &dyn SignatureVerifier,
    state: &ChainState,
    raw: &[u8],
) -> Result<Admission, Rejection> {
    let request =
        schema::validate(protocol, raw).map_err(|error| schema_rejection(raw, error))?;
    admit(protocol, verifier, state, request)
}

pub(crate) fn schema_rejection(raw: &[u8], error: SchemaError) -> Rejection {
    let (operation_type, did_suffix) = schema::describe(raw);
    Rejection {
        did_suffix,
        operation_type,
        operation_hash: None,
        error: error.into(),
    }
}

/// Like [`validate_and_admit`], for a request that is already parsed.
pub fn admit(
    protocol: &Protocol,
    verifier: &dyn SignatureVerifier,
    state: &ChainState,
    request: OperationRequest,
) -> Result<Admission, Rejection> {
    let operation_type = request.operation_type();
    let reject = |did_suffix: Option<&DIDSuffix>,
                  operation_hash: Option<EncodedHash>,
                  error: OperationError| Rejection {
        did_suffix: did_suffix.cloned(),
        operation_type: Some(operation_type),
        operation_hash,
        error,
    };
    let did_suffix = request
        .did_suffix(protocol)
        .map_err(|e| reject(None, None, e.into()))?;
    let operation_hash = request
        .operation_hash(protocol)
        .map_err(|e| reject(Some(&did_suffix), None, e.into()))?;
    let reference = OperationReference {
        index: state.operations.len(),
        operation_type,
        operation_hash,
    };
    match next_state(protocol, verifier, state, &request, &did_suffix, &reference) {
        Ok(mut next) => {
            log::debug!("admitted {reference} for {did_suffix}");
            next.operations.push(AdmittedOperation {
                reference: reference.clone(),
                request,
            });
            Ok(Admission {
                document: resolve_document(&next),
                state: next,
                operation: reference,
            })
        }
        Err(error) => {
            log::debug!("rejected {operation_type} operation for {did_suffix}: {error}");
            Err(reject(
                Some(&did_suffix),
                Some(reference.operation_hash),
                error,
            ))
        }
    }
}

fn next_state(
    protocol: &Protocol,
    verifier: &dyn SignatureVerifier,
    state: &ChainState,
    request: &OperationRequest,
    did_suffix: &DIDSuffix,
    reference: &OperationReference,
) -> Result<ChainState, OperationError> {
    if let Some(expected) = &state.did_suffix {
        if expected != did_suffix {
            return Err(ChainStateError::SuffixMismatch {
                expected: expected.clone(),
                found: did_suffix.clone(),
            }
            .into());
        }
    }
    let v = Verification {
        protocol,
        verifier,
        consumed: &state.consumed,
        operation_hash: &reference.operation_hash,
    };
    let max_document_size = protocol.parameters().max_document_size;
    let mut next = state.clone();
    match (&state.status, request) {
        (ChainStatus::Deactivated, _) => return Err(ChainStateError::Deactivated.into()),
        (ChainStatus::Uninitialized, OperationRequest::Create(op)) => {
            op.verify(&v)?;
            next.document =
                apply_patches(&DocumentState::default(), &op.delta.patches, max_document_size)?;
            next.did_suffix = Some(did_suffix.clone());
            next.status = ChainStatus::Active {
                update_commitment: op.delta.update_commitment.clone(),
                recovery_commitment: op.suffix_data.recovery_commitment.clone(),
            };
        }
        (ChainStatus::Uninitialized, _) => return Err(ChainStateError::NotCreated.into()),
        (ChainStatus::Active { .. }, OperationRequest::Create(_)) => {
            return Err(ChainStateError::AlreadyCreated.into())
        }
        (
            ChainStatus::Active {
                update_commitment,
                recovery_commitment,
            },
            OperationRequest::Update(op),
        ) => {
            op.verify(&v, update_commitment)?;
            let next_update = &op.delta.update_commitment;
            state.ensure_fresh(next_update, CommitmentTrack::Update, Some(update_commitment))?;
            next.document = apply_patches(&state.document, &op.delta.patches, max_document_size)?;
            next.consume(update_commitment, CommitmentTrack::Update, reference);
            next.status = ChainStatus::Active {
                update_commitment: next_update.clone(),
                recovery_commitment: recovery_commitment.clone(),
            };
        }
        (ChainStatus::Active { recovery_commitment, .. }, OperationRequest::Recover(op)) => {
            let signed = op.verify(&v, recovery_commitment)?;
            let next_update = &op.delta.update_commitment;
            let next_recovery = &signed.recovery_commitment;
            state.ensure_fresh(next_update, CommitmentTrack::Update, Some(recovery_commitment))?;
            state.ensure_fresh(
                next_recovery,
                CommitmentTrack::Recovery,
                Some(recovery_commitment),
            )?;
            next.document =
                apply_patches(&DocumentState::default(), &op.delta.patches, max_document_size)?;
            next.consume(recovery_commitment, CommitmentTrack::Recovery, reference);
            next.status = ChainStatus::Active {
                update_commitment: next_update.clone(),
                recovery_commitment: next_recovery.clone(),
            };
        }
        (ChainStatus::Active { recovery_commitment, .. }, OperationRequest::Deactivate(op)) => {
            op.verify(&v, recovery_commitment)?;
            next.consume(recovery_commitment, CommitmentTrack::Recovery, reference);
            next.document = DocumentState::default();
            next.status = ChainStatus::Deactivated;
        }
    }
    Ok(next)
}

/// Resolved document of a chain. Empty before Create and after Deactivate.
pub fn resolve_document(state: &ChainState) -> DocumentState {
    match state.status {
        ChainStatus::Active { .. } => state.document.clone(),
        ChainStatus::Uninitialized | ChainStatus::Deactivated => DocumentState::default(),
    }
}

/// Rebuild a chain state from its admitted requests, in order.
pub fn replay(
    protocol: &Protocol,
    verifier: &dyn SignatureVerifier,
    requests: impl IntoIterator<Item = OperationRequest>,
) -> Result<ChainState, Rejection> {
    requests
        .into_iter()
        .try_fold(ChainState::default(), |state, request| {
            admit(protocol, verifier, &state, request).map(|admission| admission.state)
        })
}
