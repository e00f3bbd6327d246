use core::fmt;

use crate::{
    ChainStateError, CommitmentTrack, CorruptRecord, DIDSuffix, EncodedHash, EncodingError,
    OperationReference, OperationType, PatchError, SchemaError, SignatureError,
};

/// Reason an operation was not admitted.
#[derive(Debug, thiserror::Error)]
pub enum OperationError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Encoding(#[from] EncodingError),

    #[error("{field} mismatch (declared {declared}, computed {computed})")]
    HashMismatch {
        field: &'static str,
        declared: EncodedHash,
        computed: EncodedHash,
    },

    #[error("revealed key does not match commitment {expected} (computed {computed})")]
    CommitmentMismatch {
        expected: EncodedHash,
        computed: EncodedHash,
    },

    /// The revealed key matches a commitment that an admitted operation
    /// already consumed. Two operations compete for the same commitment;
    /// which one should win is left to the caller.
    #[error("{track} commitment {commitment} was already consumed by {consumed_by}")]
    CommitmentAlreadyConsumed {
        commitment: EncodedHash,
        track: CommitmentTrack,
        consumed_by: OperationReference,
        candidate: EncodedHash,
    },

    #[error("invalid signature")]
    SignatureInvalid(#[from] SignatureError),

    #[error("invalid patch")]
    Patch(#[from] PatchError),

    #[error(transparent)]
    ChainState(#[from] ChainStateError),
}

/// A rejected operation, identified as far as it could be parsed.
#[derive(Debug)]
pub struct Rejection {
    pub did_suffix: Option<DIDSuffix>,
    pub operation_type: Option<OperationType>,
    pub operation_hash: Option<EncodedHash>,
    pub error: OperationError,
}

impl Rejection {
    pub fn new(error: impl Into<OperationError>) -> Self {
        Self {
            did_suffix: None,
            operation_type: None,
            operation_hash: None,
            error: error.into(),
        }
    }

    pub fn error(&self) -> &OperationError {
        &self.error
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.operation_type {
            Some(t) => write!(f, "{t} operation rejected")?,
            None => f.write_str("operation rejected")?,
        }
        if let Some(suffix) = &self.did_suffix {
            write!(f, " for {suffix}")?;
        }
        write!(f, ": {}", self.error)
    }
}

impl std::error::Error for Rejection {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Error from [`OperationProcessor::process`](crate::OperationProcessor::process).
///
/// Only [`Rejected`](Self::Rejected) is about the operation itself. The other
/// variants mean the chain store cannot be trusted.
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error(transparent)]
    Rejected(#[from] Rejection),

    #[error("chain store failure")]
    Store(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("corrupt chain record for {did_suffix}")]
    CorruptRecord {
        did_suffix: DIDSuffix,
        #[source]
        reason: CorruptRecord,
    },

    #[error("gave up on {did_suffix} after {attempts} conflicting writes")]
    RetriesExhausted { did_suffix: DIDSuffix, attempts: usize },
}

impl ProcessError {
    /// Whether the error concerns the store rather than the operation.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Store(_) | Self::CorruptRecord { .. })
    }

    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            Self::Rejected(r) => Some(r),
            _ => None,
        }
    }
}
