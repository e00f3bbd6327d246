use serde::{Deserialize, Serialize};

use super::{Delta, Verification};
use crate::{DIDSuffix, EncodedHash, EncodingError, OperationError, Protocol};

/// Sidetree DID Create operation
///
/// ### References
/// - [Sidetree §11.1 Create](https://identity.foundation/sidetree/spec/v1.0.0/#create)
/// - [Sidetree REST API §1.2.1 Create](https://identity.foundation/sidetree/api/#create)
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct CreateRequest {
    pub suffix_data: SuffixData,
    pub delta: Delta,
}

/// Create operation suffix data object
///
/// The DID suffix is the hash of its canonical form.
///
/// ### References
/// - [Sidetree §11.1 Create - Create Operation Suffix Data Object][data]
///
/// [data]: https://identity.foundation/sidetree/spec/v1.0.0/#create-suffix-data-object
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct SuffixData {
    /// Hash of the canonical [`Delta`].
    pub delta_hash: EncodedHash,

    /// [Recovery commitment](https://identity.foundation/sidetree/spec/v1.0.0/#recovery-commitment)
    pub recovery_commitment: EncodedHash,
}

impl CreateRequest {
    pub fn did_suffix(&self, protocol: &Protocol) -> Result<DIDSuffix, EncodingError> {
        protocol.did_suffix(&self.suffix_data)
    }

    pub(crate) fn verify(&self, v: &Verification) -> Result<(), OperationError> {
        v.delta_hash(&self.suffix_data.delta_hash, &self.delta)
    }
}
