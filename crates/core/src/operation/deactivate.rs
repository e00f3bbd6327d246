use serde::{Deserialize, Serialize};
use sidetree_jwk::PublicKeyJwk;

use super::{SignedData, Verification};
use crate::{ChainStateError, CommitmentTrack, DIDSuffix, EncodedHash, OperationError};

/// Sidetree DID Deactivate operation
///
/// ### References
/// - [Sidetree §11.4 Deactivate](https://identity.foundation/sidetree/spec/v1.0.0/#deactivate)
/// - [Sidetree REST API §1.2.4 Deactivate](https://identity.foundation/sidetree/api/#deactivate)
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct DeactivateRequest {
    pub did_suffix: DIDSuffix,

    /// Compact JWS (RFC 7515) of [`DeactivateSignedData`]
    pub signed_data: SignedData<DeactivateSignedData>,
}

/// Payload object for JWS in [`DeactivateRequest`]
///
/// <https://identity.foundation/sidetree/spec/v1.0.0/#deactivate-signed-data-object>
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct DeactivateSignedData {
    /// Suffix of the DID being deactivated. Must match the request.
    pub did_suffix: DIDSuffix,

    /// Key matching the current recovery commitment
    pub recovery_key: PublicKeyJwk,
}

impl DeactivateRequest {
    pub(crate) fn verify(
        &self,
        v: &Verification,
        recovery_commitment: &EncodedHash,
    ) -> Result<&DeactivateSignedData, OperationError> {
        let claimed = self.signed_data.unverified_payload();
        v.reveal(
            &claimed.recovery_key,
            CommitmentTrack::Recovery,
            recovery_commitment,
        )?;
        let signed = v.signature(&self.signed_data, &claimed.recovery_key)?;
        if signed.did_suffix != self.did_suffix {
            return Err(ChainStateError::SignedSuffixMismatch {
                expected: self.did_suffix.clone(),
                signed: signed.did_suffix.clone(),
            }
            .into());
        }
        Ok(signed)
    }
}
