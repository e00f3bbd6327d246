use serde::{Deserialize, Serialize};
use sidetree_jwk::PublicKeyJwk;

use super::{Delta, SignedData, Verification};
use crate::{CommitmentTrack, DIDSuffix, EncodedHash, OperationError};

/// Sidetree DID Recover operation
///
/// ### References
/// - [Sidetree §11.3 Recover](https://identity.foundation/sidetree/spec/v1.0.0/#recover)
/// - [Sidetree REST API §1.2.3 Recover](https://identity.foundation/sidetree/api/#recover)
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct RecoverRequest {
    pub did_suffix: DIDSuffix,

    /// Compact JWS (RFC 7515) of [`RecoverSignedData`]
    pub signed_data: SignedData<RecoverSignedData>,

    pub delta: Delta,
}

/// Payload object for JWS in [`RecoverRequest`]
///
/// <https://identity.foundation/sidetree/spec/v1.0.0/#recover-signed-data-object>
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct RecoverSignedData {
    /// Hash of the canonical [`Delta`].
    pub delta_hash: EncodedHash,

    /// Key matching the current recovery commitment
    pub recovery_key: PublicKeyJwk,

    /// Next recovery commitment
    pub recovery_commitment: EncodedHash,
}

impl RecoverRequest {
    pub(crate) fn verify(
        &self,
        v: &Verification,
        recovery_commitment: &EncodedHash,
    ) -> Result<&RecoverSignedData, OperationError> {
        let claimed = self.signed_data.unverified_payload();
        v.reveal(
            &claimed.recovery_key,
            CommitmentTrack::Recovery,
            recovery_commitment,
        )?;
        let signed = v.signature(&self.signed_data, &claimed.recovery_key)?;
        v.delta_hash(&signed.delta_hash, &self.delta)?;
        Ok(signed)
    }
}
