use serde::{Deserialize, Serialize};
use sidetree_jwk::PublicKeyJwk;

use super::{Delta, SignedData, Verification};
use crate::{CommitmentTrack, DIDSuffix, EncodedHash, OperationError};

/// Sidetree DID Update operation
///
/// ### References
/// - [Sidetree §11.2 Update](https://identity.foundation/sidetree/spec/v1.0.0/#update)
/// - [Sidetree REST API §1.2.2 Update](https://identity.foundation/sidetree/api/#update)
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct UpdateRequest {
    pub did_suffix: DIDSuffix,

    /// Compact JWS (RFC 7515) of [`UpdateSignedData`]
    pub signed_data: SignedData<UpdateSignedData>,

    pub delta: Delta,
}

/// Payload object for JWS in [`UpdateRequest`]
///
/// <https://identity.foundation/sidetree/spec/v1.0.0/#update-signed-data-object>
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct UpdateSignedData {
    /// Key matching the current update commitment
    pub update_key: PublicKeyJwk,

    /// Hash of the canonical [`Delta`].
    pub delta_hash: EncodedHash,
}

impl UpdateRequest {
    /// Reveal, then signature, then delta hash.
    pub(crate) fn verify(
        &self,
        v: &Verification,
        update_commitment: &EncodedHash,
    ) -> Result<&UpdateSignedData, OperationError> {
        let claimed = self.signed_data.unverified_payload();
        v.reveal(&claimed.update_key, CommitmentTrack::Update, update_commitment)?;
        let signed = v.signature(&self.signed_data, &claimed.update_key)?;
        v.delta_hash(&signed.delta_hash, &self.delta)?;
        Ok(signed)
    }
}
