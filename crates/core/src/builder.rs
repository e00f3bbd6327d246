//! Construction of signed operation requests.
use serde::Serialize;
use sidetree_jwk::{InvalidPublicKeyJwk, PublicKeyJwk, SecretKey};

use crate::{
    CreateRequest, DIDStatePatch, DIDSuffix, DeactivateRequest, DeactivateSignedData, Delta,
    EncodingError, Protocol, RecoverRequest, RecoverSignedData, SignedData, SignedDataError,
    SuffixData, UpdateRequest, UpdateSignedData,
};

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("update and recovery public key JWK payloads must be different")]
    SameUpdateAndRecoveryKeys,

    #[error("new update public key must be different")]
    UpdateKeyUnchanged,

    #[error("new recovery public key must be different")]
    RecoveryKeyUnchanged,

    #[error("invalid update key")]
    InvalidUpdateKey(#[source] InvalidPublicKeyJwk),

    #[error("invalid recovery key")]
    InvalidRecoveryKey(#[source] InvalidPublicKeyJwk),

    #[error(transparent)]
    Encoding(#[from] EncodingError),

    #[error("unable to sign operation")]
    Signing(#[from] sidetree_jws::Error),

    #[error(transparent)]
    SignedData(#[from] SignedDataError),
}

/// Builds operation requests for a protocol.
///
/// Commitments and delta hashes use the protocol's hash algorithm.
///
/// **Note**: [Sidetree §6.2.1 Public Key Commitment Scheme][pkcs] requires
/// not reusing public key JWK payloads across commitment invocations.
///
/// [pkcs]: https://identity.foundation/sidetree/spec/v1.0.0/#public-key-commitment-scheme
#[derive(Debug, Clone, Copy)]
pub struct OperationBuilder<'a> {
    protocol: &'a Protocol,
}

impl<'a> OperationBuilder<'a> {
    pub fn new(protocol: &'a Protocol) -> Self {
        Self { protocol }
    }

    fn delta(
        &self,
        next_update_pk: &PublicKeyJwk,
        patches: Vec<DIDStatePatch>,
    ) -> Result<Delta, BuildError> {
        Ok(Delta {
            update_commitment: self.protocol.commitment(next_update_pk)?,
            patches,
        })
    }

    fn sign<T: Serialize + serde::de::DeserializeOwned>(
        &self,
        payload: &T,
        key: &SecretKey,
    ) -> Result<SignedData<T>, BuildError> {
        let payload = serde_json::to_string(payload).map_err(EncodingError::Serialization)?;
        let jws = sidetree_jws::encode_sign(&payload, key)?;
        Ok(SignedData::decode(jws)?)
    }

    /// Create a DID from existing update and recovery public keys.
    ///
    /// Reference: [Sidetree §11.1 Create](https://identity.foundation/sidetree/spec/v1.0.0/#create)
    pub fn create(
        &self,
        update_pk: &PublicKeyJwk,
        recovery_pk: &PublicKeyJwk,
        patches: Vec<DIDStatePatch>,
    ) -> Result<CreateRequest, BuildError> {
        update_pk.ensure_public().map_err(BuildError::InvalidUpdateKey)?;
        recovery_pk
            .ensure_public()
            .map_err(BuildError::InvalidRecoveryKey)?;
        if update_pk == recovery_pk {
            return Err(BuildError::SameUpdateAndRecoveryKeys);
        }
        let delta = self.delta(update_pk, patches)?;
        let suffix_data = SuffixData {
            delta_hash: self.protocol.hash_value(&delta)?,
            recovery_commitment: self.protocol.commitment(recovery_pk)?,
        };
        Ok(CreateRequest { suffix_data, delta })
    }

    /// Update a DID, revealing the current update key and committing to
    /// `new_update_pk`.
    ///
    /// Reference: [Sidetree §11.2 Update](https://identity.foundation/sidetree/spec/v1.0.0/#update)
    pub fn update(
        &self,
        did_suffix: &DIDSuffix,
        update_key: &SecretKey,
        new_update_pk: &PublicKeyJwk,
        patches: Vec<DIDStatePatch>,
    ) -> Result<UpdateRequest, BuildError> {
        let update_pk = update_key.to_public();
        new_update_pk
            .ensure_public()
            .map_err(BuildError::InvalidUpdateKey)?;
        if new_update_pk == &update_pk {
            return Err(BuildError::UpdateKeyUnchanged);
        }
        let delta = self.delta(new_update_pk, patches)?;
        let signed_data = self.sign(
            &UpdateSignedData {
                update_key: update_pk,
                delta_hash: self.protocol.hash_value(&delta)?,
            },
            update_key,
        )?;
        Ok(UpdateRequest {
            did_suffix: did_suffix.clone(),
            signed_data,
            delta,
        })
    }

    /// Recover a DID, revealing the current recovery key. Both commitments
    /// are replaced.
    ///
    /// Reference: [Sidetree §11.3 Recover](https://identity.foundation/sidetree/spec/v1.0.0/#recover)
    pub fn recover(
        &self,
        did_suffix: &DIDSuffix,
        recovery_key: &SecretKey,
        new_recovery_pk: &PublicKeyJwk,
        new_update_pk: &PublicKeyJwk,
        patches: Vec<DIDStatePatch>,
    ) -> Result<RecoverRequest, BuildError> {
        let recovery_pk = recovery_key.to_public();
        new_recovery_pk
            .ensure_public()
            .map_err(BuildError::InvalidRecoveryKey)?;
        new_update_pk
            .ensure_public()
            .map_err(BuildError::InvalidUpdateKey)?;
        if new_recovery_pk == &recovery_pk {
            return Err(BuildError::RecoveryKeyUnchanged);
        }
        if new_update_pk == new_recovery_pk {
            return Err(BuildError::SameUpdateAndRecoveryKeys);
        }
        let delta = self.delta(new_update_pk, patches)?;
        let signed_data = self.sign(
            &RecoverSignedData {
                delta_hash: self.protocol.hash_value(&delta)?,
                recovery_key: recovery_pk,
                recovery_commitment: self.protocol.commitment(new_recovery_pk)?,
            },
            recovery_key,
        )?;
        Ok(RecoverRequest {
            did_suffix: did_suffix.clone(),
            signed_data,
            delta,
        })
    }

    /// Reference: [Sidetree §11.4 Deactivate](https://identity.foundation/sidetree/spec/v1.0.0/#deactivate)
    pub fn deactivate(
        &self,
        did_suffix: &DIDSuffix,
        recovery_key: &SecretKey,
    ) -> Result<DeactivateRequest, BuildError> {
        let signed_data = self.sign(
            &DeactivateSignedData {
                did_suffix: did_suffix.clone(),
                recovery_key: recovery_key.to_public(),
            },
            recovery_key,
        )?;
        Ok(DeactivateRequest {
            did_suffix: did_suffix.clone(),
            signed_data,
        })
    }
}
