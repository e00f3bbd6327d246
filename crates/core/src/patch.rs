//! DID state patches and their application.
use serde::{Deserialize, Serialize};

use crate::{
    canonical_size,
    document::{ensure_unique_ids, InvalidEntry},
    DocumentState, EncodingError, PublicKeyEntry, ServiceEndpointEntry,
};

/// [DID State Patch][dsp] using a [Sidetree Standard Patch action][spa]
///
/// [dsp]: https://identity.foundation/sidetree/spec/v1.0.0/#did-state-patches
/// [spa]: https://identity.foundation/sidetree/spec/v1.0.0/#standard-patch-actions
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(tag = "action")]
#[serde(rename_all = "kebab-case")]
pub enum DIDStatePatch {
    /// [`add-public-keys`][apk] Patch Action
    ///
    /// [apk]: https://identity.foundation/sidetree/spec/v1.0.0/#add-public-keys
    AddPublicKeys { public_keys: Vec<PublicKeyEntry> },

    /// [`remove-public-keys`][rpk] Patch Action
    ///
    /// [rpk]: https://identity.foundation/sidetree/spec/v1.0.0/#remove-public-keys
    RemovePublicKeys { ids: Vec<String> },

    /// [`add-services`][as] Patch Action
    ///
    /// [as]: https://identity.foundation/sidetree/spec/v1.0.0/#add-services
    AddServices { services: Vec<ServiceEndpointEntry> },

    /// [`remove-services`][rs] Patch Action
    ///
    /// [rs]: https://identity.foundation/sidetree/spec/v1.0.0/#remove-services
    RemoveServices { ids: Vec<String> },

    /// [`replace`][r] Patch Action
    ///
    /// [r]: https://identity.foundation/sidetree/spec/v1.0.0/#replace
    Replace { document: DocumentState },

    /// [`ietf-json-patch`][ijp] Patch Action
    ///
    /// JSON Patches according to [RFC 6902](https://datatracker.ietf.org/doc/html/rfc6902).
    ///
    /// [ijp]: https://identity.foundation/sidetree/spec/v1.0.0/#ietf-json-patch
    IetfJsonPatch { patches: json_patch::Patch },
}

#[derive(Debug, thiserror::Error)]
pub enum PatchError {
    #[error("patch {index}: public key `{id}` already exists")]
    DuplicatePublicKey { index: usize, id: String },

    #[error("patch {index}: service `{id}` already exists")]
    DuplicateService { index: usize, id: String },

    #[error("patch {index}: JSON patch failed")]
    JsonPatch {
        index: usize,
        #[source]
        source: json_patch::PatchError,
    },

    #[error("patch {index}: result is not a DID document")]
    MalformedDocument {
        index: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("patch {index}: result has members a DID document entry cannot hold")]
    UnrecognizedMembers { index: usize },

    #[error("patch {index}: invalid entry")]
    InvalidEntry {
        index: usize,
        #[source]
        source: InvalidEntry,
    },

    #[error("canonical document is {size} bytes (maximum {max})")]
    DocumentTooLarge { size: usize, max: usize },

    #[error(transparent)]
    Encoding(#[from] EncodingError),
}

impl DIDStatePatch {
    pub fn action(&self) -> &'static str {
        match self {
            Self::AddPublicKeys { .. } => "add-public-keys",
            Self::RemovePublicKeys { .. } => "remove-public-keys",
            Self::AddServices { .. } => "add-services",
            Self::RemoveServices { .. } => "remove-services",
            Self::Replace { .. } => "replace",
            Self::IetfJsonPatch { .. } => "ietf-json-patch",
        }
    }

    /// Apply this patch, the `index`-th of its delta, to `document`.
    ///
    /// On error `document` may be partially modified; callers work on a copy.
    fn apply_to(&self, index: usize, document: &mut DocumentState) -> Result<(), PatchError> {
        let invalid = |source| PatchError::InvalidEntry { index, source };
        match self {
            Self::AddPublicKeys { public_keys } => {
                ensure_unique_ids(public_keys.iter().map(|k| k.id.as_str())).map_err(invalid)?;
                let existing = document.public_keys.get_or_insert_with(Vec::new);
                for key in public_keys {
                    key.validate().map_err(invalid)?;
                    if existing.iter().any(|k| k.id == key.id) {
                        return Err(PatchError::DuplicatePublicKey {
                            index,
                            id: key.id.clone(),
                        });
                    }
                    existing.push(key.clone());
                }
            }
            Self::RemovePublicKeys { ids } => {
                if let Some(existing) = &mut document.public_keys {
                    existing.retain(|k| !ids.contains(&k.id));
                }
            }
            Self::AddServices { services } => {
                ensure_unique_ids(services.iter().map(|s| s.id.as_str())).map_err(invalid)?;
                let existing = document.services.get_or_insert_with(Vec::new);
                for service in services {
                    service.validate().map_err(invalid)?;
                    if existing.iter().any(|s| s.id == service.id) {
                        return Err(PatchError::DuplicateService {
                            index,
                            id: service.id.clone(),
                        });
                    }
                    existing.push(service.clone());
                }
            }
            Self::RemoveServices { ids } => {
                if let Some(existing) = &mut document.services {
                    existing.retain(|s| !ids.contains(&s.id));
                }
            }
            Self::Replace { document: new } => {
                new.validate().map_err(invalid)?;
                *document = new.clone();
            }
            Self::IetfJsonPatch { patches } => {
                let mut value = serde_json::to_value(&*document)
                    .map_err(|source| PatchError::MalformedDocument { index, source })?;
                json_patch::patch(&mut value, patches)
                    .map_err(|source| PatchError::JsonPatch { index, source })?;
                let patched: DocumentState = serde_json::from_value(value.clone())
                    .map_err(|source| PatchError::MalformedDocument { index, source })?;
                patched.validate().map_err(invalid)?;
                // Entries must not carry members their type would drop.
                let kept = serde_json::to_value(&patched)
                    .map_err(|source| PatchError::MalformedDocument { index, source })?;
                if kept != value {
                    return Err(PatchError::UnrecognizedMembers { index });
                }
                *document = patched;
            }
        }
        Ok(())
    }
}

/// Apply `patches` in order to a copy of `document`.
///
/// Later patches see the result of earlier ones. Any failure rejects the
/// whole sequence and `document` is left untouched. The result must not
/// exceed `max_document_size` bytes in canonical form.
pub fn apply_patches(
    document: &DocumentState,
    patches: &[DIDStatePatch],
    max_document_size: usize,
) -> Result<DocumentState, PatchError> {
    let mut patched = document.clone();
    for (index, patch) in patches.iter().enumerate() {
        patch.apply_to(index, &mut patched)?;
    }
    let size = canonical_size(&patched)?;
    if size > max_document_size {
        return Err(PatchError::DocumentTooLarge {
            size,
            max: max_document_size,
        });
    }
    Ok(patched)
}
