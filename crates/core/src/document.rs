//! Resolved DID document state and its entries.
use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sidetree_jwk::{InvalidPublicKeyJwk, PublicKeyJwk};

/// Maximum length of a public key or service `id`.
///
/// Reference: [Sidetree §12.1.1 `add-public-keys`](https://identity.foundation/sidetree/spec/v1.0.0/#add-public-keys)
pub const MAX_ID_LENGTH: usize = 50;

/// Maximum length of a service `type`.
///
/// Reference: [Sidetree §12.1.3 `add-services`](https://identity.foundation/sidetree/spec/v1.0.0/#add-services)
pub const MAX_SERVICE_TYPE_LENGTH: usize = 30;

/// Verification relationship of a public key.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "camelCase")]
pub enum Purpose {
    Authentication,
    AssertionMethod,
    KeyAgreement,
    CapabilityInvocation,
    CapabilityDelegation,
}

impl Purpose {
    pub const ALL: [Self; 5] = [
        Self::Authentication,
        Self::AssertionMethod,
        Self::KeyAgreement,
        Self::CapabilityInvocation,
        Self::CapabilityDelegation,
    ];
}

/// Public key as JWK or Multibase
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PublicKey {
    PublicKeyJwk(PublicKeyJwk),
    PublicKeyMultibase(String),
}

/// Public Key Entry
///
/// Used by the [`add-public-keys`](crate::DIDStatePatch::AddPublicKeys) and
/// [`replace`](crate::DIDStatePatch::Replace) patch actions.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct PublicKeyEntry {
    /// Maximum length: 50 in Base64url
    pub id: String,

    /// Verification method type
    pub r#type: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub controller: Option<String>,

    /// `public_key_jwk` or `public_key_multibase` property
    #[serde(flatten)]
    pub public_key: PublicKey,

    pub purposes: Vec<Purpose>,
}

/// Service Endpoint Entry
///
/// Used by the [`add-services`](crate::DIDStatePatch::AddServices) and
/// [`replace`](crate::DIDStatePatch::Replace) patch actions.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ServiceEndpointEntry {
    /// Maximum length: 50 in Base64url
    pub id: String,

    /// Maximum length: 30
    pub r#type: String,

    /// URI string or object
    pub service_endpoint: Value,
}

/// DID document state
///
/// What resolving a DID suffix yields. Properties other than `public_keys` and
/// `services` can only appear through `ietf-json-patch`, and are kept as is.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct DocumentState {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_keys: Option<Vec<PublicKeyEntry>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub services: Option<Vec<ServiceEndpointEntry>>,

    #[serde(flatten)]
    pub other_properties: Map<String, Value>,
}

#[derive(Debug, thiserror::Error)]
pub enum InvalidEntry {
    #[error("id `{0}` is longer than {MAX_ID_LENGTH} characters")]
    IdTooLong(String),

    #[error("id `{0}` is not base64url")]
    IdNotBase64Url(String),

    #[error("service type `{0}` is longer than {MAX_SERVICE_TYPE_LENGTH} characters")]
    ServiceTypeTooLong(String),

    #[error("empty type")]
    EmptyType,

    #[error("duplicate purpose {0:?}")]
    DuplicatePurpose(Purpose),

    #[error("empty public key multibase")]
    EmptyMultibase,

    #[error("service endpoint must be a URI string or an object")]
    InvalidServiceEndpoint,

    #[error("invalid public key JWK")]
    PublicKeyJwk(#[from] InvalidPublicKeyJwk),

    #[error("duplicate id `{0}`")]
    DuplicateId(String),
}

fn validate_id(id: &str) -> Result<(), InvalidEntry> {
    if id.len() > MAX_ID_LENGTH {
        return Err(InvalidEntry::IdTooLong(id.to_owned()));
    }
    if id.is_empty()
        || !id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
    {
        return Err(InvalidEntry::IdNotBase64Url(id.to_owned()));
    }
    Ok(())
}

impl PublicKeyEntry {
    pub fn validate(&self) -> Result<(), InvalidEntry> {
        validate_id(&self.id)?;
        if self.r#type.is_empty() {
            return Err(InvalidEntry::EmptyType);
        }
        match &self.public_key {
            PublicKey::PublicKeyJwk(jwk) => jwk.ensure_public()?,
            PublicKey::PublicKeyMultibase(mb) if mb.is_empty() => {
                return Err(InvalidEntry::EmptyMultibase)
            }
            PublicKey::PublicKeyMultibase(_) => (),
        }
        let mut seen = HashSet::new();
        for purpose in &self.purposes {
            if !seen.insert(purpose) {
                return Err(InvalidEntry::DuplicatePurpose(*purpose));
            }
        }
        Ok(())
    }
}

impl ServiceEndpointEntry {
    pub fn validate(&self) -> Result<(), InvalidEntry> {
        validate_id(&self.id)?;
        if self.r#type.is_empty() {
            return Err(InvalidEntry::EmptyType);
        }
        if self.r#type.len() > MAX_SERVICE_TYPE_LENGTH {
            return Err(InvalidEntry::ServiceTypeTooLong(self.r#type.clone()));
        }
        match &self.service_endpoint {
            Value::String(uri) if !uri.is_empty() => Ok(()),
            Value::Object(_) => Ok(()),
            _ => Err(InvalidEntry::InvalidServiceEndpoint),
        }
    }
}

pub(crate) fn ensure_unique_ids<'a>(
    ids: impl IntoIterator<Item = &'a str>,
) -> Result<(), InvalidEntry> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(InvalidEntry::DuplicateId(id.to_owned()));
        }
    }
    Ok(())
}

impl DocumentState {
    /// Check every entry, and that ids are unique among keys and among
    /// services.
    pub fn validate(&self) -> Result<(), InvalidEntry> {
        let public_keys = self.public_keys.iter().flatten();
        public_keys.clone().try_for_each(PublicKeyEntry::validate)?;
        ensure_unique_ids(public_keys.map(|k| k.id.as_str()))?;
        let services = self.services.iter().flatten();
        services.clone().try_for_each(ServiceEndpointEntry::validate)?;
        ensure_unique_ids(services.map(|s| s.id.as_str()))
    }

    pub fn public_key(&self, id: &str) -> Option<&PublicKeyEntry> {
        self.public_keys.iter().flatten().find(|k| k.id == id)
    }

    pub fn service(&self, id: &str) -> Option<&ServiceEndpointEntry> {
        self.services.iter().flatten().find(|s| s.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn key_entry(id: &str) -> Value {
        json!({
            "id": id,
            "type": "EcdsaSecp256k1VerificationKey2019",
            "public_key_jwk": {
                "kty": "EC",
                "crv": "secp256k1",
                "x": "tXSKB_rubXS7sCjXqupVJEzTcW3MsjmEvq1YpXn96Zg",
                "y": "dOicXqbjFxoGJ-K0-GJ1kHYJqic_D_OMuUwkQ7Ol6nk"
            },
            "purposes": ["authentication", "assertionMethod"]
        })
    }

    #[test]
    fn public_key_entry_wire_format() {
        let value = key_entry("key-1");
        let entry: PublicKeyEntry = serde_json::from_value(value.clone()).unwrap();
        entry.validate().unwrap();
        assert!(matches!(entry.public_key, PublicKey::PublicKeyJwk(_)));
        assert_eq!(
            entry.purposes,
            [Purpose::Authentication, Purpose::AssertionMethod]
        );
        assert_eq!(serde_json::to_value(&entry).unwrap(), value);

        let multibase: PublicKeyEntry = serde_json::from_value(json!({
            "id": "key-2",
            "type": "Ed25519VerificationKey2020",
            "public_key_multibase": "z6MkiTBz1ymuepAQ4HEHYSF1H8quG5GLVVQR3djdX3mDooWp",
            "purposes": []
        }))
        .unwrap();
        multibase.validate().unwrap();
    }

    #[test]
    fn id_limits() {
        let long = "a".repeat(51);
        let entry: PublicKeyEntry = serde_json::from_value(key_entry(&long)).unwrap();
        assert!(matches!(entry.validate(), Err(InvalidEntry::IdTooLong(_))));
        let entry: PublicKeyEntry = serde_json::from_value(key_entry("key#1")).unwrap();
        assert!(matches!(
            entry.validate(),
            Err(InvalidEntry::IdNotBase64Url(_))
        ));
        let entry: PublicKeyEntry = serde_json::from_value(key_entry(&"a".repeat(50))).unwrap();
        assert!(entry.validate().is_ok());
    }

    #[test]
    fn service_limits() {
        let service: ServiceEndpointEntry = serde_json::from_value(json!({
            "id": "hub",
            "type": "a".repeat(31),
            "service_endpoint": "https://example.com"
        }))
        .unwrap();
        assert!(matches!(
            service.validate(),
            Err(InvalidEntry::ServiceTypeTooLong(_))
        ));
        let service: ServiceEndpointEntry = serde_json::from_value(json!({
            "id": "hub",
            "type": "IdentityHub",
            "service_endpoint": 42
        }))
        .unwrap();
        assert!(matches!(
            service.validate(),
            Err(InvalidEntry::InvalidServiceEndpoint)
        ));
    }

    #[test]
    fn unknown_purpose() {
        let mut value = key_entry("key-1");
        value["purposes"] = json!(["signing"]);
        assert!(serde_json::from_value::<PublicKeyEntry>(value).is_err());
    }

    #[test]
    fn document_keeps_other_properties() {
        let value = json!({
            "public_keys": [key_entry("key-1")],
            "also_known_as": ["did:example:123"]
        });
        let document: DocumentState = serde_json::from_value(value.clone()).unwrap();
        document.validate().unwrap();
        assert!(document.public_key("key-1").is_some());
        assert!(document.services.is_none());
        assert_eq!(serde_json::to_value(&document).unwrap(), value);
    }

    #[test]
    fn duplicate_ids() {
        let document: DocumentState = serde_json::from_value(json!({
            "public_keys": [key_entry("key-1"), key_entry("key-1")]
        }))
        .unwrap();
        assert!(matches!(
            document.validate(),
            Err(InvalidEntry::DuplicateId(id)) if id == "key-1"
        ));
    }
}
