//! Structural validation of raw operation requests.
//!
//! Requests are parsed tag first: the `type` member selects the expected
//! shape, then every object is checked for missing and unknown members before
//! it is deserialized. No signature is verified and no chain state is
//! consulted here.
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use sidetree_jwk::{InvalidPublicKeyJwk, PublicKeyJwk};
use sidetree_jws::decode_unverified;

use crate::{
    DIDSuffix, DocumentState, EncodedHash, EncodingError, InvalidEntry, OperationRequest,
    OperationType, Protocol, PublicKeyEntry, ServiceEndpointEntry, SignedDataError,
};

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("operation is {size} bytes (maximum {max})")]
    TooLarge { size: usize, max: usize },

    #[error("operation is not JSON")]
    NotJson(#[source] serde_json::Error),

    #[error("operation is not a JSON object")]
    NotAnObject,

    #[error("missing operation type")]
    MissingType,

    #[error("operation type must be a string")]
    InvalidType,

    #[error("unknown operation type `{0}`")]
    UnknownType(String),

    #[error("missing member `{path}`")]
    MissingField { path: String },

    #[error("unexpected member `{path}`")]
    UnknownField { path: String },

    #[error("`{path}` must be {expected}")]
    WrongType { path: String, expected: &'static str },

    #[error("invalid `{path}`")]
    InvalidField {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("delta has {count} patches (maximum {max})")]
    TooManyPatches { count: usize, max: usize },

    #[error("unknown patch action `{action}` at `{path}`")]
    UnknownPatchAction { path: String, action: String },

    #[error("invalid hash at `{path}`")]
    InvalidHash {
        path: String,
        #[source]
        source: EncodingError,
    },

    #[error("invalid signed data at `{path}`")]
    InvalidSignedData {
        path: String,
        #[source]
        source: SignedDataError,
    },

    #[error("invalid entry at `{path}`")]
    InvalidEntry {
        path: String,
        #[source]
        source: InvalidEntry,
    },

    #[error("invalid public key at `{path}`")]
    InvalidPublicKey {
        path: String,
        #[source]
        source: InvalidPublicKeyJwk,
    },
}

/// Validate the structure of a raw operation request.
pub fn validate(protocol: &Protocol, raw: &[u8]) -> Result<OperationRequest, SchemaError> {
    let max = protocol.parameters().max_operation_size;
    if raw.len() > max {
        return Err(SchemaError::TooLarge {
            size: raw.len(),
            max,
        });
    }
    let value: Value = serde_json::from_slice(raw).map_err(SchemaError::NotJson)?;
    let Value::Object(request) = value else {
        return Err(SchemaError::NotAnObject);
    };
    let operation_type = match request.get("type") {
        None => return Err(SchemaError::MissingType),
        Some(Value::String(tag)) => {
            OperationType::from_tag(tag).ok_or_else(|| SchemaError::UnknownType(tag.clone()))?
        }
        Some(_) => return Err(SchemaError::InvalidType),
    };
    let checker = Checker { protocol };
    match operation_type {
        OperationType::Create => {
            checker.members(&request, "", &["type", "suffix_data", "delta"])?;
            let suffix_data = checker.object(
                &request["suffix_data"],
                "suffix_data",
                &["delta_hash", "recovery_commitment"],
            )?;
            checker.hash(&suffix_data["delta_hash"], "suffix_data.delta_hash")?;
            checker.hash(
                &suffix_data["recovery_commitment"],
                "suffix_data.recovery_commitment",
            )?;
            checker.delta(&request["delta"])?;
        }
        OperationType::Update => {
            checker.members(&request, "", &["type", "did_suffix", "signed_data", "delta"])?;
            checker.did_suffix(&request["did_suffix"], "did_suffix")?;
            let payload =
                checker.signed_data(&request["signed_data"], &["update_key", "delta_hash"])?;
            checker.revealed_key(&payload["update_key"], "signed_data.update_key")?;
            checker.hash(&payload["delta_hash"], "signed_data.delta_hash")?;
            checker.delta(&request["delta"])?;
        }
        OperationType::Recover => {
            checker.members(&request, "", &["type", "did_suffix", "signed_data", "delta"])?;
            checker.did_suffix(&request["did_suffix"], "did_suffix")?;
            let payload = checker.signed_data(
                &request["signed_data"],
                &["delta_hash", "recovery_key", "recovery_commitment"],
            )?;
            checker.hash(&payload["delta_hash"], "signed_data.delta_hash")?;
            checker.revealed_key(&payload["recovery_key"], "signed_data.recovery_key")?;
            checker.hash(
                &payload["recovery_commitment"],
                "signed_data.recovery_commitment",
            )?;
            checker.delta(&request["delta"])?;
        }
        OperationType::Deactivate => {
            checker.members(&request, "", &["type", "did_suffix", "signed_data"])?;
            checker.did_suffix(&request["did_suffix"], "did_suffix")?;
            let payload =
                checker.signed_data(&request["signed_data"], &["did_suffix", "recovery_key"])?;
            checker.did_suffix(&payload["did_suffix"], "signed_data.did_suffix")?;
            checker.revealed_key(&payload["recovery_key"], "signed_data.recovery_key")?;
        }
    }
    parse(Value::Object(request), "")
}

/// Operation type and target suffix of a request, as far as they can be read
/// without validating it.
pub(crate) fn describe(raw: &[u8]) -> (Option<OperationType>, Option<DIDSuffix>) {
    let Ok(Value::Object(request)) = serde_json::from_slice::<Value>(raw) else {
        return (None, None);
    };
    let operation_type = request
        .get("type")
        .and_then(Value::as_str)
        .and_then(OperationType::from_tag);
    let did_suffix = request
        .get("did_suffix")
        .and_then(Value::as_str)
        .map(DIDSuffix::from);
    (operation_type, did_suffix)
}

fn join(path: &str, member: &str) -> String {
    if path.is_empty() {
        member.to_owned()
    } else {
        format!("{path}.{member}")
    }
}

fn parse<T: DeserializeOwned>(value: Value, path: &str) -> Result<T, SchemaError> {
    serde_json::from_value(value).map_err(|source| SchemaError::InvalidField {
        path: path.to_owned(),
        source,
    })
}

struct Checker<'a> {
    protocol: &'a Protocol,
}

impl Checker<'_> {
    /// `object` must have every member of `required`, and nothing else.
    fn members(
        &self,
        object: &Map<String, Value>,
        path: &str,
        required: &[&str],
    ) -> Result<(), SchemaError> {
        self.members_optional(object, path, required, &[])
    }

    fn members_optional(
        &self,
        object: &Map<String, Value>,
        path: &str,
        required: &[&str],
        optional: &[&str],
    ) -> Result<(), SchemaError> {
        if let Some(missing) = required.iter().find(|name| !object.contains_key(**name)) {
            return Err(SchemaError::MissingField {
                path: join(path, missing),
            });
        }
        if let Some(unknown) = object
            .keys()
            .find(|name| !required.contains(&name.as_str()) && !optional.contains(&name.as_str()))
        {
            return Err(SchemaError::UnknownField {
                path: join(path, unknown),
            });
        }
        Ok(())
    }

    fn object<'v>(
        &self,
        value: &'v Value,
        path: &str,
        required: &[&str],
    ) -> Result<&'v Map<String, Value>, SchemaError> {
        let object = value.as_object().ok_or_else(|| SchemaError::WrongType {
            path: path.to_owned(),
            expected: "an object",
        })?;
        self.members(object, path, required)?;
        Ok(object)
    }

    fn string<'v>(&self, value: &'v Value, path: &str) -> Result<&'v str, SchemaError> {
        value.as_str().ok_or_else(|| SchemaError::WrongType {
            path: path.to_owned(),
            expected: "a string",
        })
    }

    fn array<'v>(&self, value: &'v Value, path: &str) -> Result<&'v [Value], SchemaError> {
        value
            .as_array()
            .map(Vec::as_slice)
            .ok_or_else(|| SchemaError::WrongType {
                path: path.to_owned(),
                expected: "an array",
            })
    }

    fn hash(&self, value: &Value, path: &str) -> Result<(), SchemaError> {
        let hash = EncodedHash::from(self.string(value, path)?);
        self.protocol
            .decode_hash(&hash)
            .map(|_| ())
            .map_err(|source| SchemaError::InvalidHash {
                path: path.to_owned(),
                source,
            })
    }

    fn did_suffix(&self, value: &Value, path: &str) -> Result<(), SchemaError> {
        let suffix = DIDSuffix::from(self.string(value, path)?);
        self.protocol
            .validate_did_suffix(&suffix)
            .map_err(|source| SchemaError::InvalidHash {
                path: path.to_owned(),
                source,
            })
    }

    fn revealed_key(&self, value: &Value, path: &str) -> Result<(), SchemaError> {
        if !value.is_object() {
            return Err(SchemaError::WrongType {
                path: path.to_owned(),
                expected: "an object",
            });
        }
        let key: PublicKeyJwk = parse(value.clone(), path)?;
        key.ensure_public()
            .map_err(|source| SchemaError::InvalidPublicKey {
                path: path.to_owned(),
                source,
            })
    }

    /// Decode a compact JWS and check its payload members.
    fn signed_data(
        &self,
        value: &Value,
        required: &[&str],
    ) -> Result<Map<String, Value>, SchemaError> {
        const PATH: &str = "signed_data";
        let compact = self.string(value, PATH)?;
        let decoded = decode_unverified(compact).map_err(|e| SchemaError::InvalidSignedData {
            path: PATH.to_owned(),
            source: e.into(),
        })?;
        let payload: Value = serde_json::from_slice(&decoded.payload).map_err(|e| {
            SchemaError::InvalidSignedData {
                path: PATH.to_owned(),
                source: SignedDataError::Payload(e),
            }
        })?;
        let Value::Object(payload) = payload else {
            return Err(SchemaError::WrongType {
                path: PATH.to_owned(),
                expected: "a JWS with a JSON object payload",
            });
        };
        self.members(&payload, PATH, required)?;
        Ok(payload)
    }

    fn delta(&self, value: &Value) -> Result<(), SchemaError> {
        const PATH: &str = "delta";
        let delta = self.object(value, PATH, &["update_commitment", "patches"])?;
        self.hash(&delta["update_commitment"], "delta.update_commitment")?;
        let patches = self.array(&delta["patches"], "delta.patches")?;
        let max = self.protocol.parameters().max_patches_per_delta;
        if patches.len() > max {
            return Err(SchemaError::TooManyPatches {
                count: patches.len(),
                max,
            });
        }
        for (i, patch) in patches.iter().enumerate() {
            self.patch(patch, &format!("delta.patches[{i}]"))?;
        }
        Ok(())
    }

    fn patch(&self, value: &Value, path: &str) -> Result<(), SchemaError> {
        let patch = value.as_object().ok_or_else(|| SchemaError::WrongType {
            path: path.to_owned(),
            expected: "an object",
        })?;
        let action = match patch.get("action") {
            None => {
                return Err(SchemaError::MissingField {
                    path: join(path, "action"),
                })
            }
            Some(action) => self.string(action, &join(path, "action"))?,
        };
        match action {
            "add-public-keys" => {
                self.members(patch, path, &["action", "public_keys"])?;
                let keys_path = join(path, "public_keys");
                let entries = self.array(&patch["public_keys"], &keys_path)?;
                for (i, entry) in entries.iter().enumerate() {
                    self.public_key_entry(entry, &format!("{keys_path}[{i}]"))?;
                }
            }
            "add-services" => {
                self.members(patch, path, &["action", "services"])?;
                let services_path = join(path, "services");
                let entries = self.array(&patch["services"], &services_path)?;
                for (i, entry) in entries.iter().enumerate() {
                    self.service_entry(entry, &format!("{services_path}[{i}]"))?;
                }
            }
            "remove-public-keys" | "remove-services" => {
                self.members(patch, path, &["action", "ids"])?;
                let ids_path = join(path, "ids");
                for (i, id) in self.array(&patch["ids"], &ids_path)?.iter().enumerate() {
                    self.string(id, &format!("{ids_path}[{i}]"))?;
                }
            }
            "replace" => {
                self.members(patch, path, &["action", "document"])?;
                self.replace_document(&patch["document"], &join(path, "document"))?;
            }
            "ietf-json-patch" => {
                self.members(patch, path, &["action", "patches"])?;
                let patches_path = join(path, "patches");
                self.array(&patch["patches"], &patches_path)?;
                parse::<json_patch::Patch>(patch["patches"].clone(), &patches_path)?;
            }
            _ => {
                return Err(SchemaError::UnknownPatchAction {
                    path: path.to_owned(),
                    action: action.to_owned(),
                })
            }
        }
        Ok(())
    }

    fn public_key_entry(&self, value: &Value, path: &str) -> Result<PublicKeyEntry, SchemaError> {
        let object = value.as_object().ok_or_else(|| SchemaError::WrongType {
            path: path.to_owned(),
            expected: "an object",
        })?;
        let key_member = match (
            object.contains_key("public_key_jwk"),
            object.contains_key("public_key_multibase"),
        ) {
            (true, false) => "public_key_jwk",
            (false, true) => "public_key_multibase",
            (true, true) => {
                return Err(SchemaError::UnknownField {
                    path: join(path, "public_key_multibase"),
                })
            }
            (false, false) => {
                return Err(SchemaError::MissingField {
                    path: join(path, "public_key_jwk"),
                })
            }
        };
        let required = ["id", "type", key_member, "purposes"];
        self.members_optional(object, path, &required, &["controller"])?;
        let entry: PublicKeyEntry = parse(value.clone(), path)?;
        entry.validate().map_err(|source| SchemaError::InvalidEntry {
            path: path.to_owned(),
            source,
        })?;
        Ok(entry)
    }

    fn service_entry(
        &self,
        value: &Value,
        path: &str,
    ) -> Result<ServiceEndpointEntry, SchemaError> {
        self.object(value, path, &["id", "type", "service_endpoint"])?;
        let entry: ServiceEndpointEntry = parse(value.clone(), path)?;
        entry.validate().map_err(|source| SchemaError::InvalidEntry {
            path: path.to_owned(),
            source,
        })?;
        Ok(entry)
    }

    /// A replacement document holds only public keys and services.
    fn replace_document(&self, value: &Value, path: &str) -> Result<(), SchemaError> {
        let object = value.as_object().ok_or_else(|| SchemaError::WrongType {
            path: path.to_owned(),
            expected: "an object",
        })?;
        self.members_optional(object, path, &[], &["public_keys", "services"])?;
        let mut document = DocumentState::default();
        if let Some(keys) = object.get("public_keys") {
            let keys_path = join(path, "public_keys");
            document.public_keys = Some(
                self.array(keys, &keys_path)?
                    .iter()
                    .enumerate()
                    .map(|(i, entry)| self.public_key_entry(entry, &format!("{keys_path}[{i}]")))
                    .collect::<Result<_, _>>()?,
            );
        }
        if let Some(services) = object.get("services") {
            let services_path = join(path, "services");
            document.services = Some(
                self.array(services, &services_path)?
                    .iter()
                    .enumerate()
                    .map(|(i, entry)| self.service_entry(entry, &format!("{services_path}[{i}]")))
                    .collect::<Result<_, _>>()?,
            );
        }
        document.validate().map_err(|source| SchemaError::InvalidEntry {
            path: path.to_owned(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use rand_chacha::{rand_core::SeedableRng, ChaCha20Rng};
    use serde_json::json;
    use sidetree_jwk::SecretKey;

    use super::*;
    use crate::{OperationBuilder, ProtocolParameters};

    fn protocol() -> Protocol {
        Protocol::default()
    }

    fn create_request() -> Value {
        let protocol = protocol();
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        let update = SecretKey::generate_secp256k1_from(&mut rng).to_public();
        let recovery = SecretKey::generate_secp256k1_from(&mut rng).to_public();
        let request = OperationBuilder::new(&protocol)
            .create(&update, &recovery, Vec::new())
            .unwrap();
        serde_json::to_value(&request).unwrap()
    }

    fn validate_value(value: &Value) -> Result<OperationRequest, SchemaError> {
        validate(&protocol(), &serde_json::to_vec(value).unwrap())
    }

    #[test]
    fn accepts_create() {
        let request = validate_value(&create_request()).unwrap();
        assert_eq!(request.operation_type(), OperationType::Create);
    }

    #[test]
    fn envelope_errors() {
        assert!(matches!(
            validate(&protocol(), b"not json"),
            Err(SchemaError::NotJson(_))
        ));
        assert!(matches!(
            validate(&protocol(), b"[]"),
            Err(SchemaError::NotAnObject)
        ));
        assert!(matches!(
            validate_value(&json!({})),
            Err(SchemaError::MissingType)
        ));
        assert!(matches!(
            validate_value(&json!({ "type": 1 })),
            Err(SchemaError::InvalidType)
        ));
        assert!(matches!(
            validate_value(&json!({ "type": "resolve" })),
            Err(SchemaError::UnknownType(t)) if t == "resolve"
        ));
    }

    #[test]
    fn too_large() {
        let protocol = Protocol::new(ProtocolParameters {
            max_operation_size: 10,
            ..Default::default()
        })
        .unwrap();
        let err = validate(&protocol, br#"{"type":"create"}"#).unwrap_err();
        assert!(matches!(err, SchemaError::TooLarge { size: 17, max: 10 }));
    }

    #[test]
    fn strict_members() {
        let mut request = create_request();
        request["extra"] = json!(true);
        let err = validate_value(&request).unwrap_err();
        assert!(matches!(err, SchemaError::UnknownField { path } if path == "extra"));

        let mut request = create_request();
        request.as_object_mut().unwrap().remove("delta");
        let err = validate_value(&request).unwrap_err();
        assert!(matches!(err, SchemaError::MissingField { path } if path == "delta"));

        let mut request = create_request();
        request["suffix_data"]["did_suffix"] = json!("x");
        let err = validate_value(&request).unwrap_err();
        assert!(
            matches!(err, SchemaError::UnknownField { path } if path == "suffix_data.did_suffix")
        );
    }

    #[test]
    fn malformed_hash() {
        let mut request = create_request();
        request["suffix_data"]["delta_hash"] = json!("not a multihash");
        let err = validate_value(&request).unwrap_err();
        assert!(
            matches!(err, SchemaError::InvalidHash { path, .. } if path == "suffix_data.delta_hash")
        );

        let mut request = create_request();
        request["delta"]["update_commitment"] = json!(12);
        let err = validate_value(&request).unwrap_err();
        assert!(
            matches!(err, SchemaError::WrongType { path, .. } if path == "delta.update_commitment")
        );
    }

    #[test]
    fn patch_checks() {
        let mut request = create_request();
        request["delta"]["patches"] = json!([{ "action": "add-everything" }]);
        let err = validate_value(&request).unwrap_err();
        assert!(matches!(
            err,
            SchemaError::UnknownPatchAction { action, .. } if action == "add-everything"
        ));

        let mut request = create_request();
        request["delta"]["patches"] = json!([{
            "action": "add-services",
            "services": [{
                "id": "service-1",
                "type": "AVeryLongServiceTypeThatGoesOnAndOn",
                "service_endpoint": "https://example.com"
            }]
        }]);
        let err = validate_value(&request).unwrap_err();
        assert!(matches!(
            err,
            SchemaError::InvalidEntry { path, source: InvalidEntry::ServiceTypeTooLong(_) }
                if path == "delta.patches[0].services[0]"
        ));

        let mut request = create_request();
        request["delta"]["patches"] = json!([{
            "action": "add-public-keys",
            "public_keys": [{
                "id": "key-1",
                "type": "JsonWebKey2020",
                "public_key_jwk": {
                    "kty": "EC",
                    "crv": "secp256k1",
                    "x": "tXSKB_rubXS7sCjXqupVJEzTcW3MsjmEvq1YpXn96Zg",
                    "y": "dOicXqbjFxoGJ-K0-GJ1kHYJqic_D_OMuUwkQ7Ol6nk",
                    "d": "secret"
                },
                "purposes": ["authentication"]
            }]
        }]);
        let err = validate_value(&request).unwrap_err();
        assert!(matches!(
            err,
            SchemaError::InvalidEntry { source: InvalidEntry::PublicKeyJwk(_), .. }
        ));

        let mut request = create_request();
        request["delta"]["patches"] = json!([{
            "action": "add-public-keys",
            "public_keys": [{
                "id": "key-1",
                "type": "JsonWebKey2020",
                "public_key_multibase": "z6Mk",
                "purposes": ["signing"]
            }]
        }]);
        let err = validate_value(&request).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidField { .. }));
    }

    #[test]
    fn too_many_patches() {
        let protocol = Protocol::new(ProtocolParameters {
            max_patches_per_delta: 1,
            ..Default::default()
        })
        .unwrap();
        let mut request = create_request();
        request["delta"]["patches"] = json!([
            { "action": "remove-services", "ids": ["a"] },
            { "action": "remove-services", "ids": ["b"] }
        ]);
        let err = validate(&protocol, &serde_json::to_vec(&request).unwrap()).unwrap_err();
        assert!(matches!(err, SchemaError::TooManyPatches { count: 2, max: 1 }));
    }

    #[test]
    fn signed_data_checks() {
        let create = create_request();
        let suffix = protocol()
            .did_suffix(&serde_json::from_value(create["suffix_data"].clone()).unwrap())
            .unwrap();
        let deactivate = |signed_data: Value| {
            json!({
                "type": "deactivate",
                "did_suffix": suffix,
                "signed_data": signed_data,
            })
        };

        let err = validate_value(&deactivate(json!("a.b"))).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidSignedData { .. }));

        let mut rng = ChaCha20Rng::seed_from_u64(2);
        let key = SecretKey::generate_secp256k1_from(&mut rng);
        let payload = json!({
            "did_suffix": suffix,
            "recovery_key": key.to_public(),
            "extra": 1
        });
        let jws = sidetree_jws::encode_sign(&payload.to_string(), &key).unwrap();
        let err = validate_value(&deactivate(json!(jws))).unwrap_err();
        assert!(matches!(err, SchemaError::UnknownField { path } if path == "signed_data.extra"));

        let payload = json!({
            "did_suffix": suffix,
            "recovery_key": key.to_public(),
        });
        let jws = sidetree_jws::encode_sign(&payload.to_string(), &key).unwrap();
        let request = validate_value(&deactivate(json!(jws))).unwrap();
        assert_eq!(request.operation_type(), OperationType::Deactivate);
    }

    #[test]
    fn describe_request() {
        assert_eq!(
            describe(br#"{"type":"update","did_suffix":"abc"}"#),
            (Some(OperationType::Update), Some(DIDSuffix::from("abc")))
        );
        assert_eq!(describe(b"nope"), (None, None));
    }
}
