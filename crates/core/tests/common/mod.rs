#![allow(dead_code)]
use rand_chacha::{rand_core::SeedableRng, ChaCha20Rng};
use serde_json::json;
use sidetree_core::{
    CreateRequest, DIDStatePatch, DIDSuffix, OperationBuilder, OperationRequest, Protocol,
};
use sidetree_jwk::{PublicKeyJwk, SecretKey};

pub fn rng(seed: u64) -> ChaCha20Rng {
    ChaCha20Rng::seed_from_u64(seed)
}

pub fn secp256k1(rng: &mut ChaCha20Rng) -> SecretKey {
    SecretKey::generate_secp256k1_from(rng)
}

pub fn add_public_key(id: &str, key: &PublicKeyJwk) -> DIDStatePatch {
    serde_json::from_value(json!({
        "action": "add-public-keys",
        "public_keys": [{
            "id": id,
            "type": "JsonWebKey2020",
            "public_key_jwk": key,
            "purposes": ["authentication", "assertionMethod"]
        }]
    }))
    .unwrap()
}

pub fn remove_public_keys(ids: &[&str]) -> DIDStatePatch {
    serde_json::from_value(json!({ "action": "remove-public-keys", "ids": ids })).unwrap()
}

pub fn add_service(id: &str) -> DIDStatePatch {
    serde_json::from_value(json!({
        "action": "add-services",
        "services": [{
            "id": id,
            "type": "LinkedDomains",
            "service_endpoint": format!("https://{id}.example.com")
        }]
    }))
    .unwrap()
}

pub fn raw(request: impl Into<OperationRequest>) -> Vec<u8> {
    request.into().to_vec().unwrap()
}

/// Keys controlling one DID.
pub struct Controller {
    pub update: SecretKey,
    pub recovery: SecretKey,
}

impl Controller {
    pub fn new(rng: &mut ChaCha20Rng) -> Self {
        Self {
            update: secp256k1(rng),
            recovery: secp256k1(rng),
        }
    }

    pub fn create(
        &self,
        protocol: &Protocol,
        patches: Vec<DIDStatePatch>,
    ) -> (DIDSuffix, CreateRequest) {
        let create = OperationBuilder::new(protocol)
            .create(&self.update.to_public(), &self.recovery.to_public(), patches)
            .unwrap();
        (create.did_suffix(protocol).unwrap(), create)
    }
}
