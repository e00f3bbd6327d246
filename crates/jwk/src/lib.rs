#![cfg_attr(docsrs, feature(doc_auto_cfg))]
//! Public key JWKs as they appear inside Sidetree operations, and the signing
//! keys used to produce them.
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

mod utils;
pub use utils::Base64urlUInt;

pub mod algorithm;
pub use algorithm::{Algorithm, UnsupportedAlgorithm};

mod params;
pub use params::*;

mod secret;
pub use secret::*;

// RFC 7517 - JSON Web Key (JWK)
// RFC 7518 - JSON Web Algorithms (JWA)
// RFC 8037 - CFRG ECDH and Signatures in JOSE

/// Public Key JWK (JSON Web Key)
///
/// Keeps the JWK members exactly as they were received, so that the
/// canonical form (and therefore the commitment hash) of a revealed key is the
/// one its owner computed. An optional `nonce` member is allowed, private key
/// members are not.
///
/// Reference: [Sidetree §6.2.2 JWK Nonce](https://identity.foundation/sidetree/spec/#jwk-nonce)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PublicKeyJwk {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<Base64urlUInt>,
    #[serde(flatten)]
    jwk: Map<String, Value>,
}

#[derive(Debug, thiserror::Error)]
pub enum InvalidPublicKeyJwk {
    #[error("public key JWK must be a JSON object")]
    NotAnObject,

    #[error("public key JWK must not contain private key parameter `{0}`")]
    PrivateKeyParameter(&'static str),

    #[error("missing JWK member `{0}`")]
    MissingMember(&'static str),

    #[error("invalid JWK member `{0}`")]
    InvalidMember(&'static str),

    #[error("unsupported key type `{0}`")]
    UnsupportedKeyType(String),

    #[error("unsupported curve `{0}`")]
    UnsupportedCurve(String),
}

impl PublicKeyJwk {
    /// Parse and check the key parameters.
    pub fn params(&self) -> Result<Params, InvalidPublicKeyJwk> {
        Params::from_members(&self.jwk)
    }

    /// Check only that no private key member is present. Keys of any type
    /// pass, including ones [`params`](Self::params) does not support.
    pub fn ensure_public(&self) -> Result<(), InvalidPublicKeyJwk> {
        params::ensure_public(&self.jwk)
    }

    /// JWK members, excluding `nonce`.
    pub fn members(&self) -> &Map<String, Value> {
        &self.jwk
    }

    pub fn with_nonce(mut self, nonce: Base64urlUInt) -> Self {
        self.nonce = Some(nonce);
        self
    }
}

impl TryFrom<Value> for PublicKeyJwk {
    type Error = InvalidPublicKeyJwk;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let Value::Object(mut jwk) = value else {
            return Err(InvalidPublicKeyJwk::NotAnObject);
        };
        let nonce = match jwk.remove("nonce") {
            None => None,
            Some(Value::String(nonce)) => Some(
                Base64urlUInt::try_from(nonce.as_str())
                    .map_err(|_| InvalidPublicKeyJwk::InvalidMember("nonce"))?,
            ),
            Some(_) => return Err(InvalidPublicKeyJwk::InvalidMember("nonce")),
        };
        Params::from_members(&jwk)?;
        Ok(Self { nonce, jwk })
    }
}

impl From<PublicKeyJwk> for Value {
    fn from(pkjwk: PublicKeyJwk) -> Self {
        let mut jwk = pkjwk.jwk;
        if let Some(nonce) = pkjwk.nonce {
            jwk.insert("nonce".to_owned(), Value::String(String::from(&nonce)));
        }
        Value::Object(jwk)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reject_private_key_parameters() {
        let err = PublicKeyJwk::try_from(json!({
            "kty": "EC",
            "crv": "secp256k1",
            "x": "tXSKB_rubXS7sCjXqupVJEzTcW3MsjmEvq1YpXn96Zg",
            "y": "dOicXqbjFxoGJ-K0-GJ1kHYJqic_D_OMuUwkQ7Ol6nk",
            "d": "K44dAtJ-MMl-JKuOupfcGRPI5n3ZVH_Gk65c6Rcgn_I"
        }))
        .unwrap_err();
        assert!(matches!(err, InvalidPublicKeyJwk::PrivateKeyParameter("d")));
    }

    #[test]
    fn parse_secp256k1() {
        let jwk = PublicKeyJwk::try_from(json!({
            "kty": "EC",
            "crv": "secp256k1",
            "x": "tXSKB_rubXS7sCjXqupVJEzTcW3MsjmEvq1YpXn96Zg",
            "y": "dOicXqbjFxoGJ-K0-GJ1kHYJqic_D_OMuUwkQ7Ol6nk"
        }))
        .unwrap();
        let params = jwk.params().unwrap();
        assert_eq!(params.curve(), CURVE_SECP256K1);
        assert_eq!(params.algorithm(), Algorithm::ES256K);
    }

    #[test]
    fn nonce_round_trip() {
        let value = json!({
            "kty": "OKP",
            "crv": "Ed25519",
            "x": "11qYAYKxCrfVS_7TyWQHOg7hcvPapiMlrwIaaPcHURo",
            "nonce": "AAECAwQFBgcICQoLDA0ODw"
        });
        let jwk = PublicKeyJwk::try_from(value.clone()).unwrap();
        assert!(jwk.nonce.is_some());
        assert!(!jwk.members().contains_key("nonce"));
        assert_eq!(serde_json::to_value(&jwk).unwrap(), value);
        let deserialized: PublicKeyJwk = serde_json::from_value(value).unwrap();
        assert_eq!(deserialized, jwk);
    }

    #[test]
    fn reject_unsupported_curve() {
        let err = PublicKeyJwk::try_from(json!({
            "kty": "EC",
            "crv": "P-384",
            "x": "AA",
            "y": "AA"
        }))
        .unwrap_err();
        assert!(matches!(err, InvalidPublicKeyJwk::UnsupportedCurve(_)));
    }

    #[test]
    fn ensure_public_accepts_any_key_type() {
        let jwk: PublicKeyJwk = serde_json::from_value(json!({
            "kty": "OKP",
            "crv": "X25519",
            "x": "hSDwCYkwp1R0i33ctD73Wg2_Og0mOBr066SpjqqbTmo"
        }))
        .unwrap();
        assert!(jwk.ensure_public().is_ok());
        assert!(jwk.params().is_err());

        let private: PublicKeyJwk = serde_json::from_value(json!({
            "kty": "oct",
            "k": "AAAA"
        }))
        .unwrap();
        assert!(matches!(
            private.ensure_public(),
            Err(InvalidPublicKeyJwk::PrivateKeyParameter("k"))
        ));
    }
}
