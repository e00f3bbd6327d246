use core::fmt;

use base64::Engine;
use rand::{CryptoRng, RngCore};
use serde_json::{Map, Value};

use crate::{Algorithm, PublicKeyJwk};

/// Private signing key for one of the supported curves.
///
/// Used to produce the signed data of Update, Recover and Deactivate
/// operations. The secret never leaves this type in serialized form.
#[derive(Clone)]
pub enum SecretKey {
    #[cfg(feature = "secp256k1")]
    Secp256k1(k256::ecdsa::SigningKey),

    #[cfg(feature = "secp256r1")]
    P256(p256::ecdsa::SigningKey),

    #[cfg(feature = "ed25519")]
    Ed25519(ed25519_dalek::SigningKey),
}

impl SecretKey {
    #[cfg(feature = "secp256k1")]
    pub fn generate_secp256k1() -> Self {
        Self::generate_secp256k1_from(&mut rand::rngs::OsRng)
    }

    #[cfg(feature = "secp256k1")]
    pub fn generate_secp256k1_from<R: CryptoRng + RngCore>(rng: &mut R) -> Self {
        Self::Secp256k1(k256::ecdsa::SigningKey::random(rng))
    }

    #[cfg(feature = "secp256r1")]
    pub fn generate_p256() -> Self {
        Self::generate_p256_from(&mut rand::rngs::OsRng)
    }

    #[cfg(feature = "secp256r1")]
    pub fn generate_p256_from<R: CryptoRng + RngCore>(rng: &mut R) -> Self {
        Self::P256(p256::ecdsa::SigningKey::random(rng))
    }

    #[cfg(feature = "ed25519")]
    pub fn generate_ed25519() -> Self {
        Self::generate_ed25519_from(&mut rand::rngs::OsRng)
    }

    #[cfg(feature = "ed25519")]
    pub fn generate_ed25519_from<R: CryptoRng + RngCore>(rng: &mut R) -> Self {
        let mut secret = [0u8; 32];
        rng.fill_bytes(&mut secret);
        Self::Ed25519(ed25519_dalek::SigningKey::from_bytes(&secret))
    }

    /// Signature algorithm used with this key.
    pub fn algorithm(&self) -> Algorithm {
        match self {
            #[cfg(feature = "secp256k1")]
            Self::Secp256k1(_) => Algorithm::ES256K,
            #[cfg(feature = "secp256r1")]
            Self::P256(_) => Algorithm::ES256,
            #[cfg(feature = "ed25519")]
            Self::Ed25519(_) => Algorithm::EdDSA,
        }
    }

    /// Public half of the key, as a JWK.
    pub fn to_public(&self) -> PublicKeyJwk {
        let mut jwk = Map::new();
        match self {
            #[cfg(feature = "secp256k1")]
            Self::Secp256k1(key) => {
                let point = key.verifying_key().to_encoded_point(false);
                insert_ec(&mut jwk, crate::CURVE_SECP256K1, point.as_bytes());
            }
            #[cfg(feature = "secp256r1")]
            Self::P256(key) => {
                let point = key.verifying_key().to_encoded_point(false);
                insert_ec(&mut jwk, crate::CURVE_P256, point.as_bytes());
            }
            #[cfg(feature = "ed25519")]
            Self::Ed25519(key) => {
                jwk.insert("kty".to_owned(), Value::String("OKP".to_owned()));
                jwk.insert(
                    "crv".to_owned(),
                    Value::String(crate::CURVE_ED25519.to_owned()),
                );
                jwk.insert(
                    "x".to_owned(),
                    Value::String(encode(key.verifying_key().as_bytes())),
                );
            }
        }
        PublicKeyJwk { nonce: None, jwk }
    }
}

/// Uncompressed SEC1 point: `0x04 || x || y`.
#[cfg(any(feature = "secp256k1", feature = "secp256r1"))]
fn insert_ec(jwk: &mut Map<String, Value>, curve: &str, sec1: &[u8]) {
    let (x, y) = sec1[1..].split_at(32);
    jwk.insert("kty".to_owned(), Value::String("EC".to_owned()));
    jwk.insert("crv".to_owned(), Value::String(curve.to_owned()));
    jwk.insert("x".to_owned(), Value::String(encode(x)));
    jwk.insert("y".to_owned(), Value::String(encode(y)));
}

#[cfg(any(feature = "secp256k1", feature = "secp256r1", feature = "ed25519"))]
fn encode(bytes: &[u8]) -> String {
    base64::prelude::BASE64_URL_SAFE_NO_PAD.encode(bytes)
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretKey")
            .field("algorithm", &self.algorithm())
            .finish_non_exhaustive()
    }
}
