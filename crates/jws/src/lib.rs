#![cfg_attr(docsrs, feature(doc_auto_cfg))]
//! Compact JSON Web Signatures (RFC 7515) as used for Sidetree signed data.
//!
//! Only the compact serialization with a base64url encoded payload is
//! supported. Signing and verification go through the key types of
//! [`sidetree_jwk`].
use std::collections::BTreeMap;

use base64::Engine;
use serde::{Deserialize, Serialize};
use sidetree_jwk::{Algorithm, PublicKeyJwk, SecretKey};

mod error;
pub use error::Error;

mod verify;
pub use verify::*;

// RFC 7515 - JSON Web Signature (JWS)

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Header {
    #[serde(rename = "alg")]
    pub algorithm: Algorithm,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(rename = "kid")]
    pub key_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(rename = "typ")]
    pub type_: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(rename = "crit")]
    pub critical: Option<Vec<String>>,

    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    #[serde(flatten)]
    pub additional_parameters: BTreeMap<String, serde_json::Value>,
}

impl Header {
    pub fn new(algorithm: Algorithm) -> Self {
        Self {
            algorithm,
            key_id: None,
            type_: None,
            critical: None,
            additional_parameters: BTreeMap::new(),
        }
    }
}

fn base64_encode_json<T: Serialize>(object: &T) -> Result<String, Error> {
    let json = serde_json::to_string(&object).map_err(Error::HeaderEncoding)?;
    Ok(base64::prelude::BASE64_URL_SAFE_NO_PAD.encode(json))
}

fn base64_decode(segment: &'static str, data: &str) -> Result<Vec<u8>, Error> {
    base64::prelude::BASE64_URL_SAFE_NO_PAD
        .decode(data)
        .map_err(|source| Error::Base64 { segment, source })
}

/// Sign `data` with the algorithm of `key`.
pub fn sign_bytes(data: &[u8], key: &SecretKey) -> Result<Vec<u8>, Error> {
    let signature = match key {
        #[cfg(feature = "secp256k1")]
        SecretKey::Secp256k1(signing_key) => {
            use k256::ecdsa::signature::Signer;
            let sig: k256::ecdsa::Signature =
                signing_key.try_sign(data).map_err(|_| Error::Signing)?;
            sig.to_bytes().to_vec()
        }
        #[cfg(feature = "secp256r1")]
        SecretKey::P256(signing_key) => {
            use p256::ecdsa::signature::Signer;
            let sig: p256::ecdsa::Signature =
                signing_key.try_sign(data).map_err(|_| Error::Signing)?;
            sig.to_bytes().to_vec()
        }
        #[cfg(feature = "ed25519")]
        SecretKey::Ed25519(signing_key) => {
            use ed25519_dalek::Signer;
            signing_key
                .try_sign(data)
                .map_err(|_| Error::Signing)?
                .to_bytes()
                .to_vec()
        }
    };
    Ok(signature)
}

/// Produce a compact JWS over `payload`, with a header naming only the
/// algorithm of `key`.
pub fn encode_sign(payload: &str, key: &SecretKey) -> Result<String, Error> {
    let header = Header::new(key.algorithm());
    let header_b64 = base64_encode_json(&header)?;
    let payload_b64 = base64::prelude::BASE64_URL_SAFE_NO_PAD.encode(payload);
    let signing_input = header_b64 + "." + &payload_b64;
    let signature = sign_bytes(signing_input.as_bytes(), key)?;
    let sig_b64 = base64::prelude::BASE64_URL_SAFE_NO_PAD.encode(signature);
    Ok([signing_input, sig_b64].join("."))
}

pub fn split_jws(jws: &str) -> Result<(&str, &str, &str), Error> {
    let mut parts = jws.splitn(3, '.');
    Ok(
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(a), Some(b), Some(c), None) if !c.contains('.') => (a, b, c),
            _ => return Err(Error::InvalidJws),
        },
    )
}

#[derive(Debug, Clone)]
pub struct DecodedJws {
    pub header: Header,
    pub signing_input: Vec<u8>,
    pub payload: Vec<u8>,
    pub signature: Vec<u8>,
}

/// Decode JWS parts (JOSE header, payload, and signature) into useful values.
///
/// "crit" (critical) header parameters are checked and disallowed, since no
/// extension is understood here.
pub fn decode_jws_parts(
    header_b64: &str,
    payload_b64: &str,
    signature_b64: &str,
) -> Result<DecodedJws, Error> {
    let signature = base64_decode("signature", signature_b64)?;
    let header_json = base64_decode("header", header_b64)?;
    let header: Header = serde_json::from_slice(&header_json).map_err(Error::InvalidHeader)?;
    let payload = base64_decode("payload", payload_b64)?;
    for name in header.critical.iter().flatten() {
        match name.as_str() {
            "alg" | "jku" | "jwk" | "kid" | "x5u" | "x5c" | "x5t" | "x5t#S256" | "typ" | "cty"
            | "crit" => return Err(Error::InvalidCriticalHeader(name.clone())),
            _ => return Err(Error::UnknownCriticalHeader(name.clone())),
        }
    }
    let signing_input = [header_b64.as_bytes(), b".", payload_b64.as_bytes()].concat();
    Ok(DecodedJws {
        header,
        signing_input,
        payload,
        signature,
    })
}

/// Decode a compact JWS without checking its signature.
pub fn decode_unverified(jws: &str) -> Result<DecodedJws, Error> {
    let (header_b64, payload_b64, signature_b64) = split_jws(jws)?;
    decode_jws_parts(header_b64, payload_b64, signature_b64)
}

/// Decode a compact JWS and verify it against `key`. Returns the header and
/// the decoded payload.
pub fn decode_verify(
    jws: &str,
    key: &PublicKeyJwk,
    verifier: &impl SignatureVerifier,
) -> Result<(Header, Vec<u8>), Error> {
    let DecodedJws {
        header,
        signing_input,
        payload,
        signature,
    } = decode_unverified(jws)?;
    verifier.verify(header.algorithm, key, &signing_input, &signature)?;
    Ok((header, payload))
}

#[cfg(test)]
mod tests {
    use rand_chacha::{rand_core::SeedableRng, ChaCha20Rng};

    use super::*;

    #[test]
    fn split() {
        assert_eq!(split_jws("a.b.c").unwrap(), ("a", "b", "c"));
        assert!(matches!(split_jws("a.b"), Err(Error::InvalidJws)));
        assert!(matches!(split_jws("a.b.c.d"), Err(Error::InvalidJws)));
        assert!(matches!(split_jws(""), Err(Error::InvalidJws)));
    }

    #[test]
    fn reject_crit() {
        let header = base64_encode_json(&serde_json::json!({
            "alg": "ES256K",
            "crit": ["exp"],
            "exp": 0
        }))
        .unwrap();
        let err = decode_jws_parts(&header, "e30", "").unwrap_err();
        assert!(matches!(err, Error::UnknownCriticalHeader(name) if name == "exp"));
    }

    #[test]
    fn reject_unknown_algorithm() {
        let header = base64_encode_json(&serde_json::json!({ "alg": "HS256" })).unwrap();
        let err = decode_jws_parts(&header, "e30", "").unwrap_err();
        assert!(matches!(err, Error::InvalidHeader(_)));
    }

    #[test]
    #[cfg(feature = "secp256k1")]
    fn sign_verify_secp256k1() {
        let mut rng = ChaCha20Rng::seed_from_u64(3);
        let key = SecretKey::generate_secp256k1_from(&mut rng);
        let jws = encode_sign(r#"{"hello":"world"}"#, &key).unwrap();
        let (header, payload) = decode_verify(&jws, &key.to_public(), &JwkVerifier).unwrap();
        assert_eq!(header.algorithm, Algorithm::ES256K);
        assert_eq!(payload, br#"{"hello":"world"}"#);

        let other = SecretKey::generate_secp256k1_from(&mut rng);
        let err = decode_verify(&jws, &other.to_public(), &JwkVerifier).unwrap_err();
        assert!(matches!(err, Error::SignatureMismatch));
    }

    #[test]
    #[cfg(feature = "ed25519")]
    fn sign_verify_ed25519() {
        let mut rng = ChaCha20Rng::seed_from_u64(3);
        let key = SecretKey::generate_ed25519_from(&mut rng);
        let jws = encode_sign("{}", &key).unwrap();
        let (header, payload) = decode_verify(&jws, &key.to_public(), &JwkVerifier).unwrap();
        assert_eq!(header.algorithm, Algorithm::EdDSA);
        assert_eq!(payload, b"{}");
    }

    #[test]
    #[cfg(all(feature = "secp256k1", feature = "secp256r1"))]
    fn algorithm_key_mismatch() {
        let mut rng = ChaCha20Rng::seed_from_u64(5);
        let k1 = SecretKey::generate_secp256k1_from(&mut rng);
        let r1 = SecretKey::generate_p256_from(&mut rng);
        let jws = encode_sign("{}", &r1).unwrap();
        let err = decode_verify(&jws, &k1.to_public(), &JwkVerifier).unwrap_err();
        assert!(matches!(err, Error::AlgorithmMismatch { .. }));
    }

    #[test]
    #[cfg(feature = "secp256k1")]
    fn tampered_payload() {
        let mut rng = ChaCha20Rng::seed_from_u64(9);
        let key = SecretKey::generate_secp256k1_from(&mut rng);
        let jws = encode_sign(r#"{"a":1}"#, &key).unwrap();
        let (header, _, signature) = split_jws(&jws).unwrap();
        let payload = base64::prelude::BASE64_URL_SAFE_NO_PAD.encode(r#"{"a":2}"#);
        let tampered = format!("{header}.{payload}.{signature}");
        let err = decode_verify(&tampered, &key.to_public(), &JwkVerifier).unwrap_err();
        assert!(matches!(err, Error::SignatureMismatch));
    }
}
