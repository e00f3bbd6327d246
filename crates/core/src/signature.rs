use sidetree_jwk::{Algorithm, PublicKeyJwk};
use sidetree_jws::SignatureVerifier;

use crate::{Protocol, SignedData};

#[derive(Debug, thiserror::Error)]
pub enum SignatureError {
    #[error("signature algorithm {0} is not allowed")]
    AlgorithmNotAllowed(Algorithm),

    #[error("signature verification failed")]
    Verification(#[source] sidetree_jws::Error),
}

/// Verify signed data against the key that was revealed for it, and return
/// the now verified payload.
///
/// The header algorithm must be one of the protocol's signature algorithms.
pub fn verify_signature<'a, T>(
    protocol: &Protocol,
    verifier: &dyn SignatureVerifier,
    signed_data: &'a SignedData<T>,
    public_key: &PublicKeyJwk,
) -> Result<&'a T, SignatureError> {
    let algorithm = signed_data.header().algorithm;
    if !protocol
        .parameters()
        .signature_algorithms
        .contains(&algorithm)
    {
        return Err(SignatureError::AlgorithmNotAllowed(algorithm));
    }
    verifier
        .verify(
            algorithm,
            public_key,
            signed_data.signing_input(),
            signed_data.signature(),
        )
        .map_err(SignatureError::Verification)?;
    Ok(signed_data.unverified_payload())
}

#[cfg(test)]
mod tests {
    use rand_chacha::{rand_core::SeedableRng, ChaCha20Rng};
    use serde_json::{json, Value};
    use sidetree_jwk::SecretKey;
    use sidetree_jws::JwkVerifier;

    use super::*;
    use crate::ProtocolParameters;

    fn signed(key: &SecretKey) -> SignedData<Value> {
        let jws = sidetree_jws::encode_sign(&json!({ "a": 1 }).to_string(), key).unwrap();
        SignedData::decode(jws).unwrap()
    }

    #[test]
    fn verify() {
        let mut rng = ChaCha20Rng::seed_from_u64(11);
        let key = SecretKey::generate_secp256k1_from(&mut rng);
        let signed = signed(&key);
        let protocol = Protocol::default();
        let payload = verify_signature(&protocol, &JwkVerifier, &signed, &key.to_public()).unwrap();
        assert_eq!(payload, &json!({ "a": 1 }));

        let other = SecretKey::generate_secp256k1_from(&mut rng).to_public();
        let err = verify_signature(&protocol, &JwkVerifier, &signed, &other).unwrap_err();
        assert!(matches!(err, SignatureError::Verification(_)));
    }

    #[test]
    fn algorithm_not_allowed() {
        let protocol = Protocol::new(ProtocolParameters {
            signature_algorithms: vec![Algorithm::EdDSA],
            ..Default::default()
        })
        .unwrap();
        let mut rng = ChaCha20Rng::seed_from_u64(11);
        let key = SecretKey::generate_secp256k1_from(&mut rng);
        let err = verify_signature(&protocol, &JwkVerifier, &signed(&key), &key.to_public())
            .unwrap_err();
        assert!(matches!(
            err,
            SignatureError::AlgorithmNotAllowed(Algorithm::ES256K)
        ));
    }
}
