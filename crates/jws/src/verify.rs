use sidetree_jwk::{Algorithm, Params, PublicKeyJwk};

use crate::Error;

/// Signature verification capability.
///
/// Given the JWS header algorithm, the revealed public key, the signing input
/// (`header.payload`) and the raw signature, succeeds only if the signature
/// is valid.
pub trait SignatureVerifier {
    fn verify(
        &self,
        algorithm: Algorithm,
        key: &PublicKeyJwk,
        signing_input: &[u8],
        signature: &[u8],
    ) -> Result<(), Error>;
}

impl<T: SignatureVerifier + ?Sized> SignatureVerifier for &T {
    fn verify(
        &self,
        algorithm: Algorithm,
        key: &PublicKeyJwk,
        signing_input: &[u8],
        signature: &[u8],
    ) -> Result<(), Error> {
        T::verify(self, algorithm, key, signing_input, signature)
    }
}

/// Verifier for the key types enabled in this build.
#[derive(Debug, Clone, Copy, Default)]
pub struct JwkVerifier;

impl SignatureVerifier for JwkVerifier {
    fn verify(
        &self,
        algorithm: Algorithm,
        key: &PublicKeyJwk,
        signing_input: &[u8],
        signature: &[u8],
    ) -> Result<(), Error> {
        verify_bytes(algorithm, signing_input, key, signature)
    }
}

pub fn verify_bytes(
    algorithm: Algorithm,
    data: &[u8],
    key: &PublicKeyJwk,
    signature: &[u8],
) -> Result<(), Error> {
    let params = key.params()?;
    if params.algorithm() != algorithm {
        return Err(Error::AlgorithmMismatch {
            algorithm,
            curve: params.curve().to_owned(),
        });
    }
    match (&params, algorithm) {
        #[cfg(feature = "secp256k1")]
        (Params::Ec(ec), Algorithm::ES256K) => {
            use k256::ecdsa::signature::Verifier;
            let verifying_key = k256::ecdsa::VerifyingKey::try_from(ec)?;
            let sig =
                k256::ecdsa::Signature::try_from(signature).map_err(|_| Error::SignatureMalformed)?;
            verifying_key
                .verify(data, &sig)
                .map_err(|_| Error::SignatureMismatch)
        }
        #[cfg(feature = "secp256r1")]
        (Params::Ec(ec), Algorithm::ES256) => {
            use p256::ecdsa::signature::Verifier;
            let verifying_key = p256::ecdsa::VerifyingKey::try_from(ec)?;
            let sig =
                p256::ecdsa::Signature::try_from(signature).map_err(|_| Error::SignatureMalformed)?;
            verifying_key
                .verify(data, &sig)
                .map_err(|_| Error::SignatureMismatch)
        }
        #[cfg(feature = "ed25519")]
        (Params::Okp(okp), Algorithm::EdDSA) => {
            let verifying_key = ed25519_dalek::VerifyingKey::try_from(okp)?;
            let sig = ed25519_dalek::Signature::try_from(signature)
                .map_err(|_| Error::SignatureMalformed)?;
            verifying_key
                .verify_strict(data, &sig)
                .map_err(|_| Error::SignatureMismatch)
        }
        _ => {
            log::debug!("no verifier for {algorithm} with curve {}", params.curve());
            Err(Error::AlgorithmNotImplemented(algorithm))
        }
    }
}
