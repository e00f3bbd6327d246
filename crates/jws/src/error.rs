use sidetree_jwk::{Algorithm, InvalidPublicKeyJwk, KeyConversionError};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Not made of exactly three `.`-separated segments.
    #[error("invalid compact JWS")]
    InvalidJws,

    #[error("invalid base64url encoding of the JWS {segment}")]
    Base64 {
        segment: &'static str,
        #[source]
        source: base64::DecodeError,
    },

    #[error("invalid JWS header")]
    InvalidHeader(#[source] serde_json::Error),

    #[error("critical header parameter `{0}` is not allowed")]
    InvalidCriticalHeader(String),

    #[error("unknown critical header parameter `{0}`")]
    UnknownCriticalHeader(String),

    #[error("unable to encode JWS header")]
    HeaderEncoding(#[source] serde_json::Error),

    #[error("algorithm {algorithm} cannot be used with a {curve} key")]
    AlgorithmMismatch {
        algorithm: Algorithm,
        curve: String,
    },

    #[error("algorithm {0} is not supported by this build")]
    AlgorithmNotImplemented(Algorithm),

    #[error(transparent)]
    InvalidKey(#[from] InvalidPublicKeyJwk),

    #[error(transparent)]
    KeyConversion(#[from] KeyConversionError),

    #[error("malformed signature")]
    SignatureMalformed,

    #[error("signature does not match")]
    SignatureMismatch,

    #[error("signing failed")]
    Signing,
}
