use serde_json::{Map, Value};

use crate::{Algorithm, Base64urlUInt, InvalidPublicKeyJwk};

pub const CURVE_SECP256K1: &str = "secp256k1";
pub const CURVE_P256: &str = "P-256";
pub const CURVE_ED25519: &str = "Ed25519";

/// JWK members that only appear in private keys (RFC 7518 §6).
const PRIVATE_KEY_MEMBERS: &[&str] = &["d", "p", "q", "dp", "dq", "qi", "oth", "k"];

/// Typed public key parameters, parsed out of a [`PublicKeyJwk`](crate::PublicKeyJwk).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Params {
    Ec(EcParams),
    Okp(OkpParams),
}

/// `kty: "EC"` public key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EcParams {
    pub curve: String,
    pub x_coordinate: Base64urlUInt,
    pub y_coordinate: Base64urlUInt,
}

/// `kty: "OKP"` public key (RFC 8037).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OkpParams {
    pub curve: String,
    pub public_key: Base64urlUInt,
}

impl Params {
    pub(crate) fn from_members(members: &Map<String, Value>) -> Result<Self, InvalidPublicKeyJwk> {
        ensure_public(members)?;

        let kty = string_member(members, "kty")?;
        match kty {
            "EC" => {
                let curve = string_member(members, "crv")?;
                if curve != CURVE_SECP256K1 && curve != CURVE_P256 {
                    return Err(InvalidPublicKeyJwk::UnsupportedCurve(curve.to_owned()));
                }
                let x_coordinate = coordinate(members, "x", 32)?;
                let y_coordinate = coordinate(members, "y", 32)?;
                Ok(Self::Ec(EcParams {
                    curve: curve.to_owned(),
                    x_coordinate,
                    y_coordinate,
                }))
            }
            "OKP" => {
                let curve = string_member(members, "crv")?;
                if curve != CURVE_ED25519 {
                    return Err(InvalidPublicKeyJwk::UnsupportedCurve(curve.to_owned()));
                }
                let public_key = coordinate(members, "x", 32)?;
                Ok(Self::Okp(OkpParams {
                    curve: curve.to_owned(),
                    public_key,
                }))
            }
            other => Err(InvalidPublicKeyJwk::UnsupportedKeyType(other.to_owned())),
        }
    }

    pub fn curve(&self) -> &str {
        match self {
            Self::Ec(ec) => &ec.curve,
            Self::Okp(okp) => &okp.curve,
        }
    }

    /// Signature algorithm that this key can verify.
    pub fn algorithm(&self) -> Algorithm {
        match self.curve() {
            CURVE_P256 => Algorithm::ES256,
            CURVE_ED25519 => Algorithm::EdDSA,
            _ => Algorithm::ES256K,
        }
    }
}

pub(crate) fn ensure_public(members: &Map<String, Value>) -> Result<(), InvalidPublicKeyJwk> {
    match PRIVATE_KEY_MEMBERS
        .iter()
        .find(|name| members.contains_key(**name))
    {
        Some(name) => Err(InvalidPublicKeyJwk::PrivateKeyParameter(*name)),
        None => Ok(()),
    }
}

fn string_member<'a>(
    members: &'a Map<String, Value>,
    name: &'static str,
) -> Result<&'a str, InvalidPublicKeyJwk> {
    match members.get(name) {
        Some(Value::String(s)) => Ok(s),
        Some(_) => Err(InvalidPublicKeyJwk::InvalidMember(name)),
        None => Err(InvalidPublicKeyJwk::MissingMember(name)),
    }
}

fn coordinate(
    members: &Map<String, Value>,
    name: &'static str,
    len: usize,
) -> Result<Base64urlUInt, InvalidPublicKeyJwk> {
    let encoded = string_member(members, name)?;
    let bytes = Base64urlUInt::try_from(encoded)
        .map_err(|_| InvalidPublicKeyJwk::InvalidMember(name))?;
    if bytes.0.len() != len {
        return Err(InvalidPublicKeyJwk::InvalidMember(name));
    }
    Ok(bytes)
}

#[derive(Debug, thiserror::Error)]
pub enum KeyConversionError {
    #[error("curve mismatch (expected {expected}, found {found})")]
    CurveMismatch {
        expected: &'static str,
        found: String,
    },

    #[error("invalid curve point")]
    InvalidPoint,
}

#[cfg(feature = "secp256k1")]
impl TryFrom<&EcParams> for k256::ecdsa::VerifyingKey {
    type Error = KeyConversionError;

    fn try_from(params: &EcParams) -> Result<Self, Self::Error> {
        if params.curve != CURVE_SECP256K1 {
            return Err(KeyConversionError::CurveMismatch {
                expected: CURVE_SECP256K1,
                found: params.curve.clone(),
            });
        }
        if params.x_coordinate.0.len() != 32 || params.y_coordinate.0.len() != 32 {
            return Err(KeyConversionError::InvalidPoint);
        }
        let point = k256::EncodedPoint::from_affine_coordinates(
            k256::FieldBytes::from_slice(&params.x_coordinate.0),
            k256::FieldBytes::from_slice(&params.y_coordinate.0),
            false,
        );
        Self::from_encoded_point(&point).map_err(|_| KeyConversionError::InvalidPoint)
    }
}

#[cfg(feature = "secp256r1")]
impl TryFrom<&EcParams> for p256::ecdsa::VerifyingKey {
    type Error = KeyConversionError;

    fn try_from(params: &EcParams) -> Result<Self, Self::Error> {
        if params.curve != CURVE_P256 {
            return Err(KeyConversionError::CurveMismatch {
                expected: CURVE_P256,
                found: params.curve.clone(),
            });
        }
        if params.x_coordinate.0.len() != 32 || params.y_coordinate.0.len() != 32 {
            return Err(KeyConversionError::InvalidPoint);
        }
        let point = p256::EncodedPoint::from_affine_coordinates(
            p256::FieldBytes::from_slice(&params.x_coordinate.0),
            p256::FieldBytes::from_slice(&params.y_coordinate.0),
            false,
        );
        Self::from_encoded_point(&point).map_err(|_| KeyConversionError::InvalidPoint)
    }
}

#[cfg(feature = "ed25519")]
impl TryFrom<&OkpParams> for ed25519_dalek::VerifyingKey {
    type Error = KeyConversionError;

    fn try_from(params: &OkpParams) -> Result<Self, Self::Error> {
        let bytes: [u8; 32] = params
            .public_key
            .0
            .as_slice()
            .try_into()
            .map_err(|_| KeyConversionError::InvalidPoint)?;
        Self::from_bytes(&bytes).map_err(|_| KeyConversionError::InvalidPoint)
    }
}
