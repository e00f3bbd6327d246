use base64::Engine;
use serde::{Deserialize, Serialize};

/// Bytes serialized as unpadded base64url, as JWK members are.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Hash, Eq)]
#[serde(try_from = "String")]
#[serde(into = "Base64urlUIntString")]
pub struct Base64urlUInt(pub Vec<u8>);

type Base64urlUIntString = String;

impl TryFrom<String> for Base64urlUInt {
    type Error = base64::DecodeError;

    fn try_from(data: String) -> Result<Self, Self::Error> {
        Self::try_from(data.as_str())
    }
}

impl TryFrom<&str> for Base64urlUInt {
    type Error = base64::DecodeError;

    fn try_from(data: &str) -> Result<Self, Self::Error> {
        Ok(Base64urlUInt(
            base64::prelude::BASE64_URL_SAFE_NO_PAD.decode(data)?,
        ))
    }
}

impl From<&Base64urlUInt> for String {
    fn from(data: &Base64urlUInt) -> String {
        base64::prelude::BASE64_URL_SAFE_NO_PAD.encode(&data.0)
    }
}

impl From<Base64urlUInt> for Base64urlUIntString {
    fn from(data: Base64urlUInt) -> Base64urlUIntString {
        String::from(&data)
    }
}

impl AsRef<[u8]> for Base64urlUInt {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}
