use core::fmt;

use serde::{Deserialize, Serialize};

/// Sidetree DID Suffix
///
/// Encoded multihash of the canonical [suffix data](crate::SuffixData) of the
/// DID's Create operation.
///
/// Reference: [Sidetree §9. DID URI Composition](https://identity.foundation/sidetree/spec/v1.0.0/#did-uri-composition)
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct DIDSuffix(pub String);

impl DIDSuffix {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DIDSuffix {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DIDSuffix {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}
