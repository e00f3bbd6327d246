use core::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

macro_rules! algorithms {
    ($(
        $(#[doc = $doc:tt])*
        $id:ident: $name:literal
    ),*) => {
        /// JWS signature algorithm.
        ///
        /// Only the algorithms used by Sidetree key types are listed. Anything
        /// else found in a JWS header is reported as [`UnsupportedAlgorithm`].
        #[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Hash, Eq, PartialOrd, Ord)]
        pub enum Algorithm {
            $(
                $(#[doc = $doc])*
                #[serde(rename = $name)]
                $id,
            )*
        }

        impl Algorithm {
            pub const ALL: &'static [Self] = &[$(Self::$id),*];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(
                        Self::$id => $name,
                    )*
                }
            }
        }

        impl FromStr for Algorithm {
            type Err = UnsupportedAlgorithm;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $(
                        $name => Ok(Self::$id),
                    )*
                    other => Err(UnsupportedAlgorithm(other.to_owned())),
                }
            }
        }
    };
}

algorithms! {
    /// ECDSA using secp256k1 and SHA-256.
    ES256K: "ES256K",

    /// ECDSA using P-256 and SHA-256.
    ES256: "ES256",

    /// Edwards-curve signature (Ed25519).
    EdDSA: "EdDSA"
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported signature algorithm `{0}`")]
pub struct UnsupportedAlgorithm(pub String);
