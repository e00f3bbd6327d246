//! Sidetree DID operation processing.
//!
//! Operation requests are checked against the commitment-reveal chain of the
//! DID they target, and their DID state patches are applied to produce the
//! resolved document. Keys and signatures live in the [`jwk`] and [`jws`]
//! modules.
//!
//! # Basic Usage
//!
//! Create a DID, then update it with the revealed update key.
//!
//! ```
//! use sidetree::*;
//!
//! let processor = OperationProcessor::new(Protocol::default(), MemoryChainStore::new());
//! let builder = OperationBuilder::new(processor.protocol());
//!
//! let update_key = SecretKey::generate_secp256k1();
//! let recovery_key = SecretKey::generate_secp256k1();
//! let create = builder
//!     .create(&update_key.to_public(), &recovery_key.to_public(), Vec::new())
//!     .unwrap();
//! let did_suffix = create.did_suffix(processor.protocol()).unwrap();
//! processor
//!     .process(&OperationRequest::from(create).to_vec().unwrap())
//!     .unwrap();
//!
//! let next_update_key = SecretKey::generate_secp256k1();
//! let update = builder
//!     .update(&did_suffix, &update_key, &next_update_key.to_public(), Vec::new())
//!     .unwrap();
//! let admission = processor
//!     .process(&OperationRequest::from(update).to_vec().unwrap())
//!     .unwrap();
//! assert_eq!(admission.operation.index, 1);
//! ```
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

// Re-export operation processing functions and types.
pub use sidetree_core::*;

/// Public key JWKs and signing keys.
#[doc(inline)]
pub use sidetree_jwk as jwk;

#[doc(inline)]
pub use jwk::{PublicKeyJwk, SecretKey};

/// Compact JSON Web Signatures.
///
/// See: <https://www.rfc-editor.org/rfc/rfc7515>
#[doc(inline)]
pub use sidetree_jws as jws;

#[doc(inline)]
pub use jws::{JwkVerifier, SignatureVerifier};
