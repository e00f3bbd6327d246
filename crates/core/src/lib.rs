#![cfg_attr(docsrs, feature(doc_auto_cfg))]
//! Sidetree DID operation processing.
//!
//! Validates Create, Update, Recover and Deactivate operation requests,
//! enforces the commitment-reveal chain of each DID suffix, and applies DID
//! state patches to produce the resolved document.
//!
//! ### References
//! - [Sidetree v1.0.0](https://identity.foundation/sidetree/spec/v1.0.0/)
//! - [Sidetree REST API](https://identity.foundation/sidetree/api/)
pub mod canonical;
pub use canonical::*;

pub mod hash;
pub use hash::{
    EncodedHash, HashAlgorithm, HashRegistry, Multihash, SHA2_256, SHA2_512, SHA3_256,
};

pub mod protocol;
pub use protocol::*;

mod did;
pub use did::*;

pub mod document;
pub use document::*;

pub mod patch;
pub use patch::*;

pub mod operation;
pub use operation::*;

pub mod commitment;
pub use commitment::*;

mod signature;
pub use signature::*;

pub mod schema;
pub use schema::SchemaError;

pub mod chain;
pub use chain::*;

pub mod store;
pub use store::*;

mod processor;
pub use processor::*;

mod builder;
pub use builder::*;

mod error;
pub use error::*;
