//! Hash and provenance engine
//!
//! - [`hash`]: canonical hashing primitives (record, consent, proof, batch)
//! - [`proof`]: building and verifying storage-to-chain provenance links

pub mod hash;
pub mod proof;

pub use hash::{batch_hash_of, canonical_hash, consent_hash, is_hash, provenance_proof};
pub use proof::{
    batch_hash, build_consent_hashes, build_provenance, verify_link, verify_release,
};
