//! Canonical hashing
//!
//! Every hash is SHA-256 over compact JSON with lexicographically sorted
//! keys, encoded as 64 lowercase hex characters.

use crate::domain::{AnonymousPid, ResourceKind};
use serde::Serialize;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Length of a hex-encoded SHA-256 digest
pub const HASH_HEX_LEN: usize = 64;

/// Canonical hash of any serializable record
///
/// # Examples
///
/// ```
/// use deident::core::provenance::hash::canonical_hash;
/// use serde_json::json;
///
/// let a = canonical_hash(&json!({"b": 1, "a": 2})).unwrap();
/// let b = canonical_hash(&json!({"a": 2, "b": 1})).unwrap();
/// assert_eq!(a, b);
/// assert_eq!(a.len(), 64);
/// ```
pub fn canonical_hash<T: Serialize>(record: &T) -> serde_json::Result<String> {
    let value = serde_json::to_value(record)?;
    Ok(hash_value(&value))
}

/// SHA-256 over the key-sorted compact serialization of `value`
pub fn hash_value(value: &Value) -> String {
    sha256_hex(canonicalize(value).to_string().as_bytes())
}

/// Hash over a consent decision
///
/// Only the four named inputs are hashed; callers never pass raw fields.
pub fn consent_hash(
    pid: &AnonymousPid,
    consent_date: &str,
    consent_type: &str,
    timestamp: &str,
) -> String {
    hash_value(&json!({
        "anonymousPid": pid.as_str(),
        "consentDate": consent_date,
        "consentType": consent_type,
        "timestamp": timestamp,
    }))
}

/// Hash linking a storage hash to a chain hash
pub fn provenance_proof(
    storage_hash: &str,
    chain_hash: &str,
    pid: &AnonymousPid,
    resource_type: ResourceKind,
    timestamp: &str,
) -> String {
    hash_value(&json!({
        "storageHash": storage_hash,
        "chainHash": chain_hash,
        "anonymousPid": pid.as_str(),
        "resourceType": resource_type.as_str(),
        "timestamp": timestamp,
    }))
}

/// SHA-256 over the concatenation of constituent hashes, in order
///
/// There is no separator between constituents. Each one must be a 64-char
/// lowercase hex digest, which makes the concatenation unambiguous.
///
/// # Errors
///
/// Returns the position of the first malformed constituent.
pub fn batch_hash_of(hashes: &[String]) -> Result<String, usize> {
    let mut hasher = Sha256::new();
    for (position, hash) in hashes.iter().enumerate() {
        if !is_hash(hash) {
            return Err(position);
        }
        hasher.update(hash.as_bytes());
    }
    Ok(format!("{:x}", hasher.finalize()))
}

/// Whether `candidate` matches `^[a-f0-9]{64}$`
pub fn is_hash(candidate: &str) -> bool {
    candidate.len() == HASH_HEX_LEN
        && candidate
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

/// SHA-256 of raw bytes as lowercase hex
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

/// Recursively sorts object keys
fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<&String, Value> =
                map.iter().map(|(k, v)| (k, canonicalize(v))).collect();
            Value::Object(sorted.into_iter().map(|(k, v)| (k.clone(), v)).collect())
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        _ => value.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid() -> AnonymousPid {
        AnonymousPid::from_sequence(1)
    }

    #[test]
    fn test_sha256_known_value() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_canonical_hash_key_order_independence() {
        let a = hash_value(&json!({"outer": {"z": 1, "a": 2}, "list": [{"b": 1, "a": 2}]}));
        let b = hash_value(&json!({"list": [{"a": 2, "b": 1}], "outer": {"a": 2, "z": 1}}));
        assert_eq!(a, b);
        assert!(is_hash(&a));
    }

    #[test]
    fn test_canonical_hash_value_sensitive() {
        let a = hash_value(&json!({"Result": "95"}));
        let b = hash_value(&json!({"Result": "96"}));
        assert_ne!(a, b);
    }

    #[test]
    fn test_consent_hash_changes_with_type() {
        let individual = consent_hash(&pid(), "2024-01-01", "individual", "T");
        let bulk = consent_hash(&pid(), "2024-01-01", "bulk", "T");
        assert_ne!(individual, bulk);
        assert!(is_hash(&individual));
    }

    #[test]
    fn test_provenance_proof_depends_on_every_input() {
        let h1 = "a".repeat(64);
        let h2 = "b".repeat(64);
        let base = provenance_proof(&h1, &h2, &pid(), ResourceKind::Observation, "T");

        let other = "c".repeat(64);
        assert_ne!(base, provenance_proof(&other, &h2, &pid(), ResourceKind::Observation, "T"));
        assert_ne!(base, provenance_proof(&h1, &other, &pid(), ResourceKind::Observation, "T"));
        assert_ne!(
            base,
            provenance_proof(&h1, &h2, &AnonymousPid::from_sequence(2), ResourceKind::Observation, "T")
        );
        assert_ne!(base, provenance_proof(&h1, &h2, &pid(), ResourceKind::Patient, "T"));
        assert_ne!(base, provenance_proof(&h1, &h2, &pid(), ResourceKind::Observation, "U"));
    }

    #[test]
    fn test_batch_hash_is_plain_concatenation() {
        let hashes = vec![sha256_hex(b"one"), sha256_hex(b"two")];
        let expected = sha256_hex(format!("{}{}", hashes[0], hashes[1]).as_bytes());
        assert_eq!(batch_hash_of(&hashes).unwrap(), expected);
    }

    #[test]
    fn test_batch_hash_order_matters() {
        let forward = vec![sha256_hex(b"one"), sha256_hex(b"two")];
        let reversed = vec![forward[1].clone(), forward[0].clone()];
        assert_ne!(batch_hash_of(&forward), batch_hash_of(&reversed));
    }

    #[test]
    fn test_batch_hash_rejects_ambiguous_constituents() {
        // "ab" + "cd" and "a" + "bcd" would collide without the length check
        let split_one = vec!["ab".to_string(), "cd".to_string()];
        let split_two = vec!["a".to_string(), "bcd".to_string()];
        assert_eq!(batch_hash_of(&split_one), Err(0));
        assert_eq!(batch_hash_of(&split_two), Err(0));

        let upper = vec![sha256_hex(b"one").to_uppercase()];
        assert_eq!(batch_hash_of(&upper), Err(0));
    }

    #[test]
    fn test_empty_batch_hash() {
        assert_eq!(batch_hash_of(&[]).unwrap(), sha256_hex(b""));
    }

    #[test]
    fn test_is_hash() {
        assert!(is_hash(&"0".repeat(64)));
        assert!(!is_hash(&"0".repeat(63)));
        assert!(!is_hash(&"g".repeat(64)));
        assert!(!is_hash(&"A".repeat(64)));
    }
}
