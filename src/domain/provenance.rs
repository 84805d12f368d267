//! Provenance artifacts and the release set
//!
//! These are the only values handed to external collaborators. None of them
//! carries a raw field or an original patient key.

use crate::domain::generalized::GeneralizedRecord;
use crate::domain::ids::AnonymousPid;
use crate::domain::record::ResourceKind;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Formats a timestamp the way every hashed artifact records it
///
/// RFC 3339, UTC, millisecond precision, `Z` suffix.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Link between a storage record and its chain counterpart
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvenanceRecord {
    /// Patient the records belong to
    pub anonymous_pid: AnonymousPid,
    /// Canonical hash of the storage-strength record (H1)
    pub storage_hash: String,
    /// Canonical hash of the chain-strength record (H2)
    pub chain_hash: String,
    /// Hash over H1, H2, PID, resource type and timestamp
    pub provenance_proof: String,
    /// Resource kind of the linked records
    pub resource_type: ResourceKind,
    /// When the link was created
    pub timestamp: String,
}

/// Hashed consent decision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsentHash {
    /// Patient who gave consent
    pub anonymous_pid: AnonymousPid,
    /// Hash over PID, consent date, consent type and timestamp
    pub consent_hash: String,
    /// When the hash was computed
    pub timestamp: String,
}

/// Everything a batch releases to the datastore and the ledger
///
/// The identity map is deliberately not part of this type.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseSet {
    /// Storage-strength records, for the query-time datastore
    pub anonymized_records: Vec<GeneralizedRecord>,
    /// Chain-strength records, positionally paired with `anonymized_records`
    pub chain_records: Vec<GeneralizedRecord>,
    /// One provenance record per storage/chain pair
    pub provenance_records: Vec<ProvenanceRecord>,
    /// Hashed consent decisions
    pub consent_hashes: Vec<ConsentHash>,
    /// Batch hash over the storage records
    pub batch_hash: String,
    /// Batch hash over the chain records
    pub chain_batch_hash: String,
}

impl ReleaseSet {
    /// Number of released record pairs
    pub fn len(&self) -> usize {
        self.anonymized_records.len()
    }

    /// Whether nothing is released
    pub fn is_empty(&self) -> bool {
        self.anonymized_records.is_empty()
    }

    /// Distinct PIDs referenced by the released records
    pub fn patient_count(&self) -> usize {
        let mut pids: Vec<&AnonymousPid> = self
            .anonymized_records
            .iter()
            .map(|r| &r.anonymous_pid)
            .collect();
        pids.sort();
        pids.dedup();
        pids.len()
    }
}
