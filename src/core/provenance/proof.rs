//! Provenance records and their verification

use super::hash::{self, is_hash};
use crate::core::generalize::check_coarsening;
use crate::domain::record::ConsentTerms;
use crate::domain::{
    AnonymousPid, ConsentHash, GeneralizedRecord, PipelineError, ProvenanceRecord, ReleaseSet,
};
use std::collections::HashSet;

impl ProvenanceRecord {
    /// Recomputes the proof from the record's own fields
    pub fn expected_proof(&self) -> String {
        hash::provenance_proof(
            &self.storage_hash,
            &self.chain_hash,
            &self.anonymous_pid,
            self.resource_type,
            &self.timestamp,
        )
    }

    /// Whether the stored proof matches its inputs
    pub fn verify_proof(&self) -> bool {
        self.provenance_proof == self.expected_proof()
    }
}

fn link_error(record_index: usize, reason: impl Into<String>) -> PipelineError {
    PipelineError::ProvenanceLink {
        record_index,
        reason: reason.into(),
    }
}

fn record_hash(record_index: usize, record: &GeneralizedRecord) -> Result<String, PipelineError> {
    hash::canonical_hash(record)
        .map_err(|e| link_error(record_index, format!("record could not be serialized: {e}")))
}

/// Links a storage record to its chain counterpart
///
/// # Errors
///
/// Returns [`PipelineError::ProvenanceLink`] when `chain` is not a coarsening
/// of `storage`.
pub fn build_provenance(
    record_index: usize,
    storage: &GeneralizedRecord,
    chain: &GeneralizedRecord,
    timestamp: &str,
) -> Result<ProvenanceRecord, PipelineError> {
    check_coarsening(storage, chain).map_err(|reason| link_error(record_index, reason))?;

    let storage_hash = record_hash(record_index, storage)?;
    let chain_hash = record_hash(record_index, chain)?;
    let provenance_proof = hash::provenance_proof(
        &storage_hash,
        &chain_hash,
        &storage.anonymous_pid,
        storage.resource_type,
        timestamp,
    );

    Ok(ProvenanceRecord {
        anonymous_pid: storage.anonymous_pid.clone(),
        storage_hash,
        chain_hash,
        provenance_proof,
        resource_type: storage.resource_type,
        timestamp: timestamp.to_string(),
    })
}

/// Recomputes one provenance link
///
/// # Errors
///
/// Returns [`PipelineError::ProvenanceLink`] naming the first check that fails.
pub fn verify_link(
    record_index: usize,
    storage: &GeneralizedRecord,
    chain: &GeneralizedRecord,
    provenance: &ProvenanceRecord,
) -> Result<(), PipelineError> {
    for (name, value) in [
        ("storageHash", &provenance.storage_hash),
        ("chainHash", &provenance.chain_hash),
        ("provenanceProof", &provenance.provenance_proof),
    ] {
        if !is_hash(value) {
            return Err(link_error(record_index, format!("{name} is not a SHA-256 hex digest")));
        }
    }

    if provenance.anonymous_pid != storage.anonymous_pid {
        return Err(link_error(record_index, "anonymousPid does not match the storage record"));
    }
    if provenance.resource_type != storage.resource_type {
        return Err(link_error(record_index, "resourceType does not match the storage record"));
    }
    if record_hash(record_index, storage)? != provenance.storage_hash {
        return Err(link_error(record_index, "storageHash does not match the storage record"));
    }
    if record_hash(record_index, chain)? != provenance.chain_hash {
        return Err(link_error(record_index, "chainHash does not match the chain record"));
    }
    if !provenance.verify_proof() {
        return Err(link_error(record_index, "provenanceProof does not match its inputs"));
    }

    check_coarsening(storage, chain).map_err(|reason| link_error(record_index, reason))
}

/// Batch hash over a record set
///
/// # Errors
///
/// Returns [`PipelineError::ProvenanceLink`] if a record cannot be hashed.
pub fn batch_hash(records: &[GeneralizedRecord]) -> Result<String, PipelineError> {
    let hashes = records
        .iter()
        .enumerate()
        .map(|(index, record)| record_hash(index, record))
        .collect::<Result<Vec<_>, _>>()?;
    hash::batch_hash_of(&hashes)
        .map_err(|position| link_error(position, "constituent hash is malformed"))
}

/// Verifies every provenance link and both batch hashes of a release
///
/// # Errors
///
/// Returns [`PipelineError::ProvenanceLink`] for the first broken link.
pub fn verify_release(release: &ReleaseSet) -> Result<(), PipelineError> {
    let pairs = release.anonymized_records.len();
    if release.chain_records.len() != pairs || release.provenance_records.len() != pairs {
        return Err(link_error(
            pairs.min(release.chain_records.len()).min(release.provenance_records.len()),
            "storage, chain and provenance record counts differ",
        ));
    }

    for (index, ((storage, chain), provenance)) in release
        .anonymized_records
        .iter()
        .zip(&release.chain_records)
        .zip(&release.provenance_records)
        .enumerate()
    {
        verify_link(index, storage, chain, provenance)?;
    }

    if batch_hash(&release.anonymized_records)? != release.batch_hash {
        return Err(link_error(pairs, "batchHash does not match the storage records"));
    }
    if batch_hash(&release.chain_records)? != release.chain_batch_hash {
        return Err(link_error(pairs, "chainBatchHash does not match the chain records"));
    }

    Ok(())
}

/// Hashes consent decisions, one per distinct (PID, date, type)
pub fn build_consent_hashes<'a>(
    consents: impl IntoIterator<Item = (&'a AnonymousPid, &'a ConsentTerms)>,
    timestamp: &str,
) -> Vec<ConsentHash> {
    let mut seen = HashSet::new();
    consents
        .into_iter()
        .filter(|(pid, terms)| {
            seen.insert((
                (*pid).clone(),
                terms.consent_date.clone(),
                terms.consent_type.clone(),
            ))
        })
        .map(|(pid, terms)| ConsentHash {
            anonymous_pid: pid.clone(),
            consent_hash: hash::consent_hash(
                pid,
                &terms.consent_date,
                &terms.consent_type,
                timestamp,
            ),
            timestamp: timestamp.to_string(),
        })
        .collect()
}
