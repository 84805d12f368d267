//! Batch runner
//!
//! Runs one batch through every stage: normalize, assign identities,
//! generalize (storage, then chain), enforce k-anonymity, build provenance,
//! and validate the final release set. Any failure rejects the whole batch.

use crate::core::generalize::{Generalizer, DEFAULT_CHAIN_AGE_WIDTH, DEFAULT_STORAGE_AGE_WIDTH};
use crate::core::identity::IdentityMap;
use crate::core::kanonymity::{suppress_undersized, ViolationPolicy, DEFAULT_K};
use crate::core::normalize::normalize;
use crate::core::provenance::{batch_hash, build_consent_hashes, build_provenance};
use crate::core::validation::{check_demographics, scan_pii, OutputValidator, ValidationReport};
use crate::domain::provenance::format_timestamp;
use crate::domain::{
    AnonymousPid, CanonicalRecord, CohortViolation, GeneralizedRecord, PipelineError, ReleaseSet,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;
use std::collections::HashSet;
use std::time::Instant;
use uuid::Uuid;

/// Tunables for one batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Minimum cohort size
    pub k: usize,
    /// Reject the batch or suppress undersized cohorts
    pub on_violation: ViolationPolicy,
    /// Storage age bucket width
    pub storage_age_width: u32,
    /// Chain age bucket width
    pub chain_age_width: u32,
    /// Date ages are computed against; defaults to the batch timestamp's date
    pub reference_date: Option<NaiveDate>,
    /// Fixed batch timestamp; defaults to now
    pub timestamp: Option<DateTime<Utc>>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            k: DEFAULT_K,
            on_violation: ViolationPolicy::default(),
            storage_age_width: DEFAULT_STORAGE_AGE_WIDTH,
            chain_age_width: DEFAULT_CHAIN_AGE_WIDTH,
            reference_date: None,
            timestamp: None,
        }
    }
}

/// Everything a successful batch hands back to its caller
///
/// `patient_mapping` is kept apart from `release` so the two can be routed
/// to different destinations.
#[derive(Debug, Clone)]
pub struct BatchOutput {
    /// Unique id of this batch run
    pub batch_id: Uuid,
    /// Timestamp shared by every provenance record and consent hash
    pub timestamp: String,
    /// Records and artifacts safe to release
    pub release: ReleaseSet,
    /// Original patient key to PID
    pub patient_mapping: IdentityMap,
    /// Cohort statistics of the validated release
    pub cohort_report: ValidationReport,
    /// Cohorts dropped under [`ViolationPolicy::Suppress`]
    pub suppressed: Vec<CohortViolation>,
    /// Records read from the input
    pub input_records: usize,
}

impl BatchOutput {
    /// Number of storage records dropped by suppression
    pub fn suppressed_records(&self) -> usize {
        self.suppressed.iter().map(|c| c.count).sum()
    }
}

/// Per-batch state; owned by exactly one run
struct BatchContext {
    batch_id: Uuid,
    timestamp: String,
    generalizer: Generalizer,
    identities: IdentityMap,
}

impl BatchContext {
    fn new(batch_id: Uuid, options: &PipelineOptions) -> Self {
        let now = options.timestamp.unwrap_or_else(Utc::now);
        let reference_date = options.reference_date.unwrap_or_else(|| now.date_naive());
        Self {
            batch_id,
            timestamp: format_timestamp(now),
            generalizer: Generalizer::new(
                reference_date,
                options.storage_age_width,
                options.chain_age_width,
            ),
            identities: IdentityMap::new(),
        }
    }
}

/// Runs one batch end to end
///
/// # Errors
///
/// Returns the first [`PipelineError`] raised by any stage. No partial
/// output is returned.
pub fn run_batch(input: &Value, options: &PipelineOptions) -> Result<BatchOutput, PipelineError> {
    run_batch_as(Uuid::new_v4(), input, options)
}

/// Runs one batch under a caller-chosen batch id
///
/// Lets a caller correlate its own records (audit entries, reports) with a
/// batch that may be rejected.
///
/// # Errors
///
/// Same as [`run_batch`].
pub fn run_batch_as(
    batch_id: Uuid,
    input: &Value,
    options: &PipelineOptions,
) -> Result<BatchOutput, PipelineError> {
    let start = Instant::now();
    let context = BatchContext::new(batch_id, options);

    match execute(context, input, options) {
        Ok(output) => {
            crate::log_batch_complete!(
                batch_id,
                output.release.anonymized_records.len(),
                start.elapsed()
            );
            Ok(output)
        }
        Err(error) => {
            crate::log_batch_rejected!(batch_id, &error);
            Err(error)
        }
    }
}

fn execute(
    mut context: BatchContext,
    input: &Value,
    options: &PipelineOptions,
) -> Result<BatchOutput, PipelineError> {
    let records = normalize(input)?;
    crate::log_batch_start!(context.batch_id, records.len());

    // Identity assignment completes before any other stage reads a PID
    let pids = context.identities.assign_all(&records);
    tracing::debug!(
        batch_id = %context.batch_id,
        patients = context.identities.len(),
        "Assigned anonymous identifiers"
    );

    let (mut storage, mut chain) = generalize_releasable(&context.generalizer, &records, &pids);

    let violations = scan_pii(&storage);
    if !violations.is_empty() {
        return Err(PipelineError::PiiLeak { violations });
    }
    let violations = check_demographics(&storage);
    if !violations.is_empty() {
        return Err(PipelineError::MissingDemographic { violations });
    }

    let mut suppressed = Vec::new();
    let mut suppressed_pids = HashSet::new();
    if options.on_violation == ViolationPolicy::Suppress {
        let (kept, dropped) = suppress_undersized(&storage, options.k);
        if !dropped.is_empty() {
            (storage, chain, suppressed_pids) = retain_indices(storage, chain, &kept);
            tracing::warn!(
                batch_id = %context.batch_id,
                cohorts = dropped.len(),
                records = dropped.iter().map(|c| c.count).sum::<usize>(),
                "Suppressed undersized cohorts instead of rejecting the batch"
            );
        }
        suppressed = dropped;
    }

    let provenance_records = storage
        .iter()
        .zip(&chain)
        .enumerate()
        .map(|(index, (s, c))| build_provenance(index, s, c, &context.timestamp))
        .collect::<Result<Vec<_>, _>>()?;

    // Consent hashes are emitted per patient, in first-encounter order
    let groups = context.identities.patient_groups(&records);
    let consents = groups
        .iter()
        .filter(|group| !suppressed_pids.contains(&group.pid))
        .flat_map(|group| {
            group.record_indices.iter().filter_map(|&index| {
                records[index]
                    .consent
                    .as_ref()
                    .map(|terms| (&group.pid, terms))
            })
        });
    let consent_hashes = build_consent_hashes(consents, &context.timestamp);

    let release = ReleaseSet {
        batch_hash: batch_hash(&storage)?,
        chain_batch_hash: batch_hash(&chain)?,
        anonymized_records: storage,
        chain_records: chain,
        provenance_records,
        consent_hashes,
    };

    let cohort_report = OutputValidator::new(options.k).validate(&release, &context.identities)?;

    Ok(BatchOutput {
        batch_id: context.batch_id,
        timestamp: context.timestamp,
        release,
        patient_mapping: context.identities,
        cohort_report,
        suppressed,
        input_records: records.len(),
    })
}

/// Storage and chain records for every releasable canonical record
fn generalize_releasable(
    generalizer: &Generalizer,
    records: &[CanonicalRecord],
    pids: &[AnonymousPid],
) -> (Vec<GeneralizedRecord>, Vec<GeneralizedRecord>) {
    let storage: Vec<GeneralizedRecord> = records
        .iter()
        .zip(pids)
        .filter(|(record, _)| record.is_releasable())
        .map(|(record, pid)| generalizer.storage(record, pid.clone()))
        .collect();
    let chain = storage.iter().map(|r| generalizer.chain(r)).collect();
    (storage, chain)
}

/// Keeps the pairs at `kept`; returns PIDs left with no released record
fn retain_indices(
    storage: Vec<GeneralizedRecord>,
    chain: Vec<GeneralizedRecord>,
    kept: &[usize],
) -> (
    Vec<GeneralizedRecord>,
    Vec<GeneralizedRecord>,
    HashSet<AnonymousPid>,
) {
    let kept: HashSet<usize> = kept.iter().copied().collect();
    let mut kept_storage = Vec::with_capacity(kept.len());
    let mut kept_chain = Vec::with_capacity(kept.len());
    let mut dropped_pids = HashSet::new();

    for (index, (s, c)) in storage.into_iter().zip(chain).enumerate() {
        if kept.contains(&index) {
            kept_storage.push(s);
            kept_chain.push(c);
        } else {
            dropped_pids.insert(s.anonymous_pid.clone());
        }
    }

    let released: HashSet<&AnonymousPid> = kept_storage.iter().map(|r| &r.anonymous_pid).collect();
    dropped_pids.retain(|pid| !released.contains(pid));
    (kept_storage, kept_chain, dropped_pids)
}
