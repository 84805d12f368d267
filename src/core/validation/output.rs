//! Final release gate

use super::checks::{check_demographics, check_identifiers, check_pid, scan_pii};
use crate::core::identity::IdentityMap;
use crate::core::kanonymity::{check_k_anonymity, KAnonymityReport};
use crate::core::provenance::{is_hash, verify_release};
use crate::domain::{FieldViolation, PipelineError, ReleaseSet, Strength};
use serde::{Deserialize, Serialize};

/// Cohort reports for both strengths of a validated release
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    /// k-anonymity over the storage records
    pub storage: KAnonymityReport,
    /// k-anonymity over the chain records
    pub chain: KAnonymityReport,
}

impl ValidationReport {
    /// Whether enforcement was bypassed for a small corpus
    pub fn bypassed(&self) -> bool {
        self.storage.bypassed || self.chain.bypassed
    }
}

/// Composite gate run on the final release set
///
/// Checks, in order: PII denylist, required demographics, identifiers,
/// k-anonymity (storage, then chain), provenance. The first failing category
/// is returned with every violation of that category.
#[derive(Debug, Clone, Copy)]
pub struct OutputValidator {
    k: usize,
}

impl OutputValidator {
    /// Creates a validator enforcing cohorts of at least `k`
    pub fn new(k: usize) -> Self {
        Self { k }
    }

    /// Validates a release set against the batch's identity map
    ///
    /// # Errors
    ///
    /// Returns the [`PipelineError`] of the first violated category.
    pub fn validate(
        &self,
        release: &ReleaseSet,
        identities: &IdentityMap,
    ) -> Result<ValidationReport, PipelineError> {
        let storage = &release.anonymized_records;
        let chain = &release.chain_records;

        let mut violations = scan_pii(storage);
        violations.extend(scan_pii(chain));
        if !violations.is_empty() {
            return Err(PipelineError::PiiLeak { violations });
        }

        let mut violations = check_demographics(storage);
        violations.extend(check_demographics(chain));
        if !violations.is_empty() {
            return Err(PipelineError::MissingDemographic { violations });
        }

        let mut violations = check_identifiers(storage, identities);
        violations.extend(check_identifiers(chain, identities));
        violations.extend(check_consent_hashes(release, identities));
        if !violations.is_empty() {
            return Err(PipelineError::InvalidIdentifier { violations });
        }

        let storage_report = check_k_anonymity(storage, self.k)?;
        let chain_report = check_k_anonymity(chain, self.k)?;

        verify_release(release)?;

        Ok(ValidationReport {
            storage: storage_report,
            chain: chain_report,
        })
    }
}

fn check_consent_hashes(release: &ReleaseSet, identities: &IdentityMap) -> Vec<FieldViolation> {
    let mut violations = Vec::new();
    for (index, consent) in release.consent_hashes.iter().enumerate() {
        violations.extend(check_pid(
            index,
            Strength::Chain,
            &consent.anonymous_pid,
            identities,
        ));
        if !is_hash(&consent.consent_hash) {
            violations.push(FieldViolation::new(
                index,
                "consentHash",
                Strength::Chain,
                "not a SHA-256 hex digest",
            ));
        }
    }
    violations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::generalize::Generalizer;
    use crate::core::provenance::{batch_hash, build_provenance};
    use crate::domain::{
        AnonymousPid, CanonicalRecord, ClinicalValue, ConsentHash, GeneralizedRecord, PatientKey,
        ResourceKind,
    };
    use chrono::NaiveDate;

    const T: &str = "2024-06-01T00:00:00.000Z";

    fn release(n: usize) -> (ReleaseSet, IdentityMap) {
        let g = Generalizer::with_defaults(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
        let mut identities = IdentityMap::new();
        let mut storage = Vec::new();
        for i in 0..n {
            let key = PatientKey::new(format!("P-{i}")).unwrap();
            let pid = identities.assign(&key);
            let mut raw = CanonicalRecord::new(i, ResourceKind::Observation, key);
            raw.demographics.age = Some(37);
            raw.demographics.gender = Some("F".into());
            raw.demographics.country = Some("Uganda".into());
            raw.clinical.insert("Result".into(), "95".into());
            storage.push(g.storage(&raw, pid));
        }
        (assemble(&g, storage), identities)
    }

    fn assemble(g: &Generalizer, storage: Vec<GeneralizedRecord>) -> ReleaseSet {
        let chain: Vec<_> = storage.iter().map(|r| g.chain(r)).collect();
        let provenance = storage
            .iter()
            .zip(&chain)
            .enumerate()
            .map(|(i, (s, c))| build_provenance(i, s, c, T).unwrap())
            .collect();
        ReleaseSet {
            batch_hash: batch_hash(&storage).unwrap(),
            chain_batch_hash: batch_hash(&chain).unwrap(),
            anonymized_records: storage,
            chain_records: chain,
            provenance_records: provenance,
            consent_hashes: vec![],
        }
    }

    #[test]
    fn test_valid_release_passes() {
        let (release, identities) = release(5);
        let report = OutputValidator::new(5).validate(&release, &identities).unwrap();
        assert!(!report.bypassed());
        assert_eq!(report.storage.total_records, 5);
        assert_eq!(report.chain.cohort_count, 1);
    }

    #[test]
    fn test_small_release_bypasses_k() {
        let (release, identities) = release(3);
        let report = OutputValidator::new(5).validate(&release, &identities).unwrap();
        assert!(report.bypassed());
    }

    #[test]
    fn test_mutated_record_after_generalization_caught() {
        let (mut release, identities) = release(5);
        release.anonymized_records[2]
            .clinical
            .insert("address".into(), ClinicalValue::parse("Plot 4, Kololo"));

        let err = OutputValidator::new(5).validate(&release, &identities).unwrap_err();
        assert_eq!(err.category(), "PIILeakError");
    }

    #[test]
    fn test_pii_checked_before_demographics() {
        let (mut release, identities) = release(5);
        release.chain_records[0].country = None;
        release.anonymized_records[1]
            .clinical
            .insert("email".into(), ClinicalValue::parse("jane@example.org"));

        let err = OutputValidator::new(5).validate(&release, &identities).unwrap_err();
        assert_eq!(err.category(), "PIILeakError");
    }

    #[test]
    fn test_mixed_batches_caught_by_identity_map() {
        let (larger, _) = release(5);
        let (_, smaller_identities) = release(2);

        let err = OutputValidator::new(5)
            .validate(&larger, &smaller_identities)
            .unwrap_err();
        assert_eq!(err.category(), "InvalidIdentifierError");
    }

    #[test]
    fn test_broken_provenance_caught() {
        let (mut release, identities) = release(5);
        release.provenance_records[4].timestamp = "2030-01-01T00:00:00.000Z".into();

        let err = OutputValidator::new(5).validate(&release, &identities).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::ProvenanceLink {
                record_index: 4,
                ..
            }
        ));
    }

    #[test]
    fn test_consent_hash_for_unknown_pid_caught() {
        let (mut release, identities) = release(5);
        release.consent_hashes.push(ConsentHash {
            anonymous_pid: AnonymousPid::from_sequence(99),
            consent_hash: "0".repeat(64),
            timestamp: T.into(),
        });

        let err = OutputValidator::new(5).validate(&release, &identities).unwrap_err();
        assert_eq!(err.category(), "InvalidIdentifierError");
    }
}
