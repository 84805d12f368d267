//! k-anonymity grouping and enforcement

use crate::domain::{CohortKey, CohortViolation, GeneralizedRecord, PipelineError, Strength};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Default minimum cohort size
pub const DEFAULT_K: usize = 5;

/// What to do when a cohort is smaller than k
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViolationPolicy {
    /// Reject the whole batch
    #[default]
    Reject,
    /// Drop the undersized cohorts and release the rest
    Suppress,
}

impl fmt::Display for ViolationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reject => f.write_str("reject"),
            Self::Suppress => f.write_str("suppress"),
        }
    }
}

impl FromStr for ViolationPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "reject" => Ok(Self::Reject),
            "suppress" => Ok(Self::Suppress),
            _ => Err(format!(
                "Invalid violation policy: {s}. Expected 'reject' or 'suppress'"
            )),
        }
    }
}

/// Outcome of a k-anonymity check over one record set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KAnonymityReport {
    /// Threshold in force
    pub k: usize,
    /// Strength of the checked records, if any were checked
    pub strength: Option<Strength>,
    /// Records checked
    pub total_records: usize,
    /// Distinct cohorts
    pub cohort_count: usize,
    /// Size of the smallest cohort
    pub smallest_cohort: Option<usize>,
    /// Whether enforcement was skipped because the set is smaller than k
    pub bypassed: bool,
}

/// Groups records by quasi-identifier tuple
///
/// Values are record indices in input order.
pub fn group_cohorts(records: &[GeneralizedRecord]) -> BTreeMap<CohortKey, Vec<usize>> {
    let mut cohorts: BTreeMap<CohortKey, Vec<usize>> = BTreeMap::new();
    for (index, record) in records.iter().enumerate() {
        cohorts.entry(record.cohort_key()).or_default().push(index);
    }
    cohorts
}

/// Every cohort smaller than `k`, in key order
pub fn undersized_cohorts(
    cohorts: &BTreeMap<CohortKey, Vec<usize>>,
    k: usize,
) -> Vec<CohortViolation> {
    cohorts
        .iter()
        .filter(|(_, members)| members.len() < k)
        .map(|(cohort, members)| CohortViolation {
            cohort: cohort.clone(),
            count: members.len(),
        })
        .collect()
}

/// Enforces k-anonymity over a record set
///
/// A set with fewer than `k` records in total is not enforced: a warning is
/// logged and the report is marked as bypassed.
///
/// # Errors
///
/// Returns [`PipelineError::KAnonymityViolation`] listing every undersized
/// cohort with its count.
pub fn check_k_anonymity(
    records: &[GeneralizedRecord],
    k: usize,
) -> Result<KAnonymityReport, PipelineError> {
    let cohorts = group_cohorts(records);
    let strength = records.first().map(|r| r.strength);
    let report = KAnonymityReport {
        k,
        strength,
        total_records: records.len(),
        cohort_count: cohorts.len(),
        smallest_cohort: cohorts.values().map(Vec::len).min(),
        bypassed: records.len() < k,
    };

    if report.bypassed {
        crate::log_k_anonymity_bypass!(records.len(), k);
        return Ok(report);
    }

    let violations = undersized_cohorts(&cohorts, k);
    if violations.is_empty() {
        Ok(report)
    } else {
        Err(PipelineError::KAnonymityViolation { k, violations })
    }
}

/// Indices of records to keep after dropping undersized cohorts
///
/// Returns the kept indices (in input order) and the suppressed cohorts. A
/// set smaller than `k` is bypassed and kept whole.
pub fn suppress_undersized(
    records: &[GeneralizedRecord],
    k: usize,
) -> (Vec<usize>, Vec<CohortViolation>) {
    if records.len() < k {
        return ((0..records.len()).collect(), Vec::new());
    }

    let cohorts = group_cohorts(records);
    let suppressed = undersized_cohorts(&cohorts, k);
    let mut kept: Vec<usize> = cohorts
        .into_values()
        .filter(|members| members.len() >= k)
        .flatten()
        .collect();
    kept.sort_unstable();

    for violation in &suppressed {
        tracing::warn!(
            cohort = %violation.cohort,
            count = violation.count,
            k = k,
            "Suppressing cohort below k"
        );
    }

    (kept, suppressed)
}
