//! Domain error types
//!
//! This module defines the error hierarchy for deident. Pipeline failures use
//! the [`PipelineError`] taxonomy; everything around the pipeline (config,
//! I/O, audit) is folded into [`DeidentError`].
//!
//! No error in this module ever carries a raw field value. Violations are
//! reported by field name, record index and cohort key only.

use crate::domain::generalized::{CohortKey, Strength};
use std::fmt;
use thiserror::Error;

/// Main deident error type
///
/// This is the primary error type used outside the pipeline core.
#[derive(Debug, Error)]
pub enum DeidentError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A batch was rejected by the pipeline
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// Audit log errors
    #[error("Audit error: {0}")]
    Audit(String),

    /// Generic errors with context
    #[error("{0}")]
    Other(String),
}

/// A single field-level violation found by a validator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldViolation {
    /// Index of the offending record within the set being validated
    pub record_index: usize,
    /// Name of the offending field (never its value)
    pub field: String,
    /// Strength of the record set the violation was found in
    pub strength: Strength,
    /// Static description of what is wrong
    pub reason: String,
}

impl FieldViolation {
    /// Creates a new field violation
    pub fn new(
        record_index: usize,
        field: impl Into<String>,
        strength: Strength,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            record_index,
            field: field.into(),
            strength,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} record {}: field '{}' ({})",
            self.strength, self.record_index, self.field, self.reason
        )
    }
}

/// A cohort below the k threshold
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CohortViolation {
    /// Quasi-identifier tuple of the cohort
    pub cohort: CohortKey,
    /// Number of records in the cohort
    pub count: usize,
}

impl fmt::Display for CohortViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} has {} record(s)", self.cohort, self.count)
    }
}

/// Pipeline failure taxonomy
///
/// Every variant aborts the whole batch. Variants carrying a list report every
/// violation of that category, not just the first.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    /// Malformed or untyped input
    #[error("Normalization error: {reason}")]
    Normalization {
        /// Input record the failure relates to, if any
        record_index: Option<usize>,
        /// What is wrong with the input
        reason: String,
    },

    /// A disallowed PII field is present after generalization
    #[error("PII leak: {} disallowed field(s) present: {}", .violations.len(), join(.violations))]
    PiiLeak {
        /// Offending fields
        violations: Vec<FieldViolation>,
    },

    /// A required demographic field is absent or empty
    #[error("Missing demographic: {} field(s) absent: {}", .violations.len(), join(.violations))]
    MissingDemographic {
        /// Missing fields
        violations: Vec<FieldViolation>,
    },

    /// One or more cohorts are smaller than k
    #[error("k-anonymity violation (k={k}): {}", join(.violations))]
    KAnonymityViolation {
        /// Threshold in force
        k: usize,
        /// Every cohort below the threshold
        violations: Vec<CohortViolation>,
    },

    /// A PID is malformed or unknown, or an original identifier leaked
    #[error("Invalid identifier: {}", join(.violations))]
    InvalidIdentifier {
        /// Offending fields
        violations: Vec<FieldViolation>,
    },

    /// A chain record is not derivable from its storage record
    #[error("Provenance link error at record {record_index}: {reason}")]
    ProvenanceLink {
        /// Index of the storage/chain pair
        record_index: usize,
        /// Which derivation rule failed
        reason: String,
    },
}

impl PipelineError {
    /// Shorthand for a normalization failure tied to one input record
    pub fn normalization(record_index: Option<usize>, reason: impl Into<String>) -> Self {
        Self::Normalization {
            record_index,
            reason: reason.into(),
        }
    }

    /// Name of the taxonomy category, used in audit entries
    pub fn category(&self) -> &'static str {
        match self {
            Self::Normalization { .. } => "NormalizationError",
            Self::PiiLeak { .. } => "PIILeakError",
            Self::MissingDemographic { .. } => "MissingDemographicError",
            Self::KAnonymityViolation { .. } => "KAnonymityViolation",
            Self::InvalidIdentifier { .. } => "InvalidIdentifierError",
            Self::ProvenanceLink { .. } => "ProvenanceLinkError",
        }
    }

    /// Violation locations in audit-safe form
    pub fn locations(&self) -> Vec<String> {
        match self {
            Self::Normalization { record_index, .. } => record_index
                .map(|i| vec![format!("record {i}")])
                .unwrap_or_default(),
            Self::PiiLeak { violations }
            | Self::MissingDemographic { violations }
            | Self::InvalidIdentifier { violations } => {
                violations.iter().map(ToString::to_string).collect()
            }
            Self::KAnonymityViolation { violations, .. } => {
                violations.iter().map(ToString::to_string).collect()
            }
            Self::ProvenanceLink { record_index, .. } => vec![format!("record {record_index}")],
        }
    }
}

fn join<T: fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

// Conversion from std::io::Error
impl From<std::io::Error> for DeidentError {
    fn from(err: std::io::Error) -> Self {
        DeidentError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for DeidentError {
    fn from(err: serde_json::Error) -> Self {
        DeidentError::Serialization(err.to_string())
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for DeidentError {
    fn from(err: toml::de::Error) -> Self {
        DeidentError::Configuration(format!("TOML parse error: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::generalized::AgeRange;

    fn cohort() -> CohortKey {
        CohortKey {
            country: "Uganda".to_string(),
            age_range: Some(AgeRange::new(35, 39)),
            gender: "Female".to_string(),
            occupation: "Unknown".to_string(),
        }
    }

    #[test]
    fn test_deident_error_display() {
        let err = DeidentError::Configuration("Invalid config".to_string());
        assert_eq!(err.to_string(), "Configuration error: Invalid config");
    }

    #[test]
    fn test_pipeline_error_conversion() {
        let err = PipelineError::normalization(Some(3), "no patient identifier");
        let deident_err: DeidentError = err.into();
        assert!(matches!(deident_err, DeidentError::Pipeline(_)));
    }

    #[test]
    fn test_category_names() {
        let err = PipelineError::PiiLeak { violations: vec![] };
        assert_eq!(err.category(), "PIILeakError");

        let err = PipelineError::KAnonymityViolation {
            k: 5,
            violations: vec![],
        };
        assert_eq!(err.category(), "KAnonymityViolation");
    }

    #[test]
    fn test_k_violation_display_names_cohort_and_count() {
        let err = PipelineError::KAnonymityViolation {
            k: 5,
            violations: vec![CohortViolation {
                cohort: cohort(),
                count: 4,
            }],
        };
        let message = err.to_string();
        assert!(message.contains("(Uganda, 35-39, Female, Unknown)"));
        assert!(message.contains("4 record(s)"));
    }

    #[test]
    fn test_pii_leak_reports_field_names_only() {
        let err = PipelineError::PiiLeak {
            violations: vec![FieldViolation::new(
                2,
                "phone",
                Strength::Storage,
                "disallowed PII field",
            )],
        };
        let message = err.to_string();
        assert!(message.contains("phone"));
        assert!(message.contains("record 2"));
        assert_eq!(err.locations().len(), 1);
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let err: DeidentError = io_err.into();
        assert!(matches!(err, DeidentError::Io(_)));
    }

    #[test]
    fn test_serde_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let err: DeidentError = json_err.into();
        assert!(matches!(err, DeidentError::Serialization(_)));
    }

    #[test]
    fn test_toml_error_conversion() {
        let toml_err = toml::from_str::<toml::Value>("invalid = toml = syntax").unwrap_err();
        let err: DeidentError = toml_err.into();
        assert!(err.to_string().contains("TOML parse error"));
    }
}
