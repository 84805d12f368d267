//! Canonical intermediate records
//!
//! Every input shape (tabular rows, clinical-resource bundles) is normalized
//! into [`CanonicalRecord`]. These records carry raw PII and exist only inside
//! the pipeline; they have no `Serialize` impl.

use crate::domain::ids::PatientKey;
use crate::domain::sensitive::SensitiveString;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Known clinical resource kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResourceKind {
    /// Patient demographics without an attached observation
    Patient,
    /// A clinical observation (lab result, vital sign, visit row)
    Observation,
    /// A consent decision
    Consent,
}

impl ResourceKind {
    /// Resource type tag as used on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Patient => "Patient",
            Self::Observation => "Observation",
            Self::Consent => "Consent",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Directly identifying fields; never emitted
#[derive(Debug, Clone, Default)]
pub struct DirectIdentifiers {
    /// Full name
    pub name: Option<SensitiveString>,
    /// Postal address, free text
    pub address: Option<SensitiveString>,
    /// Telephone number
    pub phone: Option<SensitiveString>,
    /// Email address
    pub email: Option<SensitiveString>,
    /// National ID / SSN / passport number
    pub national_id: Option<SensitiveString>,
}

/// Quasi-identifying fields before generalization
#[derive(Debug, Clone, Default)]
pub struct RawDemographics {
    /// Birth date as supplied
    pub birth_date: Option<SensitiveString>,
    /// Age in years, when supplied instead of a birth date
    pub age: Option<u32>,
    /// Gender as supplied
    pub gender: Option<String>,
    /// Explicit country column
    pub country: Option<String>,
    /// Explicit region / district column
    pub region: Option<String>,
    /// Occupation as supplied
    pub occupation: Option<String>,
}

/// Consent decision attached to a record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsentTerms {
    /// Date the consent was given
    pub consent_date: String,
    /// Consent scope, e.g. "individual" or "bulk"
    pub consent_type: String,
}

/// One normalized input record
#[derive(Debug, Clone)]
pub struct CanonicalRecord {
    /// Position of the record in the normalized sequence
    pub source_index: usize,
    /// Resource kind
    pub kind: ResourceKind,
    /// Original patient key (ID, falling back to name)
    pub patient_key: PatientKey,
    /// Direct identifiers
    pub identifiers: DirectIdentifiers,
    /// Quasi-identifiers
    pub demographics: RawDemographics,
    /// Non-identifying clinical fields, by original field name
    pub clinical: BTreeMap<String, String>,
    /// Consent decision, if the record carries one
    pub consent: Option<ConsentTerms>,
}

impl CanonicalRecord {
    /// Creates an empty record of the given kind for a patient
    pub fn new(source_index: usize, kind: ResourceKind, patient_key: PatientKey) -> Self {
        Self {
            source_index,
            kind,
            patient_key,
            identifiers: DirectIdentifiers::default(),
            demographics: RawDemographics::default(),
            clinical: BTreeMap::new(),
            consent: None,
        }
    }

    /// Whether this record belongs in the generalized release set
    ///
    /// Consent records only produce consent hashes.
    pub fn is_releasable(&self) -> bool {
        self.kind != ResourceKind::Consent
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::sensitive::sensitive;

    #[test]
    fn test_resource_kind_serde() {
        let json = serde_json::to_string(&ResourceKind::Observation).unwrap();
        assert_eq!(json, "\"Observation\"");
        assert_eq!(ResourceKind::Consent.to_string(), "Consent");
    }

    #[test]
    fn test_consent_not_releasable() {
        let key = PatientKey::new("P-1").unwrap();
        let record = CanonicalRecord::new(0, ResourceKind::Consent, key.clone());
        assert!(!record.is_releasable());

        let record = CanonicalRecord::new(1, ResourceKind::Observation, key);
        assert!(record.is_releasable());
    }

    #[test]
    fn test_record_debug_hides_pii() {
        let key = PatientKey::new("Jane Namukasa").unwrap();
        let mut record = CanonicalRecord::new(0, ResourceKind::Observation, key);
        record.identifiers.phone = Some(sensitive("+256700123456".to_string()));
        record.demographics.birth_date = Some(sensitive("1987-02-11".to_string()));

        let debug = format!("{record:?}");
        assert!(!debug.contains("Namukasa"));
        assert!(!debug.contains("700123456"));
        assert!(!debug.contains("1987-02-11"));
    }
}
