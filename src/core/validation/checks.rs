//! Record-level checks
//!
//! Each check returns every violation of its category. Violations carry a
//! field name and record index, never a value.

use crate::anonymization::models::{FieldRole, PiiField};
use crate::core::identity::IdentityMap;
use crate::domain::ids::PID_PREFIX;
use crate::domain::{AnonymousPid, FieldViolation, GeneralizedRecord, Strength};
use serde_json::Value;

fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
        _ => true,
    }
}

/// Scans record field names against the PII denylist
///
/// Top-level fields and clinical fields are both scanned. A denylisted field
/// with an empty value is not a leak.
pub fn scan_pii(records: &[GeneralizedRecord]) -> Vec<FieldViolation> {
    let mut violations = Vec::new();
    for (index, record) in records.iter().enumerate() {
        let Ok(value) = serde_json::to_value(record) else {
            violations.push(FieldViolation::new(
                index,
                "*",
                record.strength,
                "record could not be serialized for scanning",
            ));
            continue;
        };
        scan_object(index, record.strength, &value, &mut violations);
    }
    violations
}

fn scan_object(index: usize, strength: Strength, value: &Value, out: &mut Vec<FieldViolation>) {
    let Value::Object(map) = value else {
        return;
    };
    for (field, nested) in map {
        if let Some(pii) = PiiField::from_field_name(field) {
            if is_present(nested) {
                out.push(FieldViolation::new(
                    index,
                    field.clone(),
                    strength,
                    format!("disallowed {} field", pii.label()),
                ));
            }
        }
        scan_object(index, strength, nested, out);
    }
}

/// Checks that `ageRange`, `country` and `gender` are present and non-empty
pub fn check_demographics(records: &[GeneralizedRecord]) -> Vec<FieldViolation> {
    let mut violations = Vec::new();
    for (index, record) in records.iter().enumerate() {
        let blank = |value: &Option<String>| value.as_deref().map_or(true, |v| v.trim().is_empty());
        if record.age_range.is_none() {
            violations.push(FieldViolation::new(
                index,
                "ageRange",
                record.strength,
                "required demographic missing",
            ));
        }
        if blank(&record.country) {
            violations.push(FieldViolation::new(
                index,
                "country",
                record.strength,
                "required demographic missing",
            ));
        }
        if blank(&record.gender) {
            violations.push(FieldViolation::new(
                index,
                "gender",
                record.strength,
                "required demographic missing",
            ));
        }
    }
    violations
}

/// Checks PID syntax, PID membership and identifier-like clinical fields
///
/// A clinical field named like an original identifier (`patientId`, `MRN`,
/// ...) is a violation unless its value carries the `PID-` prefix.
pub fn check_identifiers(
    records: &[GeneralizedRecord],
    identities: &IdentityMap,
) -> Vec<FieldViolation> {
    let mut violations = Vec::new();
    for (index, record) in records.iter().enumerate() {
        violations.extend(check_pid(index, record.strength, &record.anonymous_pid, identities));

        for (field, value) in &record.clinical {
            let resembles_identifier = FieldRole::classify(field).is_some_and(|r| r.is_identifier());
            if resembles_identifier && !value.to_string().starts_with(PID_PREFIX) {
                violations.push(FieldViolation::new(
                    index,
                    field.clone(),
                    record.strength,
                    "original identifier without PID- prefix",
                ));
            }
        }
    }
    violations
}

/// Checks one PID against syntax and the batch's identity map
pub fn check_pid(
    index: usize,
    strength: Strength,
    pid: &AnonymousPid,
    identities: &IdentityMap,
) -> Option<FieldViolation> {
    if !AnonymousPid::is_valid(pid.as_str()) {
        return Some(FieldViolation::new(
            index,
            "anonymousPid",
            strength,
            "malformed PID",
        ));
    }
    if !identities.contains_pid(pid) {
        return Some(FieldViolation::new(
            index,
            "anonymousPid",
            strength,
            "PID not in this batch's identity map",
        ));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AgeRange, ClinicalValue, PatientKey, ResourceKind};
    use std::collections::BTreeMap;

    fn record(pid: usize) -> GeneralizedRecord {
        GeneralizedRecord {
            anonymous_pid: AnonymousPid::from_sequence(pid),
            resource_type: ResourceKind::Observation,
            strength: Strength::Storage,
            age_range: Some(AgeRange::new(35, 39)),
            gender: Some("Female".to_string()),
            country: Some("Uganda".to_string()),
            region: Some("Kampala".to_string()),
            occupation: "Nurse".to_string(),
            clinical: BTreeMap::from([("Result".to_string(), ClinicalValue::parse("95"))]),
        }
    }

    fn identities(n: usize) -> IdentityMap {
        let mut map = IdentityMap::new();
        for i in 0..n {
            map.assign(&PatientKey::new(format!("P-{i}")).unwrap());
        }
        map
    }

    #[test]
    fn test_clean_records_pass_every_check() {
        let records = vec![record(1), record(2)];
        assert!(scan_pii(&records).is_empty());
        assert!(check_demographics(&records).is_empty());
        assert!(check_identifiers(&records, &identities(2)).is_empty());
    }

    #[test]
    fn test_pii_in_clinical_fields_reported_by_name() {
        let mut leaked = record(1);
        leaked
            .clinical
            .insert("Phone".to_string(), ClinicalValue::parse("+256700123456"));
        leaked
            .clinical
            .insert("Date of Birth".to_string(), ClinicalValue::parse("1987-02-11"));

        let violations = scan_pii(&[record(2), leaked]);
        assert_eq!(violations.len(), 2);
        assert!(violations.iter().all(|v| v.record_index == 1));
        assert!(violations.iter().any(|v| v.field == "Phone"));
        for violation in &violations {
            assert!(!violation.to_string().contains("700123456"));
            assert!(!violation.to_string().contains("1987"));
        }
    }

    #[test]
    fn test_empty_pii_field_is_not_a_leak() {
        let mut record = record(1);
        record
            .clinical
            .insert("email".to_string(), ClinicalValue::parse("  "));
        assert!(scan_pii(&[record]).is_empty());
    }

    #[test]
    fn test_missing_demographics() {
        let mut incomplete = record(1);
        incomplete.age_range = None;
        incomplete.gender = Some(" ".to_string());

        let violations = check_demographics(&[incomplete]);
        let fields: Vec<&str> = violations.iter().map(|v| v.field.as_str()).collect();
        assert_eq!(fields, ["ageRange", "gender"]);
    }

    #[test]
    fn test_unknown_pid_rejected() {
        let violations = check_identifiers(&[record(3)], &identities(2));
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].field, "anonymousPid");
    }

    #[test]
    fn test_original_identifier_field_rejected() {
        let mut leaked = record(1);
        leaked
            .clinical
            .insert("MRN".to_string(), ClinicalValue::parse("MRN-0042"));
        let violations = check_identifiers(&[leaked], &identities(1));
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].field, "MRN");

        let mut prefixed = record(1);
        prefixed
            .clinical
            .insert("patientId".to_string(), ClinicalValue::parse("PID-001"));
        assert!(check_identifiers(&[prefixed], &identities(1)).is_empty());
    }
}
