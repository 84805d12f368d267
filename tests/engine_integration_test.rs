//! Integration tests for the de-identification engine

use deident::anonymization::config::AuditConfig;
use deident::anonymization::{BatchReport, DeidentificationEngine, PrivacyConfig};
use deident::core::kanonymity::ViolationPolicy;
use deident::domain::DeidentError;
use serde_json::{json, Value};
use tempfile::TempDir;

fn batch(country: &str, n: usize) -> Value {
    let rows: Vec<_> = (0..n)
        .map(|i| {
            json!({
                "Patient ID": format!("{country}-{i}"),
                "Name": format!("Patient {i} of {country}"),
                "Gender": "F",
                "Age": 29,
                "Country": country,
                "Occupation": "Teacher",
                "Result": "negative",
            })
        })
        .collect();
    Value::Array(rows)
}

fn engine(dir: &TempDir) -> DeidentificationEngine {
    let config = PrivacyConfig {
        audit: AuditConfig {
            enabled: true,
            log_path: dir.path().join("audit").join("deident.log"),
            json_format: true,
        },
        ..PrivacyConfig::default()
    };
    DeidentificationEngine::new(config).unwrap()
}

#[tokio::test]
async fn test_concurrent_batches_are_independent() {
    let dir = TempDir::new().unwrap();
    let engine = engine(&dir);

    let results = engine
        .process_batches(vec![batch("Uganda", 5), batch("Kenya", 7), batch("Ghana", 6)])
        .await;

    assert_eq!(results.len(), 3);
    let outputs: Vec<_> = results.into_iter().map(Result::unwrap).collect();

    for (output, (country, n)) in outputs.iter().zip([("Uganda", 5), ("Kenya", 7), ("Ghana", 6)]) {
        assert_eq!(output.release.len(), n);
        assert_eq!(output.patient_mapping.len(), n);
        assert!(output
            .release
            .anonymized_records
            .iter()
            .all(|r| r.country.as_deref() == Some(country)));
        // Each batch numbers its own patients from PID-001
        assert_eq!(
            output.release.anonymized_records[0].anonymous_pid.as_str(),
            "PID-001"
        );
    }

    let content = std::fs::read_to_string(dir.path().join("audit").join("deident.log")).unwrap();
    assert_eq!(content.lines().count(), 3);
    assert!(!content.contains("Patient 0 of"));
}

#[tokio::test]
async fn test_one_rejected_batch_does_not_affect_others() {
    let dir = TempDir::new().unwrap();
    let engine = engine(&dir);

    let mut mixed = batch("Uganda", 5);
    mixed
        .as_array_mut()
        .unwrap()
        .push(json!({"Patient ID": "X", "Gender": "M", "Age": 70, "Country": "Togo"}));

    let results = engine
        .process_batches(vec![batch("Uganda", 5), mixed, json!(42)])
        .await;

    assert!(results[0].is_ok());
    assert!(matches!(
        results[1],
        Err(DeidentError::Pipeline(ref e)) if e.category() == "KAnonymityViolation"
    ));
    assert!(matches!(
        results[2],
        Err(DeidentError::Pipeline(ref e)) if e.category() == "NormalizationError"
    ));
}

#[tokio::test]
async fn test_suppression_reported() {
    let config = PrivacyConfig {
        on_violation: ViolationPolicy::Suppress,
        audit: AuditConfig::disabled(),
        ..PrivacyConfig::default()
    };
    let engine = DeidentificationEngine::new(config).unwrap();

    let mut mixed = batch("Uganda", 5);
    mixed
        .as_array_mut()
        .unwrap()
        .push(json!({"Patient ID": "X", "Gender": "M", "Age": 70, "Country": "Togo"}));

    let output = engine
        .process_batches(vec![mixed])
        .await
        .pop()
        .unwrap()
        .unwrap();
    let report = BatchReport::released(&output, 0);

    assert_eq!(report.input_records, 6);
    assert_eq!(report.released_records, 5);
    assert_eq!(report.cohorts.suppressed_cohorts, 1);
    assert_eq!(report.cohorts.suppressed_records, 1);
    assert!(report.warnings.iter().any(|w| w.contains("Togo")));
}
