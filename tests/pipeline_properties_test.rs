//! Property checks over generated corpora
//!
//! Corpora are filled with `fake` names, phone numbers, emails and
//! addresses, then run through the full pipeline.

use chrono::{NaiveDate, TimeZone, Utc};
use deident::core::generalize::{check_coarsening, Generalizer};
use deident::core::normalize::normalize;
use deident::core::pipeline::{run_batch, BatchOutput, PipelineOptions};
use deident::core::provenance::verify_link;
use deident::domain::AnonymousPid;
use fake::faker::address::en::{BuildingNumber, CityName, StreetName};
use fake::faker::internet::en::SafeEmail;
use fake::faker::name::en::Name;
use fake::faker::phone_number::en::PhoneNumber;
use fake::Fake;
use serde_json::{json, Value};
use std::collections::HashSet;
use test_case::test_case;

/// Raw identifying values of one generated patient
struct GeneratedPatient {
    key: String,
    name: String,
    phone: String,
    email: String,
    street: String,
}

fn options() -> PipelineOptions {
    PipelineOptions {
        k: 5,
        reference_date: NaiveDate::from_ymd_opt(2024, 6, 1),
        timestamp: Some(Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()),
        ..PipelineOptions::default()
    }
}

/// Builds `patients` generated patients with `visits` rows each
fn corpus(patients: usize, visits: usize) -> (Value, Vec<GeneratedPatient>) {
    let mut rows = Vec::new();
    let mut generated = Vec::new();

    for i in 0..patients {
        let building: String = BuildingNumber().fake();
        let street_name: String = StreetName().fake();
        let patient = GeneratedPatient {
            key: format!("MRN-{i:05}"),
            name: Name().fake(),
            phone: PhoneNumber().fake(),
            email: SafeEmail().fake(),
            street: format!("{building} {street_name}"),
        };
        let city: String = CityName().fake();

        for visit in 0..visits {
            let result: u32 = (60..120).fake();
            rows.push(json!({
                "MRN": patient.key,
                "Full Name": patient.name,
                "Phone": patient.phone,
                "Email": patient.email,
                "Address": format!("{}, {city}, Uganda", patient.street),
                "Date of Birth": "1987-02-11",
                "Sex": "F",
                "Test": format!("visit-{visit}"),
                "Result": result.to_string(),
            }));
        }
        generated.push(patient);
    }

    (Value::Array(rows), generated)
}

fn run(patients: usize, visits: usize) -> (BatchOutput, Vec<GeneratedPatient>) {
    let (input, generated) = corpus(patients, visits);
    let output = run_batch(&input, &options()).unwrap();
    (output, generated)
}

#[test_case(5, 1; "one visit each")]
#[test_case(8, 3; "repeat visits")]
#[test_case(20, 2; "larger corpus")]
fn test_pids_are_a_bijection(patients: usize, visits: usize) {
    let (output, generated) = run(patients, visits);

    assert_eq!(output.patient_mapping.len(), patients);
    let expected: HashSet<String> = (1..=patients)
        .map(|n| AnonymousPid::from_sequence(n).as_str().to_string())
        .collect();
    let assigned: HashSet<String> = output
        .patient_mapping
        .iter()
        .map(|(_, pid)| pid.as_str().to_string())
        .collect();
    assert_eq!(assigned, expected);

    for (position, patient) in generated.iter().enumerate() {
        let pid = output
            .patient_mapping
            .iter()
            .find(|(key, _)| key.expose() == patient.key)
            .map(|(_, pid)| pid.clone())
            .unwrap();
        assert_eq!(pid, AnonymousPid::from_sequence(position + 1));
    }
}

#[test_case(5, 1; "one visit each")]
#[test_case(12, 2; "repeat visits")]
fn test_release_never_contains_raw_identifiers(patients: usize, visits: usize) {
    let (output, generated) = run(patients, visits);
    let release = serde_json::to_string(&output.release).unwrap();

    for patient in &generated {
        assert!(!release.contains(&patient.key));
        assert!(!release.contains(&patient.name));
        assert!(!release.contains(&patient.phone));
        assert!(!release.contains(&patient.email));
        assert!(!release.contains(&patient.street));
    }
    assert!(!release.contains("1987-02-11"));
}

#[test]
fn test_chain_generalization_is_a_fixed_point() {
    let (input, _) = corpus(6, 2);
    let records = normalize(&input).unwrap();
    let generalizer = Generalizer::with_defaults(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());

    for (n, record) in records.iter().enumerate() {
        let storage = generalizer.storage(record, AnonymousPid::from_sequence(n + 1));
        let chain = generalizer.chain(&storage);

        assert_eq!(generalizer.chain(&chain), chain);
        assert!(check_coarsening(&storage, &chain).is_ok());
    }
}

#[test]
fn test_provenance_is_derivable() {
    let (output, _) = run(6, 2);
    let release = &output.release;

    for (index, provenance) in release.provenance_records.iter().enumerate() {
        assert!(provenance.verify_proof());
        assert!(verify_link(
            index,
            &release.anonymized_records[index],
            &release.chain_records[index],
            provenance
        )
        .is_ok());

        let mut moved = provenance.clone();
        moved.timestamp = "2024-06-01T12:00:00.001Z".to_string();
        assert!(!moved.verify_proof());

        let mut reassigned = provenance.clone();
        reassigned.anonymous_pid = AnonymousPid::from_sequence(999);
        assert!(!reassigned.verify_proof());
    }
}

#[test]
fn test_every_chain_record_is_coarser() {
    let (output, _) = run(10, 1);
    for (storage, chain) in output
        .release
        .anonymized_records
        .iter()
        .zip(&output.release.chain_records)
    {
        assert!(check_coarsening(storage, chain).is_ok());
        let (s, c) = (storage.age_range.unwrap(), chain.age_range.unwrap());
        assert!(c.contains(&s));
    }
}
