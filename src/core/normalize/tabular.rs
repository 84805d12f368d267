//! Flat tabular rows

use super::scalar_text;
use crate::anonymization::models::{FieldRole, PiiField};
use crate::domain::record::{CanonicalRecord, ConsentTerms, ResourceKind};
use crate::domain::generalized::MAX_AGE;
use crate::domain::sensitive::sensitive_opt;
use crate::domain::{PatientKey, PipelineError};
use serde_json::{Map, Value};

/// Default consent scope when a row carries a consent date only
pub(crate) const DEFAULT_CONSENT_TYPE: &str = "individual";

pub(super) fn normalize_rows(rows: &[Value]) -> Result<Vec<CanonicalRecord>, PipelineError> {
    rows.iter()
        .enumerate()
        .map(|(index, row)| match row {
            Value::Object(columns) => normalize_row(index, columns),
            _ => Err(PipelineError::normalization(
                Some(index),
                "row is not an object",
            )),
        })
        .collect()
}

fn normalize_row(index: usize, columns: &Map<String, Value>) -> Result<CanonicalRecord, PipelineError> {
    let mut patient_id = None;
    let mut name = None;
    let mut kind = ResourceKind::Observation;
    let mut consent_date = None;
    let mut consent_type = None;
    let mut record_fields = RowFields::default();

    for (column, value) in columns {
        if value.is_object() || value.is_array() {
            return Err(PipelineError::normalization(
                Some(index),
                format!("column '{column}' holds a nested value"),
            ));
        }
        let Some(text) = scalar_text(value) else {
            continue;
        };

        match FieldRole::classify(column) {
            Some(FieldRole::PatientId) => patient_id = Some(text),
            Some(FieldRole::Pii(PiiField::Name)) => name = Some(text),
            Some(FieldRole::Pii(PiiField::Address)) => record_fields.address = Some(text),
            Some(FieldRole::Pii(PiiField::Phone)) => record_fields.phone = Some(text),
            Some(FieldRole::Pii(PiiField::Email)) => record_fields.email = Some(text),
            Some(FieldRole::Pii(PiiField::NationalId)) => record_fields.national_id = Some(text),
            Some(FieldRole::Pii(PiiField::BirthDate)) => record_fields.birth_date = Some(text),
            Some(FieldRole::Contact(field)) => {
                tracing::debug!(record = index, field = %field, "Dropping third-party contact column");
            }
            Some(FieldRole::Gender) => record_fields.gender = Some(text),
            Some(FieldRole::Country) => record_fields.country = Some(text),
            Some(FieldRole::Region) => record_fields.region = Some(text),
            Some(FieldRole::Occupation) => record_fields.occupation = Some(text),
            Some(FieldRole::Age) => record_fields.age = parse_age(&text),
            Some(FieldRole::ConsentDate) => consent_date = Some(text),
            Some(FieldRole::ConsentType) => consent_type = Some(text),
            Some(FieldRole::ResourceType) => kind = parse_kind(index, &text)?,
            None => {
                record_fields.clinical.push((column.clone(), text));
            }
        }
    }

    let key = patient_id
        .or_else(|| name.clone())
        .and_then(|k| PatientKey::new(k).ok())
        .ok_or_else(|| {
            PipelineError::normalization(
                Some(index),
                "record has neither a patient identifier nor a name",
            )
        })?;

    let mut record = CanonicalRecord::new(index, kind, key);
    record.identifiers.name = sensitive_opt(name);
    record.identifiers.address = sensitive_opt(record_fields.address);
    record.identifiers.phone = sensitive_opt(record_fields.phone);
    record.identifiers.email = sensitive_opt(record_fields.email);
    record.identifiers.national_id = sensitive_opt(record_fields.national_id);
    record.demographics.birth_date = sensitive_opt(record_fields.birth_date);
    record.demographics.age = record_fields.age;
    record.demographics.gender = record_fields.gender;
    record.demographics.country = record_fields.country;
    record.demographics.region = record_fields.region;
    record.demographics.occupation = record_fields.occupation;
    record.clinical = record_fields.clinical.into_iter().collect();
    record.consent = consent_date.map(|consent_date| ConsentTerms {
        consent_date,
        consent_type: consent_type.unwrap_or_else(|| DEFAULT_CONSENT_TYPE.to_string()),
    });

    Ok(record)
}

#[derive(Default)]
struct RowFields {
    address: Option<String>,
    phone: Option<String>,
    email: Option<String>,
    national_id: Option<String>,
    birth_date: Option<String>,
    age: Option<u32>,
    gender: Option<String>,
    country: Option<String>,
    region: Option<String>,
    occupation: Option<String>,
    clinical: Vec<(String, String)>,
}

fn parse_age(text: &str) -> Option<u32> {
    text.parse::<u32>()
        .ok()
        .or_else(|| {
            text.parse::<f64>()
                .ok()
                .filter(|a| a.is_finite() && *a >= 0.0)
                .map(|a| a as u32)
        })
        .filter(|age| *age <= MAX_AGE)
}

fn parse_kind(index: usize, text: &str) -> Result<ResourceKind, PipelineError> {
    match text {
        "Patient" => Ok(ResourceKind::Patient),
        "Observation" => Ok(ResourceKind::Observation),
        "Consent" => Ok(ResourceKind::Consent),
        other => Err(PipelineError::normalization(
            Some(index),
            format!("unsupported resource type '{other}'"),
        )),
    }
}
