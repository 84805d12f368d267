//! Clinical-resource bundles
//!
//! Patients are resolved first; observations and consents are then joined to
//! them by reference. A patient with no observation still yields one
//! `Patient` record so its demographics are released.

use super::scalar_text;
use super::tabular::DEFAULT_CONSENT_TYPE;
use crate::domain::record::{
    CanonicalRecord, ConsentTerms, DirectIdentifiers, RawDemographics, ResourceKind,
};
use crate::domain::sensitive::sensitive_opt;
use crate::domain::{PatientKey, PipelineError};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

struct BundlePatient {
    key: PatientKey,
    identifiers: DirectIdentifiers,
    demographics: RawDemographics,
    linked: usize,
}

enum Entry<'a> {
    Patient(usize),
    Observation(&'a Value, Option<usize>),
    Consent(&'a Value, Option<usize>),
    Skipped,
}

pub(super) fn normalize_bundle(entries: &[Value]) -> Result<Vec<CanonicalRecord>, PipelineError> {
    let mut patients: Vec<BundlePatient> = Vec::new();
    let mut references: HashMap<String, usize> = HashMap::new();
    let mut classified = Vec::with_capacity(entries.len());

    for (index, entry) in entries.iter().enumerate() {
        let resource = entry.get("resource").unwrap_or(entry);
        let resource_type = resource
            .get("resourceType")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                PipelineError::normalization(Some(index), "bundle entry has no resourceType")
            })?;

        let kind = match resource_type {
            "Patient" => {
                let patient = parse_patient(index, resource)?;
                let position = patients.len();
                if let Some(id) = resource.get("id").and_then(Value::as_str) {
                    references.insert(format!("Patient/{id}"), position);
                    references.entry(id.to_string()).or_insert(position);
                }
                if let Some(full_url) = entry.get("fullUrl").and_then(Value::as_str) {
                    references.insert(full_url.to_string(), position);
                }
                patients.push(patient);
                Entry::Patient(position)
            }
            "Observation" => Entry::Observation(resource, None),
            "Consent" => Entry::Consent(resource, None),
            other => {
                tracing::debug!(entry = index, resource_type = other, "Skipping unsupported resource");
                Entry::Skipped
            }
        };
        classified.push(kind);
    }

    // Join observations and consents once every patient reference is known
    for (index, entry) in classified.iter_mut().enumerate() {
        match entry {
            Entry::Observation(resource, target) => {
                let position = resolve_patient(index, *resource, &["subject"], &references, &patients)?;
                patients[position].linked += 1;
                *target = Some(position);
            }
            Entry::Consent(resource, target) => {
                let position =
                    resolve_patient(index, *resource, &["patient", "subject"], &references, &patients)?;
                *target = Some(position);
            }
            _ => {}
        }
    }

    let mut records = Vec::new();
    for (index, entry) in classified.into_iter().enumerate() {
        let source_index = records.len();
        match entry {
            Entry::Patient(position) if patients[position].linked == 0 => {
                records.push(patient_record(source_index, &patients[position], ResourceKind::Patient));
            }
            Entry::Observation(resource, Some(position)) => {
                let mut record =
                    patient_record(source_index, &patients[position], ResourceKind::Observation);
                record.clinical = observation_fields(resource);
                records.push(record);
            }
            Entry::Consent(resource, Some(position)) => {
                let mut record =
                    patient_record(source_index, &patients[position], ResourceKind::Consent);
                record.consent = Some(consent_terms(index, resource)?);
                records.push(record);
            }
            _ => {}
        }
    }

    Ok(records)
}

fn patient_record(source_index: usize, patient: &BundlePatient, kind: ResourceKind) -> CanonicalRecord {
    let mut record = CanonicalRecord::new(source_index, kind, patient.key.clone());
    record.identifiers = patient.identifiers.clone();
    record.demographics = patient.demographics.clone();
    record
}

fn resolve_patient(
    index: usize,
    resource: &Value,
    reference_fields: &[&str],
    references: &HashMap<String, usize>,
    patients: &[BundlePatient],
) -> Result<usize, PipelineError> {
    let reference = reference_fields.iter().find_map(|field| {
        resource
            .get(*field)
            .and_then(|r| r.get("reference"))
            .and_then(Value::as_str)
    });

    if let Some(position) = reference.and_then(|r| references.get(r)) {
        return Ok(*position);
    }

    if patients.is_empty() {
        return Err(PipelineError::normalization(
            Some(index),
            "bundle entry references a patient but the bundle has no Patient resource",
        ));
    }

    tracing::warn!(
        entry = index,
        "Patient reference did not resolve, falling back to the first patient in the bundle"
    );
    Ok(0)
}

fn parse_patient(index: usize, resource: &Value) -> Result<BundlePatient, PipelineError> {
    let name = patient_name(resource);
    let key = first_identifier(resource)
        .or_else(|| resource.get("id").and_then(scalar_text))
        .or_else(|| name.clone())
        .and_then(|k| PatientKey::new(k).ok())
        .ok_or_else(|| {
            PipelineError::normalization(
                Some(index),
                "Patient resource has no identifier, id or name",
            )
        })?;

    let mut phone = None;
    let mut email = None;
    for telecom in array(resource, "telecom") {
        let value = telecom.get("value").and_then(scalar_text);
        match telecom.get("system").and_then(Value::as_str) {
            Some("phone") | Some("sms") if phone.is_none() => phone = value,
            Some("email") if email.is_none() => email = value,
            _ => {}
        }
    }

    let address = array(resource, "address").next();
    let country = address.and_then(|a| a.get("country")).and_then(scalar_text);
    let region = address.and_then(|a| {
        a.get("district")
            .or_else(|| a.get("state"))
            .and_then(scalar_text)
    });

    let identifiers = DirectIdentifiers {
        name: sensitive_opt(name),
        address: sensitive_opt(address.and_then(address_text)),
        phone: sensitive_opt(phone),
        email: sensitive_opt(email),
        national_id: None,
    };

    let demographics = RawDemographics {
        birth_date: sensitive_opt(resource.get("birthDate").and_then(scalar_text)),
        age: None,
        gender: resource.get("gender").and_then(scalar_text),
        country,
        region,
        occupation: occupation_extension(resource),
    };

    Ok(BundlePatient {
        key,
        identifiers,
        demographics,
        linked: 0,
    })
}

fn array<'a>(value: &'a Value, field: &str) -> impl Iterator<Item = &'a Value> {
    value
        .get(field)
        .and_then(Value::as_array)
        .map(|items| items.iter())
        .into_iter()
        .flatten()
}

fn first_identifier(resource: &Value) -> Option<String> {
    array(resource, "identifier").find_map(|identifier| identifier.get("value").and_then(scalar_text))
}

fn patient_name(resource: &Value) -> Option<String> {
    let name = array(resource, "name").next()?;
    if let Some(text) = name.get("text").and_then(scalar_text) {
        return Some(text);
    }
    let mut parts: Vec<String> = array(name, "given").filter_map(scalar_text).collect();
    if let Some(family) = name.get("family").and_then(scalar_text) {
        parts.push(family);
    }
    (!parts.is_empty()).then(|| parts.join(" "))
}

fn address_text(address: &Value) -> Option<String> {
    if let Some(text) = address.get("text").and_then(scalar_text) {
        return Some(text);
    }
    let mut parts: Vec<String> = array(address, "line").filter_map(scalar_text).collect();
    for field in ["city", "district", "state", "country"] {
        if let Some(part) = address.get(field).and_then(scalar_text) {
            parts.push(part);
        }
    }
    (!parts.is_empty()).then(|| parts.join(", "))
}

fn occupation_extension(resource: &Value) -> Option<String> {
    array(resource, "extension")
        .find(|extension| {
            extension
                .get("url")
                .and_then(Value::as_str)
                .is_some_and(|url| url.to_lowercase().contains("occupation"))
        })
        .and_then(|extension| {
            extension
                .get("valueString")
                .and_then(scalar_text)
                .or_else(|| concept_text(extension.get("valueCodeableConcept")?))
        })
}

fn concept_text(concept: &Value) -> Option<String> {
    concept.get("text").and_then(scalar_text).or_else(|| {
        let coding = array(concept, "coding").next()?;
        coding
            .get("display")
            .and_then(scalar_text)
            .or_else(|| coding.get("code").and_then(scalar_text))
    })
}

fn observation_fields(resource: &Value) -> BTreeMap<String, String> {
    let mut fields = BTreeMap::new();

    if let Some(code) = resource.get("code").and_then(concept_text) {
        fields.insert("code".to_string(), code);
    }

    let quantity = resource.get("valueQuantity");
    let value = quantity
        .and_then(|q| q.get("value"))
        .and_then(scalar_text)
        .or_else(|| resource.get("valueString").and_then(scalar_text))
        .or_else(|| resource.get("valueCodeableConcept").and_then(concept_text))
        .or_else(|| resource.get("valueInteger").and_then(scalar_text))
        .or_else(|| resource.get("valueBoolean").and_then(scalar_text));
    if let Some(value) = value {
        fields.insert("value".to_string(), value);
    }
    if let Some(unit) = quantity.and_then(|q| q.get("unit")).and_then(scalar_text) {
        fields.insert("unit".to_string(), unit);
    }
    if let Some(status) = resource.get("status").and_then(scalar_text) {
        fields.insert("status".to_string(), status);
    }
    if let Some(effective) = resource.get("effectiveDateTime").and_then(scalar_text) {
        fields.insert("effectiveDate".to_string(), effective);
    }

    fields
}

fn consent_terms(index: usize, resource: &Value) -> Result<ConsentTerms, PipelineError> {
    let consent_date = resource
        .get("dateTime")
        .and_then(scalar_text)
        .ok_or_else(|| PipelineError::normalization(Some(index), "Consent resource has no dateTime"))?;

    let consent_type = resource
        .get("scope")
        .and_then(concept_text)
        .or_else(|| array(resource, "category").next().and_then(concept_text))
        .unwrap_or_else(|| DEFAULT_CONSENT_TYPE.to_string());

    Ok(ConsentTerms {
        consent_date,
        consent_type,
    })
}
