//! Quasi-identifier generalization
//!
//! Two strengths are produced from one canonical record:
//!
//! - **Storage**: age bucketed to `storage_age_width` years, exact clinical
//!   dates, region kept, occupation verbatim
//! - **Chain**: derived from the storage output only; age re-bucketed to
//!   `chain_age_width`, dates truncated to `YYYY-MM`, region dropped,
//!   occupation mapped to a category
//!
//! Clinical fields pass through unchanged apart from date truncation.

pub mod age;
pub mod location;
pub mod occupation;

use crate::domain::generalized::UNKNOWN;
use crate::domain::{
    AgeRange, AnonymousPid, CanonicalRecord, ClinicalValue, GeneralizedRecord, Strength,
};
use chrono::NaiveDate;
use location::Location;
use secrecy::ExposeSecret;

/// Default storage age bucket width in years
pub const DEFAULT_STORAGE_AGE_WIDTH: u32 = 5;

/// Default chain age bucket width in years
pub const DEFAULT_CHAIN_AGE_WIDTH: u32 = 10;

/// Stateless generalizer for one batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Generalizer {
    reference_date: NaiveDate,
    storage_age_width: u32,
    chain_age_width: u32,
}

impl Generalizer {
    /// Creates a generalizer; ages are computed as of `reference_date`
    pub fn new(reference_date: NaiveDate, storage_age_width: u32, chain_age_width: u32) -> Self {
        Self {
            reference_date,
            storage_age_width: storage_age_width.max(1),
            chain_age_width: chain_age_width.max(1),
        }
    }

    /// Creates a generalizer with the default 5/10-year buckets
    pub fn with_defaults(reference_date: NaiveDate) -> Self {
        Self::new(
            reference_date,
            DEFAULT_STORAGE_AGE_WIDTH,
            DEFAULT_CHAIN_AGE_WIDTH,
        )
    }

    /// Storage-strength generalization of a canonical record
    pub fn storage(&self, record: &CanonicalRecord, pid: AnonymousPid) -> GeneralizedRecord {
        let demographics = &record.demographics;

        let age = demographics
            .birth_date
            .as_ref()
            .and_then(|b| age::parse_birth_date(b.expose_secret().as_ref()))
            .and_then(|birth| age::age_on(birth, self.reference_date))
            .or(demographics.age);

        let address = record.identifiers.address.as_ref();
        let location = Location::resolve(
            demographics.country.as_deref(),
            demographics.region.as_deref(),
            address.map(|a| a.expose_secret().as_ref()),
        );

        let occupation = demographics
            .occupation
            .as_deref()
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .unwrap_or(UNKNOWN)
            .to_string();

        GeneralizedRecord {
            anonymous_pid: pid,
            resource_type: record.kind,
            strength: Strength::Storage,
            age_range: age.map(|a| AgeRange::bucket(a, self.storage_age_width)),
            gender: demographics.gender.as_deref().and_then(normalize_gender),
            country: location.country,
            region: location.region,
            occupation,
            clinical: record
                .clinical
                .iter()
                .map(|(field, value)| (field.clone(), ClinicalValue::parse(value)))
                .collect(),
        }
    }

    /// Chain-strength generalization of an already generalized record
    ///
    /// Applying it to a chain record returns the record unchanged.
    pub fn chain(&self, record: &GeneralizedRecord) -> GeneralizedRecord {
        GeneralizedRecord {
            anonymous_pid: record.anonymous_pid.clone(),
            resource_type: record.resource_type,
            strength: Strength::Chain,
            age_range: record.age_range.map(|a| a.widen(self.chain_age_width)),
            gender: record.gender.clone(),
            country: record.country.clone(),
            region: None,
            occupation: occupation::categorize(&record.occupation).to_string(),
            clinical: record
                .clinical
                .iter()
                .map(|(field, value)| (field.clone(), value.to_month()))
                .collect(),
        }
    }

    /// Generalizes at either strength; chain always passes through storage
    pub fn generalize(
        &self,
        record: &CanonicalRecord,
        pid: AnonymousPid,
        strength: Strength,
    ) -> GeneralizedRecord {
        let storage = self.storage(record, pid);
        match strength {
            Strength::Storage => storage,
            Strength::Chain => self.chain(&storage),
        }
    }
}

/// Normalizes a gender value
///
/// `m`/`male` become `Male`, `f`/`female` become `Female`; other non-empty
/// values are kept trimmed.
pub fn normalize_gender(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    match trimmed.to_lowercase().as_str() {
        "" => None,
        "m" | "male" => Some("Male".to_string()),
        "f" | "female" => Some("Female".to_string()),
        _ => Some(trimmed.to_string()),
    }
}

/// Checks that `chain` is a field-by-field coarsening of `storage`
///
/// The error names the first field that fails; it never contains a value.
pub fn check_coarsening(
    storage: &GeneralizedRecord,
    chain: &GeneralizedRecord,
) -> Result<(), String> {
    if storage.strength != Strength::Storage || chain.strength != Strength::Chain {
        return Err("records are not a storage/chain pair".to_string());
    }
    if storage.anonymous_pid != chain.anonymous_pid {
        return Err("anonymousPid differs".to_string());
    }
    if storage.resource_type != chain.resource_type {
        return Err("resourceType differs".to_string());
    }

    match (storage.age_range, chain.age_range) {
        (Some(s), Some(c)) if !(c.contains(&s) && c.width() >= s.width()) => {
            return Err("ageRange is not a widening of the storage range".to_string());
        }
        (None, Some(_)) => return Err("ageRange appears only at chain strength".to_string()),
        _ => {}
    }

    if storage.gender != chain.gender {
        return Err("gender differs".to_string());
    }
    if storage.country != chain.country {
        return Err("country differs".to_string());
    }
    if chain.region.is_some() {
        return Err("region present at chain strength".to_string());
    }
    if chain.occupation != occupation::categorize(&storage.occupation) {
        return Err("occupation is not the storage occupation's category".to_string());
    }

    if storage.clinical.len() != chain.clinical.len() {
        return Err("clinical field set differs".to_string());
    }
    for (field, stored) in &storage.clinical {
        let Some(chained) = chain.clinical.get(field) else {
            return Err(format!("clinical field '{field}' missing at chain strength"));
        };
        if chained.granularity() > stored.granularity() {
            return Err(format!("clinical field '{field}' is finer at chain strength"));
        }
        if chained != stored && *chained != stored.to_month() {
            return Err(format!("clinical field '{field}' is not derived from storage"));
        }
    }

    Ok(())
}
