//! Field-name catalogue
//!
//! One table maps input column names to their role. The normalizer uses it to
//! route columns, and the output validator uses the same table as its PII
//! denylist, so a column the normalizer would treat as PII can never pass the
//! final scan under another spelling.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Directly identifying fields that must never appear in a release
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PiiField {
    /// Person name (full, given, family)
    Name,
    /// Postal or street address
    Address,
    /// Telephone number
    Phone,
    /// Email address
    Email,
    /// National ID, SSN, passport number
    NationalId,
    /// Date of birth
    BirthDate,
}

impl PiiField {
    /// Every denylisted field
    pub const ALL: [PiiField; 6] = [
        Self::Name,
        Self::Address,
        Self::Phone,
        Self::Email,
        Self::NationalId,
        Self::BirthDate,
    ];

    /// Label used in logs and reports
    pub fn label(&self) -> &'static str {
        match self {
            Self::Name => "NAME",
            Self::Address => "ADDRESS",
            Self::Phone => "PHONE",
            Self::Email => "EMAIL",
            Self::NationalId => "NATIONAL_ID",
            Self::BirthDate => "BIRTH_DATE",
        }
    }

    /// Canonical spellings that identify this field
    fn aliases(&self) -> &'static [&'static str] {
        match self {
            Self::Name => &[
                "name",
                "fullname",
                "patientname",
                "firstname",
                "lastname",
                "middlename",
                "surname",
                "givenname",
                "familyname",
            ],
            Self::Address => &[
                "address",
                "streetaddress",
                "homeaddress",
                "postaladdress",
                "residentialaddress",
                "street",
            ],
            Self::Phone => &[
                "phone",
                "phonenumber",
                "telephone",
                "tel",
                "mobile",
                "mobilenumber",
                "cellphone",
            ],
            Self::Email => &["email", "emailaddress", "mail"],
            Self::NationalId => &[
                "nationalid",
                "nationalidnumber",
                "nin",
                "ssn",
                "socialsecuritynumber",
                "passport",
                "passportnumber",
            ],
            Self::BirthDate => &["dob", "dateofbirth", "birthdate", "birthday"],
        }
    }

    /// Looks a field name up in the denylist
    ///
    /// Matches the exact aliases of each field, and also contact details of
    /// third parties (`Next of Kin Phone`, `Guardian Name`).
    pub fn from_field_name(name: &str) -> Option<Self> {
        let canonical = canonical_field_name(name);
        Self::from_alias(&canonical).or_else(|| Self::from_contact(&canonical))
    }

    fn from_alias(canonical: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|field| field.aliases().contains(&canonical))
    }

    /// Contact details by suffix; a `name` suffix needs a person prefix
    /// (the patient or a third party) so `Test Name` stays clinical
    fn from_contact(canonical: &str) -> Option<Self> {
        let has_person_prefix = canonical.starts_with("patient")
            || CONTACT_PREFIXES.iter().any(|p| canonical.starts_with(p));
        if let Some(&(_, field)) = CONTACT_SUFFIXES
            .iter()
            .find(|(suffix, _)| canonical.ends_with(suffix))
        {
            if field != Self::Name || has_person_prefix {
                return Some(field);
            }
        }
        // A bare `Next of Kin` or `Guardian` column holds a person
        CONTACT_PREFIXES
            .contains(&canonical)
            .then_some(Self::Name)
    }
}

/// Column prefixes naming someone other than the patient
const CONTACT_PREFIXES: &[&str] = &[
    "nextofkin",
    "kin",
    "guardian",
    "mother",
    "father",
    "spouse",
    "parent",
    "caregiver",
    "emergencycontact",
    "relative",
];

const CONTACT_SUFFIXES: &[(&str, PiiField)] = &[
    ("phone", PiiField::Phone),
    ("phonenumber", PiiField::Phone),
    ("telephone", PiiField::Phone),
    ("mobile", PiiField::Phone),
    ("mobilenumber", PiiField::Phone),
    ("email", PiiField::Email),
    ("emailaddress", PiiField::Email),
    ("address", PiiField::Address),
    ("name", PiiField::Name),
];

impl fmt::Display for PiiField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Role of an input column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldRole {
    /// Original patient identifier
    PatientId,
    /// Denylisted direct identifier of the patient
    Pii(PiiField),
    /// Contact detail of a third party (next of kin, guardian); never kept
    Contact(PiiField),
    /// Gender / sex
    Gender,
    /// Country
    Country,
    /// Region, district, state or province
    Region,
    /// Occupation
    Occupation,
    /// Age in years
    Age,
    /// Consent date
    ConsentDate,
    /// Consent type / scope
    ConsentType,
    /// Resource type tag
    ResourceType,
}

const PATIENT_ID_ALIASES: &[&str] = &[
    "patientid",
    "id",
    "mrn",
    "subjectid",
    "originalid",
    "patientkey",
    "patientidentifier",
    "medicalrecordnumber",
];

impl FieldRole {
    /// Classifies a column name; `None` means an ordinary clinical field
    pub fn classify(name: &str) -> Option<Self> {
        let canonical = canonical_field_name(name);
        if let Some(pii) = PiiField::from_alias(&canonical) {
            return Some(Self::Pii(pii));
        }
        if let Some(pii) = PiiField::from_contact(&canonical) {
            return Some(if canonical.starts_with("patient") {
                Self::Pii(pii)
            } else {
                Self::Contact(pii)
            });
        }
        let role = match canonical.as_str() {
            c if PATIENT_ID_ALIASES.contains(&c) => Self::PatientId,
            "gender" | "sex" => Self::Gender,
            "country" | "countryofresidence" => Self::Country,
            "region" | "district" | "state" | "province" | "county" | "subcounty" => Self::Region,
            "occupation" | "profession" | "job" | "jobtitle" => Self::Occupation,
            "age" | "ageyears" => Self::Age,
            "consentdate" => Self::ConsentDate,
            "consenttype" => Self::ConsentType,
            "resourcetype" => Self::ResourceType,
            _ => return None,
        };
        Some(role)
    }

    /// Whether values under this role resemble an original patient identifier
    pub fn is_identifier(&self) -> bool {
        matches!(self, Self::PatientId | Self::Pii(PiiField::NationalId))
    }
}

/// Lowercases a field name and strips everything but letters and digits
///
/// `Patient ID`, `patient_id` and `PatientID` all become `patientid`.
pub fn canonical_field_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}
