//! Generalized record types
//!
//! A [`GeneralizedRecord`] is the only record shape that leaves the pipeline.
//! It has no field that could hold a direct identifier: the type itself is the
//! first line of defense, the runtime PII scan the second.

use crate::domain::ids::AnonymousPid;
use crate::domain::record::ResourceKind;
use chrono::{DateTime, Datelike, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Generalization strength
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strength {
    /// Query-time storage: 5-year age buckets, exact dates, region kept
    Storage,
    /// Public/immutable distribution: 10-year buckets, month dates, country only
    Chain,
}

impl fmt::Display for Strength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Storage => f.write_str("storage"),
            Self::Chain => f.write_str("chain"),
        }
    }
}

/// Oldest plausible age in years; anything above is treated as missing
pub const MAX_AGE: u32 = 150;

/// Inclusive age bucket, rendered as `"35-39"`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AgeRange {
    lower: u32,
    upper: u32,
}

impl AgeRange {
    /// Creates a bucket; `upper` is clamped to be at least `lower`
    pub fn new(lower: u32, upper: u32) -> Self {
        Self {
            lower,
            upper: upper.max(lower),
        }
    }

    /// The aligned bucket of `width` years containing `age`
    pub fn bucket(age: u32, width: u32) -> Self {
        let width = width.max(1);
        let lower = age / width * width;
        Self::new(lower, lower.saturating_add(width - 1))
    }

    /// Lower bound (inclusive)
    pub fn lower(&self) -> u32 {
        self.lower
    }

    /// Upper bound (inclusive)
    pub fn upper(&self) -> u32 {
        self.upper
    }

    /// Number of ages covered
    pub fn width(&self) -> u32 {
        (self.upper - self.lower).saturating_add(1)
    }

    /// Whether `other` lies entirely inside this bucket
    pub fn contains(&self, other: &AgeRange) -> bool {
        self.lower <= other.lower && other.upper <= self.upper
    }

    /// Re-buckets to `width` years; never returns a narrower range
    pub fn widen(&self, width: u32) -> Self {
        if self.width() >= width {
            return *self;
        }
        let widened = Self::bucket(self.lower, width);
        if widened.contains(self) {
            widened
        } else {
            // Misaligned input: cover both ends rather than drop precision guarantees
            Self::new(widened.lower, Self::bucket(self.upper, width).upper)
        }
    }
}

impl fmt::Display for AgeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.lower, self.upper)
    }
}

impl FromStr for AgeRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (lower, upper) = s
            .split_once('-')
            .ok_or_else(|| format!("Invalid age range '{s}', expected LOWER-UPPER"))?;
        let lower: u32 = lower
            .trim()
            .parse()
            .map_err(|_| format!("Invalid age range lower bound in '{s}'"))?;
        let upper: u32 = upper
            .trim()
            .parse()
            .map_err(|_| format!("Invalid age range upper bound in '{s}'"))?;
        if upper < lower {
            return Err(format!("Invalid age range '{s}': upper < lower"));
        }
        Ok(Self { lower, upper })
    }
}

impl TryFrom<String> for AgeRange {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AgeRange> for String {
    fn from(range: AgeRange) -> Self {
        range.to_string()
    }
}

/// Date precision, ordered coarse to fine
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DateGranularity {
    /// `YYYY-MM`
    Month,
    /// `YYYY-MM-DD`
    Day,
    /// Full timestamp
    Instant,
}

/// A clinical field value
///
/// Serialized as a plain string. Date-like strings are recognized on parse so
/// that the chain generalizer can truncate them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClinicalValue {
    /// Free text or numeric result
    Text(String),
    /// RFC 3339 timestamp
    DateTime(DateTime<FixedOffset>),
    /// Calendar date
    Date(NaiveDate),
    /// Year and month only
    Month {
        /// Calendar year
        year: i32,
        /// Month, 1-12
        month: u32,
    },
}

impl ClinicalValue {
    /// Classifies a raw string
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if let Ok(instant) = DateTime::parse_from_rfc3339(trimmed) {
            return Self::DateTime(instant);
        }
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
            return Self::Date(date);
        }
        if trimmed.len() == 7 && trimmed.as_bytes()[4] == b'-' {
            if let Ok(date) = NaiveDate::parse_from_str(&format!("{trimmed}-01"), "%Y-%m-%d") {
                return Self::Month {
                    year: date.year(),
                    month: date.month(),
                };
            }
        }
        Self::Text(raw.to_string())
    }

    /// Date precision, or `None` for text
    pub fn granularity(&self) -> Option<DateGranularity> {
        match self {
            Self::Text(_) => None,
            Self::DateTime(_) => Some(DateGranularity::Instant),
            Self::Date(_) => Some(DateGranularity::Day),
            Self::Month { .. } => Some(DateGranularity::Month),
        }
    }

    /// Truncates dates to year/month; text passes through
    pub fn to_month(&self) -> Self {
        match self {
            Self::DateTime(instant) => Self::Month {
                year: instant.year(),
                month: instant.month(),
            },
            Self::Date(date) => Self::Month {
                year: date.year(),
                month: date.month(),
            },
            other => other.clone(),
        }
    }
}

impl fmt::Display for ClinicalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::DateTime(instant) => f.write_str(&instant.to_rfc3339()),
            Self::Date(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            Self::Month { year, month } => write!(f, "{year:04}-{month:02}"),
        }
    }
}

impl Serialize for ClinicalValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ClinicalValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        String::deserialize(deserializer).map(|s| ClinicalValue::parse(&s))
    }
}

/// A record generalized at storage or chain strength
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneralizedRecord {
    /// Anonymous patient identifier
    pub anonymous_pid: AnonymousPid,
    /// Resource kind the record came from
    pub resource_type: ResourceKind,
    /// Generalization strength
    pub strength: Strength,
    /// Age bucket
    #[serde(default)]
    pub age_range: Option<AgeRange>,
    /// Normalized gender
    #[serde(default)]
    pub gender: Option<String>,
    /// Country
    #[serde(default)]
    pub country: Option<String>,
    /// Sub-national region; always `None` at chain strength
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    /// Occupation (verbatim at storage, category at chain)
    pub occupation: String,
    /// Clinical fields
    #[serde(default)]
    pub clinical: BTreeMap<String, ClinicalValue>,
}

impl GeneralizedRecord {
    /// Cohort this record falls into
    pub fn cohort_key(&self) -> CohortKey {
        CohortKey {
            country: self.country.clone().unwrap_or_default(),
            age_range: self.age_range,
            gender: self.gender.clone().unwrap_or_default(),
            occupation: if self.occupation.trim().is_empty() {
                UNKNOWN.to_string()
            } else {
                self.occupation.clone()
            },
        }
    }
}

/// Placeholder for absent occupation
pub const UNKNOWN: &str = "Unknown";

/// Quasi-identifier tuple used for k-anonymity grouping
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CohortKey {
    /// Country
    pub country: String,
    /// Age bucket
    pub age_range: Option<AgeRange>,
    /// Gender
    pub gender: String,
    /// Occupation or "Unknown"
    pub occupation: String,
}

impl fmt::Display for CohortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let age = self
            .age_range
            .map(|a| a.to_string())
            .unwrap_or_else(|| "?".to_string());
        write!(
            f,
            "({}, {}, {}, {})",
            self.country, age, self.gender, self.occupation
        )
    }
}
