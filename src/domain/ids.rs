//! Domain identifier types with validation
//!
//! [`AnonymousPid`] is the only patient identifier that ever leaves the
//! pipeline. [`PatientKey`] is the original key it replaces and stays inside
//! the trust boundary.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Prefix shared by every anonymous patient identifier
pub const PID_PREFIX: &str = "PID-";

/// Minimum number of digits after the prefix
pub const PID_MIN_DIGITS: usize = 3;

/// Anonymous patient identifier newtype wrapper
///
/// Format: `PID-` followed by a zero-padded sequence number of at least three
/// digits. Batches beyond 999 patients grow the width (`PID-1000`).
///
/// # Examples
///
/// ```
/// use deident::domain::ids::AnonymousPid;
///
/// let pid = AnonymousPid::from_sequence(7);
/// assert_eq!(pid.as_str(), "PID-007");
///
/// let pid = AnonymousPid::from_sequence(1000);
/// assert_eq!(pid.as_str(), "PID-1000");
///
/// assert!(AnonymousPid::new("PID-12").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AnonymousPid(String);

impl AnonymousPid {
    /// Creates a PID from a validated string
    pub fn new(pid: impl Into<String>) -> Result<Self, String> {
        let pid = pid.into();
        if !Self::is_valid(&pid) {
            return Err(format!(
                "Invalid anonymous PID format. Expected {PID_PREFIX}NNN (at least {PID_MIN_DIGITS} digits)"
            ));
        }
        Ok(Self(pid))
    }

    /// Builds the PID for a 1-based sequence number
    pub fn from_sequence(sequence: usize) -> Self {
        Self(format!("{PID_PREFIX}{sequence:0width$}", width = PID_MIN_DIGITS))
    }

    /// Checks a string against `PID-\d{3,}`
    pub fn is_valid(candidate: &str) -> bool {
        candidate
            .strip_prefix(PID_PREFIX)
            .map(|digits| {
                digits.len() >= PID_MIN_DIGITS && digits.chars().all(|c| c.is_ascii_digit())
            })
            .unwrap_or(false)
    }

    /// Returns the PID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Sequence number encoded in the PID
    pub fn sequence(&self) -> usize {
        self.0[PID_PREFIX.len()..].parse().unwrap_or(0)
    }
}

impl fmt::Display for AnonymousPid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AnonymousPid {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for AnonymousPid {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<AnonymousPid> for String {
    fn from(pid: AnonymousPid) -> Self {
        pid.0
    }
}

impl AsRef<str> for AnonymousPid {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Original patient key (explicit ID, or name when no ID exists)
///
/// Never printed by `Debug` and wiped from memory on drop. The only way to
/// read it is [`PatientKey::expose`], used when the caller asks for the
/// identity map.
#[derive(Clone, PartialEq, Eq, Hash, Zeroize, ZeroizeOnDrop)]
pub struct PatientKey(String);

impl PatientKey {
    /// Creates a new key, rejecting blank input
    pub fn new(key: impl Into<String>) -> Result<Self, String> {
        let key = key.into();
        let trimmed = key.trim();
        if trimmed.is_empty() {
            return Err("Patient key cannot be empty".to_string());
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Reveals the original key
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for PatientKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PatientKey([REDACTED])")
    }
}
