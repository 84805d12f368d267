//! Protected storage for raw PII inside the trust boundary
//!
//! Raw identifying values (name, address, phone, birth date, ...) are wrapped
//! in a `secrecy::Secret` so that:
//!
//! - **Debug output is redacted**, so a stray `?record` in a log line prints
//!   `Secret([REDACTED ...])` instead of the value
//! - **Memory is zeroed on drop**, so discarded batches do not linger
//! - **Access is explicit**: reading a value requires `expose_secret()`
//!
//! There is deliberately no `SerializableSecret` impl: raw values cannot be
//! serialized out of the pipeline by accident.
//!
//! # Example
//!
//! ```rust
//! use deident::domain::sensitive::sensitive;
//! use secrecy::ExposeSecret;
//!
//! let phone = sensitive("+256 700 123456".to_string());
//! assert_eq!(phone.expose_secret().as_ref(), "+256 700 123456");
//! assert!(!format!("{phone:?}").contains("700"));
//! ```

use secrecy::{CloneableSecret, DebugSecret, Secret};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Newtype wrapper for a raw PII string
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SensitiveValue(String);

impl CloneableSecret for SensitiveValue {}
impl DebugSecret for SensitiveValue {}

impl From<String> for SensitiveValue {
    fn from(s: String) -> Self {
        SensitiveValue(s)
    }
}

impl AsRef<str> for SensitiveValue {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl SensitiveValue {
    /// Check if the value is empty after trimming
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

/// A raw PII value held for the lifetime of one batch
pub type SensitiveString = Secret<SensitiveValue>;

/// Wrap a raw value
#[inline]
pub fn sensitive(value: String) -> SensitiveString {
    Secret::new(SensitiveValue::from(value))
}

/// Wrap an optional raw value, dropping blanks
#[inline]
pub fn sensitive_opt(value: Option<String>) -> Option<SensitiveString> {
    value
        .map(SensitiveValue::from)
        .filter(|v| !v.is_blank())
        .map(Secret::new)
}
