//! Domain models and types for deident.
//!
//! The domain layer holds the values that flow through the pipeline and the
//! error taxonomy it fails with:
//!
//! - **Identifiers** ([`AnonymousPid`], [`PatientKey`])
//! - **Canonical records** ([`CanonicalRecord`]), raw and batch-scoped
//! - **Generalized records** ([`GeneralizedRecord`]), the only record shape released
//! - **Provenance artifacts** ([`ProvenanceRecord`], [`ConsentHash`], [`ReleaseSet`])
//! - **Errors** ([`DeidentError`], [`PipelineError`]) and the [`Result`] alias
//!
//! # Type Safety
//!
//! Raw and released records are different types. A [`GeneralizedRecord`] has
//! no field that can hold a name, address, phone or birth date, and raw values
//! on a [`CanonicalRecord`] are wrapped so they cannot be printed:
//!
//! ```rust
//! use deident::domain::{AnonymousPid, PatientKey};
//!
//! let key = PatientKey::new("Jane Namukasa").unwrap();
//! assert_eq!(format!("{key:?}"), "PatientKey([REDACTED])");
//!
//! let pid = AnonymousPid::from_sequence(1);
//! assert_eq!(pid.to_string(), "PID-001");
//! ```

pub mod errors;
pub mod generalized;
pub mod ids;
pub mod provenance;
pub mod record;
pub mod result;
pub mod sensitive;

// Re-export commonly used types for convenience
pub use errors::{CohortViolation, DeidentError, FieldViolation, PipelineError};
pub use generalized::{AgeRange, ClinicalValue, CohortKey, GeneralizedRecord, Strength};
pub use ids::{AnonymousPid, PatientKey};
pub use provenance::{ConsentHash, ProvenanceRecord, ReleaseSet};
pub use record::{CanonicalRecord, ConsentTerms, ResourceKind};
pub use result::Result;
