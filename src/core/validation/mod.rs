//! Release-set validation
//!
//! [`checks`] holds the per-category record checks; [`output`] composes them
//! with k-anonymity and provenance verification into the final gate.

pub mod checks;
pub mod output;

pub use checks::{check_demographics, check_identifiers, scan_pii};
pub use output::{OutputValidator, ValidationReport};
