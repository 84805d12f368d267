//! Data models for the anonymization layer

pub mod pii_field;

pub use pii_field::{canonical_field_name, FieldRole, PiiField};
