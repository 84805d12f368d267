//! De-identification engine, configuration, audit and reporting
//!
//! This module wraps the core pipeline for callers:
//! - **Engine**: runs batches with the configured k, policy and age widths
//! - **Audit**: one append-only entry per batch, never values
//! - **Report**: console and JSON batch summaries
//! - **Models**: the PII field denylist and column role recognition
//!
//! # Usage
//!
//! ```rust,no_run
//! use deident::anonymization::{DeidentificationEngine, PrivacyConfig};
//! use serde_json::json;
//!
//! # fn example() -> deident::domain::Result<()> {
//! let engine = DeidentificationEngine::new(PrivacyConfig::default())?;
//! let output = engine.process(&json!([{"Patient ID": "P-1", "Age": 37}]))?;
//! # Ok(())
//! # }
//! ```

pub mod audit;
pub mod config;
pub mod engine;
pub mod models;
pub mod report;

// Re-export main types
pub use config::{AuditConfig, PrivacyConfig};
pub use engine::DeidentificationEngine;
pub use models::{FieldRole, PiiField};
pub use report::BatchReport;
