// Deident - Clinical Record De-identification and Provenance Pipeline
// Copyright (c) 2025 Deident Contributors
// Licensed under the MIT License

//! # Deident - Clinical Record De-identification and Provenance
//!
//! Deident turns a batch of clinical records (spreadsheet rows or a clinical
//! resource bundle) into two anonymized projections and a provenance trail
//! linking them.
//!
//! ## Overview
//!
//! One batch goes through:
//! - **Normalization** of rows or bundle entries into canonical records
//! - **Pseudonymization** with sequential per-batch PIDs (`PID-001`, ...)
//! - **Generalization** at storage strength and at chain strength
//! - **Validation** for leaked PII, missing demographics and small cohorts
//! - **Provenance** hashes per record pair, per consent and per batch
//!
//! The release set never contains the identity map; the map is returned
//! separately and is the only way back to an original patient key.
//!
//! ## Architecture
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Pipeline stages (normalize, identity, generalize, validation, provenance)
//! - [`anonymization`] - Engine, privacy configuration, audit log and reports
//! - [`domain`] - Core domain types and errors
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use deident::anonymization::{DeidentificationEngine, PrivacyConfig};
//! use serde_json::json;
//!
//! fn main() -> deident::domain::Result<()> {
//!     let engine = DeidentificationEngine::new(PrivacyConfig::default())?;
//!
//!     let rows = json!([
//!         {"Patient ID": "P-17", "Name": "Jane Namukasa", "Gender": "F", "Age": 37, "Country": "Uganda"}
//!     ]);
//!     let output = engine.process(&rows)?;
//!
//!     println!("Released {} record(s)", output.release.len());
//!     println!("Batch hash {}", output.release.batch_hash);
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! Stage failures are [`domain::PipelineError`], one variant per category.
//! Everything else surfaces as [`domain::DeidentError`]. Error messages name
//! record indices and field names, never field values.

pub mod anonymization;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;
