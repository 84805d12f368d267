//! Core pipeline stages.
//!
//! # Modules
//!
//! - [`normalize`] - Tabular rows and clinical bundles into canonical records
//! - [`identity`] - Per-batch anonymous identifier assignment
//! - [`generalize`] - Storage and chain strength generalization
//! - [`kanonymity`] - Cohort grouping and minimum cohort size enforcement
//! - [`provenance`] - Canonical hashing and storage-to-chain provenance links
//! - [`validation`] - Final release gate
//! - [`pipeline`] - Runs one batch through every stage
//!
//! # Batch Workflow
//!
//! 1. **Normalize**: Parse the input into canonical records
//! 2. **Identify**: Assign `PID-NNN` identifiers in first-encounter order
//! 3. **Generalize**: Produce storage records, then derive chain records from them
//! 4. **Group**: Enforce k-anonymity (reject, or suppress when configured)
//! 5. **Prove**: Hash both strengths and link them with provenance proofs
//! 6. **Validate**: Re-check the final release set before it leaves the pipeline
//!
//! # Example
//!
//! ```rust
//! use deident::core::pipeline::{run_batch, PipelineOptions};
//! use serde_json::json;
//!
//! let rows = json!([
//!     {"Patient ID": "P-1", "Name": "Jane Namukasa", "Gender": "F",
//!      "Age": 37, "Country": "Uganda", "Result": "95"},
//! ]);
//!
//! // A single record is below k, so enforcement is bypassed with a warning
//! let output = run_batch(&rows, &PipelineOptions::default()).unwrap();
//! assert_eq!(output.release.anonymized_records[0].anonymous_pid.as_str(), "PID-001");
//! assert!(output.cohort_report.bypassed());
//! ```

pub mod generalize;
pub mod identity;
pub mod kanonymity;
pub mod normalize;
pub mod pipeline;
pub mod provenance;
pub mod validation;
