//! De-identification engine
//!
//! [`DeidentificationEngine`] wraps the batch runner with configuration and
//! audit logging, and runs independent batches concurrently.
//!
//! # Examples
//!
//! ```no_run
//! use deident::anonymization::{DeidentificationEngine, PrivacyConfig};
//! use serde_json::json;
//!
//! # async fn example() -> deident::domain::Result<()> {
//! let engine = DeidentificationEngine::new(PrivacyConfig::default())?;
//!
//! let uploads = vec![
//!     json!([{"Patient ID": "P-1", "Gender": "F", "Age": 37, "Country": "Uganda"}]),
//!     json!([{"Patient ID": "P-1", "Gender": "M", "Age": 52, "Country": "Kenya"}]),
//! ];
//!
//! // Each batch gets its own identity map; both start at PID-001
//! for result in engine.process_batches(uploads).await {
//!     let output = result?;
//!     println!("{} released", output.release.len());
//! }
//! # Ok(())
//! # }
//! ```

use crate::anonymization::audit::AuditLogger;
use crate::anonymization::config::PrivacyConfig;
use crate::core::pipeline::{run_batch_as, BatchOutput, PipelineOptions};
use crate::domain::{DeidentError, Result};
use futures::future::join_all;
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

/// Configured batch runner with audit logging
///
/// # Thread Safety
///
/// The engine holds no per-batch state and is cheap to clone. Every call to
/// [`process`](Self::process) owns a private identity map.
#[derive(Clone)]
pub struct DeidentificationEngine {
    config: PrivacyConfig,
    options: PipelineOptions,
    audit_logger: Option<Arc<AuditLogger>>,
}

impl DeidentificationEngine {
    /// Create a new engine
    ///
    /// # Errors
    ///
    /// Returns [`DeidentError::Configuration`] if the configuration is
    /// invalid, or [`DeidentError::Audit`] if the audit log cannot be
    /// prepared.
    pub fn new(config: PrivacyConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| DeidentError::Configuration(format!("{e:#}")))?;

        let audit_logger = if config.audit.enabled {
            let logger =
                AuditLogger::new(config.audit.log_path.clone(), config.audit.json_format, true)
                    .map_err(|e| DeidentError::Audit(format!("{e:#}")))?;
            Some(Arc::new(logger))
        } else {
            None
        };

        let options = config.pipeline_options();
        Ok(Self {
            config,
            options,
            audit_logger,
        })
    }

    /// Overrides the batch options derived from the configuration
    pub fn with_options(mut self, options: PipelineOptions) -> Self {
        self.options = options;
        self
    }

    /// Privacy configuration in force
    pub fn config(&self) -> &PrivacyConfig {
        &self.config
    }

    /// Runs one batch and records the outcome in the audit log
    ///
    /// # Errors
    ///
    /// Returns [`DeidentError::Pipeline`] when the batch is rejected, or
    /// [`DeidentError::Audit`] when the audit entry cannot be written. A
    /// batch whose audit entry fails is not returned.
    pub fn process(&self, input: &Value) -> Result<BatchOutput> {
        self.process_as(Uuid::new_v4(), input)
    }

    /// Runs one batch under a caller-chosen id
    pub fn process_as(&self, batch_id: Uuid, input: &Value) -> Result<BatchOutput> {
        match run_batch_as(batch_id, input, &self.options) {
            Ok(output) => {
                if let Some(ref logger) = self.audit_logger {
                    logger
                        .log_released(&output)
                        .map_err(|e| DeidentError::Audit(format!("{e:#}")))?;
                }
                Ok(output)
            }
            Err(error) => {
                if let Some(ref logger) = self.audit_logger {
                    if let Err(audit_error) = logger.log_rejected(batch_id, &error) {
                        tracing::error!(
                            batch_id = %batch_id,
                            error = %audit_error,
                            "Failed to write audit entry for rejected batch"
                        );
                    }
                }
                Err(error.into())
            }
        }
    }

    /// Runs independent batches concurrently
    ///
    /// Batches run on the blocking pool, each with its own identity map.
    /// Results are returned in input order; one rejected batch does not
    /// affect the others.
    pub async fn process_batches(&self, inputs: Vec<Value>) -> Vec<Result<BatchOutput>> {
        let tasks = inputs.into_iter().map(|input| {
            let engine = self.clone();
            tokio::task::spawn_blocking(move || engine.process(&input))
        });

        join_all(tasks)
            .await
            .into_iter()
            .map(|joined| {
                joined.unwrap_or_else(|e| Err(DeidentError::Other(format!("Batch task failed: {e}"))))
            })
            .collect()
    }
}
