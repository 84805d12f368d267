//! Audit logger for de-identification batches

use crate::core::pipeline::BatchOutput;
use crate::domain::provenance::format_timestamp;
use crate::domain::PipelineError;
use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use uuid::Uuid;

/// Audit log entry
///
/// Holds counts, hashes, field names and cohort keys. Never a field value,
/// never the identity map.
#[derive(Debug, Serialize)]
struct AuditLogEntry {
    timestamp: String,
    batch_id: String,
    outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    records: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    released: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    patients: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    batch_hash: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    suppressed_cohorts: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_category: Option<&'static str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    violations: Vec<String>,
}

/// Append-only audit log, one entry per batch
pub struct AuditLogger {
    log_path: PathBuf,
    json_format: bool,
    enabled: bool,
}

impl AuditLogger {
    /// Create a new audit logger
    pub fn new(log_path: PathBuf, json_format: bool, enabled: bool) -> Result<Self> {
        if enabled {
            if let Some(parent) = log_path.parent() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create audit log directory: {}", parent.display())
                })?;
            }
        }

        Ok(Self {
            log_path,
            json_format,
            enabled,
        })
    }

    /// Log a released batch
    pub fn log_released(&self, output: &BatchOutput) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }

        let entry = AuditLogEntry {
            timestamp: output.timestamp.clone(),
            batch_id: output.batch_id.to_string(),
            outcome: "released",
            records: Some(output.input_records),
            released: Some(output.release.len()),
            patients: Some(output.patient_mapping.len()),
            batch_hash: Some(output.release.batch_hash.clone()),
            suppressed_cohorts: output.suppressed.iter().map(ToString::to_string).collect(),
            error_category: None,
            violations: Vec::new(),
        };

        self.write_entry(&entry)
    }

    /// Log a rejected batch
    pub fn log_rejected(&self, batch_id: Uuid, error: &PipelineError) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }

        let entry = AuditLogEntry {
            timestamp: format_timestamp(Utc::now()),
            batch_id: batch_id.to_string(),
            outcome: "rejected",
            records: None,
            released: None,
            patients: None,
            batch_hash: None,
            suppressed_cohorts: Vec::new(),
            error_category: Some(error.category()),
            violations: error.locations(),
        };

        self.write_entry(&entry)
    }

    /// Write an audit entry to the log file
    fn write_entry(&self, entry: &AuditLogEntry) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)
            .with_context(|| format!("Failed to open audit log: {}", self.log_path.display()))?;

        if self.json_format {
            let json_line =
                serde_json::to_string(entry).context("Failed to serialize audit entry")?;
            writeln!(file, "{json_line}").context("Failed to write audit entry")?;
        } else {
            writeln!(
                file,
                "[{}] Batch: {} | Outcome: {} | Released: {} | Error: {}",
                entry.timestamp,
                entry.batch_id,
                entry.outcome,
                entry.released.unwrap_or(0),
                entry.error_category.unwrap_or("-")
            )
            .context("Failed to write audit entry")?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FieldViolation, Strength};
    use tempfile::tempdir;

    #[test]
    fn test_audit_logger_creates_directory() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("nested").join("audit.log");

        let logger = AuditLogger::new(log_path.clone(), true, true).unwrap();
        assert!(logger.enabled);
        assert!(log_path.parent().unwrap().exists());
    }

    #[test]
    fn test_rejection_logs_field_names_only() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("audit.log");
        let logger = AuditLogger::new(log_path.clone(), true, true).unwrap();

        let error = PipelineError::PiiLeak {
            violations: vec![FieldViolation::new(2, "email", Strength::Storage, "disallowed")],
        };
        let batch_id = Uuid::new_v4();
        logger.log_rejected(batch_id, &error).unwrap();

        let content = std::fs::read_to_string(&log_path).unwrap();
        let entry: serde_json::Value = serde_json::from_str(content.trim()).unwrap();
        assert_eq!(entry["outcome"], "rejected");
        assert_eq!(entry["error_category"], "PIILeakError");
        assert_eq!(entry["batch_id"], batch_id.to_string());
        assert!(entry["violations"][0].as_str().unwrap().contains("'email'"));
    }

    #[test]
    fn test_plain_text_format() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("audit.log");
        let logger = AuditLogger::new(log_path.clone(), false, true).unwrap();

        let error = PipelineError::normalization(None, "unsupported input shape");
        logger.log_rejected(Uuid::new_v4(), &error).unwrap();
        logger.log_rejected(Uuid::new_v4(), &error).unwrap();

        let content = std::fs::read_to_string(&log_path).unwrap();
        assert_eq!(content.lines().count(), 2);
        assert!(content.contains("Outcome: rejected"));
        assert!(content.contains("Error: NormalizationError"));
    }

    #[test]
    fn test_disabled_logger_writes_nothing() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("audit.log");
        let logger = AuditLogger::new(log_path.clone(), true, false).unwrap();

        let error = PipelineError::normalization(None, "unsupported input shape");
        logger.log_rejected(Uuid::new_v4(), &error).unwrap();
        assert!(!log_path.exists());
    }
}
