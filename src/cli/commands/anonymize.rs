//! Anonymize command implementation
//!
//! Reads one batch (tabular rows or a clinical bundle), runs it through the
//! pipeline and writes the release set and the identity map to separate
//! files.

use super::{load_or_default, EXIT_CONFIG, EXIT_FATAL, EXIT_OK, EXIT_REJECTED};
use crate::anonymization::{BatchReport, DeidentificationEngine};
use crate::core::kanonymity::ViolationPolicy;
use crate::domain::DeidentError;
use anyhow::Context;
use chrono::NaiveDate;
use clap::Args;
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use uuid::Uuid;

/// Arguments for the anonymize command
#[derive(Args, Debug)]
pub struct AnonymizeArgs {
    /// Input JSON file (array of rows, or a Bundle)
    #[arg(short, long)]
    pub input: PathBuf,

    /// Output file for the release set
    #[arg(short, long)]
    pub output: PathBuf,

    /// Output file for the original-key to PID mapping
    #[arg(long)]
    pub mapping_output: Option<PathBuf>,

    /// Override the minimum cohort size
    #[arg(long)]
    pub k: Option<usize>,

    /// Override the violation policy (reject or suppress)
    #[arg(long, value_name = "POLICY")]
    pub on_violation: Option<ViolationPolicy>,

    /// Date ages are computed against (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    pub reference_date: Option<NaiveDate>,

    /// Run and validate the batch without writing outputs
    #[arg(long)]
    pub dry_run: bool,

    /// Write the batch report as JSON to this file
    #[arg(long)]
    pub report: Option<PathBuf>,
}

impl AnonymizeArgs {
    /// Execute the anonymize command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(input = %self.input.display(), "Starting anonymize command");

        let mut config = match load_or_default(config_path) {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load configuration");
                eprintln!("Configuration error: {e}");
                return Ok(EXIT_CONFIG);
            }
        };

        // Apply CLI overrides
        if let Some(k) = self.k {
            tracing::info!(k = k, "Overriding k from CLI");
            config.privacy.k = k;
        }
        if let Some(policy) = self.on_violation {
            tracing::info!(policy = %policy, "Overriding violation policy from CLI");
            config.privacy.on_violation = policy;
        }
        if let Some(date) = self.reference_date {
            config.privacy.reference_date = Some(date);
        }
        let dry_run = self.dry_run || config.application.dry_run;

        if let Err(e) = config.validate() {
            tracing::error!(error = %e, "Configuration validation failed");
            eprintln!("Configuration validation failed: {e}");
            return Ok(EXIT_CONFIG);
        }

        if self.mapping_output.as_deref() == Some(self.output.as_path()) {
            eprintln!("The release set and the patient mapping must go to different files");
            return Ok(EXIT_CONFIG);
        }

        if config.privacy.on_violation == ViolationPolicy::Suppress {
            tracing::warn!("Suppress policy enabled: undersized cohorts are dropped, not rejected");
        }

        let input = match read_json(&self.input) {
            Ok(v) => v,
            Err(e) => {
                tracing::error!(error = %e, "Failed to read input");
                eprintln!("Failed to read input: {e:#}");
                return Ok(EXIT_FATAL);
            }
        };

        let engine = match DeidentificationEngine::new(config.privacy.clone()) {
            Ok(e) => e,
            Err(e @ DeidentError::Configuration(_)) => {
                eprintln!("{e}");
                return Ok(EXIT_CONFIG);
            }
            Err(e) => {
                eprintln!("Failed to initialize engine: {e}");
                return Ok(EXIT_FATAL);
            }
        };

        if dry_run {
            println!("🔍 DRY RUN MODE - No output files will be written");
            println!();
        }

        let batch_id = Uuid::new_v4();
        let start = Instant::now();
        let result = tokio::task::spawn_blocking(move || engine.process_as(batch_id, &input))
            .await
            .unwrap_or_else(|e| Err(DeidentError::Other(format!("Batch task failed: {e}"))));
        let elapsed_ms = start.elapsed().as_millis() as u64;

        let output = match result {
            Ok(output) => output,
            Err(DeidentError::Pipeline(error)) => {
                let report = BatchReport::rejected(batch_id, &error, elapsed_ms)
                    .with_dry_run(dry_run);
                println!("{}", report.format_console());
                self.write_report(&report)?;
                eprintln!("❌ Batch rejected: {}", error.category());
                return Ok(EXIT_REJECTED);
            }
            Err(e) => {
                tracing::error!(error = %e, "Batch failed");
                eprintln!("Batch failed: {e}");
                return Ok(EXIT_FATAL);
            }
        };

        let report = BatchReport::released(&output, elapsed_ms).with_dry_run(dry_run);
        println!("{}", report.format_console());
        self.write_report(&report)?;

        if dry_run {
            return Ok(EXIT_OK);
        }

        if let Err(e) = write_json(&self.output, &output.release) {
            eprintln!("Failed to write release set: {e:#}");
            return Ok(EXIT_FATAL);
        }
        println!("✅ Release set written to {}", self.output.display());

        match &self.mapping_output {
            Some(path) => {
                if let Err(e) = write_json(path, &output.patient_mapping) {
                    eprintln!("Failed to write patient mapping: {e:#}");
                    return Ok(EXIT_FATAL);
                }
                println!("🔐 Patient mapping written to {}", path.display());
            }
            None => {
                tracing::warn!("No --mapping-output given; the patient mapping was not saved");
            }
        }

        Ok(EXIT_OK)
    }

    fn write_report(&self, report: &BatchReport) -> anyhow::Result<()> {
        if let Some(ref path) = self.report {
            report
                .write_to_file(path)
                .with_context(|| format!("Failed to write report: {}", path.display()))?;
        }
        Ok(())
    }
}

fn read_json(path: &Path) -> anyhow::Result<Value> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("Invalid JSON in {}", path.display()))
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn args(dir: &TempDir, rows: Value) -> AnonymizeArgs {
        let input = dir.path().join("input.json");
        fs::write(&input, rows.to_string()).unwrap();
        AnonymizeArgs {
            input,
            output: dir.path().join("out").join("release.json"),
            mapping_output: Some(dir.path().join("mapping.json")),
            k: None,
            on_violation: None,
            reference_date: NaiveDate::from_ymd_opt(2024, 6, 1),
            dry_run: false,
            report: None,
        }
    }

    fn config(dir: &TempDir) -> String {
        let path = dir.path().join("deident.toml");
        fs::write(&path, "[privacy.audit]\nenabled = false\n").unwrap();
        path.to_string_lossy().to_string()
    }

    fn rows(n: usize) -> Value {
        let rows: Vec<_> = (0..n)
            .map(|i| {
                json!({
                    "Patient ID": format!("P-{i}"),
                    "Name": format!("Patient Number {i}"),
                    "Gender": "F",
                    "Age": 37,
                    "Country": "Uganda",
                })
            })
            .collect();
        json!(rows)
    }

    #[tokio::test]
    async fn test_release_and_mapping_written_separately() {
        let dir = TempDir::new().unwrap();
        let args = args(&dir, rows(5));

        let code = args.execute(&config(&dir)).await.unwrap();
        assert_eq!(code, EXIT_OK);

        let release = fs::read_to_string(&args.output).unwrap();
        let mapping = fs::read_to_string(args.mapping_output.as_ref().unwrap()).unwrap();
        assert!(!release.contains("Patient Number"));
        assert!(!release.contains("\"P-0\""));
        assert!(mapping.contains("\"P-0\""));
    }

    #[tokio::test]
    async fn test_same_output_paths_rejected() {
        let dir = TempDir::new().unwrap();
        let mut args = args(&dir, rows(5));
        args.mapping_output = Some(args.output.clone());

        assert_eq!(args.execute(&config(&dir)).await.unwrap(), EXIT_CONFIG);
    }

    #[tokio::test]
    async fn test_rejected_batch_exit_code() {
        let dir = TempDir::new().unwrap();
        let mut args = args(&dir, rows(5));
        args.k = Some(6);
        let mut input = rows(6);
        input[5]["Gender"] = json!("M");
        fs::write(&args.input, input.to_string()).unwrap();

        assert_eq!(args.execute(&config(&dir)).await.unwrap(), EXIT_REJECTED);
        assert!(!args.output.exists());
    }

    #[tokio::test]
    async fn test_dry_run_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let mut args = args(&dir, rows(5));
        args.dry_run = true;
        args.report = Some(dir.path().join("report.json"));

        assert_eq!(args.execute(&config(&dir)).await.unwrap(), EXIT_OK);
        assert!(!args.output.exists());
        assert!(args.report.as_ref().unwrap().exists());
    }

    #[tokio::test]
    async fn test_invalid_k_is_config_error() {
        let dir = TempDir::new().unwrap();
        let mut args = args(&dir, rows(5));
        args.k = Some(0);
        assert_eq!(args.execute(&config(&dir)).await.unwrap(), EXIT_CONFIG);
    }
}
