//! Verify command implementation
//!
//! Re-checks a written release set: every provenance link and both batch
//! hashes. Needs no identity map.

use super::{EXIT_FATAL, EXIT_OK, EXIT_REJECTED};
use crate::core::provenance::verify_release;
use crate::domain::ReleaseSet;
use anyhow::Context;
use clap::Args;
use std::fs;
use std::path::PathBuf;

/// Arguments for the verify command
#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Release set JSON written by `anonymize`
    #[arg(short, long)]
    pub input: PathBuf,
}

impl VerifyArgs {
    /// Execute the verify command
    pub fn execute(&self) -> anyhow::Result<i32> {
        tracing::info!(input = %self.input.display(), "Verifying release set");

        let release = match self.read_release() {
            Ok(r) => r,
            Err(e) => {
                eprintln!("❌ Failed to read release set: {e:#}");
                return Ok(EXIT_FATAL);
            }
        };

        match verify_release(&release) {
            Ok(()) => {
                println!("✅ Release set verified");
                println!("  Records:          {}", release.len());
                println!("  Patients:         {}", release.patient_count());
                println!("  Consent Hashes:   {}", release.consent_hashes.len());
                println!("  Batch Hash:       {}", release.batch_hash);
                println!("  Chain Batch Hash: {}", release.chain_batch_hash);
                Ok(EXIT_OK)
            }
            Err(e) => {
                tracing::error!(category = e.category(), error = %e, "Release verification failed");
                eprintln!("❌ Verification failed: {e}");
                Ok(EXIT_REJECTED)
            }
        }
    }

    fn read_release(&self) -> anyhow::Result<ReleaseSet> {
        let contents = fs::read_to_string(&self.input)
            .with_context(|| format!("Failed to read {}", self.input.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Not a release set: {}", self.input.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::pipeline::{run_batch, PipelineOptions};
    use serde_json::json;
    use tempfile::TempDir;

    fn write_release(dir: &TempDir, release: &ReleaseSet) -> PathBuf {
        let path = dir.path().join("release.json");
        fs::write(&path, serde_json::to_string(release).unwrap()).unwrap();
        path
    }

    fn release() -> ReleaseSet {
        let rows: Vec<_> = (0..5)
            .map(|i| json!({"Patient ID": format!("P-{i}"), "Gender": "F", "Age": 40, "Country": "Kenya"}))
            .collect();
        run_batch(&json!(rows), &PipelineOptions::default())
            .unwrap()
            .release
    }

    #[test]
    fn test_verify_intact_release() {
        let dir = TempDir::new().unwrap();
        let args = VerifyArgs {
            input: write_release(&dir, &release()),
        };
        assert_eq!(args.execute().unwrap(), EXIT_OK);
    }

    #[test]
    fn test_verify_tampered_release() {
        let dir = TempDir::new().unwrap();
        let mut release = release();
        release.batch_hash = "0".repeat(64);
        let args = VerifyArgs {
            input: write_release(&dir, &release),
        };
        assert_eq!(args.execute().unwrap(), EXIT_REJECTED);
    }

    #[test]
    fn test_verify_missing_file() {
        let args = VerifyArgs {
            input: PathBuf::from("/nonexistent/release.json"),
        };
        assert_eq!(args.execute().unwrap(), EXIT_FATAL);
    }
}
