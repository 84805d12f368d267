//! Batch reporting
//!
//! Summarises one batch for the console or as JSON. A report never carries
//! record contents or the identity map.

use crate::core::pipeline::BatchOutput;
use crate::domain::PipelineError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Summary of one de-identification batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    /// Batch id
    pub batch_id: Uuid,

    /// `released` or `rejected`
    pub outcome: String,

    /// Whether outputs were withheld (dry run)
    pub dry_run: bool,

    /// Records read from the input
    pub input_records: usize,

    /// Storage records released
    pub released_records: usize,

    /// Distinct patients
    pub patients: usize,

    /// Consent hashes produced
    pub consent_hashes: usize,

    /// Cohort statistics
    pub cohorts: CohortStats,

    /// Storage batch hash
    pub batch_hash: Option<String>,

    /// Chain batch hash
    pub chain_batch_hash: Option<String>,

    /// Error category of a rejected batch
    pub error_category: Option<String>,

    /// Violation locations of a rejected batch
    pub violations: Vec<String>,

    /// Warnings (k bypass, suppressed cohorts)
    pub warnings: Vec<String>,

    /// Wall-clock processing time
    pub processing_time_ms: u64,
}

/// Cohort statistics of a released batch
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CohortStats {
    /// Threshold in force
    pub k: usize,

    /// Distinct storage cohorts
    pub storage_cohorts: usize,

    /// Distinct chain cohorts
    pub chain_cohorts: usize,

    /// Smallest storage cohort
    pub smallest_storage_cohort: Option<usize>,

    /// Enforcement bypassed for a corpus smaller than k
    pub bypassed: bool,

    /// Cohorts dropped by suppression
    pub suppressed_cohorts: usize,

    /// Records dropped by suppression
    pub suppressed_records: usize,
}

impl BatchReport {
    /// Report for a released batch
    pub fn released(output: &BatchOutput, processing_time_ms: u64) -> Self {
        let storage = &output.cohort_report.storage;
        let mut warnings = Vec::new();

        if output.cohort_report.bypassed() {
            warnings.push(format!(
                "Only {} record(s) released, fewer than k = {}; cohort sizes were not enforced",
                storage.total_records, storage.k
            ));
        }
        for cohort in &output.suppressed {
            warnings.push(format!("Suppressed cohort {cohort}"));
        }

        Self {
            batch_id: output.batch_id,
            outcome: "released".to_string(),
            dry_run: false,
            input_records: output.input_records,
            released_records: output.release.len(),
            patients: output.release.patient_count(),
            consent_hashes: output.release.consent_hashes.len(),
            cohorts: CohortStats {
                k: storage.k,
                storage_cohorts: storage.cohort_count,
                chain_cohorts: output.cohort_report.chain.cohort_count,
                smallest_storage_cohort: storage.smallest_cohort,
                bypassed: output.cohort_report.bypassed(),
                suppressed_cohorts: output.suppressed.len(),
                suppressed_records: output.suppressed_records(),
            },
            batch_hash: Some(output.release.batch_hash.clone()),
            chain_batch_hash: Some(output.release.chain_batch_hash.clone()),
            error_category: None,
            violations: Vec::new(),
            warnings,
            processing_time_ms,
        }
    }

    /// Report for a rejected batch
    pub fn rejected(batch_id: Uuid, error: &PipelineError, processing_time_ms: u64) -> Self {
        Self {
            batch_id,
            outcome: "rejected".to_string(),
            dry_run: false,
            input_records: 0,
            released_records: 0,
            patients: 0,
            consent_hashes: 0,
            cohorts: CohortStats::default(),
            batch_hash: None,
            chain_batch_hash: None,
            error_category: Some(error.category().to_string()),
            violations: error.locations(),
            warnings: Vec::new(),
            processing_time_ms,
        }
    }

    /// Marks the report as a dry run
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Whether the batch was released
    pub fn is_released(&self) -> bool {
        self.outcome == "released"
    }

    /// Format report for console output
    pub fn format_console(&self) -> String {
        let mut output = String::new();

        output.push('\n');
        output.push_str("═══════════════════════════════════════════════════════════════\n");
        output.push_str("                  DE-IDENTIFICATION BATCH REPORT               \n");
        output.push_str("═══════════════════════════════════════════════════════════════\n");
        output.push('\n');

        output.push_str("📊 SUMMARY\n");
        output.push_str("───────────────────────────────────────────────────────────────\n");
        output.push_str(&format!("  Batch ID:            {}\n", self.batch_id));
        output.push_str(&format!(
            "  Outcome:             {}{}\n",
            self.outcome,
            if self.dry_run { " (dry run)" } else { "" }
        ));
        output.push_str(&format!("  Input Records:       {}\n", self.input_records));
        output.push_str(&format!("  Released Records:    {}\n", self.released_records));
        output.push_str(&format!("  Patients:            {}\n", self.patients));
        output.push_str(&format!("  Consent Hashes:      {}\n", self.consent_hashes));
        output.push_str(&format!(
            "  Processing Time:     {} ms\n",
            self.processing_time_ms
        ));
        output.push('\n');

        if self.is_released() {
            output.push_str("👥 COHORTS\n");
            output.push_str("───────────────────────────────────────────────────────────────\n");
            output.push_str(&format!("  k:                   {}\n", self.cohorts.k));
            output.push_str(&format!(
                "  Storage Cohorts:     {}\n",
                self.cohorts.storage_cohorts
            ));
            output.push_str(&format!(
                "  Chain Cohorts:       {}\n",
                self.cohorts.chain_cohorts
            ));
            if let Some(smallest) = self.cohorts.smallest_storage_cohort {
                output.push_str(&format!("  Smallest Cohort:     {}\n", smallest));
            }
            if self.cohorts.suppressed_cohorts > 0 {
                output.push_str(&format!(
                    "  Suppressed:          {} cohort(s), {} record(s)\n",
                    self.cohorts.suppressed_cohorts, self.cohorts.suppressed_records
                ));
            }
            output.push('\n');

            if let (Some(storage), Some(chain)) = (&self.batch_hash, &self.chain_batch_hash) {
                output.push_str("🔗 PROVENANCE\n");
                output.push_str(
                    "───────────────────────────────────────────────────────────────\n",
                );
                output.push_str(&format!("  Batch Hash:          {}\n", storage));
                output.push_str(&format!("  Chain Batch Hash:    {}\n", chain));
                output.push('\n');
            }
        }

        if let Some(ref category) = self.error_category {
            output.push_str("❌ REJECTION\n");
            output.push_str("───────────────────────────────────────────────────────────────\n");
            output.push_str(&format!("  Category:            {}\n", category));
            for violation in &self.violations {
                output.push_str(&format!("  • {}\n", violation));
            }
            output.push('\n');
        }

        if !self.warnings.is_empty() {
            output.push_str("⚠️  WARNINGS\n");
            output.push_str("───────────────────────────────────────────────────────────────\n");
            for warning in &self.warnings {
                output.push_str(&format!("  • {}\n", warning));
            }
            output.push('\n');
        }

        output.push_str("═══════════════════════════════════════════════════════════════\n");

        output
    }

    /// Format report as JSON
    pub fn format_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write report to file
    pub fn write_to_file(&self, path: &std::path::Path) -> std::io::Result<()> {
        let json = self.format_json().map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }
}
