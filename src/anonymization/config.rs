//! Privacy configuration

use crate::core::generalize::{DEFAULT_CHAIN_AGE_WIDTH, DEFAULT_STORAGE_AGE_WIDTH};
use crate::core::kanonymity::{ViolationPolicy, DEFAULT_K};
use crate::core::pipeline::PipelineOptions;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// The `[privacy]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivacyConfig {
    /// Minimum cohort size
    #[serde(default = "default_k")]
    pub k: usize,

    /// Reject the batch (default) or suppress undersized cohorts
    #[serde(default)]
    pub on_violation: ViolationPolicy,

    /// Storage age bucket width in years
    #[serde(default = "default_storage_age_width")]
    pub storage_age_width: u32,

    /// Chain age bucket width in years; a multiple of the storage width
    #[serde(default = "default_chain_age_width")]
    pub chain_age_width: u32,

    /// Fixed date ages are computed against; the batch date when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_date: Option<NaiveDate>,

    /// Audit logging configuration
    #[serde(default)]
    pub audit: AuditConfig,
}

fn default_k() -> usize {
    DEFAULT_K
}

fn default_storage_age_width() -> u32 {
    DEFAULT_STORAGE_AGE_WIDTH
}

fn default_chain_age_width() -> u32 {
    DEFAULT_CHAIN_AGE_WIDTH
}

impl Default for PrivacyConfig {
    fn default() -> Self {
        Self {
            k: default_k(),
            on_violation: ViolationPolicy::default(),
            storage_age_width: default_storage_age_width(),
            chain_age_width: default_chain_age_width(),
            reference_date: None,
            audit: AuditConfig::default(),
        }
    }
}

impl PrivacyConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.k == 0 {
            anyhow::bail!("privacy.k must be >= 1");
        }
        if self.storage_age_width == 0 {
            anyhow::bail!("privacy.storage_age_width must be > 0");
        }
        if self.chain_age_width == 0 || self.chain_age_width % self.storage_age_width != 0 {
            anyhow::bail!(
                "privacy.chain_age_width ({}) must be a positive multiple of storage_age_width ({})",
                self.chain_age_width,
                self.storage_age_width
            );
        }

        self.audit.validate().context("Invalid audit configuration")?;

        Ok(())
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(val) = std::env::var("DEIDENT_PRIVACY_K") {
            self.k = val.parse().context("Invalid DEIDENT_PRIVACY_K value")?;
        }

        if let Ok(val) = std::env::var("DEIDENT_PRIVACY_ON_VIOLATION") {
            self.on_violation = val.parse().map_err(anyhow::Error::msg)?;
        }

        if let Ok(val) = std::env::var("DEIDENT_PRIVACY_STORAGE_AGE_WIDTH") {
            self.storage_age_width = val
                .parse()
                .context("Invalid DEIDENT_PRIVACY_STORAGE_AGE_WIDTH value")?;
        }

        if let Ok(val) = std::env::var("DEIDENT_PRIVACY_CHAIN_AGE_WIDTH") {
            self.chain_age_width = val
                .parse()
                .context("Invalid DEIDENT_PRIVACY_CHAIN_AGE_WIDTH value")?;
        }

        if let Ok(val) = std::env::var("DEIDENT_PRIVACY_REFERENCE_DATE") {
            self.reference_date = Some(
                NaiveDate::parse_from_str(&val, "%Y-%m-%d")
                    .context("Invalid DEIDENT_PRIVACY_REFERENCE_DATE value")?,
            );
        }

        self.audit.apply_env_overrides()?;

        Ok(())
    }

    /// Batch options derived from this configuration
    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            k: self.k,
            on_violation: self.on_violation,
            storage_age_width: self.storage_age_width,
            chain_age_width: self.chain_age_width,
            reference_date: self.reference_date,
            timestamp: None,
        }
    }
}

/// Audit logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Enable audit logging
    #[serde(default = "default_audit_enabled")]
    pub enabled: bool,

    /// Audit log file path
    #[serde(default = "default_audit_log_path")]
    pub log_path: PathBuf,

    /// Use JSON lines instead of plain text
    #[serde(default = "default_audit_json_format")]
    pub json_format: bool,
}

fn default_audit_enabled() -> bool {
    true
}

fn default_audit_log_path() -> PathBuf {
    PathBuf::from("./audit/deident.log")
}

fn default_audit_json_format() -> bool {
    true
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: default_audit_enabled(),
            log_path: default_audit_log_path(),
            json_format: default_audit_json_format(),
        }
    }
}

impl AuditConfig {
    /// Validate audit configuration
    pub fn validate(&self) -> Result<()> {
        if self.enabled && self.log_path.as_os_str().is_empty() {
            anyhow::bail!("privacy.audit.log_path must not be empty when audit is enabled");
        }
        Ok(())
    }

    /// A disabled audit configuration
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(val) = std::env::var("DEIDENT_PRIVACY_AUDIT_ENABLED") {
            self.enabled = val
                .parse()
                .context("Invalid DEIDENT_PRIVACY_AUDIT_ENABLED value")?;
        }

        if let Ok(val) = std::env::var("DEIDENT_PRIVACY_AUDIT_LOG_PATH") {
            self.log_path = PathBuf::from(val);
        }

        if let Ok(val) = std::env::var("DEIDENT_PRIVACY_AUDIT_JSON_FORMAT") {
            self.json_format = val
                .parse()
                .context("Invalid DEIDENT_PRIVACY_AUDIT_JSON_FORMAT value")?;
        }

        Ok(())
    }
}
