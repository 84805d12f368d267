//! Init command implementation
//!
//! This module implements the `init` command for generating a sample
//! configuration file.

use super::{EXIT_CONFIG, EXIT_FATAL, EXIT_OK};
use clap::Args;
use std::fs;
use std::path::Path;

/// Arguments for the init command
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Path where to create the configuration file
    #[arg(short, long, default_value = "deident.toml")]
    pub output: String,

    /// Include example values and comments
    #[arg(long)]
    pub with_examples: bool,

    /// Overwrite existing file
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    /// Execute the init command
    pub fn execute(&self) -> anyhow::Result<i32> {
        tracing::info!(output = %self.output, "Initializing configuration file");

        println!("📝 Initializing deident configuration");
        println!();

        if Path::new(&self.output).exists() && !self.force {
            println!("❌ Configuration file already exists: {}", self.output);
            println!("   Use --force to overwrite");
            return Ok(EXIT_CONFIG);
        }

        let config_content = if self.with_examples {
            Self::generate_config_with_examples()
        } else {
            Self::generate_minimal_config()
        };

        match fs::write(&self.output, config_content) {
            Ok(()) => {
                println!("✅ Configuration file created: {}", self.output);
                println!();
                println!("Next steps:");
                println!("  1. Edit {} with your settings", self.output);
                println!("  2. Validate configuration: deident validate-config");
                println!("  3. Run a batch: deident anonymize --input rows.json --output release.json --mapping-output mapping.json");
                println!("  4. Check a release: deident verify --input release.json");
                println!();
                Ok(EXIT_OK)
            }
            Err(e) => {
                println!("❌ Failed to write configuration file");
                println!("   Error: {e}");
                Ok(EXIT_FATAL)
            }
        }
    }

    /// Generate minimal configuration
    fn generate_minimal_config() -> String {
        r#"# deident configuration

[application]
log_level = "info"

[privacy]
k = 5
on_violation = "reject"
storage_age_width = 5
chain_age_width = 10

[privacy.audit]
enabled = true
log_path = "./audit/deident.log"

[logging]
local_enabled = false
"#
        .to_string()
    }

    /// Generate configuration with examples and comments
    fn generate_config_with_examples() -> String {
        r#"# deident configuration
# Clinical record de-identification and provenance pipeline
#
# Values of the form ${VAR} are replaced from the environment.
# Any key can also be overridden with DEIDENT_<SECTION>_<KEY>,
# e.g. DEIDENT_PRIVACY_K=10.

# ============================================================================
# Application
# ============================================================================
[application]
# trace | debug | info | warn | error
log_level = "info"

# Run and validate batches without writing the release or the mapping
dry_run = false

# ============================================================================
# Privacy
# ============================================================================
[privacy]
# Minimum cohort size over (country, age range, gender, occupation)
k = 5

# What to do with cohorts smaller than k:
#   reject   - reject the whole batch (recommended)
#   suppress - drop the undersized cohorts and release the rest
on_violation = "reject"

# Age bucket width for storage records
storage_age_width = 5

# Age bucket width for chain records; must be a multiple of storage_age_width
chain_age_width = 10

# Date ages are computed against (defaults to today)
# reference_date = "2024-06-01"

[privacy.audit]
# One entry per batch: counts, hashes, field names. Never field values.
enabled = true
log_path = "./audit/deident.log"

# JSON lines (true) or plain text (false)
json_format = true

# ============================================================================
# Logging
# ============================================================================
[logging]
# Write JSON logs to a file in addition to the console
local_enabled = false

# Directory for log files
local_path = "./logs"

# daily | hourly | never
local_rotation = "daily"
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;
    use tempfile::TempDir;

    #[test]
    fn test_generated_configs_parse() {
        for content in [
            InitArgs::generate_minimal_config(),
            InitArgs::generate_config_with_examples(),
        ] {
            let config = parse_config(&content).unwrap();
            assert!(config.validate().is_ok());
            assert_eq!(config.privacy.k, 5);
        }
    }

    #[test]
    fn test_existing_file_needs_force() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("deident.toml");
        fs::write(&output, "# existing").unwrap();

        let mut args = InitArgs {
            output: output.to_string_lossy().to_string(),
            with_examples: false,
            force: false,
        };
        assert_eq!(args.execute().unwrap(), EXIT_CONFIG);
        assert_eq!(fs::read_to_string(&output).unwrap(), "# existing");

        args.force = true;
        assert_eq!(args.execute().unwrap(), EXIT_OK);
        assert!(fs::read_to_string(&output).unwrap().contains("[privacy]"));
    }
}
