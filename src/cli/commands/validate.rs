//! Validate config command implementation

use super::{EXIT_CONFIG, EXIT_OK};
use crate::config::load_config;
use clap::Args;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    pub fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        let config = match load_config(config_path) {
            Ok(c) => {
                println!("✅ Configuration file loaded successfully");
                c
            }
            Err(e) => {
                println!("❌ Failed to load configuration file");
                println!("   Error: {e}");
                return Ok(EXIT_CONFIG);
            }
        };

        match config.validate() {
            Ok(()) => {
                let privacy = &config.privacy;
                println!("✅ Configuration is valid");
                println!();
                println!("Configuration Summary:");
                println!("  Log Level: {}", config.application.log_level);
                println!("  Dry Run: {}", config.application.dry_run);
                println!("  k: {}", privacy.k);
                println!("  On Violation: {}", privacy.on_violation);
                println!("  Storage Age Width: {}", privacy.storage_age_width);
                println!("  Chain Age Width: {}", privacy.chain_age_width);
                match privacy.reference_date {
                    Some(date) => println!("  Reference Date: {date}"),
                    None => println!("  Reference Date: (today)"),
                }
                if privacy.audit.enabled {
                    println!("  Audit Log: {}", privacy.audit.log_path.display());
                } else {
                    println!("  Audit Log: disabled");
                }
                if config.logging.local_enabled {
                    println!(
                        "  File Logging: {} ({})",
                        config.logging.local_path, config.logging.local_rotation
                    );
                }
                println!();
                Ok(EXIT_OK)
            }
            Err(e) => {
                println!("❌ Configuration validation failed");
                println!("   Error: {e}");
                println!();
                Ok(EXIT_CONFIG)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn run(contents: &str) -> i32 {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("deident.toml");
        fs::write(&path, contents).unwrap();
        ValidateArgs {}.execute(&path.to_string_lossy()).unwrap()
    }

    #[test]
    fn test_valid_config() {
        assert_eq!(run("[privacy]\nk = 3\n"), EXIT_OK);
    }

    #[test]
    fn test_invalid_config() {
        assert_eq!(run("[privacy]\nk = 0\n"), EXIT_CONFIG);
    }

    #[test]
    fn test_missing_config() {
        let code = ValidateArgs {}.execute("/nonexistent/deident.toml").unwrap();
        assert_eq!(code, EXIT_CONFIG);
    }
}
