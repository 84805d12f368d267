//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for deident using clap.

pub mod commands;

use clap::{Parser, Subcommand};

/// deident - clinical record de-identification and provenance pipeline
#[derive(Parser, Debug)]
#[command(name = "deident")]
#[command(version, about, long_about = None)]
#[command(author = "Deident Contributors")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "deident.toml", env = "DEIDENT_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "DEIDENT_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// De-identify one batch and write the release set
    Anonymize(commands::anonymize::AnonymizeArgs),

    /// Re-check the provenance of a written release set
    Verify(commands::verify::VerifyArgs),

    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),

    /// Initialize a new configuration file
    Init(commands::init::InitArgs),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::kanonymity::ViolationPolicy;

    #[test]
    fn test_cli_parse_anonymize() {
        let cli = Cli::parse_from([
            "deident",
            "anonymize",
            "--input",
            "rows.json",
            "--output",
            "release.json",
        ]);
        assert_eq!(cli.config, "deident.toml");
        match cli.command {
            Commands::Anonymize(args) => {
                assert_eq!(args.input.to_string_lossy(), "rows.json");
                assert!(args.mapping_output.is_none());
                assert!(!args.dry_run);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cli_parse_anonymize_overrides() {
        let cli = Cli::parse_from([
            "deident",
            "anonymize",
            "-i",
            "rows.json",
            "-o",
            "release.json",
            "--k",
            "3",
            "--on-violation",
            "suppress",
            "--reference-date",
            "2024-06-01",
        ]);
        match cli.command {
            Commands::Anonymize(args) => {
                assert_eq!(args.k, Some(3));
                assert_eq!(args.on_violation, Some(ViolationPolicy::Suppress));
                assert_eq!(
                    args.reference_date,
                    chrono::NaiveDate::from_ymd_opt(2024, 6, 1)
                );
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cli_rejects_unknown_policy() {
        let result = Cli::try_parse_from([
            "deident",
            "anonymize",
            "-i",
            "rows.json",
            "-o",
            "release.json",
            "--on-violation",
            "warn",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_parse_with_config() {
        let cli = Cli::parse_from(["deident", "--config", "custom.toml", "validate-config"]);
        assert_eq!(cli.config, "custom.toml");
        assert!(matches!(cli.command, Commands::ValidateConfig(_)));
    }

    #[test]
    fn test_cli_parse_with_log_level() {
        let cli = Cli::parse_from(["deident", "--log-level", "debug", "init"]);
        assert_eq!(cli.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_cli_parse_verify() {
        let cli = Cli::parse_from(["deident", "verify", "--input", "release.json"]);
        assert!(matches!(cli.command, Commands::Verify(_)));
    }

    #[test]
    fn test_cli_parse_init() {
        let cli = Cli::parse_from(["deident", "init"]);
        assert!(matches!(cli.command, Commands::Init(_)));
    }
}
