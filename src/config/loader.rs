//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::DeidentConfig;
use crate::domain::errors::DeidentError;
use crate::domain::result::Result;
use regex::Regex;
use std::fs;
use std::path::Path;

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (${VAR} syntax)
/// 3. Parses the TOML into DeidentConfig
/// 4. Applies environment variable overrides (DEIDENT_* prefix)
/// 5. Validates the configuration
///
/// # Errors
///
/// Returns [`DeidentError::Configuration`] if the file cannot be read or
/// parsed, a referenced variable is unset, or validation fails.
///
/// # Examples
///
/// ```no_run
/// use deident::config::loader::load_config;
///
/// let config = load_config("deident.toml").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<DeidentConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(DeidentError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        DeidentError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    parse_config(&contents)
}

/// Parses, overrides and validates configuration text
///
/// # Errors
///
/// Same as [`load_config`], minus file access.
pub fn parse_config(contents: &str) -> Result<DeidentConfig> {
    let contents = substitute_env_vars(contents)?;

    let mut config: DeidentConfig = toml::from_str(&contents)
        .map_err(|e| DeidentError::Configuration(format!("Failed to parse TOML: {}", e)))?;

    apply_env_overrides(&mut config)?;

    config.validate().map_err(|e| {
        DeidentError::Configuration(format!("Configuration validation failed: {}", e))
    })?;

    Ok(config)
}

/// Substitutes environment variables in the format ${VAR_NAME}
///
/// Comment lines are left untouched.
///
/// # Errors
///
/// Returns an error if a referenced environment variable is not set
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
        .map_err(|e| DeidentError::Other(format!("Invalid substitution pattern: {e}")))?;
    let mut result = String::new();
    let mut missing_vars: Vec<String> = Vec::new();

    for line in input.lines() {
        if line.trim_start().starts_with('#') {
            result.push_str(line);
            result.push('\n');
            continue;
        }

        let processed = re.replace_all(line, |cap: &regex::Captures<'_>| {
            let var_name = &cap[1];
            std::env::var(var_name).unwrap_or_else(|_| {
                if !missing_vars.iter().any(|v| v == var_name) {
                    missing_vars.push(var_name.to_string());
                }
                String::new()
            })
        });
        result.push_str(&processed);
        result.push('\n');
    }

    if !missing_vars.is_empty() {
        return Err(DeidentError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(result)
}

/// Applies environment variable overrides using DEIDENT_* prefix
///
/// Environment variables follow the pattern: DEIDENT_<SECTION>_<KEY>,
/// for example DEIDENT_APPLICATION_LOG_LEVEL or DEIDENT_PRIVACY_K.
fn apply_env_overrides(config: &mut DeidentConfig) -> Result<()> {
    if let Ok(val) = std::env::var("DEIDENT_APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }
    if let Ok(val) = std::env::var("DEIDENT_APPLICATION_DRY_RUN") {
        config.application.dry_run = val.parse().unwrap_or(false);
    }

    config
        .privacy
        .apply_env_overrides()
        .map_err(|e| DeidentError::Configuration(format!("{e:#}")))?;

    if let Ok(val) = std::env::var("DEIDENT_LOGGING_LOCAL_ENABLED") {
        config.logging.local_enabled = val.parse().unwrap_or(false);
    }
    if let Ok(val) = std::env::var("DEIDENT_LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }
    if let Ok(val) = std::env::var("DEIDENT_LOGGING_LOCAL_ROTATION") {
        config.logging.local_rotation = val;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_substitute_env_vars() {
        std::env::set_var("DEIDENT_TEST_LOADER_VAR", "./audit/test.log");
        let input = "log_path = \"${DEIDENT_TEST_LOADER_VAR}\"";
        let result = substitute_env_vars(input).unwrap();
        assert_eq!(result, "log_path = \"./audit/test.log\"\n");
        std::env::remove_var("DEIDENT_TEST_LOADER_VAR");
    }

    #[test]
    fn test_substitute_env_vars_skips_comments() {
        let input = "# path = \"${DEIDENT_TEST_UNSET_IN_COMMENT}\"";
        assert!(substitute_env_vars(input).is_ok());
    }

    #[test]
    fn test_substitute_env_vars_missing() {
        std::env::remove_var("DEIDENT_TEST_MISSING_VAR");
        let input = "log_path = \"${DEIDENT_TEST_MISSING_VAR}\"";
        let err = substitute_env_vars(input).unwrap_err();
        assert!(err.to_string().contains("DEIDENT_TEST_MISSING_VAR"));
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = load_config("nonexistent.toml");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_valid() {
        let toml_content = r#"
[application]
log_level = "debug"

[privacy]
k = 10
storage_age_width = 5
chain_age_width = 20

[privacy.audit]
enabled = false

[logging]
local_enabled = false
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.application.log_level, "debug");
        assert_eq!(config.privacy.k, 10);
        assert_eq!(config.privacy.chain_age_width, 20);
        assert!(!config.privacy.audit.enabled);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = parse_config("[privacy]\nk = 0\n").unwrap_err();
        assert!(matches!(err, DeidentError::Configuration(_)));
    }
}
