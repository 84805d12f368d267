//! CLI command implementations
//!
//! Exit codes shared by every command:
//! - `0` success
//! - `2` configuration error
//! - `3` batch rejected or release failed verification
//! - `5` fatal error (I/O, audit)

pub mod anonymize;
pub mod init;
pub mod validate;
pub mod verify;

use crate::config::{load_config, DeidentConfig};
use crate::domain::Result;
use std::path::Path;

/// Exit code for success
pub const EXIT_OK: i32 = 0;
/// Exit code for configuration errors
pub const EXIT_CONFIG: i32 = 2;
/// Exit code for a rejected batch
pub const EXIT_REJECTED: i32 = 3;
/// Exit code for fatal errors
pub const EXIT_FATAL: i32 = 5;

/// Loads `config_path` if it exists, otherwise the defaults
///
/// # Errors
///
/// Returns the loader's error for a file that exists but is invalid.
pub fn load_or_default(config_path: &str) -> Result<DeidentConfig> {
    if Path::new(config_path).exists() {
        load_config(config_path)
    } else {
        tracing::info!(config_path = %config_path, "No configuration file, using defaults");
        Ok(DeidentConfig::default())
    }
}
