//! Configuration management for deident.
//!
//! TOML configuration with:
//! - Environment variable substitution (`${VAR_NAME}`)
//! - `DEIDENT_<SECTION>_<KEY>` environment overrides
//! - Default values for every setting
//! - Validation on load
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use deident::config::load_config;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("deident.toml")?;
//! println!("k = {}", config.privacy.k);
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration Structure
//!
//! - [`ApplicationConfig`] - Log level and dry-run mode
//! - [`PrivacyConfig`] - k, violation policy, age bucket widths, audit log
//! - [`LoggingConfig`] - Local file logging
//!
//! # Example Configuration
//!
//! ```toml
//! [application]
//! log_level = "info"
//!
//! [privacy]
//! k = 5
//! on_violation = "reject"
//! storage_age_width = 5
//! chain_age_width = 10
//!
//! [privacy.audit]
//! enabled = true
//! log_path = "${DEIDENT_AUDIT_DIR}/deident.log"
//!
//! [logging]
//! local_enabled = true
//! local_path = "./logs"
//! ```

pub mod loader;
pub mod schema;

pub use crate::anonymization::config::{AuditConfig, PrivacyConfig};
pub use loader::{load_config, parse_config};
pub use schema::{ApplicationConfig, DeidentConfig, LoggingConfig};
