//! Logging and observability
//!
//! Structured logging via `tracing`:
//! - Console output on stderr
//! - Optional rolling JSON file output
//! - Batch lifecycle macros that log counts, ids and error categories only
//!
//! # Example
//!
//! ```no_run
//! use deident::logging::init_logging;
//! use deident::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!(records = 42, "Batch received");
//! ```

pub mod structured;

pub use structured::{init_logging, LoggingGuard};

/// Log the start of a batch
///
/// # Example
///
/// ```no_run
/// use deident::log_batch_start;
///
/// let batch_id = uuid::Uuid::new_v4();
/// log_batch_start!(batch_id, 120);
/// ```
#[macro_export]
macro_rules! log_batch_start {
    ($batch_id:expr, $records:expr) => {
        tracing::info!(
            batch_id = %$batch_id,
            records = $records,
            "Starting batch"
        );
    };
}

/// Log a released batch
///
/// # Example
///
/// ```no_run
/// use deident::log_batch_complete;
/// use std::time::Duration;
///
/// let batch_id = uuid::Uuid::new_v4();
/// log_batch_complete!(batch_id, 118, Duration::from_millis(40));
/// ```
#[macro_export]
macro_rules! log_batch_complete {
    ($batch_id:expr, $released:expr, $duration:expr) => {
        tracing::info!(
            batch_id = %$batch_id,
            released = $released,
            duration_ms = $duration.as_millis(),
            "Batch released"
        );
    };
}

/// Log a rejected batch with its error category
///
/// The error's display form names fields, indices and cohorts, never values.
#[macro_export]
macro_rules! log_batch_rejected {
    ($batch_id:expr, $error:expr) => {
        tracing::error!(
            batch_id = %$batch_id,
            category = $error.category(),
            error = %$error,
            "Batch rejected"
        );
    };
}

/// Log a skipped k-anonymity check on a corpus smaller than k
#[macro_export]
macro_rules! log_k_anonymity_bypass {
    ($records:expr, $k:expr) => {
        tracing::warn!(
            records = $records,
            k = $k,
            "Record set smaller than k; cohort size not enforced"
        );
    };
}
