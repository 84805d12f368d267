//! Audit logging module
//!
//! Records one entry per batch, released or rejected.

pub mod logger;

pub use logger::AuditLogger;
