//! Result type alias for deident
//!
//! This module provides a convenient Result type alias that uses DeidentError
//! as the error type.

use super::errors::DeidentError;

/// Result type alias for deident operations outside the pipeline core
///
/// # Examples
///
/// ```
/// use deident::domain::result::Result;
/// use deident::domain::errors::DeidentError;
///
/// fn example_function() -> Result<String> {
///     Ok("success".to_string())
/// }
///
/// fn failing_function() -> Result<()> {
///     Err(DeidentError::Configuration("k must be >= 1".to_string()))
/// }
/// ```
pub type Result<T> = std::result::Result<T, DeidentError>;
