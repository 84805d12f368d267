//! Record normalization
//!
//! Converts either input shape into [`CanonicalRecord`]s:
//!
//! - **Tabular**: a JSON array of flat row objects
//! - **Bundle**: a JSON object with `"resourceType": "Bundle"` and an `entry`
//!   array of Patient / Observation / Consent resources linked by reference

mod bundle;
mod tabular;

use crate::domain::{CanonicalRecord, PipelineError};
use serde_json::Value;

/// Normalizes a batch of raw input
///
/// # Errors
///
/// Returns [`PipelineError::Normalization`] for scalars, objects that are not
/// a bundle, bundles without an `entry` array, untyped bundle entries, rows
/// that are not objects, and records without a patient key.
///
/// # Examples
///
/// ```
/// use deident::core::normalize::normalize;
/// use serde_json::json;
///
/// let rows = json!([
///     {"Patient ID": "P-1", "Gender": "F", "Result": 95},
///     {"Patient ID": "P-1", "Gender": "F", "Result": 96},
/// ]);
/// let records = normalize(&rows).unwrap();
/// assert_eq!(records.len(), 2);
/// assert_eq!(records[0].clinical["Result"], "95");
///
/// assert!(normalize(&json!({"resourceType": "Patient"})).is_err());
/// ```
pub fn normalize(input: &Value) -> Result<Vec<CanonicalRecord>, PipelineError> {
    let records = match input {
        Value::Array(rows) => tabular::normalize_rows(rows)?,
        Value::Object(object) => match object.get("resourceType").and_then(Value::as_str) {
            Some("Bundle") => {
                let entries = object
                    .get("entry")
                    .and_then(Value::as_array)
                    .ok_or_else(|| {
                        PipelineError::normalization(None, "Bundle has no 'entry' array")
                    })?;
                bundle::normalize_bundle(entries)?
            }
            Some(other) => {
                return Err(PipelineError::normalization(
                    None,
                    format!("Unsupported input type '{other}', expected a Bundle or an array of rows"),
                ))
            }
            None => {
                return Err(PipelineError::normalization(
                    None,
                    "Object input has no 'resourceType' tag",
                ))
            }
        },
        _ => {
            return Err(PipelineError::normalization(
                None,
                "Input must be an array of rows or a Bundle object",
            ))
        }
    };

    tracing::debug!(records = records.len(), "Normalized input");
    Ok(records)
}

/// Renders a scalar cell as a string; blanks and nulls become `None`
pub(crate) fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
