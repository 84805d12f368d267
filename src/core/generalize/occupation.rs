//! Occupation categories for chain-strength records

use crate::domain::generalized::UNKNOWN;

/// Coarse occupation categories, checked in order
const CATEGORIES: &[(&str, &[&str])] = &[
    (
        "Not Employed",
        &["unemployed", "not employed", "jobless", "retired", "homemaker", "housewife"],
    ),
    ("Student", &["student", "pupil", "trainee", "intern"]),
    (
        "Healthcare",
        &[
            "health", "nurse", "doctor", "physician", "clinic", "midwife", "pharmac", "surgeon",
            "dentist", "medical", "laborator",
        ],
    ),
    (
        "Education",
        &["teacher", "educat", "lecturer", "professor", "tutor", "school"],
    ),
    (
        "Agriculture",
        &["farm", "agric", "livestock", "fisher", "herder", "peasant", "cultivat"],
    ),
    (
        "Technology",
        &["technolog", "software", "developer", "programmer", "engineer", "technician"],
    ),
    (
        "Business",
        &[
            "business", "trader", "merchant", "shop", "vendor", "sales", "accountant", "banker",
            "entrepreneur",
        ],
    ),
    (
        "Public Service",
        &["public", "civil servant", "government", "police", "soldier", "army", "military"],
    ),
    (
        "Transport",
        &["transport", "driver", "boda", "taxi", "pilot", "conductor", "mechanic"],
    ),
];

/// Maps an occupation to its category, defaulting to `"Unknown"`
///
/// Category names map to themselves, so the mapping is idempotent.
///
/// # Examples
///
/// ```
/// use deident::core::generalize::occupation::categorize;
///
/// assert_eq!(categorize("Registered Nurse"), "Healthcare");
/// assert_eq!(categorize("Healthcare"), "Healthcare");
/// assert_eq!(categorize("Astronaut"), "Unknown");
/// ```
pub fn categorize(occupation: &str) -> &'static str {
    let lowered = occupation.trim().to_lowercase();
    if lowered.is_empty() {
        return UNKNOWN;
    }

    if let Some((category, _)) = CATEGORIES
        .iter()
        .find(|(category, _)| category.to_lowercase() == lowered)
    {
        return *category;
    }

    CATEGORIES
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| lowered.contains(k)))
        .map(|(category, _)| *category)
        .unwrap_or(UNKNOWN)
}
