//! Birth date parsing and age computation

use crate::domain::generalized::MAX_AGE;
use chrono::{DateTime, Datelike, NaiveDate};

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%d/%m/%Y", "%Y/%m/%d"];

/// Parses a birth date in any of the accepted input formats
///
/// Accepts `YYYY-MM-DD`, `DD/MM/YYYY`, `YYYY/MM/DD`, RFC 3339 timestamps and a
/// bare four-digit year (taken as 1 January).
pub fn parse_birth_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            return Some(date);
        }
    }

    if let Ok(instant) = DateTime::parse_from_rfc3339(raw) {
        return Some(instant.date_naive());
    }

    if raw.len() == 4 && raw.chars().all(|c| c.is_ascii_digit()) {
        return raw
            .parse::<i32>()
            .ok()
            .and_then(|year| NaiveDate::from_ymd_opt(year, 1, 1));
    }

    None
}

/// Completed years between `birth` and `reference`
///
/// `None` for future births and for ages above [`MAX_AGE`].
pub fn age_on(birth: NaiveDate, reference: NaiveDate) -> Option<u32> {
    if birth > reference {
        return None;
    }
    let mut years = reference.year() - birth.year();
    if (reference.month(), reference.day()) < (birth.month(), birth.day()) {
        years -= 1;
    }
    u32::try_from(years).ok().filter(|age| *age <= MAX_AGE)
}
