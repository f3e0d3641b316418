use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use regex::Regex;

/// Date-only layouts seen on listing pages, tried in order
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d %B %Y", "%d %b %Y", "%b %d, %Y", "%B %d, %Y"];

fn ordinal_suffix() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b(\d{1,2})(?:st|nd|rd|th)\b").expect("ordinal suffix pattern is valid")
    })
}

/// Parse a human or machine date into UTC
///
/// Returns `None` for anything unrecognised; a bad date never fails extraction.
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let candidate = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if candidate.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(&candidate) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(&candidate) {
        return Some(dt.with_timezone(&Utc));
    }
    // ISO timestamp without an offset
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(&candidate, fmt) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }

    let cleaned = ordinal_suffix().replace_all(&candidate, "$1");
    DATE_FORMATS.iter().find_map(|fmt| {
        NaiveDate::parse_from_str(&cleaned, fmt)
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|naive| Utc.from_utc_datetime(&naive))
    })
}
