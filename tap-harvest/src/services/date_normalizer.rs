//! Capture-date normalization
//!
//! Accepts `YYYY-MM-DD`, `YYYY:MM:DD` (EXIF), `YYYYMMDD` and the partial forms
//! `YYYY` / `YYYY-MM`, with anything after the day ignored. The leading
//! 4-digit year is mandatory; month and day default to `01` independently.
//!
//! Calendar correctness is NOT checked: `2015:13:32` normalizes to
//! `2015-13-32`. Downstream consumers only rely on the year and on the string
//! being sortable, and rejecting such values would drop otherwise usable photos.

use once_cell::sync::Lazy;
use regex::Regex;

static DATE_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([0-9]{4})[-:]?([0-9]{2})?[-:]?([0-9]{2})?").expect("static regex is valid")
});

/// Canonical date plus its integer year
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedDate {
    /// `YYYY-MM-DD`
    pub date: String,
    pub year: i32,
}

/// Parse a loosely structured date string
///
/// Returns `None` when the input does not start with four digits.
pub fn normalize(raw: &str) -> Option<NormalizedDate> {
    let caps = DATE_PREFIX.captures(raw)?;

    let year_text = caps.get(1)?.as_str();
    let year: i32 = year_text.parse().ok()?;
    let month = caps.get(2).map_or("01", |m| m.as_str());
    let day = caps.get(3).map_or("01", |m| m.as_str());

    Some(NormalizedDate {
        date: format!("{}-{}-{}", year_text, month, day),
        year,
    })
}
