//! Record extraction: one media page in, one `ImageRecord` or a `Rejection` out
//!
//! Steps, in order:
//! 1. `imageinfo[0]` must exist
//! 2. Coordinates: page `coordinates[0]`, else the query centre
//! 3. Raw capture date: extended `DateTimeOriginal`, else the first embedded
//!    metadata entry named `DateTimeOriginal`
//! 4. Normalize the date; no year means rejection
//! 5. Inclusive year range filter
//! 6. Description (trimmed)
//! 7. Credits: `<author> / Wikimedia Commons / <licence>[ (<licence url>)]`
//! 8. Image URL must exist
//! 9. Filename = final URL path segment
//! 10. Fetch through the dedup-aware fetcher; only success yields a record
//!
//! Filenames accepted earlier in the same run are rejected as duplicates before
//! any fetch, so a manifest never names the same file twice.

use crate::error::Rejection;
use crate::models::{ImageInfo, MediaPage};
use crate::services::date_normalizer::{self, NormalizedDate};
use crate::services::image_fetcher::{FetchOutcome, ImageFetcher};
use std::collections::HashSet;
use tap_common::ImageRecord;
use tracing::debug;
use url::Url;

/// Licence label used when the page does not name one
///
/// This is a substitution, not a fact about the image: a missing
/// `LicenseShortName` does not mean the file is CC BY-SA. Every use is counted
/// in the harvest report.
pub const DEFAULT_LICENSE: &str = "CC BY-SA";

/// Repository name placed in every credit line
pub const CREDIT_SOURCE: &str = "Wikimedia Commons";

const DATE_FIELD: &str = "DateTimeOriginal";
const DESCRIPTION_FIELD: &str = "ImageDescription";
const ARTIST_FIELD: &str = "Artist";
const LICENSE_NAME_FIELD: &str = "LicenseShortName";
const LICENSE_URL_FIELD: &str = "LicenseUrl";

/// Inclusive, independently optional year bounds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct YearRange {
    pub start: Option<i32>,
    pub end: Option<i32>,
}

impl YearRange {
    pub fn new(start: Option<i32>, end: Option<i32>) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, year: i32) -> bool {
        self.start.map_or(true, |s| year >= s) && self.end.map_or(true, |e| year <= e)
    }
}

/// Per-query inputs to extraction
#[derive(Debug, Clone, Default)]
pub struct ExtractionContext {
    /// Centre the search was issued against
    pub query_center: Option<(f64, f64)>,
    pub year_range: YearRange,
    /// Set when harvesting by named location
    pub city: Option<String>,
}

/// Attribution line plus whether the licence label was substituted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credits {
    pub text: String,
    pub licence_defaulted: bool,
}

/// A page that passed steps 1-9 and is ready to be fetched
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub locator: String,
    pub filename: String,
    pub lat: f64,
    pub lng: f64,
    pub date: NormalizedDate,
    pub description: String,
    pub credits: Credits,
}

impl Candidate {
    fn into_record(self, city: Option<String>) -> ImageRecord {
        ImageRecord {
            filename: self.filename,
            lat: self.lat,
            lng: self.lng,
            year: self.date.year,
            date: self.date.date,
            description: self.description,
            credits: self.credits.text,
            city,
        }
    }
}

/// Successful extraction
#[derive(Debug, Clone, PartialEq)]
pub struct Extracted {
    pub record: ImageRecord,
    pub fetch: FetchOutcome,
    pub licence_defaulted: bool,
}

/// Turns media pages into image records, fetching each file once per run
pub struct RecordExtractor {
    fetcher: ImageFetcher,
    seen: HashSet<String>,
}

impl RecordExtractor {
    pub fn new(fetcher: ImageFetcher) -> Self {
        Self {
            fetcher,
            seen: HashSet::new(),
        }
    }

    pub fn fetcher(&self) -> &ImageFetcher {
        &self.fetcher
    }

    /// Run all extraction steps for one page
    pub async fn extract(
        &mut self,
        page: &MediaPage,
        ctx: &ExtractionContext,
    ) -> Result<Extracted, Rejection> {
        let candidate = prepare_candidate(page, ctx.query_center, &ctx.year_range)?;

        if self.seen.contains(&candidate.filename) {
            return Err(Rejection::Duplicate);
        }

        let fetch = self
            .fetcher
            .ensure_local(&candidate.locator, &candidate.filename)
            .await
            .map_err(|_| Rejection::FetchFailed)?;

        self.seen.insert(candidate.filename.clone());

        let licence_defaulted = candidate.credits.licence_defaulted;
        Ok(Extracted {
            record: candidate.into_record(ctx.city.clone()),
            fetch,
            licence_defaulted,
        })
    }
}

/// Steps 1-9: everything that needs no I/O
pub fn prepare_candidate(
    page: &MediaPage,
    query_center: Option<(f64, f64)>,
    year_range: &YearRange,
) -> Result<Candidate, Rejection> {
    let info = page.image_info().ok_or(Rejection::NoImageInfo)?;

    let (lat, lng) = page
        .primary_coordinate()
        .map(|c| (c.lat, c.lon))
        .or(query_center)
        .ok_or(Rejection::NoCoordinates)?;

    let raw_date = raw_capture_date(info).unwrap_or_default();
    let date = date_normalizer::normalize(&raw_date).ok_or(Rejection::NoYear)?;

    if !year_range.contains(date.year) {
        return Err(Rejection::OutOfRange);
    }

    let description = info
        .ext_text(DESCRIPTION_FIELD)
        .map(|d| d.trim().to_string())
        .unwrap_or_default();

    let credits = build_credits(info);

    let locator = info
        .url
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .ok_or(Rejection::NoUrl)?
        .to_string();

    let filename = filename_from_url(&locator).ok_or(Rejection::InvalidUrl)?;

    debug!(page = %page.label(), filename = %filename, year = date.year, "Candidate extracted");

    Ok(Candidate {
        locator,
        filename,
        lat,
        lng,
        date,
        description,
        credits,
    })
}

/// Capture date from extended metadata, falling back to embedded metadata
///
/// The first embedded entry with a matching name wins, even if its value is empty.
pub fn raw_capture_date(info: &ImageInfo) -> Option<String> {
    if let Some(date) = info.ext_text(DATE_FIELD) {
        return Some(date);
    }

    info.embedded()
        .iter()
        .find(|entry| entry.name == DATE_FIELD)
        .and_then(|entry| entry.text())
}

/// Attribution line synthesized from extended metadata
pub fn build_credits(info: &ImageInfo) -> Credits {
    let author = info
        .ext_text(ARTIST_FIELD)
        .map(|a| a.trim().to_string())
        .unwrap_or_default();

    let (licence, licence_defaulted) = match info.ext_text(LICENSE_NAME_FIELD) {
        Some(name) => (name, false),
        None => (DEFAULT_LICENSE.to_string(), true),
    };

    let mut text = format!("{} / {} / {}", author, CREDIT_SOURCE, licence);
    if let Some(url) = info.ext_text(LICENSE_URL_FIELD) {
        text.push_str(&format!(" ({})", url));
    }

    Credits {
        text,
        licence_defaulted,
    }
}

/// Final path segment of `locator`, kept percent-encoded
pub fn filename_from_url(locator: &str) -> Option<String> {
    let url = Url::parse(locator).ok()?;
    let segment = url.path_segments()?.last()?;

    match segment {
        "" | "." | ".." => None,
        name => Some(name.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn page(value: serde_json::Value) -> MediaPage {
        serde_json::from_value(value).unwrap()
    }

    fn info(value: serde_json::Value) -> ImageInfo {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_year_range_inclusive_bounds() {
        let range = YearRange::new(Some(1990), Some(2022));
        assert!(!range.contains(1985));
        assert!(range.contains(1990));
        assert!(range.contains(2022));
        assert!(!range.contains(2023));
    }

    #[test]
    fn test_year_range_open_ends() {
        assert!(YearRange::default().contains(1200));
        assert!(YearRange::new(Some(2000), None).contains(3000));
        assert!(!YearRange::new(None, Some(1950)).contains(1951));
    }

    #[test]
    fn test_credits_default_licence() {
        let credits = build_credits(&info(json!({
            "extmetadata": { "Artist": { "value": "J. Doe" } }
        })));
        assert_eq!(credits.text, "J. Doe / Wikimedia Commons / CC BY-SA");
        assert!(credits.licence_defaulted);
    }

    #[test]
    fn test_credits_with_licence_url() {
        let credits = build_credits(&info(json!({
            "extmetadata": {
                "Artist": { "value": "J. Doe" },
                "LicenseUrl": { "value": "http://x" }
            }
        })));
        assert_eq!(credits.text, "J. Doe / Wikimedia Commons / CC BY-SA (http://x)");
    }

    #[test]
    fn test_credits_named_licence_and_empty_author() {
        let credits = build_credits(&info(json!({
            "extmetadata": {
                "LicenseShortName": { "value": "CC0" },
                "Artist": { "value": "   " }
            }
        })));
        assert_eq!(credits.text, " / Wikimedia Commons / CC0");
        assert!(!credits.licence_defaulted);
    }

    #[test]
    fn test_extended_date_preferred_over_embedded() {
        let info = info(json!({
            "extmetadata": { "DateTimeOriginal": { "value": "2001-02-03" } },
            "metadata": [ { "name": "DateTimeOriginal", "value": "1999:01:01 00:00:00" } ]
        }));
        assert_eq!(raw_capture_date(&info), Some("2001-02-03".to_string()));
    }

    #[test]
    fn test_embedded_date_first_match_wins() {
        let info = info(json!({
            "extmetadata": { "DateTimeOriginal": { "value": "" } },
            "metadata": [
                { "name": "Make", "value": "Canon" },
                { "name": "DateTimeOriginal", "value": "1999:01:01 00:00:00" },
                { "name": "DateTimeOriginal", "value": "2005:05:05 00:00:00" }
            ]
        }));
        assert_eq!(raw_capture_date(&info), Some("1999:01:01 00:00:00".to_string()));
    }

    #[test]
    fn test_filename_from_url() {
        assert_eq!(
            filename_from_url("https://upload.wikimedia.org/wikipedia/commons/a/ab/Tour_Eiffel_%281%29.jpg"),
            Some("Tour_Eiffel_%281%29.jpg".to_string())
        );
        assert_eq!(
            filename_from_url("https://upload.wikimedia.org/x/photo.png?download=1"),
            Some("photo.png".to_string())
        );
        assert_eq!(filename_from_url("https://upload.wikimedia.org/dir/"), None);
        assert_eq!(filename_from_url("not a url"), None);
    }

    #[test]
    fn test_rejection_order_no_image_info() {
        let p = page(json!({ "title": "File:A.jpg", "coordinates": [ { "lat": 1.0, "lon": 2.0 } ] }));
        assert_eq!(
            prepare_candidate(&p, Some((0.0, 0.0)), &YearRange::default()),
            Err(Rejection::NoImageInfo)
        );
    }

    #[test]
    fn test_coordinate_fallback_to_center() {
        let p = page(json!({
            "imageinfo": [ {
                "url": "https://upload.wikimedia.org/a/b/C.jpg",
                "extmetadata": { "DateTimeOriginal": { "value": "2010" } }
            } ]
        }));
        let candidate = prepare_candidate(&p, Some((48.8566, 2.3522)), &YearRange::default()).unwrap();
        assert_eq!(candidate.lat, 48.8566);
        assert_eq!(candidate.lng, 2.3522);
        assert_eq!(candidate.date.date, "2010-01-01");
        assert_eq!(candidate.filename, "C.jpg");
    }

    #[test]
    fn test_page_coordinates_preferred() {
        let p = page(json!({
            "coordinates": [ { "lat": 51.5, "lon": -0.12 } ],
            "imageinfo": [ {
                "url": "https://upload.wikimedia.org/a/b/C.jpg",
                "extmetadata": { "DateTimeOriginal": { "value": "2010" } }
            } ]
        }));
        let candidate = prepare_candidate(&p, Some((0.0, 0.0)), &YearRange::default()).unwrap();
        assert_eq!((candidate.lat, candidate.lng), (51.5, -0.12));
    }

    #[test]
    fn test_no_coordinates_without_center() {
        let p = page(json!({
            "imageinfo": [ {
                "url": "https://upload.wikimedia.org/a/b/C.jpg",
                "extmetadata": { "DateTimeOriginal": { "value": "2010" } }
            } ]
        }));
        assert_eq!(
            prepare_candidate(&p, None, &YearRange::default()),
            Err(Rejection::NoCoordinates)
        );
    }

    #[test]
    fn test_no_year_rejected_before_url_check() {
        let p = page(json!({ "imageinfo": [ { "extmetadata": {} } ] }));
        assert_eq!(
            prepare_candidate(&p, Some((0.0, 0.0)), &YearRange::default()),
            Err(Rejection::NoYear)
        );
    }

    #[test]
    fn test_out_of_range_rejected() {
        let p = page(json!({
            "imageinfo": [ {
                "url": "https://upload.wikimedia.org/a/b/C.jpg",
                "extmetadata": { "DateTimeOriginal": { "value": "1985-07-01" } }
            } ]
        }));
        assert_eq!(
            prepare_candidate(&p, Some((0.0, 0.0)), &YearRange::new(Some(1990), Some(2022))),
            Err(Rejection::OutOfRange)
        );
    }

    #[test]
    fn test_missing_url_rejected() {
        let p = page(json!({
            "imageinfo": [ { "extmetadata": { "DateTimeOriginal": { "value": "2000" } } } ]
        }));
        assert_eq!(
            prepare_candidate(&p, Some((0.0, 0.0)), &YearRange::default()),
            Err(Rejection::NoUrl)
        );
    }

    #[test]
    fn test_description_trimmed() {
        let p = page(json!({
            "imageinfo": [ {
                "url": "https://upload.wikimedia.org/a/b/C.jpg",
                "extmetadata": {
                    "DateTimeOriginal": { "value": "2000" },
                    "ImageDescription": { "value": "  Pont Neuf at dusk \n" }
                }
            } ]
        }));
        let candidate = prepare_candidate(&p, Some((0.0, 0.0)), &YearRange::default()).unwrap();
        assert_eq!(candidate.description, "Pont Neuf at dusk");
    }
}
