//! Typed shape of a media source search response
//!
//! Mirrors the Wikimedia Commons action API with `formatversion=2`:
//!
//! ```json
//! { "query": { "pages": [ {
//!     "title": "File:Example.jpg",
//!     "coordinates": [ { "lat": 48.85, "lon": 2.29 } ],
//!     "imageinfo": [ {
//!         "url": "https://upload.wikimedia.org/.../Example.jpg",
//!         "extmetadata": { "DateTimeOriginal": { "value": "2015-06-24" } },
//!         "metadata": [ { "name": "DateTimeOriginal", "value": "2015:06:24 13:45:00" } ]
//!     } ]
//! } ] } }
//! ```
//!
//! Every field the core does not strictly need is optional so that an absent
//! field becomes `None`/empty instead of a parse failure.

use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

/// Top-level search response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchResponse {
    /// Results container; absent when the search matched nothing
    #[serde(default)]
    pub query: Option<QueryResults>,
    /// API-level error object
    #[serde(default)]
    pub error: Option<ApiErrorBody>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueryResults {
    #[serde(default)]
    pub pages: Vec<MediaPage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub info: String,
}

/// One media page (a `File:` page on Commons)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MediaPage {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub coordinates: Vec<PageCoordinate>,
    #[serde(default)]
    pub imageinfo: Vec<ImageInfo>,
}

impl MediaPage {
    /// `imageinfo[0]`
    pub fn image_info(&self) -> Option<&ImageInfo> {
        self.imageinfo.first()
    }

    /// `coordinates[0]`
    pub fn primary_coordinate(&self) -> Option<&PageCoordinate> {
        self.coordinates.first()
    }

    /// Title for log lines
    pub fn label(&self) -> &str {
        self.title.as_deref().unwrap_or("<untitled>")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct PageCoordinate {
    pub lat: f64,
    pub lon: f64,
}

/// Image-level info: file URL plus both metadata sources
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImageInfo {
    #[serde(default)]
    pub url: Option<String>,
    /// Curated extended metadata, keyed by field name
    #[serde(default)]
    pub extmetadata: HashMap<String, ExtMetadataField>,
    /// Embedded (EXIF-style) metadata; the API sends `null` for some files
    #[serde(default)]
    pub metadata: Option<Vec<EmbeddedMetadataEntry>>,
}

impl ImageInfo {
    /// Text value of an extended metadata field, if present and non-empty
    pub fn ext_text(&self, field: &str) -> Option<String> {
        self.extmetadata
            .get(field)
            .and_then(|f| value_as_text(&f.value))
            .filter(|s| !s.is_empty())
    }

    /// Embedded metadata entries (empty when absent)
    pub fn embedded(&self) -> &[EmbeddedMetadataEntry] {
        self.metadata.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExtMetadataField {
    #[serde(default)]
    pub value: Value,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EmbeddedMetadataEntry {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub value: Value,
}

impl EmbeddedMetadataEntry {
    pub fn text(&self) -> Option<String> {
        value_as_text(&self.value)
    }
}

/// Scalar JSON value rendered as text; structured values yield `None`
pub(crate) fn value_as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_optional_fields_parse() {
        let response: SearchResponse =
            serde_json::from_value(json!({ "query": { "pages": [ { "title": "File:A.jpg" } ] } }))
                .unwrap();
        let page = &response.query.unwrap().pages[0];
        assert!(page.image_info().is_none());
        assert!(page.primary_coordinate().is_none());
    }

    #[test]
    fn test_null_embedded_metadata_is_empty() {
        let info: ImageInfo =
            serde_json::from_value(json!({ "url": "https://x/y.jpg", "metadata": null })).unwrap();
        assert!(info.embedded().is_empty());
    }

    #[test]
    fn test_ext_text_skips_empty_and_structured_values() {
        let info: ImageInfo = serde_json::from_value(json!({
            "extmetadata": {
                "Artist": { "value": "" },
                "Categories": { "value": ["a", "b"] },
                "DateTimeOriginal": { "value": 2015 }
            }
        }))
        .unwrap();
        assert_eq!(info.ext_text("Artist"), None);
        assert_eq!(info.ext_text("Categories"), None);
        assert_eq!(info.ext_text("DateTimeOriginal"), Some("2015".to_string()));
        assert_eq!(info.ext_text("Missing"), None);
    }

    #[test]
    fn test_no_results_container() {
        let response: SearchResponse = serde_json::from_value(json!({ "batchcomplete": true })).unwrap();
        assert!(response.query.is_none());
        assert!(response.error.is_none());
    }
}
