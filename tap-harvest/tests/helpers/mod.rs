//! Test Helper Utilities
//!
//! In-memory media source for driving the harvest pipeline without a network.

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tap_harvest::models::SearchResponse;
use tap_harvest::{FetchError, HarvestError, HarvestResult, MediaSource, SearchQuery};
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Scripted answer to one search call
pub enum FakeSearch {
    Json(Value),
    TransportError,
    Status(u16),
}

/// Scripted answer to a download of one URL
#[derive(Clone)]
pub enum FakeFile {
    Bytes(Vec<u8>),
    /// Write the bytes, then fail mid-stream
    Truncated(Vec<u8>),
    Status(u16),
}

/// Media source that replays scripted responses and counts downloads
#[derive(Default)]
pub struct FakeSource {
    searches: Mutex<VecDeque<FakeSearch>>,
    files: Mutex<HashMap<String, FakeFile>>,
    queries: Mutex<Vec<SearchQuery>>,
    downloads: AtomicUsize,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_search(&self, search: FakeSearch) -> &Self {
        self.searches.lock().unwrap().push_back(search);
        self
    }

    pub fn push_pages(&self, pages: Vec<Value>) -> &Self {
        self.push_search(FakeSearch::Json(json!({ "query": { "pages": pages } })))
    }

    pub fn add_file(&self, url: &str, file: FakeFile) -> &Self {
        self.files.lock().unwrap().insert(url.to_string(), file);
        self
    }

    pub fn download_count(&self) -> usize {
        self.downloads.load(Ordering::SeqCst)
    }

    pub fn queries(&self) -> Vec<SearchQuery> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl MediaSource for FakeSource {
    async fn search(&self, query: &SearchQuery) -> HarvestResult<SearchResponse> {
        self.queries.lock().unwrap().push(query.clone());
        let next = self.searches.lock().unwrap().pop_front();

        match next {
            Some(FakeSearch::Json(value)) => serde_json::from_value(value)
                .map_err(|e| HarvestError::MalformedResponse(e.to_string())),
            Some(FakeSearch::TransportError) => {
                Err(HarvestError::Transport("connection reset".to_string()))
            }
            Some(FakeSearch::Status(code)) => Err(HarvestError::HttpStatus(code)),
            None => Ok(SearchResponse::default()),
        }
    }

    async fn download(
        &self,
        url: &str,
        sink: &mut (dyn AsyncWrite + Send + Unpin),
    ) -> Result<u64, FetchError> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        let file = self.files.lock().unwrap().get(url).cloned();

        match file {
            Some(FakeFile::Bytes(bytes)) => {
                sink.write_all(&bytes).await?;
                Ok(bytes.len() as u64)
            }
            Some(FakeFile::Truncated(bytes)) => {
                sink.write_all(&bytes).await?;
                Err(FetchError::Network("stream interrupted".to_string()))
            }
            Some(FakeFile::Status(code)) => Err(FetchError::HttpStatus(code)),
            None => Err(FetchError::HttpStatus(404)),
        }
    }
}

pub const UPLOAD_BASE: &str = "https://upload.wikimedia.org/wikipedia/commons/a/ab";

pub fn upload_url(filename: &str) -> String {
    format!("{}/{}", UPLOAD_BASE, filename)
}

/// Page JSON with an image URL, an extended-metadata date and optional coordinates
pub fn page(filename: &str, date: &str, coords: Option<(f64, f64)>) -> Value {
    let mut page = json!({
        "title": format!("File:{}", filename),
        "imageinfo": [ {
            "url": upload_url(filename),
            "extmetadata": {
                "DateTimeOriginal": { "value": date },
                "Artist": { "value": "J. Doe" },
                "ImageDescription": { "value": format!("Photo {}", filename) }
            },
            "metadata": []
        } ]
    });
    if let Some((lat, lon)) = coords {
        page["coordinates"] = json!([ { "lat": lat, "lon": lon } ]);
    }
    page
}
