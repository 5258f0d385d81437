//! Harvest orchestration
//!
//! Single query:
//! - Init: issue the search
//! - NoResults: response has no results container → zero records
//! - PerPage: extract each page, tallying rejections
//! - Done: accumulated records
//!
//! Multi-location driver: runs one geo query per location in isolation. A
//! failed location is logged and recorded, never fatal to the batch, and a
//! fixed pause separates successive queries.
//!
//! Everything runs sequentially: one search or download in flight at a time.

use crate::error::HarvestResult;
use crate::models::{HarvestReport, LocationFailure, NamedLocation};
use crate::services::commons_client::{MediaSource, SearchQuery};
use crate::services::image_fetcher::{FetchOutcome, ImageFetcher};
use crate::services::record_extractor::{ExtractionContext, RecordExtractor, YearRange};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tap_common::manifest;
use tap_common::ImageRecord;
use tracing::{error, info, warn};

/// Query sizing shared by every location in a multi-location run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HarvestParams {
    pub radius_km: u32,
    pub limit: u32,
    pub year_range: YearRange,
}

impl Default for HarvestParams {
    fn default() -> Self {
        Self {
            radius_km: 10,
            limit: 30,
            year_range: YearRange::default(),
        }
    }
}

/// Records accepted by a query (or a batch of queries) and its statistics
#[derive(Debug, Clone, Default)]
pub struct QueryOutcome {
    pub records: Vec<ImageRecord>,
    pub report: HarvestReport,
}

impl QueryOutcome {
    fn merge(&mut self, other: QueryOutcome) {
        self.records.extend(other.records);
        self.report.merge(other.report);
    }
}

/// Drives searches through extraction and fetching
pub struct HarvestOrchestrator {
    source: Arc<dyn MediaSource>,
    extractor: RecordExtractor,
    query_delay: Duration,
}

impl HarvestOrchestrator {
    /// `storage_root` must already exist
    pub fn new(
        source: Arc<dyn MediaSource>,
        storage_root: impl Into<PathBuf>,
        query_delay: Duration,
    ) -> Self {
        let fetcher = ImageFetcher::new(storage_root, Arc::clone(&source));
        Self {
            source,
            extractor: RecordExtractor::new(fetcher),
            query_delay,
        }
    }

    pub fn storage_root(&self) -> &Path {
        self.extractor.fetcher().storage_root()
    }

    /// Run one search and extract every returned page
    ///
    /// The query's own centre (geo mode) takes precedence over `ctx.query_center`.
    /// Transport and response-shape failures are returned; per-page failures
    /// are only tallied.
    pub async fn run_query(
        &mut self,
        query: &SearchQuery,
        ctx: &ExtractionContext,
    ) -> HarvestResult<QueryOutcome> {
        let mut outcome = QueryOutcome::default();
        outcome.report.queries = 1;

        let response = self.source.search(query).await?;

        let Some(results) = response.query else {
            warn!(?query, "Search returned no results container");
            outcome.report.empty_queries = 1;
            return Ok(outcome);
        };

        let ctx = ExtractionContext {
            query_center: query.center().or(ctx.query_center),
            ..ctx.clone()
        };

        for page in &results.pages {
            outcome.report.pages_seen += 1;

            match self.extractor.extract(page, &ctx).await {
                Ok(extracted) => {
                    match extracted.fetch {
                        FetchOutcome::Downloaded { .. } => outcome.report.downloaded += 1,
                        FetchOutcome::AlreadyPresent => outcome.report.already_present += 1,
                    }
                    if extracted.licence_defaulted {
                        tracing::debug!(
                            filename = %extracted.record.filename,
                            "No licence in metadata, credited as CC BY-SA"
                        );
                        outcome.report.licence_defaulted += 1;
                    }
                    outcome.report.accepted += 1;
                    outcome.records.push(extracted.record);
                }
                Err(reason) => {
                    info!(page = %page.label(), %reason, "Skipped");
                    outcome.report.reject(reason);
                }
            }
        }

        Ok(outcome)
    }

    /// Geo query around each location, tagging records with the location name
    pub async fn run_locations(
        &mut self,
        locations: &[NamedLocation],
        params: &HarvestParams,
    ) -> QueryOutcome {
        let mut total = QueryOutcome::default();

        for (index, location) in locations.iter().enumerate() {
            if index > 0 && !self.query_delay.is_zero() {
                tokio::time::sleep(self.query_delay).await;
            }

            info!("Fetching images near {}...", location.name);

            let query = SearchQuery::Geo {
                lat: location.lat,
                lon: location.lon,
                radius_km: params.radius_km,
                limit: params.limit,
            };
            let ctx = ExtractionContext {
                query_center: Some((location.lat, location.lon)),
                year_range: params.year_range,
                city: Some(location.name.clone()),
            };

            match self.run_query(&query, &ctx).await {
                Ok(outcome) => {
                    info!(
                        location = %location.name,
                        "{}",
                        outcome.report.display_string()
                    );
                    total.merge(outcome);
                }
                Err(e) => {
                    error!(location = %location.name, "Query failed: {}", e);
                    total.report.queries += 1;
                    total.report.failed_locations.push(LocationFailure {
                        location: location.name.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        total
    }

    /// Write the manifest, dropping any record whose file is not in storage
    pub fn write_manifest(
        &self,
        records: &mut Vec<ImageRecord>,
        manifest_path: &Path,
    ) -> HarvestResult<()> {
        let dropped = manifest::retain_present(records, self.storage_root());
        if !dropped.is_empty() {
            warn!(count = dropped.len(), "Dropped records with missing files");
        }
        manifest::write_manifest(manifest_path, records)?;
        Ok(())
    }
}
