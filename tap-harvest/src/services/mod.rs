//! Harvest pipeline components
//!
//! Leaves first: date normalization, the media source client, the dedup-aware
//! fetcher, record extraction, and the orchestrator driving them.

pub mod commons_client;
pub mod date_normalizer;
pub mod harvest_orchestrator;
pub mod image_fetcher;
pub mod record_extractor;

pub use commons_client::{CommonsClient, MediaSource, SearchQuery};
pub use date_normalizer::{normalize, NormalizedDate};
pub use harvest_orchestrator::{HarvestOrchestrator, HarvestParams, QueryOutcome};
pub use image_fetcher::{FetchOutcome, ImageFetcher};
pub use record_extractor::{
    build_credits, filename_from_url, prepare_candidate, raw_capture_date, Candidate, Credits,
    ExtractionContext, Extracted, RecordExtractor, YearRange, DEFAULT_LICENSE,
};
