//! tap-harvest library interface
//!
//! Harvests geotagged, dated photographs from Wikimedia Commons into a local
//! folder and a JSON manifest for map/timeline visualization.

pub mod error;
pub mod models;
pub mod services;

pub use crate::error::{FetchError, HarvestError, HarvestResult, Rejection};
pub use crate::services::{HarvestOrchestrator, MediaSource, SearchQuery};
