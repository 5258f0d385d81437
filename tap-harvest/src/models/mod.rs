//! Data models for the harvest pipeline

pub mod commons_page;
pub mod harvest_report;
pub mod locations;

pub use commons_page::{
    EmbeddedMetadataEntry, ExtMetadataField, ImageInfo, MediaPage, PageCoordinate, SearchResponse,
};
pub use harvest_report::{HarvestReport, LocationFailure};
pub use locations::{locations_or_default, world_cities, NamedLocation};
