//! Harvest statistics
//!
//! Display: "N accepted of M pages (D downloaded, P already present), R rejected"

use crate::error::Rejection;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// A location whose query failed as a whole
#[derive(Debug, Clone, Serialize)]
pub struct LocationFailure {
    pub location: String,
    pub error: String,
}

/// Counters for one query or a merged multi-query run
#[derive(Debug, Clone, Serialize)]
pub struct HarvestReport {
    pub started_at: DateTime<Utc>,
    /// Queries issued
    pub queries: usize,
    /// Queries whose response had no results container
    pub empty_queries: usize,
    /// Page records examined
    pub pages_seen: usize,
    /// Records accepted into the manifest
    pub accepted: usize,
    /// Files fetched over the network
    pub downloaded: usize,
    /// Files found already in storage (no network access)
    pub already_present: usize,
    /// Accepted records whose licence label was the `CC BY-SA` fallback
    pub licence_defaulted: usize,
    /// Rejected pages by reason
    pub rejections: BTreeMap<Rejection, usize>,
    pub failed_locations: Vec<LocationFailure>,
}

impl Default for HarvestReport {
    fn default() -> Self {
        Self {
            started_at: Utc::now(),
            queries: 0,
            empty_queries: 0,
            pages_seen: 0,
            accepted: 0,
            downloaded: 0,
            already_present: 0,
            licence_defaulted: 0,
            rejections: BTreeMap::new(),
            failed_locations: Vec::new(),
        }
    }
}

impl HarvestReport {
    pub fn reject(&mut self, reason: Rejection) {
        *self.rejections.entry(reason).or_insert(0) += 1;
    }

    pub fn rejected(&self) -> usize {
        self.rejections.values().sum()
    }

    pub fn rejections_for(&self, reason: Rejection) -> usize {
        self.rejections.get(&reason).copied().unwrap_or(0)
    }

    /// Fold another report's counters into this one
    ///
    /// Keeps the earlier `started_at`.
    pub fn merge(&mut self, other: HarvestReport) {
        self.started_at = self.started_at.min(other.started_at);
        self.queries += other.queries;
        self.empty_queries += other.empty_queries;
        self.pages_seen += other.pages_seen;
        self.accepted += other.accepted;
        self.downloaded += other.downloaded;
        self.already_present += other.already_present;
        self.licence_defaulted += other.licence_defaulted;
        for (reason, count) in other.rejections {
            *self.rejections.entry(reason).or_insert(0) += count;
        }
        self.failed_locations.extend(other.failed_locations);
    }

    pub fn display_string(&self) -> String {
        format!(
            "{} accepted of {} pages ({} downloaded, {} already present), {} rejected",
            self.accepted,
            self.pages_seen,
            self.downloaded,
            self.already_present,
            self.rejected()
        )
    }
}
