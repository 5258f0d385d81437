//! Wikimedia Commons media source client
//!
//! Two search modes, both returning the same page shape:
//! - geosearch: `File:` pages within a radius of a coordinate
//! - categorymembers: `File:` pages in a category
//!
//! All outbound requests (searches and image bytes) go through one token-bucket
//! limiter so the client stays within the API's usage norms on its own.

use crate::error::{FetchError, HarvestError, HarvestResult};
use crate::models::SearchResponse;
use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use reqwest::Client;
use std::num::NonZeroU32;
use std::time::Duration;
use tap_common::config::TomlConfig;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;

/// Geosearch radius ceiling enforced by the API (metres)
const MAX_RADIUS_M: u32 = 10_000;

/// Namespace of `File:` pages
const FILE_NAMESPACE: &str = "6";

/// What to search for
#[derive(Debug, Clone, PartialEq)]
pub enum SearchQuery {
    Geo {
        lat: f64,
        lon: f64,
        radius_km: u32,
        limit: u32,
    },
    Category {
        name: String,
        limit: u32,
    },
}

impl SearchQuery {
    /// Coordinate the query was issued against, if any
    pub fn center(&self) -> Option<(f64, f64)> {
        match self {
            Self::Geo { lat, lon, .. } => Some((*lat, *lon)),
            Self::Category { .. } => None,
        }
    }

    /// Action API parameters for this query
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("action", "query".to_string())];

        match self {
            Self::Geo {
                lat,
                lon,
                radius_km,
                limit,
            } => {
                let radius_m = radius_km.saturating_mul(1000).min(MAX_RADIUS_M);
                params.push(("generator", "geosearch".to_string()));
                params.push(("ggscoord", format!("{}|{}", lat, lon)));
                params.push(("ggsradius", radius_m.to_string()));
                params.push(("ggslimit", limit.to_string()));
                params.push(("ggsnamespace", FILE_NAMESPACE.to_string()));
            }
            Self::Category { name, limit } => {
                params.push(("generator", "categorymembers".to_string()));
                params.push(("gcmtitle", format!("Category:{}", name)));
                params.push(("gcmtype", "file".to_string()));
                params.push(("gcmlimit", limit.to_string()));
            }
        }

        params.push(("prop", "imageinfo|coordinates".to_string()));
        params.push(("iiprop", "url|extmetadata|metadata".to_string()));
        params.push(("format", "json".to_string()));
        params.push(("formatversion", "2".to_string()));
        params
    }
}

/// Remote repository of geotagged media
///
/// The harvest core depends only on this seam; tests substitute an in-memory source.
#[async_trait]
pub trait MediaSource: Send + Sync {
    /// Run one search and return the typed response
    async fn search(&self, query: &SearchQuery) -> HarvestResult<SearchResponse>;

    /// Stream the resource at `url` into `sink`, returning bytes written
    async fn download(
        &self,
        url: &str,
        sink: &mut (dyn AsyncWrite + Send + Unpin),
    ) -> Result<u64, FetchError>;
}

/// Commons API client
pub struct CommonsClient {
    client: Client,
    endpoint: String,
    request_timeout: Duration,
    idle_timeout: Duration,
    rate_limiter: RateLimiter<
        governor::state::direct::NotKeyed,
        governor::state::InMemoryState,
        governor::clock::DefaultClock,
    >,
}

impl CommonsClient {
    /// Build a client
    ///
    /// `request_timeout` bounds a whole search, and a download up to its
    /// response headers. Download bodies are bounded by `idle_timeout` per
    /// chunk instead, so a large file on a slow link can take as long as it
    /// keeps making progress. `requests_per_second` of 0 is treated as 1.
    pub fn new(
        endpoint: impl Into<String>,
        user_agent: &str,
        request_timeout: Duration,
        idle_timeout: Duration,
        connect_timeout: Duration,
        requests_per_second: u32,
    ) -> HarvestResult<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| HarvestError::Transport(format!("Failed to build HTTP client: {}", e)))?;

        let per_second = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
        let rate_limiter = RateLimiter::direct(Quota::per_second(per_second));

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            request_timeout,
            idle_timeout,
            rate_limiter,
        })
    }

    /// Create client from TOML configuration
    pub fn from_config(config: &TomlConfig) -> HarvestResult<Self> {
        Self::new(
            config.api_endpoint.clone(),
            &config.user_agent,
            Duration::from_secs(config.request_timeout_secs),
            Duration::from_secs(config.download_idle_timeout_secs),
            Duration::from_secs(config.connect_timeout_secs),
            config.requests_per_second,
        )
    }
}

#[async_trait]
impl MediaSource for CommonsClient {
    async fn search(&self, query: &SearchQuery) -> HarvestResult<SearchResponse> {
        self.rate_limiter.until_ready().await;

        tracing::debug!(?query, endpoint = %self.endpoint, "Querying media source");

        let response = self
            .client
            .get(&self.endpoint)
            .query(&query.to_params())
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| HarvestError::Transport(format!("Search request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(HarvestError::HttpStatus(status.as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| HarvestError::Transport(format!("Failed to read search response: {}", e)))?;

        let parsed: SearchResponse = serde_json::from_str(&body)
            .map_err(|e| HarvestError::MalformedResponse(e.to_string()))?;

        if let Some(error) = &parsed.error {
            return Err(HarvestError::MalformedResponse(format!(
                "API error {}: {}",
                error.code, error.info
            )));
        }

        Ok(parsed)
    }

    async fn download(
        &self,
        url: &str,
        sink: &mut (dyn AsyncWrite + Send + Unpin),
    ) -> Result<u64, FetchError> {
        self.rate_limiter.until_ready().await;

        let mut response = timeout(self.request_timeout, self.client.get(url).send())
            .await
            .map_err(|_| {
                FetchError::Network(format!(
                    "no response within {}s",
                    self.request_timeout.as_secs_f32()
                ))
            })?
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus(status.as_u16()));
        }

        let mut written = 0u64;
        loop {
            let chunk = timeout(self.idle_timeout, response.chunk())
                .await
                .map_err(|_| {
                    FetchError::Network(format!(
                        "download stalled for {}s after {} bytes",
                        self.idle_timeout.as_secs_f32(),
                        written
                    ))
                })?
                .map_err(|e| FetchError::Network(e.to_string()))?;

            let Some(chunk) = chunk else { break };
            sink.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        sink.flush().await?;

        Ok(written)
    }
}
