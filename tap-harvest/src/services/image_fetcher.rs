//! Dedup-aware image fetcher
//!
//! `ensure_local` guarantees at most one download per target filename:
//! an existing file short-circuits without touching the network. New files are
//! streamed into a uniquely named `.<uuid>.part` sibling and renamed into place only
//! once complete, so the final name never holds a partial download.
//!
//! No retries. A failed download is reported to the caller and any partial
//! data is removed.

use crate::error::FetchError;
use crate::services::commons_client::MediaSource;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// What `ensure_local` had to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// File was already in storage; no network access happened
    AlreadyPresent,
    /// File was downloaded in this call
    Downloaded { bytes: u64 },
}

/// Fetches remote images into a storage root exactly once
pub struct ImageFetcher {
    storage_root: PathBuf,
    source: Arc<dyn MediaSource>,
}

impl ImageFetcher {
    pub fn new(storage_root: impl Into<PathBuf>, source: Arc<dyn MediaSource>) -> Self {
        Self {
            storage_root: storage_root.into(),
            source,
        }
    }

    pub fn storage_root(&self) -> &Path {
        &self.storage_root
    }

    /// Final path for `filename`
    pub fn target_path(&self, filename: &str) -> PathBuf {
        self.storage_root.join(filename)
    }

    /// Make sure `filename` exists locally, downloading `locator` if needed
    pub async fn ensure_local(
        &self,
        locator: &str,
        filename: &str,
    ) -> Result<FetchOutcome, FetchError> {
        let target = self.target_path(filename);

        if fs::try_exists(&target).await? {
            debug!(filename = %filename, "Already present, skipping download");
            return Ok(FetchOutcome::AlreadyPresent);
        }

        // Fixed-length name: any filename valid on disk must stay downloadable
        let part = self
            .storage_root
            .join(format!(".{}.part", Uuid::new_v4().simple()));

        match self.download_to(locator, &part, &target).await {
            Ok(bytes) => {
                info!(filename = %filename, bytes, "Downloaded");
                Ok(FetchOutcome::Downloaded { bytes })
            }
            Err(e) => {
                if let Err(cleanup) = fs::remove_file(&part).await {
                    if cleanup.kind() != std::io::ErrorKind::NotFound {
                        warn!("Failed to remove partial file {}: {}", part.display(), cleanup);
                    }
                }
                warn!(filename = %filename, "Failed to download: {}", e);
                Err(e)
            }
        }
    }

    async fn download_to(
        &self,
        locator: &str,
        part: &Path,
        target: &Path,
    ) -> Result<u64, FetchError> {
        let mut file = fs::File::create(part).await?;
        let bytes = self.source.download(locator, &mut file).await?;
        file.flush().await?;
        file.sync_all().await?;
        drop(file);

        fs::rename(part, target).await?;
        Ok(bytes)
    }
}
