//! Error types for tap-harvest
//!
//! Three layers, from widest to narrowest blast radius:
//! - [`HarvestError`]: a whole query failed (transport, bad status, malformed body).
//!   The multi-location driver degrades that location to zero records.
//! - [`FetchError`]: one image download failed.
//! - [`Rejection`]: one candidate page was dropped. Never propagates.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Query-level failure
#[derive(Debug, Error)]
pub enum HarvestError {
    /// Search request could not be sent or the body could not be read
    #[error("Transport error: {0}")]
    Transport(String),

    /// Media source answered with a non-success status
    #[error("Media source returned status {0}")]
    HttpStatus(u16),

    /// Body is not the expected JSON shape
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// tap-common error
    #[error("Common error: {0}")]
    Common(#[from] tap_common::Error),
}

/// Result type for query-level operations
pub type HarvestResult<T> = Result<T, HarvestError>;

/// Single download failure
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Download returned status {0}")]
    HttpStatus(u16),

    #[error("Write failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Why a candidate page did not become an `ImageRecord`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Rejection {
    /// Page carries no `imageinfo[0]`
    NoImageInfo,
    /// No per-page coordinates and no query centre to fall back on
    NoCoordinates,
    /// No leading 4-digit year in either date source
    NoYear,
    /// Year outside the requested inclusive range
    OutOfRange,
    /// `imageinfo[0].url` absent or empty
    NoUrl,
    /// URL present but yields no usable final path segment
    InvalidUrl,
    /// Filename already accepted earlier in this run
    Duplicate,
    /// Download failed; nothing left at the final path
    FetchFailed,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::NoImageInfo => "no image info",
            Self::NoCoordinates => "no coordinates",
            Self::NoYear => "no capture year",
            Self::OutOfRange => "year out of range",
            Self::NoUrl => "no image url",
            Self::InvalidUrl => "unusable image url",
            Self::Duplicate => "duplicate filename",
            Self::FetchFailed => "download failed",
        };
        f.write_str(text)
    }
}
