//! Image manifest model and persistence
//!
//! The manifest is a JSON array of [`ImageRecord`] objects consumed by the
//! map/timeline front end. It is always replaced atomically: serialized to a
//! sibling `.tmp` file, then renamed over the target.

use crate::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// One harvested photograph
///
/// Created only after a successful extract-and-fetch cycle. The only later
/// mutation is the renumbering pass rewriting `filename`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRecord {
    /// Storage key under the output folder
    pub filename: String,
    pub lat: f64,
    pub lng: f64,
    pub year: i32,
    /// `YYYY-MM-DD`, or the bare year when day/month are unknown
    pub date: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub credits: String,
    /// Present only when harvesting by named location
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
}

/// Read a manifest from disk
pub fn read_manifest(path: &Path) -> Result<Vec<ImageRecord>> {
    let content = fs::read_to_string(path)?;
    let records: Vec<ImageRecord> = serde_json::from_str(&content)?;
    Ok(records)
}

/// Serialize `records` to `path`, replacing any previous manifest atomically
pub fn write_manifest(path: &Path, records: &[ImageRecord]) -> Result<()> {
    let json = serde_json::to_string_pretty(records)?;

    let tmp_path = tmp_path_for(path);
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let write_result = (|| -> std::io::Result<()> {
        let mut file = fs::File::create(&tmp_path)?;
        file.write_all(json.as_bytes())?;
        file.write_all(b"\n")?;
        file.sync_all()?;
        fs::rename(&tmp_path, path)
    })();

    if let Err(e) = write_result {
        let _ = fs::remove_file(&tmp_path);
        return Err(e.into());
    }

    info!(records = records.len(), "Manifest written to {}", path.display());
    Ok(())
}

/// Drop records whose file is missing from `storage_root`
///
/// Returns the filenames that were dropped.
pub fn retain_present(records: &mut Vec<ImageRecord>, storage_root: &Path) -> Vec<String> {
    let mut dropped = Vec::new();
    records.retain(|record| {
        let present = storage_root.join(&record.filename).is_file();
        if !present {
            warn!(filename = %record.filename, "File missing from storage, dropping record");
            dropped.push(record.filename.clone());
        }
        present
    });
    dropped
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
