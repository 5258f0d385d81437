//! Manifest renumbering pass
//!
//! Renames every harvested file to `image<N>.<ext>` (1-based, manifest order,
//! original extension kept) and rewrites `filename` in the manifest.
//!
//! Renames run in two phases, first to `.renumber-<N>.tmp` and then to the
//! final name, so a record whose new name equals another record's current name
//! cannot clobber it.
//!
//! Applying the pass twice is stable only because manifest order is kept:
//! the second run maps `imageN` onto itself.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use tap_common::manifest::{read_manifest, write_manifest};
use tap_common::ImageRecord;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum RenumberError {
    /// Raised under `MissingFilePolicy::Fail` before any file is moved
    #[error("{} source file(s) missing: {}", .0.len(), .0.join(", "))]
    MissingFiles(Vec<String>),

    /// A target name is taken by something outside the manifest
    #[error("target {0} already exists in storage")]
    TargetExists(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Common(#[from] tap_common::Error),
}

/// What to do with a record whose file is not in storage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MissingFilePolicy {
    /// Leave that record's `filename` as is, still naming the absent file
    #[default]
    Keep,
    /// Rewrite `filename` anyway (manifest then names a file that does not exist)
    Rewrite,
    /// Abort the whole pass without touching storage or manifest
    Fail,
}

impl FromStr for MissingFilePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "keep" => Ok(Self::Keep),
            "rewrite" => Ok(Self::Rewrite),
            "fail" => Ok(Self::Fail),
            other => Err(format!(
                "unknown policy '{}', expected keep, rewrite or fail",
                other
            )),
        }
    }
}

impl fmt::Display for MissingFilePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Keep => "keep",
            Self::Rewrite => "rewrite",
            Self::Fail => "fail",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenumberReport {
    /// Files moved to a new name
    pub renamed: usize,
    /// Files already carrying their target name
    pub unchanged: usize,
    /// Manifest filenames with no file in storage
    pub missing: Vec<String>,
    /// Later entries naming a file an earlier entry already claimed; they
    /// follow that entry to its new name
    pub duplicates: Vec<String>,
}

/// `image<index><ext>` with the extension of `old` (including the dot)
pub fn renumbered_name(index: usize, old: &str) -> String {
    let ext = Path::new(old)
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    format!("image{}{}", index, ext)
}

struct Move {
    record: usize,
    from: String,
    to: String,
}

/// Renumber `records` in place and move their files under `storage_root`
///
/// On a failed rename every file is moved back to its original name and
/// `records` is left untouched.
pub fn renumber(
    records: &mut [ImageRecord],
    storage_root: &Path,
    policy: MissingFilePolicy,
) -> Result<RenumberReport, RenumberError> {
    let mut report = RenumberReport::default();
    let mut moves = Vec::new();
    let mut missing_records = Vec::new();
    let mut duplicate_records = Vec::new();
    // current filename -> name it ends up under
    let mut claimed: HashMap<String, String> = HashMap::new();

    for (i, record) in records.iter().enumerate() {
        let new_name = renumbered_name(i + 1, &record.filename);

        if let Some(target) = claimed.get(&record.filename) {
            debug!("{} listed again at position {}", record.filename, i + 1);
            report.duplicates.push(record.filename.clone());
            duplicate_records.push((i, target.clone()));
            continue;
        }

        if !storage_root.join(&record.filename).is_file() {
            warn!("File not found: {}", storage_root.join(&record.filename).display());
            report.missing.push(record.filename.clone());
            missing_records.push(i);
            continue;
        }

        claimed.insert(record.filename.clone(), new_name.clone());

        if record.filename == new_name {
            report.unchanged += 1;
            continue;
        }

        moves.push(Move {
            record: i,
            from: record.filename.clone(),
            to: new_name,
        });
    }

    if policy == MissingFilePolicy::Fail && !report.missing.is_empty() {
        return Err(RenumberError::MissingFiles(report.missing));
    }

    // Names being vacated are fair game; anything else would be clobbered
    let vacated: HashSet<&str> = moves.iter().map(|m| m.from.as_str()).collect();
    for m in &moves {
        let target = storage_root.join(&m.to);
        if !vacated.contains(m.to.as_str()) && fs::symlink_metadata(&target).is_ok() {
            return Err(RenumberError::TargetExists(m.to.clone()));
        }
    }

    apply_moves(&moves, storage_root)?;

    for m in &moves {
        records[m.record].filename = m.to.clone();
    }
    report.renamed = moves.len();

    for (i, target) in duplicate_records {
        records[i].filename = target;
    }

    if policy == MissingFilePolicy::Rewrite {
        for i in missing_records {
            let record = &mut records[i];
            record.filename = renumbered_name(i + 1, &record.filename);
        }
    }

    Ok(report)
}

/// Two-phase rename; rolls every file back to `from` if any step fails
fn apply_moves(moves: &[Move], storage_root: &Path) -> Result<(), RenumberError> {
    // Phase 1: out of the way
    for (done, m) in moves.iter().enumerate() {
        let staging = staging_name(m.record);
        debug!("{} -> {}", m.from, staging);
        if let Err(e) = fs::rename(storage_root.join(&m.from), storage_root.join(&staging)) {
            roll_back(&moves[..done], 0, storage_root);
            return Err(e.into());
        }
    }

    // Phase 2: into place
    for (done, m) in moves.iter().enumerate() {
        if let Err(e) = fs::rename(
            storage_root.join(staging_name(m.record)),
            storage_root.join(&m.to),
        ) {
            warn!("Rename to {} failed, restoring original names: {}", m.to, e);
            roll_back(moves, done, storage_root);
            return Err(e.into());
        }
    }

    Ok(())
}

/// Return staged files to their original names
///
/// The first `placed` moves already reached their final name and go back
/// through staging first. Failures here are only logged; the caller reports the first error.
fn roll_back(moves: &[Move], placed: usize, storage_root: &Path) {
    for m in &moves[..placed] {
        if let Err(e) = fs::rename(
            storage_root.join(&m.to),
            storage_root.join(staging_name(m.record)),
        ) {
            warn!("Could not unstage {}: {}", m.to, e);
        }
    }
    for m in moves {
        if let Err(e) = fs::rename(
            storage_root.join(staging_name(m.record)),
            storage_root.join(&m.from),
        ) {
            warn!("Could not restore {}: {}", m.from, e);
        }
    }
}

/// Read a manifest, renumber it, and write it back in place
pub fn renumber_manifest(
    manifest_path: &Path,
    storage_root: &Path,
    policy: MissingFilePolicy,
) -> Result<RenumberReport, RenumberError> {
    let mut records = read_manifest(manifest_path)?;
    let report = renumber(&mut records, storage_root, policy)?;
    write_manifest(manifest_path, &records)?;

    info!(
        renamed = report.renamed,
        unchanged = report.unchanged,
        missing = report.missing.len(),
        duplicates = report.duplicates.len(),
        "Renumbering complete"
    );
    Ok(report)
}

fn staging_name(record: usize) -> String {
    format!(".renumber-{}.tmp", record + 1)
}
