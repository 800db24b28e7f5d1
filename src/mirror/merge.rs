//! Domain-variant tree merge
//!
//! With `--span-hosts`, wget writes pages reached through `example.com` and
//! `www.example.com` into two sibling trees. The bare-domain tree is folded
//! into the `www.` tree so the archive has one canonical layout.

use crate::site::Site;
use crate::MirrorError;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Counts from a merge pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub copied: usize,
    pub skipped: usize,
}

fn merge_error(from: &Path, into: &Path, source: io::Error) -> MirrorError {
    MirrorError::Merge {
        from: from.to_path_buf(),
        into: into.to_path_buf(),
        source,
    }
}

/// Copies every file of `secondary` into `main`, then deletes `secondary`
///
/// Files ending in `.orig` (wget's pre-conversion backups) are dropped, and
/// files already present under `main` are kept as they are. A missing
/// `secondary` is logged and yields an empty report.
pub fn merge_trees(main: &Path, secondary: &Path) -> Result<MergeReport, MirrorError> {
    let mut report = MergeReport::default();

    if !secondary.is_dir() {
        tracing::info!("Nothing to merge: {} does not exist", secondary.display());
        return Ok(report);
    }

    tracing::info!("Merging {} into {}...", secondary.display(), main.display());

    for entry in WalkDir::new(secondary) {
        let entry = entry.map_err(|e| merge_error(secondary, main, io::Error::from(e)))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "orig") {
            continue;
        }

        let Ok(relative) = path.strip_prefix(secondary) else {
            continue;
        };
        let target: PathBuf = main.join(relative);

        if target.exists() {
            report.skipped += 1;
            continue;
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| merge_error(secondary, main, e))?;
        }
        fs::copy(path, &target).map_err(|e| merge_error(secondary, main, e))?;
        report.copied += 1;
    }

    fs::remove_dir_all(secondary).map_err(|e| merge_error(secondary, main, e))?;

    tracing::info!(
        "Merge complete: {} files copied, {} already present",
        report.copied,
        report.skipped
    );

    Ok(report)
}

/// Folds the bare-domain mirror of `site` into its `www.` mirror
///
/// Only runs when both trees exist.
pub fn merge_domain_variants(site: &Site) -> Result<Option<MergeReport>, MirrorError> {
    let [bare, www] = site.mirror_roots();

    if !(bare.is_dir() && www.is_dir()) {
        tracing::debug!(
            "Single domain layout under {}, no merge needed",
            site.download_dir().display()
        );
        return Ok(None);
    }

    merge_trees(&www, &bare).map(Some)
}
