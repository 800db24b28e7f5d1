//! Completion marker
//!
//! The backup run and the completion poller are separate processes; the only
//! signal between them is an empty `.backup_complete` file at the download
//! root.

use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};

/// File name of the marker inside the download root
pub const MARKER_FILE: &str = ".backup_complete";

/// Marker path for a download root
pub fn marker_path(download_dir: &Path) -> PathBuf {
    download_dir.join(MARKER_FILE)
}

/// Guard that writes the completion marker exactly once
///
/// Call [`CompletionMarker::complete`] at the end of a run. If the guard is
/// dropped first (early return or panic unwinding through the run), the
/// marker is written on drop instead.
#[derive(Debug)]
pub struct CompletionMarker {
    path: PathBuf,
    written: bool,
}

impl CompletionMarker {
    /// Arms a marker for `download_dir`; nothing is written yet
    pub fn new(download_dir: &Path) -> Self {
        Self {
            path: marker_path(download_dir),
            written: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_written(&self) -> bool {
        self.written
    }

    /// Writes the marker; later calls are no-ops
    pub fn complete(&mut self) -> io::Result<()> {
        if self.written {
            return Ok(());
        }

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&self.path)?;

        self.written = true;
        tracing::info!("Created completion marker: {}", self.path.display());
        Ok(())
    }
}

impl Drop for CompletionMarker {
    fn drop(&mut self) {
        if !self.written {
            if let Err(e) = self.complete() {
                tracing::error!(
                    "Failed to create completion marker {}: {}",
                    self.path.display(),
                    e
                );
            }
        }
    }
}
