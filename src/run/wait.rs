//! Completion poller
//!
//! Waits for a backup run (started separately) to leave its completion
//! marker, consuming the marker when it appears. A pipeline runs this
//! between the backup and the upload step.

use crate::run::marker::marker_path;
use crate::BackupError;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

/// A directory modified more recently than this is taken as a finished run
/// whose marker went missing
const RECENT_MODIFICATION: Duration = Duration::from_secs(3600);

const STATUS_EVERY_SECS: u64 = 30;

/// Poller inputs
#[derive(Debug, Clone)]
pub struct WaitOptions {
    pub download_dir: PathBuf,

    /// Site name, used only in log lines
    pub name: String,

    pub timeout_secs: u64,
    pub check_interval_secs: u64,
}

impl WaitOptions {
    pub fn new(download_dir: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            download_dir: download_dir.into(),
            name: name.into(),
            timeout_secs: 600,
            check_interval_secs: 5,
        }
    }
}

/// How the wait ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The marker appeared and was removed
    MarkerFound,

    /// No marker, but the directory changed `age_secs` ago
    RecentlyModified { age_secs: u64 },

    /// No marker and no recent activity
    TimedOut,
}

impl WaitOutcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::TimedOut)
    }

    /// Process exit code for this outcome
    pub fn exit_code(&self) -> u8 {
        if self.is_success() {
            0
        } else {
            1
        }
    }
}

fn consume_marker(marker: &Path, name: &str) -> WaitOutcome {
    tracing::info!("Completion marker found for {}", name);
    if let Err(e) = std::fs::remove_file(marker) {
        tracing::warn!("Could not remove {}: {}", marker.display(), e);
    }
    WaitOutcome::MarkerFound
}

fn directory_age(dir: &Path) -> Option<Duration> {
    let modified = std::fs::metadata(dir).and_then(|m| m.modified()).ok()?;
    Some(
        SystemTime::now()
            .duration_since(modified)
            .unwrap_or(Duration::ZERO),
    )
}

/// Polls for the completion marker until it appears or the timeout passes
///
/// Fails only when the download directory does not exist.
pub async fn wait_for_completion(options: &WaitOptions) -> Result<WaitOutcome, BackupError> {
    let dir = &options.download_dir;
    if !dir.is_dir() {
        return Err(BackupError::DownloadDir {
            path: dir.clone(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "directory does not exist"),
        });
    }

    let name = &options.name;
    tracing::info!("Waiting for completion marker for {}...", name);

    let marker = marker_path(dir);
    if marker.exists() {
        return Ok(consume_marker(&marker, name));
    }

    let interval = options.check_interval_secs.max(1);
    let mut elapsed = 0u64;
    let mut last_status = 0u64;

    while !marker.exists() && elapsed < options.timeout_secs {
        tokio::time::sleep(Duration::from_secs(interval)).await;
        elapsed += interval;

        if elapsed - last_status >= STATUS_EVERY_SECS {
            tracing::info!(
                "Still waiting for {} completion marker... ({}s elapsed)",
                name,
                elapsed
            );
            last_status = elapsed;
        }
    }

    if marker.exists() {
        return Ok(consume_marker(&marker, name));
    }

    if let Some(age) = directory_age(dir) {
        if age < RECENT_MODIFICATION {
            tracing::warn!(
                "Completion marker not found for {} after {}s, but directory was recently modified ({}s ago). Proceeding anyway.",
                name,
                options.timeout_secs,
                age.as_secs()
            );
            return Ok(WaitOutcome::RecentlyModified {
                age_secs: age.as_secs(),
            });
        }
    }

    tracing::error!(
        "Completion marker not found for {} after {}s and directory was not recently modified",
        name,
        options.timeout_secs
    );
    Ok(WaitOutcome::TimedOut)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::TempDir;

    fn options(dir: &TempDir) -> WaitOptions {
        WaitOptions {
            timeout_secs: 1,
            check_interval_secs: 1,
            ..WaitOptions::new(dir.path(), "example")
        }
    }

    fn age_directory(dir: &Path, secs: u64) {
        let then = SystemTime::now() - Duration::from_secs(secs);
        File::open(dir).unwrap().set_modified(then).unwrap();
    }

    #[tokio::test]
    async fn test_existing_marker_is_consumed() {
        let dir = TempDir::new().unwrap();
        File::create(marker_path(dir.path())).unwrap();

        let outcome = wait_for_completion(&options(&dir)).await.unwrap();

        assert_eq!(outcome, WaitOutcome::MarkerFound);
        assert_eq!(outcome.exit_code(), 0);
        assert!(!marker_path(dir.path()).exists());
    }

    #[tokio::test]
    async fn test_marker_appearing_later() {
        let dir = TempDir::new().unwrap();
        let marker = marker_path(dir.path());
        let opts = WaitOptions {
            timeout_secs: 10,
            ..options(&dir)
        };

        let writer = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(300)).await;
            File::create(marker).unwrap();
        });

        let outcome = wait_for_completion(&opts).await.unwrap();
        writer.await.unwrap();

        assert_eq!(outcome, WaitOutcome::MarkerFound);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_stale_directory_fails() {
        let dir = TempDir::new().unwrap();
        age_directory(dir.path(), 2 * 3600);

        let outcome = wait_for_completion(&options(&dir)).await.unwrap();

        assert_eq!(outcome, WaitOutcome::TimedOut);
        assert_eq!(outcome.exit_code(), 1);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_recent_directory_proceeds() {
        let dir = TempDir::new().unwrap();
        age_directory(dir.path(), 100);

        let outcome = wait_for_completion(&options(&dir)).await.unwrap();

        assert!(matches!(outcome, WaitOutcome::RecentlyModified { age_secs } if age_secs >= 100));
        assert_eq!(outcome.exit_code(), 0);
    }

    #[tokio::test]
    async fn test_missing_directory_is_an_error() {
        let dir = TempDir::new().unwrap();
        let opts = WaitOptions::new(dir.path().join("absent"), "example");

        let err = wait_for_completion(&opts).await.unwrap_err();
        assert!(matches!(err, BackupError::DownloadDir { .. }));
    }
}
