//! Logging setup
//!
//! Every command logs to stdout. When a log file is configured, each run
//! also writes to its own file, `<stem>_<YYYY-MM-DD_HH-MM-SS><ext>`, next to
//! the configured path, and earlier run files past the retention window are
//! removed. Timestamps use local time.

use crate::BackupError;
use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::fmt::{self, time::FormatTime};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

const RUN_STAMP: &str = "%Y-%m-%d_%H-%M-%S";

/// Local wall-clock timer, `YYYY-MM-DD HH:MM:SS`
struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", Local::now().format("%Y-%m-%d %H:%M:%S"))
    }
}

/// Builds the filter for a verbosity level
pub fn build_filter(verbose: u8, quiet: bool) -> EnvFilter {
    if quiet {
        return EnvFilter::new("error");
    }

    match verbose {
        0 => EnvFilter::new("site_backup=info,warn"),
        1 => EnvFilter::new("site_backup=debug,info"),
        2 => EnvFilter::new("site_backup=trace,debug"),
        _ => EnvFilter::new("trace"),
    }
}

/// Path of this run's log file for a configured base path
///
/// # Example
///
/// ```
/// use chrono::{Local, TimeZone};
/// use site_backup::logging::timestamped_log_path;
/// use std::path::{Path, PathBuf};
///
/// let at = Local.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
/// assert_eq!(
///     timestamped_log_path(Path::new("/var/log/backup.log"), &at),
///     PathBuf::from("/var/log/backup_2024-03-09_07-05-01.log")
/// );
/// ```
pub fn timestamped_log_path<Tz>(base: &Path, at: &DateTime<Tz>) -> PathBuf
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let (stem, ext) = stem_and_ext(base);
    let name = format!("{}_{}{}", stem, at.format(RUN_STAMP), ext);
    base.with_file_name(name)
}

fn stem_and_ext(base: &Path) -> (String, String) {
    let stem = base
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "backup".to_string());
    let ext = base
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    (stem, ext)
}

/// Whether `name` is a per-run file produced by [`timestamped_log_path`]
fn is_run_log(name: &str, stem: &str, ext: &str) -> bool {
    name.strip_prefix(stem)
        .and_then(|rest| rest.strip_prefix('_'))
        .and_then(|rest| rest.strip_suffix(ext))
        .is_some_and(|stamp| NaiveDateTime::parse_from_str(stamp, RUN_STAMP).is_ok())
}

/// Deletes per-run log files for `base` last modified more than `max_age`
/// before `now`
///
/// Only files named like [`timestamped_log_path`] output are considered.
/// Returns the removed paths; files that cannot be inspected or removed are
/// skipped.
pub fn prune_run_logs(base: &Path, max_age: Duration, now: SystemTime) -> Vec<PathBuf> {
    let (stem, ext) = stem_and_ext(base);
    let dir = match base.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };

    let Ok(entries) = std::fs::read_dir(&dir) else {
        return Vec::new();
    };

    let mut removed = Vec::new();
    for entry in entries.flatten() {
        let name = entry.file_name();
        if !is_run_log(&name.to_string_lossy(), &stem, &ext) {
            continue;
        }

        let Ok(modified) = entry.metadata().and_then(|m| m.modified()) else {
            continue;
        };
        let expired = now
            .duration_since(modified)
            .is_ok_and(|age| age > max_age);

        if expired && std::fs::remove_file(entry.path()).is_ok() {
            removed.push(entry.path());
        }
    }

    removed.sort();
    removed
}

/// Installs the global subscriber
///
/// The returned guard flushes the file writer on drop and must be held for
/// the life of the process. `retention_days` of 0 disables pruning.
pub fn init_logging(
    verbose: u8,
    quiet: bool,
    log_file: Option<&Path>,
    retention_days: u64,
) -> Result<Option<WorkerGuard>, BackupError> {
    let console_layer = fmt::Layer::new()
        .with_writer(std::io::stdout)
        .with_timer(LocalTimer)
        .with_target(false);

    let mut pruned = Vec::new();
    let (file_layer, guard, file_path) = match log_file {
        Some(base) => {
            let path = timestamped_log_path(base, &Local::now());
            let dir = match path.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
                _ => PathBuf::from("."),
            };
            std::fs::create_dir_all(&dir).map_err(|e| {
                BackupError::Logging(format!(
                    "cannot create log directory {}: {}",
                    dir.display(),
                    e
                ))
            })?;

            if retention_days > 0 {
                let max_age = Duration::from_secs(retention_days * 24 * 60 * 60);
                pruned = prune_run_logs(base, max_age, SystemTime::now());
            }

            let file_name = path.file_name().ok_or_else(|| {
                BackupError::Logging(format!("invalid log file {}", path.display()))
            })?;
            let (writer, guard) = non_blocking(rolling::never(&dir, file_name));
            let layer = fmt::Layer::new()
                .with_writer(writer)
                .with_timer(LocalTimer)
                .with_target(false)
                .with_ansi(false);

            (Some(layer), Some(guard), Some(path))
        }
        None => (None, None, None),
    };

    Registry::default()
        .with(build_filter(verbose, quiet))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| BackupError::Logging(e.to_string()))?;

    if let Some(path) = file_path {
        tracing::debug!("Logging to {}", path.display());
    }
    for path in &pruned {
        tracing::debug!("Removed expired log file {}", path.display());
    }

    Ok(guard)
}
