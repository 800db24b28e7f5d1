//! Backup run orchestration
//!
//! A run goes RUNNING → COMPLETE exactly once. The steps are:
//! 1. Create the download directory
//! 2. Mirror the whole site
//! 3. Merge domain-variant trees
//! 4. Reconcile missing nodes, when enabled
//! 5. Write the completion marker
//! 6. Send the outcome notification
//!
//! Steps 1 and 2 are critical: their failure aborts the run. Steps 3 and 4
//! only add non-critical issues to the report. The marker is written even
//! when the run fails or panics.

mod marker;
mod notify;
mod wait;

pub use marker::{marker_path, CompletionMarker, MARKER_FILE};
pub use notify::{
    failure_notification, success_notification, MailNotifier, Notification, Notifier,
};
pub use wait::{wait_for_completion, WaitOptions, WaitOutcome};

use crate::config::Config;
use crate::mirror::{
    merge_domain_variants, mirror_site, ExitClass, MergeReport, MirrorMode, WgetFetcher,
};
use crate::reconcile::{HttpProber, ReconcileReport, Reconciler};
use crate::site::Site;
use crate::{error_chain, BackupError};
use chrono::Local;

/// Per-run inputs that do not come from the config file
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub url: String,
    pub mode: MirrorMode,
}

/// What a successful run did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub mirror: ExitClass,
    pub merge: Option<MergeReport>,
    pub reconcile: Option<ReconcileReport>,

    /// Non-critical problems, listed in the success notification
    pub issues: Vec<String>,
}

/// Runs a complete backup and reports the outcome
///
/// `notifier` is `None` when no recipient is configured.
pub async fn run_backup(
    config: &Config,
    options: &RunOptions,
    notifier: Option<&dyn Notifier>,
) -> Result<RunReport, BackupError> {
    let mut marker = CompletionMarker::new(&config.mirror.download_dir);
    let mut issues = Vec::new();

    tracing::info!("Starting backup of {}", options.url);
    let result = execute(config, options, &mut issues).await;

    match &result {
        Ok(_) => tracing::info!("Backup completed successfully"),
        Err(e) => tracing::error!("Backup failed: {}", error_chain(e)),
    }

    if let Err(e) = marker.complete() {
        tracing::error!(
            "Failed to create completion marker {}: {}",
            marker.path().display(),
            e
        );
    }

    let today = Local::now().date_naive();
    let notification = match &result {
        Ok(report) => success_notification(today, &report.issues),
        Err(e) => failure_notification(today, e, &issues),
    };
    send_notification(notifier, &notification).await;

    result
}

/// Finishes a run that failed before it could start
///
/// Writes the marker and sends the failure notification, so the poller and
/// the recipient both hear about it.
pub async fn report_setup_failure(
    config: &Config,
    error: &(dyn std::error::Error + 'static),
    notifier: Option<&dyn Notifier>,
) {
    let mut marker = CompletionMarker::new(&config.mirror.download_dir);
    if let Err(e) = marker.complete() {
        tracing::error!("Failed to create completion marker: {}", e);
    }

    let notification = failure_notification(Local::now().date_naive(), error, &[]);
    send_notification(notifier, &notification).await;
}

async fn send_notification(notifier: Option<&dyn Notifier>, notification: &Notification) {
    let Some(notifier) = notifier else {
        tracing::debug!("No notification recipient configured");
        return;
    };

    if let Err(e) = notifier.send(notification).await {
        tracing::error!("Failed to send notification: {}", error_chain(&e));
    }
}

async fn execute(
    config: &Config,
    options: &RunOptions,
    issues: &mut Vec<String>,
) -> Result<RunReport, BackupError> {
    let download_dir = &config.mirror.download_dir;
    std::fs::create_dir_all(download_dir).map_err(|source| BackupError::DownloadDir {
        path: download_dir.clone(),
        source,
    })?;

    let site = Site::new(&options.url, download_dir.clone())?;

    tracing::info!("Starting wget download to {}...", download_dir.display());
    if options.mode == MirrorMode::ForceRedownload {
        tracing::info!("Force redownload enabled, existing files will be fetched again");
    }
    let mirror = mirror_site(&config.mirror, &site, &options.url, options.mode).await?;

    let merge = if config.mirror.merge_domain_variants {
        match merge_domain_variants(&site) {
            Ok(report) => report,
            Err(e) => {
                let message = format!("Domain merge failed: {}", error_chain(&e));
                tracing::warn!("{}", message);
                issues.push(message);
                None
            }
        }
    } else {
        None
    };

    let reconcile = if config.reconcile.enabled {
        reconcile_site(config, &site, issues).await
    } else {
        tracing::info!("Node reconciliation disabled");
        None
    };

    Ok(RunReport {
        mirror,
        merge,
        reconcile,
        issues: issues.clone(),
    })
}

async fn reconcile_site(
    config: &Config,
    site: &Site,
    issues: &mut Vec<String>,
) -> Option<ReconcileReport> {
    tracing::info!("Checking for missing nodes...");

    let prober = match HttpProber::with_user_agent(&config.http.user_agent) {
        Ok(prober) => prober,
        Err(e) => {
            let message = format!("Node detection failed: {}", error_chain(&e));
            tracing::warn!("{}", message);
            issues.push(message);
            return None;
        }
    };
    let fetcher = WgetFetcher::new(config.mirror.clone(), site.clone());

    let report = Reconciler::new(&prober, &fetcher, site, &config.reconcile)
        .run()
        .await;
    issues.extend(report.issues.iter().cloned());

    Some(report)
}
