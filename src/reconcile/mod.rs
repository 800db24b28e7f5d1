//! Node-gap reconciliation
//!
//! After a full mirror, some numbered nodes are usually missing: listing
//! pages under-report old content and wget gives up on a few pages. This
//! module closes those gaps:
//! - Scan the local mirror for archived node identifiers
//! - Estimate the live maximum from listing pages and forward probes
//! - Probe candidate identifiers that are not archived
//! - Fetch pagination pages and missing nodes one URL at a time
//!
//! Everything runs sequentially. No failure here aborts a backup; problems
//! are collected as non-critical issues in the [`ReconcileReport`].

mod discover;
mod dispatch;
mod gaps;
mod pagination;
mod prober;
mod scanner;

#[cfg(test)]
pub(crate) mod testing;

pub use discover::{discover_live_max, extend_forward, extract_node_ids, scrape_live_nodes};
pub use dispatch::{download_missing_nodes, DispatchReport, PageFetcher};
pub use gaps::{gap_intervals, Candidates, GapInterval};
pub use pagination::{download_pagination_pages, find_max_page, PaginationReport};
pub use prober::{build_http_client, is_live, HttpProber, ProbeOutcome, Prober};
pub use scanner::{parse_node_file_name, scan_archived_nodes};

use crate::config::ReconcileConfig;
use crate::site::{Section, Site};
use std::time::Duration;

/// Finds nodes that are live on the site but absent from the local mirror
///
/// Returns an ascending, duplicate-free list. An empty archive or an
/// undiscoverable live range yields an empty list; with an empty archive no
/// request is made at all.
///
/// # Example
///
/// ```no_run
/// use site_backup::config::ReconcileConfig;
/// use site_backup::reconcile::{find_missing_nodes, HttpProber};
/// use site_backup::{Section, Site};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let prober = HttpProber::with_user_agent("site-backup/0.1")?;
/// let site = Site::new("https://www.example.com/", "curr-download")?;
/// let missing = find_missing_nodes(
///     &prober,
///     &site,
///     &Section::new("bitacora"),
///     &ReconcileConfig::default(),
/// )
/// .await;
/// println!("{} nodes to fetch", missing.len());
/// # Ok(())
/// # }
/// ```
pub async fn find_missing_nodes(
    prober: &dyn Prober,
    site: &Site,
    section: &Section,
    config: &ReconcileConfig,
) -> Vec<u64> {
    let archived = scan_archived_nodes(site, section);
    let Some(&max_archived) = archived.last() else {
        tracing::info!("Skipping missing-node check for {}", section);
        return Vec::new();
    };
    tracing::info!("Highest node in backup for {}: {}", section, max_archived);

    let Some(live_max) = discover_live_max(prober, site, section, config).await else {
        return Vec::new();
    };

    let timeout = Duration::from_secs(config.probe_timeout_secs);
    let candidates = Candidates::select(&archived, live_max, config.exhaustive_threshold);
    let total = candidates.total();
    let mut missing = Vec::new();

    match candidates {
        Candidates::Exhaustive(ids) => {
            tracing::info!(
                "Checking {} unarchived nodes of 1..={} in {} individually...",
                total,
                live_max,
                section
            );
            for id in ids {
                if is_live(prober, &site.node_url(section, id), timeout).await {
                    missing.push(id);
                    if missing.len() % 100 == 0 {
                        tracing::info!("Found {} missing nodes so far...", missing.len());
                    }
                }
            }
        }
        Candidates::GapRestricted(gaps) => {
            tracing::info!(
                "Found {} gap regions totaling ~{} nodes to check in {}",
                gaps.len(),
                total,
                section
            );

            let mut checked = 0u64;
            for gap in gaps {
                tracing::info!("Checking gap {} ({} nodes)...", gap, gap.len());
                for id in gap.ids() {
                    if is_live(prober, &site.node_url(section, id), timeout).await {
                        missing.push(id);
                    }
                    checked += 1;
                    if checked % 500 == 0 {
                        tracing::info!(
                            "Checked {}/{} nodes, found {} missing so far...",
                            checked,
                            total,
                            missing.len()
                        );
                    }
                }
            }
        }
    }

    missing.sort_unstable();
    missing.dedup();
    missing
}

/// Per-section outcome of a reconciliation pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionReport {
    pub section: String,
    pub pagination: PaginationReport,
    pub missing: Vec<u64>,
    pub dispatch: DispatchReport,
}

/// Outcome of a full reconciliation pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// False when no configured section exposed a node structure
    pub structure_found: bool,

    pub sections: Vec<SectionReport>,

    /// Human-readable problems worth surfacing in the run notification
    pub issues: Vec<String>,
}

/// Drives reconciliation across every configured section
///
/// Holds only borrowed, immutable inputs; running it twice issues the same
/// requests.
pub struct Reconciler<'a> {
    prober: &'a dyn Prober,
    fetcher: &'a dyn PageFetcher,
    site: &'a Site,
    config: &'a ReconcileConfig,
}

impl<'a> Reconciler<'a> {
    pub fn new(
        prober: &'a dyn Prober,
        fetcher: &'a dyn PageFetcher,
        site: &'a Site,
        config: &'a ReconcileConfig,
    ) -> Self {
        Self {
            prober,
            fetcher,
            site,
            config,
        }
    }

    fn sections(&self) -> impl Iterator<Item = Section> + '_ {
        self.config.sections.iter().map(Section::new)
    }

    /// Checks that at least one section serves `/<section>/node/1`
    pub async fn verify_node_structure(&self) -> Option<Section> {
        let timeout = Duration::from_secs(self.config.pagination_timeout_secs);

        for section in self.sections() {
            if is_live(self.prober, &self.site.node_url(&section, 1), timeout).await {
                tracing::info!("Found node structure at {}", section);
                return Some(section);
            }
        }

        None
    }

    /// Reconciles one section: pagination, then missing nodes
    pub async fn reconcile_section(&self, section: &Section) -> SectionReport {
        tracing::info!("Processing node path: {}", section);

        let pagination =
            download_pagination_pages(self.prober, self.fetcher, self.site, section, self.config)
                .await;

        tracing::info!("Checking for missing nodes in {}...", section);
        let missing = find_missing_nodes(self.prober, self.site, section, self.config).await;

        let dispatch = if missing.is_empty() {
            tracing::info!("No missing nodes found in {}", section);
            DispatchReport::default()
        } else {
            tracing::info!(
                "Found {} missing nodes in {}, sample: {:?}{}",
                missing.len(),
                section,
                &missing[..missing.len().min(20)],
                if missing.len() > 20 { "..." } else { "" }
            );
            let report = download_missing_nodes(
                self.fetcher,
                self.site,
                section,
                &missing,
                self.config.batch_size,
            )
            .await;
            tracing::info!("Missing nodes download completed for {}", section);
            report
        };

        SectionReport {
            section: section.name().to_string(),
            pagination,
            missing,
            dispatch,
        }
    }

    /// Runs the whole pass; never fails, problems land in `issues`
    pub async fn run(&self) -> ReconcileReport {
        let mut report = ReconcileReport::default();

        if self.verify_node_structure().await.is_none() {
            tracing::warn!(
                "Node detection enabled but no known node structures found. Skipping node detection."
            );
            report
                .issues
                .push("Node detection skipped: no known node structure found".to_string());
            return report;
        }
        report.structure_found = true;

        for section in self.sections() {
            let section_report = self.reconcile_section(&section).await;

            if !section_report.pagination.failed.is_empty() {
                report.issues.push(format!(
                    "{} pagination pages failed to download for /{}/",
                    section_report.pagination.failed.len(),
                    section.name()
                ));
            }
            if !section_report.dispatch.failed.is_empty() {
                report.issues.push(format!(
                    "{} missing nodes failed to download for {}",
                    section_report.dispatch.failed.len(),
                    section
                ));
            }

            report.sections.push(section_report);
        }

        report
    }
}
