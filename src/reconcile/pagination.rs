//! Pagination page enumeration
//!
//! Listing pages (`/<section>/?page=N`) are what lead wget to older nodes, so
//! every page is fetched explicitly. Pages are assumed contiguous from 0.

use crate::config::ReconcileConfig;
use crate::error_chain;
use crate::reconcile::dispatch::PageFetcher;
use crate::reconcile::prober::{is_live, Prober};
use crate::site::{Section, Site};
use std::time::Duration;

/// Result of a pagination download pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaginationReport {
    /// Highest live page index, `None` when page 0 is absent
    pub max_page: Option<u32>,

    /// Pages fetched successfully
    pub downloaded: usize,

    /// Page indices whose fetch failed
    pub failed: Vec<u32>,
}

/// Finds the highest live listing page for a section
///
/// Probes page 0 first; if it is absent there is no pagination. Then probes
/// the ascending `bounds` until one fails to bracket the answer, and
/// binary-searches the bracket. The returned index always probed live.
pub async fn find_max_page(
    prober: &dyn Prober,
    site: &Site,
    section: &Section,
    bounds: &[u32],
    timeout: Duration,
) -> Option<u32> {
    if !is_live(prober, &site.page_url(section, 0), timeout).await {
        return None;
    }

    let mut low = 0u32;
    let mut high = bounds.last().copied().unwrap_or(0);

    for &bound in bounds {
        if is_live(prober, &site.page_url(section, bound), timeout).await {
            low = bound;
        } else {
            high = bound;
            break;
        }
    }

    tracing::info!("Binary searching for max page between {} and {}...", low, high);

    while low < high {
        // Upper midpoint so that `low = mid` always makes progress
        let mid = low + (high - low + 1) / 2;
        if is_live(prober, &site.page_url(section, mid), timeout).await {
            low = mid;
        } else {
            high = mid - 1;
        }
    }

    Some(low)
}

/// Discovers and fetches every pagination page of a section
///
/// Fetch failures are logged and counted; they never stop the pass.
pub async fn download_pagination_pages(
    prober: &dyn Prober,
    fetcher: &dyn PageFetcher,
    site: &Site,
    section: &Section,
    config: &ReconcileConfig,
) -> PaginationReport {
    tracing::info!("Finding all pagination pages for /{}/...", section.name());

    let timeout = Duration::from_secs(config.pagination_timeout_secs);
    let Some(max_page) =
        find_max_page(prober, site, section, &config.pagination_bounds, timeout).await
    else {
        tracing::info!(
            "No pagination found for /{}/, skipping pagination download",
            section.name()
        );
        return PaginationReport::default();
    };

    let mut report = PaginationReport {
        max_page: Some(max_page),
        ..PaginationReport::default()
    };

    if max_page == 0 {
        tracing::info!("Only page 0 exists for /{}/, no pagination needed", section.name());
        return report;
    }

    tracing::info!(
        "Found {} pagination pages (0 to {}) for /{}/, downloading...",
        max_page + 1,
        max_page,
        section.name()
    );

    for page in 0..=max_page {
        let url = site.page_url(section, page);
        match fetcher.fetch_page(&url).await {
            Ok(()) => {
                report.downloaded += 1;
                if page % 50 == 0 || page == max_page {
                    tracing::info!(
                        "Downloaded pagination page {}/{} for /{}/ ({} total)",
                        page,
                        max_page,
                        section.name(),
                        report.downloaded
                    );
                }
            }
            Err(e) => {
                tracing::warn!("Failed to download pagination page {}: {}", url, error_chain(&e));
                report.failed.push(page);
            }
        }
    }

    tracing::info!(
        "Completed downloading {} pagination pages for /{}/",
        report.downloaded,
        section.name()
    );

    report
}
