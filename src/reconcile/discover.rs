//! Live node-range discovery
//!
//! Estimates the highest node identifier on the live site:
//! - Scrapes the section index (and, for one section, the archive listing)
//!   for mentions of `/<section>/node/<id>` anywhere in the page
//! - Probes forward from the scraped maximum, since listings lag behind the
//!   newest content

use crate::config::ReconcileConfig;
use crate::reconcile::prober::{is_live, Prober};
use crate::error_chain;
use crate::site::{Section, Site};
use regex::Regex;
use std::collections::BTreeSet;
use std::time::Duration;

/// Extracts node identifiers for a section from listing-page HTML
///
/// The whole body is searched for `/<section>/node/<digits>`, so links,
/// form option values and script text all count.
///
/// # Example
///
/// ```
/// use site_backup::reconcile::extract_node_ids;
/// use site_backup::Section;
///
/// let html = r#"<a href="/bitacora/node/1">1</a><a href="https://x.org/bitacora/node/10">10</a>"#;
/// let ids = extract_node_ids(html, &Section::new("bitacora"));
/// assert_eq!(ids.into_iter().collect::<Vec<_>>(), vec![1, 10]);
/// ```
pub fn extract_node_ids(html: &str, section: &Section) -> BTreeSet<u64> {
    let pattern = match Regex::new(&format!(r"/{}/node/(\d+)", regex::escape(section.name()))) {
        Ok(pattern) => pattern,
        Err(e) => {
            tracing::warn!("Cannot build node pattern for {}: {}", section, e);
            return BTreeSet::new();
        }
    };

    pattern
        .captures_iter(html)
        .filter_map(|caps| caps[1].parse::<u64>().ok())
        .collect()
}

/// Scrapes listing pages for the node identifiers they mention
///
/// A failed fetch is logged as a warning and contributes nothing.
pub async fn scrape_live_nodes(
    prober: &dyn Prober,
    site: &Site,
    section: &Section,
    config: &ReconcileConfig,
) -> BTreeSet<u64> {
    let timeout = Duration::from_secs(config.listing_timeout_secs);
    let mut live_nodes = BTreeSet::new();

    let index_url = site.section_index_url(section);
    match prober.fetch_text(&index_url, timeout).await {
        Ok(html) => live_nodes.extend(extract_node_ids(&html, section)),
        Err(e) => tracing::warn!(
            "Failed to check {} homepage: {}",
            section.name(),
            error_chain(&e)
        ),
    }

    if config.archive_listing_section.as_deref() == Some(section.name()) {
        let archive_url = site.path_url(&config.archive_listing_path);
        match prober.fetch_text(&archive_url, timeout).await {
            Ok(html) => live_nodes.extend(extract_node_ids(&html, section)),
            Err(e) => tracing::warn!(
                "Failed to check archive listing {}: {}",
                archive_url,
                error_chain(&e)
            ),
        }
    }

    live_nodes
}

/// Walks forward from `start`, returning the furthest identifier that probed
/// live before the first failure or the probe limit
///
/// `start` itself is the first probe. If nothing probes live, `start` is
/// returned unchanged.
pub async fn extend_forward(
    prober: &dyn Prober,
    site: &Site,
    section: &Section,
    start: u64,
    limit: u64,
    timeout: Duration,
) -> u64 {
    let mut furthest = start;

    for candidate in start..start.saturating_add(limit) {
        if is_live(prober, &site.node_url(section, candidate), timeout).await {
            furthest = candidate;
        } else {
            break;
        }
    }

    furthest
}

/// Estimates the highest live node identifier for a section
///
/// Returns `None` when no listing page mentions any node.
pub async fn discover_live_max(
    prober: &dyn Prober,
    site: &Site,
    section: &Section,
    config: &ReconcileConfig,
) -> Option<u64> {
    let live_nodes = scrape_live_nodes(prober, site, section, config).await;

    let Some(&scraped_max) = live_nodes.last() else {
        tracing::warn!("No node links found on live site for {}", section);
        return None;
    };

    tracing::info!("Highest node found on live site for {}: {}", section, scraped_max);

    let actual_max = extend_forward(
        prober,
        site,
        section,
        scraped_max,
        config.forward_probe_limit,
        Duration::from_secs(config.probe_timeout_secs),
    )
    .await;

    tracing::info!("Actual highest node on site for {}: {}", section, actual_max);

    Some(scraped_max.max(actual_max))
}
