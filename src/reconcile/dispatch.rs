//! Fetch dispatch for missing nodes
//!
//! Missing nodes are fetched one at a time with the mirroring tool. Batches
//! only group progress messages; they do not change ordering or add
//! concurrency.

use crate::site::{Section, Site};
use crate::{error_chain, MirrorError};
use async_trait::async_trait;

/// Fetches a single URL into the local mirror
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch_page(&self, url: &str) -> Result<(), MirrorError>;
}

/// Result of a missing-node download pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Nodes fetched successfully
    pub downloaded: usize,

    /// Nodes whose fetch failed
    pub failed: Vec<u64>,
}

/// Fetches every missing node of a section, strictly in order
///
/// Each failure is logged with the tool's stderr and recorded; the remaining
/// nodes are still attempted.
pub async fn download_missing_nodes(
    fetcher: &dyn PageFetcher,
    site: &Site,
    section: &Section,
    missing: &[u64],
    batch_size: usize,
) -> DispatchReport {
    let mut report = DispatchReport::default();
    if missing.is_empty() {
        return report;
    }

    let batch_size = batch_size.max(1);
    let batch_count = missing.len().div_ceil(batch_size);
    tracing::info!("Downloading {} missing nodes from {}...", missing.len(), section);

    for (batch_index, batch) in missing.chunks(batch_size).enumerate() {
        tracing::info!(
            "Downloading batch {}/{} ({} nodes) from {}...",
            batch_index + 1,
            batch_count,
            batch.len(),
            section
        );

        for (offset, &id) in batch.iter().enumerate() {
            match fetcher.fetch_page(&site.node_url(section, id)).await {
                Ok(()) => {
                    report.downloaded += 1;
                    if id % 100 == 0 || offset + 1 == batch.len() {
                        tracing::info!(
                            "Downloaded node {} from {} ({}/{})",
                            id,
                            section,
                            batch_index * batch_size + offset + 1,
                            missing.len()
                        );
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        "Failed to download node {} from {}: {}",
                        id,
                        section,
                        error_chain(&e)
                    );
                    report.failed.push(id);
                }
            }
        }
    }

    report
}
