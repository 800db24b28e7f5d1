//! In-memory stand-ins for the prober and fetcher used by unit tests

use crate::reconcile::dispatch::PageFetcher;
use crate::reconcile::prober::{ProbeOutcome, Prober};
use crate::{MirrorError, ProbeError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

type UrlPredicate = Box<dyn Fn(&str) -> bool + Send + Sync>;

/// Prober whose HEAD answers come from a predicate and whose GET answers
/// come from a fixed page map
pub(crate) struct FakeProber {
    live: UrlPredicate,
    pages: HashMap<String, String>,
    probes: Mutex<Vec<String>>,
    fetches: Mutex<Vec<String>>,
}

impl FakeProber {
    pub fn new(live: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        Self {
            live: Box::new(live),
            pages: HashMap::new(),
            probes: Mutex::new(Vec::new()),
            fetches: Mutex::new(Vec::new()),
        }
    }

    pub fn with_page(mut self, url: &str, html: &str) -> Self {
        self.pages.insert(url.to_string(), html.to_string());
        self
    }

    pub fn probe_count(&self) -> usize {
        self.probes.lock().unwrap().len()
    }

    pub fn probed_urls(&self) -> Vec<String> {
        self.probes.lock().unwrap().clone()
    }

    pub fn fetched_urls(&self) -> Vec<String> {
        self.fetches.lock().unwrap().clone()
    }
}

#[async_trait]
impl Prober for FakeProber {
    async fn probe(&self, url: &str, _timeout: Duration) -> Result<ProbeOutcome, ProbeError> {
        self.probes.lock().unwrap().push(url.to_string());
        if (self.live)(url) {
            Ok(ProbeOutcome::Live)
        } else {
            Ok(ProbeOutcome::Absent { status: 404 })
        }
    }

    async fn fetch_text(&self, url: &str, _timeout: Duration) -> Result<String, ProbeError> {
        self.fetches.lock().unwrap().push(url.to_string());
        self.pages.get(url).cloned().ok_or_else(|| ProbeError::Status {
            url: url.to_string(),
            status: 404,
        })
    }
}

/// Fetcher that records every URL and fails the ones a predicate selects
pub(crate) struct RecordingFetcher {
    fails: UrlPredicate,
    urls: Mutex<Vec<String>>,
}

impl RecordingFetcher {
    pub fn new() -> Self {
        Self::failing(|_| false)
    }

    pub fn failing(fails: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        Self {
            fails: Box::new(fails),
            urls: Mutex::new(Vec::new()),
        }
    }

    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageFetcher for RecordingFetcher {
    async fn fetch_page(&self, url: &str) -> Result<(), MirrorError> {
        self.urls.lock().unwrap().push(url.to_string());
        if (self.fails)(url) {
            Err(MirrorError::Failed {
                program: "wget".to_string(),
                url: url.to_string(),
                code: Some(4),
                stderr: "Network failure.".to_string(),
            })
        } else {
            Ok(())
        }
    }
}
