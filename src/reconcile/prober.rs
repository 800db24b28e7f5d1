//! Page-existence prober
//!
//! This module owns every HTTP request the reconciler makes:
//! - HEAD requests that decide whether a node or listing page exists
//! - GET requests that pull listing pages for link scraping
//!
//! Client errors never escape as panics or broad catch-alls. Each call
//! returns a `Result` and the caller decides whether a failure means
//! "absent" or "warn and carry on".

use crate::ProbeError;
use async_trait::async_trait;
use reqwest::{redirect::Policy, Client, StatusCode};
use std::time::Duration;

/// Outcome of a probe that reached the server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The page answered 200 after redirects
    Live,

    /// The page answered with any other status
    Absent { status: u16 },
}

impl ProbeOutcome {
    pub fn is_live(&self) -> bool {
        matches!(self, Self::Live)
    }
}

/// Existence checks and listing fetches against the live site
#[async_trait]
pub trait Prober: Send + Sync {
    /// Issues a HEAD request, following redirects
    async fn probe(&self, url: &str, timeout: Duration) -> Result<ProbeOutcome, ProbeError>;

    /// Fetches a page body, failing on any non-success status
    async fn fetch_text(&self, url: &str, timeout: Duration) -> Result<String, ProbeError>;
}

/// Convenience for call sites whose policy is "any failure means absent"
pub async fn is_live(prober: &dyn Prober, url: &str, timeout: Duration) -> bool {
    matches!(prober.probe(url, timeout).await, Ok(ProbeOutcome::Live))
}

/// Builds the HTTP client used for probing
///
/// Redirects are followed (up to 10 hops) so that a moved node counts as
/// live. Timeouts are set per request by the caller.
///
/// # Example
///
/// ```no_run
/// use site_backup::reconcile::build_http_client;
///
/// let client = build_http_client("site-backup/0.1").unwrap();
/// ```
pub fn build_http_client(user_agent: &str) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent)
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// reqwest-backed prober
#[derive(Debug, Clone)]
pub struct HttpProber {
    client: Client,
}

impl HttpProber {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Builds a prober with its own client
    pub fn with_user_agent(user_agent: &str) -> Result<Self, reqwest::Error> {
        Ok(Self::new(build_http_client(user_agent)?))
    }
}

#[async_trait]
impl Prober for HttpProber {
    async fn probe(&self, url: &str, timeout: Duration) -> Result<ProbeOutcome, ProbeError> {
        let response = self
            .client
            .head(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify_error(url, e))?;

        let status = response.status();
        if status == StatusCode::OK {
            Ok(ProbeOutcome::Live)
        } else {
            Ok(ProbeOutcome::Absent {
                status: status.as_u16(),
            })
        }
    }

    async fn fetch_text(&self, url: &str, timeout: Duration) -> Result<String, ProbeError> {
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProbeError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|e| classify_error(url, e))
    }
}

/// Maps a reqwest error onto the probe error taxonomy
fn classify_error(url: &str, error: reqwest::Error) -> ProbeError {
    if error.is_timeout() {
        ProbeError::Timeout {
            url: url.to_string(),
        }
    } else if error.is_connect() {
        ProbeError::Connect {
            url: url.to_string(),
        }
    } else {
        ProbeError::Http {
            url: url.to_string(),
            source: error,
        }
    }
}
