//! Integration tests for node reconciliation
//!
//! These tests run the real reqwest prober against wiremock servers. The
//! mirroring tool is replaced by a fetcher that only records URLs.

use async_trait::async_trait;
use site_backup::config::ReconcileConfig;
use site_backup::reconcile::{
    download_pagination_pages, find_missing_nodes, HttpProber, PageFetcher, Reconciler,
};
use site_backup::{MirrorError, Section, Site};
use std::fs;
use std::sync::Mutex;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Default)]
struct RecordingFetcher {
    urls: Mutex<Vec<String>>,
}

impl RecordingFetcher {
    fn urls(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageFetcher for RecordingFetcher {
    async fn fetch_page(&self, url: &str) -> Result<(), MirrorError> {
        self.urls.lock().unwrap().push(url.to_string());
        Ok(())
    }
}

fn prober() -> HttpProber {
    HttpProber::with_user_agent("site-backup-tests/1.0").expect("client")
}

/// Writes `<id>.html` files where a mirror of the mock server would put them
fn archive(dir: &TempDir, server: &MockServer, section: &str, ids: &[u64]) {
    let host = server.uri().trim_start_matches("http://").to_string();
    let node_dir = dir.path().join(host).join(section).join("node");
    fs::create_dir_all(&node_dir).unwrap();
    for id in ids {
        fs::write(node_dir.join(format!("{}.html", id)), "<html></html>").unwrap();
    }
}

async fn mount_listing(server: &MockServer, route: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_string(body.to_string()))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_missing_nodes_against_live_server() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    archive(&dir, &server, "bitacora", &[1, 2, 5]);

    mount_listing(
        &server,
        "/bitacora/",
        r#"<html><body>
            <a href="/bitacora/node/1">First</a>
            <a href="/bitacora/node/10">Latest</a>
        </body></html>"#,
    )
    .await;

    Mock::given(method("HEAD"))
        .and(path_regex(r"^/bitacora/node/([1-9]|10)$"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let site = Site::new(&server.uri(), dir.path()).unwrap();
    let missing = find_missing_nodes(
        &prober(),
        &site,
        &Section::new("bitacora"),
        &ReconcileConfig::default(),
    )
    .await;

    assert_eq!(missing, vec![3, 4, 6, 7, 8, 9, 10]);
}

#[tokio::test]
async fn test_empty_archive_sends_no_requests() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let site = Site::new(&server.uri(), dir.path()).unwrap();
    let missing = find_missing_nodes(
        &prober(),
        &site,
        &Section::new("bitacora"),
        &ReconcileConfig::default(),
    )
    .await;

    assert!(missing.is_empty());
}

#[tokio::test]
async fn test_redirected_node_counts_as_live() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    archive(&dir, &server, "tortilla", &[1, 2]);

    mount_listing(&server, "/tortilla/", r#"<a href="/tortilla/node/3">x</a>"#).await;

    Mock::given(method("HEAD"))
        .and(path("/tortilla/node/3"))
        .respond_with(ResponseTemplate::new(301).insert_header("Location", "/articles/3"))
        .mount(&server)
        .await;
    Mock::given(path("/articles/3"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let site = Site::new(&server.uri(), dir.path()).unwrap();
    let missing = find_missing_nodes(
        &prober(),
        &site,
        &Section::new("tortilla"),
        &ReconcileConfig::default(),
    )
    .await;

    assert_eq!(missing, vec![3]);
}

#[tokio::test]
async fn test_slow_probe_is_treated_as_absent() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    archive(&dir, &server, "bitacora", &[1]);

    mount_listing(&server, "/bitacora/", r#"<a href="/bitacora/node/3">x</a>"#).await;

    Mock::given(method("HEAD"))
        .and(path_regex(r"^/bitacora/node/[23]$"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/bitacora/node/2"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .with_priority(1)
        .mount(&server)
        .await;

    let config = ReconcileConfig {
        probe_timeout_secs: 1,
        ..ReconcileConfig::default()
    };
    let site = Site::new(&server.uri(), dir.path()).unwrap();
    let missing =
        find_missing_nodes(&prober(), &site, &Section::new("bitacora"), &config).await;

    assert_eq!(missing, vec![3]);
}

#[tokio::test]
async fn test_pagination_pages_fetched_once_each() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    for page in 0..=5 {
        Mock::given(method("HEAD"))
            .and(path("/bitacora/"))
            .and(query_param("page", page.to_string()))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
    }

    let site = Site::new(&server.uri(), dir.path()).unwrap();
    let fetcher = RecordingFetcher::default();
    let report = download_pagination_pages(
        &prober(),
        &fetcher,
        &site,
        &Section::new("bitacora"),
        &ReconcileConfig::default(),
    )
    .await;

    assert_eq!(report.max_page, Some(5));
    let expected: Vec<String> = (0..=5)
        .map(|page| format!("{}/bitacora/?page={}", server.uri(), page))
        .collect();
    assert_eq!(fetcher.urls(), expected);
}

#[tokio::test]
async fn test_reconciler_end_to_end() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    archive(&dir, &server, "bitacora", &[1, 3]);

    mount_listing(&server, "/bitacora/", r#"<a href="/bitacora/node/4">x</a>"#).await;

    Mock::given(method("HEAD"))
        .and(path_regex(r"^/bitacora/node/[1-4]$"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let config = ReconcileConfig {
        enabled: true,
        sections: vec!["bitacora".to_string()],
        ..ReconcileConfig::default()
    };
    let site = Site::new(&server.uri(), dir.path()).unwrap();
    let prober = prober();
    let fetcher = RecordingFetcher::default();

    let report = Reconciler::new(&prober, &fetcher, &site, &config).run().await;

    assert!(report.structure_found);
    assert_eq!(report.sections[0].pagination.max_page, None);
    assert_eq!(report.sections[0].missing, vec![2, 4]);
    assert_eq!(report.sections[0].dispatch.downloaded, 2);
    assert!(report.issues.is_empty());
    assert_eq!(
        fetcher.urls(),
        vec![
            format!("{}/bitacora/node/2", server.uri()),
            format!("{}/bitacora/node/4", server.uri()),
        ]
    );
}
