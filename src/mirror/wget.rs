//! wget invocation
//!
//! Builds the argument lists for the full-site mirror and single-page
//! fetches, runs the program through `tokio::process`, and classifies its
//! exit status. Exit code 8 (server issued an error response for some file)
//! is routine on a real site and is tolerated.

use crate::config::MirrorConfig;
use crate::reconcile::PageFetcher;
use crate::site::Site;
use crate::MirrorError;
use async_trait::async_trait;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use tokio::process::Command;

/// wget's "server issued an error response" exit code
const SERVER_ERROR_EXIT: i32 = 8;

/// How the full mirror treats files that already exist locally
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MirrorMode {
    /// Resume partial files and skip unchanged ones
    #[default]
    Incremental,

    /// Fetch everything again, ignoring timestamps
    ForceRedownload,
}

/// Classification of a wget exit status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitClass {
    Success,
    Tolerated,
    Failed,
}

/// Maps an exit code (`None` for death by signal) to its classification
pub fn classify_exit(code: Option<i32>) -> ExitClass {
    match code {
        Some(0) => ExitClass::Success,
        Some(SERVER_ERROR_EXIT) => ExitClass::Tolerated,
        _ => ExitClass::Failed,
    }
}

fn common_args(timeout_secs: u64, waitretry_secs: u64) -> Vec<String> {
    vec![
        "-e".to_string(),
        "robots=off".to_string(),
        format!("--timeout={}", timeout_secs),
        format!("--waitretry={}", waitretry_secs),
    ]
}

/// Arguments for the recursive full-site mirror
///
/// # Example
///
/// ```
/// use site_backup::config::MirrorConfig;
/// use site_backup::mirror::{mirror_args, MirrorMode};
/// use std::path::Path;
///
/// let args = mirror_args(
///     &MirrorConfig::default(),
///     "https://www.example.com/",
///     Path::new("curr-download"),
///     MirrorMode::Incremental,
/// );
/// assert!(args.contains(&"--timestamping".to_string()));
/// assert_eq!(args.last().map(String::as_str), Some("https://www.example.com/"));
/// ```
pub fn mirror_args(
    config: &MirrorConfig,
    url: &str,
    download_dir: &Path,
    mode: MirrorMode,
) -> Vec<String> {
    let mut args = common_args(config.timeout_secs, config.waitretry_secs);
    args.extend([
        format!("--tries={}", config.tries),
        format!("--limit-rate={}", config.limit_rate),
        "--recursive".to_string(),
        format!("--level={}", config.level),
        "--no-parent".to_string(),
        "--span-hosts".to_string(),
        "--page-requisites".to_string(),
        "--adjust-extension".to_string(),
        "--convert-links".to_string(),
        format!("--directory-prefix={}", download_dir.display()),
        "--cut-dirs=0".to_string(),
    ]);

    match mode {
        MirrorMode::Incremental => args.extend([
            "--continue".to_string(),
            "--show-progress".to_string(),
            "--timestamping".to_string(),
        ]),
        MirrorMode::ForceRedownload => args.extend([
            "--show-progress".to_string(),
            "--no-timestamping".to_string(),
            "--force-directories".to_string(),
        ]),
    }

    args.push("--verbose".to_string());
    args.push(url.to_string());
    args
}

/// Arguments for fetching one page and its requisites
///
/// Host spanning is limited to the bare and `www.` variants of the site.
pub fn page_args(config: &MirrorConfig, site: &Site, url: &str) -> Vec<String> {
    let mut args = common_args(config.timeout_secs, config.waitretry_secs);
    args.extend([
        format!("--tries={}", config.page_tries),
        format!("--limit-rate={}", config.page_limit_rate),
        "--page-requisites".to_string(),
        "--adjust-extension".to_string(),
        "--convert-links".to_string(),
        "--no-parent".to_string(),
        "--span-hosts".to_string(),
        format!("--domains={}", site.host_variants().join(",")),
        format!("--directory-prefix={}", site.download_dir().display()),
        "--cut-dirs=0".to_string(),
        "--continue".to_string(),
        "--quiet".to_string(),
        url.to_string(),
    ]);
    args
}

fn check_status(
    program: &str,
    url: &str,
    status: ExitStatus,
    stderr: String,
) -> Result<ExitClass, MirrorError> {
    match classify_exit(status.code()) {
        ExitClass::Failed => Err(MirrorError::Failed {
            program: program.to_string(),
            url: url.to_string(),
            code: status.code(),
            stderr,
        }),
        class => Ok(class),
    }
}

/// Runs the full-site mirror, streaming the tool's output to the terminal
///
/// Returns how the run ended; only hard failures are errors.
pub async fn mirror_site(
    config: &MirrorConfig,
    site: &Site,
    url: &str,
    mode: MirrorMode,
) -> Result<ExitClass, MirrorError> {
    let args = mirror_args(config, url, site.download_dir(), mode);
    tracing::info!("Running: {} {}", config.program, args.join(" "));

    let status = Command::new(&config.program)
        .args(&args)
        .stdin(Stdio::null())
        .status()
        .await
        .map_err(|source| MirrorError::Spawn {
            program: config.program.clone(),
            source,
        })?;

    let class = check_status(&config.program, url, status, String::new())?;
    match class {
        ExitClass::Tolerated => tracing::warn!(
            "{} completed with some server errors (exit code {}), continuing",
            config.program,
            SERVER_ERROR_EXIT
        ),
        _ => tracing::info!("Full mirror of {} completed", url),
    }

    Ok(class)
}

/// Single-page fetcher backed by wget
///
/// stderr is captured so failures can be reported with the tool's own
/// explanation.
pub struct WgetFetcher {
    config: MirrorConfig,
    site: Site,
}

impl WgetFetcher {
    pub fn new(config: MirrorConfig, site: Site) -> Self {
        Self { config, site }
    }
}

#[async_trait]
impl PageFetcher for WgetFetcher {
    async fn fetch_page(&self, url: &str) -> Result<(), MirrorError> {
        let args = page_args(&self.config, &self.site, url);

        let output = Command::new(&self.config.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|source| MirrorError::Spawn {
                program: self.config.program.clone(),
                source,
            })?;

        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        if check_status(&self.config.program, url, output.status, stderr)?
            == ExitClass::Tolerated
        {
            tracing::debug!("{} reported server errors for {}", self.config.program, url);
        }

        Ok(())
    }
}
