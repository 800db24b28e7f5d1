use crate::upload::StorageClass;
use serde::Deserialize;
use std::path::PathBuf;

/// Main configuration structure for site-backup
///
/// Every table is optional; a missing config file yields `Config::default()`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub http: HttpConfig,
    pub mirror: MirrorConfig,
    pub reconcile: ReconcileConfig,
    pub upload: UploadConfig,
    pub notify: NotifyConfig,
    pub logging: LoggingConfig,
}

/// HTTP client configuration for probes and listing scrapes
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// User agent sent with every probe
    #[serde(rename = "user-agent")]
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("site-backup/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Mirroring tool configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct MirrorConfig {
    /// Mirroring program to launch
    pub program: String,

    /// Root directory the mirror is written under
    pub download_dir: PathBuf,

    /// Per-connection timeout passed to the tool (seconds)
    pub timeout_secs: u64,

    /// Wait between retries (seconds)
    pub waitretry_secs: u64,

    /// Tries per file for the full mirror
    pub tries: u32,

    /// Rate limit for the full mirror, in the tool's syntax (e.g. "100k")
    pub limit_rate: String,

    /// Recursion depth for the full mirror
    pub level: u32,

    /// Tries per file for single-page fetches
    pub page_tries: u32,

    /// Rate limit for single-page fetches
    pub page_limit_rate: String,

    /// Fold the bare-domain tree into the `www.` tree after mirroring
    pub merge_domain_variants: bool,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            program: "wget".to_string(),
            download_dir: PathBuf::from("curr-download"),
            timeout_secs: 60,
            waitretry_secs: 30,
            tries: 5,
            limit_rate: "100k".to_string(),
            level: 15,
            page_tries: 3,
            page_limit_rate: "200k".to_string(),
            merge_domain_variants: true,
        }
    }
}

/// Node-gap reconciliation configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ReconcileConfig {
    /// Run reconciliation after the mirror
    pub enabled: bool,

    /// Sections holding sequentially numbered nodes
    pub sections: Vec<String>,

    /// Section whose nodes are also listed on the archive page
    pub archive_listing_section: Option<String>,

    /// Site-relative path of the archive listing page
    pub archive_listing_path: String,

    /// Maximum forward probes past the scraped live maximum
    pub forward_probe_limit: u64,

    /// Candidate ranges above this size only probe gap intervals
    pub exhaustive_threshold: u64,

    /// Missing nodes per progress-logging batch
    pub batch_size: usize,

    /// Ascending page indices tried when seeking the pagination upper bound
    pub pagination_bounds: Vec<u32>,

    /// Timeout for node probes (seconds)
    pub probe_timeout_secs: u64,

    /// Timeout for structure and pagination probes (seconds)
    pub pagination_timeout_secs: u64,

    /// Timeout for listing page GETs (seconds)
    pub listing_timeout_secs: u64,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            sections: vec!["bitacora".to_string(), "tortilla".to_string()],
            archive_listing_section: Some("bitacora".to_string()),
            archive_listing_path: "archivos.html".to_string(),
            forward_probe_limit: 200,
            exhaustive_threshold: 1000,
            batch_size: 50,
            pagination_bounds: vec![10, 100, 500, 1000],
            probe_timeout_secs: 5,
            pagination_timeout_secs: 10,
            listing_timeout_secs: 30,
        }
    }
}

/// Object-storage upload configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct UploadConfig {
    /// Destination bucket
    pub bucket: String,

    /// Storage class applied to every uploaded object
    pub storage_class: StorageClass,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            bucket: "left-website-backups".to_string(),
            storage_class: StorageClass::Standard,
        }
    }
}

/// Notification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct NotifyConfig {
    /// Recipient; notifications are skipped when unset
    pub email: Option<String>,

    /// Mail program invoked as `<program> -s <subject> <email>`
    pub mail_program: String,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            email: None,
            mail_program: "mail".to_string(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct LoggingConfig {
    /// Base log file path; a timestamp is appended to the stem per run
    pub log_file: Option<PathBuf>,

    /// Per-run log files older than this are deleted at startup; 0 keeps all
    pub retention_days: u64,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_file: None,
            retention_days: 30,
        }
    }
}
