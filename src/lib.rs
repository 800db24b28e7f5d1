//! site-backup: a personal website-archival pipeline
//!
//! This crate mirrors a website to local disk with wget, optionally patches
//! gaps in CMS node sequences by probing and fetching individual pages, and
//! uploads the mirrored tree to S3.

pub mod config;
pub mod logging;
pub mod mirror;
pub mod reconcile;
pub mod run;
pub mod site;
pub mod upload;

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for site-backup operations
#[derive(Debug, Error)]
pub enum BackupError {
    #[error("Configuration error")]
    Config(#[from] ConfigError),

    #[error("Invalid URL")]
    Url(#[from] UrlError),

    #[error("Mirror failed")]
    Mirror(#[from] MirrorError),

    #[error("Upload failed")]
    Upload(#[from] UploadError),

    #[error("Failed to prepare download directory {path}")]
    DownloadDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Logging setup failed: {0}")]
    Logging(String),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL")]
    Parse(#[from] ::url::ParseError),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,
}

/// Errors from a single probe or listing fetch
///
/// Callers decide what these mean; the reconciler treats all of them as
/// "does not exist".
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Connection failed for {url}")]
    Connect { url: String },

    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("HTTP error for {url}")]
    Http { url: String, source: reqwest::Error },
}

/// Errors from invoking the mirroring tool
#[derive(Debug, Error)]
pub enum MirrorError {
    #[error("Failed to launch {program}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("{program} failed for {url} ({}){}", describe_exit(*code), stderr_suffix(stderr))]
    Failed {
        program: String,
        url: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("Merge of {from} into {into} failed")]
    Merge {
        from: PathBuf,
        into: PathBuf,
        source: std::io::Error,
    },
}

/// Errors from the object-storage upload phase
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Credential check failed: {0}")]
    Credentials(String),

    #[error("Directory not found: {0}")]
    MissingDirectory(PathBuf),

    #[error("Failed to read {path}: {message}")]
    Read { path: PathBuf, message: String },

    #[error("Upload of {key} failed: {message}")]
    Put { key: String, message: String },

    #[error("Failed to walk {path}: {message}")]
    Walk { path: PathBuf, message: String },
}

/// Errors from sending a notification
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Failed to launch {program}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("{program} exited with {}", describe_exit(*code))]
    Failed { program: String, code: Option<i32> },
}

fn describe_exit(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "terminated by signal".to_string(),
    }
}

fn stderr_suffix(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(": {}", trimmed)
    }
}

/// Messages of an error and of every error in its source chain, outermost
/// first
pub fn error_messages(error: &(dyn std::error::Error + 'static)) -> Vec<String> {
    let mut messages = vec![error.to_string()];
    let mut source = error.source();
    while let Some(cause) = source {
        messages.push(cause.to_string());
        source = cause.source();
    }
    messages
}

/// An error and its sources on one line, joined with `": "`
pub fn error_chain(error: &(dyn std::error::Error + 'static)) -> String {
    error_messages(error).join(": ")
}


// Re-export commonly used types
pub use config::Config;
pub use reconcile::{find_missing_nodes, Reconciler, ReconcileReport};
pub use site::{Section, Site};
