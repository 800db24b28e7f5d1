//! Object-storage upload
//!
//! Ships a mirrored directory tree to an S3 bucket under a folder prefix.
//! The store is reached through the [`ObjectStore`] trait so key planning and
//! failure handling can be tested without network access; [`S3Store`] is the
//! production implementation.

mod s3;

pub use s3::S3Store;

use crate::UploadError;
use async_trait::async_trait;
use serde::Deserialize;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

/// S3 storage class applied to uploaded objects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StorageClass {
    #[default]
    #[value(alias = "STANDARD")]
    Standard,
    #[value(alias = "GLACIER")]
    Glacier,
    #[value(alias = "DEEP_ARCHIVE")]
    DeepArchive,
    #[value(alias = "INTELLIGENT_TIERING")]
    IntelligentTiering,
}

impl StorageClass {
    /// Name as the S3 API spells it
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "STANDARD",
            Self::Glacier => "GLACIER",
            Self::DeepArchive => "DEEP_ARCHIVE",
            Self::IntelligentTiering => "INTELLIGENT_TIERING",
        }
    }
}

impl fmt::Display for StorageClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a credential check failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialFailure {
    /// The service rejected the request with this error code
    Service(String),

    /// No credentials could be resolved locally
    NoCredentials,

    /// Anything else (network, malformed response)
    Other(String),
}

impl CredentialFailure {
    /// Human-readable explanation of the failure
    pub fn message(&self) -> String {
        match self {
            Self::Service(code) => match code.as_str() {
                "SignatureDoesNotMatch" => {
                    "AWS credentials are invalid (wrong access key or secret)".to_string()
                }
                "InvalidAccessKeyId" => "Invalid AWS Access Key ID".to_string(),
                "AccessDenied" => "AWS credentials don't have permission to access S3".to_string(),
                other => format!("AWS API error: {}", other),
            },
            Self::NoCredentials => "No AWS credentials found".to_string(),
            Self::Other(message) => format!("Error testing credentials: {}", message),
        }
    }
}

/// Minimal object-store surface used by the upload phase
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Cheap authenticated call proving the credentials work
    async fn check_access(&self) -> Result<(), CredentialFailure>;

    /// Uploads one local file to `bucket/key`
    async fn put_file(
        &self,
        bucket: &str,
        key: &str,
        path: &Path,
        storage_class: StorageClass,
    ) -> Result<(), UploadError>;
}

/// One file scheduled for upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedUpload {
    pub path: PathBuf,
    pub key: String,
}

fn slash_key(prefix: &str, parts: &[&Path]) -> String {
    let mut key = prefix.trim_end_matches('/').to_string();
    for part in parts {
        for component in part.components() {
            if let Component::Normal(name) = component {
                if !key.is_empty() {
                    key.push('/');
                }
                key.push_str(&name.to_string_lossy());
            }
        }
    }
    key
}

fn files_under(root: &Path) -> Result<Vec<PathBuf>, UploadError> {
    let mut files = Vec::new();

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|e| UploadError::Walk {
            path: root.to_path_buf(),
            message: e.to_string(),
        })?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }

    Ok(files)
}

/// Computes the object key for every file that will be uploaded
///
/// When `local_dir` has subdirectories, each one becomes its own folder under
/// `prefix` and top-level files are not uploaded. Otherwise files are keyed
/// directly under `prefix`. Keys always use `/` separators.
///
/// # Example
///
/// ```no_run
/// use site_backup::upload::plan_uploads;
/// use std::path::Path;
///
/// let plan = plan_uploads(Path::new("curr-download"), "2024-01-01").unwrap();
/// for item in &plan {
///     println!("{} -> {}", item.path.display(), item.key);
/// }
/// ```
pub fn plan_uploads(local_dir: &Path, prefix: &str) -> Result<Vec<PlannedUpload>, UploadError> {
    if !local_dir.is_dir() {
        return Err(UploadError::MissingDirectory(local_dir.to_path_buf()));
    }

    let read_error = |e: std::io::Error| UploadError::Read {
        path: local_dir.to_path_buf(),
        message: e.to_string(),
    };

    let mut subdirs = Vec::new();
    for entry in std::fs::read_dir(local_dir).map_err(read_error)? {
        let entry = entry.map_err(read_error)?;
        if entry.path().is_dir() {
            subdirs.push(entry.path());
        }
    }
    subdirs.sort();

    let mut plan = Vec::new();

    if subdirs.is_empty() {
        for path in files_under(local_dir)? {
            let Ok(relative) = path.strip_prefix(local_dir) else {
                continue;
            };
            let key = slash_key(prefix, &[relative]);
            plan.push(PlannedUpload { path, key });
        }
        return Ok(plan);
    }

    for subdir in subdirs {
        let Some(name) = subdir.file_name().map(Path::new) else {
            continue;
        };
        for path in files_under(&subdir)? {
            let Ok(relative) = path.strip_prefix(&subdir) else {
                continue;
            };
            let key = slash_key(prefix, &[name, relative]);
            plan.push(PlannedUpload { path, key });
        }
    }

    Ok(plan)
}

/// Checks credentials, logging remediation steps when they are unusable
pub async fn verify_credentials(store: &dyn ObjectStore) -> Result<(), UploadError> {
    match store.check_access().await {
        Ok(()) => Ok(()),
        Err(failure) => {
            let message = failure.message();
            tracing::error!("{}", message);
            tracing::info!("To fix this:");
            tracing::info!("1. Run: aws configure");
            tracing::info!("2. Enter your correct AWS Access Key ID and Secret Access Key");
            tracing::info!("3. Make sure your credentials have S3 write permissions");
            Err(UploadError::Credentials(message))
        }
    }
}

/// Uploads `local_dir` to `bucket` under `prefix`, one file at a time
///
/// The first failed file aborts the upload. Returns the number of files
/// uploaded.
pub async fn upload_directory(
    store: &dyn ObjectStore,
    local_dir: &Path,
    bucket: &str,
    prefix: &str,
    storage_class: StorageClass,
) -> Result<usize, UploadError> {
    let plan = plan_uploads(local_dir, prefix)?;

    tracing::info!(
        "Uploading directory {} to s3://{}/{}",
        local_dir.display(),
        bucket,
        prefix
    );
    tracing::info!("Storage class: {}", storage_class);

    for item in &plan {
        if let Err(e) = store.put_file(bucket, &item.key, &item.path, storage_class).await {
            tracing::error!("{}", e);
            return Err(e);
        }
        tracing::info!("Upload Successful: {} (Storage Class: {})", item.key, storage_class);
    }

    tracing::info!("Upload completed! {} files uploaded", plan.len());
    Ok(plan.len())
}
