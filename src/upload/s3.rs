//! S3-backed object store

use super::{CredentialFailure, ObjectStore, StorageClass};
use crate::UploadError;
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use std::path::Path;

/// Object store talking to S3 with the default credential chain
pub struct S3Store {
    client: Client,
}

impl S3Store {
    /// Loads region and credentials from the environment and AWS config files
    pub async fn from_env() -> Self {
        let config = aws_config::load_defaults(BehaviorVersion::latest()).await;
        Self {
            client: Client::new(&config),
        }
    }
}

fn classify_sdk_error<E, R>(err: &SdkError<E, R>) -> CredentialFailure
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    if let SdkError::ServiceError(service) = err {
        if let Some(code) = service.err().code() {
            return CredentialFailure::Service(code.to_string());
        }
    }

    let detail = DisplayErrorContext(err).to_string();
    if detail.to_lowercase().contains("credentials") {
        CredentialFailure::NoCredentials
    } else {
        CredentialFailure::Other(detail)
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn check_access(&self) -> Result<(), CredentialFailure> {
        self.client
            .list_buckets()
            .send()
            .await
            .map(|_| ())
            .map_err(|e| classify_sdk_error(&e))
    }

    async fn put_file(
        &self,
        bucket: &str,
        key: &str,
        path: &Path,
        storage_class: StorageClass,
    ) -> Result<(), UploadError> {
        let body = ByteStream::from_path(path)
            .await
            .map_err(|e| UploadError::Read {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(body)
            .storage_class(aws_sdk_s3::types::StorageClass::from(storage_class.as_str()))
            .send()
            .await
            .map_err(|e| UploadError::Put {
                key: key.to_string(),
                message: DisplayErrorContext(&e).to_string(),
            })?;

        Ok(())
    }
}
