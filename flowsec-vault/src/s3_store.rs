//! S3-backed object store.
//!
//! Works against AWS S3 or any S3-compatible endpoint (MinIO in testing).

use crate::config::S3Config;
use crate::error::{VaultError, VaultResult};
use crate::object_store::ObjectStore;
use crate::types::StorageHandle;
use async_trait::async_trait;
use aws_sdk_s3::Client as S3Client;
use aws_sdk_s3::primitives::ByteStream;
use tracing::debug;
use uuid::Uuid;

pub struct S3ObjectStore {
    client: S3Client,
    bucket: String,
    prefix: String,
}

impl S3ObjectStore {
    pub fn new(config: &S3Config) -> Self {
        let credentials = aws_credential_types::Credentials::new(
            &config.access_key_id,
            &config.secret_access_key,
            None,
            None,
            "flowsec-static",
        );

        let mut builder = aws_sdk_s3::Config::builder()
            .region(aws_types::region::Region::new(config.region.clone()))
            .credentials_provider(credentials)
            .behavior_version_latest();

        if let Some(ref endpoint) = config.endpoint_override {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        Self {
            client: S3Client::from_conf(builder.build()),
            bucket: config.bucket.clone(),
            prefix: config.prefix.trim_end_matches('/').to_string(),
        }
    }

    fn object_key(&self) -> String {
        if self.prefix.is_empty() {
            format!("objects/{}", Uuid::new_v4())
        } else {
            format!("{}/objects/{}", self.prefix, Uuid::new_v4())
        }
    }

    /// Checks whether a blob exists (HEAD request).
    pub async fn exists(&self, handle: &StorageHandle) -> VaultResult<bool> {
        let key = handle.as_str();
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) => {
                let service_err = e.into_service_error();
                if service_err.is_not_found() {
                    Ok(false)
                } else {
                    Err(VaultError::Storage(format!(
                        "head object failed for {key}: {service_err}"
                    )))
                }
            }
        }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn store(&self, bytes: Vec<u8>) -> VaultResult<StorageHandle> {
        let key = self.object_key();
        let size = bytes.len();

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| VaultError::Storage(format!("upload failed for {key}: {e}")))?;

        debug!("uploaded {size} bytes to s3://{}/{key}", self.bucket);
        Ok(StorageHandle(key))
    }

    async fn fetch(&self, handle: &StorageHandle) -> VaultResult<Vec<u8>> {
        let key = handle.as_str();

        let resp = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                let service_err = e.into_service_error();
                if service_err.is_no_such_key() {
                    VaultError::NotFound(format!("blob {key}"))
                } else {
                    VaultError::Storage(format!("download failed for {key}: {service_err}"))
                }
            })?;

        let body = resp
            .body
            .collect()
            .await
            .map_err(|e| VaultError::Storage(format!("failed to read body for {key}: {e}")))?;

        let bytes = body.into_bytes().to_vec();
        debug!("downloaded {} bytes from s3://{}/{key}", bytes.len(), self.bucket);
        Ok(bytes)
    }
}
