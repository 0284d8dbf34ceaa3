use async_trait::async_trait;
use bytes::Bytes;
use filedrop_core::{Error, FileStore, Result, StoredObject, UploadDescriptor};
use futures::StreamExt;
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::path::Path as StorePath;
use object_store::{ObjectStore, PutPayload};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct S3Settings {
    /// Destination bucket
    pub bucket_name: String,

    /// Endpoint URL for S3-compatible providers
    /// (e.g. "http://localhost:9000" for MinIO)
    pub endpoint_url: String,

    /// Region identifier; S3-compatible providers usually accept anything
    pub region: String,

    pub access_key_id: String,
    pub secret_access_key: String,

    /// Destination folder inside the bucket
    pub folder_name: String,
}

impl Default for S3Settings {
    fn default() -> Self {
        Self {
            bucket_name: String::new(),
            endpoint_url: String::new(),
            region: "us-east-1".to_string(),
            access_key_id: String::new(),
            secret_access_key: String::new(),
            folder_name: String::new(),
        }
    }
}

/// Object storage client for any S3-compatible endpoint.
///
/// Stateless between operations: a store client is built per call,
/// immediately before use. Configuration is validated first so a missing
/// credential never turns into a connection attempt.
pub struct S3FileStore {
    settings: S3Settings,
}

impl S3FileStore {
    pub fn new(settings: S3Settings) -> Self {
        Self { settings }
    }

    /// Required connection fields, checked before any client is built.
    fn validate(&self) -> Result<()> {
        let missing: Vec<&str> = [
            ("endpoint_url", &self.settings.endpoint_url),
            ("access_key_id", &self.settings.access_key_id),
            ("secret_access_key", &self.settings.secret_access_key),
            ("bucket_name", &self.settings.bucket_name),
        ]
        .iter()
        .filter(|(_, value)| value.is_empty())
        .map(|(name, _)| *name)
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::Configuration(format!(
                "incomplete object store configuration, missing: {}",
                missing.join(", ")
            )))
        }
    }

    fn build_store(&self) -> Result<AmazonS3> {
        let allow_http = self.settings.endpoint_url.starts_with("http://");

        AmazonS3Builder::new()
            .with_bucket_name(self.settings.bucket_name.clone())
            .with_region(self.settings.region.clone())
            .with_endpoint(self.settings.endpoint_url.clone())
            .with_allow_http(allow_http)
            .with_access_key_id(self.settings.access_key_id.clone())
            .with_secret_access_key(self.settings.secret_access_key.clone())
            .build()
            .map_err(|e| Error::Connection(format!("invalid object store endpoint: {}", e)))
    }
}

#[async_trait]
impl FileStore for S3FileStore {
    async fn upload(&self, local_path: &Path) -> Result<StoredObject> {
        self.validate()?;

        let descriptor = UploadDescriptor::new(
            local_path,
            self.settings.bucket_name.clone(),
            self.settings.folder_name.clone(),
        );
        let key = descriptor.remote_key();

        let store = self.build_store()?;
        let data = tokio::fs::read(local_path).await?;
        let size = data.len() as u64;

        debug!(
            bucket = %descriptor.bucket,
            key = %key,
            size_bytes = size,
            "uploading file"
        );

        store
            .put(&StorePath::from(key.clone()), PutPayload::from(Bytes::from(data)))
            .await
            .map_err(|e| Error::Connection(format!("upload to {} failed: {}", descriptor.bucket, e)))?;

        info!(
            bucket = %descriptor.bucket,
            key = %key,
            size_bytes = size,
            "upload successful"
        );

        Ok(StoredObject {
            bucket: descriptor.bucket,
            folder: descriptor.folder,
            key,
        })
    }

    async fn check_access(&self) -> Result<()> {
        self.validate()?;

        let store = self.build_store()?;

        // One listing page is enough to prove the endpoint, credentials
        // and bucket all line up.
        let mut listing = store.list(None);
        match listing.next().await {
            Some(Err(e)) => Err(Error::Connection(format!("bucket listing failed: {}", e))),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configured() -> S3Settings {
        S3Settings {
            bucket_name: "data-bucket".to_string(),
            endpoint_url: "http://localhost:9000".to_string(),
            access_key_id: "minio".to_string(),
            secret_access_key: "minio123".to_string(),
            folder_name: "incoming".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn upload_with_missing_bucket_is_a_configuration_error() {
        let mut settings = configured();
        settings.bucket_name.clear();
        let store = S3FileStore::new(settings);

        let err = store.upload(Path::new("report.csv")).await.unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("bucket_name"));
    }

    #[tokio::test]
    async fn every_required_field_is_checked() {
        let clearers: [fn(&mut S3Settings); 4] = [
            |s| s.endpoint_url.clear(),
            |s| s.access_key_id.clear(),
            |s| s.secret_access_key.clear(),
            |s| s.bucket_name.clear(),
        ];
        for clear in clearers {
            let mut settings = configured();
            clear(&mut settings);
            let store = S3FileStore::new(settings);
            let err = store.check_access().await.unwrap_err();
            assert!(err.is_configuration());
        }
    }

    #[test]
    fn valid_settings_pass_validation() {
        assert!(S3FileStore::new(configured()).validate().is_ok());
    }

    #[test]
    fn default_region_is_set() {
        assert_eq!(S3Settings::default().region, "us-east-1");
    }
}
