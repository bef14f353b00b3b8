//! S3 implementation of [`ReportStore`].
//!
//! Each location gets its own client built from explicit static credentials, so
//! the source and target buckets may live in different accounts.

use std::fmt;
use std::path::Path;

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::config::Credentials;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use chrono::{DateTime, Utc};
use linked_reports_core::contract::{ReportStore, StoreError, StoredObject};
use tokio::io::AsyncWriteExt;
use tracing::{debug, trace};

/// Connection settings for one bucket.
#[derive(Clone, PartialEq, Eq)]
pub struct S3Settings {
    pub bucket_name: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub region: Option<String>,
    /// Custom endpoint for S3-compatible stores; enables path-style addressing.
    pub endpoint_url: Option<String>,
}

impl fmt::Debug for S3Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3Settings")
            .field("bucket_name", &self.bucket_name)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("region", &self.region)
            .field("endpoint_url", &self.endpoint_url)
            .finish()
    }
}

/// A bucket addressed through its own S3 client.
pub struct S3ReportStore {
    client: Client,
    bucket: String,
}

impl S3ReportStore {
    pub async fn connect(settings: S3Settings) -> Self {
        let credentials = Credentials::new(
            &settings.access_key_id,
            &settings.secret_access_key,
            None,
            None,
            "linked-reports",
        );
        let mut loader = aws_config::defaults(BehaviorVersion::latest()).credentials_provider(credentials);
        if let Some(region) = &settings.region {
            loader = loader.region(Region::new(region.clone()));
        }
        if let Some(endpoint) = &settings.endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }
        let sdk_config = loader.load().await;

        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(settings.endpoint_url.is_some())
            .build();

        debug!(bucket = %settings.bucket_name, region = ?settings.region, endpoint_url = ?settings.endpoint_url, "Connected S3 report store");
        Self {
            client: Client::from_conf(s3_config),
            bucket: settings.bucket_name,
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

#[async_trait]
impl ReportStore for S3ReportStore {
    async fn list_objects(&self, prefix: &str) -> Result<Vec<StoredObject>, StoreError> {
        let mut objects = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let mut req = self.client.list_objects_v2().bucket(&self.bucket).prefix(prefix);
            if let Some(token) = &continuation_token {
                req = req.continuation_token(token);
            }
            let resp = req
                .send()
                .await
                .map_err(|e| format!("listing s3://{}/{prefix} failed: {e}", self.bucket))?;

            for obj in resp.contents() {
                let Some(key) = obj.key() else { continue };
                let last_modified = obj
                    .last_modified()
                    .and_then(|t| DateTime::<Utc>::from_timestamp(t.secs(), t.subsec_nanos()))
                    .unwrap_or_default();
                objects.push(StoredObject::new(key, last_modified));
            }

            continuation_token = match resp.next_continuation_token() {
                Some(token) if resp.is_truncated() == Some(true) => Some(token.to_string()),
                _ => break,
            };
            trace!(bucket = %self.bucket, prefix, listed = objects.len(), "Fetching next listing page");
        }

        debug!(bucket = %self.bucket, prefix, listed = objects.len(), "Listed objects");
        Ok(objects)
    }

    async fn download(&self, key: &str, dest: &Path) -> Result<(), StoreError> {
        let resp = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| format!("downloading s3://{}/{key} failed: {e}", self.bucket))?;

        let mut body = resp.body;
        let mut file = tokio::fs::File::create(dest).await?;
        let mut written = 0usize;
        while let Some(chunk) = body
            .try_next()
            .await
            .map_err(|e| format!("reading body of s3://{}/{key} failed: {e}", self.bucket))?
        {
            file.write_all(&chunk).await?;
            written += chunk.len();
        }
        file.flush().await?;

        debug!(bucket = %self.bucket, key, bytes = written, "Downloaded object");
        Ok(())
    }

    async fn upload(&self, src: &Path, key: &str) -> Result<(), StoreError> {
        let body = ByteStream::from_path(src).await?;
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(body)
            .content_type("application/zip")
            .send()
            .await
            .map_err(|e| format!("uploading s3://{}/{key} failed: {e}", self.bucket))?;

        debug!(bucket = %self.bucket, key, "Uploaded object");
        Ok(())
    }
}
