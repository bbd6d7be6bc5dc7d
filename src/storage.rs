use crate::{
    config::Config,
    domain::FileStorage,
    errors::StorageError,
};
use anyhow::Context;
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::{
    Client as S3Client,
    error::{DisplayErrorContext, SdkError},
    primitives::ByteStream,
    types::{BucketLocationConstraint, CreateBucketConfiguration},
};
use axum::body::Bytes;
use tracing;

#[derive(Debug, Clone)]
pub struct S3FileStorage {
    client: S3Client,
    bucket_name: String,
    region: String,
    public_base_url: String,
}

impl S3FileStorage {
    /// Builds a path-style S3 client from the region and optional endpoint override in `config`.
    ///
    /// Credentials come from the default provider chain (env vars, profiles, etc.).
    pub async fn connect(config: &Config) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.aws_region.clone()));
        match &config.storage_endpoint {
            Some(endpoint_url) => {
                tracing::info!(%endpoint_url, "Using blob storage endpoint override");
                loader = loader.endpoint_url(endpoint_url);
            }
            None => tracing::info!(region = %config.aws_region, "Using default AWS endpoints"),
        }
        let sdk_config = loader.load().await;

        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(true)
            .build();
        Self::new(S3Client::from_conf(s3_config), config)
    }

    pub fn new(client: S3Client, config: &Config) -> Self {
        let public_base_url = public_base_url(config);
        tracing::info!(bucket = %config.blob_bucket_name, %public_base_url, "Initializing S3FileStorage");
        Self {
            client,
            bucket_name: config.blob_bucket_name.clone(),
            region: config.aws_region.clone(),
            public_base_url,
        }
    }

    /// Creates the bucket unless a HEAD request shows it is already reachable.
    pub async fn ensure_bucket(&self) -> Result<(), StorageError> {
        if self.client.head_bucket().bucket(&self.bucket_name).send().await.is_ok() {
            tracing::info!(bucket = %self.bucket_name, "S3: Bucket already present");
            return Ok(());
        }

        let mut request = self.client.create_bucket().bucket(&self.bucket_name);
        // us-east-1 rejects an explicit location constraint
        if self.region != "us-east-1" {
            request = request.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(BucketLocationConstraint::from(self.region.as_str()))
                    .build(),
            );
        }

        match request.send().await {
            Ok(_) => {
                tracing::info!(bucket = %self.bucket_name, "S3: Bucket created");
                Ok(())
            }
            Err(SdkError::ServiceError(service_err))
                if matches!(
                    service_err.err().meta().code(),
                    Some("BucketAlreadyOwnedByYou" | "BucketAlreadyExists")
                ) =>
            {
                tracing::info!(bucket = %self.bucket_name, "S3: Bucket created concurrently");
                Ok(())
            }
            Err(e) => Err(StorageError::BucketUnavailable(format!(
                "'{}': {}",
                self.bucket_name,
                DisplayErrorContext(&e)
            ))),
        }
    }

    pub fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_base_url, key)
    }
}

/// Resolves the prefix under which uploaded objects are publicly reachable.
fn public_base_url(config: &Config) -> String {
    let base = match (&config.blob_public_base_url, &config.storage_endpoint) {
        (Some(explicit), _) => explicit.clone(),
        // Path-style addressing, matching the client's force_path_style
        (None, Some(endpoint)) => format!("{}/{}", endpoint.trim_end_matches('/'), config.blob_bucket_name),
        (None, None) => format!(
            "https://{}.s3.{}.amazonaws.com",
            config.blob_bucket_name, config.aws_region
        ),
    };
    base.trim_end_matches('/').to_string()
}

#[async_trait]
impl FileStorage for S3FileStorage {
    /// Uploads data to S3 using PutObject and returns its public URL.
    async fn upload(&self, key: &str, data: Bytes, content_type: Option<String>) -> Result<String, StorageError> {
        let content_type = content_type
            .or_else(|| mime_guess::from_path(key).first_raw().map(|s| s.to_string()))
            .unwrap_or_else(|| "application/octet-stream".to_string());
        tracing::debug!(s3_key = %key, bucket = %self.bucket_name, %content_type, size = data.len(), "S3: Uploading file");

        self.client
            .put_object()
            .bucket(&self.bucket_name)
            .key(key)
            .body(ByteStream::from(data))
            .content_type(content_type)
            .send()
            .await
            .context(format!("S3: Failed to upload object with key '{}'", key))
            .map_err(|e| StorageError::UploadFailed(format!("{:#}", e)))?;

        let url = self.public_url(key);
        tracing::debug!(s3_key = %key, bucket = %self.bucket_name, %url, "S3: Upload successful");
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with(public: Option<&str>, endpoint: Option<&str>) -> Config {
        let mut pairs = vec![
            ("DATABASE_URL", "postgres://x/y"),
            ("HUGGING_FACE_API_TOKEN", "hf_test"),
            ("BLOB_BUCKET_NAME", "banita-images"),
            ("AWS_DEFAULT_REGION", "eu-central-1"),
        ];
        if let Some(public) = public {
            pairs.push(("BLOB_PUBLIC_BASE_URL", public));
        }
        if let Some(endpoint) = endpoint {
            pairs.push(("AWS_ENDPOINT_URL", endpoint));
        }
        Config::from_lookup(move |key: &str| {
            pairs.iter().find(|(k, _)| *k == key).map(|(_, v)| v.to_string())
        })
        .unwrap()
    }

    #[test]
    fn explicit_public_base_wins() {
        let config = config_with(Some("https://cdn.example.com/images/"), Some("http://localhost:4566"));
        assert_eq!(public_base_url(&config), "https://cdn.example.com/images");
    }

    #[test]
    fn endpoint_override_uses_path_style() {
        let config = config_with(None, Some("http://localhost:4566/"));
        assert_eq!(public_base_url(&config), "http://localhost:4566/banita-images");
    }

    #[tokio::test]
    async fn connect_against_endpoint_serves_path_style_urls() {
        let config = config_with(None, Some("http://localhost:4566"));
        let storage = S3FileStorage::connect(&config).await;

        assert_eq!(storage.bucket_name, "banita-images");
        assert_eq!(storage.region, "eu-central-1");
        assert_eq!(
            storage.public_url("generated-1.png"),
            "http://localhost:4566/banita-images/generated-1.png"
        );
    }

    #[test]
    fn default_is_virtual_hosted_aws_url() {
        let config = config_with(None, None);
        assert_eq!(
            public_base_url(&config),
            "https://banita-images.s3.eu-central-1.amazonaws.com"
        );
    }
}
