use crate::core::Storage;
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::parse_s3_uri;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::error::ProvideErrorMetadata;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use std::env;
use std::fmt;

pub const DEFAULT_REGION: &str = "eu-north-1";

/// `s3://bucket/key`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3Target {
    pub bucket: String,
    pub key: String,
}

impl S3Target {
    pub fn parse(uri: &str) -> Result<Self> {
        let (bucket, key) = parse_s3_uri("s3_target", uri)?;
        Ok(Self { bucket, key })
    }
}

impl fmt::Display for S3Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s3://{}/{}", self.bucket, self.key)
    }
}

#[derive(Debug, Clone)]
pub struct S3Storage {
    client: S3Client,
    bucket: String,
    expected_owner: Option<String>,
}

impl S3Storage {
    pub fn new(client: S3Client, bucket: String) -> Self {
        Self {
            client,
            bucket,
            expected_owner: env::var("AWS_ACCOUNT_ID").ok(),
        }
    }

    /// Loads credentials from the default AWS chain.
    pub async fn connect(bucket: &str, region: &str) -> Self {
        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .load()
            .await;
        Self::new(S3Client::new(&config), bucket.to_string())
    }
}

fn s3_error<E: ProvideErrorMetadata + fmt::Display>(action: &str, key: &str, err: E) -> EtlError {
    EtlError::storage(format!(
        "Failed to {} s3 object {} ({}): {}",
        action,
        key,
        err.code().unwrap_or("unknown"),
        err
    ))
}

impl Storage for S3Storage {
    async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let resp = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(path)
            .set_expected_bucket_owner(self.expected_owner.clone())
            .send()
            .await
            .map_err(|e| s3_error("read", path, e.into_service_error()))?;

        let data = resp
            .body
            .collect()
            .await
            .map_err(|e| EtlError::storage(format!("Failed to collect S3 data: {}", e)))?;

        Ok(data.into_bytes().to_vec())
    }

    async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(path)
            .set_expected_bucket_owner(self.expected_owner.clone())
            .body(ByteStream::from(data.to_vec()))
            .send()
            .await
            .map_err(|e| s3_error("write", path, e.into_service_error()))?;

        tracing::debug!("Uploaded {} bytes to s3://{}/{}", data.len(), self.bucket, path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_parse() {
        let target = S3Target::parse("s3://sos-databricks-bucket/etl/result.csv").unwrap();
        assert_eq!(target.bucket, "sos-databricks-bucket");
        assert_eq!(target.key, "etl/result.csv");
        assert_eq!(target.to_string(), "s3://sos-databricks-bucket/etl/result.csv");
    }

    #[test]
    fn test_target_rejects_bad_buckets() {
        assert!(S3Target::parse("s3://Bad_Bucket/key").is_err());
        assert!(S3Target::parse("s3://bucket-only").is_err());
        assert!(S3Target::parse("https://bucket/key").is_err());
    }
}
