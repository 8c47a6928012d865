//! Report persistence to object storage.

use crate::report::SessionReport;
use anyhow::Result;
use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use tracing::info;

/// Defines the contract for anything that can persist a finished report.
///
/// This abstraction keeps the session flow independent of the storage
/// backend, and gives tests a seam to observe that exactly one upload
/// happens per completed session.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReportStore: Send + Sync {
    /// Writes the report under the given object key. The call either
    /// succeeds or returns the underlying SDK error; nothing is retried.
    async fn put_report(&self, key: &str, report: &SessionReport) -> Result<()>;
}

/// A `ReportStore` backed by an S3 bucket.
pub struct S3ReportStore {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3ReportStore {
    pub fn new(client: aws_sdk_s3::Client, bucket: String) -> Self {
        Self { client, bucket }
    }
}

#[async_trait]
impl ReportStore for S3ReportStore {
    async fn put_report(&self, key: &str, report: &SessionReport) -> Result<()> {
        let body = serde_json::to_vec_pretty(report)?;
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(body))
            .content_type("application/json")
            .send()
            .await?;
        info!(bucket = %self.bucket, %key, "Feedback report uploaded");
        Ok(())
    }
}
