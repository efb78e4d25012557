use super::{fetch, transfer_error};
use crate::domain::model::{ArtifactDestination, DownloadLocation, TransferSize};
use crate::domain::ports::StorageSink;
use crate::utils::error::{BackupError, Result, ResultExt};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart};
use aws_sdk_s3::Client as S3Client;
use reqwest::Client;
use std::time::Duration;

pub const S3_BUCKET_ENV: &str = "S3_BUCKET";
/// Bucket variable of the Cloud Storage deployment, read when `S3_BUCKET` is unset.
pub const GS_BUCKET_ENV: &str = "GS_BUCKET_NAME";
pub const S3_REGION_ENV: &str = "S3_REGION";
pub const S3_ENDPOINT_ENV: &str = "S3_ENDPOINT";
pub const S3_PREFIX_ENV: &str = "S3_PREFIX";

/// Upper bound for one upload session.
pub const SESSION_CEILING: Duration = Duration::from_secs(4 * 60 * 60);

/// Size of the first parts. S3 requires at least 5 MiB for every part but the last.
pub const FIRST_PART_SIZE: usize = 8 * 1024 * 1024;

/// Part size doubles after this many parts.
const PARTS_PER_SIZE_STEP: i32 = 1000;

/// S3 limits for one multipart upload.
const MAX_PARTS: i32 = 10_000;
const MAX_PART_SIZE: u64 = 5 * 1024 * 1024 * 1024;

/// Size of part `number` (1-based), for an upload whose first part is `first`.
///
/// With 8 MiB first parts the sequence covers roughly 8 TB in 10 000 parts,
/// past the 5 TB object limit.
pub fn part_size(first: usize, number: i32) -> usize {
    let step = ((number.max(1) - 1) / PARTS_PER_SIZE_STEP) as u32;
    let size = (first as u64)
        .saturating_mul(1u64 << step.min(32))
        .min(MAX_PART_SIZE);
    usize::try_from(size).unwrap_or(usize::MAX)
}

fn check_part_number(number: i32) -> Result<i32> {
    if number > MAX_PARTS {
        return Err(BackupError::TransferError {
            message: format!("artifact needs more than {} upload parts", MAX_PARTS),
        });
    }
    Ok(number)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3Settings {
    pub bucket: String,
    pub region: Option<String>,
    pub endpoint: Option<String>,
    pub prefix: Option<String>,
}

impl S3Settings {
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bucket = non_empty(S3_BUCKET_ENV)
            .or_else(|| non_empty(GS_BUCKET_ENV))
            .ok_or_else(|| BackupError::ClientInitError {
                message: "bucket is not specified (S3_BUCKET or GS_BUCKET_NAME)".to_string(),
            })?;

        Ok(Self {
            bucket,
            region: non_empty(S3_REGION_ENV),
            endpoint: non_empty(S3_ENDPOINT_ENV),
            prefix: non_empty(S3_PREFIX_ENV).map(|p| p.trim_matches('/').to_string()),
        })
    }

    pub fn object_key(&self, destination: &ArtifactDestination) -> String {
        match &self.prefix {
            Some(prefix) if !prefix.is_empty() => format!("{}/{}", prefix, destination),
            _ => destination.to_string(),
        }
    }
}

/// Splits an incoming byte stream into upload parts that grow with [`part_size`].
#[derive(Debug)]
struct PartBuffer {
    first_part_size: usize,
    emitted: i32,
    buf: Vec<u8>,
}

impl PartBuffer {
    fn new(first_part_size: usize) -> Self {
        Self {
            first_part_size,
            emitted: 0,
            buf: Vec::new(),
        }
    }

    fn current_size(&self) -> usize {
        part_size(self.first_part_size, self.emitted + 1)
    }

    /// Appends `chunk`, returning every part that became full.
    fn push(&mut self, mut chunk: &[u8]) -> Vec<Vec<u8>> {
        let mut full = Vec::new();
        while !chunk.is_empty() {
            let target = self.current_size();
            let take = (target - self.buf.len()).min(chunk.len());
            self.buf.extend_from_slice(&chunk[..take]);
            chunk = &chunk[take..];
            if self.buf.len() == target {
                full.push(std::mem::take(&mut self.buf));
                self.emitted += 1;
            }
        }
        full
    }

    fn finish(self) -> Vec<u8> {
        self.buf
    }
}

/// Backup files in an S3-compatible bucket, streamed with a multipart upload.
#[derive(Debug, Clone)]
pub struct S3Storage {
    client: S3Client,
    settings: S3Settings,
    http: Client,
    first_part_size: usize,
}

impl S3Storage {
    pub fn new(client: S3Client, settings: S3Settings) -> Self {
        Self {
            client,
            settings,
            http: Client::new(),
            first_part_size: FIRST_PART_SIZE,
        }
    }

    pub fn with_first_part_size(mut self, size: usize) -> Self {
        self.first_part_size = size.max(1);
        self
    }

    pub async fn from_settings(settings: S3Settings) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = &settings.region {
            loader = loader.region(Region::new(region.clone()));
        }
        let sdk_config = loader.load().await;

        let mut builder = aws_sdk_s3::config::Builder::from(&sdk_config);
        if let Some(endpoint) = &settings.endpoint {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        Self::new(S3Client::from_conf(builder.build()), settings)
    }

    async fn upload(&self, location: &DownloadLocation, key: &str) -> Result<u64> {
        let response = fetch(&self.http, location).await?;

        let created = self
            .client
            .create_multipart_upload()
            .bucket(&self.settings.bucket)
            .key(key)
            .content_type("application/gzip")
            .send()
            .await
            .map_err(|e| BackupError::ClientInitError {
                message: format!("can't start multipart upload: {}", e),
            })?;
        let upload_id = created
            .upload_id()
            .ok_or_else(|| BackupError::TransferError {
                message: "no upload ID returned from S3".to_string(),
            })?
            .to_string();

        match self.upload_parts(response, key, &upload_id).await {
            Ok(written) => Ok(written),
            Err(e) => {
                // 失敗時盡量清掉未完成的 multipart upload
                if let Err(abort_err) = self
                    .client
                    .abort_multipart_upload()
                    .bucket(&self.settings.bucket)
                    .key(key)
                    .upload_id(&upload_id)
                    .send()
                    .await
                {
                    tracing::warn!(error = %abort_err, key, "Failed to abort multipart upload");
                }
                Err(e)
            }
        }
    }

    async fn upload_parts(
        &self,
        mut response: reqwest::Response,
        key: &str,
        upload_id: &str,
    ) -> Result<u64> {
        let mut parts = Vec::new();
        let mut buffer = PartBuffer::new(self.first_part_size);
        let mut written = 0u64;

        while let Some(chunk) = response.chunk().await.map_err(transfer_error)? {
            written += chunk.len() as u64;
            for part in buffer.push(&chunk) {
                let number = check_part_number(parts.len() as i32 + 1)?;
                parts.push(self.upload_part(key, upload_id, number, part).await?);
            }
        }

        let last = buffer.finish();
        if !last.is_empty() || parts.is_empty() {
            let number = check_part_number(parts.len() as i32 + 1)?;
            parts.push(self.upload_part(key, upload_id, number, last).await?);
        }

        tracing::debug!(key, parts = parts.len(), bytes = written, "Completing multipart upload");

        self.client
            .complete_multipart_upload()
            .bucket(&self.settings.bucket)
            .key(key)
            .upload_id(upload_id)
            .multipart_upload(
                CompletedMultipartUpload::builder()
                    .set_parts(Some(parts))
                    .build(),
            )
            .send()
            .await
            .map_err(transfer_error)?;

        Ok(written)
    }

    async fn upload_part(
        &self,
        key: &str,
        upload_id: &str,
        number: i32,
        data: Vec<u8>,
    ) -> Result<CompletedPart> {
        let uploaded = self
            .client
            .upload_part()
            .bucket(&self.settings.bucket)
            .key(key)
            .upload_id(upload_id)
            .part_number(number)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(transfer_error)?;

        let etag = uploaded.e_tag().ok_or_else(|| BackupError::TransferError {
            message: format!("no ETag returned for part {}", number),
        })?;

        Ok(CompletedPart::builder()
            .part_number(number)
            .e_tag(etag)
            .build())
    }
}

#[async_trait]
impl StorageSink for S3Storage {
    async fn save(
        &self,
        source: &DownloadLocation,
        destination: &ArtifactDestination,
    ) -> Result<TransferSize> {
        let key = self.settings.object_key(destination);
        tracing::debug!(bucket = %self.settings.bucket, key = %key, "Uploading backup to S3");

        let written = tokio::time::timeout(SESSION_CEILING, self.upload(source, &key))
            .await
            .map_err(|_| BackupError::TransferError {
                message: format!("upload exceeded {:?}", SESSION_CEILING),
            })
            .and_then(|inner| inner)
            .wrap_err("can't save backup to storage")?;

        Ok(TransferSize(written))
    }
}
