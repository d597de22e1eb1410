use std::time::Duration;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use aws_sdk_s3::{
    error::{ProvideErrorMetadata, SdkError},
    primitives::ByteStream,
};
use tracing::{debug, info};
use url::Url;

use crate::domain::repositories::storage::BlobStorage;

use super::s3::{build_s3_client, is_missing_object_error};

#[derive(Debug, Clone)]
pub struct ObjectStorageConfig {
    pub endpoint: String,
    pub region: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    pub prefix: String,
    pub public_base_url: String,
    pub timeout_secs: u64,
}

/// Where an asset reference points: an object in our bucket or a foreign URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectLocation {
    Key(String),
    Remote(Url),
}

pub struct ObjectStorageClient {
    client: aws_sdk_s3::Client,
    http: reqwest::Client,
    bucket: String,
    prefix: String,
    public_base_url: String,
}

impl ObjectStorageClient {
    pub async fn new(config: ObjectStorageConfig) -> Result<Self> {
        let client = build_s3_client(&config)
            .await
            .context("failed to build object storage s3 client")?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("failed to build object storage http client")?;

        Ok(Self {
            client,
            http,
            bucket: config.bucket,
            prefix: normalize_prefix(&config.prefix),
            public_base_url: config.public_base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn public_url(&self, object_key: &str) -> String {
        format!("{}/{}", self.public_base_url, object_key)
    }

    async fn download_object(&self, object_key: &str) -> Result<Vec<u8>> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(object_key)
            .send()
            .await
            .map_err(|err| describe_sdk_error(err, "download", &self.bucket, object_key))?;

        let bytes = output
            .body
            .collect()
            .await
            .with_context(|| format!("failed to read object body [key={}]", object_key))?
            .into_bytes();

        Ok(bytes.to_vec())
    }

    async fn download_remote(&self, url: Url) -> Result<Vec<u8>> {
        let response = self
            .http
            .get(url.clone())
            .send()
            .await
            .with_context(|| format!("failed to fetch remote asset {}", url))?
            .error_for_status()
            .with_context(|| format!("remote asset returned an error status {}", url))?;

        Ok(response.bytes().await?.to_vec())
    }
}

#[async_trait]
impl BlobStorage for ObjectStorageClient {
    async fn upload(&self, bytes: Vec<u8>, path: &str, content_type: &str) -> Result<String> {
        let object_key = object_key(&self.prefix, path);
        let size_bytes = bytes.len();

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&object_key)
            .body(ByteStream::from(bytes))
            .content_type(content_type)
            .send()
            .await
            .map_err(|err| describe_sdk_error(err, "upload", &self.bucket, &object_key))?;

        info!(
            bucket = %self.bucket,
            key = %object_key,
            size_bytes,
            "object_storage: upload completed"
        );

        Ok(self.public_url(&object_key))
    }

    async fn download(&self, path: &str) -> Result<Vec<u8>> {
        match resolve_location(&self.prefix, &self.public_base_url, path)? {
            ObjectLocation::Key(object_key) => self.download_object(&object_key).await,
            ObjectLocation::Remote(url) => self.download_remote(url).await,
        }
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let object_key = match resolve_location(&self.prefix, &self.public_base_url, path)? {
            ObjectLocation::Key(object_key) => object_key,
            ObjectLocation::Remote(url) => bail!("refusing to delete foreign object {}", url),
        };

        match self
            .client
            .delete_object()
            .bucket(&self.bucket)
            .key(&object_key)
            .send()
            .await
        {
            Ok(_) => Ok(()),
            Err(err) if is_missing_object_error(&err) => {
                debug!(
                    bucket = %self.bucket,
                    key = %object_key,
                    "object_storage: object already missing"
                );
                Ok(())
            }
            Err(err) => Err(describe_sdk_error(err, "delete", &self.bucket, &object_key)),
        }
    }
}

fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("{}/", trimmed)
    }
}

fn object_key(prefix: &str, path: &str) -> String {
    let path = path.trim_start_matches('/');
    if prefix.is_empty() || path.starts_with(prefix) {
        path.to_string()
    } else {
        format!("{}{}", prefix, path)
    }
}

/// Maps a stored asset reference to an object key. Public URLs of our own bucket are
/// turned back into keys; any other absolute URL is fetched over HTTP.
pub fn resolve_location(prefix: &str, public_base_url: &str, location: &str) -> Result<ObjectLocation> {
    let location = location.trim();
    if location.is_empty() {
        bail!("empty asset location");
    }

    if !public_base_url.is_empty() {
        if let Some(key) = location
            .strip_prefix(public_base_url)
            .and_then(|rest| rest.strip_prefix('/'))
        {
            return Ok(ObjectLocation::Key(key.to_string()));
        }
    }

    if location.starts_with("http://") || location.starts_with("https://") {
        let url = Url::parse(location).with_context(|| format!("invalid asset URL {}", location))?;
        return Ok(ObjectLocation::Remote(url));
    }

    Ok(ObjectLocation::Key(object_key(prefix, location)))
}

fn describe_sdk_error<E>(err: SdkError<E>, action: &str, bucket: &str, object_key: &str) -> anyhow::Error
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    if let SdkError::ServiceError(service_err) = &err {
        let status = service_err.raw().status().as_u16();
        let code = service_err.err().code().unwrap_or("unknown");
        let message = service_err.err().message().unwrap_or_default();

        let mut detail = format!(
            "object storage {} failed (status {}, code {})",
            action, status, code
        );

        if !message.is_empty() {
            detail.push_str(&format!(": {}", message));
        }

        detail.push_str(&format!(" [bucket={}, key={}]", bucket, object_key));

        return anyhow::anyhow!(detail);
    }

    anyhow::Error::new(err).context(format!("object storage {} failed [key={}]", action, object_key))
}
