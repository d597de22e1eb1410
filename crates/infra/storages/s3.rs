use std::{str::FromStr, time::Duration};

use anyhow::{Context, Result};
use aws_config::{BehaviorVersion, timeout::TimeoutConfig};
use aws_credential_types::Credentials;
use aws_sdk_s3::{
    Client,
    config::{Region, StalledStreamProtectionConfig},
    error::{ProvideErrorMetadata, SdkError},
};
use http::Uri;

use super::object_storage::ObjectStorageConfig;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Path-style client with static keys, which every S3-compatible provider we target
/// accepts. `timeout_secs` bounds each read.
pub async fn build_s3_client(config: &ObjectStorageConfig) -> Result<Client> {
    let endpoint = format!("{}/", config.endpoint.trim_end_matches('/'));
    Uri::from_str(&endpoint)
        .with_context(|| format!("invalid object storage endpoint {}", config.endpoint))?;

    let credentials = Credentials::new(
        config.access_key.clone(),
        config.secret_key.clone(),
        None,
        None,
        "object-storage",
    );

    let region = Region::new(config.region.clone());
    let shared_config = aws_config::defaults(BehaviorVersion::latest())
        .region(region.clone())
        .credentials_provider(credentials)
        .timeout_config(
            TimeoutConfig::builder()
                .connect_timeout(CONNECT_TIMEOUT)
                .read_timeout(Duration::from_secs(config.timeout_secs.max(1)))
                .build(),
        )
        .load()
        .await;

    let s3_config = aws_sdk_s3::config::Builder::from(&shared_config)
        .endpoint_url(endpoint)
        .force_path_style(true)
        .region(region)
        .stalled_stream_protection(StalledStreamProtectionConfig::disabled())
        .build();

    Ok(Client::from_conf(s3_config))
}

/// 404 or `NoSuchKey`: the object is already gone.
pub fn is_missing_object_error<E>(err: &SdkError<E>) -> bool
where
    E: ProvideErrorMetadata,
{
    match err {
        SdkError::ServiceError(service_err) => {
            service_err.raw().status().as_u16() == 404
                || matches!(service_err.err().code(), Some("NoSuchKey" | "NotFound"))
        }
        _ => false,
    }
}
