use anyhow::{Context, Result};
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::{Client as S3Client, config::Config as S3Config};
use tracing::{debug, info};

use super::SharedCredentialSource;

/// S3 client whose credentials come from `source`
///
/// A custom `endpoint_url` switches to path-style addressing for S3-compatible stores.
pub fn client(source: SharedCredentialSource, region: &str, endpoint_url: Option<&str>) -> S3Client {
    let mut builder = S3Config::builder()
        .behavior_version(BehaviorVersion::latest())
        .region(Region::new(region.to_string()))
        .credentials_provider(source);

    if let Some(endpoint_url) = endpoint_url {
        debug!("Using S3 endpoint: {}", endpoint_url);
        builder = builder.endpoint_url(endpoint_url).force_path_style(true);
    }

    S3Client::from_conf(builder.build())
}

/// List every object key in `bucket`, following ListObjectsV2 continuation tokens
pub async fn list_objects(client: &S3Client, bucket: &str, prefix: Option<&str>) -> Result<Vec<String>> {
    info!("Listing objects in bucket: {}", bucket);

    let mut pages = client
        .list_objects_v2()
        .bucket(bucket)
        .set_prefix(prefix.map(str::to_string))
        .into_paginator()
        .send();

    let mut keys = Vec::new();
    while let Some(page) = pages.next().await {
        let page = page.with_context(|| format!("Failed to list objects in bucket '{bucket}'"))?;
        debug!("Fetched page with {} objects", page.contents().len());
        keys.extend(
            page.contents()
                .iter()
                .filter_map(|object| object.key())
                .map(str::to_string),
        );
    }

    info!("Listed {} objects", keys.len());
    Ok(keys)
}
