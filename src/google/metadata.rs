use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info};

use super::{AssertionProvider, IdentityAssertion};
use crate::{
    constants::{self, ASSERTION_VALIDITY_SECONDS, METADATA_IDENTITY_PATH},
    error::{AssertionError, SigningError},
};

/// ID tokens for the attached service account on GCE, GKE, Cloud Run and Cloud Functions
#[derive(Debug, Clone)]
pub struct MetadataProvider {
    endpoint: String,
    http: reqwest::Client,
}

impl MetadataProvider {
    pub fn new(http: reqwest::Client) -> Self {
        Self::with_endpoint(constants::metadata_endpoint(), http)
    }

    pub fn with_endpoint(endpoint: impl Into<String>, http: reqwest::Client) -> Self {
        Self {
            endpoint: endpoint.into(),
            http,
        }
    }
}

#[async_trait]
impl AssertionProvider for MetadataProvider {
    async fn get_assertion(&self, audience: &str) -> Result<IdentityAssertion, AssertionError> {
        if audience.is_empty() {
            return Err(SigningError::EmptyAudience.into());
        }

        info!("Requesting Google ID token from the metadata server");
        debug!("Audience: {}", audience);

        let response = self
            .http
            .get(format!("{}{}", self.endpoint, METADATA_IDENTITY_PATH))
            .header("Metadata-Flavor", "Google")
            .query(&[("audience", audience), ("format", "full")])
            .send()
            .await
            .map_err(SigningError::from)?;

        let status = response.status();
        let body = response.text().await.map_err(SigningError::from)?;
        if !status.is_success() {
            return Err(SigningError::Status {
                status: status.as_u16(),
                body,
            }
            .into());
        }

        let token = body.trim();
        if token.is_empty() {
            return Err(
                SigningError::InvalidResponse("metadata server returned an empty token".into())
                    .into(),
            );
        }

        Ok(IdentityAssertion::from_token(
            token,
            audience,
            Duration::from_secs(ASSERTION_VALIDITY_SECONDS),
        ))
    }
}
