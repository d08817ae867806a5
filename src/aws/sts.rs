use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region, retry::RetryConfig};
use aws_sdk_sts::{
    Client as StsClient,
    config::http::HttpResponse,
    error::{ProvideErrorMetadata, SdkError},
};
use aws_smithy_types::error::display::DisplayErrorContext;
use std::error::Error;
use tracing::{debug, info};

use super::{ScopedCredential, TrustRelationship};
use crate::{constants::DEFAULT_AWS_REGION, error::ExchangeError, google::IdentityAssertion};

/// STS error codes for failures that may succeed when tried again
const TRANSIENT_ERROR_CODES: &[&str] = &[
    "IDPCommunicationError",
    "ServiceUnavailable",
    "Throttling",
    "ThrottlingException",
    "RequestLimitExceeded",
];

/// Service that trades identity assertions for scoped AWS credentials
#[async_trait]
pub trait TrustBroker: Send + Sync {
    async fn exchange(
        &self,
        relationship: &TrustRelationship,
        assertion: &IdentityAssertion,
    ) -> Result<ScopedCredential, ExchangeError>;
}

/// AWS STS AssumeRoleWithWebIdentity
#[derive(Debug, Clone)]
pub struct StsTrustBroker {
    client: StsClient,
}

impl StsTrustBroker {
    /// Build an STS client from the default AWS config chain
    ///
    /// AssumeRoleWithWebIdentity is an unsigned call, so only the region is
    /// taken from the environment. Region priority: explicit -> ENV vars ->
    /// config file -> DEFAULT_AWS_REGION. SDK retries are disabled; each
    /// exchange is a single request.
    pub async fn from_env(region: Option<&str>) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .no_credentials()
            .retry_config(RetryConfig::disabled());
        if let Some(region) = region {
            loader = loader.region(Region::new(region.to_string()));
        }
        let loaded = loader.load().await;

        let config = match loaded.region() {
            Some(region) => {
                info!("Using region: {}", region);
                loaded
            }
            None => {
                info!(
                    "No region configured, using default {} for STS",
                    DEFAULT_AWS_REGION
                );
                aws_config::defaults(BehaviorVersion::latest())
                    .no_credentials()
                    .retry_config(RetryConfig::disabled())
                    .region(Region::new(DEFAULT_AWS_REGION))
                    .load()
                    .await
            }
        };

        Self::from_client(StsClient::new(&config))
    }

    pub fn from_client(client: StsClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl TrustBroker for StsTrustBroker {
    async fn exchange(
        &self,
        relationship: &TrustRelationship,
        assertion: &IdentityAssertion,
    ) -> Result<ScopedCredential, ExchangeError> {
        info!("Calling AWS STS AssumeRoleWithWebIdentity");
        debug!("Role ARN: {}", relationship.role_arn);
        debug!("Session name: {}", relationship.session_name);
        debug!("Duration: {} seconds", relationship.duration_seconds);

        let response = self
            .client
            .assume_role_with_web_identity()
            .role_arn(&relationship.role_arn)
            .role_session_name(&relationship.session_name)
            .web_identity_token(assertion.token())
            .duration_seconds(relationship.duration_seconds)
            .send()
            .await
            .map_err(|err| classify_sdk_error(&err))?;

        let sts_creds = response
            .credentials()
            .ok_or(ExchangeError::MissingCredentials)?;

        let credentials = ScopedCredential {
            access_key_id: sts_creds.access_key_id().to_string(),
            secret_access_key: sts_creds.secret_access_key().to_string(),
            session_token: sts_creds.session_token().to_string(),
            expiration: *sts_creds.expiration(),
        };

        if let Some(user) = response.assumed_role_user() {
            debug!("Assumed role user: {}", user.arn());
        }

        info!("Successfully obtained AWS credentials");
        Ok(credentials)
    }
}

/// Client-side STS service errors are rejections; server, throttling and
/// transport failures are transient
fn classify_sdk_error<E>(err: &SdkError<E, HttpResponse>) -> ExchangeError
where
    E: ProvideErrorMetadata + Error + 'static,
{
    match err {
        SdkError::ServiceError(context) => {
            let service_err = context.err();
            let code = service_err.code().unwrap_or("Unknown").to_string();
            let message = service_err
                .message()
                .map(str::to_string)
                .unwrap_or_else(|| DisplayErrorContext(err).to_string());

            if context.raw().status().is_server_error()
                || TRANSIENT_ERROR_CODES.contains(&code.as_str())
            {
                ExchangeError::Transport(format!("{code}: {message}"))
            } else {
                ExchangeError::Rejected { code, message }
            }
        }
        _ => ExchangeError::Transport(DisplayErrorContext(err).to_string()),
    }
}
