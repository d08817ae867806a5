use async_trait::async_trait;
use aws_credential_types::{
    Credentials as SdkCredentials,
    provider::{self, ProvideCredentials, error::CredentialsError},
};
use aws_smithy_types::DateTime;
use std::{
    fmt,
    sync::Arc,
    time::{Duration, SystemTime},
};

use crate::{
    constants::{self, DEFAULT_SESSION_DURATION_SECONDS, PROVIDER_NAME},
    error::BrokerError,
};

pub mod ambient;
pub mod broker;
pub mod credentials;
pub mod process;
pub mod s3;
pub mod sts;

pub use ambient::AmbientCredentialSource;
pub use broker::FederatedCredentialBroker;
pub use sts::{StsTrustBroker, TrustBroker};

/// AWS temporary credentials structure
#[derive(Clone, PartialEq)]
pub struct ScopedCredential {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: String,
    pub expiration: DateTime,
}

impl ScopedCredential {
    /// True while more than `margin` of lifetime remains
    pub fn is_valid_for(&self, margin: Duration) -> bool {
        let Ok(expires_at) = SystemTime::try_from(self.expiration) else {
            return false;
        };

        SystemTime::now()
            .checked_add(margin)
            .is_some_and(|deadline| expires_at > deadline)
    }

    /// Convert into the AWS SDK credential type
    pub fn to_sdk_credentials(&self) -> SdkCredentials {
        let session_token =
            (!self.session_token.is_empty()).then(|| self.session_token.clone());

        SdkCredentials::new(
            &self.access_key_id,
            &self.secret_access_key,
            session_token,
            SystemTime::try_from(self.expiration).ok(),
            PROVIDER_NAME,
        )
    }
}

impl fmt::Debug for ScopedCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopedCredential")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"** redacted **")
            .field("session_token", &"** redacted **")
            .field("expiration", &self.expiration)
            .finish()
    }
}

/// Role to assume and how to name and size the resulting session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustRelationship {
    pub role_arn: String,
    pub session_name: String,
    pub duration_seconds: i32,
}

impl TrustRelationship {
    pub fn new(role_arn: impl Into<String>) -> Self {
        Self {
            role_arn: role_arn.into(),
            session_name: constants::default_session_name(),
            duration_seconds: DEFAULT_SESSION_DURATION_SECONDS,
        }
    }

    pub fn with_session_name(mut self, session_name: impl Into<String>) -> Self {
        self.session_name = session_name.into();
        self
    }

    pub fn with_duration_seconds(mut self, duration_seconds: i32) -> Self {
        self.duration_seconds = duration_seconds;
        self
    }
}

/// Anything that can hand out AWS credentials
#[async_trait]
pub trait CredentialSource: Send + Sync {
    async fn credentials(&self) -> Result<ScopedCredential, BrokerError>;
}

/// Exposes a [`CredentialSource`] to AWS SDK clients
#[derive(Clone)]
pub struct SharedCredentialSource(Arc<dyn CredentialSource>);

impl SharedCredentialSource {
    pub fn new(source: impl CredentialSource + 'static) -> Self {
        Self(Arc::new(source))
    }

    pub fn from_arc(source: Arc<dyn CredentialSource>) -> Self {
        Self(source)
    }
}

impl fmt::Debug for SharedCredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SharedCredentialSource")
    }
}

impl ProvideCredentials for SharedCredentialSource {
    fn provide_credentials<'a>(&'a self) -> provider::future::ProvideCredentials<'a>
    where
        Self: 'a,
    {
        provider::future::ProvideCredentials::new(async move {
            let credentials = self
                .0
                .credentials()
                .await
                .map_err(CredentialsError::provider_error)?;
            Ok(credentials.to_sdk_credentials())
        })
    }
}
