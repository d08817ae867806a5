use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::provider::{ProvideCredentials, SharedCredentialsProvider};
use aws_smithy_types::{DateTime, error::display::DisplayErrorContext};
use std::{
    sync::Arc,
    time::{Duration, SystemTime},
};
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::{CredentialSource, ScopedCredential};
use crate::{constants::DEFAULT_REFRESH_MARGIN_SECONDS, error::BrokerError};

/// Long-lived keys carry no expiry; report them as valid for this long
const STATIC_CREDENTIAL_VALIDITY: Duration = Duration::from_secs(3600);

/// Credentials from the AWS SDK default chain (env, profile, process, IMDS)
///
/// The chain itself does not cache, so resolved credentials are kept until
/// they come within the refresh margin of expiring.
#[derive(Debug, Clone)]
pub struct AmbientCredentialSource {
    provider: SharedCredentialsProvider,
    refresh_margin: Duration,
    cached: Arc<Mutex<Option<ScopedCredential>>>,
}

impl AmbientCredentialSource {
    /// Resolve the default credential chain for `profile`
    pub async fn load(profile: Option<&str>) -> Result<Self, BrokerError> {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(profile) = profile {
            debug!("Loading ambient AWS credentials for profile: {}", profile);
            loader = loader.profile_name(profile);
        }

        let config = loader.load().await;
        let provider = config
            .credentials_provider()
            .ok_or_else(|| BrokerError::Ambient("no AWS credentials provider configured".into()))?;

        Ok(Self::from_shared(provider))
    }

    pub fn new(provider: impl ProvideCredentials + 'static) -> Self {
        Self::from_shared(SharedCredentialsProvider::new(provider))
    }

    fn from_shared(provider: SharedCredentialsProvider) -> Self {
        Self {
            provider,
            refresh_margin: Duration::from_secs(DEFAULT_REFRESH_MARGIN_SECONDS),
            cached: Arc::new(Mutex::new(None)),
        }
    }

    pub fn with_refresh_margin(mut self, refresh_margin: Duration) -> Self {
        self.refresh_margin = refresh_margin;
        self
    }
}

#[async_trait]
impl CredentialSource for AmbientCredentialSource {
    async fn credentials(&self) -> Result<ScopedCredential, BrokerError> {
        let mut cached = self.cached.lock().await;
        if let Some(credentials) = cached
            .as_ref()
            .filter(|c| c.is_valid_for(self.refresh_margin))
        {
            debug!("Using cached ambient credentials");
            return Ok(credentials.clone());
        }

        let credentials = self
            .provider
            .provide_credentials()
            .await
            .map_err(|e| BrokerError::Ambient(DisplayErrorContext(&e).to_string()))?;

        let expiration = credentials
            .expiry()
            .unwrap_or_else(|| SystemTime::now() + STATIC_CREDENTIAL_VALIDITY);

        info!("Resolved ambient AWS credentials");
        let credentials = ScopedCredential {
            access_key_id: credentials.access_key_id().to_string(),
            secret_access_key: credentials.secret_access_key().to_string(),
            session_token: credentials.session_token().unwrap_or_default().to_string(),
            expiration: DateTime::from(expiration),
        };
        *cached = Some(credentials.clone());

        Ok(credentials)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_credential_types::{Credentials, provider::future};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Hands out credentials expiring `lifetime` from now and counts resolutions
    #[derive(Debug)]
    struct CountingChain {
        calls: Arc<AtomicUsize>,
        lifetime: Duration,
    }

    impl ProvideCredentials for CountingChain {
        fn provide_credentials<'a>(&'a self) -> future::ProvideCredentials<'a>
        where
            Self: 'a,
        {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            future::ProvideCredentials::ready(Ok(Credentials::new(
                format!("ASIA{n}"),
                "secret",
                Some("session".to_string()),
                Some(SystemTime::now() + self.lifetime),
                "counting",
            )))
        }
    }

    fn counting(lifetime: Duration) -> (AmbientCredentialSource, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let source = AmbientCredentialSource::new(CountingChain {
            calls: calls.clone(),
            lifetime,
        });
        (source, calls)
    }

    #[tokio::test]
    async fn test_ambient_credentials_are_cached() {
        let (source, calls) = counting(Duration::from_secs(900));

        for _ in 0..5 {
            assert_eq!(source.credentials().await.unwrap().access_key_id, "ASIA1");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_ambient_credentials_refresh_inside_margin() {
        let (source, calls) = counting(Duration::from_secs(30));

        assert_eq!(source.credentials().await.unwrap().access_key_id, "ASIA1");
        assert_eq!(source.credentials().await.unwrap().access_key_id, "ASIA2");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_ambient_temporary_credentials() {
        let expiry = SystemTime::UNIX_EPOCH + Duration::from_secs(1_900_000_000);
        let source = AmbientCredentialSource::new(Credentials::new(
            "ASIAAMBIENT",
            "secret",
            Some("session".to_string()),
            Some(expiry),
            "test",
        ));

        let credentials = source.credentials().await.unwrap();
        assert_eq!(credentials.access_key_id, "ASIAAMBIENT");
        assert_eq!(credentials.secret_access_key, "secret");
        assert_eq!(credentials.session_token, "session");
        assert_eq!(credentials.expiration, DateTime::from_secs(1_900_000_000));
    }

    #[tokio::test]
    async fn test_ambient_static_credentials_get_validity_window() {
        let source =
            AmbientCredentialSource::new(Credentials::new("AKIASTATIC", "secret", None, None, "test"));

        let credentials = source.credentials().await.unwrap();
        assert_eq!(credentials.session_token, "");
        assert!(credentials.is_valid_for(Duration::from_secs(60)));
        assert!(!credentials.is_valid_for(STATIC_CREDENTIAL_VALIDITY + Duration::from_secs(60)));
    }
}
