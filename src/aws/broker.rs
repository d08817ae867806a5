//! Federated credential broker.
//!
//! Trades an identity assertion for scoped AWS credentials and caches the
//! result until it comes within the refresh margin of expiring. The cache lock
//! is held across a refresh, so concurrent callers wait for the in-flight
//! exchange instead of starting their own.

use async_trait::async_trait;
use std::time::Duration;
use tokio::{sync::Mutex, time};
use tracing::{debug, info, warn};

use super::{CredentialSource, ScopedCredential, TrustBroker, TrustRelationship};
use crate::{
    constants::{DEFAULT_REFRESH_MARGIN_SECONDS, DEFAULT_TIMEOUT_SECONDS},
    error::{AssertionError, BrokerError, ExchangeError},
    google::AssertionProvider,
};

pub struct FederatedCredentialBroker<P, T> {
    provider: P,
    trust_broker: T,
    relationship: TrustRelationship,
    audience: String,
    refresh_margin: Duration,
    timeout: Duration,
    cached: Mutex<Option<ScopedCredential>>,
}

impl<P, T> FederatedCredentialBroker<P, T>
where
    P: AssertionProvider,
    T: TrustBroker,
{
    pub fn new(
        provider: P,
        trust_broker: T,
        relationship: TrustRelationship,
        audience: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            trust_broker,
            relationship,
            audience: audience.into(),
            refresh_margin: Duration::from_secs(DEFAULT_REFRESH_MARGIN_SECONDS),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECONDS),
            cached: Mutex::new(None),
        }
    }

    pub fn with_refresh_margin(mut self, refresh_margin: Duration) -> Self {
        self.refresh_margin = refresh_margin;
        self
    }

    /// Bound applied separately to the assertion fetch and the exchange
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn relationship(&self) -> &TrustRelationship {
        &self.relationship
    }

    /// Currently cached credential, without refreshing
    pub async fn cached(&self) -> Option<ScopedCredential> {
        self.cached.lock().await.clone()
    }

    /// Return the cached credential, or exchange a fresh assertion for a new one
    pub async fn get_credentials(&self) -> Result<ScopedCredential, BrokerError> {
        let mut cached = self.cached.lock().await;

        if let Some(credentials) = cached
            .as_ref()
            .filter(|c| c.is_valid_for(self.refresh_margin))
        {
            debug!("Using cached credentials for {}", credentials.access_key_id);
            return Ok(credentials.clone());
        }

        info!("Refreshing credentials for role: {}", self.relationship.role_arn);

        let assertion = time::timeout(self.timeout, self.provider.get_assertion(&self.audience))
            .await
            .map_err(|_| AssertionError::Timeout(self.timeout))?
            .inspect_err(|e| warn!("Identity assertion failed: {}", e))?;

        let credentials = time::timeout(
            self.timeout,
            self.trust_broker.exchange(&self.relationship, &assertion),
        )
        .await
        .map_err(|_| ExchangeError::Timeout(self.timeout))?
        .inspect_err(|e| warn!("Credential exchange failed: {}", e))?;

        debug!(
            access_key_id = %credentials.access_key_id,
            expiration = ?credentials.expiration,
            "Cached new credentials"
        );
        *cached = Some(credentials.clone());

        Ok(credentials)
    }
}

#[async_trait]
impl<P, T> CredentialSource for FederatedCredentialBroker<P, T>
where
    P: AssertionProvider,
    T: TrustBroker,
{
    async fn credentials(&self) -> Result<ScopedCredential, BrokerError> {
        self.get_credentials().await
    }
}
