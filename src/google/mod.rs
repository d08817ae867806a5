pub mod metadata;
pub mod service_account;

use async_trait::async_trait;
use aws_smithy_types::DateTime;
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::Deserialize;
use std::{
    fmt,
    path::Path,
    time::{Duration, SystemTime},
};

use self::{metadata::MetadataProvider, service_account::ServiceAccountProvider};
use crate::error::{AssertionError, CredentialSourceError};

/// A signed, audience-scoped identity token
#[derive(Clone, PartialEq)]
pub struct IdentityAssertion {
    token: String,
    audience: String,
    expiration: DateTime,
}

impl IdentityAssertion {
    pub fn new(token: impl Into<String>, audience: impl Into<String>, expiration: DateTime) -> Self {
        Self {
            token: token.into(),
            audience: audience.into(),
            expiration,
        }
    }

    /// Build an assertion whose expiry comes from the token's `exp` claim,
    /// falling back to `now + fallback_validity` when the claim is unreadable
    pub fn from_token(
        token: impl Into<String>,
        audience: impl Into<String>,
        fallback_validity: Duration,
    ) -> Self {
        let token = token.into();
        let expiration = token_expiry(&token)
            .unwrap_or_else(|| DateTime::from(SystemTime::now() + fallback_validity));
        Self::new(token, audience, expiration)
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn audience(&self) -> &str {
        &self.audience
    }

    pub fn expiration(&self) -> DateTime {
        self.expiration
    }
}

impl fmt::Debug for IdentityAssertion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityAssertion")
            .field("token", &"** redacted **")
            .field("audience", &self.audience)
            .field("expiration", &self.expiration)
            .finish()
    }
}

/// Produces identity assertions bound to an audience
#[async_trait]
pub trait AssertionProvider: Send + Sync {
    async fn get_assertion(&self, audience: &str) -> Result<IdentityAssertion, AssertionError>;
}

/// Google identity provider, selected by whether a key file is configured
#[derive(Debug)]
pub enum IdentityProvider {
    ServiceAccount(ServiceAccountProvider),
    Metadata(MetadataProvider),
}

impl IdentityProvider {
    /// Use the service account key at `credential_file`, or the metadata server when absent
    pub fn from_credential_file(
        credential_file: Option<&Path>,
        http: reqwest::Client,
    ) -> Result<Self, CredentialSourceError> {
        match credential_file {
            Some(path) => Ok(Self::ServiceAccount(ServiceAccountProvider::from_file(
                path, http,
            )?)),
            None => Ok(Self::Metadata(MetadataProvider::new(http))),
        }
    }
}

#[async_trait]
impl AssertionProvider for IdentityProvider {
    async fn get_assertion(&self, audience: &str) -> Result<IdentityAssertion, AssertionError> {
        match self {
            Self::ServiceAccount(provider) => provider.get_assertion(audience).await,
            Self::Metadata(provider) => provider.get_assertion(audience).await,
        }
    }
}

#[derive(Deserialize)]
struct ExpiryClaim {
    exp: i64,
}

/// Read the `exp` claim of a JWT without verifying its signature
fn token_expiry(token: &str) -> Option<DateTime> {
    let payload = token.split('.').nth(1)?;
    let decoded = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    let claim: ExpiryClaim = serde_json::from_slice(&decoded).ok()?;
    Some(DateTime::from_secs(claim.exp))
}
