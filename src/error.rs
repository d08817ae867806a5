//! Error types for identity assertion and credential exchange

use std::{path::PathBuf, time::Duration};

use thiserror::Error;

/// Signing key material could not be loaded
#[derive(Error, Debug)]
pub enum CredentialSourceError {
    #[error("Failed to read credential file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed credential file: {0}")]
    Malformed(String),

    #[error("Unsupported credential type '{0}', expected 'service_account'")]
    UnsupportedType(String),

    #[error("Invalid private key: {0}")]
    InvalidKey(String),
}

/// Assertion creation failed after key material was loaded
#[derive(Error, Debug)]
pub enum SigningError {
    #[error("Audience must not be empty")]
    EmptyAudience,

    #[error("Failed to sign JWT: {0}")]
    Encode(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Token endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid token response: {0}")]
    InvalidResponse(String),
}

impl From<jsonwebtoken::errors::Error> for SigningError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        SigningError::Encode(err.to_string())
    }
}

impl From<reqwest::Error> for SigningError {
    fn from(err: reqwest::Error) -> Self {
        SigningError::Http(err.to_string())
    }
}

/// Failure to produce an identity assertion
#[derive(Error, Debug)]
pub enum AssertionError {
    #[error(transparent)]
    CredentialSource(#[from] CredentialSourceError),

    #[error(transparent)]
    Signing(#[from] SigningError),

    #[error("Identity assertion timed out after {0:?}")]
    Timeout(Duration),
}

/// Failure to exchange an assertion with the trust broker
#[derive(Error, Debug)]
pub enum ExchangeError {
    /// The trust broker refused the assertion (expired, wrong audience, trust policy, unknown role)
    #[error("Trust broker rejected the assertion ({code}): {message}")]
    Rejected { code: String, message: String },

    #[error("Trust broker request failed: {0}")]
    Transport(String),

    #[error("Trust broker returned no credentials")]
    MissingCredentials,

    #[error("Credential exchange timed out after {0:?}")]
    Timeout(Duration),
}

/// Errors surfaced by credential sources
#[derive(Error, Debug)]
pub enum BrokerError {
    #[error("Failed to obtain identity assertion")]
    Assertion(#[from] AssertionError),

    #[error("Failed to exchange identity assertion")]
    Exchange(#[from] ExchangeError),

    #[error("Failed to resolve ambient AWS credentials: {0}")]
    Ambient(String),
}
