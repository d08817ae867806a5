//! Exchange Google-issued identity tokens for temporary AWS credentials.
//!
//! [`google`] produces audience-scoped ID tokens, [`aws::FederatedCredentialBroker`]
//! trades them with STS `AssumeRoleWithWebIdentity` and caches the result until it
//! nears expiry. Anything implementing [`aws::CredentialSource`] can back an AWS SDK
//! client through [`aws::SharedCredentialSource`].

pub mod aws;
pub mod cli;
pub mod commands;
pub mod config;
pub mod constants;
pub mod error;
pub mod google;
