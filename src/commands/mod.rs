pub mod completions;
pub mod credentials;
pub mod list;

pub use completions::CompletionsCommand;
pub use credentials::CredentialsCommand;
pub use list::ListCommand;

use anyhow::{Context, Result};
use clap::Args;
use std::{path::PathBuf, sync::Arc};
use tracing::info;

use crate::{
    aws::{
        AmbientCredentialSource, CredentialSource, FederatedCredentialBroker, StsTrustBroker,
    },
    config::{Config, CredentialSourceKind},
    google::IdentityProvider,
};

/// Flags shared by every command that federates into AWS; each overrides the config file
#[derive(Debug, Clone, Default, Args)]
pub struct FederationArgs {
    #[arg(long, help = "Audience of the Google ID token [default: https://sts.amazonaws.com]")]
    pub audience: Option<String>,

    #[arg(
        long,
        help = "Google service account key file (metadata server when omitted)"
    )]
    pub gcp_credential_file: Option<PathBuf>,

    #[arg(long, help = "ARN of the AWS role to assume")]
    pub aws_arn: Option<String>,

    #[arg(long, help = "AWS role session name [default: gcp-<uuid>]")]
    pub aws_session_name: Option<String>,

    #[arg(long, help = "Requested STS session duration in seconds [default: 3600]")]
    pub aws_duration: Option<i32>,

    #[arg(long, help = "AWS region for STS and S3")]
    pub region: Option<String>,
}

impl FederationArgs {
    /// Layer command-line values over `config`
    pub fn apply(self, mut config: Config) -> Config {
        if let Some(audience) = self.audience {
            config.audience = audience;
        }
        if let Some(file) = self.gcp_credential_file {
            config.gcp_credential_file = Some(file);
        }
        if let Some(arn) = self.aws_arn {
            config.role_arn = Some(arn);
        }
        if let Some(name) = self.aws_session_name {
            config.session_name = Some(name);
        }
        if let Some(duration) = self.aws_duration {
            config.duration_seconds = duration;
        }
        if let Some(region) = self.region {
            config.region = Some(region);
        }
        config
    }
}

pub type GoogleStsBroker = FederatedCredentialBroker<IdentityProvider, StsTrustBroker>;

/// Wire the Google identity provider to STS according to `config`
pub async fn build_broker(config: &Config) -> Result<GoogleStsBroker> {
    let relationship = config.trust_relationship()?;

    let provider = IdentityProvider::from_credential_file(
        config.gcp_credential_file.as_deref(),
        reqwest::Client::new(),
    )
    .context("Failed to load Google credentials")?;

    let trust_broker = StsTrustBroker::from_env(config.region.as_deref()).await;

    info!(
        "Federating into {} as session {}",
        relationship.role_arn, relationship.session_name
    );

    Ok(
        FederatedCredentialBroker::new(provider, trust_broker, relationship, &config.audience)
            .with_refresh_margin(config.refresh_margin())
            .with_timeout(config.timeout()),
    )
}

/// Pick the credential source named by `config`
pub async fn build_source(config: &Config, profile: &str) -> Result<Arc<dyn CredentialSource>> {
    match config.credential_source {
        CredentialSourceKind::WebIdentity => Ok(Arc::new(build_broker(config).await?)),
        CredentialSourceKind::Ambient => {
            info!("Using ambient AWS credentials");
            let source = AmbientCredentialSource::load(Some(profile))
                .await
                .context("Failed to load ambient AWS credentials")?;
            Ok(Arc::new(source))
        }
    }
}
