use anyhow::{Context, Result};
use clap::Args;

use super::{FederationArgs, build_source};
use crate::{
    aws::{SharedCredentialSource, s3},
    config::{self, CredentialSourceKind},
    constants::DEFAULT_AWS_REGION,
};

#[derive(Debug, Clone, Args)]
pub struct ListCommand {
    #[arg(short = 'b', long, help = "S3 bucket to list")]
    pub bucket: String,

    #[arg(long, help = "Only list keys starting with this prefix")]
    pub prefix: Option<String>,

    #[arg(long, help = "Use the default AWS credential chain instead of web identity federation")]
    pub ambient: bool,

    #[arg(long, help = "Custom S3 endpoint URL")]
    pub endpoint_url: Option<String>,

    #[command(flatten)]
    pub federation: FederationArgs,
}

impl ListCommand {
    pub async fn execute(self, profile: &str) -> Result<()> {
        let mut config = self.federation.apply(
            config::load(profile)
                .await
                .with_context(|| format!("Failed to load configuration for profile '{profile}'"))?,
        );
        if self.ambient {
            config.credential_source = CredentialSourceKind::Ambient;
        }

        let source = build_source(&config, profile).await?;
        let region = config.region.as_deref().unwrap_or(DEFAULT_AWS_REGION);
        let client = s3::client(
            SharedCredentialSource::from_arc(source),
            region,
            self.endpoint_url.as_deref(),
        );

        let keys = s3::list_objects(&client, &self.bucket, self.prefix.as_deref()).await?;
        for key in keys {
            println!("{key}");
        }

        Ok(())
    }
}
