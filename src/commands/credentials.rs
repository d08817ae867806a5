use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use super::{FederationArgs, build_broker};
use crate::{
    aws::{self, process::ProcessCredentials},
    config,
};

#[derive(Debug, Clone, Args)]
pub struct CredentialsCommand {
    #[command(flatten)]
    pub federation: FederationArgs,

    #[arg(long, value_name = "PROFILE", help = "Also write the credentials to this AWS shared credentials profile")]
    pub save_profile: Option<String>,
}

impl CredentialsCommand {
    pub async fn execute(self, profile: &str) -> Result<()> {
        info!("Fetching credentials for profile: {}", profile);

        let config = self.federation.apply(
            config::load(profile)
                .await
                .with_context(|| format!("Failed to load configuration for profile '{profile}'"))?,
        );

        let broker = build_broker(&config).await?;
        let credentials = broker
            .get_credentials()
            .await
            .context("Failed to obtain AWS credentials")?;

        if let Some(save_profile) = &self.save_profile {
            aws::credentials::save_credentials(save_profile, &credentials)
                .await
                .context("Failed to save AWS credentials")?;
        }

        let output = ProcessCredentials::new(&credentials)
            .context("Failed to format credential expiration")?
            .to_json()
            .context("Failed to serialize credentials")?;
        println!("{output}");

        Ok(())
    }
}
