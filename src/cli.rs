use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};

use crate::commands::{CompletionsCommand, CredentialsCommand, ListCommand};

#[derive(Debug, Clone, Parser)]
#[command(name = "awscompat", version, about = "Exchange Google identity tokens for temporary AWS credentials", long_about = None)]
pub struct Cli {
    #[arg(
        short = 'p',
        long,
        global = true,
        default_value = "default",
        help = "Config profile name"
    )]
    pub profile: String,

    #[arg(short = 'v', long, global = true, action = ArgAction::Count, help = "Increase verbosity (-v info, -vv debug, -vvv trace)")]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    #[command(about = "Print temporary AWS credentials in credential_process format")]
    Credentials(CredentialsCommand),
    #[command(about = "List objects in an S3 bucket")]
    List(ListCommand),
    #[command(about = "Generate shell completion scripts for awscompat")]
    Completions(CompletionsCommand),
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        let profile = self.profile;

        match self.command {
            Commands::Credentials(cmd) => cmd.execute(&profile).await,
            Commands::List(cmd) => cmd.execute(&profile).await,
            Commands::Completions(cmd) => {
                cmd.execute();
                Ok(())
            }
        }
    }
}
