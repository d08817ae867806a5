use anyhow::{Context, Result};
use aws_smithy_types::date_time::Format;
use ini::Ini;
use std::path::Path;
use tokio::fs;
use tracing;

use super::ScopedCredential;
use crate::constants;

/// Save credentials to the AWS shared credentials file
pub async fn save_credentials(profile: &str, creds: &ScopedCredential) -> Result<()> {
    let path = constants::get_aws_credentials_path()
        .context("Failed to determine AWS credentials path")?;

    save_credentials_to(&path, profile, creds).await
}

pub async fn save_credentials_to(path: &Path, profile: &str, creds: &ScopedCredential) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let mut ini = path
        .exists()
        .then(|| Ini::load_from_file(path).ok())
        .flatten()
        .unwrap_or_else(Ini::new);

    let expiration = creds
        .expiration
        .fmt(Format::DateTime)
        .unwrap_or_else(|_| "unknown".to_string());

    ini.with_section(Some(profile))
        .set("aws_access_key_id", &creds.access_key_id)
        .set("aws_secret_access_key", &creds.secret_access_key)
        .set("aws_session_token", &creds.session_token)
        .set("aws_session_expiration", &expiration);

    ini.write_to_file(path)
        .context("Failed to write credentials file")?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let metadata = fs::metadata(path).await?;
        let mut permissions = metadata.permissions();
        permissions.set_mode(0o600);
        fs::set_permissions(path, permissions).await?;
    }

    tracing::info!("Credentials saved to profile: {}", profile);
    Ok(())
}
