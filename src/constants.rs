use std::{env, path::PathBuf};

use dirs;
use uuid::Uuid;

/// Configuration directory name under `~/.config`
pub const CONFIG_DIR_NAME: &str = "awscompat";

/// Configuration file name inside [`CONFIG_DIR_NAME`]
pub const CONFIG_FILE_NAME: &str = "config";

/// AWS configuration directory name
pub const AWS_CONFIG_DIR_NAME: &str = ".aws";

/// AWS shared credentials file name
pub const AWS_CREDENTIALS_FILE_NAME: &str = "credentials";

/// Audience AWS STS expects in web identity tokens
pub const DEFAULT_AUDIENCE: &str = "https://sts.amazonaws.com";

/// Default requested STS session duration in seconds
pub const DEFAULT_SESSION_DURATION_SECONDS: i32 = 3600;

/// Minimum STS session duration accepted by AssumeRoleWithWebIdentity
pub const MIN_SESSION_DURATION_SECONDS: i32 = 900;

/// Maximum STS session duration accepted by AssumeRoleWithWebIdentity
pub const MAX_SESSION_DURATION_SECONDS: i32 = 43200;

/// Cached credentials are refreshed once they have less than this many seconds left
pub const DEFAULT_REFRESH_MARGIN_SECONDS: u64 = 60;

/// Upper bound for a single assertion fetch or credential exchange
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

/// Default AWS region for STS operations when no region is configured
pub const DEFAULT_AWS_REGION: &str = "us-east-1";

/// Name reported to the AWS SDK for credentials produced here
pub const PROVIDER_NAME: &str = "GCPProvider";

/// Google OAuth2 token endpoint used when a key file omits `token_uri`
pub const GOOGLE_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// OAuth2 grant type for trading a self-signed JWT for an ID token
pub const JWT_BEARER_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Validity window of the self-signed JWT and fallback ID token lifetime
pub const ASSERTION_VALIDITY_SECONDS: u64 = 3600;

/// GCE metadata server host, overridable with `GCE_METADATA_HOST`
pub const METADATA_HOST: &str = "metadata.google.internal";

/// Metadata server path serving ID tokens for the default service account
pub const METADATA_IDENTITY_PATH: &str =
    "/computeMetadata/v1/instance/service-accounts/default/identity";

/// Generate a unique STS role session name
pub fn default_session_name() -> String {
    format!("gcp-{}", Uuid::new_v4())
}

/// Get the awscompat config file path
/// Respects AWSCOMPAT_CONFIG_FILE environment variable if set
pub fn get_config_path() -> Option<PathBuf> {
    if let Ok(path) = env::var("AWSCOMPAT_CONFIG_FILE") {
        return Some(PathBuf::from(path));
    }

    dirs::home_dir().map(|home| {
        home.join(".config")
            .join(CONFIG_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    })
}

/// Get the AWS credentials file path
/// Respects AWS_SHARED_CREDENTIALS_FILE environment variable if set
pub fn get_aws_credentials_path() -> Option<PathBuf> {
    if let Ok(path) = env::var("AWS_SHARED_CREDENTIALS_FILE") {
        return Some(PathBuf::from(path));
    }

    dirs::home_dir().map(|home| {
        home.join(AWS_CONFIG_DIR_NAME)
            .join(AWS_CREDENTIALS_FILE_NAME)
    })
}

/// Base URL of the GCE metadata server
pub fn metadata_endpoint() -> String {
    let host = env::var("GCE_METADATA_HOST").unwrap_or_else(|_| METADATA_HOST.to_string());
    format!("http://{host}")
}
