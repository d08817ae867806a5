use crate::constants::{
    self, DEFAULT_AUDIENCE, DEFAULT_REFRESH_MARGIN_SECONDS, DEFAULT_SESSION_DURATION_SECONDS,
    DEFAULT_TIMEOUT_SECONDS, MAX_SESSION_DURATION_SECONDS, MIN_SESSION_DURATION_SECONDS,
};
use anyhow::{Context, Result, bail};
use ini::{Ini, Properties};
use std::{fmt, path::PathBuf, str::FromStr, time::Duration};
use tracing::debug;

use crate::aws::TrustRelationship;

/// Where AWS credentials come from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CredentialSourceKind {
    /// Exchange a Google ID token through STS AssumeRoleWithWebIdentity
    #[default]
    WebIdentity,
    /// AWS SDK default credential chain
    Ambient,
}

impl FromStr for CredentialSourceKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "web-identity" => Ok(Self::WebIdentity),
            "ambient" => Ok(Self::Ambient),
            other => bail!("Unknown credential_source '{other}', expected 'web-identity' or 'ambient'"),
        }
    }
}

impl fmt::Display for CredentialSourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WebIdentity => f.write_str("web-identity"),
            Self::Ambient => f.write_str("ambient"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub audience: String,
    pub gcp_credential_file: Option<PathBuf>,
    pub role_arn: Option<String>,
    pub session_name: Option<String>,
    pub duration_seconds: i32,
    pub refresh_margin_seconds: u64,
    pub timeout_seconds: u64,
    pub region: Option<String>,
    pub credential_source: CredentialSourceKind,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            audience: DEFAULT_AUDIENCE.to_string(),
            gcp_credential_file: None,
            role_arn: None,
            session_name: None,
            duration_seconds: DEFAULT_SESSION_DURATION_SECONDS,
            refresh_margin_seconds: DEFAULT_REFRESH_MARGIN_SECONDS,
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            region: None,
            credential_source: CredentialSourceKind::default(),
        }
    }
}

impl Config {
    fn from_ini_section(section: &Properties) -> Result<Self> {
        let defaults = Self::default();

        let timeout_seconds = parse_or(section, "timeout_seconds", defaults.timeout_seconds)?;
        if timeout_seconds == 0 {
            bail!("timeout_seconds must be greater than zero");
        }

        Ok(Self {
            audience: section
                .get("audience")
                .map_or(defaults.audience, str::to_string),
            gcp_credential_file: section.get("gcp_credential_file").map(PathBuf::from),
            role_arn: section.get("role_arn").map(str::to_string),
            session_name: section.get("session_name").map(str::to_string),
            duration_seconds: parse_or(section, "duration_seconds", defaults.duration_seconds)?,
            refresh_margin_seconds: parse_or(
                section,
                "refresh_margin_seconds",
                defaults.refresh_margin_seconds,
            )?,
            timeout_seconds,
            region: section.get("region").map(str::to_string),
            credential_source: section
                .get("credential_source")
                .map(CredentialSourceKind::from_str)
                .transpose()?
                .unwrap_or_default(),
        })
    }

    pub fn refresh_margin(&self) -> Duration {
        Duration::from_secs(self.refresh_margin_seconds)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Build the STS trust relationship; requires a role ARN
    pub fn trust_relationship(&self) -> Result<TrustRelationship> {
        let role_arn = self
            .role_arn
            .as_deref()
            .filter(|arn| !arn.is_empty())
            .context("AWS role ARN is required. Pass --aws-arn or set role_arn in the config file")?;

        if !(MIN_SESSION_DURATION_SECONDS..=MAX_SESSION_DURATION_SECONDS)
            .contains(&self.duration_seconds)
        {
            bail!(
                "Session duration must be between {} and {} seconds, got {}",
                MIN_SESSION_DURATION_SECONDS,
                MAX_SESSION_DURATION_SECONDS,
                self.duration_seconds
            );
        }

        let relationship =
            TrustRelationship::new(role_arn).with_duration_seconds(self.duration_seconds);

        Ok(match &self.session_name {
            Some(name) => relationship.with_session_name(name),
            None => relationship,
        })
    }
}

fn parse_or<T>(section: &Properties, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    section
        .get(key)
        .map(|value| {
            value
                .trim()
                .parse()
                .with_context(|| format!("Invalid value for {key}: '{value}'"))
        })
        .transpose()
        .map(|value| value.unwrap_or(default))
}

fn section_name(profile: &str) -> String {
    if profile == "default" {
        profile.to_string()
    } else {
        format!("profile {profile}")
    }
}

/// Load settings for `profile`; a missing file or profile yields defaults
pub async fn load(profile: &str) -> Result<Config> {
    match constants::get_config_path() {
        Some(path) => load_from(&path, profile),
        None => Ok(Config::default()),
    }
}

pub fn load_from(path: &std::path::Path, profile: &str) -> Result<Config> {
    if !path.exists() {
        debug!("No config file at {}, using defaults", path.display());
        return Ok(Config::default());
    }

    let ini = Ini::load_from_file(path)
        .with_context(|| format!("Failed to load config file: {}", path.display()))?;

    match ini.section(Some(section_name(profile))) {
        Some(section) => Config::from_ini_section(section)
            .with_context(|| format!("Invalid settings for profile '{profile}'")),
        None => {
            debug!("Profile '{}' not found in {}, using defaults", profile, path.display());
            Ok(Config::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    #[test]
    fn test_config_from_ini_section() {
        let mut props = Properties::new();
        props.insert("audience", "https://foo.bar");
        props.insert("gcp_credential_file", "/path/to/svc.json");
        props.insert("role_arn", "arn:aws:iam::291738886548:role/s3webreaderrole");
        props.insert("session_name", "app1");
        props.insert("duration_seconds", "900");
        props.insert("refresh_margin_seconds", "120");
        props.insert("timeout_seconds", "10");
        props.insert("region", "us-east-2");
        props.insert("credential_source", "ambient");

        let config = Config::from_ini_section(&props).unwrap();

        assert_eq!(config.audience, "https://foo.bar");
        assert_eq!(
            config.gcp_credential_file,
            Some(PathBuf::from("/path/to/svc.json"))
        );
        assert_eq!(
            config.role_arn.as_deref(),
            Some("arn:aws:iam::291738886548:role/s3webreaderrole")
        );
        assert_eq!(config.session_name.as_deref(), Some("app1"));
        assert_eq!(config.duration_seconds, 900);
        assert_eq!(config.refresh_margin(), Duration::from_secs(120));
        assert_eq!(config.timeout(), Duration::from_secs(10));
        assert_eq!(config.region.as_deref(), Some("us-east-2"));
        assert_eq!(config.credential_source, CredentialSourceKind::Ambient);
    }

    #[test]
    fn test_config_from_ini_section_with_defaults() {
        let config = Config::from_ini_section(&Properties::new()).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.audience, DEFAULT_AUDIENCE);
        assert_eq!(config.credential_source, CredentialSourceKind::WebIdentity);
    }

    #[test]
    fn test_config_rejects_bad_numbers() {
        let mut props = Properties::new();
        props.insert("duration_seconds", "an hour");
        let err = Config::from_ini_section(&props).unwrap_err();
        assert!(err.to_string().contains("duration_seconds"));
    }

    #[test]
    fn test_config_rejects_zero_timeout() {
        let mut props = Properties::new();
        props.insert("timeout_seconds", "0");
        let err = Config::from_ini_section(&props).unwrap_err();
        assert!(err.to_string().contains("timeout_seconds"));
    }

    #[test]
    fn test_config_rejects_unknown_source() {
        let mut props = Properties::new();
        props.insert("credential_source", "instance-profile");
        assert!(Config::from_ini_section(&props).is_err());
    }

    #[test]
    fn test_trust_relationship_requires_role_arn() {
        let err = Config::default().trust_relationship().unwrap_err();
        assert!(err.to_string().contains("--aws-arn"));
    }

    #[test]
    fn test_trust_relationship_validates_duration() {
        let config = Config {
            role_arn: Some("arn:aws:iam::123456789012:role/reader".to_string()),
            duration_seconds: 60,
            ..Config::default()
        };
        assert!(config.trust_relationship().is_err());
    }

    #[test]
    fn test_trust_relationship_uses_session_name() {
        let config = Config {
            role_arn: Some("arn:aws:iam::123456789012:role/reader".to_string()),
            session_name: Some("AssumeRoleSession1".to_string()),
            duration_seconds: 900,
            ..Config::default()
        };

        let relationship = config.trust_relationship().unwrap();
        assert_eq!(relationship.role_arn, "arn:aws:iam::123456789012:role/reader");
        assert_eq!(relationship.session_name, "AssumeRoleSession1");
        assert_eq!(relationship.duration_seconds, 900);
    }

    #[test]
    fn test_load_from_profiles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config");
        std::fs::write(
            &path,
            "[default]\nrole_arn = arn:aws:iam::1:role/default\n\n[profile prod]\nrole_arn = arn:aws:iam::2:role/prod\nregion = eu-west-1\n",
        )
        .unwrap();

        let default = load_from(&path, "default").unwrap();
        assert_eq!(default.role_arn.as_deref(), Some("arn:aws:iam::1:role/default"));

        let prod = load_from(&path, "prod").unwrap();
        assert_eq!(prod.role_arn.as_deref(), Some("arn:aws:iam::2:role/prod"));
        assert_eq!(prod.region.as_deref(), Some("eu-west-1"));

        let missing = load_from(&path, "staging").unwrap();
        assert_eq!(missing, Config::default());
    }

    #[test]
    fn test_load_from_missing_file() {
        let config = load_from(std::path::Path::new("/nonexistent/awscompat/config"), "default")
            .unwrap();
        assert_eq!(config, Config::default());
    }

    #[tokio::test]
    #[serial]
    async fn test_load_honours_env_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config");
        std::fs::write(&path, "[default]\naudience = https://foo.bar\n").unwrap();
        let original = env::var("AWSCOMPAT_CONFIG_FILE").ok();

        unsafe {
            env::set_var("AWSCOMPAT_CONFIG_FILE", &path);
        }
        let config = load("default").await;

        unsafe {
            match original {
                Some(val) => env::set_var("AWSCOMPAT_CONFIG_FILE", val),
                None => env::remove_var("AWSCOMPAT_CONFIG_FILE"),
            }
        }

        assert_eq!(config.unwrap().audience, "https://foo.bar");
    }
}
