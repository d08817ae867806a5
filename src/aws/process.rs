use aws_smithy_types::date_time::{DateTimeFormatError, Format};
use serde::{Deserialize, Serialize};

use super::ScopedCredential;

/// Output format for the AWS CLI/SDK `credential_process` setting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProcessCredentials {
    pub version: u8,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: String,
    pub expiration: String,
}

impl ProcessCredentials {
    pub fn new(credentials: &ScopedCredential) -> Result<Self, DateTimeFormatError> {
        Ok(Self {
            version: 1,
            access_key_id: credentials.access_key_id.clone(),
            secret_access_key: credentials.secret_access_key.clone(),
            session_token: credentials.session_token.clone(),
            expiration: credentials.expiration.fmt(Format::DateTime)?,
        })
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
