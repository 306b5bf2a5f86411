use std::path::Path;

use anyhow::{Context, Result};
use rsa::RsaPrivateKey;
use serde::Deserialize;

use crate::utils::crypto::parse_rsa_private_key;

/// Default OAuth2 token endpoint for service-account assertions
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// The fields of a Google service-account key file this service uses
#[derive(Clone, Deserialize)]
pub struct ServiceAccount {
    pub project_id: String,
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

// Never print the private key
impl std::fmt::Debug for ServiceAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccount")
            .field("project_id", &self.project_id)
            .field("client_email", &self.client_email)
            .field("private_key_id", &self.private_key_id)
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}

impl ServiceAccount {
    /// Read and parse a service-account JSON file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid JSON, or
    /// carries an empty project id, client email or private key.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read service account file {}", path.display()))?;
        Self::from_json(&raw)
            .with_context(|| format!("Invalid service account file {}", path.display()))
    }

    /// Parse a service-account JSON document
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or a required field is empty.
    pub fn from_json(raw: &str) -> Result<Self> {
        let account: Self = serde_json::from_str(raw).context("Failed to parse JSON")?;
        for (name, value) in [
            ("project_id", &account.project_id),
            ("client_email", &account.client_email),
            ("private_key", &account.private_key),
        ] {
            if value.trim().is_empty() {
                anyhow::bail!("service account field '{name}' is empty");
            }
        }
        Ok(account)
    }

    /// Parse the PEM private key into an RSA signing key
    ///
    /// # Errors
    ///
    /// Returns an error if the key is not a PKCS#8 or PKCS#1 RSA key.
    pub fn signing_key(&self) -> Result<RsaPrivateKey> {
        parse_rsa_private_key(&self.private_key).context("Invalid service account private_key")
    }
}
