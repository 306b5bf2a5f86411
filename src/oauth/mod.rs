pub mod google;
pub mod jwt_validation;
pub mod state;

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

pub use google::GoogleOAuthClient;

/// OAuth provider failures
#[derive(Debug, Error)]
pub enum OAuthError {
    #[error("token exchange failed: {0}")]
    Exchange(String),
    #[error("profile fetch failed: {0}")]
    ProfileFetch(String),
    #[error("profile has no email address")]
    MissingEmail,
    #[error("token response has no '{0}' field")]
    MissingExtra(String),
    #[error("token response field '{0}' is not a non-empty string")]
    MalformedExtra(String),
    #[error("OAuth client misconfigured: {0}")]
    Configuration(String),
}

/// OAuth callback query parameters
#[derive(Debug, Clone, Deserialize)]
pub struct OAuthCallback {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// Token endpoint response
///
/// Fields outside the standard set (notably `id_token`) land in `extra` and are
/// only read through the checked accessors below.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenBundle {
    pub access_token: String,
    #[serde(default)]
    pub token_type: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl TokenBundle {
    /// Bundle holding only an access token, as returned by minimal providers
    #[must_use]
    pub fn bearer(access_token: &str) -> Self {
        Self {
            access_token: access_token.to_string(),
            token_type: "Bearer".to_string(),
            expires_in: None,
            refresh_token: None,
            scope: None,
            extra: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_extra(mut self, key: &str, value: serde_json::Value) -> Self {
        self.extra.insert(key.to_string(), value);
        self
    }

    /// Read a string-valued extra field
    ///
    /// # Errors
    ///
    /// `MissingExtra` when the field is absent, `MalformedExtra` when it is
    /// not a non-empty string.
    pub fn extra_str(&self, key: &str) -> Result<&str, OAuthError> {
        match self.extra.get(key) {
            None | Some(serde_json::Value::Null) => Err(OAuthError::MissingExtra(key.to_string())),
            Some(serde_json::Value::String(s)) if !s.is_empty() => Ok(s),
            Some(_) => Err(OAuthError::MalformedExtra(key.to_string())),
        }
    }

    /// The OpenID Connect ID token returned alongside the access token
    ///
    /// # Errors
    ///
    /// See [`TokenBundle::extra_str`].
    pub fn id_token(&self) -> Result<&str, OAuthError> {
        self.extra_str("id_token")
    }
}

/// User profile as reported by the OAuth provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthProfile {
    pub subject: Option<String>,
    pub email: String,
    pub name: Option<String>,
    pub picture: Option<String>,
}

#[async_trait]
pub trait OAuthClient: Send + Sync {
    /// Provider authorization URL carrying `state`
    ///
    /// # Errors
    ///
    /// Returns `Configuration` when the client id is missing or the endpoint is invalid.
    fn authorization_url(&self, state: &str) -> Result<String, OAuthError>;

    /// Exchange an authorization code for tokens
    ///
    /// # Errors
    ///
    /// Returns `Exchange` on transport failures and non-success responses.
    async fn exchange_code(&self, code: &str) -> Result<TokenBundle, OAuthError>;

    /// Fetch the user's profile with the bundle's access token
    ///
    /// # Errors
    ///
    /// Returns `ProfileFetch` on failures and `MissingEmail` when the profile has no email.
    async fn fetch_profile(&self, tokens: &TokenBundle) -> Result<OAuthProfile, OAuthError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_token_bundle_keeps_unknown_fields_as_extras() {
        let bundle: TokenBundle = serde_json::from_value(json!({
            "access_token": "ya29",
            "token_type": "Bearer",
            "expires_in": 3599,
            "scope": "openid email",
            "id_token": "header.payload.sig"
        }))
        .unwrap();

        assert_eq!(bundle.access_token, "ya29");
        assert_eq!(bundle.expires_in, Some(3599));
        assert_eq!(bundle.id_token().unwrap(), "header.payload.sig");
        assert!(!bundle.extra.contains_key("access_token"));
    }

    #[test]
    fn test_id_token_accessor_errors() {
        let bundle = TokenBundle::bearer("t");
        assert!(matches!(bundle.id_token(), Err(OAuthError::MissingExtra(k)) if k == "id_token"));

        let bundle = TokenBundle::bearer("t").with_extra("id_token", json!(42));
        assert!(matches!(bundle.id_token(), Err(OAuthError::MalformedExtra(_))));

        let bundle = TokenBundle::bearer("t").with_extra("id_token", json!(""));
        assert!(matches!(bundle.id_token(), Err(OAuthError::MalformedExtra(_))));

        let bundle = TokenBundle::bearer("t").with_extra("id_token", json!(null));
        assert!(matches!(bundle.id_token(), Err(OAuthError::MissingExtra(_))));
    }
}
