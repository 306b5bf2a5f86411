//! Firebase Authentication over the Identity Toolkit REST API
//!
//! Admin calls authenticate with an OAuth2 access token obtained through the
//! JWT-bearer grant, signed with the service-account key. Custom tokens are
//! signed locally with the same key. The key is parsed once and the access
//! token is reused until shortly before it expires.

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use log::{debug, warn};
use rsa::RsaPrivateKey;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::RwLock;

use super::{IdentityError, IdentityProvider, ServiceAccount, VerifiedClaims};
use crate::models::{Identity, NewIdentity};
use crate::oauth::jwt_validation::IdTokenVerifier;
use crate::settings::AuthBridgeSettings;
use crate::utils::crypto::{create_jwt_header, create_jwt_payload, create_jwt_with_key};

/// Audience of Firebase custom tokens
pub const CUSTOM_TOKEN_AUDIENCE: &str =
    "https://identitytoolkit.googleapis.com/google.identity.identitytoolkit.v1.IdentityToolkit";

/// Scopes requested for admin access tokens
const ADMIN_SCOPES: &str =
    "https://www.googleapis.com/auth/identitytoolkit https://www.googleapis.com/auth/cloud-platform";

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

const TOKEN_LIFETIME_MINUTES: i64 = 60;

/// Refresh the admin access token this long before it expires
const TOKEN_REFRESH_MARGIN_SECONDS: i64 = 60;

fn default_expires_in() -> i64 {
    3600
}

/// Provider error codes that mean "the request fields were rejected"
const INPUT_ERROR_CODES: &[&str] = &[
    "INVALID_EMAIL",
    "WEAK_PASSWORD",
    "INVALID_PASSWORD",
    "INVALID_DISPLAY_NAME",
    "INVALID_PHOTO_URL",
];

/// Provider error codes that mean "wrong email/password pair"
const CREDENTIAL_ERROR_CODES: &[&str] = &[
    "INVALID_PASSWORD",
    "MISSING_PASSWORD",
    "EMAIL_NOT_FOUND",
    "INVALID_LOGIN_CREDENTIALS",
    "USER_DISABLED",
];

pub struct FirebaseAuthClient {
    http: reqwest::Client,
    account: ServiceAccount,
    signing_key: RsaPrivateKey,
    admin_token: RwLock<Option<CachedAccessToken>>,
    api_base_url: String,
    api_key: Option<String>,
    verifier: IdTokenVerifier,
}

#[derive(Debug, Clone)]
struct CachedAccessToken {
    token: String,
    expires_at: DateTime<Utc>,
}

impl CachedAccessToken {
    fn is_usable(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(TOKEN_REFRESH_MARGIN_SECONDS) < self.expires_at
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserRecord {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<UserRecord>,
}

#[derive(Debug, Deserialize)]
struct AccessTokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

impl FirebaseAuthClient {
    /// Create a client, parsing the service-account signing key
    ///
    /// # Errors
    ///
    /// Returns an error if the service-account private key cannot be parsed.
    pub fn new(
        http: reqwest::Client,
        account: ServiceAccount,
        api_base_url: &str,
        api_key: Option<String>,
        verifier: IdTokenVerifier,
    ) -> anyhow::Result<Self> {
        let signing_key = account.signing_key()?;
        Ok(Self {
            http,
            account,
            signing_key,
            admin_token: RwLock::new(None),
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            api_key,
            verifier,
        })
    }

    /// Build the client from settings, reading the service-account file
    ///
    /// # Errors
    ///
    /// Returns an error if the service-account file is missing or invalid.
    pub fn from_settings(settings: &AuthBridgeSettings) -> anyhow::Result<Self> {
        let account = ServiceAccount::from_file(Path::new(&settings.identity.credentials_file))?;
        let http = reqwest::Client::new();
        let verifier = IdTokenVerifier::from_google_settings(http.clone(), &settings.google);
        debug!(
            "Identity provider client for project '{}' as {}",
            account.project_id, account.client_email
        );
        Self::new(
            http,
            account,
            &settings.identity.api_base_url,
            settings.identity.api_key.clone(),
            verifier,
        )
    }

    fn project_url(&self, suffix: &str) -> String {
        format!(
            "{}/v1/projects/{}/{suffix}",
            self.api_base_url, self.account.project_id
        )
    }

    fn sign(&self, payload: &serde_json::Value) -> Result<String, IdentityError> {
        let header = create_jwt_header(self.account.private_key_id.as_deref());
        create_jwt_with_key(&header, payload, &self.signing_key)
            .map_err(|e| IdentityError::Configuration(e.to_string()))
    }

    /// Return a cached admin access token, fetching a new one when it is close to expiry
    async fn access_token(&self) -> Result<String, IdentityError> {
        {
            let cached = self.admin_token.read().await;
            if let Some(token) = cached.as_ref().filter(|t| t.is_usable(Utc::now())) {
                return Ok(token.token.clone());
            }
        }

        let mut cached = self.admin_token.write().await;
        // Another request may have refreshed while we waited for the lock
        if let Some(token) = cached.as_ref().filter(|t| t.is_usable(Utc::now())) {
            return Ok(token.token.clone());
        }

        let fresh = self.fetch_access_token().await?;
        let token = fresh.token.clone();
        *cached = Some(fresh);
        Ok(token)
    }

    /// Exchange a signed assertion for an admin access token
    async fn fetch_access_token(&self) -> Result<CachedAccessToken, IdentityError> {
        let claims = json!({ "scope": ADMIN_SCOPES });
        let payload = create_jwt_payload(
            &self.account.client_email,
            &self.account.client_email,
            &self.account.token_uri,
            TOKEN_LIFETIME_MINUTES,
            Some(&claims),
        );
        let assertion = self.sign(&payload)?;

        let response = self
            .http
            .post(&self.account.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(IdentityError::Provider {
                code: format!("TOKEN_ENDPOINT_{}", status.as_u16()),
                message: body,
            });
        }

        let issued = response.json::<AccessTokenResponse>().await?;
        debug!("Obtained admin access token valid for {}s", issued.expires_in);
        Ok(CachedAccessToken {
            token: issued.access_token,
            expires_at: Utc::now() + Duration::seconds(issued.expires_in),
        })
    }

    /// POST an admin request and return the successful JSON body
    async fn admin_post<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        body: &serde_json::Value,
    ) -> Result<T, IdentityError> {
        let token = self.access_token().await?;
        let response = self
            .http
            .post(url)
            .bearer_auth(token)
            .json(body)
            .send()
            .await?;
        Self::read_json(response).await
    }

    async fn read_json<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, IdentityError> {
        if response.status().is_success() {
            return Ok(response.json::<T>().await?);
        }

        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorEnvelope>(&text)
            .map(|envelope| envelope.error.message)
            .unwrap_or_else(|_| format!("HTTP {status}: {text}"));
        Err(classify_error(&message))
    }
}

/// Map an Identity Toolkit error message (e.g. `WEAK_PASSWORD : Password should be ...`)
/// onto an [`IdentityError`]
#[must_use]
pub fn classify_error(message: &str) -> IdentityError {
    let code = error_code(message);
    match code {
        "EMAIL_EXISTS" | "DUPLICATE_EMAIL" => IdentityError::EmailExists,
        c if INPUT_ERROR_CODES.contains(&c) || c.starts_with("MISSING_") => {
            IdentityError::InvalidInput(message.to_string())
        }
        c if c.starts_with("INVALID_ID_TOKEN") || c == "TOKEN_EXPIRED" => {
            IdentityError::InvalidToken(message.to_string())
        }
        _ => IdentityError::Provider {
            code: code.to_string(),
            message: message.to_string(),
        },
    }
}

fn error_code(message: &str) -> &str {
    message.split(':').next().unwrap_or_default().trim()
}

#[async_trait]
impl IdentityProvider for FirebaseAuthClient {
    async fn create_user(&self, new_identity: &NewIdentity) -> Result<Identity, IdentityError> {
        let mut body = json!({ "email": new_identity.email });
        if let Some(password) = &new_identity.password {
            body["password"] = json!(password);
        }
        if let Some(name) = &new_identity.display_name {
            body["displayName"] = json!(name);
        }
        if let Some(photo) = &new_identity.photo_url {
            body["photoUrl"] = json!(photo);
        }

        let record: UserRecord = self.admin_post(&self.project_url("accounts"), &body).await?;
        debug!("Created identity {} for {}", record.local_id, new_identity.email);

        Ok(Identity {
            id: record.local_id,
            email: record.email.unwrap_or_else(|| new_identity.email.clone()),
            display_name: record
                .display_name
                .or_else(|| new_identity.display_name.clone())
                .unwrap_or_default(),
        })
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<Identity>, IdentityError> {
        let body = json!({ "email": [email] });
        let lookup: LookupResponse = self
            .admin_post(&self.project_url("accounts:lookup"), &body)
            .await?;

        Ok(lookup.users.into_iter().next().map(|record| Identity {
            id: record.local_id,
            email: record.email.unwrap_or_else(|| email.to_string()),
            display_name: record.display_name.unwrap_or_default(),
        }))
    }

    async fn custom_token(&self, uid: &str) -> Result<String, IdentityError> {
        let claims = json!({ "uid": uid });
        let payload = create_jwt_payload(
            &self.account.client_email,
            &self.account.client_email,
            CUSTOM_TOKEN_AUDIENCE,
            TOKEN_LIFETIME_MINUTES,
            Some(&claims),
        );
        self.sign(&payload)
    }

    async fn verify_id_token(&self, id_token: &str) -> Result<VerifiedClaims, IdentityError> {
        let claims = self.verifier.verify(id_token).await.map_err(|e| {
            if e.is_token_rejection() {
                IdentityError::InvalidToken(e.to_string())
            } else if matches!(e, crate::oauth::jwt_validation::JwtValidationError::Configuration(_)) {
                IdentityError::Configuration(e.to_string())
            } else {
                IdentityError::Transport(e.to_string())
            }
        })?;

        let email_verified = claims.email_verified();
        Ok(VerifiedClaims {
            subject: claims.sub.unwrap_or_default(),
            email: claims.email,
            email_verified,
            name: claims.name,
            picture: claims.picture,
        })
    }

    async fn verify_password(&self, email: &str, password: &str) -> Result<bool, IdentityError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(IdentityError::Configuration(
                "password verification requires an identity api_key".to_string(),
            ));
        };

        let response = self
            .http
            .post(format!("{}/v1/accounts:signInWithPassword", self.api_base_url))
            .query(&[("key", api_key)])
            .json(&json!({
                "email": email,
                "password": password,
                "returnSecureToken": false
            }))
            .send()
            .await?;

        match Self::read_json::<serde_json::Value>(response).await {
            Ok(_) => Ok(true),
            Err(IdentityError::InvalidInput(message) | IdentityError::Provider { message, .. })
                if CREDENTIAL_ERROR_CODES.contains(&error_code(&message)) =>
            {
                Ok(false)
            }
            Err(e) => {
                warn!("Password verification failed upstream: {e}");
                Err(e)
            }
        }
    }
}
