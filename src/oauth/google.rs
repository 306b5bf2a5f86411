use async_trait::async_trait;
use serde::Deserialize;

use super::{OAuthClient, OAuthError, OAuthProfile, TokenBundle};
use crate::settings::GoogleSettings;
use crate::utils::logging::LoggingHelper;

const PROVIDER: &str = "google";

/// OAuth 2.0 authorization-code client for Google
#[derive(Clone)]
pub struct GoogleOAuthClient {
    http: reqwest::Client,
    client_id: Option<String>,
    client_secret: Option<String>,
    redirect_url: String,
    scopes: Vec<String>,
    authorization_endpoint: String,
    token_endpoint: String,
    userinfo_endpoint: String,
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    sub: Option<String>,
    email: Option<String>,
    name: Option<String>,
    picture: Option<String>,
}

impl GoogleOAuthClient {
    #[must_use]
    pub fn new(http: reqwest::Client, google: &GoogleSettings) -> Self {
        let client = Self {
            http,
            client_id: google.get_client_id(),
            client_secret: google.get_client_secret(),
            redirect_url: google.redirect_url.clone(),
            scopes: google.scopes.clone(),
            authorization_endpoint: google.authorization_endpoint.clone(),
            token_endpoint: google.token_endpoint.clone(),
            userinfo_endpoint: google.userinfo_endpoint.clone(),
        };
        LoggingHelper::log_oauth_client_init("Google", client.is_configured());
        client
    }

    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.client_id.is_some() && self.client_secret.is_some()
    }

    fn client_id(&self) -> Result<&str, OAuthError> {
        self.client_id
            .as_deref()
            .ok_or_else(|| OAuthError::Configuration("Google client id not configured".to_string()))
    }
}

#[async_trait]
impl OAuthClient for GoogleOAuthClient {
    fn authorization_url(&self, state: &str) -> Result<String, OAuthError> {
        let scopes = self.scopes.join(" ");
        let mut url = url::Url::parse(&self.authorization_endpoint)
            .map_err(|e| OAuthError::Configuration(format!("invalid authorization endpoint: {e}")))?;
        url.query_pairs_mut()
            .append_pair("client_id", self.client_id()?)
            .append_pair("redirect_uri", &self.redirect_url)
            .append_pair("response_type", "code")
            .append_pair("scope", &scopes)
            .append_pair("state", state);

        LoggingHelper::log_oauth_url_built(PROVIDER, &scopes);
        Ok(url.to_string())
    }

    async fn exchange_code(&self, code: &str) -> Result<TokenBundle, OAuthError> {
        let client_id = self.client_id().map_err(|e| OAuthError::Exchange(e.to_string()))?;
        let client_secret = self
            .client_secret
            .as_deref()
            .ok_or_else(|| OAuthError::Exchange("Google client secret not configured".to_string()))?;

        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.redirect_url.as_str()),
            ("client_id", client_id),
            ("client_secret", client_secret),
        ];

        LoggingHelper::log_token_exchange_start(PROVIDER);
        let response = self
            .http
            .post(&self.token_endpoint)
            .form(&params)
            .send()
            .await
            .map_err(|e| OAuthError::Exchange(format!("Failed to exchange code for token: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(OAuthError::Exchange(format!(
                "Token exchange failed with status {status}: {error_text}"
            )));
        }

        let bundle: TokenBundle = response
            .json()
            .await
            .map_err(|e| OAuthError::Exchange(format!("Failed to parse token response: {e}")))?;

        LoggingHelper::log_token_exchange_summary(
            PROVIDER,
            &bundle.token_type,
            bundle.refresh_token.is_some(),
            bundle.extra.contains_key("id_token"),
            bundle.scope.as_deref(),
        );
        Ok(bundle)
    }

    async fn fetch_profile(&self, tokens: &TokenBundle) -> Result<OAuthProfile, OAuthError> {
        let response = self
            .http
            .get(&self.userinfo_endpoint)
            .bearer_auth(&tokens.access_token)
            .send()
            .await
            .map_err(|e| OAuthError::ProfileFetch(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(OAuthError::ProfileFetch(format!(
                "userinfo endpoint returned {status}"
            )));
        }

        let info: UserInfo = response
            .json()
            .await
            .map_err(|e| OAuthError::ProfileFetch(format!("Failed to parse userinfo: {e}")))?;

        let email = info
            .email
            .filter(|email| !email.is_empty())
            .ok_or(OAuthError::MissingEmail)?;

        Ok(OAuthProfile {
            subject: info.sub,
            email,
            name: info.name,
            picture: info.picture,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn settings_for(server_uri: &str) -> GoogleSettings {
        GoogleSettings {
            client_id: Some("client-123".to_string()),
            client_secret: Some("secret-456".to_string()),
            client_id_env: None,
            client_secret_env: None,
            redirect_url: "http://localhost:8000/auth/google/callback".to_string(),
            authorization_endpoint: format!("{server_uri}/o/oauth2/v2/auth"),
            token_endpoint: format!("{server_uri}/token"),
            userinfo_endpoint: format!("{server_uri}/userinfo"),
            ..GoogleSettings::default()
        }
    }

    #[test]
    fn test_authorization_url_parameters() {
        let client = GoogleOAuthClient::new(reqwest::Client::new(), &settings_for("https://accounts.test"));
        let url = url::Url::parse(&client.authorization_url("state-xyz").unwrap()).unwrap();

        assert_eq!(url.path(), "/o/oauth2/v2/auth");
        let pairs: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs["client_id"], "client-123");
        assert_eq!(pairs["redirect_uri"], "http://localhost:8000/auth/google/callback");
        assert_eq!(pairs["response_type"], "code");
        assert_eq!(pairs["scope"], "openid email profile");
        assert_eq!(pairs["state"], "state-xyz");
    }

    #[test]
    fn test_authorization_url_requires_client_id() {
        let mut settings = settings_for("https://accounts.test");
        settings.client_id = None;
        let client = GoogleOAuthClient::new(reqwest::Client::new(), &settings);
        assert!(!client.is_configured());
        assert!(matches!(
            client.authorization_url("s"),
            Err(OAuthError::Configuration(_))
        ));
    }

    #[tokio::test]
    async fn test_exchange_code_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=authorization_code"))
            .and(body_string_contains("code=auth-code-1"))
            .and(body_string_contains("client_secret=secret-456"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "ya29.access",
                "token_type": "Bearer",
                "expires_in": 3599,
                "id_token": "a.b.c"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = GoogleOAuthClient::new(reqwest::Client::new(), &settings_for(&server.uri()));
        let bundle = client.exchange_code("auth-code-1").await.unwrap();
        assert_eq!(bundle.access_token, "ya29.access");
        assert_eq!(bundle.id_token().unwrap(), "a.b.c");
    }

    #[tokio::test]
    async fn test_exchange_code_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(
                ResponseTemplate::new(400).set_body_json(json!({"error": "invalid_grant"})),
            )
            .mount(&server)
            .await;

        let client = GoogleOAuthClient::new(reqwest::Client::new(), &settings_for(&server.uri()));
        let err = client.exchange_code("used-code").await.unwrap_err();
        assert!(matches!(err, OAuthError::Exchange(msg) if msg.contains("invalid_grant")));
    }

    #[tokio::test]
    async fn test_fetch_profile() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/userinfo"))
            .and(header("authorization", "Bearer ya29.access"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "sub": "1234",
                "email": "ada@example.com",
                "email_verified": true,
                "name": "Ada Lovelace",
                "picture": "https://img/ada.png"
            })))
            .mount(&server)
            .await;

        let client = GoogleOAuthClient::new(reqwest::Client::new(), &settings_for(&server.uri()));
        let profile = client
            .fetch_profile(&TokenBundle::bearer("ya29.access"))
            .await
            .unwrap();

        assert_eq!(
            profile,
            OAuthProfile {
                subject: Some("1234".to_string()),
                email: "ada@example.com".to_string(),
                name: Some("Ada Lovelace".to_string()),
                picture: Some("https://img/ada.png".to_string()),
            }
        );
    }

    #[tokio::test]
    async fn test_fetch_profile_without_email() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/userinfo"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"sub": "1234"})))
            .mount(&server)
            .await;

        let client = GoogleOAuthClient::new(reqwest::Client::new(), &settings_for(&server.uri()));
        let err = client
            .fetch_profile(&TokenBundle::bearer("ya29.access"))
            .await
            .unwrap_err();
        assert!(matches!(err, OAuthError::MissingEmail));
    }
}
