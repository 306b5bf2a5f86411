// ID token validation against the OAuth provider's published JWKS
// RS256 signature verification plus iss/aud/exp/nbf/email_verified checks

use std::sync::Arc;
use std::time::Duration;

use base64::Engine as _;
use chrono::{DateTime, Utc};
use log::{debug, warn};
use rsa::{pkcs1v15::VerifyingKey, RsaPublicKey};
use serde::Deserialize;
use sha2::Sha256;
use tokio::sync::RwLock;

use crate::settings::GoogleSettings;

/// Allowed clock drift when checking `exp` and `nbf`
pub const DEFAULT_CLOCK_SKEW_SECONDS: i64 = 300;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug)]
pub enum JwtValidationError {
    KeyNotFound(String),
    SignatureInvalid,
    ClaimValidationFailed {
        claim: String,
        expected: String,
        actual: String,
    },
    JwksFetchFailed(String),
    UnsupportedAlgorithm(String),
    TokenExpired,
    TokenNotYetValid,
    EmailNotVerified,
    InvalidToken(String),
    KeyDecodingFailed(String),
    Configuration(String),
}

impl std::fmt::Display for JwtValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::KeyNotFound(kid) => write!(f, "Key not found: {kid}"),
            Self::SignatureInvalid => write!(f, "JWT signature verification failed"),
            Self::ClaimValidationFailed {
                claim,
                expected,
                actual,
            } => {
                write!(
                    f,
                    "Claim '{claim}' validation failed: expected '{expected}', got '{actual}'"
                )
            }
            Self::JwksFetchFailed(msg) => write!(f, "Failed to fetch JWKS: {msg}"),
            Self::UnsupportedAlgorithm(alg) => write!(f, "Unsupported algorithm: {alg}"),
            Self::TokenExpired => write!(f, "Token has expired"),
            Self::TokenNotYetValid => write!(f, "Token is not yet valid"),
            Self::EmailNotVerified => write!(f, "Token email is not verified"),
            Self::InvalidToken(msg) => write!(f, "Invalid token: {msg}"),
            Self::KeyDecodingFailed(msg) => write!(f, "Failed to decode key: {msg}"),
            Self::Configuration(msg) => write!(f, "Validator misconfigured: {msg}"),
        }
    }
}

impl std::error::Error for JwtValidationError {}

impl JwtValidationError {
    /// Whether the failure is attributable to the presented token rather than
    /// to key retrieval or local configuration
    #[must_use]
    pub fn is_token_rejection(&self) -> bool {
        !matches!(self, Self::JwksFetchFailed(_) | Self::Configuration(_))
    }
}

// ============================================================================
// JWT Structures
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct JwtHeader {
    pub alg: String,
    pub typ: Option<String>,
    pub kid: Option<String>,
}

/// Claims read from an OAuth provider ID token
#[derive(Debug, Clone, Deserialize)]
pub struct IdTokenClaims {
    pub iss: Option<String>,
    pub aud: Option<serde_json::Value>, // string or array
    pub exp: Option<i64>,
    pub nbf: Option<i64>,
    pub iat: Option<i64>,
    pub sub: Option<String>,
    pub email: Option<String>,
    /// Bool in current tokens; some issuers still send `"true"`/`"false"`
    pub email_verified: Option<serde_json::Value>,
    pub name: Option<String>,
    pub picture: Option<String>,
}

impl IdTokenClaims {
    #[must_use]
    pub fn email_verified(&self) -> Option<bool> {
        match self.email_verified.as_ref()? {
            serde_json::Value::Bool(b) => Some(*b),
            serde_json::Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    #[must_use]
    pub fn audiences(&self) -> Vec<String> {
        match &self.aud {
            Some(serde_json::Value::String(aud)) => vec![aud.clone()],
            Some(serde_json::Value::Array(values)) => values
                .iter()
                .filter_map(|v| v.as_str().map(ToString::to_string))
                .collect(),
            _ => vec![],
        }
    }
}

// ============================================================================
// JWKS Structures
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct JsonWebKeySet {
    pub keys: Vec<JsonWebKey>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JsonWebKey {
    pub kty: String,
    pub kid: Option<String>,
    pub alg: Option<String>,
    #[serde(rename = "use")]
    pub key_use: Option<String>,
    pub n: Option<String>,
    pub e: Option<String>,
}

impl JsonWebKeySet {
    /// Select the verification key for a token header
    ///
    /// A header without `kid` is accepted only when the set holds exactly one key.
    ///
    /// # Errors
    ///
    /// Returns `KeyNotFound` when no key matches.
    pub fn find(&self, kid: Option<&str>) -> Result<&JsonWebKey, JwtValidationError> {
        match kid {
            Some(kid) => self
                .keys
                .iter()
                .find(|key| key.kid.as_deref() == Some(kid))
                .ok_or_else(|| JwtValidationError::KeyNotFound(kid.to_string())),
            None if self.keys.len() == 1 => Ok(&self.keys[0]),
            None => Err(JwtValidationError::KeyNotFound("<no kid>".to_string())),
        }
    }
}

// ============================================================================
// JWKS Cache
// ============================================================================

/// Last fetched key set, with its age and the time of the last failed fetch
pub struct JwksCache {
    keys: Option<JsonWebKeySet>,
    last_updated: Option<DateTime<Utc>>,
    last_failure: Option<DateTime<Utc>>,
    cache_duration: Duration,
    retry_backoff: Duration,
}

impl Default for JwksCache {
    fn default() -> Self {
        Self::new()
    }
}

impl JwksCache {
    #[must_use]
    pub fn new() -> Self {
        Self {
            keys: None,
            last_updated: None,
            last_failure: None,
            cache_duration: Duration::from_secs(3600), // 1 hour default
            retry_backoff: Duration::from_secs(60),
        }
    }

    #[must_use]
    pub fn with_cache_duration(mut self, duration: Duration) -> Self {
        self.cache_duration = duration;
        self
    }

    /// Cached keys, if they are younger than the cache duration
    #[must_use]
    pub fn fresh_keys(&self, now: DateTime<Utc>) -> Option<&JsonWebKeySet> {
        let last_updated = self.last_updated?;
        let elapsed = now.signed_duration_since(last_updated);
        if elapsed.to_std().unwrap_or(Duration::ZERO) < self.cache_duration {
            self.keys.as_ref()
        } else {
            None
        }
    }

    /// Cached keys regardless of age
    #[must_use]
    pub fn stale_keys(&self) -> Option<&JsonWebKeySet> {
        self.keys.as_ref()
    }

    /// Whether fresh keys are old enough to be replaced ahead of expiry
    #[must_use]
    pub fn may_refresh_early(&self, now: DateTime<Utc>) -> bool {
        if let Some(last_updated) = self.last_updated {
            let elapsed = now.signed_duration_since(last_updated);
            elapsed.to_std().unwrap_or(Duration::ZERO) >= self.retry_backoff
        } else {
            true
        }
    }

    /// Check if we should retry after a failed fetch
    #[must_use]
    pub fn should_retry_fetch(&self, now: DateTime<Utc>) -> bool {
        if let Some(last_failure) = self.last_failure {
            let elapsed = now.signed_duration_since(last_failure);
            elapsed.to_std().unwrap_or(Duration::ZERO) >= self.retry_backoff
        } else {
            true
        }
    }

    pub fn store_keys(&mut self, keys: JsonWebKeySet, now: DateTime<Utc>) {
        debug!("💾 Cached {} JWKS keys", keys.keys.len());
        self.keys = Some(keys);
        self.last_updated = Some(now);
        self.last_failure = None;
    }

    pub fn record_fetch_failure(&mut self, now: DateTime<Utc>) {
        self.last_failure = Some(now);
    }
}

// ============================================================================
// Verifier
// ============================================================================

/// Verifies ID tokens issued by the OAuth provider
///
/// Keys are cached for an hour and refetched early when a token names a key
/// id the cache does not hold. Clones share the cache.
#[derive(Clone)]
pub struct IdTokenVerifier {
    http: reqwest::Client,
    jwks_uri: String,
    issuers: Vec<String>,
    audience: Option<String>,
    clock_skew_seconds: i64,
    cache: Arc<RwLock<JwksCache>>,
}

impl IdTokenVerifier {
    #[must_use]
    pub fn new(
        http: reqwest::Client,
        jwks_uri: &str,
        issuers: Vec<String>,
        audience: Option<String>,
    ) -> Self {
        Self {
            http,
            jwks_uri: jwks_uri.to_string(),
            issuers,
            audience,
            clock_skew_seconds: DEFAULT_CLOCK_SKEW_SECONDS,
            cache: Arc::new(RwLock::new(JwksCache::new())),
        }
    }

    /// Build a verifier for Google ID tokens whose audience is our OAuth client id
    #[must_use]
    pub fn from_google_settings(http: reqwest::Client, google: &GoogleSettings) -> Self {
        Self::new(
            http,
            &google.jwks_uri,
            google.issuers.clone(),
            google.get_client_id(),
        )
    }

    /// Verify `token` against the cached key set, fetching it when needed
    ///
    /// # Errors
    ///
    /// Returns an error if keys cannot be obtained or the token is rejected.
    pub async fn verify(&self, token: &str) -> Result<IdTokenClaims, JwtValidationError> {
        let jwks = self.keys_for(token_key_id(token).as_deref()).await?;
        self.verify_with_keys(token, &jwks, Utc::now().timestamp())
    }

    async fn keys_for(&self, kid: Option<&str>) -> Result<JsonWebKeySet, JwtValidationError> {
        let now = Utc::now();
        {
            let cache = self.cache.read().await;
            if let Some(keys) = cache.fresh_keys(now) {
                // Unknown kids refetch at most once per backoff window
                if keys.find(kid).is_ok() || !cache.may_refresh_early(now) {
                    return Ok(keys.clone());
                }
                debug!("🔄 Key {kid:?} not in cached JWKS, refetching");
            }
            if !cache.should_retry_fetch(now) {
                return cache.stale_keys().cloned().ok_or_else(|| {
                    JwtValidationError::JwksFetchFailed(
                        "recent fetch failed, backing off".to_string(),
                    )
                });
            }
        }

        match self.fetch_jwks().await {
            Ok(keys) => {
                self.cache.write().await.store_keys(keys.clone(), now);
                Ok(keys)
            }
            Err(e) => {
                warn!("⚠️  {e}");
                self.cache.write().await.record_fetch_failure(now);
                Err(e)
            }
        }
    }

    async fn fetch_jwks(&self) -> Result<JsonWebKeySet, JwtValidationError> {
        debug!("🔑 Fetching JWKS from {}", self.jwks_uri);
        let response = self
            .http
            .get(&self.jwks_uri)
            .send()
            .await
            .map_err(|e| JwtValidationError::JwksFetchFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(JwtValidationError::JwksFetchFailed(format!(
                "JWKS endpoint returned {}",
                response.status()
            )));
        }

        response
            .json::<JsonWebKeySet>()
            .await
            .map_err(|e| JwtValidationError::JwksFetchFailed(format!("Failed to parse JWKS: {e}")))
    }

    /// Verify `token` against an already fetched key set at time `now`
    ///
    /// # Errors
    ///
    /// Returns an error if the token is malformed, its signature does not
    /// verify, or any claim check fails.
    pub fn verify_with_keys(
        &self,
        token: &str,
        jwks: &JsonWebKeySet,
        now: i64,
    ) -> Result<IdTokenClaims, JwtValidationError> {
        let Some(audience) = self.audience.as_deref() else {
            return Err(JwtValidationError::Configuration(
                "no OAuth client id configured as expected audience".to_string(),
            ));
        };

        let parts: Vec<&str> = token.split('.').collect();
        if parts.len() != 3 {
            return Err(JwtValidationError::InvalidToken(
                "Invalid JWT format".to_string(),
            ));
        }

        let header: JwtHeader = decode_segment(parts[0], "header")?;
        if header.alg != "RS256" {
            return Err(JwtValidationError::UnsupportedAlgorithm(header.alg));
        }

        let key = jwks.find(header.kid.as_deref())?;
        verify_rsa_signature(
            &format!("{}.{}", parts[0], parts[1]),
            parts[2],
            key,
        )?;
        debug!("✅ ID token signature verified");

        let claims: IdTokenClaims = decode_segment(parts[1], "claims")?;
        self.validate_claims(&claims, audience, now)?;
        Ok(claims)
    }

    fn validate_claims(
        &self,
        claims: &IdTokenClaims,
        audience: &str,
        now: i64,
    ) -> Result<(), JwtValidationError> {
        validate_expiration_claims(claims, now, self.clock_skew_seconds)?;

        let issuer = claims.iss.as_deref().unwrap_or_default();
        if !self.issuers.iter().any(|expected| expected == issuer) {
            return Err(JwtValidationError::ClaimValidationFailed {
                claim: "iss".to_string(),
                expected: self.issuers.join(" | "),
                actual: issuer.to_string(),
            });
        }

        let audiences = claims.audiences();
        if !audiences.iter().any(|aud| aud == audience) {
            return Err(JwtValidationError::ClaimValidationFailed {
                claim: "aud".to_string(),
                expected: audience.to_string(),
                actual: format!("{audiences:?}"),
            });
        }

        if matches!(claims.sub.as_deref(), None | Some("")) {
            return Err(JwtValidationError::InvalidToken("missing sub".to_string()));
        }

        if claims.email_verified() == Some(false) {
            return Err(JwtValidationError::EmailNotVerified);
        }

        Ok(())
    }
}

/// `kid` from the token header, if the header decodes at all
fn token_key_id(token: &str) -> Option<String> {
    let header = token.split('.').next()?;
    decode_segment::<JwtHeader>(header, "header").ok()?.kid
}

fn decode_segment<T: serde::de::DeserializeOwned>(
    segment: &str,
    what: &str,
) -> Result<T, JwtValidationError> {
    let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|e| JwtValidationError::InvalidToken(format!("Invalid {what} encoding: {e}")))?;

    serde_json::from_slice(&bytes)
        .map_err(|e| JwtValidationError::InvalidToken(format!("Invalid {what} JSON: {e}")))
}

fn validate_expiration_claims(
    claims: &IdTokenClaims,
    now: i64,
    clock_skew: i64,
) -> Result<(), JwtValidationError> {
    let Some(exp) = claims.exp else {
        return Err(JwtValidationError::InvalidToken("missing exp".to_string()));
    };
    if now > exp + clock_skew {
        return Err(JwtValidationError::TokenExpired);
    }

    if let Some(nbf) = claims.nbf {
        if now < nbf - clock_skew {
            return Err(JwtValidationError::TokenNotYetValid);
        }
    }

    Ok(())
}

fn verify_rsa_signature(
    signing_input: &str,
    signature_b64: &str,
    public_key: &JsonWebKey,
) -> Result<(), JwtValidationError> {
    use rsa::signature::Verifier;

    if public_key.kty != "RSA" {
        return Err(JwtValidationError::KeyDecodingFailed(format!(
            "Expected RSA key, got {}",
            public_key.kty
        )));
    }

    let n = public_key.n.as_ref().ok_or_else(|| {
        JwtValidationError::KeyDecodingFailed("Missing RSA modulus (n)".to_string())
    })?;
    let e = public_key.e.as_ref().ok_or_else(|| {
        JwtValidationError::KeyDecodingFailed("Missing RSA exponent (e)".to_string())
    })?;

    let engine = base64::engine::general_purpose::URL_SAFE_NO_PAD;
    let n_bytes = engine.decode(n).map_err(|e| {
        JwtValidationError::KeyDecodingFailed(format!("Invalid modulus encoding: {e}"))
    })?;
    let e_bytes = engine.decode(e).map_err(|e| {
        JwtValidationError::KeyDecodingFailed(format!("Invalid exponent encoding: {e}"))
    })?;
    let signature = engine.decode(signature_b64).map_err(|e| {
        JwtValidationError::InvalidToken(format!("Invalid signature encoding: {e}"))
    })?;

    let rsa_key = RsaPublicKey::new(
        rsa::BigUint::from_bytes_be(&n_bytes),
        rsa::BigUint::from_bytes_be(&e_bytes),
    )
    .map_err(|e| JwtValidationError::KeyDecodingFailed(format!("Invalid RSA key: {e}")))?;

    let signature = rsa::pkcs1v15::Signature::try_from(signature.as_slice())
        .map_err(|_| JwtValidationError::SignatureInvalid)?;

    VerifyingKey::<Sha256>::new(rsa_key)
        .verify(signing_input.as_bytes(), &signature)
        .map_err(|_| JwtValidationError::SignatureInvalid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine as _;
    use crate::testing::fixtures::{
        sign_test_id_token, test_jwks, OTHER_RSA_MODULUS, TEST_CLIENT_ID, TEST_KEY_ID,
    };
    use serde_json::json;

    const NOW: i64 = 1_700_000_000;

    fn verifier() -> IdTokenVerifier {
        IdTokenVerifier::new(
            reqwest::Client::new(),
            "http://unused/certs",
            vec![
                "https://accounts.google.com".to_string(),
                "accounts.google.com".to_string(),
            ],
            Some(TEST_CLIENT_ID.to_string()),
        )
    }

    fn claims() -> serde_json::Value {
        json!({
            "iss": "https://accounts.google.com",
            "aud": TEST_CLIENT_ID,
            "sub": "google-sub-1",
            "email": "ada@example.com",
            "email_verified": true,
            "name": "Ada Lovelace",
            "picture": "https://img/ada.png",
            "iat": NOW - 10,
            "exp": NOW + 3600,
        })
    }

    #[test]
    fn test_valid_token_yields_claims() {
        let token = sign_test_id_token(&claims());
        let verified = verifier()
            .verify_with_keys(&token, &test_jwks(), NOW)
            .unwrap();
        assert_eq!(verified.email.as_deref(), Some("ada@example.com"));
        assert_eq!(verified.sub.as_deref(), Some("google-sub-1"));
        assert_eq!(verified.email_verified(), Some(true));
    }

    #[test]
    fn test_tampered_payload_fails_signature() {
        let token = sign_test_id_token(&claims());
        let parts: Vec<&str> = token.split('.').collect();
        let mut forged = claims();
        forged["email"] = json!("mallory@example.com");
        let forged_payload = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .encode(serde_json::to_vec(&forged).unwrap());
        let tampered = format!("{}.{}.{}", parts[0], forged_payload, parts[2]);

        let err = verifier()
            .verify_with_keys(&tampered, &test_jwks(), NOW)
            .unwrap_err();
        assert!(matches!(err, JwtValidationError::SignatureInvalid));
        assert!(err.is_token_rejection());
    }

    #[test]
    fn test_wrong_key_fails_signature() {
        let token = sign_test_id_token(&claims());
        let jwks: JsonWebKeySet = serde_json::from_value(json!({
            "keys": [{"kty": "RSA", "kid": TEST_KEY_ID, "alg": "RS256", "n": OTHER_RSA_MODULUS, "e": "AQAB"}]
        }))
        .unwrap();

        let err = verifier().verify_with_keys(&token, &jwks, NOW).unwrap_err();
        assert!(matches!(err, JwtValidationError::SignatureInvalid));
    }

    #[test]
    fn test_expiry_respects_clock_skew() {
        let mut c = claims();
        c["exp"] = json!(NOW - 100);
        let token = sign_test_id_token(&c);
        assert!(verifier().verify_with_keys(&token, &test_jwks(), NOW).is_ok());

        c["exp"] = json!(NOW - DEFAULT_CLOCK_SKEW_SECONDS - 1);
        let token = sign_test_id_token(&c);
        let err = verifier()
            .verify_with_keys(&token, &test_jwks(), NOW)
            .unwrap_err();
        assert!(matches!(err, JwtValidationError::TokenExpired));
    }

    #[test]
    fn test_not_before_in_future_is_rejected() {
        let mut c = claims();
        c["nbf"] = json!(NOW + DEFAULT_CLOCK_SKEW_SECONDS + 60);
        let token = sign_test_id_token(&c);
        let err = verifier()
            .verify_with_keys(&token, &test_jwks(), NOW)
            .unwrap_err();
        assert!(matches!(err, JwtValidationError::TokenNotYetValid));
    }

    #[test]
    fn test_wrong_audience_and_issuer_are_rejected() {
        let mut c = claims();
        c["aud"] = json!(["someone-else"]);
        let token = sign_test_id_token(&c);
        let err = verifier()
            .verify_with_keys(&token, &test_jwks(), NOW)
            .unwrap_err();
        assert!(
            matches!(err, JwtValidationError::ClaimValidationFailed { ref claim, .. } if claim == "aud")
        );

        let mut c = claims();
        c["iss"] = json!("https://evil.example.com");
        let token = sign_test_id_token(&c);
        let err = verifier()
            .verify_with_keys(&token, &test_jwks(), NOW)
            .unwrap_err();
        assert!(
            matches!(err, JwtValidationError::ClaimValidationFailed { ref claim, .. } if claim == "iss")
        );
    }

    #[test]
    fn test_audience_array_containing_client_id_is_accepted() {
        let mut c = claims();
        c["aud"] = json!(["other", TEST_CLIENT_ID]);
        let token = sign_test_id_token(&c);
        assert!(verifier().verify_with_keys(&token, &test_jwks(), NOW).is_ok());
    }

    #[test]
    fn test_unverified_email_is_rejected() {
        let mut c = claims();
        c["email_verified"] = json!("false");
        let token = sign_test_id_token(&c);
        let err = verifier()
            .verify_with_keys(&token, &test_jwks(), NOW)
            .unwrap_err();
        assert!(matches!(err, JwtValidationError::EmailNotVerified));
    }

    #[test]
    fn test_unsupported_algorithm() {
        let header = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let token = format!("{header}.e30.sig");
        let err = verifier()
            .verify_with_keys(&token, &test_jwks(), NOW)
            .unwrap_err();
        assert!(matches!(err, JwtValidationError::UnsupportedAlgorithm(alg) if alg == "HS256"));
    }

    #[test]
    fn test_missing_audience_configuration() {
        let verifier = IdTokenVerifier::new(
            reqwest::Client::new(),
            "http://unused/certs",
            vec!["https://accounts.google.com".to_string()],
            None,
        );
        let err = verifier
            .verify_with_keys(&sign_test_id_token(&claims()), &test_jwks(), NOW)
            .unwrap_err();
        assert!(matches!(err, JwtValidationError::Configuration(_)));
        assert!(!err.is_token_rejection());
    }

    #[test]
    fn test_key_lookup_without_kid() {
        let jwks = test_jwks();
        assert!(jwks.find(None).is_ok());
        assert!(matches!(
            jwks.find(Some("unknown")),
            Err(JwtValidationError::KeyNotFound(_))
        ));
    }

    #[test]
    fn test_jwks_cache_expires_after_cache_duration() {
        let start = Utc::now();
        let mut cache = JwksCache::new().with_cache_duration(Duration::from_secs(600));
        assert!(cache.fresh_keys(start).is_none());

        cache.store_keys(test_jwks(), start);
        assert!(cache.fresh_keys(start + chrono::Duration::seconds(599)).is_some());
        assert!(cache.fresh_keys(start + chrono::Duration::seconds(600)).is_none());
        assert!(cache.stale_keys().is_some());
    }

    #[test]
    fn test_jwks_cache_backs_off_after_failure() {
        let start = Utc::now();
        let mut cache = JwksCache::new();
        assert!(cache.should_retry_fetch(start));

        cache.record_fetch_failure(start);
        assert!(!cache.should_retry_fetch(start + chrono::Duration::seconds(30)));
        assert!(cache.should_retry_fetch(start + chrono::Duration::seconds(60)));

        cache.store_keys(test_jwks(), start + chrono::Duration::seconds(61));
        assert!(cache.should_retry_fetch(start + chrono::Duration::seconds(62)));
    }

    #[test]
    fn test_jwks_cache_limits_early_refresh() {
        let start = Utc::now();
        let mut cache = JwksCache::new();
        assert!(cache.may_refresh_early(start));

        cache.store_keys(test_jwks(), start);
        assert!(!cache.may_refresh_early(start + chrono::Duration::seconds(10)));
        assert!(cache.may_refresh_early(start + chrono::Duration::seconds(60)));
    }

    #[tokio::test]
    async fn test_failed_jwks_fetch_is_not_retried_immediately() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/certs"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let verifier = IdTokenVerifier::new(
            reqwest::Client::new(),
            &format!("{}/certs", server.uri()),
            vec!["https://accounts.google.com".to_string()],
            Some(TEST_CLIENT_ID.to_string()),
        );
        let token = sign_test_id_token(&claims());

        for _ in 0..2 {
            let err = verifier.verify(&token).await.unwrap_err();
            assert!(matches!(err, JwtValidationError::JwksFetchFailed(_)));
        }
    }
}
