//! In-memory doubles for the identity provider and the OAuth client
//!
//! Both record how often each operation was called so tests can assert that a
//! failing step stopped the flow before later calls.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::identity::{IdentityError, IdentityProvider, VerifiedClaims};
use crate::models::{Identity, NewIdentity};
use crate::oauth::{OAuthClient, OAuthError, OAuthProfile, TokenBundle};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Clone)]
struct StoredUser {
    identity: Identity,
    password: Option<String>,
    photo_url: Option<String>,
}

/// Identity provider backed by a `HashMap`, keyed by lowercase email
#[derive(Default)]
pub struct InMemoryIdentityProvider {
    users: Mutex<HashMap<String, StoredUser>>,
    accepted_id_tokens: Mutex<HashMap<String, VerifiedClaims>>,
    lookup_failure: Mutex<Option<String>>,
    create_failure: Mutex<Option<String>>,
    token_failure: Mutex<Option<String>>,
    create_calls: AtomicUsize,
    lookup_calls: AtomicUsize,
    custom_token_calls: AtomicUsize,
    verify_id_token_calls: AtomicUsize,
    verify_password_calls: AtomicUsize,
}

impl InMemoryIdentityProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an existing account without counting it as a create call
    pub fn insert(&self, email: &str, password: &str, display_name: &str) -> Identity {
        let identity = Identity {
            id: uuid::Uuid::new_v4().simple().to_string(),
            email: email.to_string(),
            display_name: display_name.to_string(),
        };
        lock(&self.users).insert(
            email.to_lowercase(),
            StoredUser {
                identity: identity.clone(),
                password: Some(password.to_string()),
                photo_url: None,
            },
        );
        identity
    }

    /// Make `id_token` verify successfully with the given claims
    pub fn accept_id_token(&self, id_token: &str, claims: VerifiedClaims) {
        lock(&self.accepted_id_tokens).insert(id_token.to_string(), claims);
    }

    pub fn fail_lookups_with(&self, message: &str) {
        *lock(&self.lookup_failure) = Some(message.to_string());
    }

    pub fn fail_creates_with(&self, message: &str) {
        *lock(&self.create_failure) = Some(message.to_string());
    }

    pub fn fail_custom_tokens_with(&self, message: &str) {
        *lock(&self.token_failure) = Some(message.to_string());
    }

    #[must_use]
    pub fn contains_email(&self, email: &str) -> bool {
        lock(&self.users).contains_key(&email.to_lowercase())
    }

    #[must_use]
    pub fn user_count(&self) -> usize {
        lock(&self.users).len()
    }

    #[must_use]
    pub fn stored_photo_url(&self, email: &str) -> Option<String> {
        lock(&self.users)
            .get(&email.to_lowercase())
            .and_then(|user| user.photo_url.clone())
    }

    #[must_use]
    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn lookup_calls(&self) -> usize {
        self.lookup_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn custom_token_calls(&self) -> usize {
        self.custom_token_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn verify_id_token_calls(&self) -> usize {
        self.verify_id_token_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn verify_password_calls(&self) -> usize {
        self.verify_password_calls.load(Ordering::SeqCst)
    }

    /// Calls across every provider operation
    #[must_use]
    pub fn total_calls(&self) -> usize {
        self.create_calls()
            + self.lookup_calls()
            + self.custom_token_calls()
            + self.verify_id_token_calls()
            + self.verify_password_calls()
    }
}

#[async_trait]
impl IdentityProvider for InMemoryIdentityProvider {
    async fn create_user(&self, new_identity: &NewIdentity) -> Result<Identity, IdentityError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(message) = lock(&self.create_failure).clone() {
            return Err(IdentityError::Provider {
                code: "INTERNAL_ERROR".to_string(),
                message,
            });
        }
        if !new_identity.email.contains('@') {
            return Err(IdentityError::InvalidInput("INVALID_EMAIL".to_string()));
        }
        if new_identity.password.as_deref().is_some_and(|p| p.len() < 6) {
            return Err(IdentityError::InvalidInput(
                "WEAK_PASSWORD : Password should be at least 6 characters".to_string(),
            ));
        }

        let mut users = lock(&self.users);
        let key = new_identity.email.to_lowercase();
        if users.contains_key(&key) {
            return Err(IdentityError::EmailExists);
        }

        let identity = Identity {
            id: uuid::Uuid::new_v4().simple().to_string(),
            email: new_identity.email.clone(),
            display_name: new_identity.display_name.clone().unwrap_or_default(),
        };
        users.insert(
            key,
            StoredUser {
                identity: identity.clone(),
                password: new_identity.password.clone(),
                photo_url: new_identity.photo_url.clone(),
            },
        );
        Ok(identity)
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<Identity>, IdentityError> {
        self.lookup_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(message) = lock(&self.lookup_failure).clone() {
            return Err(IdentityError::Transport(message));
        }
        Ok(lock(&self.users)
            .get(&email.to_lowercase())
            .map(|user| user.identity.clone()))
    }

    async fn custom_token(&self, uid: &str) -> Result<String, IdentityError> {
        let n = self.custom_token_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(message) = lock(&self.token_failure).clone() {
            return Err(IdentityError::Configuration(message));
        }
        Ok(format!("custom-token.{uid}.{n}"))
    }

    async fn verify_id_token(&self, id_token: &str) -> Result<VerifiedClaims, IdentityError> {
        self.verify_id_token_calls.fetch_add(1, Ordering::SeqCst);

        lock(&self.accepted_id_tokens)
            .get(id_token)
            .cloned()
            .ok_or_else(|| IdentityError::InvalidToken("JWT signature verification failed".to_string()))
    }

    async fn verify_password(&self, email: &str, password: &str) -> Result<bool, IdentityError> {
        self.verify_password_calls.fetch_add(1, Ordering::SeqCst);

        Ok(lock(&self.users)
            .get(&email.to_lowercase())
            .and_then(|user| user.password.as_deref())
            .is_some_and(|stored| stored == password))
    }
}

/// Scripted OAuth client
///
/// By default every exchange yields a bare bearer token and every profile
/// fetch fails with `MissingEmail` until a profile is scripted.
pub struct MockOAuthClient {
    exchange_failure: Mutex<Option<String>>,
    id_token: Mutex<Option<String>>,
    profile: Mutex<Result<OAuthProfile, String>>,
    profile_failure: Mutex<Option<OAuthError>>,
    exchange_calls: AtomicUsize,
    profile_calls: AtomicUsize,
}

impl Default for MockOAuthClient {
    fn default() -> Self {
        Self {
            exchange_failure: Mutex::new(None),
            id_token: Mutex::new(None),
            profile: Mutex::new(Err("no profile scripted".to_string())),
            profile_failure: Mutex::new(None),
            exchange_calls: AtomicUsize::new(0),
            profile_calls: AtomicUsize::new(0),
        }
    }
}

impl MockOAuthClient {
    pub const AUTHORIZATION_ENDPOINT: &'static str = "https://accounts.test/o/oauth2/v2/auth";

    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Userinfo returns `profile`
    pub fn succeed_with(&self, profile: OAuthProfile) {
        *lock(&self.profile) = Ok(profile);
    }

    /// Token responses carry `id_token` as an extra
    pub fn succeed_with_id_token(&self, id_token: &str) {
        *lock(&self.id_token) = Some(id_token.to_string());
    }

    pub fn fail_exchange(&self, message: &str) {
        *lock(&self.exchange_failure) = Some(message.to_string());
    }

    pub fn fail_profile(&self, error: OAuthError) {
        *lock(&self.profile_failure) = Some(error);
    }

    #[must_use]
    pub fn exchange_calls(&self) -> usize {
        self.exchange_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn profile_calls(&self) -> usize {
        self.profile_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OAuthClient for MockOAuthClient {
    fn authorization_url(&self, state: &str) -> Result<String, OAuthError> {
        let mut url = url::Url::parse(Self::AUTHORIZATION_ENDPOINT)
            .map_err(|e| OAuthError::Configuration(e.to_string()))?;
        url.query_pairs_mut()
            .append_pair("client_id", "test-client")
            .append_pair("response_type", "code")
            .append_pair("state", state);
        Ok(url.to_string())
    }

    async fn exchange_code(&self, code: &str) -> Result<TokenBundle, OAuthError> {
        self.exchange_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(message) = lock(&self.exchange_failure).clone() {
            return Err(OAuthError::Exchange(message));
        }
        let bundle = TokenBundle::bearer(&format!("access-for-{code}"));
        Ok(match lock(&self.id_token).clone() {
            Some(id_token) => bundle.with_extra("id_token", serde_json::Value::String(id_token)),
            None => bundle,
        })
    }

    async fn fetch_profile(&self, _tokens: &TokenBundle) -> Result<OAuthProfile, OAuthError> {
        self.profile_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(error) = lock(&self.profile_failure).take() {
            return Err(error);
        }
        lock(&self.profile)
            .clone()
            .map_err(|_| OAuthError::MissingEmail)
    }
}
