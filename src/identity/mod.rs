//! Identity provider abstraction
//!
//! Every decision about credentials, tokens and user records is delegated to a
//! hosted identity provider. Handlers and services only see the
//! [`IdentityProvider`] trait so the concrete client can be swapped for an
//! in-memory double in tests.

pub mod firebase;
pub mod service_account;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{Identity, NewIdentity};

pub use firebase::FirebaseAuthClient;
pub use service_account::ServiceAccount;

/// Failures reported by an identity provider
#[derive(Debug, Error)]
pub enum IdentityError {
    /// An account with the requested email already exists
    #[error("email already exists")]
    EmailExists,
    /// The provider rejected the supplied fields (bad email, weak password, ...)
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// A presented token failed signature or claim checks
    #[error("invalid token: {0}")]
    InvalidToken(String),
    /// The provider could not be reached or answered with an unreadable body
    #[error("transport error: {0}")]
    Transport(String),
    /// Any other provider-side error, carrying the provider's code
    #[error("provider error {code}: {message}")]
    Provider { code: String, message: String },
    /// Local misconfiguration (missing key material, missing API key)
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl From<reqwest::Error> for IdentityError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

/// Claims of an ID token that passed verification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedClaims {
    pub subject: String,
    pub email: Option<String>,
    pub email_verified: Option<bool>,
    pub name: Option<String>,
    pub picture: Option<String>,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Create a new identity
    ///
    /// # Errors
    ///
    /// `EmailExists` when the email is taken, `InvalidInput` when the provider
    /// rejects a field, other variants for transport and provider failures.
    async fn create_user(&self, new_identity: &NewIdentity) -> Result<Identity, IdentityError>;

    /// Look an identity up by email; `Ok(None)` when no account matches
    ///
    /// # Errors
    ///
    /// Returns an error if the provider cannot be queried.
    async fn get_user_by_email(&self, email: &str) -> Result<Option<Identity>, IdentityError>;

    /// Mint a provider-signed custom token bound to `uid`
    ///
    /// # Errors
    ///
    /// Returns an error if signing fails.
    async fn custom_token(&self, uid: &str) -> Result<String, IdentityError>;

    /// Verify an OAuth provider ID token and return its claims
    ///
    /// # Errors
    ///
    /// `InvalidToken` when signature or claims are rejected; other variants
    /// when keys cannot be fetched.
    async fn verify_id_token(&self, id_token: &str) -> Result<VerifiedClaims, IdentityError>;

    /// Check an email/password pair; `Ok(false)` on a wrong password or unknown email
    ///
    /// # Errors
    ///
    /// Returns an error if the provider cannot be queried.
    async fn verify_password(&self, email: &str, password: &str) -> Result<bool, IdentityError>;
}
