use std::sync::Arc;

use log::{debug, info};
use thiserror::Error;

use crate::identity::{IdentityError, IdentityProvider};
use crate::models::{AuthResult, NewIdentity, SignInRequest, SignUpRequest};
use crate::validation::{self, FieldError};

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("invalid email address")]
    InvalidEmail,
    #[error("rejected by identity provider: {0}")]
    Rejected(String),
    #[error("email already exists")]
    EmailExists,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("identity provider failure: {0}")]
    Provider(IdentityError),
}

impl From<FieldError> for CredentialError {
    fn from(err: FieldError) -> Self {
        match err {
            FieldError::Missing(field) => Self::MissingField(field),
            FieldError::InvalidEmail => Self::InvalidEmail,
        }
    }
}

impl From<IdentityError> for CredentialError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::EmailExists => Self::EmailExists,
            IdentityError::InvalidInput(reason) => Self::Rejected(reason),
            other => Self::Provider(other),
        }
    }
}

/// Email/password sign-up and sign-in against the identity provider
pub struct CredentialService {
    identity: Arc<dyn IdentityProvider>,
    verify_password: bool,
}

impl CredentialService {
    #[must_use]
    pub fn new(identity: Arc<dyn IdentityProvider>, verify_password: bool) -> Self {
        Self {
            identity,
            verify_password,
        }
    }

    /// Create an identity and return a custom token for it
    ///
    /// # Errors
    ///
    /// Field errors are raised before the provider is called. `EmailExists`
    /// and `Rejected` come from the provider; anything else is `Provider`.
    pub async fn sign_up(&self, request: &SignUpRequest) -> Result<AuthResult, CredentialError> {
        let email = validation::require_email(&request.email)?;
        if request.password.is_empty() {
            return Err(CredentialError::MissingField("password"));
        }
        let name = validation::require_non_empty("name", &request.name)?;

        let identity = self
            .identity
            .create_user(&NewIdentity::with_password(email, &request.password, name))
            .await?;
        let token = self
            .identity
            .custom_token(&identity.id)
            .await
            .map_err(CredentialError::Provider)?;

        info!("Signed up {} as {}", identity.email, identity.id);
        Ok(AuthResult::new(token, identity))
    }

    /// Resolve an existing identity and return a custom token for it
    ///
    /// The password is checked with the provider only when password
    /// verification is enabled.
    ///
    /// # Errors
    ///
    /// `InvalidCredentials` for an unknown email or a wrong (or empty) password.
    pub async fn sign_in(&self, request: &SignInRequest) -> Result<AuthResult, CredentialError> {
        let email = validation::require_non_empty("email", &request.email)?;

        let identity = self
            .identity
            .get_user_by_email(email)
            .await
            .map_err(CredentialError::Provider)?
            .ok_or(CredentialError::InvalidCredentials)?;

        if self.verify_password {
            // An empty password can never match, so skip the provider round trip
            if request.password.is_empty() {
                debug!("Empty password for {email}");
                return Err(CredentialError::InvalidCredentials);
            }
            let valid = self
                .identity
                .verify_password(email, &request.password)
                .await
                .map_err(CredentialError::Provider)?;
            if !valid {
                debug!("Password rejected for {email}");
                return Err(CredentialError::InvalidCredentials);
            }
        }

        let token = self
            .identity
            .custom_token(&identity.id)
            .await
            .map_err(CredentialError::Provider)?;

        info!("Signed in {}", identity.email);
        Ok(AuthResult::new(token, identity))
    }
}
