//! Federated sign-in bridging
//!
//! Turns a one-time authorization code into a session token backed by an
//! identity-provider user, creating that user on first login:
//!
//! `CodeReceived → TokenExchanged → ProfileFetched → {IdentityFound | IdentityCreated} → TokenIssued`
//!
//! Each external call is awaited in sequence and nothing is retried. A failure
//! after the identity was created leaves it in place.

use std::fmt;
use std::sync::Arc;

use actix_web::cookie::Cookie;
use log::debug;
use thiserror::Error;

use crate::identity::{IdentityError, IdentityProvider};
use crate::models::{AuthResult, Identity, NewIdentity};
use crate::oauth::state::StateCookies;
use crate::oauth::{OAuthClient, OAuthError, OAuthProfile, TokenBundle};
use crate::settings::TrustModel;
use crate::utils::logging::LoggingHelper;

#[derive(Debug, Error)]
pub enum FederationError {
    #[error("cannot start federated sign-in: {0}")]
    Configuration(OAuthError),
    #[error("code exchange failed: {0}")]
    Exchange(OAuthError),
    #[error("profile retrieval failed: {0}")]
    ProfileFetch(OAuthError),
    #[error("ID token rejected: {0}")]
    InvalidIdToken(String),
    #[error("ID token could not be verified: {0}")]
    IdTokenVerification(IdentityError),
    #[error("identity lookup failed: {0}")]
    IdentityLookup(IdentityError),
    #[error("identity creation failed: {0}")]
    IdentityCreation(IdentityError),
    #[error("token issuance failed: {0}")]
    TokenIssuance(IdentityError),
}

/// Progress of a single callback through the bridging protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FederationStep {
    CodeReceived,
    TokenExchanged,
    ProfileFetched,
    IdentityFound,
    IdentityCreated,
    TokenIssued,
}

impl fmt::Display for FederationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::CodeReceived => "code_received",
            Self::TokenExchanged => "token_exchanged",
            Self::ProfileFetched => "profile_fetched",
            Self::IdentityFound => "identity_found",
            Self::IdentityCreated => "identity_created",
            Self::TokenIssued => "token_issued",
        };
        f.write_str(name)
    }
}

/// Profile plus the verified ID token, when the trust model produced one
struct TrustedProfile {
    profile: OAuthProfile,
    id_token: Option<String>,
}

pub struct FederationService {
    oauth: Arc<dyn OAuthClient>,
    identity: Arc<dyn IdentityProvider>,
    trust_model: TrustModel,
    state_cookies: StateCookies,
}

impl FederationService {
    #[must_use]
    pub fn new(
        oauth: Arc<dyn OAuthClient>,
        identity: Arc<dyn IdentityProvider>,
        trust_model: TrustModel,
        state_cookies: StateCookies,
    ) -> Self {
        Self {
            oauth,
            identity,
            trust_model,
            state_cookies,
        }
    }

    #[must_use]
    pub fn trust_model(&self) -> TrustModel {
        self.trust_model
    }

    #[must_use]
    pub fn state_cookies(&self) -> &StateCookies {
        &self.state_cookies
    }

    /// Authorization URL for a fresh state, and the cookie binding that state
    ///
    /// # Errors
    ///
    /// Returns `Configuration` when the OAuth client cannot build the URL.
    pub fn begin(&self) -> Result<(String, Cookie<'static>), FederationError> {
        let (state, cookie) = self.state_cookies.issue();
        let url = self
            .oauth
            .authorization_url(&state)
            .map_err(FederationError::Configuration)?;
        Ok((url, cookie))
    }

    /// Run the bridging protocol for an authorization code
    ///
    /// # Errors
    ///
    /// Each step has its own variant; only `InvalidIdToken` is the caller's fault.
    pub async fn complete(&self, code: &str) -> Result<AuthResult, FederationError> {
        Self::step(FederationStep::CodeReceived);

        let tokens = self
            .oauth
            .exchange_code(code)
            .await
            .map_err(FederationError::Exchange)?;
        Self::step(FederationStep::TokenExchanged);

        let trusted = self.trusted_profile(&tokens).await?;
        Self::step(FederationStep::ProfileFetched);

        let (identity, created) = self.resolve_identity(&trusted.profile).await?;
        Self::step(if created {
            FederationStep::IdentityCreated
        } else {
            FederationStep::IdentityFound
        });

        let token = match trusted.id_token {
            Some(id_token) => id_token,
            None => self
                .identity
                .custom_token(&identity.id)
                .await
                .map_err(FederationError::TokenIssuance)?,
        };
        Self::step(FederationStep::TokenIssued);

        LoggingHelper::log_federated_sign_in(&identity.email, created);
        Ok(AuthResult::new(token, identity))
    }

    async fn trusted_profile(&self, tokens: &TokenBundle) -> Result<TrustedProfile, FederationError> {
        match self.trust_model {
            TrustModel::UserInfo => {
                let profile = self
                    .oauth
                    .fetch_profile(tokens)
                    .await
                    .map_err(FederationError::ProfileFetch)?;
                Ok(TrustedProfile {
                    profile,
                    id_token: None,
                })
            }
            TrustModel::IdToken => {
                let id_token = tokens.id_token().map_err(FederationError::ProfileFetch)?;
                let claims = self
                    .identity
                    .verify_id_token(id_token)
                    .await
                    .map_err(|e| match e {
                        IdentityError::InvalidToken(reason) => FederationError::InvalidIdToken(reason),
                        other => FederationError::IdTokenVerification(other),
                    })?;

                let email = claims
                    .email
                    .filter(|email| !email.is_empty())
                    .ok_or(FederationError::ProfileFetch(OAuthError::MissingEmail))?;

                Ok(TrustedProfile {
                    profile: OAuthProfile {
                        subject: Some(claims.subject),
                        email,
                        name: claims.name,
                        picture: claims.picture,
                    },
                    id_token: Some(id_token.to_string()),
                })
            }
        }
    }

    /// Existing identity for the profile's email, or a new one; the flag is
    /// `true` when the identity was created
    async fn resolve_identity(
        &self,
        profile: &OAuthProfile,
    ) -> Result<(Identity, bool), FederationError> {
        if let Some(existing) = self
            .identity
            .get_user_by_email(&profile.email)
            .await
            .map_err(FederationError::IdentityLookup)?
        {
            return Ok((existing, false));
        }

        let created = self
            .identity
            .create_user(&NewIdentity {
                email: profile.email.clone(),
                password: None,
                display_name: profile.name.clone(),
                photo_url: profile.picture.clone(),
            })
            .await
            .map_err(FederationError::IdentityCreation)?;
        Ok((created, true))
    }

    fn step(step: FederationStep) {
        debug!("federation step: {step}");
    }
}
