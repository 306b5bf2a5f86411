use serde::{Deserialize, Serialize};

/// A user account as held by the identity provider.
///
/// The service never persists identities. They are fetched or created per
/// request and dropped once the response is written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Provider-assigned user id (`localId` at the identity provider)
    pub id: String,
    pub email: String,
    #[serde(rename = "name")]
    pub display_name: String,
}

/// Parameters for creating an identity at the provider
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewIdentity {
    pub email: String,
    pub password: Option<String>,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
}

impl NewIdentity {
    /// Creation parameters for an email/password account
    #[must_use]
    pub fn with_password(email: &str, password: &str, display_name: &str) -> Self {
        Self {
            email: email.to_string(),
            password: Some(password.to_string()),
            display_name: Some(display_name.to_string()),
            photo_url: None,
        }
    }
}

/// Uniform success body for every sign-in and sign-up route
///
/// Serializes as `{"token": "...", "user": {"id", "email", "name"}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthResult {
    pub token: String,
    #[serde(rename = "user")]
    pub identity: Identity,
}

impl AuthResult {
    #[must_use]
    pub fn new(token: String, identity: Identity) -> Self {
        Self { token, identity }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

/// A static profile record served by `/users`
///
/// Field names on the wire are kept exactly as they appear in the dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Post")]
    pub post: String,
    #[serde(rename = "ProfilePicture")]
    pub image_url: String,
    #[serde(rename = "Github")]
    pub github: String,
    #[serde(rename = "LinkedIn")]
    pub linkedin: String,
    #[serde(rename = "Instagram")]
    pub instagram: String,
    #[serde(rename = "TechStack")]
    pub tech_stack: String,
}
