//! HTTP-facing error taxonomy
//!
//! Domain errors from the services convert into [`ApiError`], which renders
//! the JSON error body. Provider and verifier detail is logged, never sent:
//! rejections get a fixed message and upstream failures a generic 500 body.

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use log::{error, warn};
use thiserror::Error;

use crate::service::credentials::CredentialError;
use crate::service::federation::FederationError;
use crate::utils::responses::ResponseBuilder;

#[derive(Debug, Error)]
pub enum ApiError {
    /// 400 with a machine-readable code and a client-facing message
    #[error("{code}: {message}")]
    BadRequest { code: &'static str, message: String },
    /// 401
    #[error("{code}: {message}")]
    Unauthorized { code: &'static str, message: String },
    /// 409
    #[error("{code}: {message}")]
    Conflict { code: &'static str, message: String },
    /// 500; the detail is logged, never sent
    #[error("upstream failure: {0}")]
    Upstream(String),
}

impl ApiError {
    #[must_use]
    pub fn bad_request(code: &'static str, message: impl Into<String>) -> Self {
        Self::BadRequest {
            code,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn unauthorized(code: &'static str, message: impl Into<String>) -> Self {
        Self::Unauthorized {
            code,
            message: message.into(),
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            Self::Conflict { .. } => StatusCode::CONFLICT,
            Self::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            Self::BadRequest { code, message } => ResponseBuilder::bad_request()
                .with_error_code(code)
                .with_message(message)
                .build(),
            Self::Unauthorized { code, message } => ResponseBuilder::unauthorized()
                .with_error_code(code)
                .with_message(message)
                .build(),
            Self::Conflict { code, message } => ResponseBuilder::conflict()
                .with_error_code(code)
                .with_message(message)
                .build(),
            Self::Upstream(detail) => {
                error!("Upstream failure: {detail}");
                ResponseBuilder::server_error()
            }
        }
    }
}

impl From<CredentialError> for ApiError {
    fn from(err: CredentialError) -> Self {
        match err {
            CredentialError::MissingField(field) => {
                Self::bad_request("missing_field", format!("Missing required field: {field}"))
            }
            CredentialError::InvalidEmail => {
                Self::bad_request("invalid_email", "The email address is not valid")
            }
            CredentialError::Rejected(reason) => {
                warn!("Identity provider rejected input: {reason}");
                Self::bad_request("invalid_input", rejection_message(&reason))
            }
            CredentialError::EmailExists => Self::Conflict {
                code: "email_exists",
                message: "An account with this email already exists".to_string(),
            },
            CredentialError::InvalidCredentials => {
                Self::unauthorized("invalid_credentials", "Email or password is incorrect")
            }
            CredentialError::Provider(e) => Self::Upstream(e.to_string()),
        }
    }
}

impl From<FederationError> for ApiError {
    fn from(err: FederationError) -> Self {
        match err {
            FederationError::InvalidIdToken(reason) => {
                warn!("ID token rejected: {reason}");
                Self::unauthorized("invalid_token", "The ID token was rejected")
            }
            other => Self::Upstream(other.to_string()),
        }
    }
}

/// Fixed client message for a provider rejection, keyed on its error code
fn rejection_message(reason: &str) -> &'static str {
    let code = reason.split(':').next().unwrap_or_default().trim();
    match code {
        "WEAK_PASSWORD" => "The password is too weak",
        "INVALID_EMAIL" => "The email address is not valid",
        "INVALID_DISPLAY_NAME" => "The name is not valid",
        c if c.starts_with("MISSING_") => "A required field is missing",
        _ => "The identity provider rejected the request",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::IdentityError;
    use crate::oauth::OAuthError;
    use actix_web::body::to_bytes;

    async fn body_of(err: &ApiError) -> serde_json::Value {
        let bytes = to_bytes(err.error_response().into_body()).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[actix_web::test]
    async fn test_conflict_from_existing_email() {
        let err = ApiError::from(CredentialError::EmailExists);
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert_eq!(body_of(&err).await["error"], "email_exists");
    }

    #[actix_web::test]
    async fn test_upstream_detail_is_not_echoed() {
        let err = ApiError::from(CredentialError::Provider(IdentityError::Provider {
            code: "INTERNAL".to_string(),
            message: "secret stack trace from provider".to_string(),
        }));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_of(&err).await;
        assert_eq!(body["error"], "server_error");
        assert!(!body.to_string().contains("secret stack trace"));
    }

    #[actix_web::test]
    async fn test_provider_rejection_gets_fixed_message() {
        let err = ApiError::from(CredentialError::Rejected(
            "WEAK_PASSWORD : Password should be at least 6 characters".to_string(),
        ));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

        let body = body_of(&err).await;
        assert_eq!(body["error"], "invalid_input");
        assert_eq!(body["message"], "The password is too weak");
        assert!(!body.to_string().contains("WEAK_PASSWORD"));

        let body = body_of(&ApiError::from(CredentialError::Rejected(
            "INVALID_PHOTO_URL : not a url".to_string(),
        )))
        .await;
        assert_eq!(body["message"], "The identity provider rejected the request");
    }

    #[actix_web::test]
    async fn test_id_token_rejection_hides_expected_audience() {
        let err = ApiError::from(FederationError::InvalidIdToken(
            "Invalid audience: expected test-client-id".to_string(),
        ));
        let body = body_of(&err).await;
        assert_eq!(body["message"], "The ID token was rejected");
        assert!(!body.to_string().contains("test-client-id"));
    }

    #[actix_web::test]
    async fn test_federation_mapping() {
        let err = ApiError::from(FederationError::InvalidIdToken("bad signature".to_string()));
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
        let body = body_of(&err).await;
        assert_eq!(body["error"], "invalid_token");
        assert!(!body.to_string().contains("bad signature"));

        let err = ApiError::from(FederationError::Exchange(OAuthError::Exchange(
            "invalid_grant".to_string(),
        )));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!body_of(&err).await.to_string().contains("invalid_grant"));
    }
}
