// Email/password handlers: sign-up and sign-in
use actix_web::{web, HttpResponse};

use crate::error::ApiError;
use crate::models::{SignInRequest, SignUpRequest};
use crate::service::CredentialService;
use crate::utils::responses::ResponseBuilder;

/// `POST /auth/signup`
///
/// # Errors
/// Returns 400 for rejected input, 409 when the email is taken and 500 for
/// any other identity provider failure
pub async fn sign_up(
    body: web::Json<SignUpRequest>,
    credentials: web::Data<CredentialService>,
) -> Result<HttpResponse, ApiError> {
    let result = credentials.sign_up(&body).await?;
    Ok(ResponseBuilder::created().json(&result))
}

/// `POST /auth/signin`
///
/// # Errors
/// Returns 400 for a missing email, 401 for unknown accounts or wrong
/// passwords and 500 for identity provider failures
pub async fn sign_in(
    body: web::Json<SignInRequest>,
    credentials: web::Data<CredentialService>,
) -> Result<HttpResponse, ApiError> {
    let result = credentials.sign_in(&body).await?;
    Ok(ResponseBuilder::ok().json(&result))
}
