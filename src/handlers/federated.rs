// Google federated sign-in: redirect and callback
use actix_web::{web, HttpRequest, HttpResponse, ResponseError};
use log::{debug, error, warn};

use crate::error::ApiError;
use crate::oauth::state::{StateCookies, OAUTH_STATE_COOKIE};
use crate::oauth::OAuthCallback;
use crate::service::FederationService;
use crate::utils::logging::LoggingHelper;
use crate::utils::responses::ResponseBuilder;

/// `GET /auth/google/signin`
///
/// Issues a fresh state, binds it to the browser with a cookie and redirects
/// to the Google consent screen.
///
/// # Errors
/// Returns 500 if the authorization URL cannot be built
pub async fn google_sign_in(
    federation: web::Data<FederationService>,
) -> Result<HttpResponse, ApiError> {
    let (auth_url, state_cookie) = federation.begin()?;
    debug!("Redirecting to Google OAuth");
    Ok(ResponseBuilder::redirect(&auth_url)
        .with_cookie(state_cookie)
        .build())
}

/// `GET /auth/google/callback`
///
/// Always answers with the state cookie cleared, whatever the outcome,
/// including a query string that does not parse.
pub async fn google_callback(
    req: HttpRequest,
    query: Result<web::Query<OAuthCallback>, actix_web::Error>,
    federation: web::Data<FederationService>,
) -> HttpResponse {
    let mut response = match query {
        Ok(callback) => {
            LoggingHelper::log_callback_debug(&req, &callback);
            match handle_callback(&req, &callback, &federation).await {
                Ok(response) => response,
                Err(e) => e.error_response(),
            }
        }
        Err(e) => e.error_response(),
    };

    if let Err(e) = response.add_cookie(&federation.state_cookies().expired()) {
        error!("Failed to clear OAuth state cookie: {e}");
    }
    response
}

async fn handle_callback(
    req: &HttpRequest,
    callback: &OAuthCallback,
    federation: &FederationService,
) -> Result<HttpResponse, ApiError> {
    let cookie = req.cookie(OAUTH_STATE_COOKIE);
    StateCookies::verify(callback.state.as_deref(), cookie.as_ref().map(|c| c.value()))
        .map_err(|mismatch| {
            warn!("Rejected OAuth callback: {}", mismatch.reason());
            ApiError::bad_request("invalid_state", mismatch.reason())
        })?;

    if let Some(provider_error) = &callback.error {
        warn!(
            "Google returned an error on callback: {provider_error} ({})",
            callback.error_description.as_deref().unwrap_or("no description")
        );
        return Err(ApiError::unauthorized(
            "access_denied",
            "Sign-in was not completed with Google",
        ));
    }

    let code = callback
        .code
        .as_deref()
        .filter(|code| !code.is_empty())
        .ok_or_else(|| ApiError::bad_request("missing_code", "Missing authorization code"))?;

    let result = federation.complete(code).await?;
    Ok(ResponseBuilder::ok().json(&result))
}
