//! Application wiring shared by the binary and the HTTP tests
//!
//! [`AppServices`] owns the per-process services; [`AppServices::configure`]
//! registers them and every route on an actix `App`.

use std::sync::Arc;

use actix_web::{
    error::{JsonPayloadError, QueryPayloadError},
    web, HttpRequest,
};
use log::debug;

use crate::error::ApiError;
use crate::handlers::{google_callback, google_sign_in, home, list_users, sign_in, sign_up};
use crate::identity::IdentityProvider;
use crate::oauth::state::StateCookies;
use crate::oauth::OAuthClient;
use crate::profiles::ProfileDirectory;
use crate::service::{CredentialService, FederationService};
use crate::settings::AuthBridgeSettings;

#[derive(Clone)]
pub struct AppServices {
    pub credentials: web::Data<CredentialService>,
    pub federation: web::Data<FederationService>,
    pub profiles: web::Data<ProfileDirectory>,
}

impl AppServices {
    #[must_use]
    pub fn new(
        credentials: CredentialService,
        federation: FederationService,
        profiles: ProfileDirectory,
    ) -> Self {
        Self {
            credentials: web::Data::new(credentials),
            federation: web::Data::new(federation),
            profiles: web::Data::new(profiles),
        }
    }

    /// Build both services from settings around the given clients
    #[must_use]
    pub fn from_settings(
        settings: &AuthBridgeSettings,
        identity: Arc<dyn IdentityProvider>,
        oauth: Arc<dyn OAuthClient>,
        profiles: ProfileDirectory,
    ) -> Self {
        let credentials =
            CredentialService::new(Arc::clone(&identity), settings.credentials.verify_password);
        let federation = FederationService::new(
            oauth,
            identity,
            settings.federation.trust_model,
            StateCookies::from_settings(&settings.federation),
        );
        Self::new(credentials, federation, profiles)
    }

    /// Register services, the JSON and query extractor configs and all routes
    pub fn configure(&self, cfg: &mut web::ServiceConfig) {
        cfg.app_data(self.credentials.clone())
            .app_data(self.federation.clone())
            .app_data(self.profiles.clone())
            .app_data(web::JsonConfig::default().error_handler(json_error_handler))
            .app_data(web::QueryConfig::default().error_handler(query_error_handler))
            .route("/", web::get().to(home))
            .route("/users", web::get().to(list_users))
            .route("/auth/signup", web::post().to(sign_up))
            .route("/auth/signin", web::post().to(sign_in))
            .route("/auth/google/signin", web::get().to(google_sign_in))
            .route("/auth/google/callback", web::get().to(google_callback));
    }
}

fn json_error_handler(err: JsonPayloadError, req: &HttpRequest) -> actix_web::Error {
    debug!("Rejected JSON body on {}: {err}", req.path());
    ApiError::bad_request("invalid_request", format!("Invalid request body: {err}")).into()
}

fn query_error_handler(err: QueryPayloadError, req: &HttpRequest) -> actix_web::Error {
    debug!("Rejected query string on {}: {err}", req.path());
    ApiError::bad_request("invalid_request", "Invalid query string").into()
}
