#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

use std::path::Path;
use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{
    middleware::{from_fn, Logger},
    App, HttpServer,
};
use authbridge::{
    identity::FirebaseAuthClient,
    oauth::google::GoogleOAuthClient,
    settings::AuthBridgeSettings,
    utils::{logging::LoggingHelper, recovery::recover_panic},
    AppServices, ProfileDirectory,
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load configuration from Settings.toml and environment variables
    // This also loads .env file and initializes the logger
    let settings = AuthBridgeSettings::load()
        .map_err(|e| std::io::Error::other(format!("Failed to load settings: {e}")))?;

    let profiles = ProfileDirectory::load(Path::new(&settings.profiles.path))
        .map_err(|e| std::io::Error::other(format!("Failed to load profiles: {e:#}")))?;

    let identity = FirebaseAuthClient::from_settings(&settings).map_err(|e| {
        std::io::Error::other(format!("Failed to initialize identity provider: {e:#}"))
    })?;
    let oauth = GoogleOAuthClient::new(reqwest::Client::new(), &settings.google);
    LoggingHelper::log_trust_model(settings.federation.trust_model);

    let services = AppServices::from_settings(
        &settings,
        Arc::new(identity),
        Arc::new(oauth),
        profiles,
    );

    start_server(services, &settings).await
}

/// Start the HTTP server
///
/// # Errors
///
/// Returns an error if:
/// - Server binding fails
/// - Server fails to start
async fn start_server(services: AppServices, settings: &AuthBridgeSettings) -> std::io::Result<()> {
    let bind_address = settings.get_bind_address();
    print_startup_info(&bind_address, settings);

    let cors_origins = settings.get_cors_origins();
    let any_origin = cors_origins.iter().any(|origin| origin == "*");

    HttpServer::new(move || {
        let cors_origins = cors_origins.clone();
        let cors = if any_origin {
            Cors::default().allow_any_origin()
        } else {
            Cors::default().allowed_origin_fn(move |origin, _| {
                cors_origins
                    .iter()
                    .any(|allowed| allowed == origin.to_str().unwrap_or(""))
            })
        };
        let cors = cors
            .allowed_methods(vec!["GET", "POST", "OPTIONS"])
            .allowed_headers(vec!["Authorization", "Content-Type", "Accept"])
            .max_age(3600);

        let services = services.clone();
        App::new()
            .wrap(from_fn(recover_panic))
            .wrap(cors)
            .wrap(Logger::default())
            .configure(move |cfg| services.configure(cfg))
    })
    .bind(&bind_address)?
    .run()
    .await
}

fn print_startup_info(bind_address: &str, settings: &AuthBridgeSettings) {
    println!(
        "Starting authbridge {} on http://{bind_address}",
        authbridge::VERSION
    );
    println!("Trust model: {}", settings.federation.trust_model);
    println!(
        "Password verification: {}",
        if settings.credentials.verify_password {
            "enabled"
        } else {
            "disabled"
        }
    );
    println!();
    println!("Credential endpoints:");
    println!("  POST /auth/signup  - Create an account");
    println!("  POST /auth/signin  - Sign in with email and password");
    println!();
    println!("Federated endpoints:");
    println!("  GET  /auth/google/signin   - Redirect to Google");
    println!("  GET  /auth/google/callback - OAuth callback");
    println!("  Redirect URL registered with Google: {}", settings.google.redirect_url);
    println!();
    println!("System endpoints:");
    println!("  GET  /      - Usage help");
    println!("  GET  /users - Team profiles ({})", settings.profiles.path);
}
