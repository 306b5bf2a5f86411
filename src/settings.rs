use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::str::FromStr;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AuthBridgeSettings {
    pub application: ApplicationSettings,
    pub google: GoogleSettings,
    pub identity: IdentitySettings,
    pub credentials: CredentialSettings,
    pub federation: FederationSettings,
    pub profiles: ProfileSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationSettings {
    pub host: String,
    pub port: u16,
    /// Comma separated list of allowed origins, `*` allows any origin
    pub cors_origins: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GoogleSettings {
    // Direct values (can be overridden by environment variables)
    pub client_id: Option<String>,
    pub client_secret: Option<String>,

    // Environment variable names for overrides
    pub client_id_env: Option<String>,
    pub client_secret_env: Option<String>,

    pub redirect_url: String,
    pub scopes: Vec<String>,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    pub userinfo_endpoint: String,
    pub jwks_uri: String,
    /// Accepted `iss` values for ID tokens
    pub issuers: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentitySettings {
    /// Path to the service account JSON used for admin calls and token minting
    pub credentials_file: String,
    pub api_base_url: String,
    /// Web API key, needed only for password verification
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialSettings {
    /// Check the supplied password with the identity provider on sign-in.
    /// When disabled, sign-in only requires a known email.
    pub verify_password: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FederationSettings {
    pub trust_model: TrustModel,
    pub state_cookie_secure: bool,
    pub state_ttl_minutes: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileSettings {
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
}

/// How the federated callback decides that an OAuth profile can be trusted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TrustModel {
    /// Verify the provider's ID token signature and claims, then hand the
    /// verified ID token back as the session token.
    #[default]
    IdToken,
    /// Trust whatever the userinfo endpoint returns for the access token and
    /// mint a fresh custom token for the resolved identity.
    UserInfo,
}

impl fmt::Display for TrustModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IdToken => write!(f, "id_token"),
            Self::UserInfo => write!(f, "user_info"),
        }
    }
}

impl FromStr for TrustModel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "id_token" => Ok(Self::IdToken),
            "user_info" | "userinfo" => Ok(Self::UserInfo),
            other => Err(format!("unknown trust model: {other}")),
        }
    }
}

impl Default for ApplicationSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_origins: "*".to_string(),
        }
    }
}

impl Default for GoogleSettings {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            client_id_env: Some("GOOGLE_CLIENT_ID".to_string()),
            client_secret_env: Some("GOOGLE_CLIENT_SECRET".to_string()),
            redirect_url: "http://localhost:8000/auth/google/callback".to_string(),
            scopes: vec![
                "openid".to_string(),
                "email".to_string(),
                "profile".to_string(),
            ],
            authorization_endpoint: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
            token_endpoint: "https://oauth2.googleapis.com/token".to_string(),
            userinfo_endpoint: "https://www.googleapis.com/oauth2/v3/userinfo".to_string(),
            jwks_uri: "https://www.googleapis.com/oauth2/v3/certs".to_string(),
            issuers: vec![
                "https://accounts.google.com".to_string(),
                "accounts.google.com".to_string(),
            ],
        }
    }
}

impl Default for IdentitySettings {
    fn default() -> Self {
        Self {
            credentials_file: "service-account.json".to_string(),
            api_base_url: "https://identitytoolkit.googleapis.com".to_string(),
            api_key: None,
        }
    }
}

impl Default for CredentialSettings {
    fn default() -> Self {
        Self {
            verify_password: true,
        }
    }
}

impl Default for FederationSettings {
    fn default() -> Self {
        Self {
            trust_model: TrustModel::default(),
            state_cookie_secure: true,
            state_ttl_minutes: 10,
        }
    }
}

impl Default for ProfileSettings {
    fn default() -> Self {
        Self {
            path: "profiles.json".to_string(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl AuthBridgeSettings {
    /// Load settings from configuration files and environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Settings file cannot be read or parsed
    /// - Logger initialization fails
    /// - The resulting settings are inconsistent
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        Self::load_env_file();

        let (mut settings, sources) = Self::load_base_settings()?;
        Self::apply_env_overrides(&mut settings);
        Self::initialize_logging(&settings.logging)?;
        for source in sources {
            log::info!("{source}");
        }
        settings.validate()?;

        Ok(settings)
    }

    /// Start the logger at `logging.level`
    ///
    /// # Errors
    ///
    /// Returns an error if a logger is already installed
    fn initialize_logging(logging: &LoggingSettings) -> Result<(), Box<dyn std::error::Error>> {
        Self::logger_builder(logging).try_init()?;
        Ok(())
    }

    // RUST_LOG is already folded into `logging.level` by the env overrides
    fn logger_builder(logging: &LoggingSettings) -> env_logger::Builder {
        let mut builder = env_logger::Builder::new();
        builder.parse_filters(&logging.level);
        builder
    }

    /// Load base settings from TOML file(s) or use defaults
    /// Settings are loaded with the following priority (highest to lowest):
    /// 1. Environment variables (applied separately after loading base settings)
    /// 2. Settings.toml in `AUTHBRIDGE_SECRETS_DIR` (if specified and exists)
    /// 3. Settings.toml in current directory (if exists)
    /// 4. Default settings
    ///
    /// The logger is not running yet, so the files consulted are returned as
    /// messages for the caller to log.
    fn load_base_settings() -> Result<(Self, Vec<String>), Box<dyn std::error::Error>> {
        let mut settings = Self::default();
        let mut sources = Vec::new();

        let default_config_path = std::path::PathBuf::from("Settings.toml");
        if default_config_path.exists() {
            settings = Self::from_toml_file(&default_config_path)?;
            sources.push(format!(
                "Loaded base settings from {}",
                default_config_path.display()
            ));
        }

        if let Ok(secrets_dir) = std::env::var("AUTHBRIDGE_SECRETS_DIR") {
            let secrets_path = std::path::Path::new(&secrets_dir).join("Settings.toml");
            if secrets_path.exists() {
                settings = Self::from_toml_file(&secrets_path)?;
                sources.push(format!("Overriding settings from {}", secrets_path.display()));
            } else {
                sources.push(format!(
                    "AUTHBRIDGE_SECRETS_DIR set but no Settings.toml found at: {}",
                    secrets_path.display()
                ));
            }
        }

        Ok((settings, sources))
    }

    /// Parse a settings file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid TOML
    pub fn from_toml_file(path: &std::path::Path) -> Result<Self, Box<dyn std::error::Error>> {
        let toml_content = fs::read_to_string(path)?;
        Ok(basic_toml::from_str(&toml_content)?)
    }

    /// Apply environment variable overrides to settings
    pub fn apply_env_overrides(settings: &mut Self) {
        Self::apply_application_env_overrides(&mut settings.application);
        Self::apply_google_env_overrides(&mut settings.google);
        Self::apply_identity_env_overrides(&mut settings.identity);
        Self::apply_credential_env_overrides(&mut settings.credentials);
        Self::apply_federation_env_overrides(&mut settings.federation);
        if let Ok(path) = std::env::var("PROFILES_PATH") {
            settings.profiles.path = path;
        }
        if let Ok(log_level) = std::env::var("RUST_LOG") {
            settings.logging.level = log_level;
        }
    }

    fn apply_application_env_overrides(app_settings: &mut ApplicationSettings) {
        if let Ok(host) = std::env::var("HOST") {
            app_settings.host = host;
        }
        if let Ok(port_str) = std::env::var("PORT") {
            if let Ok(port) = port_str.parse::<u16>() {
                app_settings.port = port;
            }
        }
        if let Ok(cors_origins) = std::env::var("CORS_ORIGINS") {
            app_settings.cors_origins = cors_origins;
        }
    }

    fn apply_google_env_overrides(google: &mut GoogleSettings) {
        if let Ok(redirect_url) = std::env::var("GOOGLE_REDIRECT_URL") {
            google.redirect_url = redirect_url;
        }
    }

    fn apply_identity_env_overrides(identity: &mut IdentitySettings) {
        if let Ok(path) = std::env::var("GOOGLE_APPLICATION_CREDENTIALS") {
            identity.credentials_file = path;
        }
        if let Ok(base_url) = std::env::var("IDENTITY_API_BASE_URL") {
            identity.api_base_url = base_url;
        }
        if let Ok(api_key) = std::env::var("FIREBASE_API_KEY") {
            if !api_key.is_empty() {
                identity.api_key = Some(api_key);
            }
        }
    }

    fn apply_credential_env_overrides(credentials: &mut CredentialSettings) {
        Self::apply_bool_env_override("VERIFY_PASSWORD", &mut credentials.verify_password);
    }

    fn apply_federation_env_overrides(federation: &mut FederationSettings) {
        if let Ok(model) = std::env::var("TRUST_MODEL") {
            match model.parse() {
                Ok(trust_model) => federation.trust_model = trust_model,
                Err(e) => log::warn!("Ignoring TRUST_MODEL override: {e}"),
            }
        }
        Self::apply_bool_env_override("COOKIE_SECURE", &mut federation.state_cookie_secure);
    }

    /// Helper function to apply boolean environment variable overrides
    fn apply_bool_env_override(env_var: &str, target: &mut bool) {
        if let Ok(value_str) = std::env::var(env_var) {
            if let Ok(value) = value_str.parse::<bool>() {
                *target = value;
            }
        }
    }

    /// Load environment variables from .env file
    fn load_env_file() {
        if let Ok(contents) = std::fs::read_to_string(".env") {
            for line in contents.lines() {
                let line = line.trim();
                if line.is_empty() || line.starts_with('#') {
                    continue;
                }
                if let Some((key, value)) = line.split_once('=') {
                    std::env::set_var(key.trim(), value.trim());
                }
            }
        } else {
            log::debug!(".env file not found");
        }
    }

    /// Check cross-field constraints that would otherwise fail at request time
    ///
    /// # Errors
    ///
    /// Returns an error if password verification is enabled without an API key
    pub fn validate(&self) -> Result<(), String> {
        if self.credentials.verify_password && self.identity.api_key.is_none() {
            return Err(
                "credentials.verify_password is enabled but no identity api_key is configured \
                 (set FIREBASE_API_KEY or disable VERIFY_PASSWORD)"
                    .to_string(),
            );
        }
        if self.federation.state_ttl_minutes <= 0 {
            return Err("federation.state_ttl_minutes must be positive".to_string());
        }
        Ok(())
    }

    /// Get the bind address for the server
    #[must_use]
    pub fn get_bind_address(&self) -> String {
        format!("{}:{}", self.application.host, self.application.port)
    }

    /// Get CORS origins as a vector of strings
    #[must_use]
    pub fn get_cors_origins(&self) -> Vec<String> {
        self.application
            .cors_origins
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

impl GoogleSettings {
    /// Get the client ID, checking environment variable first, then falling back to direct value
    #[must_use]
    pub fn get_client_id(&self) -> Option<String> {
        if let Some(env_var) = &self.client_id_env {
            if let Ok(value) = std::env::var(env_var) {
                return Some(value);
            }
        }
        self.client_id.clone()
    }

    /// Get the client secret, checking environment variable first, then falling back to direct value
    #[must_use]
    pub fn get_client_secret(&self) -> Option<String> {
        if let Some(env_var) = &self.client_secret_env {
            if let Ok(value) = std::env::var(env_var) {
                return Some(value);
            }
        }
        self.client_secret.clone()
    }
}
