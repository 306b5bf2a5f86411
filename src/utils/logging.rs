// Centralized logging for the federated sign-in flow and startup
use log::{debug, info, warn};

use crate::oauth::OAuthCallback;
use crate::settings::TrustModel;

pub struct LoggingHelper;

impl LoggingHelper {
    /// Log OAuth client initialization status
    pub fn log_oauth_client_init(provider_name: &str, configured: bool) {
        if configured {
            info!("✅ {provider_name} OAuth2 configured");
        } else {
            warn!("❌ {provider_name} OAuth2 not configured - missing client id or secret");
        }
    }

    /// Log the trust model chosen for federated logins
    pub fn log_trust_model(trust_model: TrustModel) {
        match trust_model {
            TrustModel::IdToken => {
                info!("🔐 Federated logins verify the provider ID token (trust_model=id_token)");
            }
            TrustModel::UserInfo => {
                warn!(
                    "⚠️  trust_model=user_info: federated profiles are taken from the userinfo \
                     endpoint without signature verification"
                );
            }
        }
    }

    /// Log OAuth URL building
    pub fn log_oauth_url_built(provider: &str, scopes: &str) {
        debug!("🔍 Built {provider} OAuth URL with scopes: {scopes}");
    }

    /// Log token exchange start
    pub fn log_token_exchange_start(provider: &str) {
        debug!("🔄 Exchanging authorization code for tokens with {provider}");
    }

    /// Log token exchange summary
    pub fn log_token_exchange_summary(
        provider: &str,
        token_type: &str,
        refresh_token: bool,
        id_token: bool,
        scope: Option<&str>,
    ) {
        debug!(
            "🔍 Token exchange summary for {provider}: token_type={token_type}, refresh_token={}, id_token={}, scope={scope:?}",
            presence(refresh_token),
            presence(id_token),
        );
    }

    /// Log a federated sign-in completing for a user
    pub fn log_federated_sign_in(email: &str, created: bool) {
        if created {
            info!("Created identity on first federated sign-in for {email}");
        } else {
            info!("Federated sign-in for existing identity {email}");
        }
    }

    /// Log which callback parameters arrived, never their values
    pub fn log_callback_debug(req: &actix_web::HttpRequest, callback: &OAuthCallback) {
        debug!("{}", callback_summary(req.path(), callback));
    }
}

fn callback_summary(path: &str, callback: &OAuthCallback) -> String {
    format!(
        "OAuth callback received on {path}: code={}, state={}, error={:?}",
        presence(callback.code.is_some()),
        presence(callback.state.is_some()),
        callback.error,
    )
}

fn presence(present: bool) -> &'static str {
    if present {
        "present"
    } else {
        "missing"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_callback_summary_omits_code_and_state_values() {
        let callback = OAuthCallback {
            code: Some("4/one-time-code".to_string()),
            state: Some("csrf-state-value".to_string()),
            error: None,
            error_description: None,
        };

        let summary = callback_summary("/auth/google/callback", &callback);

        assert!(summary.contains("/auth/google/callback"));
        assert!(summary.contains("code=present"));
        assert!(summary.contains("state=present"));
        assert!(!summary.contains("one-time-code"));
        assert!(!summary.contains("csrf-state-value"));
    }
}
