use actix_web::cookie::{time::Duration, Cookie, SameSite};

use crate::settings::FederationSettings;
use crate::utils::crypto::generate_csrf_token;

pub const OAUTH_STATE_COOKIE: &str = "authbridge_oauth_state";
pub const OAUTH_STATE_COOKIE_PATH: &str = "/auth/google";

/// Why a callback's `state` was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateMismatch {
    MissingQueryState,
    MissingCookie,
    Mismatch,
}

impl StateMismatch {
    #[must_use]
    pub fn reason(self) -> &'static str {
        match self {
            Self::MissingQueryState => "missing state parameter",
            Self::MissingCookie => "no state cookie for this browser",
            Self::Mismatch => "state does not match",
        }
    }
}

/// Issues and checks the per-request CSRF state bound to a short-lived cookie
#[derive(Debug, Clone)]
pub struct StateCookies {
    secure: bool,
    ttl: Duration,
}

impl StateCookies {
    #[must_use]
    pub fn new(secure: bool, ttl_minutes: i64) -> Self {
        Self {
            secure,
            ttl: Duration::minutes(ttl_minutes),
        }
    }

    #[must_use]
    pub fn from_settings(federation: &FederationSettings) -> Self {
        Self::new(federation.state_cookie_secure, federation.state_ttl_minutes)
    }

    /// Fresh random state and the cookie that binds it to the browser
    #[must_use]
    pub fn issue(&self) -> (String, Cookie<'static>) {
        let state = generate_csrf_token();
        let cookie = self.build_cookie(state.clone(), self.ttl);
        (state, cookie)
    }

    /// Cookie that removes the state cookie from the browser
    #[must_use]
    pub fn expired(&self) -> Cookie<'static> {
        self.build_cookie(String::new(), Duration::seconds(0))
    }

    /// Compare the callback's `state` with the value stored in the cookie
    ///
    /// # Errors
    ///
    /// Returns the reason the state was refused.
    pub fn verify(
        query_state: Option<&str>,
        cookie_state: Option<&str>,
    ) -> Result<(), StateMismatch> {
        let query_state = query_state
            .filter(|s| !s.is_empty())
            .ok_or(StateMismatch::MissingQueryState)?;
        let cookie_state = cookie_state
            .filter(|s| !s.is_empty())
            .ok_or(StateMismatch::MissingCookie)?;

        if constant_time_eq(query_state.as_bytes(), cookie_state.as_bytes()) {
            Ok(())
        } else {
            Err(StateMismatch::Mismatch)
        }
    }

    fn build_cookie(&self, value: String, max_age: Duration) -> Cookie<'static> {
        Cookie::build(OAUTH_STATE_COOKIE, value)
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Lax)
            .path(OAUTH_STATE_COOKIE_PATH)
            .max_age(max_age)
            .finish()
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
