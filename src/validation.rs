//! Request field checks performed before any upstream call

use regex::Regex;

static EMAIL_SHAPE: std::sync::LazyLock<Option<Regex>> =
    std::sync::LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").ok());

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    Missing(&'static str),
    InvalidEmail,
}

/// Require a non-blank value for `field`
///
/// # Errors
///
/// Returns `FieldError::Missing` when the value is empty or whitespace.
pub fn require_non_empty<'a>(field: &'static str, value: &'a str) -> Result<&'a str, FieldError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(FieldError::Missing(field))
    } else {
        Ok(trimmed)
    }
}

/// Require a non-blank, roughly email-shaped value
///
/// The identity provider remains the authority on address validity; this only
/// stops obviously malformed input before a network round trip.
///
/// # Errors
///
/// Returns `Missing` for blank input and `InvalidEmail` for malformed input.
pub fn require_email(value: &str) -> Result<&str, FieldError> {
    let email = require_non_empty("email", value)?;
    let plausible = EMAIL_SHAPE
        .as_ref()
        .is_some_and(|pattern| pattern.is_match(email));
    if plausible {
        Ok(email)
    } else {
        Err(FieldError::InvalidEmail)
    }
}
