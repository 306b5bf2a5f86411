//! HTTP response handling
//!
//! A single place to build the JSON error bodies, redirects and JSON success
//! responses used across handlers. Error bodies always have the shape
//! `{"error": code, "message": text}`.

use actix_web::{cookie::Cookie, http::header, http::StatusCode, HttpResponse};
use serde_json::{json, Value};

// ===============================
// CACHED RESPONSES
// ===============================

/// Pre-serialized body for the generic 500, which carries no request-specific detail
static CACHED_RESPONSES: std::sync::LazyLock<CachedResponses> =
    std::sync::LazyLock::new(CachedResponses::new);

struct CachedResponses {
    server_error: String,
}

impl CachedResponses {
    fn new() -> Self {
        Self {
            server_error: Self::create_json(
                ErrorType::InternalServerError.default_error_code(),
                ErrorType::InternalServerError.default_message(),
            ),
        }
    }

    fn create_json(error: &str, message: &str) -> String {
        json!({
            "error": error,
            "message": message
        })
        .to_string()
    }

    fn respond(status: StatusCode, body: &str) -> HttpResponse {
        HttpResponse::build(status)
            .insert_header((header::CONTENT_TYPE, "application/json"))
            .body(body.to_string())
    }
}

/// Unified response builder that handles all types of HTTP responses
pub struct ResponseBuilder;

impl ResponseBuilder {
    // ===============================
    // ERROR RESPONSE METHODS
    // ===============================

    /// `400 Bad Request`
    #[must_use]
    pub fn bad_request() -> ErrorResponseBuilder {
        ErrorResponseBuilder::new(ErrorType::BadRequest)
    }

    /// `401 Unauthorized`
    #[must_use]
    pub fn unauthorized() -> ErrorResponseBuilder {
        ErrorResponseBuilder::new(ErrorType::Unauthorized)
    }

    /// `409 Conflict`
    #[must_use]
    pub fn conflict() -> ErrorResponseBuilder {
        ErrorResponseBuilder::new(ErrorType::Conflict)
    }

    // ===============================
    // SUCCESS RESPONSE METHODS
    // ===============================

    /// Temporary redirect (307) that preserves the request method
    #[must_use]
    pub fn redirect(location: &str) -> RedirectBuilder {
        RedirectBuilder::new(location)
    }

    /// `200 OK` with JSON content
    #[must_use]
    pub fn ok() -> JsonResponseBuilder {
        JsonResponseBuilder::new(StatusCode::OK)
    }

    /// `201 Created` with JSON content
    #[must_use]
    pub fn created() -> JsonResponseBuilder {
        JsonResponseBuilder::new(StatusCode::CREATED)
    }

    // ===============================
    // CONVENIENCE METHODS
    // ===============================

    /// Generic 500 that never carries upstream detail
    #[must_use]
    pub fn server_error() -> HttpResponse {
        CachedResponses::respond(
            StatusCode::INTERNAL_SERVER_ERROR,
            &CACHED_RESPONSES.server_error,
        )
    }
}

// ===============================
// BUILDER TYPES
// ===============================

/// Builder for error responses with fluent interface
pub struct ErrorResponseBuilder {
    error_type: ErrorType,
    error_code: Option<String>,
    message: Option<String>,
}

/// Builder for redirect responses
pub struct RedirectBuilder {
    location: String,
    cookies: Vec<Cookie<'static>>,
}

/// Builder for JSON responses
pub struct JsonResponseBuilder {
    status_code: StatusCode,
}

#[derive(Clone, Copy)]
enum ErrorType {
    BadRequest,
    Unauthorized,
    Conflict,
    InternalServerError,
}

impl ErrorType {
    fn status(self) -> StatusCode {
        match self {
            Self::BadRequest => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Conflict => StatusCode::CONFLICT,
            Self::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn default_error_code(self) -> &'static str {
        match self {
            Self::BadRequest => "invalid_request",
            Self::Unauthorized => "unauthorized",
            Self::Conflict => "conflict",
            Self::InternalServerError => "server_error",
        }
    }

    fn default_message(self) -> &'static str {
        match self {
            Self::BadRequest => "The request is malformed or invalid",
            Self::Unauthorized => "Authentication is required to access this resource",
            Self::Conflict => "The resource already exists",
            Self::InternalServerError => "An internal server error occurred",
        }
    }
}

impl ErrorResponseBuilder {
    fn new(error_type: ErrorType) -> Self {
        Self {
            error_type,
            error_code: None,
            message: None,
        }
    }

    /// Set a custom error code (e.g. "`invalid_state`", "`email_exists`")
    #[must_use]
    pub fn with_error_code(mut self, code: &str) -> Self {
        self.error_code = Some(code.to_string());
        self
    }

    #[must_use]
    pub fn with_message(mut self, message: &str) -> Self {
        self.message = Some(message.to_string());
        self
    }

    /// Build the final `HttpResponse`, filling unset fields with the defaults for its status
    #[must_use]
    pub fn build(self) -> HttpResponse {
        let error_code = self
            .error_code
            .unwrap_or_else(|| self.error_type.default_error_code().to_string());
        let message = self
            .message
            .unwrap_or_else(|| self.error_type.default_message().to_string());

        HttpResponse::build(self.error_type.status()).json(json!({
            "error": Value::String(error_code),
            "message": Value::String(message),
        }))
    }
}

impl RedirectBuilder {
    fn new(location: &str) -> Self {
        Self {
            location: location.to_string(),
            cookies: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_cookie(mut self, cookie: Cookie<'static>) -> Self {
        self.cookies.push(cookie);
        self
    }

    #[must_use]
    pub fn build(self) -> HttpResponse {
        let mut builder = HttpResponse::TemporaryRedirect();
        for cookie in self.cookies {
            builder.cookie(cookie);
        }
        builder
            .insert_header((header::LOCATION, self.location))
            .finish()
    }
}

impl JsonResponseBuilder {
    fn new(status_code: StatusCode) -> Self {
        Self { status_code }
    }

    /// Build the response with JSON content
    #[must_use]
    pub fn json<T: serde::Serialize>(self, data: &T) -> HttpResponse {
        HttpResponse::build(self.status_code).json(data)
    }
}
