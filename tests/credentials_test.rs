// HTTP tests for email/password sign-up and sign-in
use std::sync::Arc;

use actix_web::{
    dev::ServiceResponse,
    http::{header, StatusCode},
    test, App,
};
use authbridge::{
    identity::{FirebaseAuthClient, ServiceAccount},
    oauth::jwt_validation::IdTokenVerifier,
    settings::TrustModel,
    testing::{
        fixtures::{TEST_CLIENT_ID, TEST_RSA_PRIVATE_KEY},
        InMemoryIdentityProvider, MockOAuthClient, TestFixtures,
    },
    AppServices, ProfileDirectory,
};
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn services(identity: &Arc<InMemoryIdentityProvider>, verify_password: bool) -> AppServices {
    let mut settings = TestFixtures::settings(TrustModel::IdToken);
    settings.credentials.verify_password = verify_password;
    AppServices::from_settings(
        &settings,
        identity.clone(),
        Arc::new(MockOAuthClient::new()),
        ProfileDirectory::from_profiles(Vec::new()),
    )
}

async fn post_json(services: &AppServices, uri: &str, body: &Value) -> ServiceResponse {
    let app = test::init_service(App::new().configure(|cfg| services.configure(cfg))).await;
    let req = test::TestRequest::post().uri(uri).set_json(body).to_request();
    test::call_service(&app, req).await
}

async fn post_raw(services: &AppServices, uri: &str, body: &'static str) -> ServiceResponse {
    let app = test::init_service(App::new().configure(|cfg| services.configure(cfg))).await;
    let req = test::TestRequest::post()
        .uri(uri)
        .insert_header((header::CONTENT_TYPE, "application/json"))
        .set_payload(body)
        .to_request();
    test::call_service(&app, req).await
}

#[actix_web::test]
async fn test_sign_up_returns_created_identity() {
    let identity = Arc::new(InMemoryIdentityProvider::new());
    let services = services(&identity, true);

    let resp = post_json(
        &services,
        "/auth/signup",
        &json!({"email": "ada@example.com", "password": "s3cret-pw", "name": "Ada"}),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    assert!(!body["user"]["id"].as_str().unwrap().is_empty());
    assert_eq!(body["user"]["email"], "ada@example.com");
    assert_eq!(body["user"]["name"], "Ada");
    assert!(body["token"].as_str().unwrap().starts_with("custom-token."));
    assert!(identity.contains_email("ada@example.com"));
    assert_eq!(identity.create_calls(), 1);
    assert_eq!(identity.custom_token_calls(), 1);
}

#[actix_web::test]
async fn test_sign_up_duplicate_email_is_conflict() {
    let identity = Arc::new(InMemoryIdentityProvider::new());
    identity.insert("ada@example.com", "s3cret-pw", "Ada");
    let services = services(&identity, true);

    let resp = post_json(
        &services,
        "/auth/signup",
        &json!({"email": "ada@example.com", "password": "another-pw", "name": "Ada Again"}),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "email_exists");
    assert_eq!(identity.user_count(), 1);
    assert_eq!(identity.custom_token_calls(), 0);
}

#[actix_web::test]
async fn test_sign_up_weak_password_is_bad_request() {
    let identity = Arc::new(InMemoryIdentityProvider::new());
    let services = services(&identity, true);

    let resp = post_json(
        &services,
        "/auth/signup",
        &json!({"email": "ada@example.com", "password": "123", "name": "Ada"}),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "invalid_input");
    assert!(!body["message"].as_str().unwrap().contains("WEAK_PASSWORD"));
    assert_eq!(identity.user_count(), 0);
}

#[actix_web::test]
async fn test_sign_up_empty_field_rejected_before_provider() {
    let identity = Arc::new(InMemoryIdentityProvider::new());
    let services = services(&identity, true);

    let resp = post_json(
        &services,
        "/auth/signup",
        &json!({"email": "ada@example.com", "password": "s3cret-pw", "name": "   "}),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "missing_field");
    assert_eq!(identity.total_calls(), 0);
}

#[actix_web::test]
async fn test_sign_up_bad_email_rejected_before_provider() {
    let identity = Arc::new(InMemoryIdentityProvider::new());
    let services = services(&identity, true);

    let resp = post_json(
        &services,
        "/auth/signup",
        &json!({"email": "not-an-email", "password": "s3cret-pw", "name": "Ada"}),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "invalid_email");
    assert_eq!(identity.total_calls(), 0);
}

#[actix_web::test]
async fn test_malformed_json_is_bad_request_with_no_provider_calls() {
    let identity = Arc::new(InMemoryIdentityProvider::new());
    let services = services(&identity, true);

    for uri in ["/auth/signup", "/auth/signin"] {
        let resp = post_raw(&services, uri, r#"{"email": "ada@example.com", "#).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{uri}");
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "invalid_request");
    }

    let resp = post_raw(&services, "/auth/signup", r#"{"email": "ada@example.com"}"#).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    assert_eq!(identity.total_calls(), 0);
}

#[actix_web::test]
async fn test_sign_up_provider_failure_is_generic_500() {
    let identity = Arc::new(InMemoryIdentityProvider::new());
    identity.fail_creates_with("quota exhausted for project secret-project");
    let services = services(&identity, true);

    let resp = post_json(
        &services,
        "/auth/signup",
        &json!({"email": "ada@example.com", "password": "s3cret-pw", "name": "Ada"}),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = test::read_body(resp).await;
    let text = String::from_utf8_lossy(&body);
    assert!(text.contains("server_error"));
    assert!(!text.contains("secret-project"));
}

#[actix_web::test]
async fn test_sign_in_returns_token_for_existing_account() {
    let identity = Arc::new(InMemoryIdentityProvider::new());
    let existing = identity.insert("ada@example.com", "s3cret-pw", "Ada");
    let services = services(&identity, true);

    let resp = post_json(
        &services,
        "/auth/signin",
        &json!({"email": "ada@example.com", "password": "s3cret-pw"}),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["user"]["id"], existing.id.as_str());
    assert_eq!(body["user"]["name"], "Ada");
    assert_eq!(identity.verify_password_calls(), 1);
}

#[actix_web::test]
async fn test_sign_in_unknown_email_is_unauthorized_for_any_password() {
    let identity = Arc::new(InMemoryIdentityProvider::new());
    let services = services(&identity, false);

    for password in ["", "anything", "s3cret-pw"] {
        let resp = post_json(
            &services,
            "/auth/signin",
            &json!({"email": "ghost@example.com", "password": password}),
        )
        .await;

        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "invalid_credentials");
    }
    assert_eq!(identity.custom_token_calls(), 0);
}

#[actix_web::test]
async fn test_sign_in_wrong_password_rejected_when_verification_enabled() {
    let identity = Arc::new(InMemoryIdentityProvider::new());
    identity.insert("ada@example.com", "s3cret-pw", "Ada");
    let services = services(&identity, true);

    let resp = post_json(
        &services,
        "/auth/signin",
        &json!({"email": "ada@example.com", "password": "wrong"}),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(identity.custom_token_calls(), 0);
}

#[actix_web::test]
async fn test_sign_in_wrong_password_accepted_when_verification_disabled() {
    let identity = Arc::new(InMemoryIdentityProvider::new());
    let existing = identity.insert("ada@example.com", "s3cret-pw", "Ada");
    let services = services(&identity, false);

    let resp = post_json(
        &services,
        "/auth/signin",
        &json!({"email": "ada@example.com", "password": "wrong"}),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["user"]["id"], existing.id.as_str());
    assert_eq!(identity.verify_password_calls(), 0);
}

#[actix_web::test]
async fn test_sign_in_empty_email_is_bad_request() {
    let identity = Arc::new(InMemoryIdentityProvider::new());
    let services = services(&identity, true);

    let resp = post_json(
        &services,
        "/auth/signin",
        &json!({"email": "", "password": "s3cret-pw"}),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(identity.total_calls(), 0);
}

#[actix_web::test]
async fn test_sign_up_then_sign_in_round_trip() {
    let identity = Arc::new(InMemoryIdentityProvider::new());
    let services = services(&identity, true);

    let resp = post_json(
        &services,
        "/auth/signup",
        &json!({"email": "grace@example.com", "password": "c0bol-rules", "name": "Grace"}),
    )
    .await;
    let created: Value = test::read_body_json(resp).await;

    let resp = post_json(
        &services,
        "/auth/signin",
        &json!({"email": "grace@example.com", "password": "c0bol-rules"}),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let signed_in: Value = test::read_body_json(resp).await;

    assert_eq!(signed_in["user"], created["user"]);
    assert_ne!(signed_in["token"], created["token"]);
}

#[actix_web::test]
async fn test_sign_in_empty_password_against_identity_toolkit_is_unauthorized() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "ya29.admin",
            "expires_in": 3600
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/projects/demo/accounts:lookup"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "users": [{"localId": "uid-1", "email": "ada@example.com", "displayName": "Ada"}]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/accounts:signInWithPassword"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {"code": 400, "message": "MISSING_PASSWORD"}
        })))
        .mount(&server)
        .await;

    let settings = TestFixtures::settings(TrustModel::IdToken);
    let http = reqwest::Client::new();
    let account = ServiceAccount {
        project_id: "demo".to_string(),
        client_email: "svc@demo.iam.gserviceaccount.com".to_string(),
        private_key: TEST_RSA_PRIVATE_KEY.to_string(),
        private_key_id: None,
        token_uri: format!("{}/token", server.uri()),
    };
    let verifier = IdTokenVerifier::new(
        http.clone(),
        &format!("{}/certs", server.uri()),
        settings.google.issuers.clone(),
        Some(TEST_CLIENT_ID.to_string()),
    );
    let identity =
        FirebaseAuthClient::new(http, account, &server.uri(), Some("web-key".to_string()), verifier)
            .unwrap();
    let services = AppServices::from_settings(
        &settings,
        Arc::new(identity),
        Arc::new(MockOAuthClient::new()),
        ProfileDirectory::from_profiles(Vec::new()),
    );

    for password in ["", "wrong"] {
        // "wrong" reaches signInWithPassword, which the stub answers with MISSING_PASSWORD
        let resp = post_json(
            &services,
            "/auth/signin",
            &json!({"email": "ada@example.com", "password": password}),
        )
        .await;

        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "invalid_credentials");
    }
}
