use actix_web::{http::header, web, HttpResponse};

use crate::profiles::ProfileDirectory;

const USAGE: &str = "\
authbridge

Endpoints:
  GET  /users                 list team profiles
  POST /auth/signup           create an account: {\"email\", \"password\", \"name\"}
  POST /auth/signin           sign in: {\"email\", \"password\"}
  GET  /auth/google/signin    start Google sign-in
  GET  /auth/google/callback  Google redirects here with ?code=&state=
";

/// `GET /` plain-text usage help
pub async fn home() -> HttpResponse {
    HttpResponse::Ok()
        .insert_header((header::CONTENT_TYPE, "text/plain; charset=utf-8"))
        .body(USAGE)
}

/// `GET /users`
pub async fn list_users(profiles: web::Data<ProfileDirectory>) -> HttpResponse {
    HttpResponse::Ok().json(profiles.all())
}
