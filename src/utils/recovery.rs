use std::panic::AssertUnwindSafe;

use actix_web::{
    body::{BoxBody, MessageBody},
    dev::{ServiceRequest, ServiceResponse},
    middleware::Next,
    Error,
};
use futures_util::FutureExt;
use log::error;

use crate::utils::responses::ResponseBuilder;

/// Middleware that turns a panicking handler into a generic 500 response.
///
/// Register with `actix_web::middleware::from_fn(recover_panic)`. The worker
/// keeps serving after the panic.
///
/// # Errors
///
/// Propagates errors returned by the wrapped service unchanged.
pub async fn recover_panic(
    req: ServiceRequest,
    next: Next<impl MessageBody + 'static>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let http_req = req.request().clone();

    match AssertUnwindSafe(next.call(req)).catch_unwind().await {
        Ok(result) => result.map(ServiceResponse::map_into_boxed_body),
        Err(panic) => {
            let detail = panic
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "non-string panic payload".to_string());
            error!(
                "Handler panicked on {} {}: {detail}",
                http_req.method(),
                http_req.path()
            );
            Ok(ServiceResponse::new(http_req, ResponseBuilder::server_error()))
        }
    }
}
