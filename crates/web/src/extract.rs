use std::future::{ready, Ready};

use actix_web::{dev::Payload, Error, FromRequest, HttpMessage, HttpRequest};
use jetpack_core::RequestContext;

/// Context stored by the correlation middleware. Detached when the
/// middleware is not installed.
pub fn request_context(req: &HttpRequest) -> RequestContext {
    req.extensions()
        .get::<RequestContext>()
        .cloned()
        .unwrap_or_default()
}

/// Extractor handing routes their [`RequestContext`].
#[derive(Debug, Clone)]
pub struct Ctx(pub RequestContext);

impl FromRequest for Ctx {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(Ok(Ctx(request_context(req))))
    }
}
