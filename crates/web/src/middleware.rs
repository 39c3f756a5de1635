//! Request-scoped middleware, installed with `actix_web::middleware::from_fn`.
//!
//! `correlation_id` must wrap `handle_exceptions` so the handlers run inside
//! the request span and see the stored context.

use actix_web::{
    body::{BoxBody, MessageBody},
    dev::{ServiceRequest, ServiceResponse},
    http::header::{HeaderName, HeaderValue},
    middleware::Next,
    web, Error, HttpMessage, HttpResponse,
};
use jetpack_core::{
    context::{CorrelationId, REQUEST_ID_HEADER},
    HandlerTable, RequestContext,
};
use tracing::Instrument;

use crate::{error::ApiError, extract::request_context};

pub async fn correlation_id(
    req: ServiceRequest,
    next: Next<impl MessageBody>,
) -> Result<ServiceResponse<impl MessageBody>, Error> {
    let id = incoming_id(&req);
    let ctx = RequestContext::with_correlation_id(id.clone());
    let span = ctx.request_span(req.method().as_str(), req.path());
    req.extensions_mut().insert(ctx);

    let mut res = next.call(req).instrument(span).await?;
    if let Ok(value) = HeaderValue::from_str(id.as_str()) {
        res.headers_mut()
            .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
    }
    Ok(res)
}

fn incoming_id(req: &ServiceRequest) -> CorrelationId {
    let Some(raw) = req.headers().get(REQUEST_ID_HEADER) else {
        return CorrelationId::generate();
    };
    match raw.to_str() {
        Ok(value) => CorrelationId::parse(value).unwrap_or_else(|err| {
            tracing::warn!(error = %err, "replacing invalid request id");
            CorrelationId::generate()
        }),
        Err(_) => {
            tracing::warn!("replacing non-ascii request id");
            CorrelationId::generate()
        }
    }
}

/// Replaces responses carrying an [`ApiError`] with the output of the
/// registered [`HandlerTable`]. Other responses pass through.
pub async fn handle_exceptions(
    req: ServiceRequest,
    next: Next<impl MessageBody + 'static>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let table = req
        .app_data::<web::Data<HandlerTable<HttpResponse>>>()
        .cloned();
    let res = next.call(req).await?;

    let replacement = match (table, res.response().error()) {
        (Some(table), Some(err)) => err.as_error::<ApiError>().and_then(|api| {
            let ctx = request_context(res.request());
            table.dispatch(&api.0, &ctx)
        }),
        _ => None,
    };

    Ok(match replacement {
        Some(response) => res.into_response(response),
        None => res.map_into_boxed_body(),
    })
}
