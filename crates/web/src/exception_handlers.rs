//! JSON renderings of request failures and the handler table built from them.

use std::{collections::HashMap, sync::Arc};

use actix_web::HttpResponse;
use jetpack_core::{
    errors::{ErrorClass, ErrorKind, Failure, ServiceError, ValidationError},
    registry::{Handler, HandlerDefaults, HandlerTable},
    responses::FailureResponse,
    RequestContext,
};
use serde_json::{json, Value};

use crate::error::structured_status;

pub const GENERIC_MESSAGE: &str = "Something went wrong. Please contact support.";
pub const VALIDATION_MESSAGE: &str = "Request Validation Error";

/// Built-in handlers answering with a [`FailureResponse`] body.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonHandlers;

impl HandlerDefaults<HttpResponse> for JsonHandlers {
    fn generic(&self) -> Handler<HttpResponse> {
        Arc::new(|failure: &Failure, ctx: &RequestContext| {
            tracing::error!(error = %failure, "unhandled failure while serving request");
            render_generic(ctx)
        })
    }

    fn validation(&self) -> Handler<HttpResponse> {
        Arc::new(|failure: &Failure, ctx: &RequestContext| {
            tracing::error!(error = %failure, "request validation failed");
            render(failure, ctx)
        })
    }

    fn structured(&self, kind: ErrorKind) -> Handler<HttpResponse> {
        Arc::new(move |failure: &Failure, ctx: &RequestContext| {
            tracing::error!(kind = %kind, error = %failure, "{kind} raised while serving request");
            render(failure, ctx)
        })
    }
}

/// Table with the JSON defaults, one generated handler per kind in
/// `error_kinds`, then `extra_handlers` applied on top.
pub fn exception_handlers(
    error_kinds: &[ErrorKind],
    validation_override: Option<Handler<HttpResponse>>,
    extra_handlers: HashMap<ErrorClass, Handler<HttpResponse>>,
) -> HandlerTable<HttpResponse> {
    HandlerTable::build(&JsonHandlers, error_kinds, validation_override, extra_handlers)
}

pub fn render(failure: &Failure, ctx: &RequestContext) -> HttpResponse {
    match failure {
        Failure::Structured(err) => render_structured(err, ctx),
        Failure::Validation(err) => render_validation(err, ctx),
        Failure::Unhandled(_) => render_generic(ctx),
    }
}

pub fn render_generic(ctx: &RequestContext) -> HttpResponse {
    let body: FailureResponse = FailureResponse::from_context(ctx).with_message(GENERIC_MESSAGE);
    HttpResponse::InternalServerError().json(body)
}

pub fn render_validation(err: &ValidationError, ctx: &RequestContext) -> HttpResponse {
    let body: FailureResponse<Value, _> = FailureResponse::from_context(ctx)
        .with_message(VALIDATION_MESSAGE)
        .with_error(err.errors());
    HttpResponse::UnprocessableEntity().json(body)
}

pub fn render_structured(err: &ServiceError, ctx: &RequestContext) -> HttpResponse {
    let body: FailureResponse = FailureResponse::from_context(ctx)
        .with_message(err.rendered_message())
        .with_error(json!({ "code": err.code() }));
    HttpResponse::build(structured_status(err)).json(body)
}
