use actix_web::{
    error::{JsonPayloadError, PathError, QueryPayloadError},
    http::StatusCode,
    web, HttpResponse, ResponseError,
};
use jetpack_core::{
    errors::{FieldError, Failure, ServiceError, ValidationError},
    RequestContext,
};
use serde_json::error::Category;
use thiserror::Error;

use crate::exception_handlers;

/// Failure raised by a route. Converted into a response either by the
/// exception middleware or, when that is absent, by `ResponseError`.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct ApiError(#[from] pub Failure);

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        Self(Failure::Structured(err))
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        Self(Failure::Validation(err))
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        status_for(&self.0)
    }

    fn error_response(&self) -> HttpResponse {
        exception_handlers::render(&self.0, &RequestContext::detached())
    }
}

pub(crate) fn status_for(failure: &Failure) -> StatusCode {
    match failure {
        Failure::Structured(err) => structured_status(err),
        Failure::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        Failure::Unhandled(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Carried status, or 500 when it is not a usable HTTP status.
pub(crate) fn structured_status(err: &ServiceError) -> StatusCode {
    StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| ApiError::from(json_failure(&err)).into())
}

pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err, _req| ApiError::from(query_failure(&err)).into())
}

pub fn path_config() -> web::PathConfig {
    web::PathConfig::default().error_handler(|err, _req| ApiError::from(path_failure(&err)).into())
}

fn json_failure(err: &JsonPayloadError) -> ValidationError {
    let kind = match err {
        JsonPayloadError::Deserialize(inner) => match inner.classify() {
            Category::Data => "value_error",
            Category::Syntax | Category::Eof | Category::Io => "json_invalid",
        },
        JsonPayloadError::ContentType => "content_type",
        JsonPayloadError::Overflow { .. } | JsonPayloadError::OverflowKnownLength { .. } => {
            "payload_too_large"
        }
        _ => "body_invalid",
    };
    ValidationError::single(FieldError::new(["body"], err.to_string(), kind))
}

fn query_failure(err: &QueryPayloadError) -> ValidationError {
    ValidationError::single(FieldError::new(["query"], err.to_string(), "query_invalid"))
}

fn path_failure(err: &PathError) -> ValidationError {
    ValidationError::single(FieldError::new(["path"], err.to_string(), "path_invalid"))
}
