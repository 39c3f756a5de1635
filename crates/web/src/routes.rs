use actix_web::{web, HttpResponse};
use jetpack_core::{
    errors::{ErrorKind, Failure, FieldError, ServiceError, ValidationError},
    SuccessResponse,
};
use serde::{Deserialize, Serialize};

use crate::{error::ApiError, extract::Ctx};

pub const NOT_FOUND: ErrorKind = ErrorKind::new("NotFoundError");

/// Kinds the reference service registers generated handlers for.
pub const ERROR_KINDS: [ErrorKind; 2] = [ErrorKind::BASE, NOT_FOUND];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Item {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EchoRequest {
    pub name: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_handler))
        .route("/items/{id}", web::get().to(item_handler))
        .route("/echo", web::post().to(echo_handler))
        .route("/boom", web::get().to(boom_handler));
}

pub async fn health_handler(Ctx(ctx): Ctx) -> HttpResponse {
    HttpResponse::Ok().json(
        SuccessResponse::new(serde_json::json!({ "healthy": true })).with_context(&ctx),
    )
}

pub async fn item_handler(
    Ctx(ctx): Ctx,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    if id == 0 {
        return Err(ServiceError::new("Item not found")
            .of_kind(NOT_FOUND)
            .with_code("ITEM_404")
            .with_status(404)
            .into());
    }
    tracing::info!(item_id = id, "serving item");
    let item = Item {
        id,
        name: format!("item-{id}"),
    };
    Ok(HttpResponse::Ok().json(SuccessResponse::new(item).with_context(&ctx)))
}

pub async fn echo_handler(
    Ctx(ctx): Ctx,
    payload: web::Json<EchoRequest>,
) -> Result<HttpResponse, ApiError> {
    let payload = payload.into_inner();
    if payload.name.trim().is_empty() {
        return Err(ValidationError::single(FieldError::new(
            ["body", "name"],
            "name must not be blank",
            "value_error",
        ))
        .into());
    }
    Ok(HttpResponse::Ok().json(
        SuccessResponse::new(payload)
            .with_message("Echoed")
            .with_context(&ctx),
    ))
}

pub async fn boom_handler() -> Result<HttpResponse, ApiError> {
    Err(Failure::unhandled("simulated crash").into())
}
