use std::{collections::HashMap, sync::Arc};

use actix_web::{
    http::StatusCode,
    middleware::from_fn,
    test, web, App, HttpResponse,
};
use jetpack_core::{
    errors::{ErrorClass, Failure},
    registry::Handler,
    HandlerTable, RequestContext,
};
use serde_json::{json, Value};

use crate::{
    error::{json_config, path_config, query_config},
    exception_handlers::{exception_handlers, GENERIC_MESSAGE, VALIDATION_MESSAGE},
    middleware::{correlation_id, handle_exceptions},
    routes::{self, ERROR_KINDS, NOT_FOUND},
};

const SUPPLIED_ID: &str = "0f8fad5b-d9cb-469f-a165-70867728950e";

fn default_table() -> HandlerTable<HttpResponse> {
    exception_handlers(&ERROR_KINDS, None, HashMap::new())
}

macro_rules! service {
    ($table:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new($table))
                .app_data(json_config())
                .app_data(query_config())
                .app_data(path_config())
                .wrap(from_fn(handle_exceptions))
                .wrap(from_fn(correlation_id))
                .configure(routes::configure),
        )
        .await
    };
}

fn header_id(resp: &actix_web::dev::ServiceResponse<impl actix_web::body::MessageBody>) -> String {
    resp.headers()
        .get("x-request-id")
        .expect("request id echoed")
        .to_str()
        .unwrap()
        .to_owned()
}

#[actix_web::test]
async fn health_carries_generated_request_id() {
    let app = service!(default_table());
    let req = test::TestRequest::get().uri("/health").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let id = header_id(&resp);
    assert_eq!(id.len(), 32);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "success");
    assert_eq!(body["message"], "Response fetched successfully");
    assert_eq!(body["data"], json!({"healthy": true}));
    assert_eq!(body["meta"]["request_id"], id.as_str());
}

#[actix_web::test]
async fn valid_request_id_is_reused() {
    let app = service!(default_table());
    let req = test::TestRequest::get()
        .uri("/items/7")
        .insert_header(("X-Request-ID", SUPPLIED_ID))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(header_id(&resp), SUPPLIED_ID);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"], json!({"id": 7, "name": "item-7"}));
    assert_eq!(body["meta"]["request_id"], SUPPLIED_ID);
}

#[actix_web::test]
async fn invalid_request_id_is_replaced() {
    let app = service!(default_table());
    let req = test::TestRequest::get()
        .uri("/health")
        .insert_header(("X-Request-ID", "definitely not a uuid"))
        .to_request();
    let resp = test::call_service(&app, req).await;

    let id = header_id(&resp);
    assert_ne!(id, "definitely not a uuid");
    assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
}

#[actix_web::test]
async fn structured_error_uses_generated_handler() {
    let app = service!(default_table());
    let req = test::TestRequest::get()
        .uri("/items/0")
        .insert_header(("X-Request-ID", SUPPLIED_ID))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(header_id(&resp), SUPPLIED_ID);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "failure");
    assert_eq!(body["message"], "ITEM_404: Item not found");
    assert_eq!(body["error"], json!({"code": "ITEM_404"}));
    assert_eq!(body["meta"]["request_id"], SUPPLIED_ID);
}

#[actix_web::test]
async fn bad_path_parameter_is_a_validation_failure() {
    let app = service!(default_table());
    let req = test::TestRequest::get().uri("/items/abc").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], VALIDATION_MESSAGE);
    assert_eq!(body["error"][0]["loc"], json!(["path"]));
    assert_eq!(body["error"][0]["type"], "path_invalid");
}

#[actix_web::test]
async fn malformed_json_is_a_validation_failure() {
    let app = service!(default_table());
    let req = test::TestRequest::post()
        .uri("/echo")
        .insert_header(("content-type", "application/json"))
        .set_payload("{\"name\": ")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"][0]["loc"], json!(["body"]));
}

#[actix_web::test]
async fn route_level_validation_reports_the_field() {
    let app = service!(default_table());
    let req = test::TestRequest::post()
        .uri("/echo")
        .set_json(json!({"name": "   "}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(
        body["error"],
        json!([{"loc": ["body", "name"], "msg": "name must not be blank", "type": "value_error"}])
    );
}

#[actix_web::test]
async fn echo_returns_payload() {
    let app = service!(default_table());
    let req = test::TestRequest::post()
        .uri("/echo")
        .set_json(json!({"name": "jetpack", "tags": ["a"]}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "Echoed");
    assert_eq!(body["data"], json!({"name": "jetpack", "tags": ["a"]}));
}

#[actix_web::test]
async fn unhandled_failure_hides_details() {
    let app = service!(default_table());
    let req = test::TestRequest::get().uri("/boom").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], GENERIC_MESSAGE);
    assert!(!body.to_string().contains("simulated crash"));
}

#[actix_web::test]
async fn extra_handlers_override_generated_ones() {
    let gone: Handler<HttpResponse> = Arc::new(|failure: &Failure, ctx: &RequestContext| {
        HttpResponse::Gone().json(json!({
            "reason": failure.to_string(),
            "request_id": ctx.correlation_id().map(|id| id.as_str().to_owned()),
        }))
    });
    let mut extra = HashMap::new();
    extra.insert(ErrorClass::Structured(NOT_FOUND), gone);

    let app = service!(exception_handlers(&ERROR_KINDS, None, extra));
    let req = test::TestRequest::get()
        .uri("/items/0")
        .insert_header(("X-Request-ID", SUPPLIED_ID))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::GONE);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["reason"], "ITEM_404: Item not found");
    assert_eq!(body["request_id"], SUPPLIED_ID);
}

#[actix_web::test]
async fn errors_render_without_exception_middleware() {
    let app = test::init_service(App::new().configure(routes::configure)).await;
    let req = test::TestRequest::get().uri("/items/0").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "ITEM_404: Item not found");
    assert_eq!(body["meta"]["request_id"], Value::Null);
}
