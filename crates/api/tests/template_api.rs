//! HTTP tests for `/api/v1/templates`.

mod common;

use axum::http::StatusCode;
use common::{body_json, delete, get, post_json, put_json, TestApp};
use serde_json::{json, Value};

fn welcome_body() -> Value {
    json!({
        "slug": "welcome_note",
        "channel": "EMAIL",
        "nameAr": "ترحيب",
        "nameEn": "Welcome",
        "subjectAr": "أهلاً {{name}}",
        "subjectEn": "Welcome {{name}}",
        "bodyAr": "مرحباً {{name}}",
        "bodyEn": "Hello {{name}}",
        "variables": ["name"],
    })
}

async fn create_welcome(app: &TestApp) -> i64 {
    let response = post_json(
        app.router(),
        "/api/v1/templates",
        &app.admin_token(),
        welcome_body(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["data"]["id"].as_i64().unwrap()
}

async fn system_template_id(app: &TestApp) -> i64 {
    let response = get(app.router(), "/api/v1/templates", &app.admin_token()).await;
    let json = body_json(response).await;
    json["data"]
        .as_array()
        .unwrap()
        .iter()
        .find(|t| t["isSystem"] == true)
        .and_then(|t| t["id"].as_i64())
        .unwrap()
}

#[tokio::test]
async fn create_then_get_template() {
    let app = common::build_test_app();
    let id = create_welcome(&app).await;

    let response = get(
        app.router(),
        &format!("/api/v1/templates/{id}"),
        &app.admin_token(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["slug"], "welcome_note");
    assert_eq!(json["data"]["isActive"], true);
    assert_eq!(json["data"]["isSystem"], false);
    assert_eq!(json["data"]["variables"], json!(["name"]));
}

#[tokio::test]
async fn duplicate_slug_is_409() {
    let app = common::build_test_app();
    create_welcome(&app).await;

    let response = post_json(
        app.router(),
        "/api/v1/templates",
        &app.admin_token(),
        welcome_body(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["code"], "CONFLICT");
}

#[tokio::test]
async fn undeclared_placeholder_is_rejected_at_save() {
    let app = common::build_test_app();
    let mut body = welcome_body();
    body["bodyEn"] = json!("Hello {{name}}, your code is {{code}}");

    let response = post_json(app.router(), "/api/v1/templates", &app.admin_token(), body).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "VALIDATION_ERROR");
    assert_eq!(json["error"], "Undeclared placeholders: code");
}

#[tokio::test]
async fn update_merges_fields_and_keeps_slug() {
    let app = common::build_test_app();
    let id = create_welcome(&app).await;

    let response = put_json(
        app.router(),
        &format!("/api/v1/templates/{id}"),
        &app.admin_token(),
        json!({ "slug": "welcome_note", "bodyEn": "Hi {{name}}!", "isActive": false }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["bodyEn"], "Hi {{name}}!");
    assert_eq!(json["data"]["bodyAr"], "مرحباً {{name}}");
    assert_eq!(json["data"]["isActive"], false);
}

#[tokio::test]
async fn changing_slug_is_400() {
    let app = common::build_test_app();
    let id = create_welcome(&app).await;

    let response = put_json(
        app.router(),
        &format!("/api/v1/templates/{id}"),
        &app.admin_token(),
        json!({ "slug": "renamed" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["error"],
        "Template slug cannot be changed"
    );
}

#[tokio::test]
async fn system_template_cannot_be_deleted() {
    let app = common::build_test_app();
    let id = system_template_id(&app).await;

    let response = delete(
        app.router(),
        &format!("/api/v1/templates/{id}"),
        &app.admin_token(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let response = get(
        app.router(),
        &format!("/api/v1/templates/{id}"),
        &app.admin_token(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn custom_template_delete_then_404() {
    let app = common::build_test_app();
    let id = create_welcome(&app).await;

    let response = delete(
        app.router(),
        &format!("/api/v1/templates/{id}"),
        &app.admin_token(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = get(
        app.router(),
        &format!("/api/v1/templates/{id}"),
        &app.admin_token(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn template_routes_need_template_grants() {
    let app = common::build_test_app();
    let response = get(app.router(), "/api/v1/templates", &app.reader_token()).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = post_json(
        app.router(),
        "/api/v1/templates",
        &app.reader_token(),
        welcome_body(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
