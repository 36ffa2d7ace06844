//! HTTP tests for `/api/v1/reports`.

mod common;

use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use common::{body_bytes, body_json, delete, get, post_json, TestApp};
use ebic_messaging::ReportWorkerConfig;
use serde_json::json;

async fn create_report(app: &TestApp, token: &str, name: &str, format: &str) -> i64 {
    let response = post_json(
        app.router(),
        "/api/v1/reports",
        token,
        json!({
            "name": name,
            "type": "SUBMISSIONS_SUMMARY",
            "format": format,
            "parameters": { "from": "2026-01-01" },
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["data"]["status"], "PENDING");
    json["data"]["id"].as_i64().unwrap()
}

#[tokio::test]
async fn list_is_scoped_to_caller() {
    let app = common::build_test_app();
    create_report(&app, &app.admin_token(), "Admin export", "CSV").await;
    let mine = create_report(&app, &app.reader_token(), "Reader export", "CSV").await;

    let response = get(app.router(), "/api/v1/reports", &app.reader_token()).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let rows = json["data"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["id"], mine);
}

#[tokio::test]
async fn blank_name_is_rejected() {
    let app = common::build_test_app();
    let response = post_json(
        app.router(),
        "/api/v1/reports",
        &app.reader_token(),
        json!({ "name": "  ", "type": "USER_ACTIVITY", "format": "CSV" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn other_users_report_is_404() {
    let app = common::build_test_app();
    let id = create_report(&app, &app.admin_token(), "Admin export", "CSV").await;

    let response = get(
        app.router(),
        &format!("/api/v1/reports/{id}"),
        &app.reader_token(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = delete(
        app.router(),
        &format!("/api/v1/reports/{id}"),
        &app.reader_token(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = get(
        app.router(),
        &format!("/api/v1/reports/{id}"),
        &app.admin_token(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn download_waits_for_completion() {
    let app = common::build_test_app();
    let id = create_report(&app, &app.reader_token(), "Q1 submissions", "CSV").await;
    let uri = format!("/api/v1/reports/{id}/download");

    let response = get(app.router(), &uri, &app.reader_token()).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let worker = app.state.report_worker(ReportWorkerConfig::default());
    assert!(worker.run_once().await.unwrap());

    let response = get(
        app.router(),
        &format!("/api/v1/reports/{id}"),
        &app.reader_token(),
    )
    .await;
    let json = body_json(response).await;
    assert_eq!(json["data"]["status"], "COMPLETED");
    assert_eq!(json["data"]["fileUrl"], uri);

    let response = get(app.router(), &uri, &app.reader_token()).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(CONTENT_TYPE).unwrap(),
        "text/csv; charset=utf-8"
    );
    let csv = String::from_utf8(body_bytes(response).await).unwrap();
    assert!(csv.starts_with("field,value\n"));
    assert!(csv.contains("name,Q1 submissions\n"));
    assert!(csv.contains("parameters.from,2026-01-01\n"));
}

#[tokio::test]
async fn pdf_request_ends_failed() {
    let app = common::build_test_app();
    let id = create_report(&app, &app.reader_token(), "Board pack", "PDF").await;

    let worker = app.state.report_worker(ReportWorkerConfig::default());
    assert!(worker.run_once().await.unwrap());

    let response = get(
        app.router(),
        &format!("/api/v1/reports/{id}"),
        &app.reader_token(),
    )
    .await;
    let json = body_json(response).await;
    assert_eq!(json["data"]["status"], "FAILED");
    assert!(json["data"]["fileUrl"].is_null());
}

#[tokio::test]
async fn delete_own_report() {
    let app = common::build_test_app();
    let id = create_report(&app, &app.reader_token(), "Scratch", "CSV").await;

    let response = delete(
        app.router(),
        &format!("/api/v1/reports/{id}"),
        &app.reader_token(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = get(app.router(), "/api/v1/reports", &app.reader_token()).await;
    assert!(body_json(response).await["data"].as_array().unwrap().is_empty());
}
