//! HTTP tests for `/api/v1/notifications`.

mod common;

use axum::http::{Method, StatusCode};
use common::{body_json, delete, get, patch, put_json, send, TestApp};
use ebic_core::types::DbId;
use ebic_db::models::notification::CreateNotification;
use ebic_messaging::store::NotificationStore;
use serde_json::json;

async fn notify(app: &TestApp, user_id: DbId, category: &str, priority: &str) -> DbId {
    NotificationStore::create(
        app.store.as_ref(),
        CreateNotification {
            user_id,
            category: category.to_string(),
            title: format!("{category} title"),
            message: "body".to_string(),
            data: None,
            action_url: None,
            priority: priority.to_string(),
        },
    )
    .await
    .unwrap()
    .id
}

// ---------------------------------------------------------------------------
// Access control
// ---------------------------------------------------------------------------

#[tokio::test]
async fn missing_token_is_401() {
    let app = common::build_test_app();
    let response = send(app.router(), Method::GET, "/api/v1/notifications", None, None).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn caller_without_dashboard_read_is_403() {
    let app = common::build_test_app();
    let token = app.token(app.outsider_id);
    let response = get(app.router(), "/api/v1/notifications", &token).await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(response).await["code"], "FORBIDDEN");
}

// ---------------------------------------------------------------------------
// Listing
// ---------------------------------------------------------------------------

#[tokio::test]
async fn list_paginates_newest_first_with_unread_count() {
    let app = common::build_test_app();
    let mut ids = Vec::new();
    for _ in 0..3 {
        ids.push(notify(&app, app.reader_id, "NEW_COLLABORATOR", "NORMAL").await);
    }
    notify(&app, app.admin_id, "NEW_COLLABORATOR", "NORMAL").await;

    let response = get(
        app.router(),
        "/api/v1/notifications?page=1&limit=2",
        &app.reader_token(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let data = &json["data"];
    let listed: Vec<i64> = data["notifications"]
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["id"].as_i64().unwrap())
        .collect();
    assert_eq!(listed, vec![ids[2], ids[1]]);
    assert_eq!(data["unreadCount"], 3);
    assert_eq!(
        data["pagination"],
        json!({ "page": 1, "limit": 2, "total": 3, "totalPages": 2 })
    );
}

#[tokio::test]
async fn page_far_past_the_end_is_empty() {
    let app = common::build_test_app();
    notify(&app, app.reader_id, "NEW_COLLABORATOR", "NORMAL").await;

    let response = get(
        app.router(),
        "/api/v1/notifications?page=9223372036854775807&limit=100",
        &app.reader_token(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["notifications"], json!([]));
    assert_eq!(json["data"]["pagination"]["total"], 1);
}

#[tokio::test]
async fn list_filters_by_type_and_priority() {
    let app = common::build_test_app();
    notify(&app, app.reader_id, "NEW_COLLABORATOR", "HIGH").await;
    notify(&app, app.reader_id, "NEW_INNOVATOR", "HIGH").await;
    notify(&app, app.reader_id, "NEW_COLLABORATOR", "LOW").await;

    let response = get(
        app.router(),
        "/api/v1/notifications?type=NEW_COLLABORATOR&priority=HIGH",
        &app.reader_token(),
    )
    .await;

    let json = body_json(response).await;
    let rows = json["data"]["notifications"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["type"], "NEW_COLLABORATOR");
    assert_eq!(rows[0]["priority"], "HIGH");
}

#[tokio::test]
async fn unknown_type_filter_is_400() {
    let app = common::build_test_app();
    let response = get(
        app.router(),
        "/api/v1/notifications?type=BIRTHDAY",
        &app.reader_token(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Read state and deletion
// ---------------------------------------------------------------------------

#[tokio::test]
async fn mark_read_updates_unread_count() {
    let app = common::build_test_app();
    let id = notify(&app, app.reader_id, "SYSTEM_ERROR", "URGENT").await;
    notify(&app, app.reader_id, "SYSTEM_ERROR", "URGENT").await;

    let response = patch(
        app.router(),
        &format!("/api/v1/notifications/{id}/read"),
        &app.reader_token(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["success"], true);

    let response = get(
        app.router(),
        "/api/v1/notifications/unread-count",
        &app.reader_token(),
    )
    .await;
    assert_eq!(body_json(response).await["data"]["count"], 1);
}

#[tokio::test]
async fn mark_all_read_reports_updated_rows() {
    let app = common::build_test_app();
    notify(&app, app.reader_id, "USER_ACCOUNT_CREATED", "LOW").await;
    notify(&app, app.reader_id, "USER_ACCOUNT_CREATED", "LOW").await;
    notify(&app, app.admin_id, "USER_ACCOUNT_CREATED", "LOW").await;

    let response = patch(
        app.router(),
        "/api/v1/notifications/mark-all-read",
        &app.reader_token(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["updated"], 2);
    assert!(!app.store.notifications_for(app.admin_id)[0].is_read);
}

#[tokio::test]
async fn other_users_notification_is_404() {
    let app = common::build_test_app();
    let id = notify(&app, app.admin_id, "USER_ACCOUNT_CREATED", "LOW").await;

    let read = patch(
        app.router(),
        &format!("/api/v1/notifications/{id}/read"),
        &app.reader_token(),
    )
    .await;
    assert_eq!(read.status(), StatusCode::NOT_FOUND);

    let removed = delete(
        app.router(),
        &format!("/api/v1/notifications/{id}"),
        &app.reader_token(),
    )
    .await;
    assert_eq!(removed.status(), StatusCode::NOT_FOUND);
    assert_eq!(app.store.notifications_for(app.admin_id).len(), 1);
}

#[tokio::test]
async fn delete_own_notification() {
    let app = common::build_test_app();
    let id = notify(&app, app.reader_id, "USER_ACCOUNT_CREATED", "LOW").await;

    let response = delete(
        app.router(),
        &format!("/api/v1/notifications/{id}"),
        &app.reader_token(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["success"], true);
    assert!(app.store.notifications_for(app.reader_id).is_empty());
}

// ---------------------------------------------------------------------------
// Preferences
// ---------------------------------------------------------------------------

#[tokio::test]
async fn preference_update_merges_keys() {
    let app = common::build_test_app();
    app.store.set_preferences(
        app.reader_id,
        json!({ "emailNewSubmissions": false, "emailBackups": true }),
    );

    let response = put_json(
        app.router(),
        "/api/v1/notifications/preferences",
        &app.reader_token(),
        json!({ "emailBackups": false, "digestMode": "daily" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = get(
        app.router(),
        "/api/v1/notifications/preferences",
        &app.reader_token(),
    )
    .await;
    let json = body_json(response).await;
    assert_eq!(
        json["data"],
        json!({
            "emailNewSubmissions": false,
            "emailBackups": false,
            "digestMode": "daily",
        })
    );
}

#[tokio::test]
async fn preference_update_rejects_non_boolean_switch() {
    let app = common::build_test_app();
    let response = put_json(
        app.router(),
        "/api/v1/notifications/preferences",
        &app.reader_token(),
        json!({ "emailBackups": "nope" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
}
