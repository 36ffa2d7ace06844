//! Shared harness for the HTTP integration tests.
//!
//! The app runs over [`MemoryStore`] with recording channel senders, so no
//! database or SMTP server is needed.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{Method, Request, Response};
use axum::Router;
use ebic_api::auth::jwt::{generate_access_token, JwtConfig};
use ebic_api::config::{MessagingConfig, ServerConfig};
use ebic_api::router::build_app_router;
use ebic_api::state::{AppState, Channels};
use ebic_core::permissions::{actions, resources};
use ebic_core::types::DbId;
use ebic_messaging::delivery::testing::RecordingSender;
use ebic_messaging::{FileReportGenerator, MemoryStore};
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        jwt: JwtConfig {
            secret: "test-secret-for-integration-tests".to_string(),
            access_token_expiry_mins: 15,
        },
        embedded_report_worker: false,
    }
}

/// A running app plus handles on its in-memory backends.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub store: Arc<MemoryStore>,
    pub email: Arc<RecordingSender>,
    pub whatsapp: Arc<RecordingSender>,
    /// Holds `dashboard:manage` and `templates:manage`.
    pub admin_id: DbId,
    /// Holds `dashboard:read` only.
    pub reader_id: DbId,
    /// Holds no grants.
    pub outsider_id: DbId,
    _reports_dir: TempDir,
}

impl TestApp {
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn token(&self, user_id: DbId) -> String {
        generate_access_token(user_id, &self.state.config.jwt).expect("sign test token")
    }

    pub fn admin_token(&self) -> String {
        self.token(self.admin_id)
    }

    pub fn reader_token(&self) -> String {
        self.token(self.reader_id)
    }
}

/// Build the full router (same middleware stack as production) over a fresh
/// [`MemoryStore`].
pub fn build_test_app() -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let admin_id = store.add_user(
        "admin@ebic.test",
        "Admin",
        &[
            (resources::DASHBOARD, actions::MANAGE),
            (resources::TEMPLATES, actions::MANAGE),
        ],
    );
    let reader_id = store.add_user(
        "reader@ebic.test",
        "Reader",
        &[(resources::DASHBOARD, actions::READ)],
    );
    let outsider_id = store.add_user("outsider@ebic.test", "Outsider", &[]);
    store.seed_status_templates();

    let email = Arc::new(RecordingSender::email());
    let whatsapp = Arc::new(RecordingSender::whatsapp());
    let reports_dir = TempDir::new().expect("create reports dir");

    let config = test_config();
    let state = AppState::new(
        config.clone(),
        store.clone(),
        Channels {
            email: email.clone(),
            whatsapp: whatsapp.clone(),
        },
        MessagingConfig::default(),
        FileReportGenerator::new(reports_dir.path()),
    );
    let router = build_app_router(state.clone(), &config);

    TestApp {
        router,
        state,
        store,
        email,
        whatsapp,
        admin_id,
        reader_id,
        outsider_id,
        _reports_dir: reports_dir,
    }
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn send(
    app: Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
    }
    let body = match body {
        Some(json) => {
            builder = builder.header(CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    app.oneshot(builder.body(body).unwrap()).await.unwrap()
}

pub async fn get(app: Router, uri: &str, token: &str) -> Response<Body> {
    send(app, Method::GET, uri, Some(token), None).await
}

pub async fn post_json(app: Router, uri: &str, token: &str, body: Value) -> Response<Body> {
    send(app, Method::POST, uri, Some(token), Some(body)).await
}

pub async fn put_json(app: Router, uri: &str, token: &str, body: Value) -> Response<Body> {
    send(app, Method::PUT, uri, Some(token), Some(body)).await
}

pub async fn patch_json(app: Router, uri: &str, token: &str, body: Value) -> Response<Body> {
    send(app, Method::PATCH, uri, Some(token), Some(body)).await
}

pub async fn patch(app: Router, uri: &str, token: &str) -> Response<Body> {
    send(app, Method::PATCH, uri, Some(token), None).await
}

pub async fn delete(app: Router, uri: &str, token: &str) -> Response<Body> {
    send(app, Method::DELETE, uri, Some(token), None).await
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}
