//! Route definitions for the `/email` resource.

use axum::routing::{get, patch, post};
use axum::Router;

use crate::handlers::email;
use crate::state::AppState;

/// Routes mounted at `/email`.
///
/// ```text
/// POST   /test              -> send_test_email   (dashboard:manage)
/// GET    /monitor           -> monitor_stats     (dashboard:read)
/// POST   /monitor/action    -> monitor_action    (dashboard:manage)
/// PATCH  /status            -> update_status     (dashboard:manage)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/test", post(email::send_test_email))
        .route("/monitor", get(email::monitor_stats))
        .route("/monitor/action", post(email::monitor_action))
        .route("/status", patch(email::update_status))
}
