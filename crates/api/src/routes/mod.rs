pub mod email;
pub mod health;
pub mod notification;
pub mod report;
pub mod template;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /notifications                          list (dashboard:read)
/// /notifications/unread-count             unread count
/// /notifications/mark-all-read            mark every notification read (PATCH)
/// /notifications/{id}/read                mark one read (PATCH)
/// /notifications/{id}                     delete
/// /notifications/preferences              get, merge (PUT)
///
/// /reports                                list, create (dashboard:read)
/// /reports/{id}                           get, delete (owner only)
/// /reports/{id}/download                  generated file
///
/// /email/test                             diagnostic send (dashboard:manage)
/// /email/monitor                          queue and delivery overview
/// /email/monitor/action                   retry | clear | pause | resume
/// /email/status                           submission review (PATCH)
///
/// /templates                              list, create (templates:read|manage)
/// /templates/{id}                         get, update, delete
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/notifications", notification::router())
        .nest("/reports", report::router())
        .nest("/email", email::router())
        .nest("/templates", template::router())
}
