use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use ebic_core::error::CoreError;
use ebic_messaging::{MessagingError, StoreError};
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Implements [`IntoResponse`] producing `{"error": message, "code": CODE}`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Failures surfaced by the messaging services and persistence ports.
    #[error(transparent)]
    Messaging(#[from] MessagingError),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::Messaging(MessagingError::Persistence(err))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Core(CoreError::Validation(err.to_string()))
    }
}

type Classified = (StatusCode, &'static str, String);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Core(core) => classify_core_error(core),
            AppError::Database(err) => classify_sqlx_error(err),
            AppError::Messaging(err) => classify_messaging_error(err),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                internal()
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

fn internal() -> Classified {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
    )
}

fn classify_core_error(core: &CoreError) -> Classified {
    match core {
        CoreError::NotFound { entity, id } => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            format!("{entity} with id {id} not found"),
        ),
        CoreError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
        CoreError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
        CoreError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone()),
        CoreError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg.clone()),
        CoreError::TemplateNotFound(slug) => (
            StatusCode::NOT_FOUND,
            "TEMPLATE_NOT_FOUND",
            format!("Template '{slug}' not found"),
        ),
        CoreError::TemplateInactive(slug) => (
            StatusCode::CONFLICT,
            "TEMPLATE_INACTIVE",
            format!("Template '{slug}' is inactive"),
        ),
        CoreError::InvalidAction(action) => (
            StatusCode::BAD_REQUEST,
            "INVALID_ACTION",
            format!("Invalid action: {action}"),
        ),
        CoreError::Internal(msg) => {
            tracing::error!(error = %msg, "Internal core error");
            internal()
        }
    }
}

fn classify_messaging_error(err: &MessagingError) -> Classified {
    match err {
        MessagingError::Core(core) => classify_core_error(core),
        MessagingError::Persistence(StoreError::Database(db)) => classify_sqlx_error(db),
        MessagingError::Persistence(StoreError::Conflict(msg)) => {
            (StatusCode::CONFLICT, "CONFLICT", format!("Duplicate value: {msg}"))
        }
        MessagingError::Persistence(StoreError::Unavailable(msg)) => {
            tracing::error!(error = %msg, "Store unavailable");
            internal()
        }
        MessagingError::Channel(e) => {
            tracing::warn!(error = %e, "Channel error");
            (StatusCode::BAD_GATEWAY, "CHANNEL_ERROR", e.to_string())
        }
        MessagingError::Generation(msg) => {
            tracing::error!(error = %msg, "Report generation error");
            internal()
        }
    }
}

/// Classify a sqlx error into an HTTP status, error code, and message.
///
/// - `RowNotFound` maps to 404.
/// - Unique violations on `uq_` constraints map to 409.
/// - Everything else maps to 500 with a sanitized message.
fn classify_sqlx_error(err: &sqlx::Error) -> Classified {
    match err {
        sqlx::Error::RowNotFound => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            "Resource not found".to_string(),
        ),
        sqlx::Error::Database(db_err) => {
            if db_err.code().as_deref() == Some("23505") {
                let constraint = db_err.constraint().unwrap_or("unknown");
                if constraint.starts_with("uq_") {
                    return (
                        StatusCode::CONFLICT,
                        "CONFLICT",
                        format!("Duplicate value violates unique constraint: {constraint}"),
                    );
                }
            }
            tracing::error!(error = %db_err, "Database error");
            internal()
        }
        other => {
            tracing::error!(error = %other, "Database error");
            internal()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn status_and_code(err: AppError) -> (StatusCode, String) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        (status, json["code"].as_str().unwrap().to_string())
    }

    #[tokio::test]
    async fn template_errors_map_to_their_codes() {
        assert_eq!(
            status_and_code(CoreError::TemplateNotFound("x".into()).into()).await,
            (StatusCode::NOT_FOUND, "TEMPLATE_NOT_FOUND".into())
        );
        assert_eq!(
            status_and_code(MessagingError::from(CoreError::TemplateInactive("x".into())).into()).await,
            (StatusCode::CONFLICT, "TEMPLATE_INACTIVE".into())
        );
    }

    #[tokio::test]
    async fn invalid_action_is_a_bad_request() {
        assert_eq!(
            status_and_code(CoreError::InvalidAction("explode".into()).into()).await,
            (StatusCode::BAD_REQUEST, "INVALID_ACTION".into())
        );
    }

    #[tokio::test]
    async fn store_conflict_is_409_and_unavailable_is_sanitized() {
        assert_eq!(
            status_and_code(StoreError::Conflict("slug welcome".into()).into()).await,
            (StatusCode::CONFLICT, "CONFLICT".into())
        );
        assert_eq!(
            status_and_code(StoreError::Unavailable("db down".into()).into()).await,
            (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR".into())
        );
    }

    #[tokio::test]
    async fn row_not_found_is_404() {
        assert_eq!(
            status_and_code(sqlx::Error::RowNotFound.into()).await,
            (StatusCode::NOT_FOUND, "NOT_FOUND".into())
        );
    }
}
