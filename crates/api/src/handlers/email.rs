//! Handlers for the `/email` resource: diagnostics, the queue monitor and
//! submission status updates.

use axum::extract::{Query, State};
use axum::Json;
use ebic_core::channels::Locale;
use ebic_core::monitor::{ActionResult, MonitorAction};
use ebic_core::review::{ReviewDecision, SubmissionKind};
use ebic_core::types::DbId;
use ebic_messaging::monitor::{MonitorOverview, TestEmailResult};
use ebic_messaging::ReviewOutcome;
use serde::Deserialize;
use validator::Validate;

use crate::error::AppResult;
use crate::middleware::rbac::{DashboardManager, DashboardReader};
use crate::query::WindowParams;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TestEmailRequest {
    #[validate(email, length(max = 255))]
    pub test_email: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorActionRequest {
    pub action: String,
    pub email_id: Option<DbId>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct StatusUpdateRequest {
    pub id: DbId,
    #[serde(rename = "type")]
    pub kind: SubmissionKind,
    pub status: ReviewDecision,
    #[validate(length(max = 2000))]
    pub reason: Option<String>,
    /// Language of the message sent to the submitter; Arabic when omitted.
    #[serde(default)]
    pub locale: Locale,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/email/test
pub async fn send_test_email(
    DashboardManager(auth): DashboardManager,
    State(state): State<AppState>,
    Json(input): Json<TestEmailRequest>,
) -> AppResult<Json<DataResponse<TestEmailResult>>> {
    input.validate()?;
    let result = state.monitor.send_test_email(&input.test_email).await;
    tracing::info!(
        user_id = auth.user_id,
        success = result.success,
        provider = %result.provider,
        "Test email requested"
    );
    Ok(Json(DataResponse { data: result }))
}

/// GET /api/v1/email/monitor?days=
pub async fn monitor_stats(
    DashboardReader(_auth): DashboardReader,
    State(state): State<AppState>,
    Query(params): Query<WindowParams>,
) -> AppResult<Json<DataResponse<MonitorOverview>>> {
    let stats = state.monitor.get_stats(params.days).await?;
    Ok(Json(DataResponse { data: stats }))
}

/// POST /api/v1/email/monitor/action
pub async fn monitor_action(
    DashboardManager(auth): DashboardManager,
    State(state): State<AppState>,
    Json(input): Json<MonitorActionRequest>,
) -> AppResult<Json<DataResponse<ActionResult>>> {
    let action: MonitorAction = input.action.parse()?;
    tracing::info!(user_id = auth.user_id, action = %action, email_id = ?input.email_id, "Monitor action requested");
    let result = state.monitor.perform_action(action, input.email_id).await?;
    Ok(Json(DataResponse { data: result }))
}

/// PATCH /api/v1/email/status
///
/// Records the review decision, then messages the submitter and the admins.
pub async fn update_status(
    DashboardManager(auth): DashboardManager,
    State(state): State<AppState>,
    Json(input): Json<StatusUpdateRequest>,
) -> AppResult<Json<DataResponse<ReviewOutcome>>> {
    input.validate()?;
    let outcome = state
        .review
        .apply(
            input.kind,
            input.id,
            input.status,
            input.reason.as_deref(),
            input.locale,
            auth.user_id,
        )
        .await?;
    Ok(Json(DataResponse { data: outcome }))
}
