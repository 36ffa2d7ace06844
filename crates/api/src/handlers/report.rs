//! Handlers for the `/reports` resource.
//!
//! Reports are owned by their creator; other callers see 404.
//! Creation only queues the row; the report worker does the generation.

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use ebic_core::error::CoreError;
use ebic_core::report::{validate_report_name, ReportFormat, ReportStatus};
use ebic_core::types::DbId;
use ebic_db::models::report::{CreateReport, Report};
use serde_json::Value;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::DashboardReader;
use crate::response::DataResponse;
use crate::state::AppState;

fn not_found(id: DbId) -> AppError {
    CoreError::NotFound {
        entity: "Report",
        id,
    }
    .into()
}

async fn find_owned(state: &AppState, auth: AuthUser, id: DbId) -> AppResult<Report> {
    state
        .reports
        .find(id)
        .await?
        .filter(|r| r.created_by_id == auth.user_id)
        .ok_or_else(|| not_found(id))
}

/// GET /api/v1/reports
pub async fn list_reports(
    DashboardReader(auth): DashboardReader,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Vec<Report>>>> {
    let reports = state.reports.list_for_user(auth.user_id).await?;
    Ok(Json(DataResponse { data: reports }))
}

/// POST /api/v1/reports
///
/// Returns 201 with the `PENDING` row.
pub async fn create_report(
    DashboardReader(auth): DashboardReader,
    State(state): State<AppState>,
    Json(input): Json<CreateReport>,
) -> AppResult<(StatusCode, Json<DataResponse<Report>>)> {
    validate_report_name(&input.name)?;
    let report = state.reports.create(auth.user_id, &input).await?;
    state.report_wakeup.notify_one();
    tracing::info!(
        report_id = report.id,
        user_id = auth.user_id,
        report_type = %report.report_type,
        format = %report.format,
        "Report queued"
    );
    Ok((StatusCode::CREATED, Json(DataResponse { data: report })))
}

/// GET /api/v1/reports/{id}
pub async fn get_report(
    DashboardReader(auth): DashboardReader,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Report>>> {
    let report = find_owned(&state, auth, id).await?;
    Ok(Json(DataResponse { data: report }))
}

/// DELETE /api/v1/reports/{id}
pub async fn delete_report(
    DashboardReader(auth): DashboardReader,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Value>>> {
    if !state.reports.delete(id, auth.user_id).await? {
        return Err(not_found(id));
    }
    let path = state.report_files.path_for(id, ReportFormat::Csv);
    if let Err(e) = tokio::fs::remove_file(&path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(report_id = id, error = %e, "Failed to remove report file");
        }
    }
    Ok(Json(DataResponse {
        data: serde_json::json!({ "success": true }),
    }))
}

/// GET /api/v1/reports/{id}/download
///
/// Streams the generated file; 409 while the report is not `COMPLETED`.
pub async fn download_report(
    DashboardReader(auth): DashboardReader,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let report = find_owned(&state, auth, id).await?;
    if report.status != ReportStatus::Completed.as_str() {
        return Err(CoreError::Conflict(format!(
            "Report {id} is {}, not COMPLETED",
            report.status
        ))
        .into());
    }
    let format: ReportFormat = report.format.parse()?;
    let path = state.report_files.path_for(id, format);
    let bytes = tokio::fs::read(&path).await.map_err(|e| {
        AppError::InternalError(format!("read {}: {e}", path.display()))
    })?;

    let content_type = match format {
        ReportFormat::Csv => "text/csv; charset=utf-8",
        ReportFormat::Pdf => "application/pdf",
    };
    let disposition = format!(
        "attachment; filename=\"report-{id}.{}\"",
        format.extension()
    );
    Ok((
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    ))
}
