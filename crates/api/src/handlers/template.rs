//! Handlers for the `/templates` resource.
//!
//! Reads need `templates:read`, writes `templates:manage`. System templates
//! can be edited but never deleted.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use ebic_core::error::CoreError;
use ebic_core::permissions::{actions, resources};
use ebic_core::types::DbId;
use ebic_db::models::template::{CreateTemplate, MessageTemplate, UpdateTemplate};
use serde_json::Value;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::require_permission;
use crate::response::DataResponse;
use crate::state::AppState;

fn not_found(id: DbId) -> AppError {
    CoreError::NotFound {
        entity: "MessageTemplate",
        id,
    }
    .into()
}

async fn find(state: &AppState, id: DbId) -> AppResult<MessageTemplate> {
    state
        .templates
        .find_by_id(id)
        .await?
        .ok_or_else(|| not_found(id))
}

/// GET /api/v1/templates
pub async fn list_templates(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Vec<MessageTemplate>>>> {
    require_permission(&state, auth, resources::TEMPLATES, actions::READ).await?;
    let templates = state.templates.list().await?;
    Ok(Json(DataResponse { data: templates }))
}

/// GET /api/v1/templates/{id}
pub async fn get_template(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<MessageTemplate>>> {
    require_permission(&state, auth, resources::TEMPLATES, actions::READ).await?;
    let template = find(&state, id).await?;
    Ok(Json(DataResponse { data: template }))
}

/// POST /api/v1/templates
///
/// Returns 201; a taken slug is 409.
pub async fn create_template(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreateTemplate>,
) -> AppResult<(StatusCode, Json<DataResponse<MessageTemplate>>)> {
    require_permission(&state, auth, resources::TEMPLATES, actions::MANAGE).await?;
    let draft = input.to_draft();
    draft.ensure_valid()?;
    let template = state
        .templates
        .create(&draft, input.is_active.unwrap_or(true))
        .await?;
    tracing::info!(
        template_id = template.id,
        slug = %template.slug,
        user_id = auth.user_id,
        "Template created"
    );
    Ok((StatusCode::CREATED, Json(DataResponse { data: template })))
}

/// PUT /api/v1/templates/{id}
///
/// Re-validates the merged template; the slug is immutable.
pub async fn update_template(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateTemplate>,
) -> AppResult<Json<DataResponse<MessageTemplate>>> {
    require_permission(&state, auth, resources::TEMPLATES, actions::MANAGE).await?;
    let existing = find(&state, id).await?;
    let draft = input.apply(existing.to_draft()?)?;
    draft.ensure_valid()?;
    let is_active = input.is_active.unwrap_or(existing.is_active);
    let template = state
        .templates
        .update(id, &draft, is_active)
        .await?
        .ok_or_else(|| not_found(id))?;
    tracing::info!(template_id = id, user_id = auth.user_id, "Template updated");
    Ok(Json(DataResponse { data: template }))
}

/// DELETE /api/v1/templates/{id}
pub async fn delete_template(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Value>>> {
    require_permission(&state, auth, resources::TEMPLATES, actions::MANAGE).await?;
    let existing = find(&state, id).await?;
    if existing.is_system {
        return Err(CoreError::Forbidden(format!(
            "System template '{}' cannot be deleted",
            existing.slug
        ))
        .into());
    }
    if !state.templates.delete(id).await? {
        return Err(not_found(id));
    }
    tracing::info!(template_id = id, user_id = auth.user_id, "Template deleted");
    Ok(Json(DataResponse {
        data: serde_json::json!({ "success": true }),
    }))
}
