//! Permission extractors backed by the permission engine.
//!
//! A `manage` grant satisfies every action on its resource.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use ebic_core::error::CoreError;
use ebic_core::permissions::{actions, resources};

use super::auth::AuthUser;
use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Reject with 403 unless `user` holds `resource:action`.
pub async fn require_permission(
    state: &AppState,
    user: AuthUser,
    resource: &str,
    action: &str,
) -> AppResult<()> {
    let allowed = state
        .permissions
        .has_permission(user.user_id, resource, action)
        .await?;
    if !allowed {
        tracing::debug!(user_id = user.user_id, resource, action, "Permission denied");
        return Err(AppError::Core(CoreError::Forbidden(format!(
            "Missing permission {resource}:{action}"
        ))));
    }
    Ok(())
}

/// Requires `dashboard:read`.
///
/// ```ignore
/// async fn list(DashboardReader(user): DashboardReader) -> AppResult<Json<()>> { .. }
/// ```
pub struct DashboardReader(pub AuthUser);

impl FromRequestParts<AppState> for DashboardReader {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        require_permission(state, user, resources::DASHBOARD, actions::READ).await?;
        Ok(DashboardReader(user))
    }
}

/// Requires `dashboard:manage`.
pub struct DashboardManager(pub AuthUser);

impl FromRequestParts<AppState> for DashboardManager {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        require_permission(state, user, resources::DASHBOARD, actions::MANAGE).await?;
        Ok(DashboardManager(user))
    }
}
