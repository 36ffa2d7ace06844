//! Authentication and authorization extractors.
//!
//! - [`auth::AuthUser`] -- the caller, from a JWT Bearer token.
//! - [`rbac::DashboardReader`] / [`rbac::DashboardManager`] -- callers
//!   holding `dashboard:read` / `dashboard:manage`.
//! - [`rbac::require_permission`] -- ad-hoc `resource:action` checks.

pub mod auth;
pub mod rbac;
