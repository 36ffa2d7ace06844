//! Shared query parameter types for API handlers.

use serde::Deserialize;

/// `?page=&limit=` pagination, 1-based.
#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

pub const DEFAULT_PAGE_LIMIT: i64 = 20;
pub const MAX_PAGE_LIMIT: i64 = 100;

impl PageParams {
    /// `(page, limit, offset)` after clamping.
    ///
    /// The offset saturates, so a page far past the end yields an empty page.
    pub fn resolve(&self) -> (i64, i64, i64) {
        let page = self.page.unwrap_or(1).max(1);
        let limit = self.limit.unwrap_or(DEFAULT_PAGE_LIMIT).clamp(1, MAX_PAGE_LIMIT);
        (page, limit, (page - 1).saturating_mul(limit))
    }
}

/// Pagination block echoed in list responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
}

impl Pagination {
    pub fn new(page: i64, limit: i64, total: i64) -> Self {
        Self {
            page,
            limit,
            total,
            total_pages: (total + limit - 1) / limit,
        }
    }
}

/// `?days=` window for the monitor.
#[derive(Debug, Default, Deserialize)]
pub struct WindowParams {
    pub days: Option<i64>,
}
