//! Request handlers, one submodule per resource.
//!
//! Note mutations go through [`crate::services::notes`]; reads call the
//! repositories in `naoty_db` directly. Errors map via [`crate::error::AppError`].

pub mod admin;
pub mod auth;
pub mod dashboard;
pub mod notes;
pub mod notifications;
pub mod received;
pub mod templates;
pub mod validation;

use serde::Deserialize;

/// Maximum page size for list endpoints.
pub const MAX_LIMIT: i64 = 100;

/// Default page size for list endpoints.
pub const DEFAULT_LIMIT: i64 = 50;

/// Generic pagination parameters (`?limit=&offset=`).
#[derive(Debug, Default, Deserialize)]
pub struct PaginationParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl PaginationParams {
    /// `(limit, offset)` clamped to `1..=MAX_LIMIT` and `>= 0`.
    pub fn resolve(&self) -> (i64, i64) {
        let limit = self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
        let offset = self.offset.unwrap_or(0).max(0);
        (limit, offset)
    }
}
