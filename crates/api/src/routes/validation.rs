//! Route definitions for the `/validation` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::validation;
use crate::state::AppState;

/// Routes mounted at `/validation`.
///
/// ```text
/// GET /pending   -> list_pending
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/pending", get(validation::list_pending))
}
