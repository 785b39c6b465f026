//! Handler for the caller's dashboard.

use axum::extract::State;
use axum::Json;
use naoty_core::dashboard::{pending_stages, DashboardSummary};
use naoty_core::roles::permissions::DASHBOARD_READ;
use naoty_db::repositories::DashboardRepo;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/dashboard
///
/// Authored counts by status, validation queue size, reception counters and
/// unread notifications.
pub async fn get_dashboard(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<DashboardSummary>>> {
    auth.require(DASHBOARD_READ)?;
    let stages = pending_stages(&auth.actor(), state.config.workflow);
    let summary = DashboardRepo::summary(&state.pool, auth.user_id, &stages).await?;
    Ok(Json(DataResponse { data: summary }))
}
