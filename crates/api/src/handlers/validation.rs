//! Handler for the caller's validation queue.

use axum::extract::{Query, State};
use axum::Json;
use naoty_core::dashboard::pending_stages;
use naoty_db::models::note::NoteRow;
use naoty_db::repositories::NoteRepo;

use crate::error::AppResult;
use crate::handlers::PaginationParams;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/validation/pending
///
/// PENDING_VALIDATION notes at a stage the caller can act on, oldest first.
/// Empty for users who validate nothing.
pub async fn list_pending(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> AppResult<Json<DataResponse<Vec<NoteRow>>>> {
    let stages = pending_stages(&auth.actor(), state.config.workflow);
    if stages.is_empty() {
        return Ok(Json(DataResponse { data: Vec::new() }));
    }

    let (limit, offset) = params.resolve();
    let notes = NoteRepo::list_pending(&state.pool, &stages, limit, offset).await?;
    Ok(Json(DataResponse { data: notes }))
}
