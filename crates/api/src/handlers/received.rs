//! Handlers for the recipient side: the received-notes inbox.

use axum::extract::{Path, Query, State};
use axum::Json;
use naoty_core::notes::ReceptionStatus;
use naoty_core::roles::permissions::NOTES_RECEIVE;
use naoty_core::types::DbId;
use naoty_db::models::note::ReceivedNote;
use naoty_db::repositories::ReceptionRepo;
use serde::{Deserialize, Serialize};

use crate::error::AppResult;
use crate::handlers::PaginationParams;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::services::notes as service;
use crate::state::AppState;

/// Query parameters for `GET /received`.
#[derive(Debug, Deserialize)]
pub struct ReceivedQuery {
    pub status: Option<ReceptionStatus>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ReceptionResponse {
    pub note_id: DbId,
    pub reception_status: ReceptionStatus,
}

/// GET /api/v1/received
///
/// Sent notes addressed to the caller, newest first.
pub async fn list_received(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<ReceivedQuery>,
) -> AppResult<Json<DataResponse<Vec<ReceivedNote>>>> {
    auth.require(NOTES_RECEIVE)?;
    let (limit, offset) = PaginationParams {
        limit: params.limit,
        offset: params.offset,
    }
    .resolve();

    let notes = ReceptionRepo::list_for_user(
        &state.pool,
        auth.user_id,
        params.status.map(ReceptionStatus::as_str),
        limit,
        offset,
    )
    .await?;
    Ok(Json(DataResponse { data: notes }))
}

async fn acknowledge(
    auth: AuthUser,
    state: AppState,
    note_id: DbId,
    target: ReceptionStatus,
) -> AppResult<Json<DataResponse<ReceptionResponse>>> {
    let status = service::acknowledge(&state, &auth.actor(), note_id, target).await?;
    Ok(Json(DataResponse {
        data: ReceptionResponse {
            note_id,
            reception_status: status,
        },
    }))
}

/// POST /api/v1/received/{note_id}/read
///
/// Idempotent; a no-op when already READ, rejected once ARCHIVED.
pub async fn mark_read(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(note_id): Path<DbId>,
) -> AppResult<Json<DataResponse<ReceptionResponse>>> {
    acknowledge(auth, state, note_id, ReceptionStatus::Read).await
}

/// POST /api/v1/received/{note_id}/archive
pub async fn archive(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(note_id): Path<DbId>,
) -> AppResult<Json<DataResponse<ReceptionResponse>>> {
    acknowledge(auth, state, note_id, ReceptionStatus::Archived).await
}
