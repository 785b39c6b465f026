//! Handlers for the `/notes` resource: authoring, workflow transitions,
//! validation history and comments.
//!
//! Every mutation delegates to [`crate::services::notes`]; authorization and
//! status checks happen there, inside the locked transaction.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use naoty_core::access::{authorize, require, NoteOperation};
use naoty_core::comments::can_view_comment;
use naoty_core::error::CoreError;
use naoty_core::notes::{Note, NoteStatus};
use naoty_core::types::{DbId, Timestamp};
use naoty_core::workflow::ValidationAction;
use naoty_db::models::comment::{Comment, CreateComment};
use naoty_db::models::history::ValidationHistoryEntry;
use naoty_db::models::note::{CreateNote, NoteDetail, NoteRow, UpdateNote};
use naoty_db::repositories::{CommentRepo, HistoryRepo, NoteRepo};
use naoty_db::transitions::load_note;
use serde::Deserialize;

use crate::error::AppResult;
use crate::handlers::PaginationParams;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::services::notes as service;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// Query parameters for `GET /notes`.
#[derive(Debug, Deserialize)]
pub struct ListNotesQuery {
    pub status: Option<NoteStatus>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Optional body for transitions that take nothing but the optimistic-lock
/// version. The request may carry no body at all.
#[derive(Debug, Default, Deserialize)]
pub struct VersionRequest {
    pub version: Option<i32>,
}

fn version_of(body: Option<Json<VersionRequest>>) -> Option<i32> {
    body.and_then(|Json(req)| req.version)
}

/// Body for `POST /notes/{id}/validate`.
#[derive(Debug, Deserialize)]
pub struct ValidateRequest {
    /// `APPROVE`, `RETURN` or `ARCHIVE`.
    pub action: String,
    pub comment: Option<String>,
    pub version: Option<i32>,
}

/// Body for `POST /notes/{id}/schedule`. Without `scheduled_at`, the send
/// time requested at creation is used.
#[derive(Debug, Deserialize)]
pub struct ScheduleRequest {
    pub scheduled_at: Option<Timestamp>,
    pub version: Option<i32>,
}

fn parse_action(raw: &str) -> Result<ValidationAction, CoreError> {
    serde_json::from_value(serde_json::Value::String(raw.to_string())).map_err(|_| {
        CoreError::InvalidAction(format!(
            "Unknown validation action '{raw}', expected APPROVE, RETURN or ARCHIVE"
        ))
    })
}

/// Load a note and check the caller may read it.
async fn readable_note(state: &AppState, auth: &AuthUser, note_id: DbId) -> AppResult<Note> {
    let note = load_note(&state.pool, note_id).await?;
    require(&auth.actor(), NoteOperation::Read, Some(&note))?;
    Ok(note)
}

// ---------------------------------------------------------------------------
// Authoring
// ---------------------------------------------------------------------------

/// POST /api/v1/notes
///
/// Create a note in DRAFT. Returns 201.
pub async fn create_note(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreateNote>,
) -> AppResult<impl IntoResponse> {
    let note = service::create(&state, &auth.actor(), &input).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: note })))
}

/// GET /api/v1/notes
///
/// Notes authored by the caller, most recently updated first.
pub async fn list_notes(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<ListNotesQuery>,
) -> AppResult<Json<DataResponse<Vec<NoteRow>>>> {
    let (limit, offset) = PaginationParams {
        limit: params.limit,
        offset: params.offset,
    }
    .resolve();

    let notes = NoteRepo::list_by_author(
        &state.pool,
        auth.user_id,
        params.status.map(NoteStatus::as_str),
        limit,
        offset,
    )
    .await?;
    Ok(Json(DataResponse { data: notes }))
}

/// GET /api/v1/notes/{id}
///
/// Note detail with recipients (and their reception state) and attachments.
pub async fn get_note(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(note_id): Path<DbId>,
) -> AppResult<Json<DataResponse<NoteDetail>>> {
    let row = NoteRepo::find_by_id(&state.pool, note_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "note",
            id: note_id,
        })?;
    let recipients = NoteRepo::recipients(&state.pool, note_id).await?;
    let recipient_ids = recipients.iter().map(|r| r.user_id).collect();

    let note = row.clone().into_domain(recipient_ids)?;
    require(&auth.actor(), NoteOperation::Read, Some(&note))?;

    let attachments = NoteRepo::attachments(&state.pool, note_id).await?;
    Ok(Json(DataResponse {
        data: NoteDetail {
            note: row,
            recipients,
            attachments,
        },
    }))
}

/// PUT /api/v1/notes/{id}
///
/// Edit a DRAFT or RETURNED note. Author only.
pub async fn update_note(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(note_id): Path<DbId>,
    Json(input): Json<UpdateNote>,
) -> AppResult<Json<DataResponse<Note>>> {
    let note = service::update(&state, &auth.actor(), note_id, &input).await?;
    Ok(Json(DataResponse { data: note }))
}

// ---------------------------------------------------------------------------
// Workflow transitions
// ---------------------------------------------------------------------------

/// POST /api/v1/notes/{id}/submit
pub async fn submit_note(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(note_id): Path<DbId>,
    body: Option<Json<VersionRequest>>,
) -> AppResult<Json<DataResponse<Note>>> {
    let applied = service::submit(&state, &auth.actor(), note_id, version_of(body)).await?;
    Ok(Json(DataResponse { data: applied.note }))
}

/// POST /api/v1/notes/{id}/validate
///
/// APPROVE, RETURN (comment required) or ARCHIVE.
pub async fn validate_note(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(note_id): Path<DbId>,
    Json(input): Json<ValidateRequest>,
) -> AppResult<Json<DataResponse<Note>>> {
    let action = parse_action(&input.action)?;
    let applied = service::validate(
        &state,
        &auth.actor(),
        note_id,
        action,
        input.comment.as_deref(),
        input.version,
    )
    .await?;
    Ok(Json(DataResponse { data: applied.note }))
}

/// POST /api/v1/notes/{id}/schedule
pub async fn schedule_note(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(note_id): Path<DbId>,
    Json(input): Json<ScheduleRequest>,
) -> AppResult<Json<DataResponse<Note>>> {
    let applied = service::schedule(
        &state,
        &auth.actor(),
        note_id,
        input.scheduled_at,
        input.version,
    )
    .await?;
    Ok(Json(DataResponse { data: applied.note }))
}

/// POST /api/v1/notes/{id}/dispatch
///
/// Send a SCHEDULED note now instead of waiting for its send time.
pub async fn dispatch_note(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(note_id): Path<DbId>,
    body: Option<Json<VersionRequest>>,
) -> AppResult<Json<DataResponse<Note>>> {
    let applied = service::dispatch(&state, &auth.actor(), note_id, version_of(body)).await?;
    Ok(Json(DataResponse { data: applied.note }))
}

/// GET /api/v1/notes/{id}/validation-history
///
/// Append-only validation log, oldest first.
pub async fn validation_history(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(note_id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<ValidationHistoryEntry>>>> {
    readable_note(&state, &auth, note_id).await?;
    let entries = HistoryRepo::list_for_note(&state.pool, note_id).await?;
    Ok(Json(DataResponse { data: entries }))
}

// ---------------------------------------------------------------------------
// Comments
// ---------------------------------------------------------------------------

/// GET /api/v1/notes/{id}/comments
///
/// Internal comments are only listed for the author and validators.
pub async fn list_comments(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(note_id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<Comment>>>> {
    let note = readable_note(&state, &auth, note_id).await?;
    let actor = auth.actor();
    let include_internal = authorize(&actor, NoteOperation::ViewInternalComments, Some(&note));

    let mut comments = CommentRepo::list_for_note(&state.pool, note_id, include_internal).await?;
    comments.retain(|c| can_view_comment(&note, &actor, c.is_internal));
    Ok(Json(DataResponse { data: comments }))
}

/// POST /api/v1/notes/{id}/comments
pub async fn add_comment(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(note_id): Path<DbId>,
    Json(input): Json<CreateComment>,
) -> AppResult<impl IntoResponse> {
    let comment = service::comment(&state, &auth.actor(), note_id, &input).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: comment })))
}
