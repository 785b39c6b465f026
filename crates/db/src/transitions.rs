//! Transactional wrappers around the `naoty-core` workflow functions.
//!
//! Every function here is one PostgreSQL transaction: the note row is locked
//! with `SELECT ... FOR UPDATE`, the domain function decides, and the new
//! note state, history entry and notifications are written before commit.
//! Any error rolls the whole thing back.

use std::collections::HashMap;

use chrono::Utc;
use naoty_core::access::{require, Actor, NoteOperation};
use naoty_core::comments::prepare_comment;
use naoty_core::error::CoreError;
use naoty_core::notes::{
    normalize_recipients, validate_attachments, validate_content, validate_title, Note,
    ReceptionStatus,
};
use naoty_core::notifications::{required_lookups, resolve, NotificationDraft, ResolvedNotification};
use naoty_core::roles::roles_with_permission;
use naoty_core::types::DbId;
use naoty_core::workflow::state_machine::validate_transition;
use naoty_core::workflow::{advance_reception, Transition};
use sqlx::{PgConnection, PgPool};

use crate::error::StoreError;
use crate::models::comment::{Comment, CreateComment};
use crate::models::history::ValidationHistoryEntry;
use crate::models::note::{CreateNote, UpdateNote};
use crate::repositories::note_repo::NewNote;
use crate::repositories::{
    CommentRepo, HistoryRepo, NoteRepo, NotificationRepo, ReceptionRepo, TemplateRepo, UserRepo,
};

/// Outcome of a committed note transition.
#[derive(Debug, Clone)]
pub struct Applied {
    /// The note as stored after commit.
    pub note: Note,
    pub transition: Transition,
    pub history: Option<ValidationHistoryEntry>,
    pub notifications: Vec<ResolvedNotification>,
}

async fn load_locked(conn: &mut PgConnection, note_id: DbId) -> Result<Note, StoreError> {
    let row = NoteRepo::lock_for_update(&mut *conn, note_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "note",
            id: note_id,
        })?;
    let recipients = NoteRepo::recipient_ids(&mut *conn, note_id).await?;
    Ok(row.into_domain(recipients)?)
}

/// Fail with `NotFound` on the first id in `ids` with no user row.
async fn require_users(conn: &mut PgConnection, ids: &[DbId]) -> Result<(), StoreError> {
    if ids.is_empty() {
        return Ok(());
    }
    let found = UserRepo::existing_ids(&mut *conn, ids).await?;
    match ids.iter().find(|id| !found.contains(id)) {
        Some(&id) => Err(CoreError::NotFound { entity: "user", id }.into()),
        None => Ok(()),
    }
}

/// Load a note with its recipients, without locking.
pub async fn load_note(pool: &PgPool, note_id: DbId) -> Result<Note, StoreError> {
    let row = NoteRepo::find_by_id(pool, note_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "note",
            id: note_id,
        })?;
    let recipients = NoteRepo::recipient_ids(pool, note_id).await?;
    Ok(row.into_domain(recipients)?)
}

fn check_version(note: &Note, expected: Option<i32>) -> Result<(), CoreError> {
    match expected {
        Some(v) if v != note.version => Err(CoreError::ConcurrentModification {
            note_id: note.id,
            status: note.status,
            version: note.version,
        }),
        _ => Ok(()),
    }
}

/// Resolve drafts to one row per user and insert them.
async fn fan_out(
    conn: &mut PgConnection,
    drafts: &[NotificationDraft],
    actor_id: Option<DbId>,
) -> Result<Vec<ResolvedNotification>, StoreError> {
    let mut holders: HashMap<&'static str, Vec<DbId>> = HashMap::new();
    for permission in required_lookups(drafts) {
        let role_names: Vec<String> = roles_with_permission(permission)
            .into_iter()
            .map(|r| r.as_str().to_string())
            .collect();
        let ids = UserRepo::active_ids_with_roles(&mut *conn, &role_names).await?;
        holders.insert(permission, ids);
    }

    let resolved = resolve(drafts, actor_id, &holders);
    NotificationRepo::insert_many(conn, &resolved).await?;
    Ok(resolved)
}

/// Run a workflow operation against a locked note and persist its effects.
///
/// `expected_version` is the version the caller last saw; a mismatch fails
/// with `ConcurrentModification` before `op` runs. `actor_id` is excluded
/// from notification fan-out and is `None` for system-initiated work.
pub async fn apply<F>(
    pool: &PgPool,
    note_id: DbId,
    expected_version: Option<i32>,
    actor_id: Option<DbId>,
    op: &F,
) -> Result<Applied, StoreError>
where
    F: Fn(&mut Note) -> Result<Transition, CoreError> + Sync,
{
    let mut tx = pool.begin().await?;

    let mut note = load_locked(&mut *tx, note_id).await?;
    check_version(&note, expected_version)?;
    let locked_version = note.version;

    let transition = op(&mut note)?;
    validate_transition(transition.previous_status, transition.new_status)
        .map_err(CoreError::Internal)?;

    if !NoteRepo::save(&mut *tx, &note, locked_version).await? {
        return Err(CoreError::ConcurrentModification {
            note_id,
            status: note.status,
            version: locked_version,
        }
        .into());
    }
    note.version = locked_version + 1;

    let history = match &transition.history {
        Some(record) => Some(HistoryRepo::insert(&mut *tx, note_id, record).await?),
        None => None,
    };
    let notifications = fan_out(&mut *tx, &transition.notifications, actor_id).await?;

    tx.commit().await?;

    tracing::debug!(
        note_id,
        from = %transition.previous_status,
        to = %transition.new_status,
        notified = notifications.len(),
        "Note transition committed",
    );

    Ok(Applied {
        note,
        transition,
        history,
        notifications,
    })
}

/// Create a DRAFT note with its recipients and attachments.
pub async fn create_note(
    pool: &PgPool,
    actor: &Actor,
    input: &CreateNote,
) -> Result<Note, StoreError> {
    require(actor, NoteOperation::Create, None)?;
    validate_title(&input.title)?;
    validate_content(&input.content)?;
    validate_attachments(&input.attachments)?;
    let recipients = normalize_recipients(&input.recipient_ids)?;

    if let Some(template_id) = input.template_id {
        if TemplateRepo::find_by_id(pool, template_id).await?.is_none() {
            return Err(CoreError::NotFound {
                entity: "template",
                id: template_id,
            }
            .into());
        }
    }

    let mut tx = pool.begin().await?;
    require_users(&mut *tx, &recipients).await?;
    let row = NoteRepo::insert(
        &mut *tx,
        &NewNote {
            title: &input.title,
            content: &input.content,
            note_type: input.note_type.as_str(),
            author_id: actor.user_id,
            template_id: input.template_id,
            requested_send_at: input.scheduled_at,
        },
    )
    .await?;
    NoteRepo::replace_recipients(&mut *tx, row.id, &recipients).await?;
    NoteRepo::replace_attachments(&mut *tx, row.id, &input.attachments).await?;
    tx.commit().await?;

    Ok(row.into_domain(recipients)?)
}

/// Edit a DRAFT or RETURNED note. Author (or ADMIN) only.
pub async fn update_draft(
    pool: &PgPool,
    note_id: DbId,
    actor: &Actor,
    input: &UpdateNote,
) -> Result<Note, StoreError> {
    let mut tx = pool.begin().await?;

    let mut note = load_locked(&mut *tx, note_id).await?;
    require(actor, NoteOperation::Update, Some(&note))?;
    if !note.status.is_editable() {
        return Err(CoreError::InvalidState {
            note_id,
            status: note.status,
            action: "edit",
        }
        .into());
    }
    check_version(&note, input.version)?;
    let locked_version = note.version;

    if let Some(title) = &input.title {
        validate_title(title)?;
        note.title = title.clone();
    }
    if let Some(content) = &input.content {
        validate_content(content)?;
        note.content = content.clone();
    }
    if let Some(note_type) = input.note_type {
        note.note_type = note_type;
    }
    if let Some(at) = input.scheduled_at {
        note.requested_send_at = Some(at);
    }
    if let Some(ids) = &input.recipient_ids {
        note.recipient_ids = normalize_recipients(ids)?;
        require_users(&mut *tx, &note.recipient_ids).await?;
        NoteRepo::replace_recipients(&mut *tx, note_id, &note.recipient_ids).await?;
    }
    if let Some(attachments) = &input.attachments {
        validate_attachments(attachments)?;
        NoteRepo::replace_attachments(&mut *tx, note_id, attachments).await?;
    }
    note.updated_at = Utc::now();

    if !NoteRepo::save(&mut *tx, &note, locked_version).await? {
        return Err(CoreError::ConcurrentModification {
            note_id,
            status: note.status,
            version: locked_version,
        }
        .into());
    }
    tx.commit().await?;

    note.version = locked_version + 1;
    Ok(note)
}

/// Add a comment and notify mentioned users.
pub async fn add_comment(
    pool: &PgPool,
    note_id: DbId,
    actor: &Actor,
    input: &CreateComment,
) -> Result<(Comment, Vec<ResolvedNotification>), StoreError> {
    let mut tx = pool.begin().await?;

    // Holds the note lock so a concurrent archive waits for this insert.
    let note = load_locked(&mut *tx, note_id).await?;
    let new_comment = prepare_comment(
        &note,
        actor,
        &input.content,
        &input.mentions,
        input.is_internal,
    )?;
    require_users(&mut *tx, &new_comment.mentions).await?;

    let comment = CommentRepo::insert(&mut *tx, &new_comment).await?;
    let notifications = fan_out(&mut *tx, &new_comment.notifications, Some(actor.user_id)).await?;
    tx.commit().await?;

    Ok((comment, notifications))
}

/// Move the actor's copy of a sent note to `target`.
///
/// Returns the stored status, which equals the current one when the call was
/// a no-op.
pub async fn acknowledge(
    pool: &PgPool,
    note_id: DbId,
    actor: &Actor,
    target: ReceptionStatus,
) -> Result<ReceptionStatus, StoreError> {
    let note = load_note(pool, note_id).await?;

    let mut tx = pool.begin().await?;
    let row = ReceptionRepo::lock(&mut *tx, note_id, actor.user_id)
        .await?
        .ok_or_else(|| {
            CoreError::denied(
                format!("User {} is not a recipient of this note", actor.user_id),
                Some(note_id),
            )
        })?;
    let current = row.status()?;
    let next = advance_reception(&note, actor, current, target)?;

    if next != current {
        ReceptionRepo::set_status(&mut *tx, note_id, actor.user_id, next, Utc::now()).await?;
    }
    tx.commit().await?;
    Ok(next)
}
