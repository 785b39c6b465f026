use chrono::Utc;
use naoty_core::access::Actor;
use naoty_core::notes::{Note, ReceptionStatus};
use naoty_core::types::{DbId, Timestamp};
use naoty_core::workflow::{self, ValidationAction, WorkflowConfig};
use naoty_db::models::comment::{Comment, CreateComment};
use naoty_db::models::note::{CreateNote, UpdateNote};
use naoty_db::retry::with_retry;
use naoty_db::transitions::{self, Applied};
use naoty_db::{DbPool, StoreError};
use naoty_events::{event_names, EventBus, PlatformEvent};
use serde_json::json;

use crate::state::AppState;

fn transition_event(event_type: &str, applied: &Applied, actor_id: Option<DbId>) -> PlatformEvent {
    let mut payload = json!({
        "previous_status": applied.transition.previous_status,
        "new_status": applied.transition.new_status,
        "version": applied.note.version,
        "notified_users": applied.notifications.len(),
    });
    if let Some(entry) = &applied.history {
        payload["action"] = json!(entry.action);
        payload["history_id"] = json!(entry.id);
    }
    if event_type == event_names::NOTE_SENT {
        payload["recipient_ids"] = json!(applied.note.recipient_ids);
        payload["sent_at"] = json!(applied.note.sent_at);
    }
    PlatformEvent::for_note(event_type, applied.note.id)
        .with_actor(actor_id)
        .with_payload(payload)
}

/// Create a DRAFT note.
pub async fn create(
    state: &AppState,
    actor: &Actor,
    input: &CreateNote,
) -> Result<Note, StoreError> {
    let note = with_retry("create_note", || {
        transitions::create_note(&state.pool, actor, input)
    })
    .await?;

    tracing::info!(
        note_id = note.id,
        user_id = actor.user_id,
        recipients = note.recipient_ids.len(),
        "Note created",
    );
    state.event_bus.publish(
        PlatformEvent::for_note(event_names::NOTE_CREATED, note.id)
            .with_actor(Some(actor.user_id))
            .with_payload(json!({ "type": note.note_type, "title": note.title })),
    );
    Ok(note)
}

/// Edit a DRAFT or RETURNED note.
pub async fn update(
    state: &AppState,
    actor: &Actor,
    note_id: DbId,
    input: &UpdateNote,
) -> Result<Note, StoreError> {
    let note = with_retry("update_note", || {
        transitions::update_draft(&state.pool, note_id, actor, input)
    })
    .await?;

    tracing::info!(note_id, user_id = actor.user_id, version = note.version, "Note updated");
    state.event_bus.publish(
        PlatformEvent::for_note(event_names::NOTE_UPDATED, note_id)
            .with_actor(Some(actor.user_id))
            .with_payload(json!({ "version": note.version })),
    );
    Ok(note)
}

/// DRAFT/RETURNED → PENDING_VALIDATION.
pub async fn submit(
    state: &AppState,
    actor: &Actor,
    note_id: DbId,
    version: Option<i32>,
) -> Result<Applied, StoreError> {
    let op = |note: &mut Note| workflow::submit_for_validation(note, actor, Utc::now());
    let applied = with_retry("submit_note", || {
        transitions::apply(&state.pool, note_id, version, Some(actor.user_id), &op)
    })
    .await?;

    tracing::info!(
        note_id,
        user_id = actor.user_id,
        from = %applied.transition.previous_status,
        "Note submitted for validation",
    );
    state.event_bus.publish(transition_event(
        event_names::NOTE_SUBMITTED,
        &applied,
        Some(actor.user_id),
    ));
    Ok(applied)
}

/// APPROVE, RETURN or ARCHIVE.
pub async fn validate(
    state: &AppState,
    actor: &Actor,
    note_id: DbId,
    action: ValidationAction,
    comment: Option<&str>,
    version: Option<i32>,
) -> Result<Applied, StoreError> {
    let config: WorkflowConfig = state.config.workflow;
    let op = |note: &mut Note| {
        workflow::apply_validation_action(note, action, actor, comment, config, Utc::now())
    };
    let applied = with_retry("validate_note", || {
        transitions::apply(&state.pool, note_id, version, Some(actor.user_id), &op)
    })
    .await?;

    tracing::info!(
        note_id,
        user_id = actor.user_id,
        action = ?action,
        from = %applied.transition.previous_status,
        to = %applied.transition.new_status,
        "Validation action applied",
    );
    state.event_bus.publish(transition_event(
        event_names::NOTE_VALIDATED,
        &applied,
        Some(actor.user_id),
    ));
    Ok(applied)
}

/// APPROVED → SCHEDULED.
pub async fn schedule(
    state: &AppState,
    actor: &Actor,
    note_id: DbId,
    at: Option<Timestamp>,
    version: Option<i32>,
) -> Result<Applied, StoreError> {
    let op = |note: &mut Note| workflow::schedule(note, actor, at, Utc::now());
    let applied = with_retry("schedule_note", || {
        transitions::apply(&state.pool, note_id, version, Some(actor.user_id), &op)
    })
    .await?;

    tracing::info!(
        note_id,
        user_id = actor.user_id,
        scheduled_at = ?applied.note.scheduled_at,
        "Note scheduled",
    );
    state.event_bus.publish(transition_event(
        event_names::NOTE_SCHEDULED,
        &applied,
        Some(actor.user_id),
    ));
    Ok(applied)
}

/// SCHEDULED → SENT on explicit request.
pub async fn dispatch(
    state: &AppState,
    actor: &Actor,
    note_id: DbId,
    version: Option<i32>,
) -> Result<Applied, StoreError> {
    let op = |note: &mut Note| workflow::dispatch(note, actor, Utc::now());
    let applied = with_retry("dispatch_note", || {
        transitions::apply(&state.pool, note_id, version, Some(actor.user_id), &op)
    })
    .await?;

    tracing::info!(
        note_id,
        user_id = actor.user_id,
        recipients = applied.note.recipient_ids.len(),
        "Note sent",
    );
    state.event_bus.publish(transition_event(
        event_names::NOTE_SENT,
        &applied,
        Some(actor.user_id),
    ));
    Ok(applied)
}

/// SCHEDULED → SENT once the send time has passed. No human actor.
pub async fn dispatch_due(
    pool: &DbPool,
    bus: &EventBus,
    note_id: DbId,
) -> Result<Applied, StoreError> {
    let op = |note: &mut Note| workflow::dispatch_due(note, Utc::now());
    let applied = with_retry("dispatch_due_note", || {
        transitions::apply(pool, note_id, None, None, &op)
    })
    .await?;

    tracing::info!(
        note_id,
        recipients = applied.note.recipient_ids.len(),
        "Scheduled note sent",
    );
    bus.publish(transition_event(event_names::NOTE_SENT, &applied, None));
    Ok(applied)
}

/// Post a comment and notify mentioned users.
pub async fn comment(
    state: &AppState,
    actor: &Actor,
    note_id: DbId,
    input: &CreateComment,
) -> Result<Comment, StoreError> {
    let (comment, notifications) = with_retry("comment_note", || {
        transitions::add_comment(&state.pool, note_id, actor, input)
    })
    .await?;

    tracing::info!(
        note_id,
        user_id = actor.user_id,
        comment_id = comment.id,
        is_internal = comment.is_internal,
        mentioned = notifications.len(),
        "Comment added",
    );
    state.event_bus.publish(
        PlatformEvent::for_note(event_names::NOTE_COMMENT_ADDED, note_id)
            .with_actor(Some(actor.user_id))
            .with_payload(json!({
                "comment_id": comment.id,
                "is_internal": comment.is_internal,
                "mentions": comment.mentions,
            })),
    );
    Ok(comment)
}

/// Move the caller's copy of a sent note to `target`.
pub async fn acknowledge(
    state: &AppState,
    actor: &Actor,
    note_id: DbId,
    target: ReceptionStatus,
) -> Result<ReceptionStatus, StoreError> {
    let status = with_retry("acknowledge_note", || {
        transitions::acknowledge(&state.pool, note_id, actor, target)
    })
    .await?;

    tracing::info!(note_id, user_id = actor.user_id, status = %status, "Reception updated");
    state.event_bus.publish(
        PlatformEvent::for_note(event_names::NOTE_RECEPTION_CHANGED, note_id)
            .with_actor(Some(actor.user_id))
            .with_payload(json!({ "reception_status": status })),
    );
    Ok(status)
}
