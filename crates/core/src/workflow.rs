//! Note lifecycle state machine and validation engine.
//!
//! Each operation takes the current [`Note`] by mutable reference, checks
//! authorization and status, mutates the note in place, and returns a
//! [`Transition`] describing what must be persisted alongside it. On error
//! the note is left untouched.
//!
//! ```text
//! DRAFT ─submit─▶ PENDING_VALIDATION ─approve(final)─▶ APPROVED ─schedule─▶ SCHEDULED
//!                  │   ▲   │ approve(first)              │                     │
//!                  │   │   ▼                             │ archive         dispatch
//!                  │   └─ (first_approved)               ▼                     ▼
//!                  └─return─▶ RETURNED ─resubmit─▶ …   ARCHIVED ◀─archive─── SENT
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::access::{require, Actor, NoteOperation};
use crate::error::CoreError;
use crate::notes::{validate_for_submission, Note, NoteStatus, ReceptionStatus};
use crate::notifications::{NotificationDraft, NotificationType};
use crate::roles::permissions::{
    NOTES_ARCHIVE, NOTES_VALIDATE_FINAL, NOTES_VALIDATE_FIRST,
};
use crate::roles::Role;
use crate::types::{DbId, Timestamp};

/// Maximum length of a validation comment.
pub const MAX_VALIDATION_COMMENT_LENGTH: usize = 5_000;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Organisation-level workflow settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkflowConfig {
    /// `true`: CHEF_DEPARTEMENT approves first, DIRECTEUR_EXECUTIF approves
    /// last. `false`: a single approval moves the note to APPROVED.
    pub two_level_validation: bool,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            two_level_validation: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Actions
// ---------------------------------------------------------------------------

/// Action a validator applies to a note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationAction {
    Approve,
    Return,
    Archive,
}

impl ValidationAction {
    fn verb(self) -> &'static str {
        match self {
            ValidationAction::Approve => "approve",
            ValidationAction::Return => "return",
            ValidationAction::Archive => "archive",
        }
    }
}

/// Action recorded in the validation history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HistoryAction {
    Approved,
    Returned,
    Archived,
}

impl HistoryAction {
    pub fn as_str(self) -> &'static str {
        match self {
            HistoryAction::Approved => "APPROVED",
            HistoryAction::Returned => "RETURNED",
            HistoryAction::Archived => "ARCHIVED",
        }
    }
}

impl From<ValidationAction> for HistoryAction {
    fn from(action: ValidationAction) -> Self {
        match action {
            ValidationAction::Approve => HistoryAction::Approved,
            ValidationAction::Return => HistoryAction::Returned,
            ValidationAction::Archive => HistoryAction::Archived,
        }
    }
}

impl fmt::Display for HistoryAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HistoryAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "APPROVED" => Ok(HistoryAction::Approved),
            "RETURNED" => Ok(HistoryAction::Returned),
            "ARCHIVED" => Ok(HistoryAction::Archived),
            other => Err(format!("Unknown history action '{other}'")),
        }
    }
}

// ---------------------------------------------------------------------------
// State machine
// ---------------------------------------------------------------------------

pub mod state_machine {
    use crate::notes::NoteStatus;

    /// Statuses reachable from `from` in one step.
    ///
    /// PENDING_VALIDATION → PENDING_VALIDATION is the first-level approval
    /// in a two-level organisation.
    pub fn valid_transitions(from: NoteStatus) -> &'static [NoteStatus] {
        use NoteStatus::*;
        match from {
            Draft => &[PendingValidation],
            PendingValidation => &[PendingValidation, Returned, Approved],
            Returned => &[PendingValidation],
            Approved => &[Scheduled, Archived],
            Scheduled => &[Sent],
            Sent => &[Archived],
            Archived => &[],
        }
    }

    pub fn can_transition(from: NoteStatus, to: NoteStatus) -> bool {
        valid_transitions(from).contains(&to)
    }

    pub fn validate_transition(from: NoteStatus, to: NoteStatus) -> Result<(), String> {
        if can_transition(from, to) {
            Ok(())
        } else {
            Err(format!("Invalid transition: {from} -> {to}"))
        }
    }
}

// ---------------------------------------------------------------------------
// Transition result
// ---------------------------------------------------------------------------

/// A validation history entry to append.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryRecord {
    pub action: HistoryAction,
    pub validator_id: DbId,
    pub validator_role: Role,
    pub comment: Option<String>,
    pub previous_status: NoteStatus,
    pub new_status: NoteStatus,
}

/// Everything a successful operation wants persisted next to the note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub note_id: DbId,
    pub previous_status: NoteStatus,
    pub new_status: NoteStatus,
    /// Present for validation actions only.
    pub history: Option<HistoryRecord>,
    pub notifications: Vec<NotificationDraft>,
}

fn invalid_state(note: &Note, action: &'static str) -> CoreError {
    CoreError::InvalidState {
        note_id: note.id,
        status: note.status,
        action,
    }
}

fn normalize_comment(comment: Option<&str>) -> Result<Option<String>, CoreError> {
    let Some(text) = comment.map(str::trim).filter(|c| !c.is_empty()) else {
        return Ok(None);
    };
    if text.chars().count() > MAX_VALIDATION_COMMENT_LENGTH {
        return Err(CoreError::InvalidAction(format!(
            "Comment exceeds maximum length of {MAX_VALIDATION_COMMENT_LENGTH} characters"
        )));
    }
    Ok(Some(text.to_string()))
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// DRAFT/RETURNED → PENDING_VALIDATION. Author (or ADMIN) only.
pub fn submit_for_validation(
    note: &mut Note,
    actor: &Actor,
    now: Timestamp,
) -> Result<Transition, CoreError> {
    require(actor, NoteOperation::Submit, Some(note))?;
    if !note.status.is_editable() {
        return Err(invalid_state(note, "submit"));
    }
    validate_for_submission(note)?;

    let previous = note.status;
    note.status = NoteStatus::PendingValidation;
    note.first_approved = false;
    note.updated_at = now;

    let verb = if previous == NoteStatus::Returned {
        "resubmitted"
    } else {
        "submitted"
    };
    let notifications = vec![NotificationDraft::to_holders(
        NOTES_VALIDATE_FIRST,
        NotificationType::ValidationRequested,
        note.id,
        format!("Note \"{}\" was {verb} and awaits your validation", note.title),
    )];

    Ok(Transition {
        note_id: note.id,
        previous_status: previous,
        new_status: note.status,
        history: None,
        notifications,
    })
}

/// Apply APPROVE, RETURN or ARCHIVE on behalf of a validator.
///
/// Checks run in this order so each failure kind is reported consistently:
/// missing RETURN comment (`InvalidAction`), actor is not a validator at all
/// (`PermissionDenied`), action illegal from the current status
/// (`InvalidState`), actor lacks the stage-specific permission
/// (`PermissionDenied`).
pub fn apply_validation_action(
    note: &mut Note,
    action: ValidationAction,
    actor: &Actor,
    comment: Option<&str>,
    config: WorkflowConfig,
    now: Timestamp,
) -> Result<Transition, CoreError> {
    let comment = normalize_comment(comment)?;
    if action == ValidationAction::Return && comment.is_none() {
        return Err(CoreError::InvalidAction(
            "A comment is required when returning a note".to_string(),
        ));
    }

    require(actor, NoteOperation::Validate, Some(note))?;

    let previous = note.status;
    let stage_permissions: &[&'static str] = match (action, previous) {
        (ValidationAction::Approve | ValidationAction::Return, NoteStatus::PendingValidation) => {
            if !config.two_level_validation {
                &[NOTES_VALIDATE_FIRST, NOTES_VALIDATE_FINAL]
            } else if note.first_approved {
                &[NOTES_VALIDATE_FINAL]
            } else {
                &[NOTES_VALIDATE_FIRST]
            }
        }
        (ValidationAction::Archive, NoteStatus::Approved | NoteStatus::Sent) => &[NOTES_ARCHIVE],
        _ => return Err(invalid_state(note, action.verb())),
    };

    let Some(permission) = stage_permissions
        .iter()
        .copied()
        .find(|p| actor.has_permission(p))
    else {
        return Err(CoreError::denied(
            format!(
                "Cannot {} this note at its current stage: requires {}",
                action.verb(),
                stage_permissions.join(" or ")
            ),
            Some(note.id),
        ));
    };
    let validator_role = actor
        .granting_role(permission)
        .ok_or_else(|| CoreError::Internal("granting role vanished".to_string()))?;

    let title = note.title.clone();
    let mut notifications = Vec::new();

    match action {
        ValidationAction::Approve => {
            let escalate = config.two_level_validation
                && !note.first_approved
                && permission == NOTES_VALIDATE_FIRST;
            if escalate {
                note.first_approved = true;
                notifications.push(NotificationDraft::to_user(
                    note.author_id,
                    NotificationType::NoteApproved,
                    note.id,
                    format!("Note \"{title}\" passed first-level validation"),
                ));
                notifications.push(NotificationDraft::to_holders(
                    NOTES_VALIDATE_FINAL,
                    NotificationType::ValidationRequested,
                    note.id,
                    format!("Note \"{title}\" awaits your final validation"),
                ));
            } else {
                note.status = NoteStatus::Approved;
                notifications.push(NotificationDraft::to_user(
                    note.author_id,
                    NotificationType::NoteApproved,
                    note.id,
                    format!("Note \"{title}\" was approved"),
                ));
            }
        }
        ValidationAction::Return => {
            note.status = NoteStatus::Returned;
            note.first_approved = false;
            notifications.push(NotificationDraft::to_user(
                note.author_id,
                NotificationType::NoteReturned,
                note.id,
                format!("Note \"{title}\" was returned for changes"),
            ));
        }
        ValidationAction::Archive => {
            note.status = NoteStatus::Archived;
            note.archived_at = Some(now);
            notifications.push(NotificationDraft::to_user(
                note.author_id,
                NotificationType::NoteArchived,
                note.id,
                format!("Note \"{title}\" was archived"),
            ));
        }
    }
    note.updated_at = now;

    Ok(Transition {
        note_id: note.id,
        previous_status: previous,
        new_status: note.status,
        history: Some(HistoryRecord {
            action: action.into(),
            validator_id: actor.user_id,
            validator_role,
            comment,
            previous_status: previous,
            new_status: note.status,
        }),
        notifications,
    })
}

/// APPROVED → SCHEDULED. Uses `at`, falling back to the send time requested
/// at creation.
pub fn schedule(
    note: &mut Note,
    actor: &Actor,
    at: Option<Timestamp>,
    now: Timestamp,
) -> Result<Transition, CoreError> {
    require(actor, NoteOperation::Schedule, Some(note))?;
    if note.status != NoteStatus::Approved {
        return Err(invalid_state(note, "schedule"));
    }
    let at = at.or(note.requested_send_at).ok_or_else(|| {
        CoreError::InvalidAction("A send time is required to schedule a note".to_string())
    })?;
    if at < now {
        return Err(CoreError::InvalidAction(
            "The send time must not be in the past".to_string(),
        ));
    }

    let previous = note.status;
    note.status = NoteStatus::Scheduled;
    note.scheduled_at = Some(at);
    note.updated_at = now;

    let notifications = vec![NotificationDraft::to_user(
        note.author_id,
        NotificationType::NoteScheduled,
        note.id,
        format!("Note \"{}\" is scheduled for {}", note.title, at.to_rfc3339()),
    )];

    Ok(Transition {
        note_id: note.id,
        previous_status: previous,
        new_status: note.status,
        history: None,
        notifications,
    })
}

/// SCHEDULED → SENT on explicit request by the author (or ADMIN).
pub fn dispatch(note: &mut Note, actor: &Actor, now: Timestamp) -> Result<Transition, CoreError> {
    require(actor, NoteOperation::Dispatch, Some(note))?;
    mark_sent(note, now)
}

/// SCHEDULED → SENT by the background dispatcher once the send time passed.
pub fn dispatch_due(note: &mut Note, now: Timestamp) -> Result<Transition, CoreError> {
    let due = note.scheduled_at.is_some_and(|at| at <= now);
    if note.status == NoteStatus::Scheduled && !due {
        return Err(CoreError::InvalidAction(format!(
            "Note {} is not due for dispatch yet",
            note.id
        )));
    }
    mark_sent(note, now)
}

fn mark_sent(note: &mut Note, now: Timestamp) -> Result<Transition, CoreError> {
    if note.status != NoteStatus::Scheduled {
        return Err(invalid_state(note, "dispatch"));
    }

    let previous = note.status;
    note.status = NoteStatus::Sent;
    note.sent_at = Some(now);
    note.updated_at = now;

    let title = note.title.clone();
    let mut notifications: Vec<NotificationDraft> = note
        .recipient_ids
        .iter()
        .map(|&user_id| {
            NotificationDraft::to_user(
                user_id,
                NotificationType::NoteReceived,
                note.id,
                format!("You received the note \"{title}\""),
            )
        })
        .collect();
    notifications.push(NotificationDraft::to_user(
        note.author_id,
        NotificationType::NoteSent,
        note.id,
        format!("Note \"{title}\" was sent to {} recipient(s)", note.recipient_ids.len()),
    ));

    Ok(Transition {
        note_id: note.id,
        previous_status: previous,
        new_status: note.status,
        history: None,
        notifications,
    })
}

/// Move a recipient's copy of a sent note forward.
///
/// UNREAD → READ → ARCHIVED, or UNREAD → ARCHIVED directly. Repeating the
/// current state is a no-op; going backwards is rejected.
pub fn advance_reception(
    note: &Note,
    actor: &Actor,
    current: ReceptionStatus,
    target: ReceptionStatus,
) -> Result<ReceptionStatus, CoreError> {
    require(actor, NoteOperation::Receive, Some(note))?;
    if target < current {
        return Err(CoreError::InvalidAction(format!(
            "Received note is already {current} and cannot go back to {target}"
        )));
    }
    Ok(target)
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::Duration;

    use super::state_machine::*;
    use super::*;
    use crate::notes::fixtures::{note, t0, AUTHOR};
    use crate::notifications::Audience;

    const CHEF: DbId = 5;
    const DIRECTEUR: DbId = 6;
    const RECIPIENT: DbId = 20;

    fn author() -> Actor {
        Actor::new(AUTHOR, vec![Role::Redacteur])
    }

    fn chef() -> Actor {
        Actor::new(CHEF, vec![Role::ChefDepartement])
    }

    fn directeur() -> Actor {
        Actor::new(DIRECTEUR, vec![Role::DirecteurExecutif])
    }

    fn destinataire() -> Actor {
        Actor::new(RECIPIENT, vec![Role::Destinataire])
    }

    fn admin() -> Actor {
        Actor::new(7, vec![Role::Admin])
    }

    fn two_level() -> WorkflowConfig {
        WorkflowConfig::default()
    }

    fn single_level() -> WorkflowConfig {
        WorkflowConfig {
            two_level_validation: false,
        }
    }

    fn later() -> Timestamp {
        t0() + Duration::minutes(5)
    }

    fn assert_edge(t: &Transition) {
        assert!(
            can_transition(t.previous_status, t.new_status),
            "{} -> {} is not an edge",
            t.previous_status,
            t.new_status
        );
    }

    // -----------------------------------------------------------------------
    // State machine table
    // -----------------------------------------------------------------------

    #[test]
    fn archived_has_no_outgoing_edges() {
        assert!(valid_transitions(NoteStatus::Archived).is_empty());
    }

    #[test]
    fn archive_only_from_approved_or_sent() {
        let sources: Vec<_> = NoteStatus::ALL
            .into_iter()
            .filter(|s| can_transition(*s, NoteStatus::Archived))
            .collect();
        assert_eq!(sources, vec![NoteStatus::Approved, NoteStatus::Sent]);
    }

    #[test]
    fn no_edge_goes_back_to_draft() {
        for s in NoteStatus::ALL {
            assert!(!can_transition(s, NoteStatus::Draft));
        }
    }

    #[test]
    fn validate_transition_message() {
        let err = validate_transition(NoteStatus::Sent, NoteStatus::Approved).unwrap_err();
        assert_eq!(err, "Invalid transition: SENT -> APPROVED");
    }

    // -----------------------------------------------------------------------
    // Submit
    // -----------------------------------------------------------------------

    #[test]
    fn author_submits_draft() {
        let mut n = note(NoteStatus::Draft);
        let t = submit_for_validation(&mut n, &author(), later()).unwrap();

        assert_eq!(n.status, NoteStatus::PendingValidation);
        assert_eq!(n.updated_at, later());
        assert!(t.history.is_none());
        assert_edge(&t);
        assert_eq!(
            t.notifications[0].audience,
            Audience::PermissionHolders(NOTES_VALIDATE_FIRST)
        );
    }

    #[test]
    fn non_author_cannot_submit() {
        let mut n = note(NoteStatus::Draft);
        let other = Actor::new(99, vec![Role::Redacteur]);
        assert_matches!(
            submit_for_validation(&mut n, &other, later()),
            Err(CoreError::PermissionDenied { .. })
        );
        assert_eq!(n.status, NoteStatus::Draft);
    }

    #[test]
    fn incomplete_draft_cannot_be_submitted() {
        let mut n = note(NoteStatus::Draft);
        n.content = "  ".to_string();
        assert_matches!(
            submit_for_validation(&mut n, &author(), later()),
            Err(CoreError::InvalidAction(_))
        );
        assert_eq!(n.status, NoteStatus::Draft);
    }

    #[test]
    fn submit_from_approved_is_invalid_state() {
        let mut n = note(NoteStatus::Approved);
        assert_matches!(
            submit_for_validation(&mut n, &author(), later()),
            Err(CoreError::InvalidState { status: NoteStatus::Approved, .. })
        );
    }

    #[test]
    fn resubmit_resets_first_approval() {
        let mut n = note(NoteStatus::Returned);
        n.first_approved = true;
        submit_for_validation(&mut n, &author(), later()).unwrap();
        assert_eq!(n.status, NoteStatus::PendingValidation);
        assert!(!n.first_approved);
    }

    // -----------------------------------------------------------------------
    // Validation: RETURN
    // -----------------------------------------------------------------------

    #[test]
    fn return_without_comment_is_invalid_action_for_everyone() {
        for actor in [author(), chef(), directeur(), destinataire(), admin()] {
            for comment in [None, Some(""), Some("   ")] {
                let mut n = note(NoteStatus::PendingValidation);
                let before = n.clone();
                let res = apply_validation_action(
                    &mut n,
                    ValidationAction::Return,
                    &actor,
                    comment,
                    two_level(),
                    later(),
                );
                assert_matches!(res, Err(CoreError::InvalidAction(_)));
                assert_eq!(n, before);
            }
        }
    }

    #[test]
    fn chef_returns_with_comment() {
        let mut n = note(NoteStatus::PendingValidation);
        let t = apply_validation_action(
            &mut n,
            ValidationAction::Return,
            &chef(),
            Some("Revoir section 2"),
            two_level(),
            later(),
        )
        .unwrap();

        assert_eq!(n.status, NoteStatus::Returned);
        let h = t.history.expect("history entry");
        assert_eq!(h.action, HistoryAction::Returned);
        assert_eq!(h.previous_status, NoteStatus::PendingValidation);
        assert_eq!(h.new_status, NoteStatus::Returned);
        assert_eq!(h.comment.as_deref(), Some("Revoir section 2"));
        assert_eq!(h.validator_id, CHEF);
        assert_eq!(h.validator_role, Role::ChefDepartement);
        assert_eq!(
            t.notifications,
            vec![NotificationDraft::to_user(
                AUTHOR,
                NotificationType::NoteReturned,
                n.id,
                "Note \"Réunion de service\" was returned for changes".to_string(),
            )]
        );
    }

    #[test]
    fn overlong_comment_is_rejected() {
        let mut n = note(NoteStatus::PendingValidation);
        let long = "x".repeat(MAX_VALIDATION_COMMENT_LENGTH + 1);
        assert_matches!(
            apply_validation_action(
                &mut n,
                ValidationAction::Return,
                &chef(),
                Some(&long),
                two_level(),
                later()
            ),
            Err(CoreError::InvalidAction(_))
        );
    }

    // -----------------------------------------------------------------------
    // Validation: permissions
    // -----------------------------------------------------------------------

    #[test]
    fn destinataire_is_denied_regardless_of_status() {
        for st in NoteStatus::ALL {
            for action in [ValidationAction::Approve, ValidationAction::Archive] {
                let mut n = note(st);
                let res = apply_validation_action(
                    &mut n,
                    action,
                    &destinataire(),
                    None,
                    two_level(),
                    later(),
                );
                assert_matches!(res, Err(CoreError::PermissionDenied { .. }));
                assert_eq!(n.status, st);
            }
        }
    }

    #[test]
    fn redacteur_cannot_validate_own_note() {
        let mut n = note(NoteStatus::PendingValidation);
        assert_matches!(
            apply_validation_action(
                &mut n,
                ValidationAction::Approve,
                &author(),
                None,
                two_level(),
                later()
            ),
            Err(CoreError::PermissionDenied { .. })
        );
    }

    #[test]
    fn directeur_cannot_do_first_level_approval() {
        let mut n = note(NoteStatus::PendingValidation);
        assert_matches!(
            apply_validation_action(
                &mut n,
                ValidationAction::Approve,
                &directeur(),
                None,
                two_level(),
                later()
            ),
            Err(CoreError::PermissionDenied { note_id: Some(100), .. })
        );
        assert!(!n.first_approved);
    }

    #[test]
    fn chef_cannot_give_final_approval() {
        let mut n = note(NoteStatus::PendingValidation);
        n.first_approved = true;
        assert_matches!(
            apply_validation_action(
                &mut n,
                ValidationAction::Approve,
                &chef(),
                None,
                two_level(),
                later()
            ),
            Err(CoreError::PermissionDenied { .. })
        );
        assert_eq!(n.status, NoteStatus::PendingValidation);
    }

    #[test]
    fn chef_cannot_archive() {
        let mut n = note(NoteStatus::Approved);
        assert_matches!(
            apply_validation_action(
                &mut n,
                ValidationAction::Archive,
                &chef(),
                None,
                two_level(),
                later()
            ),
            Err(CoreError::PermissionDenied { .. })
        );
    }

    // -----------------------------------------------------------------------
    // Validation: approval chain
    // -----------------------------------------------------------------------

    #[test]
    fn two_level_chain_reaches_approved() {
        let mut n = note(NoteStatus::PendingValidation);

        let first = apply_validation_action(
            &mut n,
            ValidationAction::Approve,
            &chef(),
            None,
            two_level(),
            later(),
        )
        .unwrap();
        assert_eq!(n.status, NoteStatus::PendingValidation);
        assert!(n.first_approved);
        assert_edge(&first);
        assert!(first
            .notifications
            .iter()
            .any(|d| d.audience == Audience::PermissionHolders(NOTES_VALIDATE_FINAL)));
        assert!(first
            .notifications
            .iter()
            .any(|d| d.audience == Audience::User(AUTHOR)));

        let last = apply_validation_action(
            &mut n,
            ValidationAction::Approve,
            &directeur(),
            Some("Bon pour envoi"),
            two_level(),
            later(),
        )
        .unwrap();
        assert_eq!(n.status, NoteStatus::Approved);
        let h = last.history.unwrap();
        assert_eq!(h.previous_status, NoteStatus::PendingValidation);
        assert_eq!(h.new_status, NoteStatus::Approved);
        assert_eq!(h.validator_role, Role::DirecteurExecutif);
        assert_eq!(last.notifications.len(), 1);
    }

    #[test]
    fn directeur_may_return_at_final_stage() {
        let mut n = note(NoteStatus::PendingValidation);
        n.first_approved = true;
        apply_validation_action(
            &mut n,
            ValidationAction::Return,
            &directeur(),
            Some("Chiffres à vérifier"),
            two_level(),
            later(),
        )
        .unwrap();
        assert_eq!(n.status, NoteStatus::Returned);
        assert!(!n.first_approved);
    }

    #[test]
    fn single_level_org_approves_in_one_step() {
        let mut n = note(NoteStatus::PendingValidation);
        apply_validation_action(
            &mut n,
            ValidationAction::Approve,
            &chef(),
            None,
            single_level(),
            later(),
        )
        .unwrap();
        assert_eq!(n.status, NoteStatus::Approved);
    }

    #[test]
    fn admin_walks_both_levels() {
        let mut n = note(NoteStatus::PendingValidation);
        for _ in 0..2 {
            apply_validation_action(
                &mut n,
                ValidationAction::Approve,
                &admin(),
                None,
                two_level(),
                later(),
            )
            .unwrap();
        }
        assert_eq!(n.status, NoteStatus::Approved);
    }

    #[test]
    fn approve_outside_pending_is_invalid_state() {
        for st in [
            NoteStatus::Draft,
            NoteStatus::Returned,
            NoteStatus::Approved,
            NoteStatus::Scheduled,
            NoteStatus::Sent,
            NoteStatus::Archived,
        ] {
            let mut n = note(st);
            assert_matches!(
                apply_validation_action(
                    &mut n,
                    ValidationAction::Approve,
                    &admin(),
                    None,
                    two_level(),
                    later()
                ),
                Err(CoreError::InvalidState { .. }),
                "approve from {st}"
            );
        }
    }

    // -----------------------------------------------------------------------
    // Validation: ARCHIVE
    // -----------------------------------------------------------------------

    #[test]
    fn archive_from_early_states_is_invalid_state() {
        for st in [
            NoteStatus::Draft,
            NoteStatus::PendingValidation,
            NoteStatus::Returned,
            NoteStatus::Scheduled,
        ] {
            let mut n = note(st);
            assert_matches!(
                apply_validation_action(
                    &mut n,
                    ValidationAction::Archive,
                    &directeur(),
                    None,
                    two_level(),
                    later()
                ),
                Err(CoreError::InvalidState { .. }),
                "archive from {st}"
            );
            assert_eq!(n.status, st);
            assert!(n.archived_at.is_none());
        }
    }

    #[test]
    fn directeur_archives_approved_note_and_it_stays_archived() {
        let mut n = note(NoteStatus::Approved);
        let t = apply_validation_action(
            &mut n,
            ValidationAction::Archive,
            &directeur(),
            None,
            two_level(),
            later(),
        )
        .unwrap();
        assert_eq!(n.status, NoteStatus::Archived);
        assert_eq!(n.archived_at, Some(later()));
        assert_edge(&t);

        for action in [
            ValidationAction::Approve,
            ValidationAction::Archive,
            ValidationAction::Return,
        ] {
            assert_matches!(
                apply_validation_action(
                    &mut n,
                    action,
                    &directeur(),
                    Some("encore"),
                    two_level(),
                    later()
                ),
                Err(CoreError::InvalidState { status: NoteStatus::Archived, .. })
            );
        }
    }

    #[test]
    fn archive_from_sent() {
        let mut n = note(NoteStatus::Sent);
        n.sent_at = Some(t0());
        apply_validation_action(
            &mut n,
            ValidationAction::Archive,
            &admin(),
            None,
            two_level(),
            later(),
        )
        .unwrap();
        assert_eq!(n.status, NoteStatus::Archived);
    }

    // -----------------------------------------------------------------------
    // Schedule / dispatch
    // -----------------------------------------------------------------------

    #[test]
    fn schedule_sets_scheduled_at() {
        let mut n = note(NoteStatus::Approved);
        let at = t0() + Duration::days(1);
        let t = schedule(&mut n, &author(), Some(at), later()).unwrap();
        assert_eq!(n.status, NoteStatus::Scheduled);
        assert_eq!(n.scheduled_at, Some(at));
        assert_edge(&t);
        // Author scheduled it themselves; resolution drops the self-notification.
        assert_eq!(t.notifications.len(), 1);
    }

    #[test]
    fn schedule_falls_back_to_requested_time() {
        let mut n = note(NoteStatus::Approved);
        let at = t0() + Duration::hours(3);
        n.requested_send_at = Some(at);
        schedule(&mut n, &author(), None, later()).unwrap();
        assert_eq!(n.scheduled_at, Some(at));
    }

    #[test]
    fn schedule_requires_a_future_time() {
        let mut n = note(NoteStatus::Approved);
        assert_matches!(
            schedule(&mut n, &author(), None, later()),
            Err(CoreError::InvalidAction(_))
        );
        assert_matches!(
            schedule(&mut n, &author(), Some(t0()), later()),
            Err(CoreError::InvalidAction(_))
        );
        assert!(n.scheduled_at.is_none());
    }

    #[test]
    fn schedule_before_approval_is_invalid_state() {
        let mut n = note(NoteStatus::PendingValidation);
        assert_matches!(
            schedule(&mut n, &author(), Some(later()), later()),
            Err(CoreError::InvalidState { .. })
        );
    }

    #[test]
    fn dispatch_notifies_every_recipient() {
        let mut n = note(NoteStatus::Scheduled);
        n.scheduled_at = Some(later());
        let t = dispatch(&mut n, &author(), later()).unwrap();
        assert_eq!(n.status, NoteStatus::Sent);
        assert_eq!(n.sent_at, Some(later()));
        let received: Vec<_> = t
            .notifications
            .iter()
            .filter(|d| d.kind == NotificationType::NoteReceived)
            .map(|d| d.audience.clone())
            .collect();
        assert_eq!(received, vec![Audience::User(20), Audience::User(21)]);
    }

    #[test]
    fn dispatch_requires_scheduled() {
        let mut n = note(NoteStatus::Approved);
        assert_matches!(
            dispatch(&mut n, &author(), later()),
            Err(CoreError::InvalidState { .. })
        );
    }

    #[test]
    fn dispatch_due_waits_for_send_time() {
        let mut n = note(NoteStatus::Scheduled);
        n.scheduled_at = Some(t0() + Duration::hours(1));
        assert_matches!(dispatch_due(&mut n, later()), Err(CoreError::InvalidAction(_)));
        assert_eq!(n.status, NoteStatus::Scheduled);

        dispatch_due(&mut n, t0() + Duration::hours(2)).unwrap();
        assert_eq!(n.status, NoteStatus::Sent);
    }

    // -----------------------------------------------------------------------
    // Reception
    // -----------------------------------------------------------------------

    #[test]
    fn reception_moves_forward_only() {
        let mut n = note(NoteStatus::Sent);
        n.sent_at = Some(t0());
        let c = destinataire();

        assert_eq!(
            advance_reception(&n, &c, ReceptionStatus::Unread, ReceptionStatus::Read).unwrap(),
            ReceptionStatus::Read
        );
        assert_eq!(
            advance_reception(&n, &c, ReceptionStatus::Read, ReceptionStatus::Read).unwrap(),
            ReceptionStatus::Read
        );
        assert_matches!(
            advance_reception(&n, &c, ReceptionStatus::Archived, ReceptionStatus::Read),
            Err(CoreError::InvalidAction(_))
        );
    }

    #[test]
    fn reception_is_independent_of_author_archival() {
        let mut n = note(NoteStatus::Archived);
        n.sent_at = Some(t0());
        assert!(advance_reception(
            &n,
            &destinataire(),
            ReceptionStatus::Unread,
            ReceptionStatus::Archived
        )
        .is_ok());
    }

    #[test]
    fn non_recipient_cannot_acknowledge() {
        let mut n = note(NoteStatus::Sent);
        n.sent_at = Some(t0());
        let stranger = Actor::new(77, vec![Role::Destinataire]);
        assert_matches!(
            advance_reception(&n, &stranger, ReceptionStatus::Unread, ReceptionStatus::Read),
            Err(CoreError::PermissionDenied { .. })
        );
    }

    // -----------------------------------------------------------------------
    // Full path
    // -----------------------------------------------------------------------

    #[test]
    fn every_step_of_the_happy_path_is_an_edge() {
        let mut n = note(NoteStatus::Draft);
        let send_at = later() + Duration::hours(1);
        let steps = vec![
            submit_for_validation(&mut n, &author(), later()).unwrap(),
            apply_validation_action(
                &mut n,
                ValidationAction::Approve,
                &chef(),
                None,
                two_level(),
                later(),
            )
            .unwrap(),
            apply_validation_action(
                &mut n,
                ValidationAction::Approve,
                &directeur(),
                None,
                two_level(),
                later(),
            )
            .unwrap(),
            schedule(&mut n, &author(), Some(send_at), later()).unwrap(),
            dispatch_due(&mut n, send_at).unwrap(),
            apply_validation_action(
                &mut n,
                ValidationAction::Archive,
                &directeur(),
                None,
                two_level(),
                send_at,
            )
            .unwrap(),
        ];
        for t in &steps {
            assert_edge(t);
        }
        assert_eq!(n.status, NoteStatus::Archived);
        assert!(n.scheduled_at.is_some());
        assert!(n.sent_at.is_some());
        assert!(n.archived_at.is_some());
    }
}
