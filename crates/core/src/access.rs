//! The single authorization gate.
//!
//! Every workflow operation calls [`authorize`] (usually through
//! [`require`]) before touching state. Handlers never re-implement these
//! checks.

use serde::Serialize;

use crate::error::CoreError;
use crate::notes::Note;
use crate::roles::{self, permissions, Role};
use crate::types::DbId;

/// The authenticated user performing an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Actor {
    pub user_id: DbId,
    pub roles: Vec<Role>,
}

impl Actor {
    pub fn new(user_id: DbId, roles: Vec<Role>) -> Self {
        Self { user_id, roles }
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        roles::has_permission(&self.roles, permission)
    }

    pub fn has_any_permission(&self, wanted: &[&str]) -> bool {
        roles::has_any_permission(&self.roles, wanted)
    }

    pub fn is_admin(&self) -> bool {
        self.roles.contains(&Role::Admin)
    }

    /// Any role that can take part in validation.
    pub fn is_validator(&self) -> bool {
        self.has_any_permission(permissions::VALIDATION)
    }

    /// The role recorded in history for an action gated by `permission`.
    ///
    /// Prefers a business role over `ADMIN` when both grant it.
    pub fn granting_role(&self, permission: &str) -> Option<Role> {
        self.roles
            .iter()
            .copied()
            .filter(|r| r.grants(permission))
            .min_by_key(|r| *r == Role::Admin)
    }
}

/// Operations subject to authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteOperation {
    Create,
    Read,
    Update,
    Submit,
    Validate,
    Schedule,
    Dispatch,
    Comment,
    ViewInternalComments,
    Receive,
}

impl NoteOperation {
    pub fn verb(self) -> &'static str {
        match self {
            NoteOperation::Create => "create",
            NoteOperation::Read => "read",
            NoteOperation::Update => "update",
            NoteOperation::Submit => "submit",
            NoteOperation::Validate => "validate",
            NoteOperation::Schedule => "schedule",
            NoteOperation::Dispatch => "dispatch",
            NoteOperation::Comment => "comment on",
            NoteOperation::ViewInternalComments => "view internal comments of",
            NoteOperation::Receive => "acknowledge",
        }
    }
}

/// Decide whether `actor` may perform `op`, optionally on a specific note.
///
/// Status legality is not checked here; that is the state machine's job and
/// produces `InvalidState` rather than `PermissionDenied`.
pub fn authorize(actor: &Actor, op: NoteOperation, note: Option<&Note>) -> bool {
    let owns = |n: &Note| actor.is_admin() || n.is_author(actor.user_id);

    match op {
        NoteOperation::Create => actor.has_permission(permissions::NOTES_CREATE),
        NoteOperation::Read => note.is_some_and(|n| can_read(actor, n)),
        NoteOperation::Update => {
            actor.has_permission(permissions::NOTES_UPDATE) && note.is_some_and(owns)
        }
        NoteOperation::Submit => {
            actor.has_permission(permissions::NOTES_SUBMIT) && note.is_some_and(owns)
        }
        NoteOperation::Validate => actor.is_validator(),
        NoteOperation::Schedule => {
            actor.has_permission(permissions::NOTES_SCHEDULE) && note.is_some_and(owns)
        }
        NoteOperation::Dispatch => {
            actor.has_permission(permissions::NOTES_SEND) && note.is_some_and(owns)
        }
        NoteOperation::Comment => {
            actor.has_permission(permissions::NOTES_COMMENT)
                && note.is_some_and(|n| can_read(actor, n))
        }
        NoteOperation::ViewInternalComments => {
            note.is_some_and(|n| owns(n) || actor.is_validator())
        }
        NoteOperation::Receive => {
            actor.has_permission(permissions::NOTES_RECEIVE)
                && note.is_some_and(|n| n.is_recipient(actor.user_id) && n.was_sent())
        }
    }
}

fn can_read(actor: &Actor, note: &Note) -> bool {
    if !actor.has_permission(permissions::NOTES_READ) {
        return false;
    }
    if actor.is_admin() || note.is_author(actor.user_id) {
        return true;
    }
    if note.is_recipient(actor.user_id) && note.was_sent() {
        return true;
    }
    // Validators see everything that has left the author's drafts.
    actor.is_validator() && note.status != crate::notes::NoteStatus::Draft
}

/// [`authorize`] as a `Result`, producing `PermissionDenied` on refusal.
pub fn require(actor: &Actor, op: NoteOperation, note: Option<&Note>) -> Result<(), CoreError> {
    if authorize(actor, op, note) {
        Ok(())
    } else {
        Err(CoreError::denied(
            format!(
                "User {} is not allowed to {} this note",
                actor.user_id,
                op.verb()
            ),
            note.map(|n| n.id),
        ))
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::notes::fixtures::{note, AUTHOR};
    use crate::notes::NoteStatus;

    fn redacteur() -> Actor {
        Actor::new(AUTHOR, vec![Role::Redacteur])
    }

    #[test]
    fn author_can_submit_own_note_only() {
        let n = note(NoteStatus::Draft);
        assert!(authorize(&redacteur(), NoteOperation::Submit, Some(&n)));

        let other = Actor::new(99, vec![Role::Redacteur]);
        assert!(!authorize(&other, NoteOperation::Submit, Some(&n)));
    }

    #[test]
    fn admin_can_submit_any_note() {
        let n = note(NoteStatus::Draft);
        let admin = Actor::new(7, vec![Role::Admin]);
        assert!(authorize(&admin, NoteOperation::Submit, Some(&n)));
    }

    #[test]
    fn destinataire_is_never_a_validator() {
        let c = Actor::new(20, vec![Role::Destinataire]);
        for st in NoteStatus::ALL {
            assert!(!authorize(&c, NoteOperation::Validate, Some(&note(st))));
        }
    }

    #[test]
    fn drafts_are_private_to_author() {
        let n = note(NoteStatus::Draft);
        let chef = Actor::new(5, vec![Role::ChefDepartement]);
        assert!(!authorize(&chef, NoteOperation::Read, Some(&n)));
        assert!(authorize(&redacteur(), NoteOperation::Read, Some(&n)));

        let pending = note(NoteStatus::PendingValidation);
        assert!(authorize(&chef, NoteOperation::Read, Some(&pending)));
    }

    #[test]
    fn recipients_read_only_after_sending() {
        let recipient = Actor::new(20, vec![Role::Destinataire]);
        let mut n = note(NoteStatus::Scheduled);
        assert!(!authorize(&recipient, NoteOperation::Read, Some(&n)));
        assert!(!authorize(&recipient, NoteOperation::Receive, Some(&n)));

        n.status = NoteStatus::Sent;
        n.sent_at = Some(n.updated_at);
        assert!(authorize(&recipient, NoteOperation::Read, Some(&n)));
        assert!(authorize(&recipient, NoteOperation::Receive, Some(&n)));
    }

    #[test]
    fn require_reports_note_id() {
        let n = note(NoteStatus::Draft);
        let stranger = Actor::new(42, vec![Role::Destinataire]);
        assert_matches!(
            require(&stranger, NoteOperation::Update, Some(&n)),
            Err(CoreError::PermissionDenied { note_id: Some(100), .. })
        );
    }

    #[test]
    fn granting_role_prefers_business_role() {
        let actor = Actor::new(3, vec![Role::DirecteurExecutif, Role::Admin]);
        assert_eq!(
            actor.granting_role(permissions::NOTES_ARCHIVE),
            Some(Role::DirecteurExecutif)
        );
        assert_eq!(
            actor.granting_role(permissions::NOTES_VALIDATE_FIRST),
            Some(Role::Admin)
        );
        assert_eq!(redacteur().granting_role(permissions::NOTES_ARCHIVE), None);
    }
}
