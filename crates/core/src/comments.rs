//! Remarks attached to a note at any point of its life.

use serde::Serialize;

use crate::access::{authorize, require, Actor, NoteOperation};
use crate::error::CoreError;
use crate::notes::{Note, NoteStatus};
use crate::notifications::{NotificationDraft, NotificationType};
use crate::types::DbId;

/// Maximum length of a comment in characters.
pub const MAX_COMMENT_LENGTH: usize = 5_000;

/// Maximum number of users mentioned in one comment.
pub const MAX_MENTIONS: usize = 50;

/// A validated comment ready to be inserted, plus its mention notifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewComment {
    pub note_id: DbId,
    pub author_id: DbId,
    pub content: String,
    pub mentions: Vec<DbId>,
    pub is_internal: bool,
    #[serde(skip)]
    pub notifications: Vec<NotificationDraft>,
}

/// Check that `actor` may comment on `note` and build the insert payload.
///
/// Mentions are de-duplicated and never include the commenter.
pub fn prepare_comment(
    note: &Note,
    actor: &Actor,
    content: &str,
    mentions: &[DbId],
    is_internal: bool,
) -> Result<NewComment, CoreError> {
    require(actor, NoteOperation::Comment, Some(note))?;
    if note.status == NoteStatus::Archived {
        return Err(CoreError::InvalidState {
            note_id: note.id,
            status: note.status,
            action: "comment on",
        });
    }

    let content = content.trim();
    if content.is_empty() {
        return Err(CoreError::InvalidAction(
            "Comment content must not be empty".to_string(),
        ));
    }
    if content.chars().count() > MAX_COMMENT_LENGTH {
        return Err(CoreError::InvalidAction(format!(
            "Comment exceeds maximum length of {MAX_COMMENT_LENGTH} characters"
        )));
    }
    if is_internal && !authorize(actor, NoteOperation::ViewInternalComments, Some(note)) {
        return Err(CoreError::denied(
            "Only the author and validators may post internal comments",
            Some(note.id),
        ));
    }

    let mut unique: Vec<DbId> = Vec::with_capacity(mentions.len());
    for &id in mentions {
        if id != actor.user_id && !unique.contains(&id) {
            unique.push(id);
        }
    }
    if unique.len() > MAX_MENTIONS {
        return Err(CoreError::InvalidAction(format!(
            "A comment may mention at most {MAX_MENTIONS} users"
        )));
    }

    let notifications = unique
        .iter()
        .map(|&user_id| {
            NotificationDraft::to_user(
                user_id,
                NotificationType::Mention,
                note.id,
                format!("You were mentioned in a comment on \"{}\"", note.title),
            )
        })
        .collect();

    Ok(NewComment {
        note_id: note.id,
        author_id: actor.user_id,
        content: content.to_string(),
        mentions: unique,
        is_internal,
        notifications,
    })
}

/// Whether `actor` may see a comment with the given visibility.
pub fn can_view_comment(note: &Note, actor: &Actor, is_internal: bool) -> bool {
    if !authorize(actor, NoteOperation::Read, Some(note)) {
        return false;
    }
    !is_internal || authorize(actor, NoteOperation::ViewInternalComments, Some(note))
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::notes::fixtures::{note, t0, AUTHOR};
    use crate::notifications::Audience;
    use crate::roles::Role;

    fn chef() -> Actor {
        Actor::new(5, vec![Role::ChefDepartement])
    }

    fn recipient() -> Actor {
        Actor::new(20, vec![Role::Destinataire])
    }

    fn sent_note() -> Note {
        let mut n = note(NoteStatus::Sent);
        n.sent_at = Some(t0());
        n
    }

    #[test]
    fn mentions_are_deduplicated_and_exclude_author() {
        let n = note(NoteStatus::PendingValidation);
        let mentions = [AUTHOR, 5, AUTHOR, 9];
        let c = prepare_comment(&n, &chef(), "  Voir §2 ", &mentions, false).unwrap();
        assert_eq!(c.content, "Voir §2");
        assert_eq!(c.mentions, vec![AUTHOR, 9]);
        let audiences: Vec<_> = c.notifications.iter().map(|d| d.audience.clone()).collect();
        assert_eq!(audiences, vec![Audience::User(AUTHOR), Audience::User(9)]);
    }

    #[test]
    fn blank_comment_is_invalid_action() {
        let n = note(NoteStatus::PendingValidation);
        assert_matches!(
            prepare_comment(&n, &chef(), " \n", &[], false),
            Err(CoreError::InvalidAction(_))
        );
    }

    #[test]
    fn archived_note_takes_no_comments() {
        let n = note(NoteStatus::Archived);
        assert_matches!(
            prepare_comment(&n, &chef(), "trop tard", &[], false),
            Err(CoreError::InvalidState { status: NoteStatus::Archived, .. })
        );
    }

    #[test]
    fn recipient_comments_publicly_but_not_internally() {
        let n = sent_note();
        assert!(prepare_comment(&n, &recipient(), "Reçu", &[], false).is_ok());
        assert_matches!(
            prepare_comment(&n, &recipient(), "Reçu", &[], true),
            Err(CoreError::PermissionDenied { .. })
        );
    }

    #[test]
    fn outsider_cannot_comment_on_draft() {
        let n = note(NoteStatus::Draft);
        assert_matches!(
            prepare_comment(&n, &chef(), "hello", &[], false),
            Err(CoreError::PermissionDenied { .. })
        );
    }

    #[test]
    fn internal_comments_hidden_from_recipients() {
        let n = sent_note();
        assert!(can_view_comment(&n, &recipient(), false));
        assert!(!can_view_comment(&n, &recipient(), true));
        assert!(can_view_comment(&n, &chef(), true));
        assert!(can_view_comment(&n, &Actor::new(AUTHOR, vec![Role::Redacteur]), true));
    }
}
