//! Note entity, lifecycle status enum, and input validation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Limits
// ---------------------------------------------------------------------------

/// Maximum length of a note title in characters.
pub const MAX_TITLE_LENGTH: usize = 255;

/// Maximum length of a note body in characters.
pub const MAX_CONTENT_LENGTH: usize = 100_000;

/// Maximum number of recipients on a single note.
pub const MAX_RECIPIENTS: usize = 500;

/// Maximum number of attachments on a single note.
pub const MAX_ATTACHMENTS: usize = 20;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Lifecycle position of a note. Single source of truth for the workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NoteStatus {
    Draft,
    PendingValidation,
    Returned,
    Approved,
    Scheduled,
    Sent,
    Archived,
}

impl NoteStatus {
    pub const ALL: [NoteStatus; 7] = [
        NoteStatus::Draft,
        NoteStatus::PendingValidation,
        NoteStatus::Returned,
        NoteStatus::Approved,
        NoteStatus::Scheduled,
        NoteStatus::Sent,
        NoteStatus::Archived,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            NoteStatus::Draft => "DRAFT",
            NoteStatus::PendingValidation => "PENDING_VALIDATION",
            NoteStatus::Returned => "RETURNED",
            NoteStatus::Approved => "APPROVED",
            NoteStatus::Scheduled => "SCHEDULED",
            NoteStatus::Sent => "SENT",
            NoteStatus::Archived => "ARCHIVED",
        }
    }

    pub fn is_terminal(self) -> bool {
        self == NoteStatus::Archived
    }

    /// Statuses in which the author may still edit the note.
    pub fn is_editable(self) -> bool {
        matches!(self, NoteStatus::Draft | NoteStatus::Returned)
    }
}

impl fmt::Display for NoteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NoteStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NoteStatus::ALL
            .into_iter()
            .find(|st| st.as_str() == s)
            .ok_or_else(|| format!("Unknown note status '{s}'"))
    }
}

/// Kind of internal document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NoteType {
    Convocation,
    Rapport,
    Annonce,
    CompteRendu,
    Autre,
}

impl NoteType {
    pub const ALL: [NoteType; 5] = [
        NoteType::Convocation,
        NoteType::Rapport,
        NoteType::Annonce,
        NoteType::CompteRendu,
        NoteType::Autre,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            NoteType::Convocation => "CONVOCATION",
            NoteType::Rapport => "RAPPORT",
            NoteType::Annonce => "ANNONCE",
            NoteType::CompteRendu => "COMPTE_RENDU",
            NoteType::Autre => "AUTRE",
        }
    }
}

impl fmt::Display for NoteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NoteType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NoteType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("Unknown note type '{s}'"))
    }
}

/// Per-recipient reading state, independent of the author-side status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReceptionStatus {
    Unread,
    Read,
    Archived,
}

impl ReceptionStatus {
    pub const ALL: [ReceptionStatus; 3] = [
        ReceptionStatus::Unread,
        ReceptionStatus::Read,
        ReceptionStatus::Archived,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ReceptionStatus::Unread => "UNREAD",
            ReceptionStatus::Read => "READ",
            ReceptionStatus::Archived => "ARCHIVED",
        }
    }
}

impl fmt::Display for ReceptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReceptionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ReceptionStatus::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| format!("Unknown reception status '{s}'"))
    }
}

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// The workflow-relevant view of a note.
///
/// Attachments and template content are not needed to decide transitions,
/// so they live only in the `db` row types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: DbId,
    pub title: String,
    pub content: String,
    pub note_type: NoteType,
    pub status: NoteStatus,
    /// Set by a first-level approval in a two-level organisation.
    pub first_approved: bool,
    pub author_id: DbId,
    pub recipient_ids: Vec<DbId>,
    pub template_id: Option<DbId>,
    /// Send time requested at creation, used when scheduling without an explicit time.
    pub requested_send_at: Option<Timestamp>,
    pub scheduled_at: Option<Timestamp>,
    pub sent_at: Option<Timestamp>,
    pub archived_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub version: i32,
}

impl Note {
    pub fn is_author(&self, user_id: DbId) -> bool {
        self.author_id == user_id
    }

    pub fn is_recipient(&self, user_id: DbId) -> bool {
        self.recipient_ids.contains(&user_id)
    }

    /// Whether the note has been delivered to its recipients.
    pub fn was_sent(&self) -> bool {
        self.sent_at.is_some()
    }
}

/// Attachment metadata. The file itself lives in external storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttachmentInput {
    pub name: String,
    pub url: String,
    pub size: i64,
    pub mime_type: String,
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate a title for storage. Empty titles are allowed on drafts.
pub fn validate_title(title: &str) -> Result<(), CoreError> {
    if title.chars().count() > MAX_TITLE_LENGTH {
        return Err(CoreError::InvalidAction(format!(
            "Title exceeds maximum length of {MAX_TITLE_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Validate a body for storage. Empty bodies are allowed on drafts.
pub fn validate_content(content: &str) -> Result<(), CoreError> {
    if content.chars().count() > MAX_CONTENT_LENGTH {
        return Err(CoreError::InvalidAction(format!(
            "Content exceeds maximum length of {MAX_CONTENT_LENGTH} characters"
        )));
    }
    Ok(())
}

/// A note is complete enough to enter validation when title and content are
/// both non-blank.
pub fn validate_for_submission(note: &Note) -> Result<(), CoreError> {
    if note.title.trim().is_empty() {
        return Err(CoreError::InvalidAction(
            "A note needs a title before it can be submitted".to_string(),
        ));
    }
    if note.content.trim().is_empty() {
        return Err(CoreError::InvalidAction(
            "A note needs content before it can be submitted".to_string(),
        ));
    }
    Ok(())
}

/// De-duplicate recipient ids preserving first-seen order and enforce the cap.
pub fn normalize_recipients(ids: &[DbId]) -> Result<Vec<DbId>, CoreError> {
    let mut out: Vec<DbId> = Vec::with_capacity(ids.len());
    for id in ids {
        if !out.contains(id) {
            out.push(*id);
        }
    }
    if out.len() > MAX_RECIPIENTS {
        return Err(CoreError::InvalidAction(format!(
            "A note may have at most {MAX_RECIPIENTS} recipients"
        )));
    }
    Ok(out)
}

pub fn validate_attachments(attachments: &[AttachmentInput]) -> Result<(), CoreError> {
    if attachments.len() > MAX_ATTACHMENTS {
        return Err(CoreError::InvalidAction(format!(
            "A note may have at most {MAX_ATTACHMENTS} attachments"
        )));
    }
    for (i, a) in attachments.iter().enumerate() {
        if a.name.trim().is_empty() || a.url.trim().is_empty() {
            return Err(CoreError::InvalidAction(format!(
                "Attachment {i} must have a name and a url"
            )));
        }
        if a.size < 0 {
            return Err(CoreError::InvalidAction(format!(
                "Attachment {i} has a negative size"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::TimeZone;

    use super::*;

    pub const AUTHOR: DbId = 1;

    pub fn t0() -> Timestamp {
        chrono::Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap()
    }

    pub fn note(status: NoteStatus) -> Note {
        Note {
            id: 100,
            title: "Réunion de service".to_string(),
            content: "Ordre du jour".to_string(),
            note_type: NoteType::Convocation,
            status,
            first_approved: false,
            author_id: AUTHOR,
            recipient_ids: vec![20, 21],
            template_id: None,
            requested_send_at: None,
            scheduled_at: None,
            sent_at: None,
            archived_at: None,
            created_at: t0(),
            updated_at: t0(),
            version: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::fixtures::*;
    use super::*;

    #[test]
    fn status_names_round_trip() {
        for st in NoteStatus::ALL {
            assert_eq!(st.as_str().parse::<NoteStatus>().unwrap(), st);
        }
        assert!("draft".parse::<NoteStatus>().is_err());
    }

    #[test]
    fn type_names_round_trip() {
        for t in NoteType::ALL {
            assert_eq!(t.as_str().parse::<NoteType>().unwrap(), t);
        }
        assert_eq!("COMPTE_RENDU".parse::<NoteType>(), Ok(NoteType::CompteRendu));
    }

    #[test]
    fn reception_names_round_trip() {
        for r in ReceptionStatus::ALL {
            assert_eq!(r.as_str().parse::<ReceptionStatus>().unwrap(), r);
        }
    }

    #[test]
    fn only_archived_is_terminal() {
        let terminal: Vec<_> = NoteStatus::ALL
            .into_iter()
            .filter(|s| s.is_terminal())
            .collect();
        assert_eq!(terminal, vec![NoteStatus::Archived]);
    }

    #[test]
    fn submission_requires_title_and_content() {
        let mut n = note(NoteStatus::Draft);
        assert!(validate_for_submission(&n).is_ok());

        n.title = "   ".to_string();
        assert_matches!(validate_for_submission(&n), Err(CoreError::InvalidAction(_)));

        n.title = "Ok".to_string();
        n.content = String::new();
        assert_matches!(validate_for_submission(&n), Err(CoreError::InvalidAction(_)));
    }

    #[test]
    fn title_length_is_capped() {
        assert!(validate_title(&"a".repeat(MAX_TITLE_LENGTH)).is_ok());
        assert!(validate_title(&"a".repeat(MAX_TITLE_LENGTH + 1)).is_err());
        assert!(validate_title("").is_ok());
    }

    #[test]
    fn recipients_are_deduplicated_in_order() {
        assert_eq!(normalize_recipients(&[3, 1, 3, 2, 1]).unwrap(), vec![3, 1, 2]);
    }

    #[test]
    fn attachments_need_name_and_url() {
        let ok = AttachmentInput {
            name: "pv.pdf".into(),
            url: "https://files.local/pv.pdf".into(),
            size: 1024,
            mime_type: "application/pdf".into(),
        };
        assert!(validate_attachments(std::slice::from_ref(&ok)).is_ok());

        let nameless = AttachmentInput {
            name: " ".into(),
            ..ok.clone()
        };
        assert!(validate_attachments(&[nameless]).is_err());

        let negative = AttachmentInput { size: -1, ..ok };
        assert!(validate_attachments(&[negative]).is_err());
    }
}
