//! Note, recipient and attachment rows.

use naoty_core::error::CoreError;
use naoty_core::notes::{AttachmentInput, Note, NoteStatus, NoteType, ReceptionStatus};
use naoty_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `notes` table. Enum columns are stored as their wire names.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct NoteRow {
    pub id: DbId,
    pub title: String,
    pub content: String,
    pub note_type: String,
    pub status: String,
    pub first_approved: bool,
    pub author_id: DbId,
    pub template_id: Option<DbId>,
    pub requested_send_at: Option<Timestamp>,
    pub scheduled_at: Option<Timestamp>,
    pub sent_at: Option<Timestamp>,
    pub archived_at: Option<Timestamp>,
    pub version: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl NoteRow {
    /// Convert into the domain type. Unknown enum values mean the database
    /// was written by something else and surface as `Internal`.
    pub fn into_domain(self, recipient_ids: Vec<DbId>) -> Result<Note, CoreError> {
        let status: NoteStatus = self.status.parse().map_err(CoreError::Internal)?;
        let note_type: NoteType = self.note_type.parse().map_err(CoreError::Internal)?;
        Ok(Note {
            id: self.id,
            title: self.title,
            content: self.content,
            note_type,
            status,
            first_approved: self.first_approved,
            author_id: self.author_id,
            recipient_ids,
            template_id: self.template_id,
            requested_send_at: self.requested_send_at,
            scheduled_at: self.scheduled_at,
            sent_at: self.sent_at,
            archived_at: self.archived_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
            version: self.version,
        })
    }
}

/// A row from `note_recipients`, joined with the user's display name.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct NoteRecipient {
    pub note_id: DbId,
    pub user_id: DbId,
    pub full_name: String,
    pub reception_status: String,
    pub read_at: Option<Timestamp>,
    pub archived_at: Option<Timestamp>,
}

impl NoteRecipient {
    pub fn status(&self) -> Result<ReceptionStatus, CoreError> {
        self.reception_status.parse().map_err(CoreError::Internal)
    }
}

/// A row from `note_attachments`.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct NoteAttachment {
    pub id: DbId,
    pub note_id: DbId,
    pub position: i32,
    pub name: String,
    pub url: String,
    pub size_bytes: i64,
    pub mime_type: String,
    pub uploaded_at: Timestamp,
}

/// A sent note as seen from a recipient's inbox.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ReceivedNote {
    pub note_id: DbId,
    pub title: String,
    pub note_type: String,
    pub author_id: DbId,
    pub author_name: String,
    pub sent_at: Option<Timestamp>,
    pub reception_status: String,
    pub read_at: Option<Timestamp>,
    pub archived_at: Option<Timestamp>,
}

/// A sent note with its recipient ids, used to replay dispatch hand-offs.
#[derive(Debug, Clone, FromRow)]
pub struct SentNote {
    pub id: DbId,
    pub sent_at: Timestamp,
    pub recipient_ids: Vec<DbId>,
}

/// DTO for creating a note in DRAFT.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateNote {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(rename = "type")]
    pub note_type: NoteType,
    #[serde(default)]
    pub recipient_ids: Vec<DbId>,
    pub template_id: Option<DbId>,
    pub scheduled_at: Option<Timestamp>,
    #[serde(default)]
    pub attachments: Vec<AttachmentInput>,
}

/// DTO for editing a DRAFT or RETURNED note. `None` leaves a field as is.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateNote {
    pub title: Option<String>,
    pub content: Option<String>,
    #[serde(rename = "type")]
    pub note_type: Option<NoteType>,
    pub recipient_ids: Option<Vec<DbId>>,
    pub scheduled_at: Option<Timestamp>,
    pub attachments: Option<Vec<AttachmentInput>>,
    pub version: Option<i32>,
}

/// Full note detail returned by `GET /notes/{id}`.
#[derive(Debug, Clone, Serialize)]
pub struct NoteDetail {
    #[serde(flatten)]
    pub note: NoteRow,
    pub recipients: Vec<NoteRecipient>,
    pub attachments: Vec<NoteAttachment>,
}
