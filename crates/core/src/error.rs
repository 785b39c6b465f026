use crate::notes::NoteStatus;
use crate::types::DbId;

/// Domain error taxonomy shared by every workflow operation.
///
/// None of these variants are retried by the engine. Only transient storage
/// failures are retried, and that happens in the `db` crate.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    /// The actor lacks the permission required for the operation.
    #[error("Permission denied: {message}")]
    PermissionDenied {
        message: String,
        note_id: Option<DbId>,
    },

    /// The operation is not legal from the note's current status.
    #[error("Cannot {action} note {note_id} while it is {status}")]
    InvalidState {
        note_id: DbId,
        status: NoteStatus,
        action: &'static str,
    },

    /// Malformed request, e.g. a RETURN without a comment.
    #[error("Invalid action: {0}")]
    InvalidAction(String),

    /// Lost an optimistic-lock race; the caller should refresh and retry.
    #[error("Note {note_id} was updated by someone else (now {status}, version {version})")]
    ConcurrentModification {
        note_id: DbId,
        status: NoteStatus,
        version: i32,
    },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Shorthand for a [`CoreError::PermissionDenied`] tied to a note.
    pub fn denied(message: impl Into<String>, note_id: Option<DbId>) -> Self {
        Self::PermissionDenied {
            message: message.into(),
            note_id,
        }
    }

    /// Stable machine-readable code used in API error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NOT_FOUND",
            Self::PermissionDenied { .. } => "PERMISSION_DENIED",
            Self::InvalidState { .. } => "INVALID_STATE",
            Self::InvalidAction(_) => "INVALID_ACTION",
            Self::ConcurrentModification { .. } => "CONCURRENT_MODIFICATION",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_state_message_names_note_and_status() {
        let err = CoreError::InvalidState {
            note_id: 12,
            status: NoteStatus::Archived,
            action: "approve",
        };
        assert_eq!(
            err.to_string(),
            "Cannot approve note 12 while it is ARCHIVED"
        );
        assert_eq!(err.code(), "INVALID_STATE");
    }

    #[test]
    fn concurrent_modification_code() {
        let err = CoreError::ConcurrentModification {
            note_id: 1,
            status: NoteStatus::Returned,
            version: 4,
        };
        assert_eq!(err.code(), "CONCURRENT_MODIFICATION");
        assert!(err.to_string().contains("version 4"));
    }
}
