//! Notification kinds and fan-out resolution.
//!
//! The workflow functions emit [`NotificationDraft`]s addressed either to a
//! specific user or to "everyone holding permission X". The storage layer
//! looks up permission holders and calls [`resolve`] to turn drafts into one
//! row per affected user.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::types::DbId;

/// Kind of in-app notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationType {
    ValidationRequested,
    NoteApproved,
    NoteReturned,
    NoteArchived,
    NoteScheduled,
    NoteSent,
    NoteReceived,
    Mention,
    Reminder,
    System,
}

impl NotificationType {
    pub const ALL: [NotificationType; 10] = [
        NotificationType::ValidationRequested,
        NotificationType::NoteApproved,
        NotificationType::NoteReturned,
        NotificationType::NoteArchived,
        NotificationType::NoteScheduled,
        NotificationType::NoteSent,
        NotificationType::NoteReceived,
        NotificationType::Mention,
        NotificationType::Reminder,
        NotificationType::System,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            NotificationType::ValidationRequested => "VALIDATION_REQUESTED",
            NotificationType::NoteApproved => "NOTE_APPROVED",
            NotificationType::NoteReturned => "NOTE_RETURNED",
            NotificationType::NoteArchived => "NOTE_ARCHIVED",
            NotificationType::NoteScheduled => "NOTE_SCHEDULED",
            NotificationType::NoteSent => "NOTE_SENT",
            NotificationType::NoteReceived => "NOTE_RECEIVED",
            NotificationType::Mention => "MENTION",
            NotificationType::Reminder => "REMINDER",
            NotificationType::System => "SYSTEM",
        }
    }
}

impl fmt::Display for NotificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NotificationType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("Unknown notification type '{s}'"))
    }
}

/// Who a draft is addressed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Audience {
    User(DbId),
    /// Every active user holding this permission through any of their roles.
    PermissionHolders(&'static str),
}

/// A notification produced by a workflow operation, before addressees are
/// resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationDraft {
    pub audience: Audience,
    pub kind: NotificationType,
    pub note_id: DbId,
    pub message: String,
}

impl NotificationDraft {
    pub fn to_user(user_id: DbId, kind: NotificationType, note_id: DbId, message: String) -> Self {
        Self {
            audience: Audience::User(user_id),
            kind,
            note_id,
            message,
        }
    }

    pub fn to_holders(
        permission: &'static str,
        kind: NotificationType,
        note_id: DbId,
        message: String,
    ) -> Self {
        Self {
            audience: Audience::PermissionHolders(permission),
            kind,
            note_id,
            message,
        }
    }
}

/// A notification addressed to exactly one user, ready to be stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedNotification {
    pub user_id: DbId,
    pub kind: NotificationType,
    pub note_id: DbId,
    pub message: String,
}

/// Permissions whose holders must be looked up before [`resolve`] is called.
pub fn required_lookups(drafts: &[NotificationDraft]) -> Vec<&'static str> {
    let mut perms: Vec<&'static str> = drafts
        .iter()
        .filter_map(|d| match d.audience {
            Audience::PermissionHolders(p) => Some(p),
            Audience::User(_) => None,
        })
        .collect();
    perms.sort_unstable();
    perms.dedup();
    perms
}

/// Expand drafts into per-user notifications.
///
/// The actor never notifies themselves, and a user receives at most one
/// notification of a given kind per operation. `actor_id` is `None` for
/// system-initiated transitions such as timed dispatch.
pub fn resolve(
    drafts: &[NotificationDraft],
    actor_id: Option<DbId>,
    holders: &HashMap<&'static str, Vec<DbId>>,
) -> Vec<ResolvedNotification> {
    let mut out: Vec<ResolvedNotification> = Vec::new();

    for draft in drafts {
        let users: Vec<DbId> = match draft.audience {
            Audience::User(id) => vec![id],
            Audience::PermissionHolders(p) => holders.get(p).cloned().unwrap_or_default(),
        };

        for user_id in users {
            if Some(user_id) == actor_id {
                continue;
            }
            let duplicate = out.iter().any(|n| {
                n.user_id == user_id && n.kind == draft.kind && n.note_id == draft.note_id
            });
            if duplicate {
                continue;
            }
            out.push(ResolvedNotification {
                user_id,
                kind: draft.kind,
                note_id: draft.note_id,
                message: draft.message.clone(),
            });
        }
    }

    out
}
