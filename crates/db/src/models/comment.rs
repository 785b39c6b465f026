//! Comment rows.

use naoty_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `comments` table, joined with the author's name.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Comment {
    pub id: DbId,
    pub note_id: DbId,
    pub author_id: DbId,
    pub author_name: String,
    pub content: String,
    pub mentions: Vec<DbId>,
    pub is_internal: bool,
    pub created_at: Timestamp,
}

/// Request body for `POST /notes/{id}/comments`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateComment {
    pub content: String,
    #[serde(default)]
    pub mentions: Vec<DbId>,
    #[serde(default)]
    pub is_internal: bool,
}
