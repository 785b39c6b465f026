//! Template entity model and DTO.

use naoty_core::notes::NoteType;
use naoty_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `templates` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Template {
    pub id: DbId,
    pub name: String,
    pub note_type: String,
    pub title: String,
    pub content: String,
    pub created_by: DbId,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a template.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTemplate {
    pub name: String,
    #[serde(rename = "type")]
    pub note_type: NoteType,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
}
