//! Validation history rows.

use naoty_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the append-only `validation_history` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ValidationHistoryEntry {
    pub id: DbId,
    pub note_id: DbId,
    pub validator_id: DbId,
    pub validator_role: String,
    pub action: String,
    pub comment: Option<String>,
    pub previous_status: String,
    pub new_status: String,
    pub created_at: Timestamp,
}
