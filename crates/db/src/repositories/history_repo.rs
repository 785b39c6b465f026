//! Repository for the append-only `validation_history` table.

use naoty_core::types::DbId;
use naoty_core::workflow::HistoryRecord;
use sqlx::{PgExecutor, PgPool};

use crate::models::history::ValidationHistoryEntry;

const COLUMNS: &str = "id, note_id, validator_id, validator_role, action, comment, \
                       previous_status, new_status, created_at";

pub struct HistoryRepo;

impl HistoryRepo {
    pub async fn insert<'e>(
        executor: impl PgExecutor<'e>,
        note_id: DbId,
        record: &HistoryRecord,
    ) -> Result<ValidationHistoryEntry, sqlx::Error> {
        let query = format!(
            "INSERT INTO validation_history \
                (note_id, validator_id, validator_role, action, comment, \
                 previous_status, new_status) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ValidationHistoryEntry>(&query)
            .bind(note_id)
            .bind(record.validator_id)
            .bind(record.validator_role.as_str())
            .bind(record.action.as_str())
            .bind(&record.comment)
            .bind(record.previous_status.as_str())
            .bind(record.new_status.as_str())
            .fetch_one(executor)
            .await
    }

    /// Entries for a note, oldest first.
    pub async fn list_for_note(
        pool: &PgPool,
        note_id: DbId,
    ) -> Result<Vec<ValidationHistoryEntry>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM validation_history WHERE note_id = $1 ORDER BY created_at, id"
        );
        sqlx::query_as::<_, ValidationHistoryEntry>(&query)
            .bind(note_id)
            .fetch_all(pool)
            .await
    }
}
