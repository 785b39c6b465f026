//! Recipient-side state stored on `note_recipients`.

use naoty_core::dashboard::ReceivedCounts;
use naoty_core::notes::ReceptionStatus;
use naoty_core::types::{DbId, Timestamp};
use sqlx::{PgConnection, PgPool};

use crate::models::note::{NoteRecipient, ReceivedNote};

pub struct ReceptionRepo;

impl ReceptionRepo {
    /// Lock one recipient row for the rest of the transaction.
    pub async fn lock(
        conn: &mut PgConnection,
        note_id: DbId,
        user_id: DbId,
    ) -> Result<Option<NoteRecipient>, sqlx::Error> {
        sqlx::query_as::<_, NoteRecipient>(
            "SELECT nr.note_id, nr.user_id, u.full_name, nr.reception_status, \
                    nr.read_at, nr.archived_at \
             FROM note_recipients nr \
             JOIN users u ON u.id = nr.user_id \
             WHERE nr.note_id = $1 AND nr.user_id = $2 \
             FOR UPDATE OF nr",
        )
        .bind(note_id)
        .bind(user_id)
        .fetch_optional(conn)
        .await
    }

    /// Store a new reception status, stamping `read_at` / `archived_at` the
    /// first time each state is reached.
    pub async fn set_status(
        conn: &mut PgConnection,
        note_id: DbId,
        user_id: DbId,
        status: ReceptionStatus,
        now: Timestamp,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE note_recipients SET \
                reception_status = $3, \
                read_at = CASE WHEN $3 IN ('READ', 'ARCHIVED') \
                    THEN COALESCE(read_at, $4) ELSE read_at END, \
                archived_at = CASE WHEN $3 = 'ARCHIVED' \
                    THEN COALESCE(archived_at, $4) ELSE archived_at END \
             WHERE note_id = $1 AND user_id = $2",
        )
        .bind(note_id)
        .bind(user_id)
        .bind(status.as_str())
        .bind(now)
        .execute(conn)
        .await?;
        Ok(())
    }

    /// Sent notes addressed to `user_id`, newest first.
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: DbId,
        status: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ReceivedNote>, sqlx::Error> {
        sqlx::query_as::<_, ReceivedNote>(
            "SELECT n.id AS note_id, n.title, n.note_type, n.author_id, \
                    a.full_name AS author_name, n.sent_at, \
                    nr.reception_status, nr.read_at, nr.archived_at \
             FROM note_recipients nr \
             JOIN notes n ON n.id = nr.note_id \
             JOIN users a ON a.id = n.author_id \
             WHERE nr.user_id = $1 AND n.sent_at IS NOT NULL \
               AND ($2::TEXT IS NULL OR nr.reception_status = $2) \
             ORDER BY n.sent_at DESC, n.id DESC \
             LIMIT $3 OFFSET $4",
        )
        .bind(user_id)
        .bind(status)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
    }

    /// Reception counters over sent notes addressed to `user_id`.
    pub async fn counts(pool: &PgPool, user_id: DbId) -> Result<ReceivedCounts, sqlx::Error> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT nr.reception_status, COUNT(*) \
             FROM note_recipients nr \
             JOIN notes n ON n.id = nr.note_id \
             WHERE nr.user_id = $1 AND n.sent_at IS NOT NULL \
             GROUP BY nr.reception_status",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        let mut counts = ReceivedCounts::default();
        for (status, count) in rows {
            match status.parse::<ReceptionStatus>() {
                Ok(ReceptionStatus::Unread) => counts.unread = count,
                Ok(ReceptionStatus::Read) => counts.read = count,
                Ok(ReceptionStatus::Archived) => counts.archived = count,
                Err(e) => tracing::warn!(user_id, error = %e, "Skipping unknown reception status"),
            }
        }
        Ok(counts)
    }
}
