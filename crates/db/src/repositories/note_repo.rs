//! Repository for the `notes`, `note_recipients` and `note_attachments` tables.

use naoty_core::notes::{AttachmentInput, Note};
use naoty_core::types::{DbId, Timestamp};
use sqlx::{PgConnection, PgExecutor, PgPool};

use crate::models::note::{NoteAttachment, NoteRecipient, NoteRow, SentNote};

/// Column list for `notes` queries.
const COLUMNS: &str = "id, title, content, note_type, status, first_approved, author_id, \
                       template_id, requested_send_at, scheduled_at, sent_at, archived_at, \
                       version, created_at, updated_at";

const ATTACHMENT_COLUMNS: &str =
    "id, note_id, position, name, url, size_bytes, mime_type, uploaded_at";

/// Fields of a new DRAFT note, already validated.
#[derive(Debug, Clone)]
pub struct NewNote<'a> {
    pub title: &'a str,
    pub content: &'a str,
    pub note_type: &'a str,
    pub author_id: DbId,
    pub template_id: Option<DbId>,
    pub requested_send_at: Option<Timestamp>,
}

/// Provides reads and writes for notes and their child rows.
pub struct NoteRepo;

impl NoteRepo {
    /// Insert the note row. Recipients and attachments are written separately
    /// in the same transaction.
    pub async fn insert(
        conn: &mut PgConnection,
        input: &NewNote<'_>,
    ) -> Result<NoteRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO notes
                (title, content, note_type, author_id, template_id, requested_send_at)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, NoteRow>(&query)
            .bind(input.title)
            .bind(input.content)
            .bind(input.note_type)
            .bind(input.author_id)
            .bind(input.template_id)
            .bind(input.requested_send_at)
            .fetch_one(conn)
            .await
    }

    pub async fn find_by_id<'e>(
        executor: impl PgExecutor<'e>,
        id: DbId,
    ) -> Result<Option<NoteRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM notes WHERE id = $1");
        sqlx::query_as::<_, NoteRow>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Read a note and hold its row lock until the transaction ends.
    pub async fn lock_for_update(
        conn: &mut PgConnection,
        id: DbId,
    ) -> Result<Option<NoteRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM notes WHERE id = $1 FOR UPDATE");
        sqlx::query_as::<_, NoteRow>(&query)
            .bind(id)
            .fetch_optional(conn)
            .await
    }

    /// Write every mutable column of `note` and bump its version.
    ///
    /// Guarded by `version = expected_version`; returns `false` when another
    /// writer got there first.
    pub async fn save<'e>(
        executor: impl PgExecutor<'e>,
        note: &Note,
        expected_version: i32,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE notes SET
                title = $3,
                content = $4,
                note_type = $5,
                status = $6,
                first_approved = $7,
                requested_send_at = $8,
                scheduled_at = $9,
                sent_at = $10,
                archived_at = $11,
                updated_at = $12,
                version = version + 1
             WHERE id = $1 AND version = $2",
        )
        .bind(note.id)
        .bind(expected_version)
        .bind(&note.title)
        .bind(&note.content)
        .bind(note.note_type.as_str())
        .bind(note.status.as_str())
        .bind(note.first_approved)
        .bind(note.requested_send_at)
        .bind(note.scheduled_at)
        .bind(note.sent_at)
        .bind(note.archived_at)
        .bind(note.updated_at)
        .execute(executor)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Recipient user ids in insertion order.
    pub async fn recipient_ids<'e>(
        executor: impl PgExecutor<'e>,
        note_id: DbId,
    ) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT user_id FROM note_recipients WHERE note_id = $1 ORDER BY created_at, user_id",
        )
        .bind(note_id)
        .fetch_all(executor)
        .await
    }

    /// Recipients with their reception state and display name.
    pub async fn recipients(
        pool: &PgPool,
        note_id: DbId,
    ) -> Result<Vec<NoteRecipient>, sqlx::Error> {
        sqlx::query_as::<_, NoteRecipient>(
            "SELECT nr.note_id, nr.user_id, u.full_name, nr.reception_status, \
                    nr.read_at, nr.archived_at \
             FROM note_recipients nr \
             JOIN users u ON u.id = nr.user_id \
             WHERE nr.note_id = $1 \
             ORDER BY nr.created_at, nr.user_id",
        )
        .bind(note_id)
        .fetch_all(pool)
        .await
    }

    /// Replace the recipient set. Existing rows for kept users are left alone.
    pub async fn replace_recipients(
        conn: &mut PgConnection,
        note_id: DbId,
        user_ids: &[DbId],
    ) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM note_recipients WHERE note_id = $1 AND NOT (user_id = ANY($2))")
            .bind(note_id)
            .bind(user_ids)
            .execute(&mut *conn)
            .await?;
        sqlx::query(
            "INSERT INTO note_recipients (note_id, user_id) \
             SELECT $1, UNNEST($2::BIGINT[]) \
             ON CONFLICT ON CONSTRAINT uq_note_recipients DO NOTHING",
        )
        .bind(note_id)
        .bind(user_ids)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    pub async fn attachments(
        pool: &PgPool,
        note_id: DbId,
    ) -> Result<Vec<NoteAttachment>, sqlx::Error> {
        let query = format!(
            "SELECT {ATTACHMENT_COLUMNS} FROM note_attachments WHERE note_id = $1 ORDER BY position"
        );
        sqlx::query_as::<_, NoteAttachment>(&query)
            .bind(note_id)
            .fetch_all(pool)
            .await
    }

    /// Replace all attachments, keeping the given order.
    pub async fn replace_attachments(
        conn: &mut PgConnection,
        note_id: DbId,
        attachments: &[AttachmentInput],
    ) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM note_attachments WHERE note_id = $1")
            .bind(note_id)
            .execute(&mut *conn)
            .await?;
        for (position, a) in attachments.iter().enumerate() {
            sqlx::query(
                "INSERT INTO note_attachments \
                    (note_id, position, name, url, size_bytes, mime_type) \
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(note_id)
            .bind(position as i32)
            .bind(&a.name)
            .bind(&a.url)
            .bind(a.size)
            .bind(&a.mime_type)
            .execute(&mut *conn)
            .await?;
        }
        Ok(())
    }

    /// Notes written by `author_id`, newest first, optionally filtered by status.
    pub async fn list_by_author(
        pool: &PgPool,
        author_id: DbId,
        status: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<NoteRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM notes \
             WHERE author_id = $1 AND ($2::TEXT IS NULL OR status = $2) \
             ORDER BY updated_at DESC, id DESC \
             LIMIT $3 OFFSET $4"
        );
        sqlx::query_as::<_, NoteRow>(&query)
            .bind(author_id)
            .bind(status)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// PENDING_VALIDATION notes at the given approval stages, oldest first.
    pub async fn list_pending(
        pool: &PgPool,
        stages: &[bool],
        limit: i64,
        offset: i64,
    ) -> Result<Vec<NoteRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM notes \
             WHERE status = 'PENDING_VALIDATION' AND first_approved = ANY($1) \
             ORDER BY updated_at ASC, id ASC \
             LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, NoteRow>(&query)
            .bind(stages)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Ids of SCHEDULED notes whose send time has passed.
    pub async fn due_for_dispatch(
        pool: &PgPool,
        now: Timestamp,
        limit: i64,
    ) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT id FROM notes \
             WHERE status = 'SCHEDULED' AND scheduled_at <= $1 \
             ORDER BY scheduled_at ASC \
             LIMIT $2",
        )
        .bind(now)
        .bind(limit)
        .fetch_all(pool)
        .await
    }

    /// Notes sent at or after `since` with their recipients, oldest first.
    pub async fn sent_since(
        pool: &PgPool,
        since: Timestamp,
        limit: i64,
    ) -> Result<Vec<SentNote>, sqlx::Error> {
        sqlx::query_as::<_, SentNote>(
            "SELECT n.id, n.sent_at, \
                    COALESCE(array_agg(r.user_id ORDER BY r.user_id) \
                             FILTER (WHERE r.user_id IS NOT NULL), '{}') AS recipient_ids \
             FROM notes n \
             LEFT JOIN note_recipients r ON r.note_id = n.id \
             WHERE n.sent_at >= $1 \
             GROUP BY n.id \
             ORDER BY n.sent_at ASC, n.id ASC \
             LIMIT $2",
        )
        .bind(since)
        .bind(limit)
        .fetch_all(pool)
        .await
    }
}
