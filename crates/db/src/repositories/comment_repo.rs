//! Repository for the `comments` table.

use naoty_core::comments::NewComment;
use naoty_core::types::DbId;
use sqlx::{PgExecutor, PgPool};

use crate::models::comment::Comment;

/// Columns selected from `comments c JOIN users u`.
const JOINED_COLUMNS: &str = "c.id, c.note_id, c.author_id, u.full_name AS author_name, \
                              c.content, c.mentions, c.is_internal, c.created_at";

/// Comments are immutable: insert and list only.
pub struct CommentRepo;

impl CommentRepo {
    pub async fn insert<'e>(
        executor: impl PgExecutor<'e>,
        comment: &NewComment,
    ) -> Result<Comment, sqlx::Error> {
        let query = format!(
            "WITH c AS ( \
                INSERT INTO comments (note_id, author_id, content, mentions, is_internal) \
                VALUES ($1, $2, $3, $4, $5) \
                RETURNING * \
             ) \
             SELECT {JOINED_COLUMNS} FROM c JOIN users u ON u.id = c.author_id"
        );
        sqlx::query_as::<_, Comment>(&query)
            .bind(comment.note_id)
            .bind(comment.author_id)
            .bind(&comment.content)
            .bind(&comment.mentions)
            .bind(comment.is_internal)
            .fetch_one(executor)
            .await
    }

    /// Comments on a note in creation order. Internal comments are omitted
    /// unless `include_internal`.
    pub async fn list_for_note(
        pool: &PgPool,
        note_id: DbId,
        include_internal: bool,
    ) -> Result<Vec<Comment>, sqlx::Error> {
        let query = format!(
            "SELECT {JOINED_COLUMNS} FROM comments c JOIN users u ON u.id = c.author_id \
             WHERE c.note_id = $1 AND ($2 OR NOT c.is_internal) \
             ORDER BY c.created_at, c.id"
        );
        sqlx::query_as::<_, Comment>(&query)
            .bind(note_id)
            .bind(include_internal)
            .fetch_all(pool)
            .await
    }
}
