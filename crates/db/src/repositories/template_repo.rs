//! Repository for the `templates` table.

use naoty_core::types::DbId;
use sqlx::PgPool;

use crate::models::template::{CreateTemplate, Template};

const COLUMNS: &str = "id, name, note_type, title, content, created_by, created_at, updated_at";

pub struct TemplateRepo;

impl TemplateRepo {
    pub async fn create(
        pool: &PgPool,
        created_by: DbId,
        input: &CreateTemplate,
    ) -> Result<Template, sqlx::Error> {
        let query = format!(
            "INSERT INTO templates (name, note_type, title, content, created_by)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Template>(&query)
            .bind(&input.name)
            .bind(input.note_type.as_str())
            .bind(&input.title)
            .bind(&input.content)
            .bind(created_by)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Template>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM templates WHERE id = $1");
        sqlx::query_as::<_, Template>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// All templates ordered by name.
    pub async fn list(pool: &PgPool) -> Result<Vec<Template>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM templates ORDER BY name");
        sqlx::query_as::<_, Template>(&query).fetch_all(pool).await
    }
}
