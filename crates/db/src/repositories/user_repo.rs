//! Repository for the `users`, `roles` and `user_roles` tables.

use naoty_core::types::DbId;
use sqlx::{PgExecutor, PgPool};

use crate::models::user::{CreateUser, User};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str =
    "id, username, full_name, email, password_hash, is_active, created_at, updated_at";

/// Provides user lookups and role assignments.
pub struct UserRepo;

impl UserRepo {
    /// Insert a new user, returning the created row.
    pub async fn create(pool: &PgPool, input: &CreateUser) -> Result<User, sqlx::Error> {
        let query = format!(
            "INSERT INTO users (username, full_name, email, password_hash)
             VALUES ($1, $2, $3, $4)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(&input.username)
            .bind(&input.full_name)
            .bind(&input.email)
            .bind(&input.password_hash)
            .fetch_one(pool)
            .await
    }

    /// Find a user by internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// All users, oldest first.
    pub async fn list(pool: &PgPool) -> Result<Vec<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users ORDER BY id");
        sqlx::query_as::<_, User>(&query).fetch_all(pool).await
    }

    /// Find a user by username (case-sensitive).
    pub async fn find_by_username(
        pool: &PgPool,
        username: &str,
    ) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE username = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(username)
            .fetch_optional(pool)
            .await
    }

    /// Role names held by a user, sorted.
    pub async fn role_names(pool: &PgPool, user_id: DbId) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT r.name FROM user_roles ur \
             JOIN roles r ON r.id = ur.role_id \
             WHERE ur.user_id = $1 \
             ORDER BY r.name",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    /// Grant a role by name. Returns `false` if the role does not exist or
    /// was already held.
    pub async fn assign_role(
        pool: &PgPool,
        user_id: DbId,
        role_name: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO user_roles (user_id, role_id) \
             SELECT $1, id FROM roles WHERE name = $2 \
             ON CONFLICT ON CONSTRAINT uq_user_roles DO NOTHING",
        )
        .bind(user_id)
        .bind(role_name)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Active users holding at least one of the given roles.
    pub async fn active_ids_with_roles<'e>(
        executor: impl PgExecutor<'e>,
        role_names: &[String],
    ) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT DISTINCT u.id FROM users u \
             JOIN user_roles ur ON ur.user_id = u.id \
             JOIN roles r ON r.id = ur.role_id \
             WHERE r.name = ANY($1) AND u.is_active \
             ORDER BY u.id",
        )
        .bind(role_names)
        .fetch_all(executor)
        .await
    }

    /// The subset of `ids` that exist in `users`.
    pub async fn existing_ids<'e>(
        executor: impl PgExecutor<'e>,
        ids: &[DbId],
    ) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar("SELECT id FROM users WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(executor)
            .await
    }
}
