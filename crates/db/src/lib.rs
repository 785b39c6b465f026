//! PostgreSQL persistence for the note workflow.
//!
//! Repositories are zero-sized structs whose async methods take `&PgPool`
//! (or a transaction) as the first argument. Multi-row mutations of a note
//! go through [`transitions`], which wraps the domain functions of
//! `naoty-core` in a single locked transaction.

pub mod error;
pub mod models;
pub mod repositories;
pub mod retry;
pub mod transitions;

pub use error::StoreError;

use sqlx::postgres::PgPoolOptions;

pub type DbPool = sqlx::PgPool;

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(20)
        .connect(database_url)
        .await
}

/// Round-trip a trivial query to confirm the database is reachable.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply pending migrations from `db/migrations`.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../../db/migrations").run(pool).await
}
