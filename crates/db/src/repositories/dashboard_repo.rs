//! Aggregate queries behind `GET /dashboard`.

use naoty_core::dashboard::{fill_status_counts, DashboardSummary};
use naoty_core::notes::NoteStatus;
use naoty_core::types::DbId;
use sqlx::PgPool;

use crate::repositories::{NotificationRepo, ReceptionRepo};

pub struct DashboardRepo;

impl DashboardRepo {
    /// Authored-note counts per status, zero-filled.
    pub async fn authored_counts(
        pool: &PgPool,
        author_id: DbId,
    ) -> Result<Vec<(NoteStatus, i64)>, sqlx::Error> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT status, COUNT(*) FROM notes WHERE author_id = $1 GROUP BY status",
        )
        .bind(author_id)
        .fetch_all(pool)
        .await?;
        Ok(rows
            .into_iter()
            .filter_map(|(s, c)| s.parse::<NoteStatus>().ok().map(|st| (st, c)))
            .collect())
    }

    /// Number of notes waiting at the given approval stages.
    pub async fn pending_count(pool: &PgPool, stages: &[bool]) -> Result<i64, sqlx::Error> {
        if stages.is_empty() {
            return Ok(0);
        }
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM notes \
             WHERE status = 'PENDING_VALIDATION' AND first_approved = ANY($1)",
        )
        .bind(stages)
        .fetch_one(pool)
        .await
    }

    pub async fn summary(
        pool: &PgPool,
        user_id: DbId,
        stages: &[bool],
    ) -> Result<DashboardSummary, sqlx::Error> {
        let authored = Self::authored_counts(pool, user_id).await?;
        Ok(DashboardSummary {
            authored: fill_status_counts(&authored),
            pending_validation: Self::pending_count(pool, stages).await?,
            received: ReceptionRepo::counts(pool, user_id).await?,
            unread_notifications: NotificationRepo::unread_count(pool, user_id).await?,
        })
    }
}
