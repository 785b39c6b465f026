//! Handlers for the `/notifications` resource.
//!
//! Every endpoint only touches the caller's own notifications. All but the
//! listing are idempotent.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use naoty_core::error::CoreError;
use naoty_core::types::DbId;
use naoty_db::models::notification::Notification;
use naoty_db::repositories::NotificationRepo;
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::handlers::PaginationParams;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Query parameters for `GET /notifications`.
#[derive(Debug, Deserialize)]
pub struct NotificationQuery {
    /// If `true`, return only unread notifications. Defaults to `false`.
    pub unread_only: Option<bool>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

fn not_found(id: DbId) -> AppError {
    AppError::Core(CoreError::NotFound {
        entity: "notification",
        id,
    })
}

/// GET /api/v1/notifications
pub async fn list_notifications(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<NotificationQuery>,
) -> AppResult<Json<DataResponse<Vec<Notification>>>> {
    let (limit, offset) = PaginationParams {
        limit: params.limit,
        offset: params.offset,
    }
    .resolve();

    let notifications = NotificationRepo::list_for_user(
        &state.pool,
        auth.user_id,
        params.unread_only.unwrap_or(false),
        limit,
        offset,
    )
    .await?;
    Ok(Json(DataResponse {
        data: notifications,
    }))
}

/// GET /api/v1/notifications/unread-count
pub async fn unread_count(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<serde_json::Value>> {
    let count = NotificationRepo::unread_count(&state.pool, auth.user_id).await?;
    Ok(Json(serde_json::json!({ "data": { "count": count } })))
}

/// POST /api/v1/notifications/{id}/read
///
/// 204 whether or not it was already read; 404 if it is not the caller's.
pub async fn mark_read(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(notification_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    if !NotificationRepo::mark_read(&state.pool, notification_id, auth.user_id).await? {
        return Err(not_found(notification_id));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/notifications/read-all
///
/// Returns how many notifications changed; zero on a repeat call.
pub async fn mark_all_read(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<serde_json::Value>> {
    let count = NotificationRepo::mark_all_read(&state.pool, auth.user_id).await?;
    tracing::debug!(user_id = auth.user_id, count, "Marked all notifications read");
    Ok(Json(serde_json::json!({ "data": { "marked_read": count } })))
}

/// DELETE /api/v1/notifications/{id}
///
/// 204 when deleted or already gone.
pub async fn delete_notification(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(notification_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    NotificationRepo::delete(&state.pool, notification_id, auth.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
