pub mod admin;
pub mod auth;
pub mod dashboard;
pub mod health;
pub mod notes;
pub mod notifications;
pub mod received;
pub mod templates;
pub mod validation;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /auth/login                          login (public)
/// /auth/me                             current user, roles, permissions
///
/// /notes                               list own, create
/// /notes/{id}                          get, update (DRAFT/RETURNED)
/// /notes/{id}/submit                   DRAFT/RETURNED -> PENDING_VALIDATION
/// /notes/{id}/validate                 APPROVE / RETURN / ARCHIVE
/// /notes/{id}/schedule                 APPROVED -> SCHEDULED
/// /notes/{id}/dispatch                 SCHEDULED -> SENT
/// /notes/{id}/validation-history       append-only log
/// /notes/{id}/comments                 list, add
///
/// /validation/pending                  caller's validation queue
///
/// /received                            inbox of sent notes
/// /received/{note_id}/read             mark READ
/// /received/{note_id}/archive          mark ARCHIVED
///
/// /notifications                       list
/// /notifications/unread-count          count
/// /notifications/read-all              mark all read
/// /notifications/{id}/read             mark one read
/// /notifications/{id}                  delete
///
/// /templates                           list, create (templates:manage)
/// /templates/{id}                      get
///
/// /dashboard                           counters for the caller
///
/// /admin/users                         list, create (users:manage)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/notes", notes::router())
        .nest("/validation", validation::router())
        .nest("/received", received::router())
        .nest("/notifications", notifications::router())
        .nest("/templates", templates::router())
        .nest("/dashboard", dashboard::router())
        .nest("/admin", admin::router())
}
