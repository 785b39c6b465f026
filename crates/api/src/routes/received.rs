//! Route definitions for the `/received` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::received;
use crate::state::AppState;

/// Routes mounted at `/received`.
///
/// ```text
/// GET  /                    -> list_received
/// POST /{note_id}/read      -> mark_read
/// POST /{note_id}/archive   -> archive
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(received::list_received))
        .route("/{note_id}/read", post(received::mark_read))
        .route("/{note_id}/archive", post(received::archive))
}
