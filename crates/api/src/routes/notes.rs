//! Route definitions for the `/notes` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::notes;
use crate::state::AppState;

/// Routes mounted at `/notes`.
///
/// ```text
/// GET    /                          -> list_notes
/// POST   /                          -> create_note
/// GET    /{id}                      -> get_note
/// PUT    /{id}                      -> update_note
///
/// POST   /{id}/submit               -> submit_note
/// POST   /{id}/validate             -> validate_note
/// POST   /{id}/schedule             -> schedule_note
/// POST   /{id}/dispatch             -> dispatch_note
/// GET    /{id}/validation-history   -> validation_history
///
/// GET    /{id}/comments             -> list_comments
/// POST   /{id}/comments             -> add_comment
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(notes::list_notes).post(notes::create_note))
        .route("/{id}", get(notes::get_note).put(notes::update_note))
        // Workflow
        .route("/{id}/submit", post(notes::submit_note))
        .route("/{id}/validate", post(notes::validate_note))
        .route("/{id}/schedule", post(notes::schedule_note))
        .route("/{id}/dispatch", post(notes::dispatch_note))
        .route("/{id}/validation-history", get(notes::validation_history))
        // Comments
        .route(
            "/{id}/comments",
            get(notes::list_comments).post(notes::add_comment),
        )
}
