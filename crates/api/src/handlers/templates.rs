//! Handlers for the `/templates` resource.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use naoty_core::error::CoreError;
use naoty_core::roles::permissions::{TEMPLATES_MANAGE, TEMPLATES_READ};
use naoty_core::types::DbId;
use naoty_db::models::template::{CreateTemplate, Template};
use naoty_db::repositories::TemplateRepo;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/templates
pub async fn list_templates(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Vec<Template>>>> {
    auth.require(TEMPLATES_READ)?;
    let templates = TemplateRepo::list(&state.pool).await?;
    Ok(Json(DataResponse { data: templates }))
}

/// GET /api/v1/templates/{id}
pub async fn get_template(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Template>>> {
    auth.require(TEMPLATES_READ)?;
    let template = TemplateRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "template",
            id,
        })?;
    Ok(Json(DataResponse { data: template }))
}

/// POST /api/v1/templates
///
/// Requires `templates:manage`. Duplicate names fail with 409 via
/// `uq_templates_name`.
pub async fn create_template(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreateTemplate>,
) -> AppResult<impl IntoResponse> {
    auth.require(TEMPLATES_MANAGE)?;
    if input.name.trim().is_empty() {
        return Err(AppError::BadRequest("Template name must not be empty".into()));
    }

    let template = TemplateRepo::create(&state.pool, auth.user_id, &input).await?;
    tracing::info!(template_id = template.id, user_id = auth.user_id, "Template created");

    Ok((StatusCode::CREATED, Json(DataResponse { data: template })))
}
