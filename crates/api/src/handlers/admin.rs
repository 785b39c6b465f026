//! Handlers for user administration. Both endpoints require `users:manage`.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use naoty_core::roles::permissions::USERS_MANAGE;
use naoty_core::roles::Role;
use naoty_db::models::user::CreateUser;
use naoty_db::repositories::UserRepo;
use serde::Deserialize;

use crate::auth::password::hash_password;
use crate::error::{AppError, AppResult};
use crate::handlers::auth::{user_info, UserInfo};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Minimum accepted password length for new accounts.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Request body for `POST /admin/users`.
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub full_name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub roles: Vec<Role>,
}

/// POST /api/v1/admin/users
///
/// Create an account holding `roles`. Duplicate usernames or emails fail
/// with 409 via `uq_users_username` / `uq_users_email`.
pub async fn create_user(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreateUserRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<UserInfo>>)> {
    auth.require(USERS_MANAGE)?;

    if input.username.trim().is_empty() {
        return Err(AppError::BadRequest("Username must not be empty".into()));
    }
    if input.password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AppError::BadRequest(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }

    let password_hash = hash_password(&input.password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;
    let user = UserRepo::create(
        &state.pool,
        &CreateUser {
            username: input.username.trim().to_string(),
            full_name: input.full_name,
            email: input.email,
            password_hash,
        },
    )
    .await?;

    for role in &input.roles {
        UserRepo::assign_role(&state.pool, user.id, role.as_str()).await?;
    }
    let role_names = UserRepo::role_names(&state.pool, user.id).await?;

    tracing::info!(
        user_id = user.id,
        created_by = auth.user_id,
        roles = ?role_names,
        "User created",
    );
    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: user_info(user, role_names),
        }),
    ))
}

/// GET /api/v1/admin/users
pub async fn list_users(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Vec<UserInfo>>>> {
    auth.require(USERS_MANAGE)?;

    let users = UserRepo::list(&state.pool).await?;
    let mut data = Vec::with_capacity(users.len());
    for user in users {
        let role_names = UserRepo::role_names(&state.pool, user.id).await?;
        data.push(user_info(user, role_names));
    }
    Ok(Json(DataResponse { data }))
}
