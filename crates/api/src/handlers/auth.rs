//! Handlers for the `/auth` resource.

use axum::extract::State;
use axum::Json;
use naoty_core::error::CoreError;
use naoty_core::roles::{effective_permissions, parse_roles};
use naoty_core::types::DbId;
use naoty_db::models::user::User;
use naoty_db::repositories::UserRepo;
use serde::{Deserialize, Serialize};

use crate::auth::jwt::generate_access_token;
use crate::auth::password::verify_password;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /auth/login`.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: &'static str,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
    pub user: UserInfo,
}

/// Public user info with the caller's roles and what they grant.
#[derive(Debug, Serialize)]
pub struct UserInfo {
    pub id: DbId,
    pub username: String,
    pub full_name: String,
    pub email: String,
    pub roles: Vec<String>,
    pub permissions: Vec<&'static str>,
}

fn invalid_credentials() -> AppError {
    AppError::Core(CoreError::Unauthorized(
        "Invalid username or password".into(),
    ))
}

pub(crate) fn user_info(user: User, role_names: Vec<String>) -> UserInfo {
    let permissions = effective_permissions(&parse_roles(&role_names));
    UserInfo {
        id: user.id,
        username: user.username,
        full_name: user.full_name,
        email: user.email,
        roles: role_names,
        permissions,
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/auth/login
///
/// Authenticate with username + password and receive an access token.
pub async fn login(
    State(state): State<AppState>,
    Json(input): Json<LoginRequest>,
) -> AppResult<Json<DataResponse<LoginResponse>>> {
    let user = UserRepo::find_by_username(&state.pool, &input.username)
        .await?
        .ok_or_else(invalid_credentials)?;

    let password_valid = verify_password(&input.password, &user.password_hash)
        .map_err(|e| AppError::InternalError(format!("Password verification error: {e}")))?;
    if !password_valid {
        tracing::info!(username = %input.username, "Rejected login attempt");
        return Err(invalid_credentials());
    }

    if !user.is_active {
        return Err(AppError::Core(CoreError::denied("Account is deactivated", None)));
    }

    let role_names = UserRepo::role_names(&state.pool, user.id).await?;
    let access_token = generate_access_token(user.id, &role_names, &state.config.jwt)
        .map_err(|e| AppError::InternalError(format!("Token generation error: {e}")))?;

    tracing::info!(user_id = user.id, roles = ?role_names, "User logged in");

    Ok(Json(DataResponse {
        data: LoginResponse {
            access_token,
            token_type: "Bearer",
            expires_in: state.config.jwt.access_token_expiry_mins * 60,
            user: user_info(user, role_names),
        },
    }))
}

/// GET /api/v1/auth/me
///
/// The caller's profile with roles re-read from the database.
pub async fn me(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<UserInfo>>> {
    let user = UserRepo::find_by_id(&state.pool, auth.user_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "user",
            id: auth.user_id,
        })?;
    let role_names = UserRepo::role_names(&state.pool, user.id).await?;

    Ok(Json(DataResponse {
        data: user_info(user, role_names),
    }))
}
