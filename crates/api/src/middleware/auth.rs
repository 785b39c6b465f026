//! JWT-based authentication extractor for Axum handlers.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use naoty_core::access::Actor;
use naoty_core::error::CoreError;
use naoty_core::roles::{parse_roles, Role};
use naoty_core::types::DbId;

use crate::auth::jwt::validate_token;
use crate::error::AppError;
use crate::state::AppState;

/// Authenticated user extracted from a JWT Bearer token in the `Authorization` header.
///
/// ```ignore
/// async fn my_handler(auth: AuthUser) -> AppResult<Json<()>> {
///     tracing::info!(user_id = auth.user_id, "handling request");
///     Ok(Json(()))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// The user's internal database id (from `claims.sub`).
    pub user_id: DbId,
    /// Known roles from the token. Unknown names are dropped.
    pub roles: Vec<Role>,
}

impl AuthUser {
    /// The domain view of this user, passed to every workflow function.
    pub fn actor(&self) -> Actor {
        Actor::new(self.user_id, self.roles.clone())
    }

    /// Fail with `PermissionDenied` unless one of the user's roles grants `permission`.
    pub fn require(&self, permission: &str) -> Result<(), AppError> {
        if naoty_core::roles::has_permission(&self.roles, permission) {
            return Ok(());
        }
        Err(AppError::Core(CoreError::denied(
            format!("Missing permission {permission}"),
            None,
        )))
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                AppError::Core(CoreError::Unauthorized(
                    "Missing Authorization header".into(),
                ))
            })?;

        let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized(
                "Invalid Authorization format. Expected: Bearer <token>".into(),
            ))
        })?;

        let claims = validate_token(token, &state.config.jwt).map_err(|_| {
            AppError::Core(CoreError::Unauthorized("Invalid or expired token".into()))
        })?;

        Ok(AuthUser {
            user_id: claims.sub,
            roles: parse_roles(&claims.roles),
        })
    }
}
