//! Authentication handlers

use axum::extract::{Extension, Json};
use std::sync::Arc;
use tracing::{error, info, warn};

use super::credentials::hash_password;
use super::extractors::Principal;
use super::models::{NewUser, RegisterUserRequest, RegisteredUser, TokenResponse};
use crate::catalog::models::non_blank;
use crate::catalog::repository;
use crate::catalog::validators::RegistrationValidator;
use crate::common::{safe_email_log, ApiError, AppState, Validator};

const EMAIL_TAKEN: &str = "user email already exists";

/// POST /api/users
/// Registers a password account
///
/// # Request Body
/// ```json
/// { "name": "Ann", "email": "ann@example.com", "password": "..." }
/// ```
///
/// # Response
/// ```json
/// { "username": "Ann", "email": "ann@example.com" }
/// ```
pub async fn new_user(
    Extension(state): Extension<Arc<AppState>>,
    payload: Option<Json<RegisterUserRequest>>,
) -> Result<Json<RegisteredUser>, ApiError> {
    let request = payload.map(|Json(r)| r).unwrap_or_default();

    let validation = RegistrationValidator.validate(&request);
    if !validation.is_valid {
        warn!(errors = ?validation.errors, "User registration validation failed");
        return Err(ApiError::from(validation));
    }

    let (Some(name), Some(email), Some(password)) = (
        non_blank(request.name),
        non_blank(request.email),
        non_blank(request.password),
    ) else {
        warn!("User registration refused: missing arguments");
        return Err(ApiError::BadRequest(
            "Missing name, email, or password arguments".to_string(),
        ));
    };

    let mut tx = state.db.begin().await?;

    if repository::find_user_by_email(&mut tx, &email).await?.is_some() {
        info!(email = %safe_email_log(&email), "Registration refused: email already exists");
        return Err(ApiError::Restricted(EMAIL_TAKEN.to_string()));
    }

    let password_hash = hash_password(&password).map_err(|e| {
        error!(error = %e, "Password hashing failed during registration");
        ApiError::InternalServer("password hashing failed".to_string())
    })?;

    let new_user = NewUser {
        name,
        email,
        picture: None,
        password_hash: Some(password_hash),
    };

    let user = match repository::create_user(&mut tx, &new_user).await {
        Ok(user) => user,
        // lost a race with a concurrent registration
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            return Err(ApiError::Restricted(EMAIL_TAKEN.to_string()));
        }
        Err(e) => return Err(ApiError::DatabaseError(e)),
    };

    tx.commit().await?;

    info!(
        user_id = user.user_id,
        email = %safe_email_log(&user.user_email),
        "Registered new user"
    );

    Ok(Json(RegisteredUser {
        username: user.user_name,
        email: user.user_email,
    }))
}

/// GET /api/token
/// Issues a bearer token for the authenticated caller
pub async fn get_auth_token(
    Extension(state): Extension<Arc<AppState>>,
    principal: Principal,
) -> Result<Json<TokenResponse>, ApiError> {
    let token = state.tokens.issue(principal.id, None).map_err(|e| {
        error!(error = %e, user_id = principal.id, "Token signing failed");
        ApiError::InternalServer("token error".to_string())
    })?;

    info!(
        user_id = principal.id,
        method = ?principal.method,
        ttl_seconds = state.tokens.default_ttl(),
        "Issued API token"
    );

    Ok(Json(TokenResponse { token }))
}
