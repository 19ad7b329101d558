//! Authentication data models

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// JWT claims structure
#[derive(Serialize, Deserialize, Debug)]
pub struct Claims {
    pub sub: String,
    pub iat: usize,
    pub exp: usize,
}

/// User database model
///
/// Serializes to the public `{user_id, user_name, user_email}` shape; the
/// password hash and avatar never leave the server through the API.
#[derive(FromRow, Serialize, Debug, Clone)]
pub struct User {
    pub user_id: i64,
    pub user_name: String,
    pub user_email: String,
    #[serde(skip_serializing)]
    pub user_picture: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
}

/// Row to insert for a new user
#[derive(Debug)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub picture: Option<String>,
    pub password_hash: Option<String>,
}

/// POST /api/users body
#[derive(Deserialize, Debug, Default)]
pub struct RegisterUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

/// POST /api/users success body
#[derive(Serialize, Debug)]
pub struct RegisteredUser {
    pub username: String,
    pub email: String,
}

/// GET /api/token body
#[derive(Serialize, Debug)]
pub struct TokenResponse {
    pub token: String,
}
