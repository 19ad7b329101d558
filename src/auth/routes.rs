//! Authentication routes

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers;

/// Creates and returns the authentication router
///
/// # Routes
/// - `POST /api/users` - Register a password account
/// - `GET /api/token` - Exchange Basic/bearer/session credentials for a fresh token
pub fn auth_routes() -> Router {
    Router::new()
        .route("/api/users", post(handlers::new_user))
        .route("/api/token", get(handlers::get_auth_token))
}
