//! Login and provider routes

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers;

/// Creates the login/OAuth router
///
/// # Routes
/// - `GET /login`, `GET /catalog/login` - Login page with a fresh state token
/// - `POST /oauth/:provider` - Exchange a one-time authorization code
/// - `GET /oauth/disconnect` - Log out, revoking the provider token
/// - `GET /oauth/gdisconnect` - Revoke the Google token only
pub fn oauth_routes() -> Router {
    Router::new()
        .route("/login", get(handlers::show_login))
        .route("/catalog/login", get(handlers::show_login))
        .route("/oauth/disconnect", get(handlers::disconnect))
        .route("/oauth/gdisconnect", get(handlers::gdisconnect))
        .route("/oauth/:provider", post(handlers::oauth_login))
}
