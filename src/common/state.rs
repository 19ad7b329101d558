// Application state shared across all modules

use sqlx::SqlitePool;
use std::sync::Arc;

use crate::auth::tokens::TokenService;
use crate::oauth::provider::IdentityProvider;

/// Database pool, services and configuration handed to every request
///
/// Nothing in here is mutated after startup; all per-request state lives in
/// the database.
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub tokens: Arc<TokenService>,
    /// `None` when no Google client is configured
    pub google: Option<Arc<dyn IdentityProvider>>,
    pub google_client_id: Option<String>,
    pub session_cookie_secure: bool,
}
