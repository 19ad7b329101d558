// src/main.rs
use axum::{extract::Extension, middleware, Router};
use dotenv::dotenv;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::path::PathBuf;
use std::time::Duration;
use std::{net::SocketAddr, str::FromStr, sync::Arc};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

// ============================================================================
// MODULE IMPORTS
// ============================================================================

mod auth;
mod catalog;
mod common;
mod logging_middleware;
mod oauth;

// ============================================================================
// COMMON IMPORTS
// ============================================================================

use auth::tokens::TokenService;
use common::{AppConfig, AppState};
use oauth::provider::{GoogleProvider, IdentityProvider};

// ============================================================================
// MAIN APPLICATION ENTRY POINT
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    // ========================================================================
    // ENVIRONMENT CONFIGURATION
    // ========================================================================

    let config = AppConfig::from_env()?;

    // ========================================================================
    // DATABASE SETUP
    // ========================================================================

    if let Some(path_part) = config.database_url.strip_prefix("sqlite://") {
        let path_without_params = path_part.split('?').next().unwrap_or("");
        if !path_without_params.is_empty() && !path_without_params.starts_with(':') {
            let db_path = PathBuf::from(path_without_params);
            if let Some(parent) = db_path.parent() {
                if !parent.as_os_str().is_empty() {
                    tokio::fs::create_dir_all(parent).await?;
                }
            }
        }
    }

    let connect_options = SqliteConnectOptions::from_str(&config.database_url)?
        .create_if_missing(true)
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect_with(connect_options)
        .await?;

    common::migrations::run_migrations(&pool, config.reset_db).await?;

    {
        let mut conn = pool.acquire().await?;
        auth::session::purge_expired(&mut conn).await?;
    }

    // ========================================================================
    // SERVICE INITIALIZATION
    // ========================================================================

    let tokens = Arc::new(TokenService::from_config(
        config.token_secret.as_deref(),
        config.token_ttl_seconds,
    ));
    info!(ttl_seconds = config.token_ttl_seconds, "TokenService initialized");

    let timeout = Duration::from_secs(config.provider_timeout_secs);
    let google: Option<Arc<dyn IdentityProvider>> = match config.google.clone() {
        Some(google_config) => {
            let provider: Arc<dyn IdentityProvider> =
                Arc::new(GoogleProvider::new(google_config, timeout)?);
            info!(timeout_secs = config.provider_timeout_secs, "GoogleProvider initialized");
            Some(provider)
        }
        None => None,
    };

    // ========================================================================
    // APPLICATION STATE
    // ========================================================================

    let shared = Arc::new(AppState {
        db: pool,
        tokens,
        google,
        google_client_id: config.google.as_ref().map(|g| g.client_id.clone()),
        session_cookie_secure: config.session_cookie_secure,
    });

    // ========================================================================
    // ROUTER COMPOSITION
    // ========================================================================

    let app = Router::new()
        // ====================================================================
        // AUTHENTICATION ROUTES (registration, API tokens)
        // ====================================================================
        .merge(auth::auth_routes())
        // ====================================================================
        // LOGIN ROUTES (login page, provider connect/disconnect)
        // ====================================================================
        .merge(oauth::oauth_routes())
        // ====================================================================
        // CATALOG ROUTES (HTML pages and JSON API)
        // ====================================================================
        .merge(catalog::catalog_routes())
        // ====================================================================
        // MIDDLEWARE AND LAYERS
        // ====================================================================
        // Add request/response body logging in debug mode
        .layer(middleware::from_fn(logging_middleware::log_request_response))
        .layer(Extension(shared))
        .layer({
            let origins: Vec<axum::http::HeaderValue> = config
                .cors_origins
                .iter()
                .filter_map(|origin| origin.parse().ok())
                .collect();

            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods([
                    axum::http::Method::GET,
                    axum::http::Method::POST,
                    axum::http::Method::PUT,
                    axum::http::Method::DELETE,
                    axum::http::Method::OPTIONS,
                ])
                .allow_headers([
                    axum::http::header::CONTENT_TYPE,
                    axum::http::header::AUTHORIZATION,
                    axum::http::HeaderName::from_static("x-requested-with"),
                ])
                .allow_credentials(true)
        })
        .layer(TraceLayer::new_for_http());

    // ========================================================================
    // SERVER STARTUP
    // ========================================================================

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}
