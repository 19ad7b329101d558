//! Login page and provider login/logout endpoints

use axum::{
    extract::{Extension, Path, Query},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::bridge::{ConnectOutcome, ConnectRequest, OAuthBridge, RevokeOutcome};
use crate::auth::session::SessionCookie;
use crate::catalog::handlers::page::{DetachedPage, Page, PageOutcome};
use crate::catalog::views;
use crate::common::{generate_state_token, ApiError, AppState};

const CSRF_HEADER: &str = "x-requested-with";
const GOOGLE: &str = "google";

#[derive(Debug, Deserialize)]
pub struct ConnectQuery {
    pub state: Option<String>,
}

enum ProviderLookup<'a> {
    Ready(OAuthBridge<'a>),
    NotConfigured,
    Unknown,
}

fn lookup_bridge<'a>(state: &'a AppState, provider: &str) -> ProviderLookup<'a> {
    if provider != GOOGLE {
        return ProviderLookup::Unknown;
    }
    match (state.google.as_deref(), state.google_client_id.as_deref()) {
        (Some(google), Some(client_id)) => {
            ProviderLookup::Ready(OAuthBridge::new(google, client_id, &state.tokens))
        }
        _ => ProviderLookup::NotConfigured,
    }
}

fn not_configured(provider: &str) -> ApiError {
    warn!(provider = %provider, "OAuth provider is known but no client is configured");
    ApiError::ProviderUnavailable(format!("{} sign-in is not configured", provider))
}

fn unrecognized_provider(provider: &str) -> Response {
    info!(provider = %provider, "Login attempted with unknown provider");
    (StatusCode::OK, "Unrecognized OAuth provider").into_response()
}

/// GET /login and /catalog/login
/// Renders the login page with a fresh anti-forgery state token
pub async fn show_login(
    Extension(state): Extension<Arc<AppState>>,
    SessionCookie(cookie): SessionCookie,
) -> Result<Response, ApiError> {
    let mut page = Page::open(&state, cookie).await?;

    let nonce = generate_state_token();
    page.session.state = Some(nonce.clone());

    let chrome = page.chrome();
    let html = views::login_page(&chrome, &nonce, state.google_client_id.as_deref());

    page.finish(Ok(PageOutcome::Html(html))).await
}

/// POST /oauth/:provider?state=...
/// Body is the one-time authorization code from the provider's code client
pub async fn oauth_login(
    Extension(state): Extension<Arc<AppState>>,
    SessionCookie(cookie): SessionCookie,
    Path(provider): Path<String>,
    Query(query): Query<ConnectQuery>,
    headers: HeaderMap,
    body: String,
) -> Result<Response, ApiError> {
    let bridge = match lookup_bridge(&state, &provider) {
        ProviderLookup::Ready(bridge) => bridge,
        ProviderLookup::NotConfigured => return Err(not_configured(&provider)),
        ProviderLookup::Unknown => return Ok(unrecognized_provider(&provider)),
    };

    let held = DetachedPage::load(&state, cookie).await?;

    let request = ConnectRequest {
        csrf_marker_present: headers.contains_key(CSRF_HEADER),
        state_param: query.state.as_deref(),
        code: body.trim(),
    };

    let verified = bridge.connect(&held.session, request).await?;

    let mut page = held.reattach(&state).await?;
    let outcome = match verified {
        ConnectOutcome::Verified(login) => {
            let (conn, session) = page.parts();
            bridge.sign_in(conn, session, login).await.map(|grant| {
                PageOutcome::Html(views::welcome_fragment(
                    &grant.name,
                    grant.picture.as_deref(),
                    &grant.token,
                ))
            })
        }
        ConnectOutcome::AlreadyConnected => Ok(PageOutcome::Message(
            StatusCode::OK,
            "Current user is already connected.".to_string(),
        )),
    };

    page.finish(outcome).await
}

/// GET /oauth/disconnect
/// Revokes the provider token (best effort) and logs the browser out
pub async fn disconnect(
    Extension(state): Extension<Arc<AppState>>,
    SessionCookie(cookie): SessionCookie,
) -> Result<Response, ApiError> {
    let mut held = DetachedPage::load(&state, cookie).await?;

    if held.session.provider.is_none() && !held.session.is_logged_in() {
        let mut page = held.reattach(&state).await?;
        let outcome = page.bounce("You were not logged in", "/catalog");
        return page.finish(Ok(outcome)).await;
    }

    let user_id = held.session.user_id;
    let provider = held.session.provider.clone().unwrap_or_default();

    match lookup_bridge(&state, &provider) {
        ProviderLookup::Ready(bridge) => {
            let revoked = bridge.disconnect(&mut held.session).await;
            debug!(outcome = ?revoked, "Provider token revocation during logout");
        }
        ProviderLookup::NotConfigured | ProviderLookup::Unknown => held.session.clear_identity(),
    }

    info!(user_id = ?user_id, "User logged out");

    let mut page = held.reattach(&state).await?;
    let outcome = page.bounce("You have successfully logged out", "/catalog");
    page.finish(Ok(outcome)).await
}

/// GET /oauth/gdisconnect
/// Revokes the Google access token held by the session
pub async fn gdisconnect(
    Extension(state): Extension<Arc<AppState>>,
    SessionCookie(cookie): SessionCookie,
) -> Result<Response, ApiError> {
    let mut held = DetachedPage::load(&state, cookie).await?;

    if held.session.access_token.is_none() {
        return Err(ApiError::Unauthorized("Current user not connected".to_string()));
    }

    let bridge = match lookup_bridge(&state, GOOGLE) {
        ProviderLookup::Ready(bridge) => bridge,
        _ => return Err(not_configured(GOOGLE)),
    };

    let outcome = match bridge.revoke(&mut held.session).await? {
        RevokeOutcome::Revoked => {
            PageOutcome::Message(StatusCode::OK, "Successfully disconnected".to_string())
        }
        RevokeOutcome::Failed => {
            PageOutcome::Message(StatusCode::BAD_REQUEST, "Failed to revoke token".to_string())
        }
        RevokeOutcome::NotConnected => {
            return Err(ApiError::Unauthorized("Current user not connected".to_string()));
        }
    };

    held.reattach(&state).await?.finish(Ok(outcome)).await
}
