//! Credential parsing, resolution and Axum extractors

use async_trait::async_trait;
use axum::{
    extract::{Extension, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use sqlx::SqliteConnection;
use std::sync::Arc;
use tracing::{debug, warn};

use super::credentials::verify_password;
use super::models::User;
use super::session::{self, parse_cookie, BrowserSession, SESSION_COOKIE};
use super::tokens::{TokenError, TokenService};
use crate::catalog::repository;
use crate::common::{safe_email_log, ApiError, AppState};

/// A credential presented with a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    Bearer(String),
    Basic { username: String, password: String },
    Session(String),
}

impl Credential {
    /// Picks the strongest credential present: bearer, then Basic, then the session cookie.
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let authorization = headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .map(str::trim);

        if let Some(value) = authorization {
            if let Some(token) = strip_scheme(value, "Bearer") {
                return Some(Credential::Bearer(token.to_string()));
            }
            if let Some(encoded) = strip_scheme(value, "Basic") {
                if let Some(credential) = decode_basic(encoded) {
                    return Some(credential);
                }
                debug!("Ignoring malformed Basic authorization header");
            }
        }

        parse_cookie(headers, SESSION_COOKIE).map(Credential::Session)
    }
}

fn strip_scheme<'a>(value: &'a str, scheme: &str) -> Option<&'a str> {
    let (given, rest) = value.split_once(' ')?;
    given
        .eq_ignore_ascii_case(scheme)
        .then(|| rest.trim())
        .filter(|rest| !rest.is_empty())
}

fn decode_basic(encoded: &str) -> Option<Credential> {
    let bytes = STANDARD.decode(encoded).ok()?;
    let decoded = String::from_utf8(bytes).ok()?;
    let (username, password) = decoded.split_once(':')?;
    Some(Credential::Basic {
        username: username.to_string(),
        password: password.to_string(),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMethod {
    Token,
    Password,
    Session,
}

/// The authenticated identity attached to a request
#[derive(Debug, Clone)]
pub struct Principal {
    pub id: i64,
    pub method: AuthMethod,
}

impl Principal {
    fn from_user(user: User, method: AuthMethod) -> Self {
        Self {
            id: user.user_id,
            method,
        }
    }
}

/// Resolve a credential to a principal, or reject it.
pub async fn resolve(
    conn: &mut SqliteConnection,
    tokens: &TokenService,
    credential: &Credential,
) -> Result<Principal, ApiError> {
    match credential {
        Credential::Bearer(token) => resolve_token(conn, tokens, token).await,
        Credential::Basic { username, password } => {
            // HTTP Basic clients may send a token as the username
            if let Ok(user_id) = tokens.verify(username) {
                return load_token_user(conn, user_id).await;
            }
            resolve_password(conn, username, password).await
        }
        Credential::Session(session_id) => {
            let session = session::load(conn, session_id)
                .await?
                .ok_or_else(|| ApiError::Unauthorized("unknown session".into()))?;
            principal_for_session(conn, &session)
                .await?
                .ok_or_else(|| ApiError::Unauthorized("not logged in".into()))
        }
    }
}

async fn resolve_token(
    conn: &mut SqliteConnection,
    tokens: &TokenService,
    token: &str,
) -> Result<Principal, ApiError> {
    match tokens.verify(token) {
        Ok(user_id) => load_token_user(conn, user_id).await,
        Err(TokenError::Expired) => {
            warn!("Authentication failed: token expired");
            Err(ApiError::Unauthorized("token expired".into()))
        }
        Err(e) => {
            warn!(error = %e, "Authentication failed: token rejected");
            Err(ApiError::Unauthorized("invalid token".into()))
        }
    }
}

async fn load_token_user(conn: &mut SqliteConnection, user_id: i64) -> Result<Principal, ApiError> {
    match repository::find_user(conn, user_id).await? {
        Some(user) => {
            debug!(user_id = user.user_id, "Token authentication successful");
            Ok(Principal::from_user(user, AuthMethod::Token))
        }
        None => {
            warn!(user_id = user_id, "Authentication failed: token user not found");
            Err(ApiError::Unauthorized("user not found".into()))
        }
    }
}

async fn resolve_password(
    conn: &mut SqliteConnection,
    username: &str,
    password: &str,
) -> Result<Principal, ApiError> {
    let user = match repository::find_user_by_email(conn, username).await? {
        Some(user) => Some(user),
        None => repository::find_user_by_name(conn, username).await?,
    };

    match user {
        Some(user) if verify_password(password, user.password_hash.as_deref()) => {
            debug!(
                user_id = user.user_id,
                email = %safe_email_log(&user.user_email),
                "Password authentication successful"
            );
            Ok(Principal::from_user(user, AuthMethod::Password))
        }
        Some(user) => {
            warn!(user_id = user.user_id, "Authentication failed: bad password");
            Err(ApiError::Unauthorized("invalid credentials".into()))
        }
        None => {
            warn!("Authentication failed: unknown username");
            Err(ApiError::Unauthorized("invalid credentials".into()))
        }
    }
}

/// The signed-in user of a browser session, if any.
pub async fn principal_for_session(
    conn: &mut SqliteConnection,
    session: &BrowserSession,
) -> Result<Option<Principal>, ApiError> {
    if !session.is_logged_in() {
        return Ok(None);
    }
    let Some(user_id) = session.user_id else {
        return Ok(None);
    };

    let user = repository::find_user(conn, user_id).await?;
    Ok(user.map(|u| Principal::from_user(u, AuthMethod::Session)))
}

async fn principal_from_parts<S: Send + Sync>(
    parts: &mut Parts,
    state: &S,
) -> Result<Principal, ApiError> {
    let Extension(app_state): Extension<Arc<AppState>> =
        Extension::from_request_parts(parts, state)
            .await
            .map_err(|_| ApiError::InternalServer("missing app state".to_string()))?;

    let credential = Credential::from_headers(&parts.headers).ok_or_else(|| {
        warn!("Authentication failed: no credentials presented");
        ApiError::Unauthorized("missing auth".into())
    })?;

    let mut conn = app_state.db.acquire().await?;
    resolve(&mut conn, &app_state.tokens, &credential).await
}

#[async_trait]
impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        principal_from_parts(parts, state).await
    }
}
