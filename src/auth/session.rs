//! Browser sessions
//!
//! Session rows live in the `session` table and are addressed by a random id
//! carried in an HttpOnly cookie. They hold the OAuth login state, the cached
//! profile of the signed-in user and pending flash messages.
//!
//! A row is only written once a session has something to hold, and rows idle
//! for longer than `SESSION_TTL_SECONDS` are neither loaded nor kept.

use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};
use sqlx::{FromRow, SqliteConnection};
use std::convert::Infallible;
use tracing::{debug, info};

use crate::common::generate_session_id;

pub const SESSION_COOKIE: &str = "catalog_session";

/// Idle lifetime of a browser session (7 days)
pub const SESSION_TTL_SECONDS: u64 = 604_800;

#[derive(Debug, Clone, Default, FromRow)]
pub struct BrowserSession {
    pub session_id: String,
    pub state: Option<String>,
    pub provider: Option<String>,
    pub access_token: Option<String>,
    pub provider_subject: Option<String>,
    pub user_id: Option<i64>,
    pub user_name: Option<String>,
    pub user_email: Option<String>,
    pub user_picture: Option<String>,
    /// JSON array of pending flash messages
    pub flashes: String,
}

impl BrowserSession {
    fn new(session_id: String) -> Self {
        Self {
            session_id,
            flashes: "[]".to_string(),
            ..Default::default()
        }
    }

    /// Nothing worth storing: no login state, identity or pending flash
    pub fn is_empty(&self) -> bool {
        self.state.is_none()
            && self.provider.is_none()
            && self.access_token.is_none()
            && self.user_id.is_none()
            && self.pending_flashes().is_empty()
    }

    pub fn is_logged_in(&self) -> bool {
        self.user_id.is_some() && self.user_name.is_some()
    }

    pub fn flash(&mut self, message: impl Into<String>) {
        let mut pending = self.pending_flashes();
        pending.push(message.into());
        self.flashes = serde_json::to_string(&pending).unwrap_or_else(|_| "[]".to_string());
    }

    /// Returns pending flashes and clears them
    pub fn take_flashes(&mut self) -> Vec<String> {
        let pending = self.pending_flashes();
        self.flashes = "[]".to_string();
        pending
    }

    fn pending_flashes(&self) -> Vec<String> {
        serde_json::from_str(&self.flashes).unwrap_or_default()
    }

    /// Drop the provider credentials but keep the local identity
    pub fn clear_provider_credentials(&mut self) {
        self.access_token = None;
        self.provider_subject = None;
    }

    /// Forget everything that identifies the signed-in user
    pub fn clear_identity(&mut self) {
        self.clear_provider_credentials();
        self.state = None;
        self.provider = None;
        self.user_id = None;
        self.user_name = None;
        self.user_email = None;
        self.user_picture = None;
    }
}

fn idle_cutoff() -> String {
    format!("-{} seconds", SESSION_TTL_SECONDS)
}

/// Load a live session. Sessions idle past the TTL are treated as unknown.
pub async fn load(
    conn: &mut SqliteConnection,
    session_id: &str,
) -> Result<Option<BrowserSession>, sqlx::Error> {
    sqlx::query_as::<_, BrowserSession>(
        r#"
        SELECT session_id, state, provider, access_token, provider_subject,
               user_id, user_name, user_email, user_picture, flashes
        FROM session
        WHERE session_id = ? AND updated_at > datetime('now', ?)
        "#,
    )
    .bind(session_id)
    .bind(idle_cutoff())
    .fetch_optional(&mut *conn)
    .await
}

/// Load the session named by the cookie, or start a fresh one.
///
/// A fresh session is not stored until `save` is called.
pub async fn load_or_start(
    conn: &mut SqliteConnection,
    cookie: Option<&str>,
) -> Result<BrowserSession, sqlx::Error> {
    if let Some(session_id) = cookie {
        if let Some(existing) = load(conn, session_id).await? {
            return Ok(existing);
        }
        debug!("Session cookie does not match a live session, starting a new one");
    }

    Ok(BrowserSession::new(generate_session_id()))
}

/// Insert or update the session row
pub async fn save(conn: &mut SqliteConnection, session: &BrowserSession) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO session (
            session_id, state, provider, access_token, provider_subject,
            user_id, user_name, user_email, user_picture, flashes, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, datetime('now'))
        ON CONFLICT(session_id) DO UPDATE SET
            state = excluded.state,
            provider = excluded.provider,
            access_token = excluded.access_token,
            provider_subject = excluded.provider_subject,
            user_id = excluded.user_id,
            user_name = excluded.user_name,
            user_email = excluded.user_email,
            user_picture = excluded.user_picture,
            flashes = excluded.flashes,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(&session.session_id)
    .bind(&session.state)
    .bind(&session.provider)
    .bind(&session.access_token)
    .bind(&session.provider_subject)
    .bind(session.user_id)
    .bind(&session.user_name)
    .bind(&session.user_email)
    .bind(&session.user_picture)
    .bind(&session.flashes)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub async fn delete(conn: &mut SqliteConnection, session_id: &str) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM session WHERE session_id = ?")
        .bind(session_id)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

/// Remove sessions idle past the TTL; returns how many were removed
pub async fn purge_expired(conn: &mut SqliteConnection) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM session WHERE updated_at <= datetime('now', ?)")
        .bind(idle_cutoff())
        .execute(&mut *conn)
        .await?;

    let purged = result.rows_affected();
    if purged > 0 {
        info!(purged = purged, "Purged expired browser sessions");
    }
    Ok(purged)
}

/// Move the session to a fresh id and retire the old row and login nonce.
/// Called whenever the session gains an identity.
pub async fn rotate(conn: &mut SqliteConnection, session: &mut BrowserSession) -> Result<(), sqlx::Error> {
    delete(conn, &session.session_id).await?;
    session.session_id = generate_session_id();
    session.state = None;
    Ok(())
}

pub fn parse_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    for value in headers.get_all(header::COOKIE) {
        let Ok(s) = value.to_str() else { continue };
        for part in s.split(';') {
            if let Some((k, v)) = part.trim().split_once('=') {
                if k == name && !v.is_empty() {
                    return Some(v.to_string());
                }
            }
        }
    }
    None
}

/// `Set-Cookie` value for the session
pub fn session_cookie(session_id: &str, secure: bool) -> String {
    cookie_with_max_age(session_id, SESSION_TTL_SECONDS, secure)
}

/// `Set-Cookie` value telling the browser to drop its session cookie
pub fn expired_session_cookie(secure: bool) -> String {
    cookie_with_max_age("", 0, secure)
}

fn cookie_with_max_age(value: &str, max_age: u64, secure: bool) -> String {
    let mut cookie = format!(
        "{}={}; Max-Age={}; HttpOnly; SameSite=Lax; Path=/",
        SESSION_COOKIE, value, max_age
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// The session id presented by the browser, if any
#[derive(Debug, Clone)]
pub struct SessionCookie(pub Option<String>);

#[async_trait]
impl<S> FromRequestParts<S> for SessionCookie
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(SessionCookie(parse_cookie(&parts.headers, SESSION_COOKIE)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::migrations::test_support::setup_test_db;
    use axum::http::HeaderValue;

    #[test]
    fn test_parse_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; catalog_session=ABC123; other=1"),
        );

        assert_eq!(parse_cookie(&headers, SESSION_COOKIE), Some("ABC123".to_string()));
        assert_eq!(parse_cookie(&headers, "missing"), None);
    }

    #[test]
    fn test_session_cookie_attributes() {
        let cookie = session_cookie("XYZ", true);
        assert!(cookie.starts_with("catalog_session=XYZ;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Max-Age=604800"));
        assert!(cookie.ends_with("; Secure"));
        assert!(!session_cookie("XYZ", false).contains("Secure"));

        assert!(expired_session_cookie(false).starts_with("catalog_session=; Max-Age=0;"));
    }

    #[test]
    fn test_flashes_are_taken_once() {
        let mut session = BrowserSession::new("S".to_string());
        session.flash("New Category created!");
        session.flash("Item edited");

        assert_eq!(session.take_flashes(), vec!["New Category created!", "Item edited"]);
        assert!(session.take_flashes().is_empty());
    }

    #[tokio::test]
    async fn test_saved_session_round_trips() {
        let pool = setup_test_db().await;
        let mut conn = pool.acquire().await.unwrap();

        let mut session = load_or_start(&mut conn, None).await.unwrap();
        session.state = Some("NONCE".to_string());
        session.flash("hello");
        save(&mut conn, &session).await.unwrap();

        let again = load_or_start(&mut conn, Some(&session.session_id))
            .await
            .unwrap();
        assert_eq!(again.session_id, session.session_id);
        assert_eq!(again.state.as_deref(), Some("NONCE"));
        assert_eq!(again.flashes, r#"["hello"]"#);

        // saving again updates in place
        session.take_flashes();
        save(&mut conn, &session).await.unwrap();
        assert_eq!(session_rows(&mut conn).await, 1);
    }

    #[tokio::test]
    async fn test_starting_a_session_writes_nothing() {
        let pool = setup_test_db().await;
        let mut conn = pool.acquire().await.unwrap();

        for _ in 0..20 {
            let session = load_or_start(&mut conn, None).await.unwrap();
            assert!(session.is_empty());
        }
        assert_eq!(session_rows(&mut conn).await, 0);
    }

    #[tokio::test]
    async fn test_unknown_cookie_starts_fresh_session() {
        let pool = setup_test_db().await;
        let mut conn = pool.acquire().await.unwrap();

        let session = load_or_start(&mut conn, Some("forged-id")).await.unwrap();
        assert_ne!(session.session_id, "forged-id");
        assert!(!session.is_logged_in());
    }

    #[tokio::test]
    async fn test_idle_sessions_expire_and_are_purged() {
        let pool = setup_test_db().await;
        let mut conn = pool.acquire().await.unwrap();

        let mut stale = load_or_start(&mut conn, None).await.unwrap();
        stale.user_id = Some(1);
        stale.user_name = Some("Ann".to_string());
        save(&mut conn, &stale).await.unwrap();

        let mut live = load_or_start(&mut conn, None).await.unwrap();
        live.flash("still here");
        save(&mut conn, &live).await.unwrap();

        sqlx::query("UPDATE session SET updated_at = datetime('now', '-8 days') WHERE session_id = ?")
            .bind(&stale.session_id)
            .execute(&mut *conn)
            .await
            .unwrap();

        assert!(load(&mut conn, &stale.session_id).await.unwrap().is_none());
        let fresh = load_or_start(&mut conn, Some(&stale.session_id)).await.unwrap();
        assert_ne!(fresh.session_id, stale.session_id);
        assert!(!fresh.is_logged_in());

        assert_eq!(purge_expired(&mut conn).await.unwrap(), 1);
        assert_eq!(session_rows(&mut conn).await, 1);
        assert!(load(&mut conn, &live.session_id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_rotate_moves_session_to_new_id() {
        let pool = setup_test_db().await;
        let mut conn = pool.acquire().await.unwrap();

        let mut session = load_or_start(&mut conn, None).await.unwrap();
        session.state = Some("NONCE".to_string());
        save(&mut conn, &session).await.unwrap();
        let old_id = session.session_id.clone();

        rotate(&mut conn, &mut session).await.unwrap();
        session.user_id = Some(1);
        session.user_name = Some("Ann".to_string());
        save(&mut conn, &session).await.unwrap();

        assert_ne!(session.session_id, old_id);
        assert!(session.state.is_none());
        assert!(load(&mut conn, &old_id).await.unwrap().is_none());
        assert!(load(&mut conn, &session.session_id)
            .await
            .unwrap()
            .unwrap()
            .is_logged_in());
    }

    #[test]
    fn test_clear_identity() {
        let mut session = BrowserSession::new("S".to_string());
        session.user_id = Some(1);
        session.user_name = Some("Ann".to_string());
        session.access_token = Some("ya29".to_string());
        session.provider = Some("google".to_string());
        session.state = Some("NONCE".to_string());

        session.clear_identity();

        assert!(!session.is_logged_in());
        assert!(session.access_token.is_none());
        assert!(session.provider.is_none());
        assert!(session.state.is_none());
        assert!(session.is_empty());
    }

    async fn session_rows(conn: &mut SqliteConnection) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM session")
            .fetch_one(&mut *conn)
            .await
            .unwrap()
    }
}
