//! Tests for the OAuth module
//!
//! The provider is replaced by an in-process fake so the whole connect flow
//! runs against an in-memory database, both through the bridge and through
//! the HTTP handlers.

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use axum::{
        extract::{Extension, Path, Query},
        http::{header, HeaderMap, HeaderValue, StatusCode},
        response::Response,
    };
    use sqlx::{SqliteConnection, SqlitePool};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use super::super::bridge::{
        ConnectOutcome, ConnectRequest, LoginGrant, OAuthBridge, RevokeOutcome,
    };
    use super::super::handlers::{self, ConnectQuery};
    use super::super::provider::{
        IdentityProvider, ProviderCredentials, ProviderError, ProviderProfile, TokenInfo,
    };
    use crate::auth::session::{self, BrowserSession, SessionCookie};
    use crate::auth::tokens::TokenService;
    use crate::catalog::handlers::pages;
    use crate::common::migrations::test_support::setup_test_db;
    use crate::common::{ApiError, AppState};

    const CLIENT_ID: &str = "catalog-web.apps.example";
    const NONCE: &str = "STATE0123456789";

    #[derive(Clone, Copy, PartialEq)]
    enum Exchange {
        Ok,
        Rejected,
        Timeout,
    }

    struct FakeProvider {
        exchange: Exchange,
        exchange_delay: Duration,
        id_token_subject: String,
        tokeninfo_user_id: String,
        tokeninfo_audience: String,
        tokeninfo_error: Option<String>,
        revoke_ok: bool,
        userinfo_calls: AtomicUsize,
    }

    impl FakeProvider {
        fn new() -> Self {
            Self {
                exchange: Exchange::Ok,
                exchange_delay: Duration::ZERO,
                id_token_subject: "g-1001".to_string(),
                tokeninfo_user_id: "g-1001".to_string(),
                tokeninfo_audience: CLIENT_ID.to_string(),
                tokeninfo_error: None,
                revoke_ok: true,
                userinfo_calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl IdentityProvider for FakeProvider {
        fn name(&self) -> &'static str {
            "google"
        }

        async fn exchange_code(&self, code: &str) -> Result<ProviderCredentials, ProviderError> {
            if !self.exchange_delay.is_zero() {
                tokio::time::sleep(self.exchange_delay).await;
            }
            match self.exchange {
                Exchange::Ok => Ok(ProviderCredentials {
                    access_token: format!("ya29.{}", code),
                    subject: self.id_token_subject.clone(),
                }),
                Exchange::Rejected => Err(ProviderError::Rejected("invalid_grant".to_string())),
                Exchange::Timeout => Err(ProviderError::Unavailable("timed out".to_string())),
            }
        }

        async fn token_info(&self, _access_token: &str) -> Result<TokenInfo, ProviderError> {
            Ok(TokenInfo {
                user_id: Some(self.tokeninfo_user_id.clone()),
                issued_to: Some(self.tokeninfo_audience.clone()),
                audience: Some(self.tokeninfo_audience.clone()),
                error: self.tokeninfo_error.clone(),
                error_description: None,
            })
        }

        async fn user_info(&self, _access_token: &str) -> Result<ProviderProfile, ProviderError> {
            self.userinfo_calls.fetch_add(1, Ordering::SeqCst);
            Ok(ProviderProfile {
                name: Some("Ann Example".to_string()),
                email: "ann@example.com".to_string(),
                picture: Some("https://example.com/ann.png".to_string()),
            })
        }

        async fn revoke(&self, _access_token: &str) -> Result<bool, ProviderError> {
            Ok(self.revoke_ok)
        }
    }

    fn tokens() -> TokenService {
        TokenService::new(b"oauth-test-secret", 600)
    }

    fn request(code: &str) -> ConnectRequest<'_> {
        ConnectRequest {
            csrf_marker_present: true,
            state_param: Some(NONCE),
            code,
        }
    }

    async fn session_with_nonce(conn: &mut SqliteConnection) -> BrowserSession {
        let mut session = session::load_or_start(conn, None).await.unwrap();
        session.state = Some(NONCE.to_string());
        session::save(conn, &session).await.unwrap();
        session
    }

    async fn user_count(conn: &mut SqliteConnection) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM user")
            .fetch_one(&mut *conn)
            .await
            .unwrap()
    }

    /// Run both login phases; `None` means the session was already connected
    async fn log_in(
        bridge: &OAuthBridge<'_>,
        conn: &mut SqliteConnection,
        session: &mut BrowserSession,
        request: ConnectRequest<'_>,
    ) -> Result<Option<LoginGrant>, ApiError> {
        match bridge.connect(session, request).await? {
            ConnectOutcome::Verified(login) => bridge.sign_in(conn, session, login).await.map(Some),
            ConnectOutcome::AlreadyConnected => Ok(None),
        }
    }

    fn rejected_with<T: std::fmt::Debug>(result: Result<T, ApiError>, expected: &str) {
        match result {
            Err(ApiError::ProviderRejected(msg)) => assert_eq!(msg, expected),
            other => panic!("expected ProviderRejected({}), got {:?}", expected, other),
        }
    }

    // ------------------------------------------------------------------
    // Bridge
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_connect_creates_user_and_logs_in() {
        let pool = setup_test_db().await;
        let mut conn = pool.acquire().await.unwrap();
        let provider = FakeProvider::new();
        let tokens = tokens();
        let bridge = OAuthBridge::new(&provider, CLIENT_ID, &tokens);
        let mut session = session_with_nonce(&mut conn).await;

        let grant = log_in(&bridge, &mut conn, &mut session, request("code-1"))
            .await
            .unwrap()
            .expect("expected a fresh connection");

        assert_eq!(grant.name, "Ann Example");
        let user_id = tokens.verify(&grant.token).unwrap();

        assert!(session.is_logged_in());
        assert_eq!(session.user_id, Some(user_id));
        assert_eq!(session.provider.as_deref(), Some("google"));
        assert_eq!(session.provider_subject.as_deref(), Some("g-1001"));
        assert_eq!(
            session.take_flashes(),
            vec!["you are now logged in as Ann Example"]
        );

        let user = crate::catalog::repository::find_user(&mut conn, user_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(user.user_email, "ann@example.com");
        assert!(user.password_hash.is_none());
    }

    #[tokio::test]
    async fn test_login_moves_session_to_new_id_and_spends_nonce() {
        let pool = setup_test_db().await;
        let mut conn = pool.acquire().await.unwrap();
        let provider = FakeProvider::new();
        let tokens = tokens();
        let bridge = OAuthBridge::new(&provider, CLIENT_ID, &tokens);
        let mut session = session_with_nonce(&mut conn).await;
        let pre_login_id = session.session_id.clone();

        log_in(&bridge, &mut conn, &mut session, request("code-1"))
            .await
            .unwrap();
        session::save(&mut conn, &session).await.unwrap();

        assert_ne!(session.session_id, pre_login_id);
        assert!(session.state.is_none());
        assert!(session::load(&mut conn, &pre_login_id).await.unwrap().is_none());

        // the spent nonce cannot be replayed
        let replay = log_in(&bridge, &mut conn, &mut session, request("code-2")).await;
        rejected_with(replay, "Invalid state parameter.");
    }

    #[tokio::test]
    async fn test_second_connect_is_idempotent() {
        let pool = setup_test_db().await;
        let mut conn = pool.acquire().await.unwrap();
        let provider = FakeProvider::new();
        let tokens = tokens();
        let bridge = OAuthBridge::new(&provider, CLIENT_ID, &tokens);
        let mut session = session_with_nonce(&mut conn).await;

        log_in(&bridge, &mut conn, &mut session, request("code-1"))
            .await
            .unwrap();
        let before = session.clone();

        // the login page is shown again and hands out a new nonce
        session.state = Some("STATE-SECOND".to_string());
        let again = log_in(
            &bridge,
            &mut conn,
            &mut session,
            ConnectRequest {
                state_param: Some("STATE-SECOND"),
                ..request("code-2")
            },
        )
        .await
        .unwrap();

        assert!(again.is_none());
        assert_eq!(user_count(&mut conn).await, 1);
        assert_eq!(provider.userinfo_calls.load(Ordering::SeqCst), 1);
        assert_eq!(session.access_token, before.access_token);
        assert_eq!(session.session_id, before.session_id);
    }

    #[tokio::test]
    async fn test_existing_account_is_reused() {
        let pool = setup_test_db().await;
        let mut conn = pool.acquire().await.unwrap();

        let existing = crate::catalog::repository::create_user(
            &mut conn,
            &crate::auth::models::NewUser {
                name: "Ann".to_string(),
                email: "ann@example.com".to_string(),
                picture: None,
                password_hash: None,
            },
        )
        .await
        .unwrap();

        let provider = FakeProvider::new();
        let tokens = tokens();
        let bridge = OAuthBridge::new(&provider, CLIENT_ID, &tokens);
        let mut session = session_with_nonce(&mut conn).await;

        let grant = log_in(&bridge, &mut conn, &mut session, request("code-1"))
            .await
            .unwrap()
            .expect("expected a fresh connection");

        assert_eq!(tokens.verify(&grant.token), Ok(existing.user_id));
        assert_eq!(session.user_id, Some(existing.user_id));
        assert_eq!(user_count(&mut conn).await, 1);
    }

    #[tokio::test]
    async fn test_missing_csrf_header_is_forbidden() {
        let pool = setup_test_db().await;
        let mut conn = pool.acquire().await.unwrap();
        let provider = FakeProvider::new();
        let tokens = tokens();
        let bridge = OAuthBridge::new(&provider, CLIENT_ID, &tokens);
        let session = session_with_nonce(&mut conn).await;

        let result = bridge
            .connect(
                &session,
                ConnectRequest {
                    csrf_marker_present: false,
                    ..request("code-1")
                },
            )
            .await;

        assert!(matches!(result, Err(ApiError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_bad_state_is_rejected() {
        let pool = setup_test_db().await;
        let mut conn = pool.acquire().await.unwrap();
        let provider = FakeProvider::new();
        let tokens = tokens();
        let bridge = OAuthBridge::new(&provider, CLIENT_ID, &tokens);
        let mut session = session_with_nonce(&mut conn).await;

        let result = bridge
            .connect(
                &session,
                ConnectRequest {
                    state_param: Some("REPLAYED"),
                    ..request("code-1")
                },
            )
            .await;
        rejected_with(result, "Invalid state parameter.");

        // no nonce issued at all
        session.state = None;
        let result = bridge.connect(&session, request("code-1")).await;
        rejected_with(result, "Invalid state parameter.");
        assert_eq!(user_count(&mut conn).await, 0);
    }

    #[tokio::test]
    async fn test_subject_mismatch_is_rejected() {
        let pool = setup_test_db().await;
        let mut conn = pool.acquire().await.unwrap();
        let provider = FakeProvider {
            tokeninfo_user_id: "g-2002".to_string(),
            ..FakeProvider::new()
        };
        let tokens = tokens();
        let bridge = OAuthBridge::new(&provider, CLIENT_ID, &tokens);
        let session = session_with_nonce(&mut conn).await;

        let result = bridge.connect(&session, request("code-1")).await;

        rejected_with(result, "Token's user ID does not match given user ID.");
        assert_eq!(provider.userinfo_calls.load(Ordering::SeqCst), 0);
        assert_eq!(user_count(&mut conn).await, 0);
    }

    #[tokio::test]
    async fn test_audience_mismatch_is_rejected() {
        let pool = setup_test_db().await;
        let mut conn = pool.acquire().await.unwrap();
        let provider = FakeProvider {
            tokeninfo_audience: "someone-else.apps.example".to_string(),
            ..FakeProvider::new()
        };
        let tokens = tokens();
        let bridge = OAuthBridge::new(&provider, CLIENT_ID, &tokens);
        let session = session_with_nonce(&mut conn).await;

        let result = bridge.connect(&session, request("code-1")).await;

        rejected_with(result, "Token's client ID does not match app's.");
    }

    #[tokio::test]
    async fn test_exchange_failures() {
        let pool = setup_test_db().await;
        let mut conn = pool.acquire().await.unwrap();
        let tokens = tokens();
        let session = session_with_nonce(&mut conn).await;

        let rejected = FakeProvider {
            exchange: Exchange::Rejected,
            ..FakeProvider::new()
        };
        let result = OAuthBridge::new(&rejected, CLIENT_ID, &tokens)
            .connect(&session, request("code-1"))
            .await;
        rejected_with(result, "Failed to upgrade the authorization code.");

        let slow = FakeProvider {
            exchange: Exchange::Timeout,
            ..FakeProvider::new()
        };
        let result = OAuthBridge::new(&slow, CLIENT_ID, &tokens)
            .connect(&session, request("code-1"))
            .await;
        assert!(matches!(result, Err(ApiError::ProviderUnavailable(_))));
    }

    #[tokio::test]
    async fn test_tokeninfo_error_is_reported() {
        let pool = setup_test_db().await;
        let mut conn = pool.acquire().await.unwrap();
        let provider = FakeProvider {
            tokeninfo_error: Some("invalid_token".to_string()),
            ..FakeProvider::new()
        };
        let tokens = tokens();
        let bridge = OAuthBridge::new(&provider, CLIENT_ID, &tokens);
        let session = session_with_nonce(&mut conn).await;

        match bridge.connect(&session, request("code-1")).await {
            Err(ApiError::ProviderError(msg)) => assert_eq!(msg, "invalid_token"),
            other => panic!("expected ProviderError, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_revoke_and_disconnect() {
        let pool = setup_test_db().await;
        let mut conn = pool.acquire().await.unwrap();
        let provider = FakeProvider::new();
        let tokens = tokens();
        let bridge = OAuthBridge::new(&provider, CLIENT_ID, &tokens);
        let mut session = session_with_nonce(&mut conn).await;

        assert_eq!(
            bridge.revoke(&mut session).await.unwrap(),
            RevokeOutcome::NotConnected
        );

        log_in(&bridge, &mut conn, &mut session, request("code-1"))
            .await
            .unwrap();

        assert_eq!(bridge.revoke(&mut session).await.unwrap(), RevokeOutcome::Revoked);
        assert!(session.access_token.is_none());
        assert!(session.is_logged_in());

        assert_eq!(bridge.disconnect(&mut session).await, RevokeOutcome::NotConnected);
        assert!(!session.is_logged_in());
        assert!(session.state.is_none());
    }

    #[tokio::test]
    async fn test_disconnect_clears_identity_when_revoke_fails() {
        let pool = setup_test_db().await;
        let mut conn = pool.acquire().await.unwrap();
        let provider = FakeProvider {
            revoke_ok: false,
            ..FakeProvider::new()
        };
        let tokens = tokens();
        let bridge = OAuthBridge::new(&provider, CLIENT_ID, &tokens);
        let mut session = session_with_nonce(&mut conn).await;

        log_in(&bridge, &mut conn, &mut session, request("code-1"))
            .await
            .unwrap();

        assert_eq!(bridge.disconnect(&mut session).await, RevokeOutcome::Failed);
        assert!(!session.is_logged_in());
        assert!(session.access_token.is_none());
        assert!(session.provider.is_none());
    }

    // ------------------------------------------------------------------
    // HTTP handlers
    // ------------------------------------------------------------------

    fn app_state(pool: &SqlitePool, provider: Option<Arc<FakeProvider>>) -> Arc<AppState> {
        let google = provider.map(|p| p as Arc<dyn IdentityProvider>);
        Arc::new(AppState {
            db: pool.clone(),
            tokens: Arc::new(tokens()),
            google_client_id: google.as_ref().map(|_| CLIENT_ID.to_string()),
            google,
            session_cookie_secure: false,
        })
    }

    fn session_id_of(response: &Response) -> Option<String> {
        let cookie = response.headers().get(header::SET_COOKIE)?.to_str().ok()?;
        let value = cookie
            .strip_prefix("catalog_session=")?
            .split(';')
            .next()?;
        (!value.is_empty()).then(|| value.to_string())
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    async fn stored_session(pool: &SqlitePool, session_id: &str) -> Option<BrowserSession> {
        let mut conn = pool.acquire().await.unwrap();
        session::load(&mut conn, session_id).await.unwrap()
    }

    fn ajax_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("x-requested-with", HeaderValue::from_static("XMLHttpRequest"));
        headers
    }

    /// Render the login page; returns the session id and the nonce it holds
    async fn open_login_page(state: &Arc<AppState>, cookie: Option<String>) -> (String, String) {
        let response = handlers::show_login(Extension(state.clone()), SessionCookie(cookie))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let session_id = session_id_of(&response).expect("login page sets a session cookie");
        let html = body_text(response).await;
        let nonce = stored_session(&state.db, &session_id)
            .await
            .and_then(|s| s.state)
            .expect("login page stores a nonce");
        assert!(html.contains(&nonce));

        (session_id, nonce)
    }

    async fn post_code(
        state: &Arc<AppState>,
        provider: &str,
        session_id: &str,
        nonce: &str,
        code: &str,
    ) -> Result<Response, ApiError> {
        handlers::oauth_login(
            Extension(state.clone()),
            SessionCookie(Some(session_id.to_string())),
            Path(provider.to_string()),
            Query(ConnectQuery {
                state: Some(nonce.to_string()),
            }),
            ajax_headers(),
            code.to_string(),
        )
        .await
    }

    /// Log in through the handlers; returns the post-login session id
    async fn browser_login(state: &Arc<AppState>) -> String {
        let (session_id, nonce) = open_login_page(state, None).await;
        let response = post_code(state, "google", &session_id, &nonce, "code-1")
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        session_id_of(&response).unwrap()
    }

    #[tokio::test]
    async fn test_login_page_issues_fresh_nonce_each_render() {
        let pool = setup_test_db().await;
        let state = app_state(&pool, Some(Arc::new(FakeProvider::new())));

        let (session_id, first) = open_login_page(&state, None).await;
        let (same_session, second) = open_login_page(&state, Some(session_id.clone())).await;

        assert_eq!(same_session, session_id);
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn test_oauth_login_handler_flow() {
        let pool = setup_test_db().await;
        let provider = Arc::new(FakeProvider::new());
        let state = app_state(&pool, Some(provider.clone()));

        let (pre_login_id, nonce) = open_login_page(&state, None).await;
        let response = post_code(&state, "google", &pre_login_id, &nonce, "code-1")
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let session_id = session_id_of(&response).unwrap();
        assert_ne!(session_id, pre_login_id);
        let html = body_text(response).await;
        assert!(html.contains("Welcome, Ann Example!"));
        assert!(html.contains("Temporary API Token"));

        assert!(stored_session(&pool, &pre_login_id).await.is_none());
        let browser = stored_session(&pool, &session_id).await.unwrap();
        assert!(browser.is_logged_in());
        assert!(browser.state.is_none());

        // a new login page, then the same account again
        let (same_session, nonce) = open_login_page(&state, Some(session_id.clone())).await;
        assert_eq!(same_session, session_id);
        let response = post_code(&state, "google", &session_id, &nonce, "code-2")
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body["message"], "Current user is already connected.");
        assert_eq!(provider.userinfo_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_oauth_login_rejects_missing_csrf_header() {
        let pool = setup_test_db().await;
        let state = app_state(&pool, Some(Arc::new(FakeProvider::new())));
        let (session_id, nonce) = open_login_page(&state, None).await;

        let result = handlers::oauth_login(
            Extension(state.clone()),
            SessionCookie(Some(session_id.clone())),
            Path("google".to_string()),
            Query(ConnectQuery { state: Some(nonce) }),
            HeaderMap::new(),
            "code-1".to_string(),
        )
        .await;

        assert!(matches!(result, Err(ApiError::Forbidden(_))));
        assert!(!stored_session(&pool, &session_id).await.unwrap().is_logged_in());
    }

    #[tokio::test]
    async fn test_unknown_and_unconfigured_providers() {
        let pool = setup_test_db().await;
        let state = app_state(&pool, Some(Arc::new(FakeProvider::new())));
        let (session_id, nonce) = open_login_page(&state, None).await;

        let response = post_code(&state, "facebook", &session_id, &nonce, "code-1")
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "Unrecognized OAuth provider");

        let unconfigured = app_state(&pool, None);
        let result = post_code(&unconfigured, "google", &session_id, &nonce, "code-1").await;
        assert!(matches!(result, Err(ApiError::ProviderUnavailable(_))));
    }

    #[tokio::test]
    async fn test_gdisconnect_responses() {
        let pool = setup_test_db().await;
        let state = app_state(&pool, Some(Arc::new(FakeProvider::new())));

        match handlers::gdisconnect(Extension(state.clone()), SessionCookie(None)).await {
            Err(ApiError::Unauthorized(msg)) => assert_eq!(msg, "Current user not connected"),
            other => panic!("expected Unauthorized, got {:?}", other.map(|r| r.status())),
        }

        let session_id = browser_login(&state).await;
        let response = handlers::gdisconnect(
            Extension(state.clone()),
            SessionCookie(Some(session_id.clone())),
        )
        .await
        .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body["message"], "Successfully disconnected");

        let browser = stored_session(&pool, &session_id).await.unwrap();
        assert!(browser.access_token.is_none());

        // nothing left to revoke
        let result =
            handlers::gdisconnect(Extension(state.clone()), SessionCookie(Some(session_id))).await;
        assert!(matches!(result, Err(ApiError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_gdisconnect_reports_refused_revoke() {
        let pool = setup_test_db().await;
        let provider = FakeProvider {
            revoke_ok: false,
            ..FakeProvider::new()
        };
        let state = app_state(&pool, Some(Arc::new(provider)));
        let session_id = browser_login(&state).await;

        let response = handlers::gdisconnect(
            Extension(state.clone()),
            SessionCookie(Some(session_id.clone())),
        )
        .await
        .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body["message"], "Failed to revoke token");

        let browser = stored_session(&pool, &session_id).await.unwrap();
        assert!(browser.access_token.is_some());
    }

    #[tokio::test]
    async fn test_disconnect_handler() {
        let pool = setup_test_db().await;
        let state = app_state(&pool, Some(Arc::new(FakeProvider::new())));

        let response = handlers::disconnect(Extension(state.clone()), SessionCookie(None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let anonymous = session_id_of(&response).unwrap();
        let mut browser = stored_session(&pool, &anonymous).await.unwrap();
        assert_eq!(browser.take_flashes(), vec!["You were not logged in"]);

        let session_id = browser_login(&state).await;
        let response = handlers::disconnect(
            Extension(state.clone()),
            SessionCookie(Some(session_id.clone())),
        )
        .await
        .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response
                .headers()
                .get(header::LOCATION)
                .and_then(|v| v.to_str().ok()),
            Some("/catalog")
        );

        let mut browser = stored_session(&pool, &session_id).await.unwrap();
        assert!(!browser.is_logged_in());
        assert!(browser.access_token.is_none());
        assert_eq!(
            browser.take_flashes().last().map(String::as_str),
            Some("You have successfully logged out")
        );
    }

    #[tokio::test]
    async fn test_pages_stay_available_while_provider_is_slow() {
        let pool = setup_test_db().await;
        let provider = FakeProvider {
            exchange_delay: Duration::from_millis(500),
            ..FakeProvider::new()
        };
        let state = app_state(&pool, Some(Arc::new(provider)));
        let (session_id, nonce) = open_login_page(&state, None).await;

        // the test pool has a single connection, so a login holding it
        // across the provider call would starve the catalog page
        let (login, browse) = tokio::join!(
            post_code(&state, "google", &session_id, &nonce, "code-1"),
            async {
                tokio::time::sleep(Duration::from_millis(50)).await;
                tokio::time::timeout(
                    Duration::from_millis(250),
                    pages::show_catalog(Extension(state.clone()), SessionCookie(None)),
                )
                .await
            }
        );

        let browse = browse.expect("catalog page waited on the login request");
        assert_eq!(browse.unwrap().status(), StatusCode::OK);
        assert_eq!(login.unwrap().status(), StatusCode::OK);
    }
}
