// src/oauth/bridge.rs
//! Turns a provider authorization code into a local, session-backed login
//!
//! `connect` only talks to the provider and never touches the database;
//! `sign_in` records a verified login. Callers hold no transaction while
//! `connect`, `revoke` or `disconnect` are in flight.

use sqlx::SqliteConnection;
use tracing::{debug, error, info, warn};

use super::provider::{IdentityProvider, ProviderError, ProviderProfile};
use crate::auth::models::NewUser;
use crate::auth::session::{self, BrowserSession};
use crate::auth::tokens::TokenService;
use crate::catalog::repository;
use crate::common::{safe_email_log, safe_token_log, ApiError};

/// What the browser sent to `POST /oauth/:provider`
#[derive(Debug, Clone, Copy)]
pub struct ConnectRequest<'a> {
    /// `X-Requested-With` was present
    pub csrf_marker_present: bool,
    pub state_param: Option<&'a str>,
    pub code: &'a str,
}

/// Provider identity that passed every check, not yet recorded locally
#[derive(Debug, Clone)]
pub struct VerifiedLogin {
    access_token: String,
    subject: String,
    profile: ProviderProfile,
}

/// Signed-in user handed back to the login page
#[derive(Debug, Clone)]
pub struct LoginGrant {
    pub name: String,
    pub picture: Option<String>,
    pub token: String,
}

#[derive(Debug, Clone)]
pub enum ConnectOutcome {
    Verified(VerifiedLogin),
    AlreadyConnected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevokeOutcome {
    NotConnected,
    Revoked,
    Failed,
}

pub struct OAuthBridge<'a> {
    provider: &'a dyn IdentityProvider,
    client_id: &'a str,
    tokens: &'a TokenService,
}

impl<'a> OAuthBridge<'a> {
    pub fn new(provider: &'a dyn IdentityProvider, client_id: &'a str, tokens: &'a TokenService) -> Self {
        Self {
            provider,
            client_id,
            tokens,
        }
    }

    /// Checks the browser's request and verifies the code with the provider.
    /// Nothing is written anywhere.
    pub async fn connect(
        &self,
        session: &BrowserSession,
        request: ConnectRequest<'_>,
    ) -> Result<ConnectOutcome, ApiError> {
        if !request.csrf_marker_present {
            warn!(provider = self.provider.name(), "Login refused: missing X-Requested-With header");
            return Err(ApiError::Forbidden("abort".to_string()));
        }

        let state_matches = matches!(
            (request.state_param, session.state.as_deref()),
            (Some(given), Some(expected)) if given == expected
        );
        if !state_matches {
            warn!(session_id = %safe_token_log(&session.session_id), "Login refused: state mismatch");
            return Err(ApiError::ProviderRejected("Invalid state parameter.".to_string()));
        }

        let credentials = self.provider.exchange_code(request.code).await.map_err(|e| {
            warn!(error = %e, "Authorization code exchange failed");
            match e {
                ProviderError::Unavailable(msg) => ApiError::ProviderUnavailable(msg),
                _ => ApiError::ProviderRejected(
                    "Failed to upgrade the authorization code.".to_string(),
                ),
            }
        })?;

        debug!(
            access_token = %safe_token_log(&credentials.access_token),
            "Authorization code exchanged"
        );

        let info = self
            .provider
            .token_info(&credentials.access_token)
            .await
            .map_err(provider_failure)?;

        if let Some(provider_error) = &info.error {
            error!(
                error = %provider_error,
                description = ?info.error_description,
                "Provider reported an access token error"
            );
            return Err(ApiError::ProviderError(provider_error.clone()));
        }

        if info.user_id.as_deref() != Some(credentials.subject.as_str()) {
            warn!("Login refused: token subject does not match id token");
            return Err(ApiError::ProviderRejected(
                "Token's user ID does not match given user ID.".to_string(),
            ));
        }

        if info.client_id() != Some(self.client_id) {
            warn!(
                token_audience = ?info.client_id(),
                "Login refused: token issued to another client"
            );
            return Err(ApiError::ProviderRejected(
                "Token's client ID does not match app's.".to_string(),
            ));
        }

        if session.access_token.is_some()
            && session.provider_subject.as_deref() == Some(credentials.subject.as_str())
        {
            debug!("Provider login repeated for an already connected session");
            return Ok(ConnectOutcome::AlreadyConnected);
        }

        let profile = self
            .provider
            .user_info(&credentials.access_token)
            .await
            .map_err(provider_failure)?;

        Ok(ConnectOutcome::Verified(VerifiedLogin {
            access_token: credentials.access_token,
            subject: credentials.subject,
            profile,
        }))
    }

    /// Finds or creates the local user, mints a token and moves the session
    /// to a fresh id holding the new identity. The caller persists the session.
    pub async fn sign_in(
        &self,
        conn: &mut SqliteConnection,
        session: &mut BrowserSession,
        login: VerifiedLogin,
    ) -> Result<LoginGrant, ApiError> {
        let VerifiedLogin {
            access_token,
            subject,
            profile,
        } = login;

        let (user_id, name) = self.find_or_create_user(conn, &profile).await?;

        let token = self.tokens.issue(user_id, None).map_err(|e| {
            error!(error = %e, user_id = user_id, "Token signing failed");
            ApiError::InternalServer("token error".to_string())
        })?;

        session::rotate(conn, session).await?;
        session.provider = Some(self.provider.name().to_string());
        session.access_token = Some(access_token);
        session.provider_subject = Some(subject);
        session.user_id = Some(user_id);
        session.user_name = Some(name.clone());
        session.user_email = Some(profile.email.clone());
        session.user_picture = profile.picture.clone();
        session.flash(format!("you are now logged in as {}", name));

        info!(
            user_id = user_id,
            email = %safe_email_log(&profile.email),
            provider = self.provider.name(),
            "User logged in"
        );

        Ok(LoginGrant {
            name,
            picture: profile.picture,
            token,
        })
    }

    async fn find_or_create_user(
        &self,
        conn: &mut SqliteConnection,
        profile: &ProviderProfile,
    ) -> Result<(i64, String), ApiError> {
        if let Some(user) = repository::find_user_by_email(conn, &profile.email).await? {
            let name = profile.name.clone().unwrap_or(user.user_name);
            return Ok((user.user_id, name));
        }

        let name = profile
            .name
            .clone()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| profile.email.clone());

        let user = repository::create_user(
            conn,
            &NewUser {
                name,
                email: profile.email.clone(),
                picture: profile.picture.clone(),
                password_hash: None,
            },
        )
        .await?;

        info!(
            user_id = user.user_id,
            email = %safe_email_log(&user.user_email),
            "Created user from provider profile"
        );

        Ok((user.user_id, user.user_name))
    }

    /// Revokes the session's provider access token. Provider credentials are
    /// cleared from the session only when the provider confirms.
    pub async fn revoke(&self, session: &mut BrowserSession) -> Result<RevokeOutcome, ApiError> {
        let Some(access_token) = session.access_token.clone() else {
            return Ok(RevokeOutcome::NotConnected);
        };

        if self
            .provider
            .revoke(&access_token)
            .await
            .map_err(provider_failure)?
        {
            session.clear_provider_credentials();
            info!(user_id = ?session.user_id, "Revoked provider access token");
            Ok(RevokeOutcome::Revoked)
        } else {
            warn!(user_id = ?session.user_id, "Provider refused to revoke access token");
            Ok(RevokeOutcome::Failed)
        }
    }

    /// Full logout: best-effort revoke, then forget the local identity.
    pub async fn disconnect(&self, session: &mut BrowserSession) -> RevokeOutcome {
        let outcome = match self.revoke(session).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(error = %e, "Token revocation failed during logout");
                RevokeOutcome::Failed
            }
        };

        session.clear_identity();
        outcome
    }
}

fn provider_failure(e: ProviderError) -> ApiError {
    match e {
        ProviderError::Unavailable(msg) => ApiError::ProviderUnavailable(msg),
        other => ApiError::ProviderError(other.to_string()),
    }
}
