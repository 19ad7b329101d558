// src/catalog/handlers/page.rs
//! Per-request scaffolding for browser-facing handlers
//!
//! A `Page` owns the request transaction and the browser session. Handlers
//! produce a `PageOutcome`; `finish` saves the session, commits and attaches
//! the session cookie.
//!
//! Handlers that wait on the identity provider start from a `DetachedPage`,
//! so no transaction is open across the outbound call, and `reattach` once
//! the provider has answered.

use axum::{
    http::{header::SET_COOKIE, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    Json,
};
use sqlx::{Sqlite, SqliteConnection, Transaction};
use tracing::{debug, warn};

use super::super::views::Chrome;
use crate::auth::extractors::principal_for_session;
use crate::auth::session::{self, expired_session_cookie, session_cookie, BrowserSession};
use crate::auth::Principal;
use crate::common::error::MessageResponse;
use crate::common::{ApiError, AppState};

#[derive(Debug)]
pub enum PageOutcome {
    Html(String),
    Redirect(String),
    /// JSON `{message}` with an explicit status, for the login script
    Message(StatusCode, String),
}

pub struct Page {
    tx: Transaction<'static, Sqlite>,
    pub session: BrowserSession,
    /// The session already has a row under its current id
    stored: bool,
    secure: bool,
}

/// A page between transactions; only the session is held
pub struct DetachedPage {
    pub session: BrowserSession,
    stored: bool,
    secure: bool,
}

impl DetachedPage {
    /// Load the browser session without keeping a transaction open
    pub async fn load(state: &AppState, cookie: Option<String>) -> Result<Self, ApiError> {
        let mut conn = state.db.acquire().await?;
        let session = session::load_or_start(&mut conn, cookie.as_deref()).await?;

        Ok(Self {
            stored: cookie.as_deref() == Some(session.session_id.as_str()),
            session,
            secure: state.session_cookie_secure,
        })
    }

    pub async fn reattach(self, state: &AppState) -> Result<Page, ApiError> {
        let tx = state.db.begin().await?;
        Ok(Page {
            tx,
            session: self.session,
            stored: self.stored,
            secure: self.secure,
        })
    }
}

impl Page {
    pub async fn open(state: &AppState, cookie: Option<String>) -> Result<Self, ApiError> {
        let mut tx = state.db.begin().await?;
        let session = session::load_or_start(&mut tx, cookie.as_deref()).await?;

        Ok(Self {
            tx,
            stored: cookie.as_deref() == Some(session.session_id.as_str()),
            session,
            secure: state.session_cookie_secure,
        })
    }

    pub fn conn(&mut self) -> &mut SqliteConnection {
        &mut *self.tx
    }

    /// Connection and session together, for calls that need both
    pub fn parts(&mut self) -> (&mut SqliteConnection, &mut BrowserSession) {
        (&mut *self.tx, &mut self.session)
    }

    /// The signed-in user, or `None` for anonymous visitors
    pub async fn principal(&mut self) -> Result<Option<Principal>, ApiError> {
        principal_for_session(&mut *self.tx, &self.session).await
    }

    /// Header data for rendering; consumes pending flashes
    pub fn chrome(&mut self) -> Chrome {
        Chrome {
            user_name: self.session.user_name.clone(),
            user_picture: self.session.user_picture.clone(),
            flashes: self.session.take_flashes(),
        }
    }

    /// Flash a message and redirect
    pub fn bounce(&mut self, message: impl Into<String>, to: impl Into<String>) -> PageOutcome {
        self.session.flash(message);
        PageOutcome::Redirect(to.into())
    }

    pub async fn finish(mut self, outcome: Result<PageOutcome, ApiError>) -> Result<Response, ApiError> {
        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(
                ApiError::NotFound(message)
                | ApiError::ValidationError(message)
                | ApiError::BadRequest(message)
                | ApiError::Restricted(message),
            ) => {
                debug!(message = %message, "Page request refused, redirecting to catalog");
                self.bounce(message, "/catalog")
            }
            Err(e) => return Err(e),
        };

        let cookie = if self.session.is_empty() {
            if !self.stored {
                None
            } else {
                session::delete(&mut self.tx, &self.session.session_id).await?;
                Some(expired_session_cookie(self.secure))
            }
        } else {
            if !self.stored {
                // a new row is about to be written; sweep idle ones first
                session::purge_expired(&mut self.tx).await?;
            }
            session::save(&mut self.tx, &self.session).await?;
            Some(session_cookie(&self.session.session_id, self.secure))
        };

        self.tx.commit().await?;

        let mut response = match outcome {
            PageOutcome::Html(html) => Html(html).into_response(),
            PageOutcome::Redirect(to) => Redirect::to(&to).into_response(),
            PageOutcome::Message(status, message) => {
                (status, Json(MessageResponse { message })).into_response()
            }
        };

        if let Some(cookie) = cookie {
            match HeaderValue::from_str(&cookie) {
                Ok(value) => {
                    response.headers_mut().insert(SET_COOKIE, value);
                }
                Err(e) => warn!(error = %e, "Session id is not a valid header value"),
            }
        }

        Ok(response)
    }
}
