// src/oauth/provider.rs
//! Identity provider client
//!
//! `IdentityProvider` is the seam between the login flow and the provider's
//! HTTP endpoints. `GoogleProvider` talks to Google; tests use an in-process
//! fake.

use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::common::config::GoogleClientConfig;
use crate::common::safe_token_log;

const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_TOKENINFO_URL: &str = "https://www.googleapis.com/oauth2/v1/tokeninfo";
const GOOGLE_USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v1/userinfo";
const GOOGLE_REVOKE_URL: &str = "https://accounts.google.com/o/oauth2/revoke";

#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider answered and said no (bad, expired or reused code)
    #[error("provider rejected the request: {0}")]
    Rejected(String),

    /// Timeout or transport failure
    #[error("provider unavailable: {0}")]
    Unavailable(String),

    #[error("unexpected provider response: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() || e.is_connect() || e.is_request() {
            ProviderError::Unavailable(e.to_string())
        } else if e.is_decode() {
            ProviderError::Malformed(e.to_string())
        } else {
            ProviderError::Rejected(e.to_string())
        }
    }
}

/// Result of exchanging an authorization code
#[derive(Debug, Clone)]
pub struct ProviderCredentials {
    pub access_token: String,
    /// `sub` claim of the id token issued alongside the access token
    pub subject: String,
}

/// Access-token introspection result
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenInfo {
    pub user_id: Option<String>,
    pub issued_to: Option<String>,
    pub audience: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

impl TokenInfo {
    /// Client id the token was issued to
    pub fn client_id(&self) -> Option<&str> {
        self.issued_to.as_deref().or(self.audience.as_deref())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderProfile {
    pub name: Option<String>,
    pub email: String,
    pub picture: Option<String>,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn exchange_code(&self, code: &str) -> Result<ProviderCredentials, ProviderError>;

    async fn token_info(&self, access_token: &str) -> Result<TokenInfo, ProviderError>;

    async fn user_info(&self, access_token: &str) -> Result<ProviderProfile, ProviderError>;

    /// `Ok(true)` when the provider confirmed the revocation
    async fn revoke(&self, access_token: &str) -> Result<bool, ProviderError>;
}

#[derive(Debug, Deserialize)]
struct GoogleTokenResponse {
    access_token: String,
    id_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IdTokenClaims {
    sub: String,
}

/// Reads the `sub` claim of an id token.
///
/// The id token arrives directly from the token endpoint over TLS in the
/// same response as the access token, so its signature is not re-checked;
/// the subject is cross-checked against tokeninfo instead.
pub fn id_token_subject(id_token: &str) -> Result<String, ProviderError> {
    let payload = id_token
        .split('.')
        .nth(1)
        .ok_or_else(|| ProviderError::Malformed("id_token is not a JWT".to_string()))?;

    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| ProviderError::Malformed(format!("id_token payload: {}", e)))?;

    let claims: IdTokenClaims = serde_json::from_slice(&bytes)
        .map_err(|e| ProviderError::Malformed(format!("id_token claims: {}", e)))?;

    Ok(claims.sub)
}

#[derive(Debug, Clone)]
pub struct GoogleProvider {
    config: GoogleClientConfig,
    client: Client,
}

impl GoogleProvider {
    pub fn new(config: GoogleClientConfig, timeout: Duration) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::Unavailable(format!("http client: {}", e)))?;

        Ok(Self { config, client })
    }
}

#[async_trait]
impl IdentityProvider for GoogleProvider {
    fn name(&self) -> &'static str {
        "google"
    }

    async fn exchange_code(&self, code: &str) -> Result<ProviderCredentials, ProviderError> {
        let params = [
            ("code", code),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("grant_type", "authorization_code"),
        ];

        debug!("Exchanging authorization code for tokens");

        let response = self
            .client
            .post(GOOGLE_TOKEN_URL)
            .form(&params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            warn!(status = %status, error = %error_text, "Token exchange failed");
            return Err(ProviderError::Rejected(format!("HTTP {}: {}", status, error_text)));
        }

        let token_response = response.json::<GoogleTokenResponse>().await?;
        let id_token = token_response
            .id_token
            .ok_or_else(|| ProviderError::Malformed("token response has no id_token".to_string()))?;

        Ok(ProviderCredentials {
            subject: id_token_subject(&id_token)?,
            access_token: token_response.access_token,
        })
    }

    async fn token_info(&self, access_token: &str) -> Result<TokenInfo, ProviderError> {
        debug!(access_token = %safe_token_log(access_token), "Validating access token");

        // tokeninfo reports problems in the body, including on 400 responses
        let response = self
            .client
            .get(GOOGLE_TOKENINFO_URL)
            .query(&[("access_token", access_token)])
            .send()
            .await?;

        let status = response.status();
        let info = response.json::<TokenInfo>().await?;

        if !status.is_success() && info.error.is_none() {
            return Ok(TokenInfo {
                error: Some(format!("HTTP {}", status)),
                ..info
            });
        }

        Ok(info)
    }

    async fn user_info(&self, access_token: &str) -> Result<ProviderProfile, ProviderError> {
        let response = self
            .client
            .get(GOOGLE_USERINFO_URL)
            .query(&[("access_token", access_token), ("alt", "json")])
            .send()
            .await?;

        if !response.status().is_success() {
            error!(status = %response.status(), "Failed to get user info");
            return Err(ProviderError::Rejected(format!(
                "userinfo returned HTTP {}",
                response.status()
            )));
        }

        Ok(response.json::<ProviderProfile>().await?)
    }

    async fn revoke(&self, access_token: &str) -> Result<bool, ProviderError> {
        let response = self
            .client
            .get(GOOGLE_REVOKE_URL)
            .query(&[("token", access_token)])
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() != 200 {
            warn!(status = %status, "Token revocation was not confirmed");
        }

        Ok(status.as_u16() == 200)
    }
}
