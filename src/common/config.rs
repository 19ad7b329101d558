// src/common/config.rs
//! Environment-driven configuration

use serde::Deserialize;
use std::env;
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

use crate::auth::tokens::DEFAULT_TOKEN_TTL_SECONDS;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },

    #[error("Failed to read client secrets file {path}: {reason}")]
    ClientSecrets { path: String, reason: String },
}

/// Google OAuth client registration
#[derive(Debug, Clone)]
pub struct GoogleClientConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub port: u16,
    pub db_max_connections: u32,
    /// `None` means a random secret is generated at startup
    pub token_secret: Option<String>,
    pub token_ttl_seconds: u64,
    pub google: Option<GoogleClientConfig>,
    pub provider_timeout_secs: u64,
    pub session_cookie_secure: bool,
    pub cors_origins: Vec<String>,
    pub reset_db: bool,
}

/// `client_secrets.json` as downloaded from the Google developer console
#[derive(Deserialize)]
struct ClientSecretsFile {
    web: ClientSecretsWeb,
}

#[derive(Deserialize)]
struct ClientSecretsWeb {
    client_id: String,
    client_secret: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://catalog.db".to_string());

        let port = parse_var("PORT", 8000u16)?;
        let db_max_connections = parse_var("DB_MAX_CONNECTIONS", 5u32)?;
        let token_ttl_seconds = parse_var("TOKEN_TTL_SECONDS", DEFAULT_TOKEN_TTL_SECONDS)?;
        let provider_timeout_secs = parse_var("PROVIDER_TIMEOUT_SECS", 10u64)?;

        let token_secret = env::var("TOKEN_SECRET").ok().filter(|s| !s.is_empty());

        let session_cookie_secure = flag_var("SESSION_COOKIE_SECURE");
        let reset_db = flag_var("RESET_DB");

        let cors_origins = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:8000".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let google = load_google_client()?;
        if google.is_none() {
            warn!("Google OAuth client not configured; /oauth/google will reject logins");
        }

        Ok(Self {
            database_url,
            port,
            db_max_connections,
            token_secret,
            token_ttl_seconds,
            google,
            provider_timeout_secs,
            session_cookie_secure,
            cors_origins,
            reset_db,
        })
    }
}

fn parse_var<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidValue { key, value }),
        _ => Ok(default),
    }
}

fn flag_var(key: &str) -> bool {
    env::var(key)
        .map(|v| v.trim().eq_ignore_ascii_case("true") || v.trim() == "1")
        .unwrap_or(false)
}

/// Env vars win; otherwise fall back to a client secrets file.
fn load_google_client() -> Result<Option<GoogleClientConfig>, ConfigError> {
    let redirect_uri =
        env::var("GOOGLE_REDIRECT_URI").unwrap_or_else(|_| "postmessage".to_string());

    if let (Ok(client_id), Ok(client_secret)) =
        (env::var("GOOGLE_CLIENT_ID"), env::var("GOOGLE_CLIENT_SECRET"))
    {
        return Ok(Some(GoogleClientConfig {
            client_id,
            client_secret,
            redirect_uri,
        }));
    }

    let Ok(path) = env::var("GOOGLE_CLIENT_SECRETS_FILE") else {
        return Ok(None);
    };

    let secrets = read_client_secrets(Path::new(&path))?;
    info!(path = %path, "Loaded Google client registration from secrets file");

    Ok(Some(GoogleClientConfig {
        client_id: secrets.web.client_id,
        client_secret: secrets.web.client_secret,
        redirect_uri,
    }))
}

fn read_client_secrets(path: &Path) -> Result<ClientSecretsFile, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::ClientSecrets {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;

    serde_json::from_str(&raw).map_err(|e| ConfigError::ClientSecrets {
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_secrets_file_format() {
        let raw = r#"{"web": {"client_id": "abc.apps.googleusercontent.com", "client_secret": "s3cr3t", "redirect_uris": []}}"#;
        let parsed: ClientSecretsFile = serde_json::from_str(raw).unwrap();

        assert_eq!(parsed.web.client_id, "abc.apps.googleusercontent.com");
        assert_eq!(parsed.web.client_secret, "s3cr3t");
    }

    #[test]
    fn test_missing_client_secrets_file() {
        let result = read_client_secrets(Path::new("/definitely/not/here.json"));
        assert!(matches!(result, Err(ConfigError::ClientSecrets { .. })));
    }
}
