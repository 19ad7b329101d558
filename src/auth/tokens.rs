//! Signed, self-contained bearer tokens

use chrono::Utc;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use rand::RngCore;
use thiserror::Error;
use tracing::{debug, info};

use super::models::Claims;

pub const DEFAULT_TOKEN_TTL_SECONDS: u64 = 600;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("invalid token: {0}")]
    Invalid(String),

    #[error("token expired")]
    Expired,

    #[error("token signing failed: {0}")]
    Signing(String),
}

/// Issues and verifies HS256 tokens with a process-wide secret
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    default_ttl: u64,
}

impl TokenService {
    pub fn new(secret: &[u8], default_ttl: u64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            default_ttl,
        }
    }

    /// Uses the configured secret, or a random one that lives as long as the process.
    pub fn from_config(secret: Option<&str>, default_ttl: u64) -> Self {
        match secret {
            Some(secret) => Self::new(secret.as_bytes(), default_ttl),
            None => {
                let mut secret = [0u8; 32];
                rand::thread_rng().fill_bytes(&mut secret);
                info!("TOKEN_SECRET not set; generated a random signing key for this process");
                Self::new(&secret, default_ttl)
            }
        }
    }

    pub fn default_ttl(&self) -> u64 {
        self.default_ttl
    }

    /// Mint a token for `user_id`. The expiry is fixed into the token here.
    pub fn issue(&self, user_id: i64, ttl_seconds: Option<u64>) -> Result<String, TokenError> {
        let ttl = ttl_seconds.unwrap_or(self.default_ttl);
        let now = Utc::now().timestamp().max(0) as usize;
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now,
            exp: now + ttl as usize,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    pub fn verify(&self, token: &str) -> Result<i64, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let decoded = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid(e.to_string()),
            }
        })?;

        let user_id = decoded.claims.sub.parse::<i64>().map_err(|_| {
            debug!("Token subject is not a user id");
            TokenError::Invalid("malformed subject".to_string())
        })?;

        Ok(user_id)
    }
}
