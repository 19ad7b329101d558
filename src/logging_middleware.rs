// src/logging_middleware.rs
//! Middleware for logging request and response bodies in debug mode
//!
//! Password fields are masked in JSON and form-encoded request bodies before
//! anything is logged.

use axum::body::to_bytes;
use axum::{
    body::Body,
    extract::Request,
    http::{header::CONTENT_TYPE, HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use serde_json::Value;
use tracing::{debug, enabled, Level};

const REDACTED: &str = "[REDACTED]";
const SECRET_FIELDS: &[&str] = &["password", "token", "access_token", "code"];

fn is_secret(key: &str) -> bool {
    SECRET_FIELDS.iter().any(|s| key.eq_ignore_ascii_case(s))
}

fn redact_json(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, v) in map.iter_mut() {
                if is_secret(key) {
                    *v = Value::String(REDACTED.to_string());
                } else {
                    redact_json(v);
                }
            }
        }
        Value::Array(values) => values.iter_mut().for_each(redact_json),
        _ => {}
    }
}

fn redact_form(body: &str) -> String {
    body.split('&')
        .map(|pair| {
            let (key, _) = pair.split_once('=').unwrap_or((pair, ""));
            let decoded = urlencoding::decode(key)
                .map(|k| k.into_owned())
                .unwrap_or_else(|_| key.to_string());
            if is_secret(&decoded) {
                format!("{}={}", key, REDACTED)
            } else {
                pair.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("&")
}

fn is_form(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("application/x-www-form-urlencoded"))
        .unwrap_or(false)
}

/// Loggable rendition of a request body
pub fn redact_body(headers: &HeaderMap, body: &str) -> String {
    if let Ok(mut json) = serde_json::from_str::<Value>(body) {
        redact_json(&mut json);
        return serde_json::to_string_pretty(&json).unwrap_or_else(|_| REDACTED.to_string());
    }
    if is_form(headers) {
        return redact_form(body);
    }
    // opaque bodies (e.g. the OAuth authorization code) are not logged verbatim
    format!("<{} bytes>", body.len())
}

/// Middleware to log request and response bodies in debug mode
pub async fn log_request_response(request: Request, next: Next) -> Result<Response, StatusCode> {
    if !enabled!(Level::DEBUG) {
        return Ok(next.run(request).await);
    }

    let (parts, body) = request.into_parts();

    let bytes = to_bytes(body, usize::MAX)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    if !bytes.is_empty() {
        if let Ok(body_str) = std::str::from_utf8(&bytes) {
            debug!(
                method = %parts.method,
                uri = %parts.uri,
                request_body = %redact_body(&parts.headers, body_str),
                "📥 Request"
            );
        }
    }

    let request = Request::from_parts(parts, Body::from(bytes));
    let response = next.run(request).await;

    let (parts, body) = response.into_parts();

    let bytes = to_bytes(body, usize::MAX)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    if !bytes.is_empty() {
        if let Ok(body_str) = std::str::from_utf8(&bytes) {
            // HTML pages are noise; JSON bodies may carry freshly minted tokens
            if let Ok(mut json) = serde_json::from_str::<Value>(body_str) {
                redact_json(&mut json);
                debug!(
                    status = %parts.status,
                    response_body = %serde_json::to_string_pretty(&json).unwrap_or_default(),
                    "📤 Response"
                );
            } else {
                debug!(status = %parts.status, response_bytes = bytes.len(), "📤 Response");
            }
        }
    }

    Ok(Response::from_parts(parts, Body::from(bytes)))
}
