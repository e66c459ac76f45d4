use base64::{
    Engine,
    engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD},
};
use chrono::{DateTime, Utc};
use rand::{Rng, distr::Alphanumeric};
use reqwest::Url;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::{
    config::Settings,
    provider::AuthError,
    types::{ClaimsTableRow, Prompt},
};

pub fn generate_code_verifier() -> String {
    random_alphanumeric(128)
}

pub fn generate_code_challenge(verifier: &str) -> String {
    let hash = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}

/// Opaque value echoed back by the provider to tie a callback to its request.
pub fn generate_state() -> String {
    random_alphanumeric(32)
}

fn random_alphanumeric(len: usize) -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

pub fn build_authorize_url(
    settings: &Settings,
    audience: &str,
    code_challenge: &str,
    state: &str,
    prompt: Prompt,
) -> Result<String, String> {
    let mut params = vec![
        ("response_type", "code"),
        ("client_id", settings.client_id.as_str()),
        ("redirect_uri", settings.redirect_uri.as_str()),
        ("scope", settings.scope.as_str()),
        ("audience", audience),
        ("state", state),
        ("code_challenge", code_challenge),
        ("code_challenge_method", "S256"),
    ];
    if let Some(p) = prompt.as_param() {
        params.push(("prompt", p));
    }

    Url::parse_with_params(&settings.authorize_url(), &params)
        .map(|u| u.to_string())
        .map_err(|e| format!("Invalid authorize url {}: {}", settings.authorize_url(), e))
}

/// Decodes the payload segment of a JWT without checking its signature.
///
/// The result is for display only.
pub fn decode_claims(token: &str) -> Result<Value, AuthError> {
    let mut segments = token.split('.');
    let payload = match (segments.next(), segments.next(), segments.next()) {
        (Some(_), Some(payload), Some(_)) if !payload.is_empty() => payload,
        _ => {
            return Err(AuthError::InvalidToken(
                "token is not a three-part JWT".to_string(),
            ));
        }
    };

    // some issuers keep the base64 padding
    let bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .or_else(|_| URL_SAFE.decode(payload))
        .map_err(|e| AuthError::InvalidToken(format!("payload is not base64url: {}", e)))?;

    let claims: Value = serde_json::from_slice(&bytes)
        .map_err(|e| AuthError::InvalidToken(format!("payload is not JSON: {}", e)))?;

    if !claims.is_object() {
        return Err(AuthError::InvalidToken(
            "payload is not a JSON object".to_string(),
        ));
    }
    Ok(claims)
}

pub fn token_expiry(claims: &Value) -> Option<i64> {
    claims.get("exp").and_then(Value::as_i64)
}

/// `aud` may be a single string or an array of strings.
pub fn token_audiences(claims: &Value) -> Vec<String> {
    match claims.get("aud") {
        Some(Value::String(aud)) => vec![aud.clone()],
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}

pub fn seconds_until(exp: i64, now: i64) -> i64 {
    exp - now
}

pub fn format_unix_time(ts: i64) -> String {
    DateTime::<Utc>::from_timestamp(ts, 0)
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|| ts.to_string())
}

/// One row per top-level claim; timestamps get a readable date next to them.
pub fn claims_table_rows(claims: &Value) -> Vec<ClaimsTableRow> {
    let Some(map) = claims.as_object() else {
        return Vec::new();
    };

    map.iter()
        .map(|(claim, value)| ClaimsTableRow {
            claim: claim.clone(),
            value: match (claim.as_str(), value) {
                ("exp" | "iat" | "nbf" | "auth_time", Value::Number(n)) => match n.as_i64() {
                    Some(ts) => format!("{} ({})", ts, format_unix_time(ts)),
                    None => n.to_string(),
                },
                (_, Value::String(s)) => s.clone(),
                (_, Value::Array(items)) => items
                    .iter()
                    .map(|v| v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string()))
                    .collect::<Vec<_>>()
                    .join(","),
                (_, other) => other.to_string(),
            },
        })
        .collect()
}
