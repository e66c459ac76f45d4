#![allow(dead_code)]

use std::path::PathBuf;

use axum::Router;
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::Utc;
use extapi::{config::Settings, types::Token};
use rand::{Rng, distr::Alphanumeric};
use serde_json::{Value, json};

pub const AUDIENCE: &str = "https://external-api.example.com/";

// Helper function to build an unsigned JWT around `claims`
pub fn make_jwt(claims: &Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{}.{}.signature", header, payload)
}

pub fn default_claims(audience: &str) -> Value {
    let now = Utc::now().timestamp();
    json!({
        "iss": "https://tenant.example.com/",
        "sub": "auth0|user-123",
        "aud": [audience, "https://tenant.example.com/userinfo"],
        "iat": now,
        "exp": now + 3600,
        "scope": "openid profile email"
    })
}

pub fn make_token(audience: &str, expires_in: u64, refresh_token: Option<&str>) -> Token {
    Token {
        access_token: make_jwt(&default_claims(audience)),
        refresh_token: refresh_token.map(str::to_string),
        id_token: None,
        scope: "openid profile email".to_string(),
        expires_in,
        obtained_at: Utc::now().timestamp() as u64,
        audience: audience.to_string(),
    }
}

pub fn settings(issuer: &str, api_origin: &str, audience: Option<&str>) -> Settings {
    Settings {
        issuer: issuer.to_string(),
        client_id: "test-client".to_string(),
        audience: audience.map(str::to_string),
        api_origin: api_origin.to_string(),
        server_address: "127.0.0.1:0".to_string(),
        redirect_uri: "http://127.0.0.1:3000/callback".to_string(),
        scope: "openid profile email offline_access".to_string(),
        wrong_audience: "https://wrong-account-api.com/".to_string(),
        auth_timeout_secs: 1,
    }
}

pub fn temp_token_path() -> PathBuf {
    let suffix: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(12)
        .map(char::from)
        .collect();
    std::env::temp_dir()
        .join(format!("extapi-test-{}", suffix))
        .join("tokens.json")
}

/// Serves `app` on an ephemeral port and returns its base URL.
pub async fn spawn(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test server");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve test app");
    });
    format!("http://{}", addr)
}
