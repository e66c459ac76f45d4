mod common;

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use axum::{Form, Json, Router, extract::State, http::StatusCode, routing::post};
use extapi::{
    management::TokenStore,
    provider::{
        AuthError, Provider, TokenSource,
        auth::{parse_token_response, resolve_callback, wait_for_outcome},
    },
    server,
    types::PkceSession,
};
use serde_json::{Value, json};
use tokio::sync::Mutex;

use common::{AUDIENCE, make_token, settings, spawn, temp_token_path};

#[derive(Clone)]
struct FakeTokenEndpoint {
    hits: Arc<AtomicUsize>,
    forms: Arc<std::sync::Mutex<Vec<HashMap<String, String>>>>,
    status: StatusCode,
    body: Value,
}

async fn token_handler(
    State(endpoint): State<FakeTokenEndpoint>,
    Form(form): Form<HashMap<String, String>>,
) -> (StatusCode, Json<Value>) {
    endpoint.hits.fetch_add(1, Ordering::SeqCst);
    endpoint.forms.lock().unwrap().push(form);
    (endpoint.status, Json(endpoint.body.clone()))
}

async fn spawn_token_endpoint(status: StatusCode, body: Value) -> (String, FakeTokenEndpoint) {
    let endpoint = FakeTokenEndpoint {
        hits: Arc::new(AtomicUsize::new(0)),
        forms: Arc::new(std::sync::Mutex::new(Vec::new())),
        status,
        body,
    };
    let app = Router::new()
        .route("/oauth/token", post(token_handler))
        .with_state(endpoint.clone());
    (spawn(app).await, endpoint)
}

#[test]
fn test_parse_token_response_success() {
    let body = json!({
        "access_token": "at",
        "refresh_token": "rt",
        "id_token": "it",
        "scope": "openid",
        "expires_in": 86400,
        "token_type": "Bearer"
    })
    .to_string();

    let token = parse_token_response(StatusCode::OK, &body, AUDIENCE, 42).unwrap();
    assert_eq!(token.access_token, "at");
    assert_eq!(token.refresh_token.as_deref(), Some("rt"));
    assert_eq!(token.id_token.as_deref(), Some("it"));
    assert_eq!(token.expires_in, 86400);
    assert_eq!(token.obtained_at, 42);
    assert_eq!(token.audience, AUDIENCE);
}

#[test]
fn test_parse_token_response_defaults() {
    let body = json!({ "access_token": "at" }).to_string();
    let token = parse_token_response(StatusCode::OK, &body, AUDIENCE, 0).unwrap();
    assert_eq!(token.refresh_token, None);
    assert_eq!(token.scope, "");
    assert_eq!(token.expires_in, 3600);
}

#[test]
fn test_parse_token_response_errors() {
    let consent = json!({ "error": "consent_required", "error_description": "Consent required" });
    assert_eq!(
        parse_token_response(StatusCode::FORBIDDEN, &consent.to_string(), AUDIENCE, 0),
        Err(AuthError::ConsentRequired)
    );

    let other = json!({ "error": "access_denied", "error_description": "Unauthorized" });
    let err = parse_token_response(StatusCode::FORBIDDEN, &other.to_string(), AUDIENCE, 0)
        .unwrap_err();
    assert_eq!(err.code(), "access_denied");
    assert_eq!(err.to_string(), "access_denied: Unauthorized");

    let html = parse_token_response(StatusCode::BAD_GATEWAY, "<html>", AUDIENCE, 0).unwrap_err();
    assert_eq!(html.code(), "invalid_response");
}

#[test]
fn test_error_codes() {
    assert_eq!(AuthError::from_code("consent_required", None), AuthError::ConsentRequired);
    assert_eq!(AuthError::from_code("login_required", None), AuthError::LoginRequired);
    assert_eq!(AuthError::ConsentRequired.code(), "consent_required");
    assert_eq!(AuthError::LoginRequired.code(), "login_required");
    assert_eq!(AuthError::Timeout.code(), "timeout");
    assert_eq!(
        AuthError::from_code("access_denied", Some("Unauthorized".to_string())).code(),
        "access_denied"
    );
}

#[tokio::test]
async fn test_silent_returns_fresh_token_without_network() {
    let token = make_token(AUDIENCE, 3600, None);
    let mut store = TokenStore::new(temp_token_path());
    store.insert(token.clone());

    // unroutable issuer: any request would fail
    let mut provider = Provider::new(settings("http://127.0.0.1:9", "", Some(AUDIENCE)), store);
    assert_eq!(provider.get_token_silently(AUDIENCE).await, Ok(token));
}

#[tokio::test]
async fn test_silent_without_session_requires_login() {
    let store = TokenStore::new(temp_token_path());
    let mut provider = Provider::new(settings("http://127.0.0.1:9", "", Some(AUDIENCE)), store);
    assert_eq!(
        provider.get_token_silently(AUDIENCE).await,
        Err(AuthError::LoginRequired)
    );
}

#[tokio::test]
async fn test_silent_for_new_audience_requires_consent() {
    let mut store = TokenStore::new(temp_token_path());
    store.insert(make_token(AUDIENCE, 3600, Some("rt")));
    let mut provider = Provider::new(settings("http://127.0.0.1:9", "", Some(AUDIENCE)), store);

    assert_eq!(
        provider.get_token_silently("https://wrong-account-api.com/").await,
        Err(AuthError::ConsentRequired)
    );
}

#[tokio::test]
async fn test_silent_refreshes_expired_token() {
    let (issuer, endpoint) = spawn_token_endpoint(
        StatusCode::OK,
        json!({ "access_token": "new-at", "expires_in": 600, "scope": "openid" }),
    )
    .await;

    let path = temp_token_path();
    let mut expired = make_token(AUDIENCE, 3600, Some("rt-1"));
    expired.obtained_at -= 7200;
    let mut store = TokenStore::new(path.clone());
    store.insert(expired);

    let mut provider = Provider::new(settings(&issuer, "", Some(AUDIENCE)), store);
    let token = provider.get_token_silently(AUDIENCE).await.unwrap();

    assert_eq!(token.access_token, "new-at");
    // non-rotating provider: old refresh token kept
    assert_eq!(token.refresh_token.as_deref(), Some("rt-1"));
    assert_eq!(endpoint.hits.load(Ordering::SeqCst), 1);

    let form = endpoint.forms.lock().unwrap()[0].clone();
    assert_eq!(form.get("grant_type").map(String::as_str), Some("refresh_token"));
    assert_eq!(form.get("refresh_token").map(String::as_str), Some("rt-1"));
    assert_eq!(form.get("audience").map(String::as_str), Some(AUDIENCE));
    assert_eq!(form.get("client_id").map(String::as_str), Some("test-client"));

    // the refreshed token was persisted
    let reloaded = TokenStore::load(path).await.unwrap();
    assert_eq!(reloaded.get(AUDIENCE).map(|t| t.access_token.as_str()), Some("new-at"));
}

#[tokio::test]
async fn test_silent_refresh_invalid_grant_requires_login() {
    let (issuer, _) = spawn_token_endpoint(
        StatusCode::FORBIDDEN,
        json!({
            "error": "invalid_grant",
            "error_description": "Unknown or invalid refresh token."
        }),
    )
    .await;

    let mut expired = make_token(AUDIENCE, 3600, Some("rt-1"));
    expired.obtained_at -= 7200;
    let mut store = TokenStore::new(temp_token_path());
    store.insert(expired);

    let mut provider = Provider::new(settings(&issuer, "", Some(AUDIENCE)), store);
    assert_eq!(
        provider.get_token_silently(AUDIENCE).await,
        Err(AuthError::LoginRequired)
    );
}

fn session(state: &str) -> PkceSession {
    PkceSession {
        code_verifier: "verifier".to_string(),
        state: state.to_string(),
        audience: AUDIENCE.to_string(),
        outcome: None,
    }
}

fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[tokio::test]
async fn test_resolve_callback_checks_state_first() {
    let settings = settings("http://127.0.0.1:9", "", Some(AUDIENCE));
    let result = resolve_callback(
        &params(&[("state", "forged"), ("error", "login_required")]),
        &session("expected"),
        &settings,
    )
    .await;
    assert_eq!(result, Err(AuthError::StateMismatch));

    let missing =
        resolve_callback(&params(&[("code", "c")]), &session("expected"), &settings).await;
    assert_eq!(missing, Err(AuthError::StateMismatch));
}

#[tokio::test]
async fn test_resolve_callback_maps_error_param() {
    let settings = settings("http://127.0.0.1:9", "", Some(AUDIENCE));
    let result = resolve_callback(
        &params(&[("state", "s"), ("error", "consent_required")]),
        &session("s"),
        &settings,
    )
    .await;
    assert_eq!(result, Err(AuthError::ConsentRequired));

    let empty = resolve_callback(&params(&[("state", "s")]), &session("s"), &settings).await;
    assert_eq!(empty.unwrap_err().code(), "invalid_request");
}

#[tokio::test]
async fn test_callback_route_exchanges_code() {
    let (issuer, endpoint) = spawn_token_endpoint(
        StatusCode::OK,
        json!({ "access_token": "at", "refresh_token": "rt", "expires_in": 86400 }),
    )
    .await;

    let settings = Arc::new(settings(&issuer, "", Some(AUDIENCE)));
    let shared = Arc::new(Mutex::new(Some(session("s"))));
    let base = spawn(server::router(Arc::clone(&settings), Arc::clone(&shared))).await;

    let client = reqwest::Client::new();

    // forged callback leaves the pending login untouched
    let page = client
        .get(format!("{}/callback?state=bad&code=c", base))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(page.contains("Unexpected login state"));
    assert!(shared.lock().await.as_ref().unwrap().outcome.is_none());

    let page = client
        .get(format!("{}/callback?state=s&code=the-code", base))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(page.contains("Authentication successful"));

    let outcome = shared.lock().await.as_mut().unwrap().outcome.take().unwrap();
    let token = outcome.unwrap();
    assert_eq!(token.access_token, "at");
    assert_eq!(token.audience, AUDIENCE);

    let form = endpoint.forms.lock().unwrap()[0].clone();
    assert_eq!(form.get("grant_type").map(String::as_str), Some("authorization_code"));
    assert_eq!(form.get("code").map(String::as_str), Some("the-code"));
    assert_eq!(form.get("code_verifier").map(String::as_str), Some("verifier"));
}

// Token endpoint that never answers in time
async fn spawn_stalled_token_endpoint() -> String {
    let app = Router::new().route(
        "/oauth/token",
        post(|| async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Json(json!({ "access_token": "late" }))
        }),
    );
    spawn(app).await
}

#[tokio::test]
async fn test_wait_for_outcome_times_out_while_exchange_stalls() {
    let issuer = spawn_stalled_token_endpoint().await;
    let settings = Arc::new(settings(&issuer, "", Some(AUDIENCE)));
    let shared = Arc::new(Mutex::new(Some(session("s"))));
    let base = spawn(server::router(settings, Arc::clone(&shared))).await;

    // the callback request hangs on the token exchange
    let pending = tokio::spawn(reqwest::get(format!("{}/callback?state=s&code=c", base)));
    tokio::time::sleep(Duration::from_millis(200)).await;

    let waited = tokio::time::timeout(
        Duration::from_secs(5),
        wait_for_outcome(Arc::clone(&shared), Duration::from_secs(1)),
    )
    .await;
    assert_eq!(waited, Ok(None));

    // the session is not locked across the exchange
    let lock = tokio::time::timeout(Duration::from_millis(500), shared.lock()).await;
    assert!(lock.is_ok());
    pending.abort();
}

#[tokio::test]
async fn test_wait_for_outcome_returns_stored_outcome() {
    let mut pending = session("s");
    pending.outcome = Some(Err(AuthError::ConsentRequired));
    let shared = Arc::new(Mutex::new(Some(pending)));

    let outcome = wait_for_outcome(Arc::clone(&shared), Duration::from_secs(1)).await;
    assert_eq!(outcome, Some(Err(AuthError::ConsentRequired)));
    // taken, not copied
    assert!(shared.lock().await.as_ref().unwrap().outcome.is_none());
}

#[tokio::test]
async fn test_callback_after_flow_gave_up_stores_nothing() {
    let (issuer, _) = spawn_token_endpoint(StatusCode::OK, json!({ "access_token": "at" })).await;
    let settings = Arc::new(settings(&issuer, "", Some(AUDIENCE)));
    let shared = Arc::new(Mutex::new(None));
    let base = spawn(server::router(settings, Arc::clone(&shared))).await;

    let page = reqwest::get(format!("{}/callback?state=s&code=c", base))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(page.contains("No login in progress"));
    assert!(shared.lock().await.is_none());
}

#[tokio::test]
async fn test_health_route() {
    let settings = Arc::new(settings("http://127.0.0.1:9", "", None));
    let base = spawn(server::router(settings, Arc::new(Mutex::new(None)))).await;

    let body: Value = reqwest::get(format!("{}/health", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["name"], "extapi");
}
