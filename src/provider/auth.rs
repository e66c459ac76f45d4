use std::{collections::HashMap, sync::Arc, time::Duration};

use chrono::Utc;
use reqwest::{Client, StatusCode};
use tokio::sync::Mutex;

use crate::{
    config::Settings,
    provider::AuthError,
    server,
    types::{ErrorResponse, PkceSession, Prompt, Token, TokenResponse},
    utils, warning,
};

/// Acquires a token interactively through the system browser.
///
/// This is the terminal counterpart of a login/consent popup:
/// 1. generates the PKCE verifier, challenge and `state`
/// 2. binds the local callback server
/// 3. opens the authorize URL (with `prompt` when requested)
/// 4. waits until the callback handler stores an outcome, or times out
///
/// The callback server is shut down before returning.
///
/// # Arguments
///
/// * `settings` - Provider, redirect and timeout settings
/// * `audience` - The API identifier the token is requested for
/// * `prompt` - `Consent` or `Login` to force that screen, `Default` otherwise
///
/// # Errors
///
/// Returns the provider's error (e.g. `consent_required` when the user
/// declines), [`AuthError::Config`] when the callback server cannot bind, and
/// [`AuthError::Timeout`] when nothing arrives in `auth_timeout_secs`.
///
/// # Example
///
/// ```
/// let token = authorize_interactive(&settings, "https://api/", Prompt::Consent).await?;
/// println!("Got token for {}", token.audience);
/// ```
pub async fn authorize_interactive(
    settings: &Settings,
    audience: &str,
    prompt: Prompt,
) -> Result<Token, AuthError> {
    let code_verifier = utils::generate_code_verifier();
    let code_challenge = utils::generate_code_challenge(&code_verifier);
    let state = utils::generate_state();

    let auth_url =
        utils::build_authorize_url(settings, audience, &code_challenge, &state, prompt)
            .map_err(AuthError::Config)?;

    // store verifier in shared state before redirect
    let shared_state = Arc::new(Mutex::new(Some(PkceSession {
        code_verifier,
        state,
        audience: audience.to_string(),
        outcome: None,
    })));

    let listener = server::bind(&settings.server_address)
        .await
        .map_err(AuthError::Config)?;
    let server_handle = tokio::spawn(server::serve(
        listener,
        Arc::new(settings.clone()),
        Arc::clone(&shared_state),
    ));

    if webbrowser::open(&auth_url).is_err() {
        warning!(
            "Failed to open browser. Please navigate to the following URL manually:\n{}",
            auth_url
        )
    }

    let outcome = wait_for_outcome(
        Arc::clone(&shared_state),
        Duration::from_secs(settings.auth_timeout_secs),
    )
    .await;
    server_handle.abort();

    outcome.unwrap_or(Err(AuthError::Timeout))
}

/// Polls the shared session until the callback handler stores an outcome.
///
/// # Arguments
///
/// * `shared_state` - The session shared with the callback server
/// * `max_wait` - Upper bound for the whole wait, lock acquisition included
///
/// # Returns
///
/// The stored outcome, or `None` when `max_wait` elapsed first.
pub async fn wait_for_outcome(
    shared_state: Arc<Mutex<Option<PkceSession>>>,
    max_wait: Duration,
) -> Option<Result<Token, AuthError>> {
    let poll = async {
        loop {
            if let Some(session) = shared_state.lock().await.as_mut() {
                if let Some(outcome) = session.outcome.take() {
                    return outcome;
                }
            }
            tokio::time::sleep(Duration::from_millis(250)).await;
        }
    };

    tokio::time::timeout(max_wait, poll).await.ok()
}

/// Turns the callback query into a token, or into the error it reports.
///
/// The `state` check runs first so an attacker cannot inject either a code or
/// an error into a pending login.
pub async fn resolve_callback(
    params: &HashMap<String, String>,
    session: &PkceSession,
    settings: &Settings,
) -> Result<Token, AuthError> {
    if params.get("state") != Some(&session.state) {
        return Err(AuthError::StateMismatch);
    }

    if let Some(code) = params.get("error") {
        return Err(AuthError::from_code(
            code,
            params.get("error_description").cloned(),
        ));
    }

    let Some(code) = params.get("code") else {
        return Err(AuthError::Provider {
            code: "invalid_request".to_string(),
            description: Some("callback carries neither code nor error".to_string()),
        });
    };

    exchange_code_pkce(
        &Client::new(),
        settings,
        code,
        &session.code_verifier,
        &session.audience,
    )
    .await
}

/// Exchanges an authorization code for a token using the PKCE verifier.
pub async fn exchange_code_pkce(
    client: &Client,
    settings: &Settings,
    code: &str,
    verifier: &str,
    audience: &str,
) -> Result<Token, AuthError> {
    let res = client
        .post(settings.token_url())
        .form(&[
            ("grant_type", "authorization_code"),
            ("client_id", settings.client_id.as_str()),
            ("code", code),
            ("code_verifier", verifier),
            ("redirect_uri", settings.redirect_uri.as_str()),
        ])
        .send()
        .await?;

    let status = res.status();
    let body = res.text().await?;
    parse_token_response(status, &body, audience, Utc::now().timestamp() as u64)
}

/// Refreshes the session token for `audience`.
///
/// Providers that do not rotate refresh tokens omit it from the response; the
/// one sent is kept in that case. `invalid_grant` means the session is gone and
/// is reported as `login_required`.
pub async fn refresh_token(
    client: &Client,
    settings: &Settings,
    refresh_token: &str,
    audience: &str,
) -> Result<Token, AuthError> {
    let res = client
        .post(settings.token_url())
        .form(&[
            ("grant_type", "refresh_token"),
            ("client_id", settings.client_id.as_str()),
            ("refresh_token", refresh_token),
            ("audience", audience),
            ("scope", settings.scope.as_str()),
        ])
        .send()
        .await?;

    let status = res.status();
    let body = res.text().await?;
    match parse_token_response(status, &body, audience, Utc::now().timestamp() as u64) {
        Ok(mut token) => {
            if token.refresh_token.is_none() {
                token.refresh_token = Some(refresh_token.to_string());
            }
            Ok(token)
        }
        Err(AuthError::Provider { code, .. }) if code == "invalid_grant" => {
            Err(AuthError::LoginRequired)
        }
        Err(e) => Err(e),
    }
}

/// Parses a token endpoint body into a [`Token`] or the provider's error.
pub fn parse_token_response(
    status: StatusCode,
    body: &str,
    audience: &str,
    obtained_at: u64,
) -> Result<Token, AuthError> {
    if !status.is_success() {
        return match serde_json::from_str::<ErrorResponse>(body) {
            Ok(err) => Err(AuthError::from_code(&err.error, err.error_description)),
            Err(_) => Err(AuthError::InvalidResponse(format!(
                "token endpoint returned {}",
                status
            ))),
        };
    }

    let res: TokenResponse =
        serde_json::from_str(body).map_err(|e| AuthError::InvalidResponse(e.to_string()))?;

    Ok(Token {
        access_token: res.access_token,
        refresh_token: res.refresh_token,
        id_token: res.id_token,
        scope: res.scope.unwrap_or_default(),
        expires_in: res.expires_in.unwrap_or(3600),
        obtained_at,
        audience: audience.to_string(),
    })
}
